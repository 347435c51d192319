#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod config;
pub mod exposure;
pub mod host;
pub mod ingress;
pub mod load_balancer;
pub mod mapping;
pub mod port;
pub mod reconcile;
pub mod route;
pub mod service;

pub use self::{
    config::{Config, ConfigError, Exposer, PathMode, StrategyConfig, UrlTemplate},
    exposure::{Exposure, ExposureError, Tls},
    host::HostPath,
    port::{PortError, PortFallback, ResolvedPort},
    reconcile::{Plan, Removal, State},
    service::AnnotationPatch,
};
pub use expose_controller_k8s_api as k8s;
