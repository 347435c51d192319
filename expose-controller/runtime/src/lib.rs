#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub use expose_controller_core as core;
pub use expose_controller_k8s_api as k8s;

mod args;
mod controller;
mod error;
mod metrics;
pub mod store;
pub mod strategy;

pub use self::{
    args::Args,
    controller::{is_selected, Controller},
    error::{Error, Op},
    metrics::ExposeMetrics,
    store::{KubeStore, Store, StoreError},
    strategy::{ExposeStrategy, Strategy},
};
