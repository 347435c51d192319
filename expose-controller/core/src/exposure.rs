use crate::{
    config::StrategyConfig,
    host::HostPath,
    ingress::AnnotationError,
    port::{self, PortError},
};
use expose_controller_k8s_api::{annotations, ObjectMeta, OwnerReference, ResourceExt, Service};
use std::collections::BTreeMap;
use thiserror::Error;

/// Everything derived from a service that a routing resource is built from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Exposure {
    pub host: HostPath,
    pub port: i32,
    /// Present iff the service is served over TLS.
    pub tls: Option<Tls>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tls {
    pub secret_name: String,
    /// Certificates are requested through ACME.
    pub acme: bool,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ExposureError {
    #[error(transparent)]
    Port(#[from] PortError),

    #[error(transparent)]
    Annotations(#[from] AnnotationError),
}

impl Exposure {
    pub fn resolve(svc: &Service, config: &StrategyConfig) -> Result<Self, ExposureError> {
        let host = HostPath::resolve(svc, config);
        let port = port::resolve(svc)?.port;
        let tls = tls(svc, config, &host.app_name);
        Ok(Self { host, port, tls })
    }

    /// Metadata every managed routing resource starts from: its identity,
    /// the managed marker, the provider label and an owner reference to the
    /// service.
    pub fn metadata(&self, svc: &Service) -> ObjectMeta {
        ObjectMeta {
            namespace: svc.namespace(),
            name: Some(self.host.app_name.clone()),
            annotations: Some(BTreeMap::from([(
                annotations::GENERATED_BY.to_string(),
                annotations::GENERATED_BY_VALUE.to_string(),
            )])),
            labels: Some(BTreeMap::from([(
                annotations::PROVIDER_LABEL.to_string(),
                annotations::PROVIDER_VALUE.to_string(),
            )])),
            owner_references: Some(vec![owner_reference(svc)]),
            ..Default::default()
        }
    }

    pub fn scheme(&self) -> &'static str {
        if self.tls.is_some() {
            "https"
        } else {
            "http"
        }
    }
}

pub fn owner_reference(svc: &Service) -> OwnerReference {
    OwnerReference {
        api_version: "v1".to_string(),
        kind: "Service".to_string(),
        name: svc.name_any(),
        uid: svc.uid().unwrap_or_default(),
        ..Default::default()
    }
}

/// Decides whether a service is served over TLS.
///
/// TLS requires a secret name or ACME issuance to be configured, and can be
/// switched off per service with the `skip.tls` annotation. The secret
/// defaults to `tls-<app name>`.
pub fn tls(svc: &Service, config: &StrategyConfig, app_name: &str) -> Option<Tls> {
    if annotations::is_true(svc.metadata.annotations.as_ref(), annotations::SKIP_TLS) {
        return None;
    }
    if config.tls_secret_name.is_none() && !config.tls_acme {
        return None;
    }

    let secret_name = config
        .tls_secret_name
        .clone()
        .unwrap_or_else(|| format!("tls-{app_name}"));
    Some(Tls {
        secret_name,
        acme: config.tls_acme,
    })
}
