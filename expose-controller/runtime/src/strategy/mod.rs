//! The ways a service can be exposed.
//!
//! Exactly one strategy is chosen at startup; [`Strategy`] dispatches to it.

mod ambassador;
mod ingress;
mod load_balancer;
mod route;


pub use self::{
    ambassador::AmbassadorStrategy, ingress::IngressStrategy,
    load_balancer::LoadBalancerStrategy, route::RouteStrategy,
};
use crate::{
    core::{AnnotationPatch, Exposer, Exposure, ExposureError, StrategyConfig},
    error::{Error, Op},
    k8s::{ResourceExt, Service},
    store::{Store, StoreError},
};
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait ExposeStrategy: Send + Sync {
    /// Creates or updates whatever routes traffic to the service and records
    /// its external URL on it.
    async fn expose(&self, svc: &Service) -> Result<(), Error>;

    /// Withdraws the service's exposure and its recorded URL. Succeeds when
    /// there is nothing to withdraw.
    async fn unexpose(&self, svc: &Service) -> Result<(), Error>;
}

pub enum Strategy<S> {
    Ingress(IngressStrategy<S>),
    Ambassador(AmbassadorStrategy<S>),
    Route(RouteStrategy<S>),
    LoadBalancer(LoadBalancerStrategy<S>),
}

/// Identifies the object a store operation targets, for error reporting.
#[derive(Clone, Debug)]
struct Target {
    kind: &'static str,
    namespace: String,
    name: String,
}

// === impl Strategy ===

impl<S: Store> Strategy<S> {
    pub fn new(exposer: Exposer, store: S, config: Arc<StrategyConfig>) -> Self {
        match exposer {
            Exposer::Ingress => Self::Ingress(IngressStrategy::new(store, config)),
            Exposer::Ambassador => Self::Ambassador(AmbassadorStrategy::new(store, config)),
            Exposer::Route => Self::Route(RouteStrategy::new(store, config)),
            Exposer::LoadBalancer => Self::LoadBalancer(LoadBalancerStrategy::new(store)),
        }
    }
}

#[async_trait]
impl<S: Store> ExposeStrategy for Strategy<S> {
    async fn expose(&self, svc: &Service) -> Result<(), Error> {
        match self {
            Self::Ingress(s) => s.expose(svc).await,
            Self::Ambassador(s) => s.expose(svc).await,
            Self::Route(s) => s.expose(svc).await,
            Self::LoadBalancer(s) => s.expose(svc).await,
        }
    }

    async fn unexpose(&self, svc: &Service) -> Result<(), Error> {
        match self {
            Self::Ingress(s) => s.unexpose(svc).await,
            Self::Ambassador(s) => s.unexpose(svc).await,
            Self::Route(s) => s.unexpose(svc).await,
            Self::LoadBalancer(s) => s.unexpose(svc).await,
        }
    }
}

// === impl Target ===

impl Target {
    fn new(kind: &'static str, namespace: impl ToString, name: impl ToString) -> Self {
        Self {
            kind,
            namespace: namespace.to_string(),
            name: name.to_string(),
        }
    }

    fn service(svc: &Service) -> Self {
        Self::new("Service", svc.namespace().unwrap_or_default(), svc.name_any())
    }

    fn store(&self, op: Op) -> impl FnOnce(StoreError) -> Error + '_ {
        move |source| Error::Store {
            op,
            kind: self.kind,
            namespace: self.namespace.clone(),
            name: self.name.clone(),
            source,
        }
    }

    fn foreign(&self) -> Error {
        Error::Foreign {
            kind: self.kind,
            namespace: self.namespace.clone(),
            name: self.name.clone(),
        }
    }
}

fn exposure_error(svc: &Service, source: impl Into<ExposureError>) -> Error {
    Error::Exposure {
        namespace: svc.namespace().unwrap_or_default(),
        name: svc.name_any(),
        source: source.into(),
    }
}

fn resolve(svc: &Service, config: &StrategyConfig) -> Result<Exposure, Error> {
    Exposure::resolve(svc, config).map_err(|e| exposure_error(svc, e))
}

/// Applies the changed keys of `patch` to the service, if any.
///
/// A service that no longer exists has nothing left to annotate.
async fn annotate<S: Store>(store: &S, svc: &Service, patch: AnnotationPatch) -> Result<(), Error> {
    let Some(patch) = patch.into_merge_patch(svc) else {
        return Ok(());
    };

    let target = Target::service(svc);
    match store
        .patch::<Service>(&target.namespace, &target.name, &patch)
        .await
    {
        Ok(_) => {
            tracing::debug!(namespace = %target.namespace, name = %target.name, "Annotated service");
            Ok(())
        }
        Err(StoreError::NotFound) => {
            tracing::debug!(namespace = %target.namespace, name = %target.name, "Service is gone");
            Ok(())
        }
        Err(error) => Err(target.store(Op::Patch)(error)),
    }
}
