use super::{annotate, exposure_error, ExposeStrategy, Target};
use crate::{
    core::{load_balancer, port, AnnotationPatch},
    error::{Error, Op},
    k8s::Service,
    store::Store,
};
use async_trait::async_trait;

/// Switches services to `type: LoadBalancer` and records the address the
/// platform assigns.
pub struct LoadBalancerStrategy<S> {
    store: S,
}

impl<S: Store> LoadBalancerStrategy<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }
}

#[async_trait]
impl<S: Store> ExposeStrategy for LoadBalancerStrategy<S> {
    async fn expose(&self, svc: &Service) -> Result<(), Error> {
        let port = port::resolve(svc)
            .map_err(|e| exposure_error(svc, e))?
            .port;

        if let Some(patch) = load_balancer::type_patch(svc) {
            let target = Target::service(svc);
            self.store
                .patch::<Service>(&target.namespace, &target.name, &patch)
                .await
                .map_err(target.store(Op::Patch))?;
            tracing::info!(namespace = %target.namespace, name = %target.name, "Switched service to LoadBalancer");
        }

        match load_balancer::external_host(svc, port) {
            Some(host) => annotate(&self.store, svc, AnnotationPatch::expose_url(svc, &host, "http")).await,
            None => {
                let target = Target::service(svc);
                tracing::debug!(namespace = %target.namespace, name = %target.name, "Waiting for a load balancer address");
                Ok(())
            }
        }
    }

    async fn unexpose(&self, svc: &Service) -> Result<(), Error> {
        annotate(&self.store, svc, AnnotationPatch::unexpose(svc)).await
    }
}
