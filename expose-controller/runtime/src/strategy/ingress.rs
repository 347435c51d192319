use super::{annotate, exposure_error, resolve, ExposeStrategy, Target};
use crate::{
    core::{host, ingress, reconcile, AnnotationPatch, Plan, Removal, StrategyConfig},
    error::{Error, Op},
    k8s::{Ingress, ResourceExt, Service},
    store::Store,
};
use async_trait::async_trait;
use std::sync::Arc;

const KIND: &str = "Ingress";

/// Routes each service through an Ingress rule on its own host, or on a
/// shared host under a per-service path.
pub struct IngressStrategy<S> {
    store: S,
    config: Arc<StrategyConfig>,
}

impl<S: Store> IngressStrategy<S> {
    pub fn new(store: S, config: Arc<StrategyConfig>) -> Self {
        Self { store, config }
    }
}

#[async_trait]
impl<S: Store> ExposeStrategy for IngressStrategy<S> {
    async fn expose(&self, svc: &Service) -> Result<(), Error> {
        let exposure = resolve(svc, &self.config)?;
        let desired =
            ingress::desired(svc, &exposure, &self.config).map_err(|e| exposure_error(svc, e))?;

        let target = Target::new(KIND, svc.namespace().unwrap_or_default(), &exposure.host.app_name);
        let observed = self
            .store
            .get::<Ingress>(&target.namespace, &target.name)
            .await
            .map_err(target.store(Op::Get))?;

        match reconcile::ingress(desired, observed) {
            Plan::Create(ingress) => {
                self.store
                    .create(&ingress)
                    .await
                    .map_err(target.store(Op::Create))?;
                tracing::info!(namespace = %target.namespace, name = %target.name, host = %exposure.host.hostname, "Created Ingress");
            }
            Plan::Update(ingress) => {
                self.store
                    .replace(&ingress)
                    .await
                    .map_err(target.store(Op::Replace))?;
                tracing::info!(namespace = %target.namespace, name = %target.name, host = %exposure.host.hostname, "Updated Ingress");
            }
            Plan::Unchanged => {
                tracing::debug!(namespace = %target.namespace, name = %target.name, "Ingress is up to date");
            }
            Plan::Conflict => return Err(target.foreign()),
        }

        let patch =
            AnnotationPatch::expose_url(svc, &exposure.host.full_hostname, exposure.scheme());
        annotate(&self.store, svc, patch).await
    }

    async fn unexpose(&self, svc: &Service) -> Result<(), Error> {
        let target = Target::new(
            KIND,
            svc.namespace().unwrap_or_default(),
            host::app_name(svc),
        );
        let observed = self
            .store
            .get::<Ingress>(&target.namespace, &target.name)
            .await
            .map_err(target.store(Op::Get))?;

        match reconcile::ingress_removal(&svc.name_any(), observed) {
            Removal::Delete => {
                self.store
                    .delete::<Ingress>(&target.namespace, &target.name)
                    .await
                    .map_err(target.store(Op::Delete))?;
                tracing::info!(namespace = %target.namespace, name = %target.name, "Deleted Ingress");
            }
            Removal::Update(ingress) => {
                self.store
                    .replace(&ingress)
                    .await
                    .map_err(target.store(Op::Replace))?;
                tracing::info!(namespace = %target.namespace, name = %target.name, "Removed service from Ingress");
            }
            Removal::Foreign => {
                tracing::debug!(namespace = %target.namespace, name = %target.name, "Ignoring unmanaged Ingress");
            }
            Removal::Absent | Removal::Unchanged => {}
        }

        annotate(&self.store, svc, AnnotationPatch::unexpose(svc)).await
    }
}
