use super::{annotate, resolve, ExposeStrategy, Target};
use crate::{
    core::{host, reconcile, route, AnnotationPatch, Plan, StrategyConfig},
    error::{Error, Op},
    k8s::{route::Route, ResourceExt, Service},
    store::Store,
};
use async_trait::async_trait;
use std::sync::Arc;

const KIND: &str = "Route";

/// Exposes services through OpenShift routes.
pub struct RouteStrategy<S> {
    store: S,
    config: Arc<StrategyConfig>,
}

impl<S: Store> RouteStrategy<S> {
    pub fn new(store: S, config: Arc<StrategyConfig>) -> Self {
        Self { store, config }
    }
}

#[async_trait]
impl<S: Store> ExposeStrategy for RouteStrategy<S> {
    async fn expose(&self, svc: &Service) -> Result<(), Error> {
        let exposure = resolve(svc, &self.config)?;
        let desired = route::desired(svc, &exposure);

        let target = Target::new(KIND, svc.namespace().unwrap_or_default(), &exposure.host.app_name);
        let observed = self
            .store
            .get::<Route>(&target.namespace, &target.name)
            .await
            .map_err(target.store(Op::Get))?;

        match reconcile::route(desired, observed) {
            Plan::Create(route) => {
                self.store
                    .create(&route)
                    .await
                    .map_err(target.store(Op::Create))?;
                tracing::info!(namespace = %target.namespace, name = %target.name, host = %exposure.host.hostname, "Created Route");
            }
            Plan::Update(route) => {
                self.store
                    .replace(&route)
                    .await
                    .map_err(target.store(Op::Replace))?;
                tracing::info!(namespace = %target.namespace, name = %target.name, host = %exposure.host.hostname, "Updated Route");
            }
            Plan::Unchanged => {
                tracing::debug!(namespace = %target.namespace, name = %target.name, "Route is up to date");
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
            .get::<Route>(&target.namespace, &target.name)
            .await
            .map_err(target.store(Op::Get))?;

        match observed {
            Some(route) if reconcile::is_managed(&route.metadata) => {
                self.store
                    .delete::<Route>(&target.namespace, &target.name)
                    .await
                    .map_err(target.store(Op::Delete))?;
                tracing::info!(namespace = %target.namespace, name = %target.name, "Deleted Route");
            }
            Some(_) => {
                tracing::debug!(namespace = %target.namespace, name = %target.name, "Ignoring unmanaged Route");
            }
            None => {}
        }

        annotate(&self.store, svc, AnnotationPatch::unexpose(svc)).await
    }
}
