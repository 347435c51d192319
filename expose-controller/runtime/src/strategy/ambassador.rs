use super::{annotate, resolve, ExposeStrategy};
use crate::{
    core::{mapping, AnnotationPatch, StrategyConfig},
    error::Error,
    k8s::{annotations, ResourceExt, Service},
    store::Store,
};
use async_trait::async_trait;
use std::sync::Arc;

/// Publishes an Ambassador mapping as an annotation on the service itself.
pub struct AmbassadorStrategy<S> {
    store: S,
    config: Arc<StrategyConfig>,
}

impl<S: Store> AmbassadorStrategy<S> {
    pub fn new(store: S, config: Arc<StrategyConfig>) -> Self {
        Self { store, config }
    }
}

#[async_trait]
impl<S: Store> ExposeStrategy for AmbassadorStrategy<S> {
    async fn expose(&self, svc: &Service) -> Result<(), Error> {
        let exposure = resolve(svc, &self.config)?;
        let config = mapping::config(svc, &exposure).map_err(|source| Error::Mapping {
            namespace: svc.namespace().unwrap_or_default(),
            name: svc.name_any(),
            source,
        })?;

        let mut patch =
            AnnotationPatch::expose_url(svc, &exposure.host.full_hostname, exposure.scheme());
        patch.set(annotations::AMBASSADOR_CONFIG, config);
        annotate(&self.store, svc, patch).await
    }

    async fn unexpose(&self, svc: &Service) -> Result<(), Error> {
        let mut patch = AnnotationPatch::unexpose(svc);
        patch.remove(annotations::AMBASSADOR_CONFIG);
        annotate(&self.store, svc, patch).await
    }
}
