//! The object store seam: everything the strategies read or write goes
//! through [`Store`].

use crate::k8s::{
    Api, Client, DeleteParams, ErrorResponse, NamespaceResourceScope, Patch, PatchParams,
    PostParams, Resource, ResourceExt,
};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::{fmt::Debug, sync::Arc};
use thiserror::Error;

const FIELD_MANAGER: &str = "expose-controller";

/// A namespaced Kubernetes object the store can read and write.
pub trait Object:
    Resource<Scope = NamespaceResourceScope, DynamicType = ()>
    + Clone
    + Debug
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
}

impl<K> Object for K where
    K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>
        + Clone
        + Debug
        + Serialize
        + DeserializeOwned
        + Send
        + Sync
        + 'static
{
}

#[derive(Debug, Error)]
pub enum StoreError {
    /// The write carried a stale resource version, or the object already
    /// exists.
    #[error("the object was modified since it was read")]
    Conflict,

    #[error("the object does not exist")]
    NotFound,

    #[error(transparent)]
    Unavailable(kube::Error),
}

/// Reads and writes namespaced objects.
///
/// `replace` must be rejected with [`StoreError::Conflict`] when the object's
/// resource version no longer matches the stored one. `patch` applies a JSON
/// merge patch.
#[async_trait]
pub trait Store: Send + Sync {
    async fn get<K: Object>(&self, namespace: &str, name: &str) -> Result<Option<K>, StoreError>;

    async fn create<K: Object>(&self, obj: &K) -> Result<K, StoreError>;

    async fn replace<K: Object>(&self, obj: &K) -> Result<K, StoreError>;

    async fn patch<K: Object>(
        &self,
        namespace: &str,
        name: &str,
        patch: &serde_json::Value,
    ) -> Result<K, StoreError>;

    /// Deleting an object that does not exist succeeds.
    async fn delete<K: Object>(&self, namespace: &str, name: &str) -> Result<(), StoreError>;
}

/// A [`Store`] backed by the Kubernetes API.
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

// === impl StoreError ===

impl From<kube::Error> for StoreError {
    fn from(error: kube::Error) -> Self {
        match error {
            kube::Error::Api(ErrorResponse { code: 409, .. }) => Self::Conflict,
            kube::Error::Api(ErrorResponse { code: 404, .. }) => Self::NotFound,
            error => Self::Unavailable(error),
        }
    }
}

// === impl Store ===

#[async_trait]
impl<S: Store> Store for Arc<S> {
    async fn get<K: Object>(&self, namespace: &str, name: &str) -> Result<Option<K>, StoreError> {
        (**self).get(namespace, name).await
    }

    async fn create<K: Object>(&self, obj: &K) -> Result<K, StoreError> {
        (**self).create(obj).await
    }

    async fn replace<K: Object>(&self, obj: &K) -> Result<K, StoreError> {
        (**self).replace(obj).await
    }

    async fn patch<K: Object>(
        &self,
        namespace: &str,
        name: &str,
        patch: &serde_json::Value,
    ) -> Result<K, StoreError> {
        (**self).patch(namespace, name, patch).await
    }

    async fn delete<K: Object>(&self, namespace: &str, name: &str) -> Result<(), StoreError> {
        (**self).delete::<K>(namespace, name).await
    }
}

// === impl KubeStore ===

impl KubeStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api<K: Object>(&self, namespace: &str) -> Api<K> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn post_params() -> PostParams {
        PostParams {
            field_manager: Some(FIELD_MANAGER.to_string()),
            ..Default::default()
        }
    }
}

#[async_trait]
impl Store for KubeStore {
    async fn get<K: Object>(&self, namespace: &str, name: &str) -> Result<Option<K>, StoreError> {
        Ok(self.api::<K>(namespace).get_opt(name).await?)
    }

    async fn create<K: Object>(&self, obj: &K) -> Result<K, StoreError> {
        let namespace = obj.namespace().unwrap_or_default();
        Ok(self
            .api::<K>(&namespace)
            .create(&Self::post_params(), obj)
            .await?)
    }

    async fn replace<K: Object>(&self, obj: &K) -> Result<K, StoreError> {
        let namespace = obj.namespace().unwrap_or_default();
        Ok(self
            .api::<K>(&namespace)
            .replace(&obj.name_any(), &Self::post_params(), obj)
            .await?)
    }

    async fn patch<K: Object>(
        &self,
        namespace: &str,
        name: &str,
        patch: &serde_json::Value,
    ) -> Result<K, StoreError> {
        let params = PatchParams {
            field_manager: Some(FIELD_MANAGER.to_string()),
            ..Default::default()
        };
        Ok(self
            .api::<K>(namespace)
            .patch(name, &params, &Patch::Merge(patch))
            .await?)
    }

    async fn delete<K: Object>(&self, namespace: &str, name: &str) -> Result<(), StoreError> {
        match self
            .api::<K>(namespace)
            .delete(name, &DeleteParams::default())
            .await
            .map_err(StoreError::from)
        {
            Ok(_) | Err(StoreError::NotFound) => Ok(()),
            Err(error) => Err(error),
        }
    }
}
