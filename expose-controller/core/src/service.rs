use crate::host::url_join;
use expose_controller_k8s_api::{annotations, Service};
use std::collections::BTreeMap;

/// Annotation changes to record, or withdraw, a service's external URL.
///
/// `None` removes a key. The patch is reduced against the service before it
/// is sent, so that only keys whose value actually changes are written.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AnnotationPatch(BTreeMap<String, Option<String>>);

// === impl AnnotationPatch ===

impl AnnotationPatch {
    /// Records `<scheme>://<full hostname>` as the expose URL.
    ///
    /// An `api.service` path on the service is appended to the URL, and an
    /// `exposeHostNameAs` annotation names a key that receives the bare
    /// hostname.
    pub fn expose_url(svc: &Service, full_hostname: &str, scheme: &str) -> Self {
        let annotations = svc.metadata.annotations.as_ref();
        let mut url = format!("{scheme}://{full_hostname}");
        if let Some(path) = annotations::get(annotations, annotations::API_SERVICE_PATH) {
            url = url_join(&[&url, path]);
        }

        let mut patch = Self::default();
        patch.set(annotations::EXPOSE_URL, url);
        if let Some(key) = annotations::get(annotations, annotations::EXPOSE_HOST_NAME_AS) {
            let hostname = full_hostname.split('/').next().unwrap_or(full_hostname);
            patch.set(key, hostname);
        }
        patch
    }

    /// Withdraws the expose URL and the hostname copy, if any.
    pub fn unexpose(svc: &Service) -> Self {
        let mut patch = Self::default();
        patch.remove(annotations::EXPOSE_URL);
        if let Some(key) = annotations::get(
            svc.metadata.annotations.as_ref(),
            annotations::EXPOSE_HOST_NAME_AS,
        ) {
            patch.remove(key);
        }
        patch
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.0.insert(key.into(), Some(value.into()));
        self
    }

    pub fn remove(&mut self, key: impl Into<String>) -> &mut Self {
        self.0.insert(key.into(), None);
        self
    }

    /// Builds a JSON merge patch holding only the keys that differ from the
    /// service's current annotations. Returns `None` when there is nothing
    /// to write.
    pub fn into_merge_patch(self, svc: &Service) -> Option<serde_json::Value> {
        let current = svc.metadata.annotations.as_ref();
        let changes = self
            .0
            .into_iter()
            .filter(|(key, value)| current.and_then(|c| c.get(key)) != value.as_ref())
            .map(|(key, value)| (key, value.map_or(serde_json::Value::Null, Into::into)))
            .collect::<serde_json::Map<_, _>>();

        if changes.is_empty() {
            return None;
        }
        Some(serde_json::json!({ "metadata": { "annotations": changes } }))
    }
}
