use crate::{core::ExposureError, store::StoreError};
use std::fmt;
use thiserror::Error;

/// Why a service could not be exposed or unexposed.
#[derive(Debug, Error)]
pub enum Error {
    #[error("service {namespace}/{name} cannot be exposed: {source}")]
    Exposure {
        namespace: String,
        name: String,
        source: ExposureError,
    },

    #[error("{kind} {namespace}/{name} already exists and is not managed by the expose controller")]
    Foreign {
        kind: &'static str,
        namespace: String,
        name: String,
    },

    #[error("failed to {op} {kind} {namespace}/{name}: {source}")]
    Store {
        op: Op,
        kind: &'static str,
        namespace: String,
        name: String,
        source: StoreError,
    },

    #[error("failed to render the ambassador config of service {namespace}/{name}: {source}")]
    Mapping {
        namespace: String,
        name: String,
        source: serde_yaml::Error,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Op {
    Get,
    Create,
    Replace,
    Patch,
    Delete,
}

// === impl Error ===

impl Error {
    /// Conflicts and store outages may succeed when the service is next
    /// reconciled; everything else needs the service or its target fixed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Store {
                source: StoreError::Conflict | StoreError::Unavailable(_),
                ..
            }
        )
    }

    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::Foreign { .. }
                | Self::Store {
                    source: StoreError::Conflict,
                    ..
                }
        )
    }
}

// === impl Op ===

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => f.write_str("get"),
            Self::Create => f.write_str("create"),
            Self::Replace => f.write_str("replace"),
            Self::Patch => f.write_str("patch"),
            Self::Delete => f.write_str("delete"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::PortError;

    fn store(source: StoreError) -> Error {
        Error::Store {
            op: Op::Replace,
            kind: "Ingress",
            namespace: "ns".to_string(),
            name: "app".to_string(),
            source,
        }
    }

    #[test]
    fn retryable() {
        assert!(store(StoreError::Conflict).is_retryable());
        assert!(!store(StoreError::NotFound).is_retryable());

        let foreign = Error::Foreign {
            kind: "Ingress",
            namespace: "ns".to_string(),
            name: "app".to_string(),
        };
        assert!(!foreign.is_retryable());
        assert!(foreign.is_conflict());

        let exposure = Error::Exposure {
            namespace: "ns".to_string(),
            name: "app".to_string(),
            source: PortError::NoPorts.into(),
        };
        assert!(!exposure.is_retryable());
        assert!(!exposure.is_conflict());
    }

    #[test]
    fn messages() {
        assert_eq!(
            store(StoreError::Conflict).to_string(),
            "failed to replace Ingress ns/app: the object was modified since it was read"
        );
    }
}
