use expose_controller_k8s_api::{annotations, ResourceExt, Service};
use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PortError {
    #[error("service declares no ports")]
    NoPorts,
}

/// The backend port a service is exposed on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedPort {
    pub port: i32,
    /// Set when the `exposePort` annotation was ignored in favor of the
    /// first declared port.
    pub fallback: Option<PortFallback>,
}

/// Why an `exposePort` annotation could not be honored.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PortFallback {
    NotANumber(String),
    NotDeclared(i32),
}

/// Picks the port named by the `exposePort` annotation if the service
/// declares it, or else the first declared port.
///
/// An unusable annotation is logged and reported as a fallback, never as an
/// error; only a service without ports cannot be exposed.
pub fn resolve(svc: &Service) -> Result<ResolvedPort, PortError> {
    let declared = svc
        .spec
        .as_ref()
        .and_then(|spec| spec.ports.as_deref())
        .unwrap_or_default();
    let first = declared.first().ok_or(PortError::NoPorts)?.port;

    let requested = match annotations::get(svc.metadata.annotations.as_ref(), annotations::EXPOSE_PORT)
    {
        Some(requested) => requested,
        None => {
            return Ok(ResolvedPort {
                port: first,
                fallback: None,
            })
        }
    };

    let fallback = match requested.trim().parse::<i32>() {
        Ok(port) if declared.iter().any(|p| p.port == port) => {
            return Ok(ResolvedPort {
                port,
                fallback: None,
            })
        }
        Ok(port) => PortFallback::NotDeclared(port),
        Err(_) => PortFallback::NotANumber(requested.to_string()),
    };

    tracing::warn!(
        namespace = %svc.namespace().unwrap_or_default(),
        name = %svc.name_any(),
        annotation = annotations::EXPOSE_PORT,
        ?fallback,
        port = first,
        "Ignoring exposed port annotation; using the first declared port",
    );
    Ok(ResolvedPort {
        port: first,
        fallback: Some(fallback),
    })
}
