//! Ambassador configuration carried by the service itself.

use crate::exposure::Exposure;
use expose_controller_k8s_api::{ResourceExt, Service};
use serde::{Deserialize, Serialize};

const API_VERSION: &str = "ambassador/v1";

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct Mapping {
    api_version: String,
    kind: String,
    name: String,
    prefix: String,
    host: String,
    service: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct TlsModule {
    api_version: String,
    kind: String,
    name: String,
    config: TlsModuleConfig,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
struct TlsModuleConfig {
    server: TlsServer,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
struct TlsServer {
    enabled: String,
    secret: String,
}

/// Renders the `getambassador.io/config` annotation value: a `Mapping`
/// document routing the exposed host and path to the service, followed by a
/// TLS `Module` document when TLS is enabled.
pub fn config(svc: &Service, exposure: &Exposure) -> Result<String, serde_yaml::Error> {
    let host = &exposure.host;
    let namespace = svc.namespace().unwrap_or_default();
    let prefix = if host.path.is_empty() {
        "/".to_string()
    } else {
        host.path.clone()
    };

    let mapping = Mapping {
        api_version: API_VERSION.to_string(),
        kind: "Mapping".to_string(),
        name: format!("{}_{namespace}_mapping", host.hostname),
        prefix,
        host: host.hostname.clone(),
        service: format!("{}.{namespace}:{}", svc.name_any(), exposure.port),
    };
    let mut out = document(&mapping)?;

    if let Some(tls) = exposure.tls.as_ref() {
        let module = TlsModule {
            api_version: API_VERSION.to_string(),
            kind: "Module".to_string(),
            name: "tls".to_string(),
            config: TlsModuleConfig {
                server: TlsServer {
                    enabled: "True".to_string(),
                    secret: tls.secret_name.clone(),
                },
            },
        };
        out.push_str(&document(&module)?);
    }

    Ok(out)
}

fn document<T: Serialize>(value: &T) -> Result<String, serde_yaml::Error> {
    let yaml = serde_yaml::to_string(value)?;
    let body = yaml.strip_prefix("---\n").unwrap_or(&yaml);
    Ok(format!("---\n{body}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PathMode, StrategyConfig};
    use expose_controller_k8s_api::{ObjectMeta, ServicePort, ServiceSpec};
    use pretty_assertions::assert_eq;

    fn service() -> Service {
        Service {
            metadata: ObjectMeta {
                namespace: Some("ns".to_string()),
                name: Some("app".to_string()),
                ..Default::default()
            },
            spec: Some(ServiceSpec {
                ports: Some(vec![ServicePort {
                    port: 8080,
                    ..Default::default()
                }]),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn documents(config: &str) -> Vec<serde_yaml::Value> {
        assert!(config.starts_with("---\n"));
        config
            .split("---\n")
            .filter(|doc| !doc.trim().is_empty())
            .map(|doc| serde_yaml::from_str(doc).expect("document must parse"))
            .collect()
    }

    #[test]
    fn mapping_only() {
        let config = StrategyConfig {
            domain: "example.com".to_string(),
            ..Default::default()
        };
        let exposure = Exposure::resolve(&service(), &config).unwrap();
        let docs = documents(&super::config(&service(), &exposure).unwrap());

        assert_eq!(docs.len(), 1);
        let mapping: Mapping = serde_yaml::from_value(docs[0].clone()).unwrap();
        assert_eq!(
            mapping,
            Mapping {
                api_version: "ambassador/v1".to_string(),
                kind: "Mapping".to_string(),
                name: "app.ns.example.com_ns_mapping".to_string(),
                prefix: "/".to_string(),
                host: "app.ns.example.com".to_string(),
                service: "app.ns:8080".to_string(),
            }
        );
    }

    #[test]
    fn path_mode_and_tls_module() {
        let config = StrategyConfig {
            domain: "example.com".to_string(),
            path_mode: PathMode::Path,
            tls_secret_name: Some("wildcard".to_string()),
            ..Default::default()
        };
        let exposure = Exposure::resolve(&service(), &config).unwrap();
        let docs = documents(&super::config(&service(), &exposure).unwrap());

        assert_eq!(docs.len(), 2);
        let mapping: Mapping = serde_yaml::from_value(docs[0].clone()).unwrap();
        assert_eq!(mapping.host, "example.com");
        assert_eq!(mapping.prefix, "/ns/app/");

        let module: TlsModule = serde_yaml::from_value(docs[1].clone()).unwrap();
        assert_eq!(module.kind, "Module");
        assert_eq!(
            module.config.server,
            TlsServer {
                enabled: "True".to_string(),
                secret: "wildcard".to_string(),
            }
        );
    }
}
