use crate::{
    config::{PathMode, StrategyConfig},
    exposure::Exposure,
};
use expose_controller_k8s_api::{
    annotations, HTTPIngressPath, HTTPIngressRuleValue, Ingress, IngressBackend, IngressRule,
    IngressServiceBackend, IngressSpec, IngressTLS, ResourceExt, Service, ServiceBackendPort,
};
use thiserror::Error;

const PATH_TYPE: &str = "ImplementationSpecific";

/// Ingress class forced in path mode, where rules rely on nginx path handling.
const PATH_MODE_INGRESS_CLASS: &str = "nginx";

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AnnotationError {
    #[error("line {line} of the ingress annotations has no `key: value` separator: {text:?}")]
    MissingSeparator { line: usize, text: String },

    #[error("line {line} of the ingress annotations has an empty key")]
    EmptyKey { line: usize },
}

/// Builds the Ingress a service should have.
///
/// The result carries the managed marker, the provider label, an owner
/// reference to the service and exactly one rule with one path, routing the
/// resolved host and path to the service's exposed port.
pub fn desired(
    svc: &Service,
    exposure: &Exposure,
    config: &StrategyConfig,
) -> Result<Ingress, AnnotationError> {
    let host = &exposure.host;
    let mut metadata = exposure.metadata(svc);
    let annotations = metadata.annotations.get_or_insert_with(Default::default);

    let class = match host.path_mode {
        PathMode::Path => Some(PATH_MODE_INGRESS_CLASS),
        PathMode::Host => config.ingress_class.as_deref(),
    };
    if let Some(class) = class {
        annotations.insert(annotations::INGRESS_CLASS.to_string(), class.to_string());
        annotations.insert(annotations::NGINX_INGRESS_CLASS.to_string(), class.to_string());
    }

    if exposure.tls.as_ref().is_some_and(|tls| tls.acme) {
        annotations.insert(annotations::TLS_ACME.to_string(), "true".to_string());
    }

    if let Some(alias) = host.alias_hostname.as_deref() {
        annotations.insert(
            annotations::SERVER_ALIAS.to_string(),
            format!("{}, {}", host.hostname, alias),
        );
    }

    if let Some(list) =
        annotations::get(svc.metadata.annotations.as_ref(), annotations::INGRESS_ANNOTATIONS)
    {
        annotations.extend(parse_annotation_list(list)?);
    }

    let rule = IngressRule {
        host: Some(host.hostname.clone()),
        http: Some(HTTPIngressRuleValue {
            paths: vec![path(&host.path, &svc.name_any(), exposure.port)],
        }),
    };
    let tls = exposure.tls.as_ref().map(|tls| {
        vec![IngressTLS {
            hosts: Some(vec![host.tls_hostname.clone()]),
            secret_name: Some(tls.secret_name.clone()),
        }]
    });

    Ok(Ingress {
        metadata,
        spec: Some(IngressSpec {
            rules: Some(vec![rule]),
            tls,
            ..Default::default()
        }),
        status: None,
    })
}

/// A path entry routing `path` to `service:port`. An empty path is left
/// unset.
pub fn path(path: &str, service: &str, port: i32) -> HTTPIngressPath {
    HTTPIngressPath {
        path: (!path.is_empty()).then(|| path.to_string()),
        path_type: PATH_TYPE.to_string(),
        backend: IngressBackend {
            service: Some(IngressServiceBackend {
                name: service.to_string(),
                port: Some(ServiceBackendPort {
                    number: Some(port),
                    name: None,
                }),
            }),
            resource: None,
        },
    }
}

/// Parses a newline separated list of `key: value` pairs.
///
/// Keys and values are trimmed and blank lines skipped. Callers that collect
/// the pairs into a map get later entries overriding earlier ones.
pub fn parse_annotation_list(list: &str) -> Result<Vec<(String, String)>, AnnotationError> {
    list.lines()
        .enumerate()
        .filter(|(_, text)| !text.trim().is_empty())
        .map(|(i, text)| {
            let line = i + 1;
            let (key, value) = text
                .split_once(':')
                .ok_or_else(|| AnnotationError::MissingSeparator {
                    line,
                    text: text.to_string(),
                })?;
            let key = key.trim();
            if key.is_empty() {
                return Err(AnnotationError::EmptyKey { line });
            }
            Ok((key.to_string(), value.trim().to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UrlTemplate;
    use expose_controller_k8s_api::{ObjectMeta, OwnerReference, ServicePort, ServiceSpec};
    use maplit::{btreemap, convert_args};
    use pretty_assertions::assert_eq;

    fn service(annotations: &[(&str, &str)], ports: &[i32]) -> Service {
        Service {
            metadata: ObjectMeta {
                namespace: Some("my-namespace".to_string()),
                name: Some("my-service".to_string()),
                uid: Some("uid-1".to_string()),
                annotations: Some(
                    annotations
                        .iter()
                        .map(|(k, v)| (k.to_string(), v.to_string()))
                        .collect(),
                ),
                ..Default::default()
            },
            spec: Some(ServiceSpec {
                ports: Some(
                    ports
                        .iter()
                        .map(|&port| ServicePort {
                            port,
                            ..Default::default()
                        })
                        .collect(),
                ),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn build(svc: &Service, config: &StrategyConfig) -> Result<Ingress, AnnotationError> {
        let exposure = Exposure::resolve(svc, config).expect("service must resolve");
        desired(svc, &exposure, config)
    }

    fn config() -> StrategyConfig {
        StrategyConfig {
            domain: "my-domain.com".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn plain_ingress() {
        let ingress = build(&service(&[], &[1234]), &config()).unwrap();

        assert_eq!(
            ingress,
            Ingress {
                metadata: ObjectMeta {
                    namespace: Some("my-namespace".to_string()),
                    name: Some("my-service".to_string()),
                    annotations: Some(convert_args!(btreemap!(
                        "fabric8.io/generated-by" => "exposecontroller",
                    ))),
                    labels: Some(convert_args!(btreemap!("provider" => "fabric8"))),
                    owner_references: Some(vec![OwnerReference {
                        api_version: "v1".to_string(),
                        kind: "Service".to_string(),
                        name: "my-service".to_string(),
                        uid: "uid-1".to_string(),
                        ..Default::default()
                    }]),
                    ..Default::default()
                },
                spec: Some(IngressSpec {
                    rules: Some(vec![IngressRule {
                        host: Some("my-service.my-namespace.my-domain.com".to_string()),
                        http: Some(HTTPIngressRuleValue {
                            paths: vec![path("", "my-service", 1234)],
                        }),
                    }]),
                    tls: None,
                    ..Default::default()
                }),
                status: None,
            }
        );
    }

    #[test]
    fn service_annotations_and_tls() {
        let svc = service(
            &[
                (annotations::INGRESS_NAME, "my-ingress"),
                (annotations::HOST_NAME, "my-hostname"),
                (annotations::INGRESS_PATH, "/my-path"),
                (
                    annotations::INGRESS_ANNOTATIONS,
                    "annotation-1: value-1\nannotation-2: value-2",
                ),
            ],
            &[1234, 5678],
        );
        let config = StrategyConfig {
            url_template: UrlTemplate::parse("%s-%s.%s").unwrap(),
            tls_secret_name: Some("my-secret".to_string()),
            ..config()
        };

        let ingress = build(&svc, &config).unwrap();
        assert_eq!(ingress.metadata.name.as_deref(), Some("my-ingress"));
        assert_eq!(
            ingress.metadata.annotations,
            Some(convert_args!(btreemap!(
                "fabric8.io/generated-by" => "exposecontroller",
                "annotation-1" => "value-1",
                "annotation-2" => "value-2",
            )))
        );

        let spec = ingress.spec.unwrap();
        assert_eq!(
            spec.rules,
            Some(vec![IngressRule {
                host: Some("my-hostname-my-namespace.my-domain.com".to_string()),
                http: Some(HTTPIngressRuleValue {
                    paths: vec![path("/my-path", "my-service", 1234)],
                }),
            }])
        );
        assert_eq!(
            spec.tls,
            Some(vec![IngressTLS {
                hosts: Some(vec!["my-hostname-my-namespace.my-domain.com".to_string()]),
                secret_name: Some("my-secret".to_string()),
            }])
        );
    }

    #[test]
    fn acme_default_secret() {
        let config = StrategyConfig {
            tls_acme: true,
            ..config()
        };
        let mut svc = service(&[], &[80]);
        svc.metadata.name = Some("app".to_string());

        let ingress = build(&svc, &config).unwrap();
        assert_eq!(
            ingress.annotations().get(annotations::TLS_ACME).map(String::as_str),
            Some("true")
        );
        let tls = ingress.spec.unwrap().tls.unwrap();
        assert_eq!(tls[0].secret_name.as_deref(), Some("tls-app"));
    }

    #[test]
    fn ingress_class() {
        let config = StrategyConfig {
            ingress_class: Some("public".to_string()),
            ..config()
        };
        let ingress = build(&service(&[], &[80]), &config).unwrap();
        assert_eq!(ingress.annotations()[annotations::INGRESS_CLASS], "public");
        assert_eq!(ingress.annotations()[annotations::NGINX_INGRESS_CLASS], "public");
    }

    #[test]
    fn path_mode_forces_nginx_class() {
        let config = StrategyConfig {
            ingress_class: Some("public".to_string()),
            path_mode: PathMode::Path,
            ..config()
        };
        let ingress = build(&service(&[], &[80]), &config).unwrap();
        assert_eq!(ingress.annotations()[annotations::INGRESS_CLASS], "nginx");
        assert_eq!(ingress.annotations()[annotations::NGINX_INGRESS_CLASS], "nginx");

        let rule = &ingress.spec.unwrap().rules.unwrap()[0];
        assert_eq!(rule.host.as_deref(), Some("my-domain.com"));
        assert_eq!(
            rule.http.as_ref().unwrap().paths[0].path.as_deref(),
            Some("/my-namespace/my-service/")
        );
    }

    #[test]
    fn alias_domain_annotation() {
        let config = StrategyConfig {
            alias_domain: Some("my-alias-domain.com".to_string()),
            ..config()
        };
        let ingress = build(&service(&[], &[1234]), &config).unwrap();
        assert_eq!(
            ingress.annotations()[annotations::SERVER_ALIAS],
            "my-service.my-namespace.my-domain.com, my-service.my-namespace.my-alias-domain.com"
        );
        assert_eq!(
            ingress.spec.unwrap().rules.unwrap()[0].host.as_deref(),
            Some("my-service.my-namespace.my-domain.com")
        );
    }

    #[test]
    fn annotation_list_overrides() {
        assert_eq!(
            parse_annotation_list("a: 1\n\n  b :  two words \na: 3\n").unwrap(),
            vec![
                ("a".to_string(), "1".to_string()),
                ("b".to_string(), "two words".to_string()),
                ("a".to_string(), "3".to_string()),
            ]
        );

        let svc = service(&[(annotations::INGRESS_ANNOTATIONS, "a: 1\na: 3")], &[80]);
        let ingress = build(&svc, &config()).unwrap();
        assert_eq!(ingress.annotations()["a"], "3");
    }

    #[test]
    fn annotation_values_may_contain_colons() {
        assert_eq!(
            parse_annotation_list("nginx.ingress.kubernetes.io/proxy-pass: http://a:8080").unwrap(),
            vec![(
                "nginx.ingress.kubernetes.io/proxy-pass".to_string(),
                "http://a:8080".to_string()
            )]
        );
    }

    #[test]
    fn malformed_annotation_list() {
        let svc = service(
            &[(annotations::INGRESS_ANNOTATIONS, "a: 1\nbroken line")],
            &[80],
        );
        assert_eq!(
            build(&svc, &config()),
            Err(AnnotationError::MissingSeparator {
                line: 2,
                text: "broken line".to_string(),
            })
        );
        assert_eq!(
            parse_annotation_list(": value"),
            Err(AnnotationError::EmptyKey { line: 1 })
        );
    }
}
