use crate::config::{PathMode, StrategyConfig};
use expose_controller_k8s_api::{annotations, ResourceExt, Service};

/// Where an exposed service is reachable.
///
/// Resolution is a pure function of the service and the strategy
/// configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HostPath {
    /// Name of the routing resource. Also the default host name subject.
    pub app_name: String,
    /// Host matched by the routing rule.
    pub hostname: String,
    pub path: String,
    pub tls_hostname: String,
    /// Host name and path, as recorded in the expose URL.
    pub full_hostname: String,
    pub alias_hostname: Option<String>,
    pub path_mode: PathMode,
}

impl HostPath {
    pub fn resolve(svc: &Service, config: &StrategyConfig) -> Self {
        let annotations = svc.metadata.annotations.as_ref();
        let namespace = svc.namespace().unwrap_or_default();
        let app_name = app_name(svc);
        let subject = annotations::get(annotations, annotations::HOST_NAME).unwrap_or(&app_name);

        let domain = match config.internal_domain.as_deref() {
            Some(internal) if annotations::is_true(annotations, annotations::USE_INTERNAL_DOMAIN) => {
                internal
            }
            _ => config.domain.as_str(),
        };

        let hostname = config.url_template.render(subject, &namespace, domain);
        let tls_hostname = if config.tls_use_wildcard {
            format!("*.{domain}")
        } else {
            hostname.clone()
        };
        let alias_hostname = config
            .alias_domain
            .as_deref()
            .map(|alias| config.url_template.render(subject, &namespace, alias));

        let path_mode = match annotations::get(annotations, annotations::PATH_MODE) {
            Some(mode) => mode.parse().unwrap_or_else(|error| {
                tracing::warn!(%namespace, name = %svc.name_any(), %error, "Ignoring path mode annotation");
                config.path_mode
            }),
            None => config.path_mode,
        };

        let explicit_path = annotations::get(annotations, annotations::INGRESS_PATH);
        let (hostname, path, full_hostname) = match path_mode {
            PathMode::Path => {
                let path = url_join(&["/", &namespace, &app_name, explicit_path.unwrap_or("/")]);
                let full_hostname = url_join(&[domain, &path]);
                (domain.to_string(), path, full_hostname)
            }
            PathMode::Host => {
                let full_hostname = hostname.clone();
                let path = explicit_path.unwrap_or_default().to_string();
                (hostname, path, full_hostname)
            }
        };

        Self {
            app_name,
            hostname,
            path,
            tls_hostname,
            full_hostname,
            alias_hostname,
            path_mode,
        }
    }
}

/// The name of the routing resource generated for a service.
///
/// An explicit `ingress.name` annotation wins; otherwise the service name,
/// without the `<release>-` prefix when the service carries a `release`
/// label.
pub fn app_name(svc: &Service) -> String {
    if let Some(name) = annotations::get(svc.metadata.annotations.as_ref(), annotations::INGRESS_NAME)
    {
        return name.to_string();
    }

    let name = svc.name_any();
    match annotations::get(svc.metadata.labels.as_ref(), annotations::RELEASE_LABEL) {
        Some(release) => match name.strip_prefix(&format!("{release}-")) {
            Some(stripped) => stripped.to_string(),
            None => name,
        },
        None => name,
    }
}

/// Joins URL segments with exactly one `/` between each.
pub fn url_join(parts: &[&str]) -> String {
    let mut url = String::new();
    for part in parts.iter().filter(|p| !p.is_empty()) {
        match (url.ends_with('/'), part.starts_with('/')) {
            (true, true) => url.push_str(&part[1..]),
            (false, false) if !url.is_empty() => {
                url.push('/');
                url.push_str(part);
            }
            _ => url.push_str(part),
        }
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UrlTemplate;
    use expose_controller_k8s_api::ObjectMeta;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn service(annotations: &[(&str, &str)], labels: &[(&str, &str)]) -> Service {
        Service {
            metadata: ObjectMeta {
                namespace: Some("my-namespace".to_string()),
                name: Some("my-service".to_string()),
                annotations: Some(
                    annotations
                        .iter()
                        .map(|(k, v)| (k.to_string(), v.to_string()))
                        .collect(),
                ),
                labels: Some(
                    labels
                        .iter()
                        .map(|(k, v)| (k.to_string(), v.to_string()))
                        .collect(),
                ),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn config() -> StrategyConfig {
        StrategyConfig {
            domain: "my-domain.com".to_string(),
            internal_domain: Some("my-internal-domain.com".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn host_mode_defaults() {
        let host = HostPath::resolve(&service(&[], &[]), &config());
        assert_eq!(
            host,
            HostPath {
                app_name: "my-service".to_string(),
                hostname: "my-service.my-namespace.my-domain.com".to_string(),
                path: "".to_string(),
                tls_hostname: "my-service.my-namespace.my-domain.com".to_string(),
                full_hostname: "my-service.my-namespace.my-domain.com".to_string(),
                alias_hostname: None,
                path_mode: PathMode::Host,
            }
        );
    }

    #[test]
    fn explicit_names_and_path() {
        let svc = service(
            &[
                (annotations::INGRESS_NAME, "my-ingress"),
                (annotations::HOST_NAME, "my-hostname"),
                (annotations::INGRESS_PATH, "/my-path"),
            ],
            &[],
        );
        let config = StrategyConfig {
            url_template: UrlTemplate::parse("%s-%s.%s").unwrap(),
            ..config()
        };

        let host = HostPath::resolve(&svc, &config);
        assert_eq!(host.app_name, "my-ingress");
        assert_eq!(host.hostname, "my-hostname-my-namespace.my-domain.com");
        assert_eq!(host.path, "/my-path");
        assert_eq!(host.full_hostname, "my-hostname-my-namespace.my-domain.com");
    }

    #[test]
    fn path_mode_uses_bare_domain() {
        let config = StrategyConfig {
            path_mode: PathMode::Path,
            ..config()
        };
        let host = HostPath::resolve(&service(&[], &[]), &config);

        assert_eq!(host.hostname, "my-domain.com");
        assert_eq!(host.path, "/my-namespace/my-service/");
        assert_eq!(host.full_hostname, "my-domain.com/my-namespace/my-service/");
    }

    #[test]
    fn path_mode_annotation_overrides_config() {
        let svc = service(
            &[
                (annotations::PATH_MODE, "path"),
                (annotations::INGRESS_PATH, "api"),
            ],
            &[],
        );
        let host = HostPath::resolve(&svc, &config());

        assert_eq!(host.path_mode, PathMode::Path);
        assert_eq!(host.path, "/my-namespace/my-service/api");
        assert_eq!(host.full_hostname, "my-domain.com/my-namespace/my-service/api");
    }

    #[rstest]
    #[case::internal("true", "my-service.my-namespace.my-internal-domain.com")]
    #[case::not_requested("false", "my-service.my-namespace.my-domain.com")]
    fn internal_domain(#[case] use_internal: &str, #[case] expected: &str) {
        let svc = service(&[(annotations::USE_INTERNAL_DOMAIN, use_internal)], &[]);
        assert_eq!(HostPath::resolve(&svc, &config()).hostname, expected);
    }

    #[test]
    fn internal_domain_requires_configuration() {
        let svc = service(&[(annotations::USE_INTERNAL_DOMAIN, "true")], &[]);
        let config = StrategyConfig {
            internal_domain: None,
            ..config()
        };
        assert_eq!(
            HostPath::resolve(&svc, &config).hostname,
            "my-service.my-namespace.my-domain.com"
        );
    }

    #[test]
    fn wildcard_tls_host() {
        let config = StrategyConfig {
            tls_use_wildcard: true,
            ..config()
        };
        let host = HostPath::resolve(&service(&[], &[]), &config);
        assert_eq!(host.tls_hostname, "*.my-domain.com");
        assert_eq!(host.hostname, "my-service.my-namespace.my-domain.com");
    }

    #[test]
    fn alias_host() {
        let config = StrategyConfig {
            domain: "d1".to_string(),
            alias_domain: Some("d2".to_string()),
            url_template: UrlTemplate::parse("%s.%s.%s").unwrap(),
            ..Default::default()
        };
        let mut svc = service(&[], &[]);
        svc.metadata.name = Some("svc".to_string());
        svc.metadata.namespace = Some("n".to_string());

        let host = HostPath::resolve(&svc, &config);
        assert_eq!(host.hostname, "svc.n.d1");
        assert_eq!(host.alias_hostname.as_deref(), Some("svc.n.d2"));
    }

    #[rstest]
    #[case::release_prefix(&[("release", "my")], "service")]
    #[case::unrelated_release(&[("release", "other")], "my-service")]
    #[case::no_release(&[], "my-service")]
    fn app_names(#[case] labels: &[(&str, &str)], #[case] expected: &str) {
        assert_eq!(app_name(&service(&[], labels)), expected);
    }

    #[test]
    fn ingress_name_wins_over_release() {
        let svc = service(
            &[(annotations::INGRESS_NAME, "explicit")],
            &[("release", "my")],
        );
        assert_eq!(app_name(&svc), "explicit");
    }

    #[rstest]
    #[case(&["/", "ns", "app", "/"], "/ns/app/")]
    #[case(&["/", "ns", "app", "/api"], "/ns/app/api")]
    #[case(&["host.com", "/ns/app/"], "host.com/ns/app/")]
    #[case(&["http://host.com/", "/api"], "http://host.com/api")]
    #[case(&["http://host.com", ""], "http://host.com")]
    fn joins_urls(#[case] parts: &[&str], #[case] expected: &str) {
        assert_eq!(url_join(parts), expected);
    }
}
