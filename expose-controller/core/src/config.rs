use std::{collections::BTreeMap, fmt, str::FromStr};
use thiserror::Error;

/// Errors produced while mapping raw configuration values.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}: expected true or false")]
    InvalidBool { key: String, value: String },

    #[error("invalid path mode {0:?}: expected \"host\" or \"path\"")]
    InvalidPathMode(String),

    #[error("unknown exposer {0:?}: expected Ingress, Ambassador, Route or LoadBalancer")]
    InvalidExposer(String),

    #[error("invalid url template {template:?}: {reason}")]
    InvalidUrlTemplate { template: String, reason: String },
}

/// Controls whether services are told apart by host name or by a path under
/// a shared host name.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PathMode {
    #[default]
    Host,
    Path,
}

/// The family of routing backends a service can be exposed through.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Exposer {
    Ingress,
    Ambassador,
    Route,
    LoadBalancer,
}

/// Formats the host name of an exposed service from its subject, namespace
/// and domain.
///
/// Accepts either Go-template placeholders (`{{.Service}}`, `{{.Namespace}}`,
/// `{{.Domain}}`) or up to three positional `%s` markers, which are consumed
/// in subject, namespace, domain order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UrlTemplate(Vec<Segment>);

#[derive(Clone, Debug, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Service,
    Namespace,
    Domain,
}

/// Immutable settings shared by every exposure made by one strategy.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StrategyConfig {
    pub domain: String,
    pub internal_domain: Option<String>,
    pub alias_domain: Option<String>,
    pub url_template: UrlTemplate,
    pub path_mode: PathMode,
    /// Set by `http: true` or `tls: false`. Only reported: whether a service
    /// gets TLS depends on the secret and ACME settings alone.
    pub http: bool,
    pub tls_secret_name: Option<String>,
    pub tls_acme: bool,
    pub tls_use_wildcard: bool,
    pub ingress_class: Option<String>,
}

/// The controller configuration, as read from its ConfigMap.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Config {
    pub exposer: Option<Exposer>,
    pub strategy: StrategyConfig,
}

// === impl Config ===

impl Config {
    /// Maps raw key/value pairs to a configuration.
    ///
    /// Empty values are treated as absent. Unknown keys are ignored with a
    /// warning; malformed values of known keys are errors.
    pub fn from_map(data: &BTreeMap<String, String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        for (key, value) in data {
            let value = value.trim();
            if value.is_empty() {
                continue;
            }

            let strategy = &mut config.strategy;
            match key.as_str() {
                "exposer" => config.exposer = Some(value.parse()?),
                "domain" => strategy.domain = value.to_string(),
                "internal-domain" => strategy.internal_domain = Some(value.to_string()),
                "alias-domain" => strategy.alias_domain = Some(value.to_string()),
                "urltemplate" => strategy.url_template = UrlTemplate::parse(value)?,
                "path-mode" => strategy.path_mode = value.parse()?,
                "http" => strategy.http |= parse_bool(key, value)?,
                "tls" => strategy.http |= !parse_bool(key, value)?,
                "tls-acme" => strategy.tls_acme = parse_bool(key, value)?,
                "tls-secret-name" => strategy.tls_secret_name = Some(value.to_string()),
                "tls-use-wildcard" => strategy.tls_use_wildcard = parse_bool(key, value)?,
                "ingress-class" => strategy.ingress_class = Some(value.to_string()),
                _ => tracing::warn!(%key, "Ignoring unknown configuration key"),
            }
        }
        Ok(config)
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    if value.eq_ignore_ascii_case("true") {
        Ok(true)
    } else if value.eq_ignore_ascii_case("false") {
        Ok(false)
    } else {
        Err(ConfigError::InvalidBool {
            key: key.to_string(),
            value: value.to_string(),
        })
    }
}

// === impl PathMode ===

impl FromStr for PathMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "host" => Ok(Self::Host),
            "path" => Ok(Self::Path),
            _ => Err(ConfigError::InvalidPathMode(s.to_string())),
        }
    }
}

// === impl Exposer ===

impl Exposer {
    /// Host based exposers cannot work without a domain.
    pub fn requires_domain(self) -> bool {
        !matches!(self, Self::LoadBalancer)
    }
}

impl FromStr for Exposer {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [
            Self::Ingress,
            Self::Ambassador,
            Self::Route,
            Self::LoadBalancer,
        ]
        .into_iter()
        .find(|e| e.to_string().eq_ignore_ascii_case(s))
        .ok_or_else(|| ConfigError::InvalidExposer(s.to_string()))
    }
}

impl fmt::Display for Exposer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ingress => f.write_str("Ingress"),
            Self::Ambassador => f.write_str("Ambassador"),
            Self::Route => f.write_str("Route"),
            Self::LoadBalancer => f.write_str("LoadBalancer"),
        }
    }
}

// === impl UrlTemplate ===

impl UrlTemplate {
    pub fn parse(template: &str) -> Result<Self, ConfigError> {
        if template.is_empty() {
            return Ok(Self::default());
        }

        let invalid = |reason: &str| ConfigError::InvalidUrlTemplate {
            template: template.to_string(),
            reason: reason.to_string(),
        };

        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut positional = [Segment::Service, Segment::Namespace, Segment::Domain].into_iter();
        let mut rest = template;
        while !rest.is_empty() {
            let segment = if let Some(after) = rest.strip_prefix("{{") {
                let end = after
                    .find("}}")
                    .ok_or_else(|| invalid("unterminated placeholder"))?;
                let segment = match after[..end].trim() {
                    ".Service" => Segment::Service,
                    ".Namespace" => Segment::Namespace,
                    ".Domain" => Segment::Domain,
                    _ => return Err(invalid("unknown placeholder")),
                };
                rest = &after[end + 2..];
                segment
            } else if let Some(after) = rest.strip_prefix("%s") {
                rest = after;
                positional
                    .next()
                    .ok_or_else(|| invalid("more than three %s markers"))?
            } else {
                let mut chars = rest.chars();
                literal.extend(chars.next());
                rest = chars.as_str();
                continue;
            };

            if !literal.is_empty() {
                segments.push(Segment::Literal(std::mem::take(&mut literal)));
            }
            segments.push(segment);
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self(segments))
    }

    pub fn render(&self, service: &str, namespace: &str, domain: &str) -> String {
        self.0
            .iter()
            .map(|segment| match segment {
                Segment::Literal(s) => s.as_str(),
                Segment::Service => service,
                Segment::Namespace => namespace,
                Segment::Domain => domain,
            })
            .collect()
    }
}

impl Default for UrlTemplate {
    /// `{{.Service}}.{{.Namespace}}.{{.Domain}}`
    fn default() -> Self {
        Self(vec![
            Segment::Service,
            Segment::Literal(".".to_string()),
            Segment::Namespace,
            Segment::Literal(".".to_string()),
            Segment::Domain,
        ])
    }
}

impl FromStr for UrlTemplate {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maplit::{btreemap, convert_args};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[test]
    fn map_to_config() {
        let data = convert_args!(btreemap!(
            "domain" => "35.233.48.48.nip.io",
            "alias-domain" => "alias.35.233.48.48.nip.io",
            "exposer" => "Ingress",
            "tls" => "false",
        ));
        let config = Config::from_map(&data).expect("config must parse");

        assert_eq!(config.exposer, Some(Exposer::Ingress));
        assert_eq!(config.strategy.domain, "35.233.48.48.nip.io");
        assert_eq!(
            config.strategy.alias_domain.as_deref(),
            Some("alias.35.233.48.48.nip.io")
        );
        assert!(config.strategy.http);
    }

    #[test]
    fn full_config() {
        let data = convert_args!(btreemap!(
            "exposer" => "route",
            "domain" => "example.com",
            "internal-domain" => "internal.example.com",
            "urltemplate" => "{{.Service}}-{{.Namespace}}.{{.Domain}}",
            "path-mode" => "path",
            "tls-acme" => "TRUE",
            "tls-secret-name" => "wildcard",
            "tls-use-wildcard" => "true",
            "ingress-class" => "nginx",
            "unrelated" => "ignored",
            "alias-domain" => "",
        ));
        let config = Config::from_map(&data).expect("config must parse");
        let strategy = config.strategy;

        assert_eq!(config.exposer, Some(Exposer::Route));
        assert_eq!(
            strategy.internal_domain.as_deref(),
            Some("internal.example.com")
        );
        assert_eq!(strategy.alias_domain, None);
        assert_eq!(strategy.path_mode, PathMode::Path);
        assert!(strategy.tls_acme);
        assert!(strategy.tls_use_wildcard);
        assert!(!strategy.http);
        assert_eq!(strategy.tls_secret_name.as_deref(), Some("wildcard"));
        assert_eq!(strategy.ingress_class.as_deref(), Some("nginx"));
        assert_eq!(
            strategy.url_template.render("svc", "ns", "example.com"),
            "svc-ns.example.com"
        );
    }

    #[rstest]
    #[case::tls("tls", "no")]
    #[case::http("http", "1")]
    #[case::tls_acme("tls-acme", "yes")]
    #[case::wildcard("tls-use-wildcard", "enabled")]
    fn rejects_non_boolean(#[case] key: &str, #[case] value: &str) {
        let data = convert_args!(btreemap!(key => value));
        assert_eq!(
            Config::from_map(&data),
            Err(ConfigError::InvalidBool {
                key: key.to_string(),
                value: value.to_string(),
            })
        );
    }

    #[test]
    fn rejects_bad_enums() {
        let data = convert_args!(btreemap!("path-mode" => "subdomain"));
        assert_eq!(
            Config::from_map(&data),
            Err(ConfigError::InvalidPathMode("subdomain".to_string()))
        );

        let data = convert_args!(btreemap!("exposer" => "NodePort"));
        assert_eq!(
            Config::from_map(&data),
            Err(ConfigError::InvalidExposer("NodePort".to_string()))
        );
    }

    #[rstest]
    #[case::default("", "svc.ns.example.com")]
    #[case::printf("%s.%s.%s", "svc.ns.example.com")]
    #[case::printf_dash("%s-%s.%s", "svc-ns.example.com")]
    #[case::go("{{.Namespace}}-{{ .Service }}.{{.Domain}}", "ns-svc.example.com")]
    #[case::literal_prefix("app-{{.Service}}.{{.Domain}}", "app-svc.example.com")]
    fn renders_templates(#[case] template: &str, #[case] expected: &str) {
        let template = UrlTemplate::parse(template).expect("template must parse");
        assert_eq!(template.render("svc", "ns", "example.com"), expected);
    }

    #[rstest]
    #[case::unterminated("{{.Service.{{.Domain")]
    #[case::unknown("{{.Cluster}}.{{.Domain}}")]
    #[case::too_many("%s.%s.%s.%s")]
    fn rejects_bad_templates(#[case] template: &str) {
        assert!(matches!(
            UrlTemplate::parse(template),
            Err(ConfigError::InvalidUrlTemplate { .. })
        ));
    }
}
