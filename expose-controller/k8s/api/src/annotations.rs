//! Annotation and label keys read from services and written to the routing
//! resources maintained for them.

use std::collections::BTreeMap;

/// Overrides the name of the generated routing resource.
pub const INGRESS_NAME: &str = "fabric8.io/ingress.name";

/// Overrides the subject used in the host name template.
pub const HOST_NAME: &str = "fabric8.io/host.name";

/// Path served by the generated rule.
pub const INGRESS_PATH: &str = "fabric8.io/ingress.path";

/// Per-service override of the configured path mode.
pub const PATH_MODE: &str = "fabric8.io/path.mode";

/// Newline separated `key: value` list copied onto the generated Ingress.
pub const INGRESS_ANNOTATIONS: &str = "fabric8.io/ingress.annotations";

pub const USE_INTERNAL_DOMAIN: &str = "fabric8.io/use.internal.domain";

pub const SKIP_TLS: &str = "jenkins-x.io/skip.tls";

/// Selects which of the service's ports is exposed.
pub const EXPOSE_PORT: &str = "fabric8.io/exposePort";

/// Opt-in annotation, equivalent to the `expose=true` label.
pub const EXPOSE: &str = "fabric8.io/expose";

pub const EXPOSE_LABEL: &str = "expose";

/// Externally visible URL recorded on the service.
pub const EXPOSE_URL: &str = "fabric8.io/exposeUrl";

/// Names another annotation that receives the bare exposed host name.
pub const EXPOSE_HOST_NAME_AS: &str = "fabric8.io/exposeHostNameAs";

/// Path appended to the recorded expose URL.
pub const API_SERVICE_PATH: &str = "api.service.kubernetes.io/path";

pub const RELEASE_LABEL: &str = "release";

/// Marks a routing resource as managed by this controller.
pub const GENERATED_BY: &str = "fabric8.io/generated-by";
pub const GENERATED_BY_VALUE: &str = "exposecontroller";

pub const PROVIDER_LABEL: &str = "provider";
pub const PROVIDER_VALUE: &str = "fabric8";

pub const TLS_ACME: &str = "kubernetes.io/tls-acme";
pub const INGRESS_CLASS: &str = "kubernetes.io/ingress.class";
pub const NGINX_INGRESS_CLASS: &str = "nginx.ingress.kubernetes.io/ingress.class";
pub const SERVER_ALIAS: &str = "nginx.ingress.kubernetes.io/server-alias";

/// Annotation holding the Ambassador configuration of a service.
pub const AMBASSADOR_CONFIG: &str = "getambassador.io/config";

/// Keys written by the controller on managed resources. A key in this list
/// that the desired state no longer carries is removed on reconciliation;
/// any other key is left alone.
pub const MANAGED: &[&str] = &[
    GENERATED_BY,
    TLS_ACME,
    INGRESS_CLASS,
    NGINX_INGRESS_CLASS,
    SERVER_ALIAS,
];

/// Returns true if `key` is set to `"true"`.
pub fn is_true(map: Option<&BTreeMap<String, String>>, key: &str) -> bool {
    get(map, key) == Some("true")
}

/// Returns the non-empty value of `key`.
pub fn get<'m>(map: Option<&'m BTreeMap<String, String>>, key: &str) -> Option<&'m str> {
    map.and_then(|m| m.get(key))
        .map(String::as_str)
        .filter(|v| !v.is_empty())
}
