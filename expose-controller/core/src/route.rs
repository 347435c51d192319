use crate::exposure::Exposure;
use expose_controller_k8s_api::{
    route::{Route, RoutePort, RouteSpec, RouteTargetReference, TlsConfig},
    IntOrString, ResourceExt, Service,
};

/// Builds the Route a service should have on platforms with a router.
///
/// TLS is terminated at the edge, with plain HTTP redirected.
pub fn desired(svc: &Service, exposure: &Exposure) -> Route {
    let host = &exposure.host;
    Route {
        metadata: exposure.metadata(svc),
        spec: RouteSpec {
            host: Some(host.hostname.clone()),
            path: (!host.path.is_empty()).then(|| host.path.clone()),
            to: RouteTargetReference {
                kind: "Service".to_string(),
                name: svc.name_any(),
                weight: Some(100),
            },
            port: Some(RoutePort {
                target_port: IntOrString::Int(exposure.port),
            }),
            tls: exposure.tls.as_ref().map(|_| TlsConfig {
                termination: "edge".to_string(),
                insecure_edge_termination_policy: Some("Redirect".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        },
    }
}
