use expose_controller_k8s_api::Service;

const LOAD_BALANCER: &str = "LoadBalancer";

/// A merge patch switching the service to `type: LoadBalancer`, if it is
/// not already.
pub fn type_patch(svc: &Service) -> Option<serde_json::Value> {
    let current = svc.spec.as_ref().and_then(|spec| spec.type_.as_deref());
    if current == Some(LOAD_BALANCER) {
        return None;
    }
    Some(serde_json::json!({ "spec": { "type": LOAD_BALANCER } }))
}

/// The externally reachable address the platform assigned to the service,
/// as `<ip-or-hostname>[:port]`. The port is omitted when it is 80.
pub fn external_host(svc: &Service, port: i32) -> Option<String> {
    let ingress = svc
        .status
        .as_ref()?
        .load_balancer
        .as_ref()?
        .ingress
        .as_ref()?
        .first()?;
    let address = ingress
        .ip
        .as_deref()
        .filter(|ip| !ip.is_empty())
        .or_else(|| ingress.hostname.as_deref().filter(|h| !h.is_empty()))?;

    if port == 80 {
        Some(address.to_string())
    } else {
        Some(format!("{address}:{port}"))
    }
}
