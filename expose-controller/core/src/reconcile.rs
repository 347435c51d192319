//! Decides how an observed routing resource must change to carry the desired
//! managed content, without touching anything the controller does not own.
//!
//! Comparisons are scoped per field: labels key by key, annotations after
//! merging, owner references exactly, TLS as sets and the rule list by the
//! managed host and backend. Updates are applied to the observed object so
//! that foreign content and the resource version round-trip unchanged.

use expose_controller_k8s_api::{
    annotations,
    route::{Route, RouteSpec},
    HTTPIngressPath, HTTPIngressRuleValue, Ingress, IngressRule,
    IngressTLS, ObjectMeta,
};
use std::collections::BTreeSet;

/// Where an observed routing resource stands relative to its desired state.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum State {
    Absent,
    Foreign,
    OwnedClean,
    OwnedStale,
}

/// The write needed to bring a routing resource to its desired state.
#[derive(Clone, Debug, PartialEq)]
pub enum Plan<K> {
    Create(K),
    /// The observed object with the managed parts updated in place.
    Update(K),
    Unchanged,
    /// The resource exists without the managed marker and must not be
    /// touched.
    Conflict,
}

/// The write needed to withdraw managed content from a routing resource.
#[derive(Clone, Debug, PartialEq)]
pub enum Removal<K> {
    Absent,
    Foreign,
    Delete,
    Update(K),
    Unchanged,
}

// === impl Plan ===

impl<K> Plan<K> {
    pub fn state(&self) -> State {
        match self {
            Self::Create(_) => State::Absent,
            Self::Update(_) => State::OwnedStale,
            Self::Unchanged => State::OwnedClean,
            Self::Conflict => State::Foreign,
        }
    }
}

pub fn is_managed(meta: &ObjectMeta) -> bool {
    annotations::get(meta.annotations.as_ref(), annotations::GENERATED_BY)
        == Some(annotations::GENERATED_BY_VALUE)
}

pub fn ingress(desired: Ingress, observed: Option<Ingress>) -> Plan<Ingress> {
    let Some(mut current) = observed else {
        return Plan::Create(desired);
    };
    if !is_managed(&current.metadata) {
        return Plan::Conflict;
    }

    let mut changed = merge_metadata(&desired.metadata, &mut current.metadata);

    let wanted = desired.spec.unwrap_or_default();
    let spec = current.spec.get_or_insert_with(Default::default);

    if tls_set(wanted.tls.as_deref()) != tls_set(spec.tls.as_deref()) {
        spec.tls = wanted.tls;
        changed = true;
    }

    if let Some(rule) = wanted.rules.and_then(|rules| rules.into_iter().next()) {
        changed |= merge_rule(rule, spec.rules.get_or_insert_with(Default::default));
    }

    if changed {
        Plan::Update(current)
    } else {
        Plan::Unchanged
    }
}

/// Withdraws every path routed to `service` along with the TLS block. An
/// Ingress left without any path is deleted.
pub fn ingress_removal(service: &str, observed: Option<Ingress>) -> Removal<Ingress> {
    let Some(mut current) = observed else {
        return Removal::Absent;
    };
    if !is_managed(&current.metadata) {
        return Removal::Foreign;
    }

    let spec = current.spec.get_or_insert_with(Default::default);
    let mut removed = false;
    let mut remaining = 0;
    let rules = spec
        .rules
        .take()
        .unwrap_or_default()
        .into_iter()
        .filter_map(|mut rule| {
            if let Some(http) = rule.http.as_mut() {
                let before = http.paths.len();
                http.paths.retain(|p| backend_name(p) != Some(service));
                removed |= http.paths.len() != before;
                if http.paths.is_empty() {
                    return None;
                }
                remaining += http.paths.len();
            }
            Some(rule)
        })
        .collect::<Vec<_>>();

    if remaining == 0 {
        return Removal::Delete;
    }
    spec.rules = Some(rules);
    if spec.tls.take().is_some() {
        removed = true;
    }

    if removed {
        Removal::Update(current)
    } else {
        Removal::Unchanged
    }
}

/// Routes are compared on the fields the controller sets. Certificates,
/// alternate backends and the wildcard policy are left as observed.
pub fn route(desired: Route, observed: Option<Route>) -> Plan<Route> {
    let Some(mut current) = observed else {
        return Plan::Create(desired);
    };
    if !is_managed(&current.metadata) {
        return Plan::Conflict;
    }

    let mut changed = merge_metadata(&desired.metadata, &mut current.metadata);
    changed |= merge_route_spec(desired.spec, &mut current.spec);

    if changed {
        Plan::Update(current)
    } else {
        Plan::Unchanged
    }
}

fn merge_route_spec(desired: RouteSpec, observed: &mut RouteSpec) -> bool {
    let mut changed = assign(&mut observed.host, desired.host);
    changed |= assign(&mut observed.path, desired.path);
    changed |= assign(&mut observed.to, desired.to);
    changed |= assign(&mut observed.port, desired.port);
    match (desired.tls, observed.tls.as_mut()) {
        (Some(wanted), Some(tls)) => {
            changed |= assign(&mut tls.termination, wanted.termination);
            changed |= assign(
                &mut tls.insecure_edge_termination_policy,
                wanted.insecure_edge_termination_policy,
            );
        }
        (wanted, _) => changed |= assign(&mut observed.tls, wanted),
    }
    changed
}

fn assign<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        return false;
    }
    *slot = value;
    true
}

/// Merges the desired labels, annotations and owner references into
/// `observed`, returning whether anything changed.
fn merge_metadata(desired: &ObjectMeta, observed: &mut ObjectMeta) -> bool {
    let mut changed = false;

    if let Some(labels) = desired.labels.as_ref() {
        let current = observed.labels.get_or_insert_with(Default::default);
        for (key, value) in labels {
            if current.get(key) != Some(value) {
                current.insert(key.clone(), value.clone());
                changed = true;
            }
        }
    }

    let wanted = desired.annotations.clone().unwrap_or_default();
    let current = observed.annotations.get_or_insert_with(Default::default);
    for key in annotations::MANAGED {
        if !wanted.contains_key(*key) && current.remove(*key).is_some() {
            changed = true;
        }
    }
    for (key, value) in wanted {
        if current.get(&key) != Some(&value) {
            current.insert(key, value);
            changed = true;
        }
    }

    if observed.owner_references != desired.owner_references {
        observed.owner_references = desired.owner_references.clone();
        changed = true;
    }

    changed
}

/// Ensures the managed rule is present, returning whether `rules` changed.
///
/// Paths routed to the desired backend are withdrawn from rules for any
/// other host, dropping rules left without paths. The list is otherwise left
/// alone when exactly one rule matches the desired host and it already
/// carries the desired path. Failing that, rules for that host are collapsed
/// into one holding the desired path plus any existing path that collides
/// with it neither by backend nor by path.
fn merge_rule(desired: IngressRule, rules: &mut Vec<IngressRule>) -> bool {
    let Some(wanted) = desired
        .http
        .as_ref()
        .and_then(|http| http.paths.first())
        .cloned()
    else {
        return false;
    };

    let mut changed = false;
    rules.retain_mut(|rule| {
        if rule.host == desired.host {
            return true;
        }
        let Some(http) = rule.http.as_mut() else {
            return true;
        };
        let before = http.paths.len();
        http.paths.retain(|path| backend_name(path) != backend_name(&wanted));
        if http.paths.len() == before {
            return true;
        }
        changed = true;
        !http.paths.is_empty()
    });

    let same_host = rules
        .iter()
        .filter(|rule| rule.host == desired.host)
        .collect::<Vec<_>>();
    if let [rule] = same_host.as_slice() {
        if paths(rule).any(|path| routes_same(path, &wanted)) {
            return changed;
        }
    }

    let mut merged = vec![wanted.clone()];
    for path in same_host.iter().flat_map(|rule| paths(rule)) {
        let collides = path.path == wanted.path || backend_name(path) == backend_name(&wanted);
        if !collides {
            merged.push(path.clone());
        }
    }

    let rule = IngressRule {
        host: desired.host,
        http: Some(HTTPIngressRuleValue { paths: merged }),
    };
    match rules.iter().position(|r| r.host == rule.host) {
        Some(at) => {
            rules.retain(|r| r.host != rule.host);
            rules.insert(at.min(rules.len()), rule);
        }
        None => rules.push(rule),
    }
    true
}

fn paths(rule: &IngressRule) -> impl Iterator<Item = &HTTPIngressPath> {
    rule.http.iter().flat_map(|http| http.paths.iter())
}

fn backend_name(path: &HTTPIngressPath) -> Option<&str> {
    path.backend.service.as_ref().map(|svc| svc.name.as_str())
}

fn routes_same(a: &HTTPIngressPath, b: &HTTPIngressPath) -> bool {
    a.path == b.path && a.backend.service == b.backend.service
}

fn tls_set(tls: Option<&[IngressTLS]>) -> BTreeSet<(Option<&str>, BTreeSet<&str>)> {
    tls.unwrap_or_default()
        .iter()
        .map(|tls| {
            let hosts = tls.hosts.iter().flatten().map(String::as_str).collect();
            (tls.secret_name.as_deref(), hosts)
        })
        .collect()
}
