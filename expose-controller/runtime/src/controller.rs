use crate::{
    error::Error,
    k8s::{annotations, ResourceExt, Service},
    metrics::ExposeMetrics,
    strategy::ExposeStrategy,
};
use futures::{future::BoxFuture, prelude::*, stream::FuturesUnordered};
use kube::runtime::watcher;
use std::{collections::HashMap, time::Duration};

const RETRY_BACKOFF: Duration = Duration::from_secs(1);
const RETRY_BACKOFF_MAX: Duration = Duration::from_secs(60);

/// Feeds service events to an [`ExposeStrategy`], one at a time.
///
/// Retryable failures are requeued with an exponential backoff. A pending
/// retry is dropped as soon as a newer event arrives for the same service.
pub struct Controller<T> {
    strategy: T,
    metrics: ExposeMetrics,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Action {
    Expose,
    Unexpose,
}

#[derive(Debug)]
struct Retry {
    action: Action,
    svc: Service,
    token: u64,
    attempt: u32,
}

enum Next {
    Event(Option<watcher::Event<Service>>),
    Retry(Retry),
}

/// Whether a service asks to be exposed, by label or by annotation.
pub fn is_selected(svc: &Service) -> bool {
    annotations::is_true(svc.metadata.labels.as_ref(), annotations::EXPOSE_LABEL)
        || annotations::is_true(svc.metadata.annotations.as_ref(), annotations::EXPOSE)
}

// === impl Controller ===

impl<T: ExposeStrategy> Controller<T> {
    pub fn new(strategy: T, metrics: ExposeMetrics) -> Self {
        Self { strategy, metrics }
    }

    /// Runs until the event stream ends and no retries remain pending.
    pub async fn run(self, events: impl Stream<Item = watcher::Event<Service>>) {
        tokio::pin!(events);
        let mut watching = true;
        let mut retries = FuturesUnordered::<BoxFuture<'static, Retry>>::new();
        // The token of the pending retry of each service, if any.
        let mut pending = HashMap::<(String, String), u64>::new();
        let mut tokens = 0u64;

        loop {
            let next = tokio::select! {
                event = events.next(), if watching => Next::Event(event),
                Some(retry) = retries.next(), if !retries.is_empty() => Next::Retry(retry),
                else => break,
            };

            let retry = match next {
                Next::Event(None) => {
                    tracing::debug!("Service watch ended");
                    watching = false;
                    continue;
                }
                Next::Event(Some(event)) => {
                    let (action, svc) = match event {
                        watcher::Event::Apply(svc) | watcher::Event::InitApply(svc) => {
                            (action(&svc), svc)
                        }
                        watcher::Event::Delete(svc) => (Some(Action::Unexpose), svc),
                        watcher::Event::Init | watcher::Event::InitDone => continue,
                    };
                    pending.remove(&key(&svc));
                    let Some(action) = action else { continue };
                    if !self.reconcile(action, &svc).await {
                        continue;
                    }
                    tokens += 1;
                    Retry {
                        action,
                        svc,
                        token: tokens,
                        attempt: 0,
                    }
                }
                Next::Retry(retry) => {
                    let id = key(&retry.svc);
                    if pending.get(&id) != Some(&retry.token) {
                        continue;
                    }
                    if !self.reconcile(retry.action, &retry.svc).await {
                        pending.remove(&id);
                        continue;
                    }
                    Retry {
                        attempt: retry.attempt + 1,
                        ..retry
                    }
                }
            };

            pending.insert(key(&retry.svc), retry.token);
            let delay = retry.delay();
            tracing::debug!(
                namespace = %retry.svc.namespace().unwrap_or_default(),
                name = %retry.svc.name_any(),
                ?delay,
                "Requeueing service"
            );
            retries.push(
                async move {
                    tokio::time::sleep(delay).await;
                    retry
                }
                .boxed(),
            );
        }
    }

    /// Returns whether the service should be retried.
    async fn reconcile(&self, action: Action, svc: &Service) -> bool {
        let result = match action {
            Action::Expose => self.strategy.expose(svc).await,
            Action::Unexpose => self.strategy.unexpose(svc).await,
        };
        match action {
            Action::Expose => self.metrics.expose(&result),
            Action::Unexpose => self.metrics.unexpose(&result),
        }
        match result {
            Ok(()) => false,
            Err(error) => {
                log_failure(action, svc, &error);
                error.is_retryable()
            }
        }
    }
}

fn action(svc: &Service) -> Option<Action> {
    if is_selected(svc) {
        Some(Action::Expose)
    } else if svc.annotations().contains_key(annotations::EXPOSE_URL) {
        Some(Action::Unexpose)
    } else {
        None
    }
}

fn key(svc: &Service) -> (String, String) {
    (svc.namespace().unwrap_or_default(), svc.name_any())
}

fn log_failure(action: Action, svc: &Service, error: &Error) {
    let namespace = svc.namespace().unwrap_or_default();
    let name = svc.name_any();
    let retryable = error.is_retryable();
    match action {
        Action::Expose => {
            tracing::warn!(%namespace, %name, retryable, %error, "Failed to expose service")
        }
        Action::Unexpose => {
            tracing::warn!(%namespace, %name, retryable, %error, "Failed to unexpose service")
        }
    }
}

// === impl Retry ===

impl Retry {
    fn delay(&self) -> Duration {
        RETRY_BACKOFF
            .saturating_mul(1 << self.attempt.min(6))
            .min(RETRY_BACKOFF_MAX)
    }
}
