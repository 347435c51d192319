use crate::{
    controller::Controller,
    core::{Config, Exposer},
    k8s::{self, route::Route, Api, Client, ConfigMap, Resource},
    metrics::ExposeMetrics,
    store::KubeStore,
    strategy::Strategy,
};
use anyhow::{bail, Result};
use clap::Parser;
use futures::future::Either;
use kube::runtime::watcher;
use prometheus_client::registry::Registry;
use std::sync::Arc;
use tracing::{info, info_span, Instrument};

#[derive(Debug, Parser)]
#[clap(
    name = "expose-controller",
    about = "Exposes annotated services through ingresses, routes or load balancers"
)]
pub struct Args {
    #[clap(
        long,
        default_value = "expose_controller=info,warn",
        env = "EXPOSE_CONTROLLER_LOG"
    )]
    log_level: kubert::LogFilter,

    #[clap(long, default_value = "plain")]
    log_format: kubert::LogFormat,

    #[clap(flatten)]
    client: kubert::ClientArgs,

    #[clap(flatten)]
    admin: kubert::AdminArgs,

    /// Name of the ConfigMap holding the controller configuration.
    #[clap(long, default_value = "exposecontroller")]
    config_map: String,

    #[clap(long, env = "POD_NAMESPACE", default_value = "default")]
    config_namespace: String,

    /// Only expose services in this namespace.
    #[clap(long)]
    watch_namespace: Option<String>,

    /// Overrides the configured exposer.
    #[clap(long)]
    exposer: Option<Exposer>,

    /// Overrides the configured domain.
    #[clap(long)]
    domain: Option<String>,
}

impl Args {
    #[inline]
    pub async fn parse_and_run() -> Result<()> {
        Self::parse().run().await
    }

    pub async fn run(self) -> Result<()> {
        let Self {
            log_level,
            log_format,
            client,
            admin,
            config_map,
            config_namespace,
            watch_namespace,
            exposer,
            domain,
        } = self;

        let mut prom = <Registry>::default();
        let metrics = ExposeMetrics::register(prom.sub_registry_with_prefix("expose"));
        let rt_metrics = kubert::RuntimeMetrics::register(prom.sub_registry_with_prefix("kube"));

        let mut runtime = kubert::Runtime::builder()
            .with_log(log_level, log_format)
            .with_metrics(rt_metrics)
            .with_admin(admin.into_builder().with_prometheus(prom))
            .with_client(client)
            .build()
            .await?;

        let client = runtime.client();
        let data = match Api::<ConfigMap>::namespaced(client.clone(), &config_namespace)
            .get_opt(&config_map)
            .await?
        {
            Some(cm) => cm.data.unwrap_or_default(),
            None => {
                tracing::warn!(namespace = %config_namespace, name = %config_map, "ConfigMap not found; using defaults");
                Default::default()
            }
        };
        let Config {
            exposer: configured,
            strategy: mut config,
        } = Config::from_map(&data)?;
        if let Some(domain) = domain {
            config.domain = domain;
        }

        let exposer = match exposer.or(configured) {
            Some(exposer) => exposer,
            None if api_resource_exists::<Route>(&client).await => Exposer::Route,
            None => Exposer::Ingress,
        };
        if exposer.requires_domain() && config.domain.is_empty() {
            bail!("the {exposer} exposer requires a domain");
        }
        info!(%exposer, domain = %config.domain, http = config.http, "Exposing services");

        let services = match watch_namespace {
            Some(ns) => Either::Left(
                runtime.watch_namespaced::<k8s::Service>(ns, watcher::Config::default()),
            ),
            None => Either::Right(runtime.watch_all::<k8s::Service>(watcher::Config::default())),
        };
        let strategy = Strategy::new(exposer, KubeStore::new(client), Arc::new(config));
        tokio::spawn(
            Controller::new(strategy, metrics)
                .run(services)
                .instrument(info_span!("services")),
        );

        // Block the main thread on the shutdown signal. Once it fires, wait for the background tasks to
        // complete before exiting.
        if runtime.run().await.is_err() {
            bail!("Aborted");
        }

        Ok(())
    }
}

async fn api_resource_exists<T>(client: &Client) -> bool
where
    T: Resource,
    T::DynamicType: Default,
{
    let dt = Default::default();
    client
        .list_api_group_resources(&T::api_version(&dt))
        .await
        .ok()
        .iter()
        .flat_map(|r| r.resources.iter())
        .any(|r| r.kind == T::kind(&dt))
}
