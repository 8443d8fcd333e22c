#[macro_use]
extern crate tracing;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use cache::TtlLock;
use supervisor_client::SupervisorIdentity;

use crate::backend::{Backend, docker::DockerBackend, kubernetes::KubernetesBackend};
use crate::config::{BackendKind, supervisor_config};
use crate::grpc::{PluginServiceClient, RepositoryServiceClient};
use crate::port::PortAllocator;
use crate::scheduler::Shared;

mod backend;
mod config;
mod endpoint;
mod grpc;
mod port;
mod publish;
mod readiness;
mod reconcile;
mod scheduler;
mod token;

async fn build_backend(config: &config::SupervisorConfig) -> anyhow::Result<(Backend, u16, u16)> {
  match config.backend {
    BackendKind::Docker => {
      let docker = DockerBackend::connect()?;
      let connector = &config.connectors.docker;
      Ok((Backend::Docker(docker), connector.start_port, connector.end_port))
    }
    BackendKind::Kubernetes => {
      let connector = config
        .connectors
        .kubernetes
        .as_ref()
        .context("CONNECTORS.kubernetes is required when BACKEND=KubernetesConnector")?;
      let k8s = KubernetesBackend::connect(connector).await?;
      Ok((Backend::Kubernetes(Box::new(k8s)), connector.start_port, connector.end_port))
    }
  }
}

async fn app() -> anyhow::Result<()> {
  dotenvy::dotenv().ok();
  // Both the Kubernetes backend (`kube`, in-cluster API server over TLS) and
  // the Consul token poller (`reqwest`) link rustls; install the
  // process-wide provider once up front the same way the teacher does for
  // its own TLS listener.
  rustls::crypto::ring::default_provider()
    .install_default()
    .expect("failed to install default rustls CryptoProvider");

  let config = supervisor_config();
  logger::init(&config.logging)?;

  info!("Supervisor version: v{}", env!("CARGO_PKG_VERSION"));
  if config.pretty_startup_config {
    info!("{:#?}", config.sanitized());
  } else {
    info!("{:?}", config.sanitized());
  }

  // Token resolution does not block the rest of construction; only the
  // schedulers, which need `domain_id` to scope sync/publish calls, await it
  // (spec.md §9 REDESIGN FLAGS — Consul token bootstrap).
  let bearer_token = token::resolve_token(config)
    .await
    .context("failed to resolve bearer token")?;
  let domain_id = token::decode_domain_id(&bearer_token)
    .context("failed to decode domain_id from TOKEN")?;

  let identity = SupervisorIdentity {
    name: config.name.clone(),
    hostname: config.hostname.clone(),
    domain_id,
    tags: config.tags.clone(),
    labels: config.labels.clone(),
  };

  let (backend, start_port, end_port) = build_backend(config)
    .await
    .context("failed to initialize container backend")?;

  let plugin_client = PluginServiceClient::connect(config.plugin_service_address.clone())
    .await
    .context("failed to connect to Plugin Service")?;
  let repository_client =
    RepositoryServiceClient::connect(config.repository_service_address.clone())
      .await
      .context("failed to connect to Repository Service")?;

  let shared = Arc::new(Shared {
    backend,
    lock: Box::new(TtlLock::new(Duration::from_secs(config.lock_ttl_secs))),
    plugin_client,
    repository_client,
    ports: PortAllocator::new(start_port, end_port),
    identity,
  });

  scheduler::spawn_publish_loop(
    shared.clone(),
    Duration::from_secs(config.publish_interval_secs),
  );
  scheduler::spawn_sync_loop(shared, Duration::from_secs(config.sync_interval_secs));

  // The schedulers run forever as detached tasks; the process stays alive
  // until a termination signal arrives, matching the teacher's
  // select-on-term-signal shape in `bin/core/src/main.rs`.
  std::future::pending::<()>().await;
  Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  let mut term_signal =
    tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
  tokio::select! {
    res = tokio::spawn(app()) => res?,
    _ = term_signal.recv() => Ok(()),
  }
}
