//! The two independent periodic tickers (spec.md §5): a short-period
//! `publish` heartbeat and a longer-period full `sync`. Spawned as detached
//! tasks the same way the teacher's `resource::spawn_*_refresh_loop`
//! functions are (`bin/core/src/resource/refresh.rs`) — each loop owns its
//! own `tokio::time::interval` and never holds a lock across the `.await`
//! inside its tick.

use std::sync::Arc;
use std::time::Duration;

use cache::DistributedLock;
use supervisor_client::SupervisorIdentity;

use crate::backend::Backend;
use crate::grpc::{PluginServiceClient, RepositoryServiceClient};
use crate::port::PortAllocator;
use crate::{publish, reconcile};

/// State shared by both loops. Everything here is either immutable after
/// construction or internally synchronized, so the two loops never need to
/// coordinate beyond the reconciliation engine's own lock (spec.md §5).
pub struct Shared {
  pub backend: Backend,
  pub lock: Box<dyn DistributedLock>,
  pub plugin_client: PluginServiceClient,
  pub repository_client: RepositoryServiceClient,
  pub ports: PortAllocator,
  pub identity: SupervisorIdentity,
}

pub fn spawn_publish_loop(shared: Arc<Shared>, interval: Duration) {
  tokio::spawn(async move {
    let mut ticker = tokio::time::interval(interval);
    loop {
      ticker.tick().await;
      if let Err(e) =
        publish::publish_inventory(&shared.backend, &shared.plugin_client, &shared.identity).await
      {
        tracing::warn!("publish tick failed | {e:#}");
      }
    }
  });
}

pub fn spawn_sync_loop(shared: Arc<Shared>, interval: Duration) {
  tokio::spawn(async move {
    let mut ticker = tokio::time::interval(interval);
    loop {
      ticker.tick().await;
      let result = reconcile::sync_plugins(
        &shared.backend,
        shared.lock.as_ref(),
        &shared.plugin_client,
        &shared.repository_client,
        &shared.ports,
        &shared.identity,
      )
      .await;
      if let Err(e) = result {
        tracing::warn!("sync tick failed | {e:#}");
      }
    }
  });
}
