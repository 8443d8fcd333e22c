//! External Interfaces (spec.md §6): thin tonic clients over the two
//! generated stubs, normalizing transport/status failures to
//! `SupervisorError` so callers never match on `tonic::Status` directly.
//!
//! Both clients are exposed to the reconciliation engine through a trait
//! rather than their concrete type, so the engine's stage logic (spec.md
//! §4.6, §8) can be exercised in tests against an in-memory stub instead of
//! a live Plugin/Repository Service.

use async_trait::async_trait;
use supervisor_client::{
  PluginSpec, PublishedPlugin, RepositoryPluginInfo, Result, SupervisorIdentity,
};

pub mod plugin_client;
pub mod repository_client;

pub use plugin_client::PluginServiceClient;
pub use repository_client::RepositoryServiceClient;

/// Plugin Service capability set the reconciliation engine depends on
/// (spec.md §4.6, §4.8, §6): the desired set, and the publish heartbeat.
#[async_trait]
pub trait PluginServiceApi: Send + Sync {
  async fn list_plugins(
    &self,
    domain_id: String,
    supervisor_id: Option<String>,
    hostname: Option<String>,
  ) -> Result<Vec<PluginSpec>>;

  async fn publish(
    &self,
    identity: &SupervisorIdentity,
    plugin_info: Vec<PublishedPlugin>,
  ) -> Result<()>;
}

#[async_trait]
impl PluginServiceApi for PluginServiceClient {
  async fn list_plugins(
    &self,
    domain_id: String,
    supervisor_id: Option<String>,
    hostname: Option<String>,
  ) -> Result<Vec<PluginSpec>> {
    PluginServiceClient::list_plugins(self, domain_id, supervisor_id, hostname).await
  }

  async fn publish(
    &self,
    identity: &SupervisorIdentity,
    plugin_info: Vec<PublishedPlugin>,
  ) -> Result<()> {
    PluginServiceClient::publish(self, identity, plugin_info).await
  }
}

/// Repository Service capability set the reconciliation engine depends on
/// (spec.md §4.6, §6): resolving `plugin_id` to registry coordinates.
#[async_trait]
pub trait RepositoryServiceApi: Send + Sync {
  async fn get(&self, plugin_id: String, domain_id: String) -> Result<RepositoryPluginInfo>;
}

#[async_trait]
impl RepositoryServiceApi for RepositoryServiceClient {
  async fn get(&self, plugin_id: String, domain_id: String) -> Result<RepositoryPluginInfo> {
    RepositoryServiceClient::get(self, plugin_id, domain_id).await
  }
}
