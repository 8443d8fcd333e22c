//! Plugin Service client: `Supervisor.Publish` and `Supervisor.ListPlugins`
//! (spec.md §4.8, §6).

use supervisor_client::{
  PluginSpec, PluginState, PublishedPlugin, SupervisorError, SupervisorIdentity,
  plugin_v1::{ListPluginsRequest, PluginInfo, PublishRequest, supervisor_client::SupervisorClient},
};
use tonic::transport::Channel;

pub struct PluginServiceClient {
  inner: SupervisorClient<Channel>,
}

fn parse_state(raw: &str) -> PluginState {
  match raw {
    "ACTIVE" => PluginState::Active,
    "RE_PROVISIONING" => PluginState::ReProvisioning,
    "ERROR" => PluginState::Error,
    _ => PluginState::Unknown,
  }
}

impl PluginServiceClient {
  pub async fn connect(address: String) -> Result<Self, SupervisorError> {
    let inner = SupervisorClient::connect(address)
      .await
      .map_err(|e| SupervisorError::Configuration(format!("plugin service connect failed: {e}")))?;
    Ok(PluginServiceClient { inner })
  }

  /// Idempotent heartbeat: identity + current local inventory
  /// (spec.md §4.8).
  pub async fn publish(
    &self,
    identity: &SupervisorIdentity,
    plugin_info: Vec<PublishedPlugin>,
  ) -> Result<(), SupervisorError> {
    let request = PublishRequest {
      name: identity.name.clone(),
      hostname: identity.hostname.clone(),
      tags: identity.tags.clone(),
      labels: identity.labels.clone(),
      domain_id: identity.domain_id.clone(),
      plugin_info: plugin_info
        .into_iter()
        .map(|p| PluginInfo {
          plugin_id: p.plugin_id,
          version: p.version,
          state: p.state,
          endpoint: p.endpoint,
          endpoints: p.endpoints,
        })
        .collect(),
    };
    self
      .inner
      .clone()
      .publish(request)
      .await
      .map_err(|e| SupervisorError::Configuration(format!("publish failed: {e}")))?;
    Ok(())
  }

  /// The desired set for this supervisor. At least one of `supervisor_id`
  /// or `hostname` must be present (spec.md §4.6).
  pub async fn list_plugins(
    &self,
    domain_id: String,
    supervisor_id: Option<String>,
    hostname: Option<String>,
  ) -> Result<Vec<PluginSpec>, SupervisorError> {
    let request = ListPluginsRequest { domain_id, supervisor_id, hostname };
    let response = self
      .inner
      .clone()
      .list_plugins(request)
      .await
      .map_err(|e| SupervisorError::Configuration(format!("list_plugins failed: {e}")))?;
    let results = response.into_inner().results;
    Ok(
      results
        .into_iter()
        .map(|r| PluginSpec {
          plugin_id: r.plugin_id,
          version: r.version,
          service_type: r.service_type,
          state: parse_state(&r.state),
          domain_id: r.domain_id,
        })
        .collect(),
    )
  }
}
