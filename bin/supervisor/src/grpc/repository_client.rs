//! Repository Service client: `Plugin.Get`, resolving a `plugin_id` to
//! registry coordinates during install (spec.md §4.6, §6).

use supervisor_client::{
  RepositoryPluginInfo, SupervisorError,
  repository_v1::{GetPluginRequest, plugin_client::PluginClient},
};
use tonic::transport::Channel;

pub struct RepositoryServiceClient {
  inner: PluginClient<Channel>,
}

impl RepositoryServiceClient {
  pub async fn connect(address: String) -> Result<Self, SupervisorError> {
    let inner = PluginClient::connect(address)
      .await
      .map_err(|e| SupervisorError::Configuration(format!("repository service connect failed: {e}")))?;
    Ok(RepositoryServiceClient { inner })
  }

  /// `domain_id` travels as `x-domain-id` request metadata, per spec.md §6,
  /// rather than as a field on `GetPluginRequest`.
  pub async fn get(
    &self,
    plugin_id: String,
    domain_id: String,
  ) -> Result<RepositoryPluginInfo, SupervisorError> {
    let mut request = tonic::Request::new(GetPluginRequest { plugin_id });
    let domain_id = domain_id
      .parse()
      .map_err(|e| SupervisorError::Configuration(format!("invalid domain_id metadata: {e}")))?;
    request.metadata_mut().insert("x-domain-id", domain_id);
    let response = self
      .inner
      .clone()
      .get(request)
      .await
      .map_err(|e| SupervisorError::Configuration(format!("repository get failed: {e}")))?;
    let info = response.into_inner();
    Ok(RepositoryPluginInfo {
      plugin_id: info.plugin_id,
      name: info.name,
      registry_url: info.registry_url,
      image: info.image,
      service_type: info.service_type,
    })
  }
}
