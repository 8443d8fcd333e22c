//! Publish Flow (spec.md §4.8): project owned instances to the wire shape
//! and heartbeat them to the Plugin Service. Re-run at the end of every
//! sync tick so the server learns the new inventory immediately rather
//! than waiting for the next publish tick (spec.md §4.6).

use supervisor_client::{PublishedPlugin, Result, SupervisorIdentity, labels};

use crate::backend::ContainerBackend;
use crate::grpc::PluginServiceApi;

pub async fn publish_inventory(
  backend: &dyn ContainerBackend,
  plugin_client: &dyn PluginServiceApi,
  identity: &SupervisorIdentity,
) -> Result<()> {
  let filters = [(labels::LABEL_NAME.to_string(), identity.name.clone())];
  let owned = backend.search(&filters).await?;
  let plugin_info = owned.results.iter().map(PublishedPlugin::from).collect::<Vec<_>>();
  plugin_client.publish(identity, plugin_info).await
}
