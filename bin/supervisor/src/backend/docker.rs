//! Docker Backend (spec.md §4.2). Connects to a local Docker daemon over
//! the Unix socket and realizes a plugin instance as a single detached,
//! auto-removing container.

use std::{
  collections::{HashMap, HashSet},
  time::Duration,
};

use anyhow::Context;
use async_trait::async_trait;
use bollard::{
  Docker,
  auth::DockerCredentials,
  models::{ContainerCreateBody, ContainerSummaryStateEnum, HostConfig, PortBinding},
  query_parameters::{
    CreateContainerOptionsBuilder, CreateImageOptionsBuilder,
    InspectContainerOptions, ListContainersOptions,
    RemoveContainerOptionsBuilder, StartContainerOptions,
    StopContainerOptionsBuilder,
  },
};
use futures::StreamExt;
use supervisor_client::{InstanceStatus, PluginInstance, SupervisorError, labels};

use super::{ContainerBackend, RegistryAuth, Result, RunSpec, SearchResult};

/// Docker polls every 1s (after an initial 5s sleep) until the container
/// reports `running`, up to this bound (spec.md §4.2).
const RUN_POLL_TIMEOUT: Duration = Duration::from_secs(180);
const RUN_POLL_INITIAL_SLEEP: Duration = Duration::from_secs(5);
const RUN_POLL_INTERVAL: Duration = Duration::from_secs(1);

pub struct DockerBackend {
  docker: Docker,
}

impl DockerBackend {
  pub fn connect() -> anyhow::Result<Self> {
    let docker = Docker::connect_with_unix_defaults()
      .context("failed to connect to docker daemon")?;
    Ok(DockerBackend { docker })
  }

  async fn pull_image(
    &self,
    image: &str,
    auth: Option<&RegistryAuth>,
  ) -> Result<()> {
    let credentials = auth.map(|a| DockerCredentials {
      username: Some(a.username.clone()),
      password: Some(a.password.clone()),
      serveraddress: Some(a.server.clone()),
      ..Default::default()
    });
    let options =
      CreateImageOptionsBuilder::default().from_image(image).build();
    let mut stream = self.docker.create_image(Some(options), None, credentials);
    while let Some(progress) = stream.next().await {
      progress.map_err(config_err("docker image pull failed"))?;
    }
    Ok(())
  }
}

fn config_err(context: &'static str) -> impl Fn(bollard::errors::Error) -> SupervisorError {
  move |e| SupervisorError::Configuration(format!("{context}: {e}"))
}

fn is_not_found(e: &bollard::errors::Error) -> bool {
  matches!(
    e,
    bollard::errors::Error::DockerResponseServerError { status_code, .. }
      if *status_code == 404
  )
}

fn container_to_instance(
  id: Option<String>,
  image: Option<String>,
  state: Option<ContainerSummaryStateEnum>,
  labels_map: Option<HashMap<String, String>>,
) -> PluginInstance {
  let labels_map = labels_map.unwrap_or_default();
  let status = match state {
    Some(ContainerSummaryStateEnum::RUNNING) => InstanceStatus::Active,
    _ => InstanceStatus::Error,
  };
  PluginInstance {
    handle: id.unwrap_or_default(),
    plugin_id: labels::get_or_unknown(&labels_map, labels::LABEL_PLUGIN_ID),
    version: labels::get_or_unknown(&labels_map, labels::LABEL_VERSION),
    image: labels_map
      .get(labels::LABEL_IMAGE)
      .cloned()
      .unwrap_or_else(|| image.unwrap_or_default()),
    endpoint: labels::get_or_unknown(&labels_map, labels::LABEL_ENDPOINT),
    endpoints: None,
    status,
    labels: labels_map,
  }
}

#[async_trait]
impl ContainerBackend for DockerBackend {
  async fn search(&self, filters: &[(String, String)]) -> Result<SearchResult> {
    let label_filters = filters
      .iter()
      .map(|(k, v)| labels::filter_eq(k, v))
      .collect::<Vec<_>>();
    let mut filter_map = HashMap::new();
    if !label_filters.is_empty() {
      filter_map.insert("label".to_string(), label_filters);
    }
    let containers = self
      .docker
      .list_containers(Some(ListContainersOptions {
        all: true,
        filters: Some(filter_map),
        ..Default::default()
      }))
      .await
      .map_err(config_err("docker list_containers failed"))?;
    let results = containers
      .into_iter()
      .map(|c| container_to_instance(c.id, c.image, c.state, c.labels))
      .collect::<Vec<_>>();
    let total_count = results.len();
    Ok(SearchResult { results, total_count })
  }

  async fn run(&self, spec: RunSpec) -> Result<PluginInstance> {
    self.pull_image(&spec.image, spec.registry.as_ref()).await?;

    let binding_key = format!("{}/tcp", spec.target_port);
    let mut port_bindings = HashMap::new();
    port_bindings.insert(
      binding_key.clone(),
      Some(vec![PortBinding {
        host_ip: Some("0.0.0.0".to_string()),
        host_port: Some(spec.host_port.to_string()),
      }]),
    );
    let mut exposed_ports = HashMap::new();
    exposed_ports.insert(binding_key, HashMap::new());

    let body = ContainerCreateBody {
      image: Some(spec.image.clone()),
      labels: Some(spec.labels.clone()),
      exposed_ports: Some(exposed_ports),
      host_config: Some(HostConfig {
        port_bindings: Some(port_bindings),
        auto_remove: Some(true),
        ..Default::default()
      }),
      ..Default::default()
    };
    let options =
      CreateContainerOptionsBuilder::default().name(&spec.name).build();
    let created = self
      .docker
      .create_container(Some(options), body)
      .await
      .map_err(config_err("docker create_container failed"))?;
    self
      .docker
      .start_container(&created.id, None::<StartContainerOptions>)
      .await
      .map_err(config_err("docker start_container failed"))?;

    tokio::time::sleep(RUN_POLL_INITIAL_SLEEP).await;
    let deadline = tokio::time::Instant::now() + RUN_POLL_TIMEOUT;
    let mut status = InstanceStatus::Error;
    loop {
      let inspected = self
        .docker
        .inspect_container(&created.id, None::<InspectContainerOptions>)
        .await
        .map_err(config_err("docker inspect_container failed"))?;
      let running =
        inspected.state.as_ref().and_then(|s| s.running).unwrap_or(false);
      status = if running { InstanceStatus::Active } else { InstanceStatus::Error };
      if running || tokio::time::Instant::now() >= deadline {
        break;
      }
      tokio::time::sleep(RUN_POLL_INTERVAL).await;
    }

    let endpoint = spec
      .labels
      .get(labels::LABEL_ENDPOINT)
      .cloned()
      .unwrap_or_default();
    Ok(PluginInstance {
      handle: created.id,
      plugin_id: spec
        .labels
        .get(labels::LABEL_PLUGIN_ID)
        .cloned()
        .unwrap_or_default(),
      version: spec
        .labels
        .get(labels::LABEL_VERSION)
        .cloned()
        .unwrap_or_default(),
      image: spec.image,
      endpoint,
      endpoints: None,
      status,
      labels: spec.labels,
    })
  }

  async fn stop(&self, instance: &PluginInstance) -> Result<bool> {
    if let Err(e) = self
      .docker
      .stop_container(
        &instance.handle,
        Some(StopContainerOptionsBuilder::default().build()),
      )
      .await
    {
      if !is_not_found(&e) {
        return Err(config_err("docker stop_container failed")(e));
      }
    }
    if let Err(e) = self
      .docker
      .remove_container(
        &instance.handle,
        Some(RemoveContainerOptionsBuilder::default().force(true).build()),
      )
      .await
    {
      if !is_not_found(&e) {
        return Err(config_err("docker remove_container failed")(e));
      }
    }
    Ok(true)
  }

  async fn list_used_ports(&self) -> Result<HashSet<u16>> {
    let containers = self
      .docker
      .list_containers(Some(ListContainersOptions {
        all: false,
        ..Default::default()
      }))
      .await
      .map_err(config_err("docker list_containers failed"))?;
    let mut ports = HashSet::new();
    for container in containers {
      let Some(container_ports) = container.ports else { continue };
      for port in container_ports {
        if let Some(host_port) = port.public_port {
          ports.insert(host_port);
        }
      }
    }
    Ok(ports)
  }

  fn synthesize_endpoint(&self, supervisor_hostname: &str, _name: &str, host_port: u16) -> String {
    crate::endpoint::docker_endpoint(supervisor_hostname, host_port)
  }
}
