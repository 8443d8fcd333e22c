//! Kubernetes Backend (spec.md §4.3). One plugin instance is realized as a
//! paired Service + Deployment in a configured namespace, with canonical
//! labels carried verbatim in the Service's annotations (so `search` can
//! filter on dotted keys Kubernetes label selectors forbid) and reduced to
//! the management-label subset (spec.md §4.7) for `spec.selector` /
//! `metadata.labels`.

use std::{
  collections::{BTreeMap, HashMap, HashSet},
  time::Duration,
};

use anyhow::Context;
use async_trait::async_trait;
use k8s_openapi::{
  api::{
    apps::v1::{Deployment, DeploymentSpec},
    core::v1::{
      Container, ContainerPort, EndpointAddress as K8sEndpointAddress,
      Endpoints, EnvVar, LocalObjectReference, PodSpec, PodTemplateSpec,
      Probe, Service, ServicePort, ServiceSpec, TCPSocketAction,
    },
  },
  apimachinery::pkg::{
    apis::meta::v1::{LabelSelector, ObjectMeta},
    util::intstr::IntOrString,
  },
};
use kube::{
  Client,
  api::{Api, DeleteParams, ListParams, PostParams},
};
use supervisor_client::{InstanceStatus, PluginInstance, SupervisorError, labels};

use crate::config::KubernetesConnectorConfig;
use crate::readiness::{Readiness, poll_until_ready};

use super::{ContainerBackend, Result, RunSpec, SearchResult};

/// After creating a Deployment, sleep this long before the first
/// availability poll (spec.md §4.3 step 3).
const DEPLOYMENT_INITIAL_SLEEP: Duration = Duration::from_secs(30);
const DEPLOYMENT_POLL_INTERVAL: Duration = Duration::from_secs(10);
const DEPLOYMENT_POLL_DEADLINE: Duration = Duration::from_secs(300);
const ENDPOINTS_POLL_INTERVAL: Duration = Duration::from_secs(10);
const ENDPOINTS_POLL_DEADLINE: Duration = Duration::from_secs(300);

pub struct KubernetesBackend {
  client: Client,
  namespace: String,
  headless: bool,
  hostname: String,
  service_account: Option<String>,
  image_pull_secrets: Vec<String>,
  node_selector: HashMap<String, String>,
  env: HashMap<String, String>,
  resources: Option<k8s_openapi::api::core::v1::ResourceRequirements>,
  volumes: Vec<k8s_openapi::api::core::v1::Volume>,
  volume_mounts: Vec<k8s_openapi::api::core::v1::VolumeMount>,
  replica: crate::config::ReplicaPolicyConfig,
}

fn config_err(context: &'static str) -> impl Fn(kube::Error) -> SupervisorError {
  move |e| SupervisorError::Configuration(format!("{context}: {e}"))
}

fn is_not_found(e: &kube::Error) -> bool {
  matches!(e, kube::Error::Api(ae) if ae.code == 404)
}

fn endpoints_to_urls(ep: &Endpoints) -> Vec<String> {
  let mut urls = Vec::new();
  for subset in ep.subsets.clone().unwrap_or_default() {
    let addresses: Vec<K8sEndpointAddress> = subset.addresses.unwrap_or_default();
    let ports = subset.ports.unwrap_or_default();
    for addr in &addresses {
      for port in &ports {
        urls.push(format!("grpc://{}:{}", addr.ip, port.port));
      }
    }
  }
  urls
}

struct EndpointsReadiness {
  client: Client,
  namespace: String,
  name: String,
}

#[async_trait]
impl Readiness for EndpointsReadiness {
  async fn poll(&self) -> anyhow::Result<Option<Vec<String>>> {
    let api: Api<Endpoints> = Api::namespaced(self.client.clone(), &self.namespace);
    match api.get(&self.name).await {
      Ok(ep) => {
        let urls = endpoints_to_urls(&ep);
        if urls.is_empty() { Ok(None) } else { Ok(Some(urls)) }
      }
      Err(e) if is_not_found(&e) => Ok(None),
      Err(e) => Err(e.into()),
    }
  }
}

impl KubernetesBackend {
  pub async fn connect(config: &KubernetesConnectorConfig) -> anyhow::Result<Self> {
    let client = Client::try_default()
      .await
      .context("failed to build in-cluster kubernetes client")?;
    Ok(KubernetesBackend {
      client,
      namespace: config.namespace.clone(),
      headless: config.headless,
      hostname: config.hostname(),
      service_account: config.service_account.clone(),
      image_pull_secrets: config.image_pull_secrets.clone(),
      node_selector: config.node_selector.clone(),
      env: config.env.clone(),
      resources: config.resources.clone(),
      volumes: config.volumes.clone(),
      volume_mounts: config.volume_mounts.clone(),
      replica: config.replica.clone(),
    })
  }

  /// Cluster-internal DNS suffix used by the endpoint synthesizer
  /// (spec.md §4.5).
  pub fn hostname(&self) -> &str {
    &self.hostname
  }

  fn build_service(&self, spec: &RunSpec, mgmt_labels: &BTreeMap<String, String>) -> Service {
    Service {
      metadata: ObjectMeta {
        name: Some(spec.name.clone()),
        namespace: Some(self.namespace.clone()),
        labels: Some(mgmt_labels.clone()),
        annotations: Some(spec.labels.clone().into_iter().collect()),
        ..Default::default()
      },
      spec: Some(ServiceSpec {
        selector: Some(mgmt_labels.clone()),
        cluster_ip: self.headless.then(|| "None".to_string()),
        ports: Some(vec![ServicePort {
          port: spec.host_port as i32,
          target_port: Some(IntOrString::Int(spec.target_port as i32)),
          protocol: Some("TCP".to_string()),
          ..Default::default()
        }]),
        ..Default::default()
      }),
      ..Default::default()
    }
  }

  fn build_deployment(
    &self,
    spec: &RunSpec,
    mgmt_labels: &BTreeMap<String, String>,
    replicas: u32,
  ) -> Deployment {
    let env_vars = self
      .env
      .iter()
      .map(|(k, v)| EnvVar { name: k.clone(), value: Some(v.clone()), ..Default::default() })
      .collect::<Vec<_>>();
    let image_pull_secrets = (!self.image_pull_secrets.is_empty()).then(|| {
      self
        .image_pull_secrets
        .iter()
        .map(|name| LocalObjectReference { name: Some(name.clone()) })
        .collect::<Vec<_>>()
    });

    let container = Container {
      name: "plugin".to_string(),
      image: Some(spec.image.clone()),
      image_pull_policy: Some("IfNotPresent".to_string()),
      ports: Some(vec![ContainerPort {
        container_port: spec.target_port as i32,
        ..Default::default()
      }]),
      env: (!env_vars.is_empty()).then_some(env_vars),
      resources: self.resources.clone(),
      volume_mounts: (!self.volume_mounts.is_empty()).then(|| self.volume_mounts.clone()),
      liveness_probe: Some(Probe {
        tcp_socket: Some(TCPSocketAction {
          port: IntOrString::Int(spec.target_port as i32),
          ..Default::default()
        }),
        ..Default::default()
      }),
      ..Default::default()
    };

    let pod_spec = PodSpec {
      containers: vec![container],
      node_selector: (!self.node_selector.is_empty()).then(|| self.node_selector.clone()),
      service_account_name: self.service_account.clone(),
      image_pull_secrets,
      volumes: (!self.volumes.is_empty()).then(|| self.volumes.clone()),
      ..Default::default()
    };

    Deployment {
      metadata: ObjectMeta {
        name: Some(spec.name.clone()),
        namespace: Some(self.namespace.clone()),
        labels: Some(mgmt_labels.clone()),
        ..Default::default()
      },
      spec: Some(DeploymentSpec {
        replicas: Some(replicas as i32),
        selector: LabelSelector { match_labels: Some(mgmt_labels.clone()), ..Default::default() },
        template: PodTemplateSpec {
          metadata: Some(ObjectMeta { labels: Some(mgmt_labels.clone()), ..Default::default() }),
          spec: Some(pod_spec),
        },
        ..Default::default()
      }),
      ..Default::default()
    }
  }

  async fn wait_for_deployment_available(&self, name: &str) {
    let api: Api<Deployment> = Api::namespaced(self.client.clone(), &self.namespace);
    let deadline = tokio::time::Instant::now() + DEPLOYMENT_POLL_DEADLINE;
    loop {
      match api.get(name).await {
        Ok(deployment) => {
          let available =
            deployment.status.and_then(|s| s.available_replicas).unwrap_or(0);
          if available >= 1 {
            return;
          }
        }
        Err(e) => {
          tracing::warn!("failed polling deployment {name} availability | {e}");
        }
      }
      if tokio::time::Instant::now() >= deadline {
        tracing::warn!(
          "deployment {name} did not become available within {:?}; a later sync tick will confirm or recover",
          DEPLOYMENT_POLL_DEADLINE
        );
        return;
      }
      tokio::time::sleep(DEPLOYMENT_POLL_INTERVAL).await;
    }
  }

  async fn service_to_instance(
    &self,
    name: &str,
    annotations: HashMap<String, String>,
  ) -> Result<Option<PluginInstance>> {
    let endpoint = labels::get_or_unknown(&annotations, labels::LABEL_ENDPOINT);
    let plugin_id = labels::get_or_unknown(&annotations, labels::LABEL_PLUGIN_ID);
    let version = labels::get_or_unknown(&annotations, labels::LABEL_VERSION);
    let image = annotations
      .get(labels::LABEL_IMAGE)
      .cloned()
      .unwrap_or_else(|| "Unknown".to_string());

    let endpoints = if self.headless {
      let resolved = self.resolve_endpoints(name).await?;
      if resolved.is_empty() {
        // Still coming up: excluded from inventory (spec.md §4.3 step 5).
        return Ok(None);
      }
      Some(resolved)
    } else {
      None
    };

    Ok(Some(PluginInstance {
      handle: name.to_string(),
      plugin_id,
      version,
      image,
      endpoint,
      endpoints,
      // Kubernetes Services have no meaningful status; they always map to
      // ACTIVE once the Service exists (spec.md §4.1).
      status: InstanceStatus::Active,
      labels: annotations,
    }))
  }

  async fn resolve_endpoints(&self, name: &str) -> Result<Vec<String>> {
    let api: Api<Endpoints> = Api::namespaced(self.client.clone(), &self.namespace);
    match api.get(name).await {
      Ok(ep) => Ok(endpoints_to_urls(&ep)),
      Err(e) if is_not_found(&e) => Ok(Vec::new()),
      Err(e) => Err(config_err("kubernetes get endpoints failed")(e)),
    }
  }

  async fn delete_deployment(&self, name: &str) -> Result<()> {
    let api: Api<Deployment> = Api::namespaced(self.client.clone(), &self.namespace);
    match api.delete(name, &DeleteParams::default()).await {
      Ok(_) => Ok(()),
      Err(e) if is_not_found(&e) => Ok(()),
      Err(e) => Err(config_err("kubernetes delete deployment failed")(e)),
    }
  }

  async fn delete_service(&self, name: &str) -> Result<()> {
    let api: Api<Service> = Api::namespaced(self.client.clone(), &self.namespace);
    match api.delete(name, &DeleteParams::default()).await {
      Ok(_) => Ok(()),
      Err(e) if is_not_found(&e) => Ok(()),
      Err(e) => Err(config_err("kubernetes delete service failed")(e)),
    }
  }
}

#[async_trait]
impl ContainerBackend for KubernetesBackend {
  async fn search(&self, filters: &[(String, String)]) -> Result<SearchResult> {
    let svc_api: Api<Service> = Api::namespaced(self.client.clone(), &self.namespace);
    let services = svc_api
      .list(&ListParams::default())
      .await
      .map_err(config_err("kubernetes list services failed"))?;

    let mut results = Vec::new();
    for svc in services.items {
      let annotations = svc.metadata.annotations.clone().unwrap_or_default();
      let annotations: HashMap<String, String> = annotations.into_iter().collect();
      let matched = filters
        .iter()
        .all(|(k, v)| annotations.get(k).map(|av| av == v).unwrap_or(false));
      if !matched {
        continue;
      }
      let Some(name) = svc.metadata.name.clone() else { continue };
      if let Some(instance) = self.service_to_instance(&name, annotations).await? {
        results.push(instance);
      }
    }
    let total_count = results.len();
    Ok(SearchResult { results, total_count })
  }

  async fn run(&self, spec: RunSpec) -> Result<PluginInstance> {
    let mgmt_labels: BTreeMap<String, String> =
      labels::to_management_labels(&spec.labels).into_iter().collect();

    let svc_api: Api<Service> = Api::namespaced(self.client.clone(), &self.namespace);
    let deploy_api: Api<Deployment> = Api::namespaced(self.client.clone(), &self.namespace);

    let service_existed = match svc_api.get(&spec.name).await {
      Ok(_) => true,
      Err(e) if is_not_found(&e) => false,
      Err(e) => return Err(config_err("kubernetes get service failed")(e)),
    };
    if !service_existed {
      let service = self.build_service(&spec, &mgmt_labels);
      svc_api
        .create(&PostParams::default(), &service)
        .await
        .map_err(config_err("kubernetes create service failed"))?;
    }

    let deployment_existed = match deploy_api.get(&spec.name).await {
      Ok(_) => true,
      Err(e) if is_not_found(&e) => false,
      Err(e) => return Err(config_err("kubernetes get deployment failed")(e)),
    };
    if !deployment_existed {
      let resource_type = spec
        .labels
        .get(labels::LABEL_RESOURCE_TYPE)
        .cloned()
        .unwrap_or_default();
      let plugin_id = spec.labels.get(labels::LABEL_PLUGIN_ID).cloned().unwrap_or_default();
      let replicas = self.replica.lookup(&resource_type, &plugin_id);
      let deployment = self.build_deployment(&spec, &mgmt_labels, replicas);
      deploy_api
        .create(&PostParams::default(), &deployment)
        .await
        .map_err(config_err("kubernetes create deployment failed"))?;

      tokio::time::sleep(DEPLOYMENT_INITIAL_SLEEP).await;
      self.wait_for_deployment_available(&spec.name).await;
    }

    let endpoints = if self.headless {
      let readiness = EndpointsReadiness {
        client: self.client.clone(),
        namespace: self.namespace.clone(),
        name: spec.name.clone(),
      };
      let found =
        poll_until_ready(&readiness, ENDPOINTS_POLL_INTERVAL, ENDPOINTS_POLL_DEADLINE).await;
      Some(found)
    } else {
      None
    };

    Ok(PluginInstance {
      handle: spec.name.clone(),
      plugin_id: spec.labels.get(labels::LABEL_PLUGIN_ID).cloned().unwrap_or_default(),
      version: spec.labels.get(labels::LABEL_VERSION).cloned().unwrap_or_default(),
      image: spec.image.clone(),
      endpoint: spec.labels.get(labels::LABEL_ENDPOINT).cloned().unwrap_or_default(),
      endpoints,
      status: InstanceStatus::Active,
      labels: spec.labels,
    })
  }

  async fn stop(&self, instance: &PluginInstance) -> Result<bool> {
    self.delete_deployment(&instance.handle).await?;
    self.delete_service(&instance.handle).await?;
    Ok(true)
  }

  async fn list_used_ports(&self) -> Result<HashSet<u16>> {
    let api: Api<Service> = Api::namespaced(self.client.clone(), &self.namespace);
    let services = api
      .list(&ListParams::default())
      .await
      .map_err(config_err("kubernetes list services failed"))?;
    let mut ports = HashSet::new();
    for svc in services.items {
      let Some(spec) = svc.spec else { continue };
      let Some(svc_ports) = spec.ports else { continue };
      for port in svc_ports {
        if port.port > 0 {
          ports.insert(port.port as u16);
        }
      }
    }
    Ok(ports)
  }

  fn synthesize_endpoint(&self, _supervisor_hostname: &str, name: &str, host_port: u16) -> String {
    crate::endpoint::kubernetes_endpoint(name, &self.hostname, host_port)
  }
}
