//! Reconciliation Engine (spec.md §4.6): the `sync_plugins` state machine,
//! run under a per-`(domain_id, name)` lock with a fixed stage order that
//! is never reordered or skipped:
//!
//! `ACQUIRE_LOCK -> FETCH_DESIRED -> RECOVER -> INSTALL -> DELETE -> PUBLISH -> RELEASE_LOCK`

use std::collections::HashSet;

use cache::{DistributedLock, supervisor_lock_key};
use supervisor_client::{
  PluginInstance, PluginSpec, PluginState, Result, SupervisorError, SupervisorIdentity, labels,
};

use crate::backend::{ContainerBackend, RunSpec};
use crate::endpoint;
use crate::grpc::{PluginServiceApi, RepositoryServiceApi};
use crate::port::PortAllocator;
use crate::publish;

/// Fixed per spec.md §4.6; every plugin listens on this port inside its
/// container/pod regardless of the host-facing port the allocator hands
/// out.
const TARGET_PORT: u16 = 50051;

fn search_filters_for(name: &str, plugin_id: &str, version: &str) -> [(String, String); 3] {
  [
    (labels::LABEL_NAME.to_string(), name.to_string()),
    (labels::LABEL_PLUGIN_ID.to_string(), plugin_id.to_string()),
    (labels::LABEL_VERSION.to_string(), version.to_string()),
  ]
}

async fn install_plugin(
  backend: &dyn ContainerBackend,
  repository_client: &dyn RepositoryServiceApi,
  ports: &PortAllocator,
  identity: &SupervisorIdentity,
  spec: &PluginSpec,
) -> Result<PluginInstance> {
  let plugin_info = repository_client
    .get(spec.plugin_id.clone(), identity.domain_id.clone())
    .await?;
  let image_uri = format!("{}/{}:{}", plugin_info.registry_url, plugin_info.image, spec.version);
  let name = endpoint::generate_name(&spec.plugin_id);
  let host_port = ports.allocate(backend).await?;
  let endpoint_url = backend.synthesize_endpoint(&identity.hostname, &name, host_port);

  // The newer `resource_type` field is authoritative; fall back to the
  // Repository Service's `service_type` only when the desired-set entry
  // never carried one.
  let resource_type = if spec.service_type.is_empty() {
    plugin_info.service_type.clone()
  } else {
    spec.service_type.clone()
  };

  let canonical = labels::CanonicalLabels {
    supervisor_name: identity.name.clone(),
    domain_id: identity.domain_id.clone(),
    plugin_id: spec.plugin_id.clone(),
    image: image_uri.clone(),
    version: spec.version.clone(),
    resource_type,
    endpoint: endpoint_url,
  }
  .into_map();

  let run_spec = RunSpec {
    image: image_uri,
    labels: canonical,
    host_port,
    target_port: TARGET_PORT,
    name,
    registry: None,
  };

  // The reservation only needs to outlive the race window between
  // `allocate` and `run` within this tick; once `run` returns (success or
  // failure) the backend's own `list_used_ports` is ground truth again, so
  // release it either way rather than leaking it for the process lifetime.
  let result = backend.run(run_spec).await;
  ports.release(host_port);
  result
}

/// Installs a fresh instance first, then stops whatever stale instance(s)
/// matched, minimizing downtime (spec.md §4.6). Errors are logged and do
/// not fail the tick.
async fn recover_plugin(
  backend: &dyn ContainerBackend,
  repository_client: &dyn RepositoryServiceApi,
  ports: &PortAllocator,
  identity: &SupervisorIdentity,
  spec: &PluginSpec,
) {
  let filters = search_filters_for(&identity.name, &spec.plugin_id, &spec.version);
  let stale = match backend.search(&filters).await {
    Ok(found) => found.results,
    Err(e) => {
      tracing::warn!(
        "recover: search failed for {}:{} | {e:#}",
        spec.plugin_id,
        spec.version
      );
      Vec::new()
    }
  };

  if let Err(e) = install_plugin(backend, repository_client, ports, identity, spec).await {
    tracing::warn!("recover: install failed for {}:{} | {e:#}", spec.plugin_id, spec.version);
    return;
  }

  for instance in stale {
    if let Err(e) = backend.stop(&instance).await {
      tracing::warn!(
        "recover: failed to stop stale instance {} | {e:#}",
        instance.handle
      );
    }
  }
}

async fn run_stages(
  backend: &dyn ContainerBackend,
  plugin_client: &dyn PluginServiceApi,
  repository_client: &dyn RepositoryServiceApi,
  ports: &PortAllocator,
  identity: &SupervisorIdentity,
) -> Result<()> {
  // FETCH_DESIRED
  let desired = plugin_client
    .list_plugins(
      identity.domain_id.clone(),
      Some(identity.name.clone()),
      Some(identity.hostname.clone()),
    )
    .await?;

  // RECOVER
  for spec in desired
    .iter()
    .filter(|p| matches!(p.state, PluginState::ReProvisioning | PluginState::Error))
  {
    recover_plugin(backend, repository_client, ports, identity, spec).await;
  }

  // INSTALL
  let mut failed_installs = Vec::new();
  for spec in &desired {
    let filters = search_filters_for(&identity.name, &spec.plugin_id, &spec.version);
    let found = backend.search(&filters).await?;
    if !found.results.is_empty() {
      continue;
    }
    if let Err(e) = install_plugin(backend, repository_client, ports, identity, spec).await {
      tracing::warn!("install failed for {}:{} | {e:#}", spec.plugin_id, spec.version);
      failed_installs.push(format!("{}:{}", spec.plugin_id, spec.version));
    }
  }
  if !failed_installs.is_empty() {
    return Err(SupervisorError::InstallPlugins { plugins: failed_installs });
  }

  // DELETE
  let owned_filters = [(labels::LABEL_NAME.to_string(), identity.name.clone())];
  let owned = backend.search(&owned_filters).await?;
  let desired_keys: HashSet<(String, String)> =
    desired.iter().map(|p| (p.plugin_id.clone(), p.version.clone())).collect();
  let to_delete = owned
    .results
    .into_iter()
    .filter(|instance| !desired_keys.contains(&(instance.plugin_id.clone(), instance.version.clone())))
    .collect::<Vec<_>>();

  for (idx, instance) in to_delete.iter().enumerate() {
    if let Err(e) = backend.stop(instance).await {
      tracing::warn!("stop failed for instance {} | {e:#}", instance.handle);
      let excluded = to_delete[idx..]
        .iter()
        .map(|i| format!("{}:{}", i.plugin_id, i.version))
        .collect();
      return Err(SupervisorError::DeletePlugins { plugins: excluded });
    }
  }

  // PUBLISH
  publish::publish_inventory(backend, plugin_client, identity).await?;

  Ok(())
}

/// `sync_plugins(hostname, name, domain_id, tags, labels)` (spec.md §4.6).
/// Drops the tick entirely (no queueing) if the lock is already held. The
/// lock is released on every exit path, including errors.
pub async fn sync_plugins(
  backend: &dyn ContainerBackend,
  lock: &dyn DistributedLock,
  plugin_client: &dyn PluginServiceApi,
  repository_client: &dyn RepositoryServiceApi,
  ports: &PortAllocator,
  identity: &SupervisorIdentity,
) -> Result<()> {
  let lock_key = supervisor_lock_key(&identity.domain_id, &identity.name);
  if !lock.try_acquire(&lock_key) {
    tracing::debug!("sync tick dropped: lock {lock_key} already held");
    return Ok(());
  }

  let result = run_stages(backend, plugin_client, repository_client, ports, identity).await;
  lock.release(&lock_key);
  if let Err(e) = &result {
    tracing::warn!("sync tick failed | {e}");
  }
  result
}

#[cfg(test)]
mod tests {
  use std::sync::Mutex;

  use async_trait::async_trait;
  use cache::TtlLock;
  use supervisor_client::{InstanceStatus, PublishedPlugin, RepositoryPluginInfo};

  use super::*;
  use crate::backend::SearchResult;

  /// In-memory stand-in for both Docker and Kubernetes, so the engine's
  /// stage logic (spec.md §4.6) can be driven end-to-end without a real
  /// daemon or cluster (spec.md §8, SPEC_FULL.md §9).
  struct StubBackend {
    instances: Mutex<Vec<PluginInstance>>,
    run_calls: Mutex<Vec<String>>,
    stop_calls: Mutex<Vec<String>>,
    fail_run_for: Mutex<HashSet<String>>,
  }

  impl StubBackend {
    fn new(seed: Vec<PluginInstance>) -> Self {
      StubBackend {
        instances: Mutex::new(seed),
        run_calls: Mutex::new(Vec::new()),
        stop_calls: Mutex::new(Vec::new()),
        fail_run_for: Mutex::new(HashSet::new()),
      }
    }
  }

  #[async_trait]
  impl ContainerBackend for StubBackend {
    async fn search(&self, filters: &[(String, String)]) -> Result<SearchResult> {
      let results = self
        .instances
        .lock()
        .unwrap()
        .iter()
        .filter(|i| filters.iter().all(|(k, v)| i.labels.get(k).map(|av| av == v).unwrap_or(false)))
        .cloned()
        .collect::<Vec<_>>();
      let total_count = results.len();
      Ok(SearchResult { results, total_count })
    }

    async fn run(&self, spec: RunSpec) -> Result<PluginInstance> {
      let plugin_id = spec.labels.get(labels::LABEL_PLUGIN_ID).cloned().unwrap_or_default();
      self.run_calls.lock().unwrap().push(format!("{}:{}", plugin_id, spec.name));
      if self.fail_run_for.lock().unwrap().contains(&plugin_id) {
        return Err(SupervisorError::Configuration("stub: forced run failure".into()));
      }
      let instance = PluginInstance {
        handle: spec.name.clone(),
        plugin_id,
        version: spec.labels.get(labels::LABEL_VERSION).cloned().unwrap_or_default(),
        image: spec.image.clone(),
        endpoint: spec.labels.get(labels::LABEL_ENDPOINT).cloned().unwrap_or_default(),
        endpoints: None,
        status: InstanceStatus::Active,
        labels: spec.labels,
      };
      self.instances.lock().unwrap().push(instance.clone());
      Ok(instance)
    }

    async fn stop(&self, instance: &PluginInstance) -> Result<bool> {
      self.stop_calls.lock().unwrap().push(instance.handle.clone());
      self.instances.lock().unwrap().retain(|i| i.handle != instance.handle);
      Ok(true)
    }

    async fn list_used_ports(&self) -> Result<HashSet<u16>> {
      Ok(HashSet::new())
    }

    fn synthesize_endpoint(&self, supervisor_hostname: &str, _name: &str, host_port: u16) -> String {
      format!("grpc://{supervisor_hostname}:{host_port}")
    }
  }

  /// Stub Plugin Service: a fixed desired set and a recorder of every
  /// publish payload it receives.
  struct StubPluginService {
    desired: Vec<PluginSpec>,
    published: Mutex<Vec<Vec<PublishedPlugin>>>,
    fail_list: bool,
  }

  #[async_trait]
  impl PluginServiceApi for StubPluginService {
    async fn list_plugins(
      &self,
      _domain_id: String,
      _supervisor_id: Option<String>,
      _hostname: Option<String>,
    ) -> Result<Vec<PluginSpec>> {
      if self.fail_list {
        return Err(SupervisorError::Configuration("stub: plugin service unreachable".into()));
      }
      Ok(self.desired.clone())
    }

    async fn publish(
      &self,
      _identity: &SupervisorIdentity,
      plugin_info: Vec<PublishedPlugin>,
    ) -> Result<()> {
      self.published.lock().unwrap().push(plugin_info);
      Ok(())
    }
  }

  /// Stub Repository Service: resolves every `plugin_id` to a deterministic
  /// registry URL / image, with no real network call.
  struct StubRepositoryService;

  #[async_trait]
  impl RepositoryServiceApi for StubRepositoryService {
    async fn get(&self, plugin_id: String, _domain_id: String) -> Result<RepositoryPluginInfo> {
      Ok(RepositoryPluginInfo {
        plugin_id: plugin_id.clone(),
        name: plugin_id.clone(),
        registry_url: "registry.example.com".to_string(),
        image: format!("{plugin_id}-image"),
        service_type: "inventory.collector".to_string(),
      })
    }
  }

  fn identity() -> SupervisorIdentity {
    SupervisorIdentity {
      name: "root".to_string(),
      hostname: "host.example.com".to_string(),
      domain_id: "domain-1234".to_string(),
      tags: Default::default(),
      labels: Default::default(),
    }
  }

  fn desired_spec(plugin_id: &str, version: &str, state: PluginState) -> PluginSpec {
    PluginSpec {
      plugin_id: plugin_id.to_string(),
      version: version.to_string(),
      service_type: String::new(),
      state,
      domain_id: "domain-1234".to_string(),
    }
  }

  fn instance(name: &str, plugin_id: &str, version: &str) -> PluginInstance {
    let mut labels = std::collections::HashMap::new();
    labels.insert(labels::LABEL_NAME.to_string(), name.to_string());
    labels.insert(labels::LABEL_PLUGIN_ID.to_string(), plugin_id.to_string());
    labels.insert(labels::LABEL_VERSION.to_string(), version.to_string());
    PluginInstance {
      handle: format!("{plugin_id}-{version}"),
      plugin_id: plugin_id.to_string(),
      version: version.to_string(),
      image: "img".to_string(),
      endpoint: "grpc://host:50010".to_string(),
      endpoints: None,
      status: InstanceStatus::Active,
      labels,
    }
  }

  #[test]
  fn lock_drops_a_concurrent_tick() {
    let lock = TtlLock::new(std::time::Duration::from_secs(600));
    assert!(lock.try_acquire("supervisor:d1:root"));
    assert!(!lock.try_acquire("supervisor:d1:root"));
  }

  // Scenario 1 (spec.md §8): fresh install, desired [(p-1,v1),(p-2,v1)],
  // nothing local — expect two `run` calls and a publish with both.
  #[tokio::test]
  async fn scenario_fresh_install() {
    let backend = StubBackend::new(Vec::new());
    let plugin_service = StubPluginService {
      desired: vec![
        desired_spec("p-1", "v1", PluginState::Active),
        desired_spec("p-2", "v1", PluginState::Active),
      ],
      published: Mutex::new(Vec::new()),
      fail_list: false,
    };
    let repository = StubRepositoryService;
    let lock = TtlLock::new(std::time::Duration::from_secs(600));
    let ports = PortAllocator::new(50060, 50070);

    let result =
      sync_plugins(&backend, &lock, &plugin_service, &repository, &ports, &identity()).await;
    assert!(result.is_ok());
    assert_eq!(backend.run_calls.lock().unwrap().len(), 2);
    assert!(backend.stop_calls.lock().unwrap().is_empty());

    let published = plugin_service.published.lock().unwrap();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].len(), 2);
    let endpoints: HashSet<_> = published[0].iter().map(|p| p.endpoint.clone()).collect();
    assert_eq!(endpoints.len(), 2, "each install gets a distinct host port / endpoint");
  }

  // Scenario 2: steady state — desired and local both [(p-1,v1)]. Expect
  // zero run, zero stop, one publish with the single plugin.
  #[tokio::test]
  async fn scenario_steady_state() {
    let backend = StubBackend::new(vec![instance("root", "p-1", "v1")]);
    let plugin_service = StubPluginService {
      desired: vec![desired_spec("p-1", "v1", PluginState::Active)],
      published: Mutex::new(Vec::new()),
      fail_list: false,
    };
    let repository = StubRepositoryService;
    let lock = TtlLock::new(std::time::Duration::from_secs(600));
    let ports = PortAllocator::new(50060, 50070);

    let result =
      sync_plugins(&backend, &lock, &plugin_service, &repository, &ports, &identity()).await;
    assert!(result.is_ok());
    assert!(backend.run_calls.lock().unwrap().is_empty());
    assert!(backend.stop_calls.lock().unwrap().is_empty());
    assert_eq!(plugin_service.published.lock().unwrap()[0].len(), 1);
  }

  // Scenario 3: version upgrade — desired [(p-1,v2)], local [(p-1,v1)].
  // Expect install (p-1,v2) first, then stop (p-1,v1).
  #[tokio::test]
  async fn scenario_version_upgrade() {
    let backend = StubBackend::new(vec![instance("root", "p-1", "v1")]);
    let plugin_service = StubPluginService {
      desired: vec![desired_spec("p-1", "v2", PluginState::Active)],
      published: Mutex::new(Vec::new()),
      fail_list: false,
    };
    let repository = StubRepositoryService;
    let lock = TtlLock::new(std::time::Duration::from_secs(600));
    let ports = PortAllocator::new(50060, 50070);

    let result =
      sync_plugins(&backend, &lock, &plugin_service, &repository, &ports, &identity()).await;
    assert!(result.is_ok());
    assert_eq!(backend.run_calls.lock().unwrap().len(), 1);
    assert_eq!(backend.stop_calls.lock().unwrap(), &vec!["p-1-v1".to_string()]);
    let remaining = backend.instances.lock().unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].version, "v2");
  }

  // Scenario 4: re-provisioning — desired [(p-1,v1,RE_PROVISIONING)], local
  // [(p-1,v1)]. Expect recover: install a fresh replica, then stop the old
  // one (install-before-delete to minimize downtime).
  #[tokio::test]
  async fn scenario_re_provisioning_recovers_before_deleting() {
    let backend = StubBackend::new(vec![instance("root", "p-1", "v1")]);
    let plugin_service = StubPluginService {
      desired: vec![desired_spec("p-1", "v1", PluginState::ReProvisioning)],
      published: Mutex::new(Vec::new()),
      fail_list: false,
    };
    let repository = StubRepositoryService;
    let lock = TtlLock::new(std::time::Duration::from_secs(600));
    let ports = PortAllocator::new(50060, 50070);

    let result =
      sync_plugins(&backend, &lock, &plugin_service, &repository, &ports, &identity()).await;
    assert!(result.is_ok());
    // RECOVER installs one fresh instance; INSTALL then finds the (p-1,v1)
    // key already satisfied and does not install again.
    assert_eq!(backend.run_calls.lock().unwrap().len(), 1);
    assert_eq!(backend.stop_calls.lock().unwrap().len(), 1);
    let remaining = backend.instances.lock().unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].plugin_id, "p-1");
  }

  // Scenario 5: desired shrinks — desired [], local [(p-1,v1),(p-2,v1)].
  // Expect two stop calls; final publish payload carries empty plugin_info.
  #[tokio::test]
  async fn scenario_desired_shrinks_to_empty() {
    let backend =
      StubBackend::new(vec![instance("root", "p-1", "v1"), instance("root", "p-2", "v1")]);
    let plugin_service = StubPluginService {
      desired: Vec::new(),
      published: Mutex::new(Vec::new()),
      fail_list: false,
    };
    let repository = StubRepositoryService;
    let lock = TtlLock::new(std::time::Duration::from_secs(600));
    let ports = PortAllocator::new(50060, 50070);

    let result =
      sync_plugins(&backend, &lock, &plugin_service, &repository, &ports, &identity()).await;
    assert!(result.is_ok());
    assert_eq!(backend.stop_calls.lock().unwrap().len(), 2);
    assert!(backend.run_calls.lock().unwrap().is_empty());
    assert!(plugin_service.published.lock().unwrap()[0].is_empty());
  }

  // Scenario 6: substrate down mid-tick — the Plugin Service call itself
  // fails. Expect the tick to return an error, release the lock, and
  // perform zero mutations.
  #[tokio::test]
  async fn scenario_plugin_service_failure_performs_no_mutations() {
    let backend = StubBackend::new(vec![instance("root", "p-1", "v1")]);
    let plugin_service = StubPluginService {
      desired: vec![desired_spec("p-1", "v1", PluginState::Active)],
      published: Mutex::new(Vec::new()),
      fail_list: true,
    };
    let repository = StubRepositoryService;
    let lock = TtlLock::new(std::time::Duration::from_secs(600));
    let ports = PortAllocator::new(50060, 50070);
    let lock_key = supervisor_lock_key(&identity().domain_id, &identity().name);

    let result =
      sync_plugins(&backend, &lock, &plugin_service, &repository, &ports, &identity()).await;
    assert!(result.is_err());
    assert!(backend.run_calls.lock().unwrap().is_empty());
    assert!(backend.stop_calls.lock().unwrap().is_empty());
    assert!(plugin_service.published.lock().unwrap().is_empty());
    // Lock was released on the error exit path — a subsequent tick can
    // acquire it immediately.
    assert!(lock.try_acquire(&lock_key));
  }

  // Boundary: a sync tick that starts while another holds the lock returns
  // immediately and performs no backend calls.
  #[tokio::test]
  async fn concurrent_tick_is_dropped_without_backend_calls() {
    let backend = StubBackend::new(Vec::new());
    let plugin_service = StubPluginService {
      desired: vec![desired_spec("p-1", "v1", PluginState::Active)],
      published: Mutex::new(Vec::new()),
      fail_list: false,
    };
    let repository = StubRepositoryService;
    let lock = TtlLock::new(std::time::Duration::from_secs(600));
    let ports = PortAllocator::new(50060, 50070);
    let lock_key = supervisor_lock_key(&identity().domain_id, &identity().name);
    assert!(lock.try_acquire(&lock_key));

    let result =
      sync_plugins(&backend, &lock, &plugin_service, &repository, &ports, &identity()).await;
    assert!(result.is_ok());
    assert!(backend.run_calls.lock().unwrap().is_empty());
    assert!(plugin_service.published.lock().unwrap().is_empty());
  }

  // Tick-fatal: if any install fails, the tick aborts with
  // `InstallPlugins` rather than silently continuing to DELETE.
  #[tokio::test]
  async fn install_failure_aborts_the_tick_with_install_plugins_error() {
    let backend = StubBackend::new(Vec::new());
    backend.fail_run_for.lock().unwrap().insert("p-1".to_string());
    let plugin_service = StubPluginService {
      desired: vec![desired_spec("p-1", "v1", PluginState::Active)],
      published: Mutex::new(Vec::new()),
      fail_list: false,
    };
    let repository = StubRepositoryService;
    let lock = TtlLock::new(std::time::Duration::from_secs(600));
    let ports = PortAllocator::new(50060, 50070);

    let result =
      sync_plugins(&backend, &lock, &plugin_service, &repository, &ports, &identity()).await;
    assert!(matches!(result, Err(SupervisorError::InstallPlugins { .. })));
    // PUBLISH never ran since INSTALL aborted the tick.
    assert!(plugin_service.published.lock().unwrap().is_empty());
  }

  // Two back-to-back syncs with an unchanged desired set leave the backend
  // bit-identical and perform zero install/stop calls on the second pass.
  #[tokio::test]
  async fn repeated_sync_with_unchanged_desired_set_is_a_no_op_second_time() {
    let backend = StubBackend::new(Vec::new());
    let plugin_service = StubPluginService {
      desired: vec![desired_spec("p-1", "v1", PluginState::Active)],
      published: Mutex::new(Vec::new()),
      fail_list: false,
    };
    let repository = StubRepositoryService;
    let lock = TtlLock::new(std::time::Duration::from_secs(600));
    let ports = PortAllocator::new(50060, 50070);

    sync_plugins(&backend, &lock, &plugin_service, &repository, &ports, &identity())
      .await
      .unwrap();
    assert_eq!(backend.run_calls.lock().unwrap().len(), 1);

    sync_plugins(&backend, &lock, &plugin_service, &repository, &ports, &identity())
      .await
      .unwrap();
    assert_eq!(backend.run_calls.lock().unwrap().len(), 1, "no second install");
    assert!(backend.stop_calls.lock().unwrap().is_empty());
  }

  #[tokio::test]
  async fn delete_stage_only_removes_instances_outside_the_desired_set() {
    let backend = StubBackend::new(vec![
      instance("root", "plugin-a", "1.0"),
      instance("root", "plugin-b", "1.0"),
    ]);
    let owned_filters = [(labels::LABEL_NAME.to_string(), "root".to_string())];
    let owned = backend.search(&owned_filters).await.unwrap();
    assert_eq!(owned.total_count, 2);

    let desired_keys: HashSet<(String, String)> =
      HashSet::from([("plugin-a".to_string(), "1.0".to_string())]);
    let to_delete: Vec<_> = owned
      .results
      .into_iter()
      .filter(|i| !desired_keys.contains(&(i.plugin_id.clone(), i.version.clone())))
      .collect();
    assert_eq!(to_delete.len(), 1);
    assert_eq!(to_delete[0].plugin_id, "plugin-b");

    for instance in &to_delete {
      backend.stop(instance).await.unwrap();
    }
    let remaining = backend.search(&owned_filters).await.unwrap();
    assert_eq!(remaining.total_count, 1);
    assert_eq!(remaining.results[0].plugin_id, "plugin-a");
  }
}
