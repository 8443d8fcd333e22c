//! Container Backend Interface (spec.md §4.1): the capability set
//! `{search, run, stop, list_used_ports}` that both the Docker and
//! Kubernetes substrates honour identically.

use std::collections::HashSet;

use async_trait::async_trait;
use supervisor_client::{PluginInstance, SupervisorError};

pub mod docker;
pub mod kubernetes;

pub type Result<T> = std::result::Result<T, SupervisorError>;

/// Per-domain registry pull credentials, threaded through `run` so a
/// backend can authenticate an image pull (spec.md §4.1).
#[derive(Debug, Clone, Default)]
pub struct RegistryAuth {
  pub server: String,
  pub username: String,
  pub password: String,
}

/// What `install` asks a backend to realize as a running plugin instance.
#[derive(Debug, Clone)]
pub struct RunSpec {
  pub image: String,
  pub labels: std::collections::HashMap<String, String>,
  /// Host-facing port, allocated by the port allocator.
  pub host_port: u16,
  /// Port the plugin listens on inside the container — fixed at 50051
  /// (spec.md §4.6).
  pub target_port: u16,
  /// Deterministic name for the underlying container/Service+Deployment
  /// pair (spec.md §4.5).
  pub name: String,
  pub registry: Option<RegistryAuth>,
}

#[derive(Debug, Clone, Default)]
pub struct SearchResult {
  pub results: Vec<PluginInstance>,
  pub total_count: usize,
}

/// Pure contract (spec.md §4.1). All substrate-specific errors are
/// normalized to `SupervisorError::Configuration` by the implementor, so
/// the reconciliation engine has a single failure mode to reason about
/// (spec.md §7).
#[async_trait]
pub trait ContainerBackend: Send + Sync {
  /// `filters` is a label-equality AND match: every `(k, v)` pair must be
  /// present on a result for it to be returned. Never errors on an empty
  /// result set.
  async fn search(&self, filters: &[(String, String)]) -> Result<SearchResult>;

  /// Blocks until the instance is observably running or a bounded timeout
  /// elapses (spec.md §4.2, §4.3); a timeout yields a degraded
  /// (non-`ACTIVE`) result rather than an error.
  async fn run(&self, spec: RunSpec) -> Result<PluginInstance>;

  /// `true` once the instance has been completely torn down.
  async fn stop(&self, instance: &PluginInstance) -> Result<bool>;

  /// Integer host ports currently bound by the backend. Never errors;
  /// returns an empty set on parse failures of per-instance data.
  async fn list_used_ports(&self) -> Result<HashSet<u16>>;

  /// The externally-advertised gRPC URL for a plugin (spec.md §4.5), which
  /// differs per substrate: Docker addresses the supervisor's own
  /// hostname, Kubernetes addresses the per-install Service/Deployment
  /// `name` qualified by the cluster-internal DNS suffix. Synthesized
  /// *before* `run` is called, since the endpoint is written into the
  /// canonical labels before the instance is created.
  fn synthesize_endpoint(&self, supervisor_hostname: &str, name: &str, host_port: u16) -> String;
}

/// The only runtime branching left after the service-locator redesign
/// (spec.md §9 REDESIGN FLAGS): `BackendKind::Docker | Kubernetes`,
/// selected once at startup.
pub enum Backend {
  Docker(docker::DockerBackend),
  Kubernetes(Box<kubernetes::KubernetesBackend>),
}

#[async_trait]
impl ContainerBackend for Backend {
  async fn search(&self, filters: &[(String, String)]) -> Result<SearchResult> {
    match self {
      Backend::Docker(b) => b.search(filters).await,
      Backend::Kubernetes(b) => b.search(filters).await,
    }
  }

  async fn run(&self, spec: RunSpec) -> Result<PluginInstance> {
    match self {
      Backend::Docker(b) => b.run(spec).await,
      Backend::Kubernetes(b) => b.run(spec).await,
    }
  }

  async fn stop(&self, instance: &PluginInstance) -> Result<bool> {
    match self {
      Backend::Docker(b) => b.stop(instance).await,
      Backend::Kubernetes(b) => b.stop(instance).await,
    }
  }

  async fn list_used_ports(&self) -> Result<HashSet<u16>> {
    match self {
      Backend::Docker(b) => b.list_used_ports().await,
      Backend::Kubernetes(b) => b.list_used_ports().await,
    }
  }

  fn synthesize_endpoint(&self, supervisor_hostname: &str, name: &str, host_port: u16) -> String {
    match self {
      Backend::Docker(b) => b.synthesize_endpoint(supervisor_hostname, name, host_port),
      Backend::Kubernetes(b) => b.synthesize_endpoint(supervisor_hostname, name, host_port),
    }
  }
}
