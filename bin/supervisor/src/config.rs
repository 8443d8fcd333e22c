use std::{collections::HashMap, path::PathBuf, str::FromStr, sync::OnceLock};

use anyhow::{Context, anyhow};
use clap::Parser;
use colored::Colorize;
use config::ConfigLoader;
use k8s_openapi::api::core::v1::{ResourceRequirements, Volume, VolumeMount};
use serde::{Deserialize, Serialize};
use supervisor_client::LogConfig;

/// `BACKEND` selects the container substrate, using the same literal values
/// the original config keys used (spec.md §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum BackendKind {
  #[default]
  Docker,
  Kubernetes,
}

impl FromStr for BackendKind {
  type Err = anyhow::Error;

  fn from_str(s: &str) -> anyhow::Result<Self> {
    match s {
      "DockerConnector" => Ok(BackendKind::Docker),
      "KubernetesConnector" => Ok(BackendKind::Kubernetes),
      other => Err(anyhow!(
        "unknown BACKEND '{other}', expected DockerConnector or KubernetesConnector"
      )),
    }
  }
}

impl<'de> Deserialize<'de> for BackendKind {
  fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
  where
    D: serde::Deserializer<'de>,
  {
    let s = String::deserialize(deserializer)?;
    BackendKind::from_str(&s).map_err(serde::de::Error::custom)
  }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ConsulConfig {
  pub host: String,
  pub port: u16,
  #[serde(default)]
  pub token: Option<String>,
}

/// `TOKEN_INFO = {protocol:"consul", config:{host,port,...}, uri:"/path/to/TOKEN"}`
/// (spec.md §6). The agent polls the KV store every 10s until a value
/// appears (see `token.rs`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenInfo {
  pub protocol: String,
  pub config: ConsulConfig,
  pub uri: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DockerConnectorConfig {
  pub start_port: u16,
  pub end_port: u16,
}

/// Maps `resource_type` or `resource_type?plugin_id` to a replica count
/// (spec.md §4.3 Replica Policy). Lookup prefers the plugin-qualified key,
/// falls back to the unqualified one, then to `default`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplicaPolicyConfig {
  #[serde(default = "default_replica_count")]
  pub default: u32,
  #[serde(flatten)]
  pub counts: HashMap<String, u32>,
}

fn default_replica_count() -> u32 {
  1
}

impl Default for ReplicaPolicyConfig {
  fn default() -> Self {
    ReplicaPolicyConfig { default: default_replica_count(), counts: HashMap::new() }
  }
}

impl ReplicaPolicyConfig {
  pub fn lookup(&self, resource_type: &str, plugin_id: &str) -> u32 {
    let qualified = format!("{resource_type}?{plugin_id}");
    self
      .counts
      .get(&qualified)
      .or_else(|| self.counts.get(resource_type))
      .copied()
      .unwrap_or(self.default)
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KubernetesConnectorConfig {
  pub start_port: u16,
  pub end_port: u16,
  /// No default: absent while the Kubernetes backend is selected is
  /// boot-fatal (spec.md §4.3 supplement, SPEC_FULL.md §4.3).
  pub namespace: String,
  #[serde(default)]
  pub headless: bool,
  /// Cluster-internal DNS suffix used by the endpoint synthesizer
  /// (spec.md §4.5). Defaults to `{namespace}.svc.cluster.local`.
  #[serde(default)]
  pub hostname: String,
  #[serde(default)]
  pub service_account: Option<String>,
  #[serde(default)]
  pub image_pull_secrets: Vec<String>,
  #[serde(default)]
  pub node_selector: HashMap<String, String>,
  #[serde(default)]
  pub env: HashMap<String, String>,
  #[serde(default)]
  pub resources: Option<ResourceRequirements>,
  #[serde(default)]
  pub volumes: Vec<Volume>,
  #[serde(default)]
  pub volume_mounts: Vec<VolumeMount>,
  #[serde(default)]
  pub replica: ReplicaPolicyConfig,
}

impl KubernetesConnectorConfig {
  pub fn hostname(&self) -> String {
    if self.hostname.is_empty() {
      format!("{}.svc.cluster.local", self.namespace)
    } else {
      self.hostname.clone()
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ConnectorsConfig {
  #[serde(default)]
  pub docker: DockerConnectorConfig,
  pub kubernetes: Option<KubernetesConnectorConfig>,
}

/// The supervisor's file-loadable, process-wide configuration. Loaded once
/// at startup (`supervisor_config()`) the same way `periphery_config()` is
/// in the teacher: env vars override a handful of scalars, everything else
/// (connectors, tags, labels) is file-only (SPEC_FULL.md §9).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupervisorConfig {
  pub name: String,
  pub hostname: String,
  #[serde(default)]
  pub token: String,
  #[serde(default)]
  pub token_info: Option<TokenInfo>,
  #[serde(default)]
  pub backend: BackendKind,
  #[serde(default)]
  pub connectors: ConnectorsConfig,
  #[serde(default)]
  pub tags: HashMap<String, String>,
  #[serde(default)]
  pub labels: HashMap<String, String>,
  #[serde(default = "default_publish_interval_secs")]
  pub publish_interval_secs: u64,
  #[serde(default = "default_sync_interval_secs")]
  pub sync_interval_secs: u64,
  #[serde(default = "default_lock_ttl_secs")]
  pub lock_ttl_secs: u64,
  pub plugin_service_address: String,
  pub repository_service_address: String,
  #[serde(default)]
  pub logging: LogConfig,
  #[serde(default)]
  pub pretty_startup_config: bool,
}

fn default_publish_interval_secs() -> u64 {
  30
}

fn default_sync_interval_secs() -> u64 {
  120
}

fn default_lock_ttl_secs() -> u64 {
  600
}

impl Default for SupervisorConfig {
  fn default() -> Self {
    SupervisorConfig {
      name: String::new(),
      hostname: String::new(),
      token: String::new(),
      token_info: None,
      backend: BackendKind::default(),
      connectors: ConnectorsConfig::default(),
      tags: HashMap::new(),
      labels: HashMap::new(),
      publish_interval_secs: default_publish_interval_secs(),
      sync_interval_secs: default_sync_interval_secs(),
      lock_ttl_secs: default_lock_ttl_secs(),
      plugin_service_address: String::new(),
      repository_service_address: String::new(),
      logging: LogConfig::default(),
      pretty_startup_config: false,
    }
  }
}

impl SupervisorConfig {
  /// A copy with secrets scrubbed, safe to log at startup.
  pub fn sanitized(&self) -> SupervisorConfig {
    let mut copy = self.clone();
    if !copy.token.is_empty() {
      copy.token = "***".to_string();
    }
    if let Some(info) = copy.token_info.as_mut() {
      info.config.token = info.config.token.as_ref().map(|_| "***".to_string());
    }
    copy
  }
}

/// Env var overrides for the small set of scalar keys, mirroring the
/// teacher's `Env` struct in `bin/periphery/src/config.rs`.
#[derive(Debug, Clone, Deserialize)]
pub struct Env {
  pub supervisor_config_paths: Vec<PathBuf>,
  #[serde(default)]
  pub supervisor_config_keywords: Vec<String>,
  pub name: Option<String>,
  pub hostname: Option<String>,
  pub token: Option<String>,
  pub backend: Option<BackendKind>,
  pub supervisor_publish_interval_secs: Option<u64>,
  pub supervisor_sync_interval_secs: Option<u64>,
  pub supervisor_lock_ttl_secs: Option<u64>,
  pub supervisor_plugin_service_address: Option<String>,
  pub supervisor_repository_service_address: Option<String>,
  pub supervisor_pretty_startup_config: Option<bool>,
}

#[derive(Parser)]
pub struct CliArgs {
  /// Path to a config file or directory of config files. Overrides
  /// `SUPERVISOR_CONFIG_PATHS` when given.
  #[arg(long)]
  pub config_path: Option<Vec<PathBuf>>,
}

pub fn supervisor_config() -> &'static SupervisorConfig {
  static SUPERVISOR_CONFIG: OnceLock<SupervisorConfig> = OnceLock::new();
  SUPERVISOR_CONFIG.get_or_init(|| {
    let env: Env =
      envy::from_env().expect("failed to parse supervisor environment");
    let args = CliArgs::parse();
    let config_paths =
      args.config_path.unwrap_or(env.supervisor_config_paths.clone());

    let mut config: SupervisorConfig = if config_paths.is_empty() {
      println!(
        "{}: No config paths found, using default config",
        "INFO".green(),
      );
      SupervisorConfig::default()
    } else {
      (ConfigLoader {
        paths: &config_paths.iter().map(PathBuf::as_path).collect::<Vec<_>>(),
        match_wildcards: &env
          .supervisor_config_keywords
          .iter()
          .map(String::as_str)
          .collect::<Vec<_>>(),
        include_file_name: ".supervisorinclude",
        merge_nested: true,
        extend_array: false,
        debug_print: false,
      })
      .load()
      .expect("failed at parsing config from paths")
    };

    if let Some(name) = env.name {
      config.name = name;
    }
    if let Some(hostname) = env.hostname {
      config.hostname = hostname;
    }
    if let Some(token) = env.token {
      config.token = token;
    }
    if let Some(backend) = env.backend {
      config.backend = backend;
    }
    if let Some(v) = env.supervisor_publish_interval_secs {
      config.publish_interval_secs = v;
    }
    if let Some(v) = env.supervisor_sync_interval_secs {
      config.sync_interval_secs = v;
    }
    if let Some(v) = env.supervisor_lock_ttl_secs {
      config.lock_ttl_secs = v;
    }
    if let Some(v) = env.supervisor_plugin_service_address {
      config.plugin_service_address = v;
    }
    if let Some(v) = env.supervisor_repository_service_address {
      config.repository_service_address = v;
    }
    if let Some(v) = env.supervisor_pretty_startup_config {
      config.pretty_startup_config = v;
    }

    if config.name.is_empty() {
      panic!("NAME is required and must be non-empty");
    }
    if config.hostname.is_empty() {
      panic!("HOSTNAME is required and must be non-empty");
    }
    if config.backend == BackendKind::Kubernetes
      && config
        .connectors
        .kubernetes
        .as_ref()
        .is_none_or(|k8s| k8s.namespace.is_empty())
    {
      panic!(
        "CONNECTORS.kubernetes.namespace is required when BACKEND=KubernetesConnector"
      );
    }

    config
  })
}

/// Resolves config validation errors that should fail the boot rather than
/// panic via `supervisor_config()`'s `OnceLock::get_or_init`, for callers
/// that want a `Result` (e.g. tests).
pub fn validate(config: &SupervisorConfig) -> anyhow::Result<()> {
  if config.name.is_empty() {
    return Err(anyhow!("NAME is required and must be non-empty"));
  }
  if config.hostname.is_empty() {
    return Err(anyhow!("HOSTNAME is required and must be non-empty"));
  }
  if config.backend == BackendKind::Kubernetes {
    let k8s = config
      .connectors
      .kubernetes
      .as_ref()
      .context("CONNECTORS.kubernetes is required when BACKEND=KubernetesConnector")?;
    if k8s.namespace.is_empty() {
      return Err(anyhow!(
        "CONNECTORS.kubernetes.namespace is required when BACKEND=KubernetesConnector"
      ));
    }
  }
  Ok(())
}
