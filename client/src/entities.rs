use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// `(name, hostname, domain_id, tags, labels)`, immutable for the process
/// lifetime. `name` is the sole authority over plugins labelled with it,
/// scoped to `domain_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupervisorIdentity {
  pub name: String,
  pub hostname: String,
  pub domain_id: String,
  #[serde(default)]
  pub tags: HashMap<String, String>,
  #[serde(default)]
  pub labels: HashMap<String, String>,
}

/// A plugin identity `(plugin_id, version)`, stable across desired/actual.
#[derive(
  Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
pub struct PluginKey {
  pub plugin_id: String,
  pub version: String,
}

/// Desired-set lifecycle state, as reported by the Plugin Service.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PluginState {
  Active,
  ReProvisioning,
  Error,
  #[serde(other)]
  Unknown,
}

/// A plugin as returned by `Plugin Service.list_plugins` — the desired set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginSpec {
  pub plugin_id: String,
  pub version: String,
  pub service_type: String,
  pub state: PluginState,
  pub domain_id: String,
}

impl PluginSpec {
  pub fn key(&self) -> PluginKey {
    PluginKey { plugin_id: self.plugin_id.clone(), version: self.version.clone() }
  }
}

/// Two-state reduction of substrate status (spec.md §4.1).
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InstanceStatus {
  Active,
  Error,
}

/// A plugin container/deployment the supervisor is aware of, identified
/// externally by `(plugin_id, version)` and internally by a backend-native
/// handle. `endpoints` is only populated for headless Kubernetes services;
/// everything else falls back to a single-element list built from
/// `endpoint` at publish time (spec.md §4.8).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginInstance {
  /// Backend-native handle: Docker container id, or Kubernetes object name.
  pub handle: String,
  pub plugin_id: String,
  pub version: String,
  pub image: String,
  pub endpoint: String,
  #[serde(default)]
  pub endpoints: Option<Vec<String>>,
  pub status: InstanceStatus,
  pub labels: HashMap<String, String>,
}

impl PluginInstance {
  pub fn key(&self) -> PluginKey {
    PluginKey { plugin_id: self.plugin_id.clone(), version: self.version.clone() }
  }

  /// `endpoints` falling back to `[endpoint]` when the backend produced no
  /// multi-endpoint list (spec.md §4.8).
  pub fn endpoints_or_fallback(&self) -> Vec<String> {
    self
      .endpoints
      .clone()
      .filter(|e| !e.is_empty())
      .unwrap_or_else(|| vec![self.endpoint.clone()])
  }
}

/// One entry of a publish payload's `plugin_info` list (spec.md §6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishedPlugin {
  pub plugin_id: String,
  pub version: String,
  pub state: String,
  pub endpoint: String,
  pub endpoints: Vec<String>,
}

impl From<&PluginInstance> for PublishedPlugin {
  fn from(instance: &PluginInstance) -> Self {
    PublishedPlugin {
      plugin_id: instance.plugin_id.clone(),
      version: instance.version.clone(),
      state: match instance.status {
        InstanceStatus::Active => "ACTIVE".to_string(),
        InstanceStatus::Error => "ERROR".to_string(),
      },
      endpoint: instance.endpoint.clone(),
      endpoints: instance.endpoints_or_fallback(),
    }
  }
}

/// `tracing::Level`, without requiring `tracing` as a dependency here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
  Error,
  Warn,
  Info,
  Debug,
  Trace,
}

impl Default for LogLevel {
  fn default() -> Self {
    LogLevel::Info
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StdioLogMode {
  #[default]
  Standard,
  Json,
  None,
}

/// Logging config, loaded the same way as the rest of [`SupervisorConfig`]
/// (env first, then file). `otlp_endpoint` empty disables the OTLP layer
/// entirely, matching komodo's logger crate contract (spec.md §9).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogConfig {
  #[serde(default)]
  pub level: LogLevel,
  #[serde(default)]
  pub stdio: StdioLogMode,
  #[serde(default)]
  pub pretty: bool,
  #[serde(default)]
  pub otlp_endpoint: String,
  #[serde(default = "default_otel_service_name")]
  pub opentelemetry_service_name: String,
}

fn default_otel_service_name() -> String {
  "supervisor".to_string()
}

impl Default for LogConfig {
  fn default() -> Self {
    LogConfig {
      level: LogLevel::Info,
      stdio: StdioLogMode::Standard,
      pretty: false,
      otlp_endpoint: String::new(),
      opentelemetry_service_name: default_otel_service_name(),
    }
  }
}

/// Resolved install metadata from the Repository Service (spec.md §4.6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryPluginInfo {
  pub plugin_id: String,
  pub name: String,
  pub registry_url: String,
  pub image: String,
  pub service_type: String,
}
