use thiserror::Error;

/// Semantic error surface the reconciliation engine reasons about. Every
/// backend and RPC client wrapper normalizes its substrate-specific errors
/// down to one of these variants, so callers never need to match on
/// Docker/Kubernetes/tonic error types directly.
#[derive(Debug, Error)]
pub enum SupervisorError {
  /// Missing or invalid config, or the container substrate / an RPC peer
  /// is unreachable. Tick-local recoverable unless raised at boot.
  #[error("configuration error: {0}")]
  Configuration(String),

  /// A required config key is absent or malformed in a way the caller
  /// should not retry past (e.g. too many endpoints, missing namespace).
  #[error("wrong configuration: {0}")]
  WrongConfiguration(String),

  /// A capability was invoked that the selected backend does not support.
  #[error("not implemented: {0}")]
  NotImplemented(String),

  /// The install stage of a sync tick failed partway through.
  #[error("install plugins failed: {plugins:?}")]
  InstallPlugins { plugins: Vec<String> },

  /// The delete stage of a sync tick failed partway through.
  #[error("delete plugins failed, excluding: {plugins:?}")]
  DeletePlugins { plugins: Vec<String> },

  /// The port allocator's range is fully in use.
  #[error("no host ports available in configured range")]
  ResourceExhausted,
}

pub type Result<T> = std::result::Result<T, SupervisorError>;

impl From<anyhow::Error> for SupervisorError {
  fn from(e: anyhow::Error) -> Self {
    SupervisorError::Configuration(format!("{e:#}"))
  }
}
