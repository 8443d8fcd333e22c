pub mod entities;
pub mod error;
pub mod labels;

pub mod plugin_v1 {
  tonic::include_proto!("plugin.v1");
}

pub mod repository_v1 {
  tonic::include_proto!("repository.v1");
}

pub use entities::*;
pub use error::{Result, SupervisorError};
