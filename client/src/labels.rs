//! Canonical label keys and the codec that reduces them to the Kubernetes
//! "management" label subset. Keys are a stable wire contract — every
//! running plugin instance carries all seven, and `"Unknown"` is substituted
//! for any that are missing rather than treating absence as an error.

use std::collections::HashMap;

pub const LABEL_NAME: &str = "spaceone.supervisor.name";
pub const LABEL_DOMAIN_ID: &str = "spaceone.supervisor.domain_id";
pub const LABEL_PLUGIN_ID: &str = "spaceone.supervisor.plugin_id";
pub const LABEL_IMAGE: &str = "spaceone.supervisor.plugin.image";
pub const LABEL_VERSION: &str = "spaceone.supervisor.plugin.version";
pub const LABEL_RESOURCE_TYPE: &str =
  "spaceone.supervisor.plugin.resource_type";
pub const LABEL_ENDPOINT: &str = "spaceone.supervisor.plugin.endpoint";

/// All seven canonical keys, in the order they're documented in spec.md §3.
pub const CANONICAL_KEYS: [&str; 7] = [
  LABEL_NAME,
  LABEL_DOMAIN_ID,
  LABEL_PLUGIN_ID,
  LABEL_IMAGE,
  LABEL_VERSION,
  LABEL_RESOURCE_TYPE,
  LABEL_ENDPOINT,
];

const UNKNOWN: &str = "Unknown";

/// Reads a canonical label from a map, substituting `"Unknown"` when absent.
/// Never panics and never propagates an error — a missing label renders,
/// it does not crash the tick.
pub fn get_or_unknown(labels: &HashMap<String, String>, key: &str) -> String {
  labels.get(key).cloned().unwrap_or_else(|| UNKNOWN.to_string())
}

/// Builds the full canonical label map for an install. `resource_type` is
/// the plugin's service type (e.g. `inventory.collector`); `endpoint` must
/// already be synthesized before this is called, since it is written into
/// the label map before the container/service is created (spec.md §4.5).
pub struct CanonicalLabels {
  pub supervisor_name: String,
  pub domain_id: String,
  pub plugin_id: String,
  pub image: String,
  pub version: String,
  pub resource_type: String,
  pub endpoint: String,
}

impl CanonicalLabels {
  pub fn into_map(self) -> HashMap<String, String> {
    HashMap::from([
      (LABEL_NAME.to_string(), self.supervisor_name),
      (LABEL_DOMAIN_ID.to_string(), self.domain_id),
      (LABEL_PLUGIN_ID.to_string(), self.plugin_id),
      (LABEL_IMAGE.to_string(), self.image),
      (LABEL_VERSION.to_string(), self.version),
      (LABEL_RESOURCE_TYPE.to_string(), self.resource_type),
      (LABEL_ENDPOINT.to_string(), self.endpoint),
    ])
  }
}

/// The dot-free label subset usable in a Kubernetes label selector
/// (spec.md §4.7). The mapping is exact and one-directional: canonical keys
/// with no management counterpart (`plugin.image`, `plugin.endpoint`) are
/// dropped, not aliased.
pub fn to_management_labels(
  canonical: &HashMap<String, String>,
) -> HashMap<String, String> {
  let mut out = HashMap::new();
  if let Some(v) = canonical.get(LABEL_NAME) {
    out.insert("supervisor_name".to_string(), v.clone());
  }
  if let Some(v) = canonical.get(LABEL_DOMAIN_ID) {
    out.insert("domain_id".to_string(), v.clone());
  }
  if let Some(v) = canonical.get(LABEL_PLUGIN_ID) {
    out.insert("plugin_id".to_string(), v.clone());
  }
  if let Some(v) = canonical.get(LABEL_VERSION) {
    out.insert("version".to_string(), v.clone());
  }
  if let Some(v) = canonical.get(LABEL_RESOURCE_TYPE) {
    out.insert("resource_type".to_string(), v.clone());
  }
  out
}

/// Formats a `(key, value)` pair as the `k=v` filter string both backends
/// accept for label-AND search.
pub fn filter_eq(key: &str, value: &str) -> String {
  format!("{key}={value}")
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn missing_labels_render_unknown() {
    let labels = HashMap::new();
    assert_eq!(get_or_unknown(&labels, LABEL_PLUGIN_ID), "Unknown");
  }

  #[test]
  fn management_labels_are_injective_over_defined_keys() {
    let canonical = CanonicalLabels {
      supervisor_name: "root".into(),
      domain_id: "domain-1234".into(),
      plugin_id: "plugin-885ff2c52a6c".into(),
      image: "pyengine/aws-ec2".into(),
      version: "1.0".into(),
      resource_type: "inventory.collector".into(),
      endpoint: "grpc://root-abc.ns.svc.cluster.local:50051".into(),
    }
    .into_map();

    let mgmt = to_management_labels(&canonical);
    assert_eq!(mgmt.len(), 5);
    assert_eq!(mgmt["supervisor_name"], "root");
    assert_eq!(mgmt["domain_id"], "domain-1234");
    assert_eq!(mgmt["plugin_id"], "plugin-885ff2c52a6c");
    assert_eq!(mgmt["version"], "1.0");
    assert_eq!(mgmt["resource_type"], "inventory.collector");
    // image / endpoint have no management counterpart: dropped, not aliased.
    assert!(!mgmt.contains_key("image"));
    assert!(!mgmt.contains_key("endpoint"));
  }

  #[test]
  fn unknown_canonical_keys_are_dropped() {
    let mut canonical = HashMap::new();
    canonical.insert("some.other.key".to_string(), "value".to_string());
    let mgmt = to_management_labels(&canonical);
    assert!(mgmt.is_empty());
  }
}
