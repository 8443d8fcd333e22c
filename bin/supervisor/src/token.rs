//! Token bootstrap and `did` decoding (spec.md §3, §6, §9 REDESIGN FLAGS).
//!
//! Resolving the bearer token is modeled as an async, retry-until-success
//! source: either the token is already present in config, or it is polled
//! out of a Consul KV store every 10s until a value appears. Nothing else
//! in component construction blocks on this — only the schedulers, which
//! need the resolved `domain_id` to scope sync/publish calls, await it.

use std::time::Duration;

use anyhow::{Context, anyhow};
use serde::Deserialize;

use crate::config::{SupervisorConfig, TokenInfo};

const CONSUL_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Resolves the bearer token from config, blocking (async) until available.
/// Boot-fatal only in the sense that `main` awaits this before spawning
/// schedulers; a Consul outage delays startup rather than crashing it,
/// matching the teacher's "retry until success" idiom for bootstrap tasks.
pub async fn resolve_token(config: &SupervisorConfig) -> anyhow::Result<String> {
  if !config.token.is_empty() {
    return Ok(config.token.clone());
  }
  let Some(info) = &config.token_info else {
    return Err(anyhow!(
      "neither TOKEN nor TOKEN_INFO is configured; cannot authenticate"
    ));
  };
  if info.protocol != "consul" {
    return Err(anyhow!(
      "unsupported TOKEN_INFO.protocol '{}', only 'consul' is supported",
      info.protocol
    ));
  }
  poll_consul_kv(info).await
}

async fn poll_consul_kv(info: &TokenInfo) -> anyhow::Result<String> {
  #[derive(Deserialize)]
  struct ConsulKvEntry {
    #[serde(rename = "Value")]
    value: String,
  }

  let client = reqwest::Client::new();
  let url = format!(
    "http://{}:{}/v1/kv/{}",
    info.config.host,
    info.config.port,
    info.uri.trim_start_matches('/'),
  );

  loop {
    let mut request = client.get(&url);
    if let Some(token) = &info.config.token {
      request = request.header("X-Consul-Token", token);
    }
    match request.send().await {
      Ok(response) if response.status().is_success() => {
        match response.json::<Vec<ConsulKvEntry>>().await {
          Ok(entries) => {
            if let Some(entry) = entries.into_iter().next() {
              use base64::Engine;
              let decoded = base64::engine::general_purpose::STANDARD
                .decode(entry.value)
                .context("consul KV value was not valid base64")?;
              return String::from_utf8(decoded)
                .context("consul KV value was not valid utf8");
            }
          }
          Err(e) => {
            tracing::warn!("failed to parse Consul KV response | {e:#}");
          }
        }
      }
      Ok(response) => {
        tracing::debug!(
          "Consul KV lookup at {url} returned {} — waiting for token",
          response.status()
        );
      }
      Err(e) => {
        tracing::warn!("Consul KV lookup at {url} failed | {e:#}");
      }
    }
    tokio::time::sleep(CONSUL_POLL_INTERVAL).await;
  }
}

/// Decodes `domain_id` from the token's `did` claim without verifying the
/// signature — the token is re-verified server-side on every RPC
/// (spec.md §3). Boot-fatal if the token is not a well-formed JWT or lacks
/// a `did` claim.
pub fn decode_domain_id(token: &str) -> anyhow::Result<String> {
  #[derive(Deserialize)]
  struct Claims {
    did: String,
  }

  let header = jsonwebtoken::decode_header(token)
    .context("TOKEN is not a well-formed JWT")?;
  let mut validation = jsonwebtoken::Validation::new(header.alg);
  validation.insecure_disable_signature_validation();
  validation.validate_exp = false;
  validation.validate_aud = false;
  validation.required_spec_claims.clear();

  let data = jsonwebtoken::decode::<Claims>(
    token,
    &jsonwebtoken::DecodingKey::from_secret(&[]),
    &validation,
  )
  .context("failed to decode JWT claims")?;
  Ok(data.claims.did)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn unsigned_jwt_with_did(did: &str) -> String {
    use jsonwebtoken::{Header, encode};
    #[derive(serde::Serialize)]
    struct Claims<'a> {
      did: &'a str,
    }
    let header = Header::new(jsonwebtoken::Algorithm::HS256);
    encode(
      &header,
      &Claims { did },
      &jsonwebtoken::EncodingKey::from_secret(b"irrelevant-for-decode"),
    )
    .unwrap()
  }

  #[test]
  fn decodes_domain_id_without_verifying_signature() {
    let jwt = unsigned_jwt_with_did("domain-1234");
    assert_eq!(decode_domain_id(&jwt).unwrap(), "domain-1234");
  }

  #[test]
  fn rejects_malformed_token() {
    assert!(decode_domain_id("not-a-jwt").is_err());
  }
}
