//! Headless-service readiness, factored behind a strategy trait so a
//! future gRPC health-check probe can replace the Endpoints-non-empty
//! heuristic without touching the Kubernetes backend's install protocol
//! (spec.md §9 REDESIGN FLAGS).

use async_trait::async_trait;

/// One poll attempt: `Ok(Some(endpoints))` once ready, `Ok(None)` while
/// still pending, `Err` on a hard failure.
#[async_trait]
pub trait Readiness: Send + Sync {
  async fn poll(&self) -> anyhow::Result<Option<Vec<String>>>;
}

/// Polls a closure-like probe at a fixed interval up to a deadline,
/// matching the install protocol's 10s/300s cadence (spec.md §4.3).
pub async fn poll_until_ready<R: Readiness + ?Sized>(
  readiness: &R,
  interval: std::time::Duration,
  deadline: std::time::Duration,
) -> Vec<String> {
  let start = tokio::time::Instant::now();
  loop {
    match readiness.poll().await {
      Ok(Some(endpoints)) if !endpoints.is_empty() => return endpoints,
      Ok(_) => {}
      Err(e) => {
        tracing::warn!("readiness probe failed | {e:#}");
      }
    }
    if start.elapsed() >= deadline {
      tracing::warn!(
        "readiness deadline of {:?} exceeded; a later sync tick will confirm or recover",
        deadline
      );
      return Vec::new();
    }
    tokio::time::sleep(interval).await;
  }
}
