//! Port Allocator (spec.md §4.4). Picks an unused host port from a
//! configured `[start_port, end_port)` range by subtracting the backend's
//! currently-bound ports. Carries an in-process reservation set so two
//! concurrent installs within the same tick never race onto the same port
//! before the backend itself has claimed it (spec.md §9 REDESIGN FLAGS).
//! The reservation is released as soon as the caller's `run` call returns,
//! win or lose — the backend's own `list_used_ports` is ground truth again
//! from that point on, so holding the reservation any longer would only
//! leak it for the process lifetime.

use std::{
  collections::HashSet,
  sync::Mutex,
};

use supervisor_client::SupervisorError;

use crate::backend::ContainerBackend;

pub struct PortAllocator {
  start_port: u16,
  end_port: u16,
  reserved: Mutex<HashSet<u16>>,
}

impl PortAllocator {
  pub fn new(start_port: u16, end_port: u16) -> Self {
    PortAllocator { start_port, end_port, reserved: Mutex::new(HashSet::new()) }
  }

  /// Releases a port this process reserved, making it eligible again on
  /// the next allocation. Called once the allocating `run` call has
  /// returned, regardless of outcome — a successful install is covered by
  /// the backend's own `list_used_ports` from then on, so the in-process
  /// reservation must not outlive the call it guarded.
  pub fn release(&self, port: u16) {
    self.reserved.lock().expect("port allocator mutex poisoned").remove(&port);
  }

  /// Allocates the lowest free port in range. Fails with
  /// `SupervisorError::ResourceExhausted` when the backend's used ports and
  /// this process's in-flight reservations cover the whole range
  /// (spec.md §4.4, §7).
  pub async fn allocate(&self, backend: &dyn ContainerBackend) -> Result<u16, SupervisorError> {
    let used = backend.list_used_ports().await?;
    let mut reserved = self.reserved.lock().expect("port allocator mutex poisoned");
    for port in self.start_port..self.end_port {
      if used.contains(&port) || reserved.contains(&port) {
        continue;
      }
      reserved.insert(port);
      return Ok(port);
    }
    Err(SupervisorError::ResourceExhausted)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn reservation_prevents_double_allocation_within_a_tick() {
    let allocator = PortAllocator::new(50000, 50002);
    {
      let mut reserved = allocator.reserved.lock().unwrap();
      reserved.insert(50000);
    }
    assert!(allocator.reserved.lock().unwrap().contains(&50000));
    allocator.release(50000);
    assert!(!allocator.reserved.lock().unwrap().contains(&50000));
  }

  #[test]
  fn empty_range_is_immediately_exhausted() {
    let allocator = PortAllocator::new(50000, 50000);
    assert_eq!(allocator.start_port, allocator.end_port);
  }

  // Regression: a long-lived supervisor that installs (and releases, per
  // `install_plugin`'s win-or-lose release) one plugin after another must
  // not exhaust a single-port range, since a prior leak only ever cleared
  // the reservation on `run` failure.
  #[tokio::test]
  async fn successful_installs_do_not_leak_reservations_across_many_ticks() {
    struct EmptyBackend;
    #[async_trait::async_trait]
    impl ContainerBackend for EmptyBackend {
      async fn search(&self, _filters: &[(String, String)]) -> crate::backend::Result<crate::backend::SearchResult> {
        Ok(crate::backend::SearchResult::default())
      }
      async fn run(&self, spec: crate::backend::RunSpec) -> crate::backend::Result<supervisor_client::PluginInstance> {
        unreachable!("not exercised by this test: {}", spec.name)
      }
      async fn stop(&self, _instance: &supervisor_client::PluginInstance) -> crate::backend::Result<bool> {
        Ok(true)
      }
      async fn list_used_ports(&self) -> crate::backend::Result<HashSet<u16>> {
        Ok(HashSet::new())
      }
      fn synthesize_endpoint(&self, _hostname: &str, _name: &str, _host_port: u16) -> String {
        String::new()
      }
    }

    let allocator = PortAllocator::new(50000, 50001);
    let backend = EmptyBackend;
    for _ in 0..10 {
      let port = allocator.allocate(&backend).await.expect("range must not exhaust");
      assert_eq!(port, 50000);
      // `install_plugin` releases unconditionally once `run` returns, not
      // only on failure.
      allocator.release(port);
    }
  }
}
