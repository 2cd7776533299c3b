//! Per-connection exclusive lock registry.
//!
//! Devices are polled by a metric worker and a metadata worker concurrently;
//! requests to the same `host:port` are serialized through one lock per key.
//! Locks are created on first use and never removed.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Default, Clone)]
pub struct ConnectionLocks {
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl ConnectionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to the connection identified by `key`.
    pub async fn acquire(&self, key: &str) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock.lock_owned().await
    }

    /// Number of distinct connection keys seen so far.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
