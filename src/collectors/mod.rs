//! Collectors module for remote device counters.
//!
//! This module defines the capability the tickers poll through: one
//! [`Collector`] per target fetches the raw interface counter snapshot, the
//! operator defined custom counters and the interface inventory. The SNMP
//! implementation lives in [`snmp`], the per-connection lock registry in
//! [`locks`].

pub mod locks;
pub mod snmp;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::TargetConfig;

pub use locks::ConnectionLocks;
pub use snmp::{SnmpCollector, SnmpCollectorFactory};

/// One instantaneous counter reading for one interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSample {
    pub if_index: u64,
    pub counter: String,
    pub if_name: String,
    pub value: u64,
}

impl RawSample {
    pub fn new(if_index: u64, counter: impl Into<String>, if_name: impl Into<String>, value: u64) -> Self {
        Self {
            if_index,
            counter: counter.into(),
            if_name: if_name.into(),
            value,
        }
    }
}

/// Interface inventory entry reported upstream as host metadata.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InterfaceInfo {
    pub name: String,
    pub ip_addresses: Vec<String>,
    pub mac_address: Option<String>,
}

/// Errors returned by a collector fetch.
#[derive(Debug, thiserror::Error)]
pub enum CollectorError {
    #[error("snmp request to {target} failed: {message}")]
    Request { target: String, message: String },

    #[error("unexpected response from {target}: {message}")]
    Response { target: String, message: String },

    #[error("invalid OID: {0}")]
    InvalidOid(String),

    #[error("snmp version is not supported by the collector: {0}")]
    UnsupportedVersion(String),

    #[error("collector task failed: {0}")]
    Task(String),
}

/// Fetches raw counters and inventory for one target.
#[async_trait]
pub trait Collector: Send + Sync {
    /// Standard counter snapshot across all admitted interfaces.
    async fn collect(&self) -> Result<Vec<RawSample>, CollectorError>;

    /// Current values of the custom counters keyed by metric name.
    async fn collect_custom(&self) -> Result<HashMap<String, f64>, CollectorError>;

    /// Interface inventory sorted by interface name.
    async fn collect_interfaces(&self) -> Result<Vec<InterfaceInfo>, CollectorError>;
}

/// Builds collectors bound to a target configuration.
pub trait CollectorFactory: Send + Sync {
    fn build(&self, target: &Arc<TargetConfig>) -> Arc<dyn Collector>;
}
