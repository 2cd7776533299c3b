//! Poll cycle implementations driven by workers.
//!
//! A [`Ticker`] executes exactly one poll cycle per call to [`Ticker::tick`].
//! The metric variant polls counters and feeds the send queue; the metadata
//! variant keeps the upstream host inventory current.

mod metadata;
mod metric;

use async_trait::async_trait;
use std::sync::Arc;

use crate::collectors::InterfaceInfo;
use crate::config::{GraphDef, TargetConfig};
use crate::mackerel::ClientError;

pub use metadata::MetadataTicker;
pub use metric::MetricTicker;

/// One target's poll cycle.
#[async_trait]
pub trait Ticker: Send + Sync {
    /// Runs one complete poll cycle.
    async fn tick(&self);

    /// Swaps in a new configuration for the same target.
    async fn reload(&self, target: Arc<TargetConfig>);

    /// Stable identity used for reload reconciliation.
    fn identity(&self) -> String;
}

/// Upstream host metadata operations.
#[async_trait]
pub trait MetadataUpdater: Send + Sync {
    async fn update_host(
        &self,
        host_id: &str,
        host_addr: &str,
        hostname: &str,
        inventory: &[InterfaceInfo],
    ) -> Result<(), ClientError>;

    async fn create_graph_defs(&self, defs: &[GraphDef]) -> Result<(), ClientError>;
}
