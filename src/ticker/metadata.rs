//! Metadata ticker: keeps the upstream interface inventory of a host current.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, instrument, warn};

use super::{MetadataUpdater, Ticker};
use crate::collectors::{Collector, CollectorFactory, InterfaceInfo};
use crate::config::TargetConfig;
use crate::health_stats::AgentStats;

struct Bound {
    target: Arc<TargetConfig>,
    collector: Arc<dyn Collector>,
}

pub struct MetadataTicker {
    identity: String,
    bound: RwLock<Bound>,
    /// Last inventory sent upstream. `None` until the first successful update.
    last_seen: Mutex<Option<Vec<InterfaceInfo>>>,
    updater: Arc<dyn MetadataUpdater>,
    factory: Arc<dyn CollectorFactory>,
    stats: Arc<AgentStats>,
}

impl MetadataTicker {
    pub fn new(
        target: &Arc<TargetConfig>,
        updater: Arc<dyn MetadataUpdater>,
        factory: Arc<dyn CollectorFactory>,
        stats: Arc<AgentStats>,
    ) -> Self {
        Self {
            identity: target.id(),
            bound: RwLock::new(Bound {
                target: Arc::clone(target),
                collector: factory.build(target),
            }),
            last_seen: Mutex::new(None),
            updater,
            factory,
            stats,
        }
    }
}

#[async_trait]
impl Ticker for MetadataTicker {
    #[instrument(skip(self), fields(target = %self.identity))]
    async fn tick(&self) {
        let bound = self.bound.read().await;
        let mut inventory = match bound.collector.collect_interfaces().await {
            Ok(inventory) => inventory,
            Err(e) => {
                warn!("Failed to collect interfaces: {}", e);
                return;
            }
        };
        inventory.sort_by(|a, b| a.name.cmp(&b.name));

        let mut last_seen = self.last_seen.lock().await;
        if last_seen.as_ref() == Some(&inventory) {
            debug!("Interface inventory unchanged, skipping metadata update");
            self.stats.record_metadata_update(false);
            return;
        }

        let target = &bound.target;
        match self
            .updater
            .update_host(
                &target.host_id,
                &target.connection.host,
                target.display_hostname(),
                &inventory,
            )
            .await
        {
            Ok(()) => {
                info!("Updated host metadata ({} interfaces)", inventory.len());
                self.stats.record_metadata_update(true);
                *last_seen = Some(inventory);
            }
            Err(e) => warn!("Failed to update host metadata: {}", e),
        }
    }

    async fn reload(&self, target: Arc<TargetConfig>) {
        let collector = self.factory.build(&target);
        let mut bound = self.bound.write().await;
        let renamed = bound.target.host_id != target.host_id
            || bound.target.display_hostname() != target.display_hostname();
        bound.target = target;
        bound.collector = collector;
        if renamed {
            *self.last_seen.lock().await = None;
        }
    }

    fn identity(&self) -> String {
        self.identity.clone()
    }
}
