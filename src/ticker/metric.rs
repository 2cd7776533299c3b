//! Metric ticker: standard and custom counters to the send queue.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, instrument, warn};

use super::Ticker;
use crate::collectors::{Collector, CollectorFactory};
use crate::config::TargetConfig;
use crate::converter::{CustomConverter, MetricDeltaConverter};
use crate::health_stats::AgentStats;
use crate::sendqueue::Enqueuer;

/// Configuration dependent state, replaced wholesale on reload.
struct Bound {
    host_id: String,
    collector: Arc<dyn Collector>,
}

pub struct MetricTicker {
    identity: String,
    bound: RwLock<Bound>,
    /// Survives reloads so rate baselines carry over.
    converter: Mutex<MetricDeltaConverter>,
    custom: CustomConverter,
    queue: Arc<dyn Enqueuer>,
    factory: Arc<dyn CollectorFactory>,
    stats: Arc<AgentStats>,
}

impl MetricTicker {
    pub fn new(
        target: &Arc<TargetConfig>,
        queue: Arc<dyn Enqueuer>,
        factory: Arc<dyn CollectorFactory>,
        stats: Arc<AgentStats>,
    ) -> Self {
        Self {
            identity: target.id(),
            bound: RwLock::new(Bound {
                host_id: target.host_id.clone(),
                collector: factory.build(target),
            }),
            converter: Mutex::new(MetricDeltaConverter::new()),
            custom: CustomConverter,
            queue,
            factory,
            stats,
        }
    }

    async fn poll_counters(&self) {
        let bound = self.bound.read().await;
        let started = Instant::now();
        let result = bound.collector.collect().await;
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

        match result {
            Ok(samples) => {
                self.stats.record_poll(true, elapsed_ms);
                let metrics = self.converter.lock().await.convert(&samples, Utc::now());
                debug!("{} samples converted to {} metrics", samples.len(), metrics.len());
                if !metrics.is_empty() {
                    self.queue.enqueue(&bound.host_id, metrics);
                }
            }
            Err(e) => {
                self.stats.record_poll(false, elapsed_ms);
                warn!("Failed to collect counters: {}", e);
            }
        }
    }

    async fn poll_custom_counters(&self) {
        let bound = self.bound.read().await;
        match bound.collector.collect_custom().await {
            Ok(values) => {
                let metrics = self.custom.convert(&values, Utc::now());
                if !metrics.is_empty() {
                    self.queue.enqueue(&bound.host_id, metrics);
                }
            }
            Err(e) => {
                self.stats.record_custom_poll_failure();
                warn!("Failed to collect custom counters: {}", e);
            }
        }
    }
}

#[async_trait]
impl Ticker for MetricTicker {
    #[instrument(skip(self), fields(target = %self.identity))]
    async fn tick(&self) {
        self.poll_counters().await;
        self.poll_custom_counters().await;
    }

    async fn reload(&self, target: Arc<TargetConfig>) {
        let collector = self.factory.build(&target);
        let mut bound = self.bound.write().await;
        bound.host_id = target.host_id.clone();
        bound.collector = collector;
    }

    fn identity(&self) -> String {
        self.identity.clone()
    }
}
