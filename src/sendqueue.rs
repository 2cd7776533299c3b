//! Outbound metric delivery queue.
//!
//! Many tickers enqueue metrics; one consumer task delivers them in FIFO order
//! through a [`Sender`]. A message leaves the queue only after it was delivered
//! successfully, so a failing backend stalls the queue instead of losing data.
//! Payloads are split into chunks of [`CHUNK_SIZE`] metrics so that a single
//! oversized request cannot fail forever.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{AgentSettings, TargetConfig};
use crate::health::{BacklogHealth, BacklogStatus};
use crate::health_stats::AgentStats;
use crate::mackerel::ClientError;
use crate::metric::Metric;
use crate::service::{Service, ServiceError};

/// Maximum number of metrics per delivery.
pub const CHUNK_SIZE: usize = 50;

const IDLE_WAIT: Duration = Duration::from_millis(100);
const RETRY_BACKOFF: Duration = Duration::from_millis(100);
const DRAIN_POLL: Duration = Duration::from_millis(250);

/// Delivers one chunk of metrics for a host.
#[async_trait]
pub trait Sender: Send + Sync {
    async fn send(&self, host_id: &str, metrics: &[Metric]) -> Result<(), ClientError>;
}

/// Producer side of the queue, as seen by the tickers.
pub trait Enqueuer: Send + Sync {
    fn enqueue(&self, host_id: &str, metrics: Vec<Metric>);
}

/// One pending delivery.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueMessage {
    pub host_id: String,
    pub metrics: Vec<Metric>,
}

pub struct SendQueue {
    buffers: Mutex<VecDeque<Arc<QueueMessage>>>,
    sender: Arc<dyn Sender>,
    token: CancellationToken,
    is_shutdown: AtomicBool,
    /// Held by the consumer loop while it runs.
    running: tokio::sync::Mutex<()>,
    health: BacklogHealth,
    stats: Arc<AgentStats>,
}

impl SendQueue {
    pub fn new(sender: Arc<dyn Sender>) -> Self {
        let defaults = AgentSettings::default();
        Self {
            buffers: Mutex::new(VecDeque::new()),
            sender,
            token: CancellationToken::new(),
            is_shutdown: AtomicBool::new(false),
            running: tokio::sync::Mutex::new(()),
            health: BacklogHealth::new(defaults.queue_warn_backlog, defaults.queue_critical_backlog),
            stats: Arc::new(AgentStats::new()),
        }
    }

    pub fn with_backlog_thresholds(mut self, warn: usize, critical: usize) -> Self {
        self.health = BacklogHealth::new(warn, critical);
        self
    }

    pub fn with_stats(mut self, stats: Arc<AgentStats>) -> Self {
        self.stats = stats;
        self
    }

    /// Locks the buffer, recovering it from a poisoned lock.
    fn buffers(&self) -> MutexGuard<'_, VecDeque<Arc<QueueMessage>>> {
        self.buffers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of pending messages.
    pub fn len(&self) -> usize {
        self.buffers().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Backlog status as of the last enqueue or delivery.
    pub fn backlog_status(&self) -> BacklogStatus {
        self.health.status()
    }

    fn front(&self) -> Option<Arc<QueueMessage>> {
        self.buffers().front().cloned()
    }

    fn remove_delivered(&self, message: &Arc<QueueMessage>) {
        let mut buffers = self.buffers();
        if buffers.front().is_some_and(|m| Arc::ptr_eq(m, message)) {
            buffers.pop_front();
        }
    }
}

impl Enqueuer for SendQueue {
    fn enqueue(&self, host_id: &str, metrics: Vec<Metric>) {
        if metrics.is_empty() {
            return;
        }
        let count = metrics.len();
        let backlog = {
            let mut buffers = self.buffers();
            for chunk in metrics.chunks(CHUNK_SIZE) {
                buffers.push_back(Arc::new(QueueMessage {
                    host_id: host_id.to_string(),
                    metrics: chunk.to_vec(),
                }));
            }
            buffers.len()
        };
        self.stats.record_enqueued(count);
        self.health.observe(backlog);
    }
}

#[async_trait]
impl Service for SendQueue {
    async fn serve(&self) {
        let _running = self.running.lock().await;

        while !self.token.is_cancelled() {
            let message = match self.front() {
                Some(message) => message,
                None => {
                    tokio::select! {
                        _ = self.token.cancelled() => break,
                        _ = tokio::time::sleep(IDLE_WAIT) => {}
                    }
                    continue;
                }
            };

            let started = Instant::now();
            let result = self.sender.send(&message.host_id, &message.metrics).await;
            let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

            match result {
                Ok(()) => {
                    self.stats.record_delivery(true, elapsed_ms);
                    self.remove_delivered(&message);
                    self.health.observe(self.len());
                }
                Err(e) => {
                    self.stats.record_delivery(false, elapsed_ms);
                    warn!("Failed to post metrics for {}: {}", message.host_id, e);
                    tokio::select! {
                        _ = self.token.cancelled() => break,
                        _ = tokio::time::sleep(RETRY_BACKOFF) => {}
                    }
                }
            }
        }

        debug!("Send queue stopped");
    }

    async fn shutdown(&self, deadline: Instant) -> Result<(), ServiceError> {
        if self
            .is_shutdown
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Ok(());
        }

        loop {
            let remaining = self.len();
            if remaining == 0 {
                break;
            }
            let now = Instant::now();
            if now >= deadline {
                warn!(
                    "Shutdown deadline reached with {} undelivered messages",
                    remaining
                );
                break;
            }
            info!("Draining send queue: {} messages remain", remaining);
            tokio::time::sleep_until(deadline.min(now + DRAIN_POLL)).await;
        }

        self.token.cancel();
        let _stopped = self.running.lock().await;
        Ok(())
    }

    fn identity(&self) -> String {
        String::new()
    }

    async fn reload(&self, _target: Arc<TargetConfig>) {}

    fn alive(&self) -> bool {
        !self.is_shutdown.load(Ordering::SeqCst)
    }
}
