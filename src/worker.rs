//! Repeating task driver.
//!
//! A [`Worker`] owns one [`Ticker`] and calls it immediately on start and then
//! once per period until shut down. Ticks never overlap: a slow tick delays the
//! next one and missed periods are not caught up.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::TargetConfig;
use crate::service::{Service, ServiceError};
use crate::ticker::Ticker;

pub struct Worker {
    ticker: Arc<dyn Ticker>,
    period: Duration,
    token: CancellationToken,
    is_shutdown: AtomicBool,
    /// Held by the serve loop while it runs.
    running: tokio::sync::Mutex<()>,
}

impl Worker {
    pub fn new(ticker: Arc<dyn Ticker>, period: Duration) -> Self {
        Self {
            ticker,
            period,
            token: CancellationToken::new(),
            is_shutdown: AtomicBool::new(false),
            running: tokio::sync::Mutex::new(()),
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }
}

#[async_trait]
impl Service for Worker {
    async fn serve(&self) {
        let _running = self.running.lock().await;
        if self.token.is_cancelled() {
            return;
        }

        let mut interval = tokio::time::interval(self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = self.token.cancelled() => break,
                _ = interval.tick() => self.ticker.tick().await,
            }
        }

        debug!("Worker {} stopped", self.ticker.identity());
    }

    async fn shutdown(&self, _deadline: Instant) -> Result<(), ServiceError> {
        if self
            .is_shutdown
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Ok(());
        }

        self.token.cancel();
        // the in-flight tick finishes before the serve loop releases this
        let _stopped = self.running.lock().await;
        Ok(())
    }

    fn identity(&self) -> String {
        self.ticker.identity()
    }

    async fn reload(&self, target: Arc<TargetConfig>) {
        self.ticker.reload(target).await;
    }

    fn alive(&self) -> bool {
        !self.is_shutdown.load(Ordering::SeqCst)
    }
}
