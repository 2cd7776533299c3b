//! Runtime statistics for the agent.
//!
//! This module tracks poll, delivery and metadata activity across all targets
//! with lock-free counters and running statistics of durations. A summary is
//! logged when the supervisor finishes shutting down.

use std::fmt::Write as FmtWrite;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Instant;

/// Running statistics for a single metric.
#[derive(Clone, Copy, Default)]
pub struct RunningStat {
    count: u64,
    sum: f64,
    min: f64,
    max: f64,
    last: f64,
}

impl RunningStat {
    pub fn add(&mut self, value: f64) {
        if self.count == 0 {
            self.min = value;
            self.max = value;
            self.last = value;
            self.sum = value;
            self.count = 1;
            return;
        }
        self.count += 1;
        self.sum += value;
        self.last = value;
        if value < self.min {
            self.min = value;
        }
        if value > self.max {
            self.max = value;
        }
    }

    pub fn avg(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / (self.count as f64)
        }
    }
}

/// Thread-safe wrapper for running statistics.
#[derive(Default)]
pub struct Stat {
    inner: Mutex<RunningStat>,
}

/// Point-in-time copy of a [`Stat`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StatSnapshot {
    pub last: f64,
    pub avg: f64,
    pub max: f64,
    pub min: f64,
    pub count: u64,
}

impl Stat {
    pub fn add_sample(&self, value: f64) {
        if let Ok(mut s) = self.inner.lock() {
            s.add(value);
        }
    }

    pub fn snapshot(&self) -> StatSnapshot {
        if let Ok(s) = self.inner.lock() {
            StatSnapshot {
                last: s.last,
                avg: s.avg(),
                max: s.max,
                min: s.min,
                count: s.count,
            }
        } else {
            StatSnapshot::default()
        }
    }
}

/// Process-wide activity counters shared by tickers and the send queue.
pub struct AgentStats {
    // Polling
    pub polls_succeeded: AtomicU64,
    pub polls_failed: AtomicU64,
    pub custom_polls_failed: AtomicU64,
    pub poll_duration_ms: Stat,

    // Delivery
    pub metrics_enqueued: AtomicU64,
    pub deliveries_succeeded: AtomicU64,
    pub deliveries_failed: AtomicU64,
    pub delivery_duration_ms: Stat,

    // Metadata
    pub metadata_updates_sent: AtomicU64,
    pub metadata_updates_skipped: AtomicU64,

    pub start_time: Instant,
}

impl Default for AgentStats {
    fn default() -> Self {
        Self {
            polls_succeeded: AtomicU64::new(0),
            polls_failed: AtomicU64::new(0),
            custom_polls_failed: AtomicU64::new(0),
            poll_duration_ms: Stat::default(),
            metrics_enqueued: AtomicU64::new(0),
            deliveries_succeeded: AtomicU64::new(0),
            deliveries_failed: AtomicU64::new(0),
            delivery_duration_ms: Stat::default(),
            metadata_updates_sent: AtomicU64::new(0),
            metadata_updates_skipped: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }
}

impl AgentStats {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn record_poll(&self, success: bool, duration_ms: f64) {
        if success {
            self.polls_succeeded.fetch_add(1, Ordering::Relaxed);
        } else {
            self.polls_failed.fetch_add(1, Ordering::Relaxed);
        }
        self.poll_duration_ms.add_sample(duration_ms);
    }

    pub fn record_custom_poll_failure(&self) {
        self.custom_polls_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_enqueued(&self, count: usize) {
        self.metrics_enqueued
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_delivery(&self, success: bool, duration_ms: f64) {
        if success {
            self.deliveries_succeeded.fetch_add(1, Ordering::Relaxed);
        } else {
            self.deliveries_failed.fetch_add(1, Ordering::Relaxed);
        }
        self.delivery_duration_ms.add_sample(duration_ms);
    }

    pub fn record_metadata_update(&self, sent: bool) {
        if sent {
            self.metadata_updates_sent.fetch_add(1, Ordering::Relaxed);
        } else {
            self.metadata_updates_skipped
                .fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn get_poll_success_rate(&self) -> f64 {
        let success = self.polls_succeeded.load(Ordering::Relaxed);
        let failure = self.polls_failed.load(Ordering::Relaxed);
        let total = success + failure;
        if total == 0 {
            100.0
        } else {
            (success as f64 / total as f64) * 100.0
        }
    }

    /// One-line summary for the shutdown log.
    pub fn summary(&self) -> String {
        let poll = self.poll_duration_ms.snapshot();
        let delivery = self.delivery_duration_ms.snapshot();
        let mut out = String::new();

        let _ = write!(
            out,
            "uptime={}s polls={}/{} ({:.1}% ok) custom_failures={} ",
            self.start_time.elapsed().as_secs(),
            self.polls_succeeded.load(Ordering::Relaxed),
            self.polls_succeeded.load(Ordering::Relaxed) + self.polls_failed.load(Ordering::Relaxed),
            self.get_poll_success_rate(),
            self.custom_polls_failed.load(Ordering::Relaxed),
        );
        let _ = write!(
            out,
            "metrics_enqueued={} deliveries_ok={} deliveries_failed={} ",
            self.metrics_enqueued.load(Ordering::Relaxed),
            self.deliveries_succeeded.load(Ordering::Relaxed),
            self.deliveries_failed.load(Ordering::Relaxed),
        );
        let _ = write!(
            out,
            "metadata_sent={} metadata_skipped={} poll_avg_ms={:.1} delivery_avg_ms={:.1}",
            self.metadata_updates_sent.load(Ordering::Relaxed),
            self.metadata_updates_skipped.load(Ordering::Relaxed),
            poll.avg,
            delivery.avg,
        );
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_stat() {
        let mut stat = RunningStat::default();
        stat.add(10.0);
        stat.add(20.0);
        stat.add(5.0);
        assert_eq!(stat.count, 3);
        assert_eq!(stat.min, 5.0);
        assert_eq!(stat.max, 20.0);
        assert_eq!(stat.last, 5.0);
        assert!((stat.avg() - 35.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_poll_success_rate() {
        let stats = AgentStats::new();
        assert_eq!(stats.get_poll_success_rate(), 100.0);
        stats.record_poll(true, 12.0);
        stats.record_poll(true, 8.0);
        stats.record_poll(true, 10.0);
        stats.record_poll(false, 10_000.0);
        assert_eq!(stats.get_poll_success_rate(), 75.0);
        assert_eq!(stats.poll_duration_ms.snapshot().count, 4);
    }

    #[test]
    fn test_summary_mentions_counters() {
        let stats = AgentStats::new();
        stats.record_enqueued(101);
        stats.record_delivery(true, 3.0);
        stats.record_metadata_update(false);
        let summary = stats.summary();
        assert!(summary.contains("metrics_enqueued=101"));
        assert!(summary.contains("deliveries_ok=1"));
        assert!(summary.contains("metadata_skipped=1"));
    }
}
