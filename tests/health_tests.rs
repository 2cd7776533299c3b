//! Integration tests for the send queue backlog health.
//!
//! These tests verify the backlog status reported by `SendQueue` as messages
//! are enqueued and delivered with various thresholds.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use herakles_traffic_agent::health::BacklogStatus;
use herakles_traffic_agent::mackerel::ClientError;
use herakles_traffic_agent::{Enqueuer, Metric, SendQueue, Sender, Service};

struct NullSender;

#[async_trait]
impl Sender for NullSender {
    async fn send(&self, _host_id: &str, _metrics: &[Metric]) -> Result<(), ClientError> {
        Ok(())
    }
}

/// Helper function to create a queue with custom thresholds.
fn queue(warn: usize, critical: usize) -> Arc<SendQueue> {
    Arc::new(SendQueue::new(Arc::new(NullSender)).with_backlog_thresholds(warn, critical))
}

fn one_metric() -> Vec<Metric> {
    vec![Metric::new("interface.eth0.rxBytes.delta", 1_700_000_000, 1.0)]
}

#[test]
fn test_empty_queue_is_ok() {
    let queue = queue(2, 4);
    assert_eq!(queue.backlog_status(), BacklogStatus::Ok);
}

#[test]
fn test_backlog_warn() {
    let queue = queue(2, 4);

    queue.enqueue("host", one_metric());
    assert_eq!(queue.backlog_status(), BacklogStatus::Ok);

    queue.enqueue("host", one_metric());
    assert_eq!(queue.backlog_status(), BacklogStatus::Warn);
}

#[test]
fn test_backlog_critical() {
    let queue = queue(2, 4);

    // 200 metrics = 4 messages of 50
    let metrics = (0..200)
        .map(|i| Metric::new(format!("m{}", i), 1_700_000_000, 0.0))
        .collect();
    queue.enqueue("host", metrics);

    assert_eq!(queue.len(), 4);
    assert_eq!(queue.backlog_status(), BacklogStatus::Critical);
}

#[test]
fn test_zero_thresholds_never_alarm() {
    let queue = queue(0, 0);
    for _ in 0..100 {
        queue.enqueue("host", one_metric());
    }
    assert_eq!(queue.len(), 100);
    assert_eq!(queue.backlog_status(), BacklogStatus::Ok);
}

#[tokio::test]
async fn test_backlog_recovers_after_delivery() {
    let queue = queue(2, 4);
    for _ in 0..5 {
        queue.enqueue("host", one_metric());
    }
    assert_eq!(queue.backlog_status(), BacklogStatus::Critical);

    let consumer = Arc::clone(&queue);
    let handle = tokio::spawn(async move { consumer.serve().await });
    queue
        .shutdown(Instant::now() + Duration::from_secs(5))
        .await
        .unwrap();
    handle.await.unwrap();

    assert!(queue.is_empty());
    assert_eq!(queue.backlog_status(), BacklogStatus::Ok);
}
