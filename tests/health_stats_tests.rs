//! Integration tests for health stats module.
//!
//! These tests verify that `AgentStats` correctly tracks activity recorded
//! from concurrent tasks and by the send queue.

use async_trait::async_trait;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use herakles_traffic_agent::health_stats::AgentStats;
use herakles_traffic_agent::mackerel::ClientError;
use herakles_traffic_agent::{Enqueuer, Metric, SendQueue, Sender, Service};

#[test]
fn test_agent_stats_initialize() {
    let stats = AgentStats::new();

    assert_eq!(stats.polls_succeeded.load(Ordering::Relaxed), 0);
    assert_eq!(stats.polls_failed.load(Ordering::Relaxed), 0);
    assert_eq!(stats.custom_polls_failed.load(Ordering::Relaxed), 0);
    assert_eq!(stats.metrics_enqueued.load(Ordering::Relaxed), 0);
    assert_eq!(stats.deliveries_succeeded.load(Ordering::Relaxed), 0);
    assert_eq!(stats.deliveries_failed.load(Ordering::Relaxed), 0);

    let poll = stats.poll_duration_ms.snapshot();
    assert_eq!(poll.count, 0);
    assert_eq!(poll.avg, 0.0);
}

#[test]
fn test_duration_snapshot() {
    let stats = AgentStats::new();
    stats.record_delivery(true, 40.0);
    stats.record_delivery(false, 10.0);
    stats.record_delivery(true, 25.0);

    let snapshot = stats.delivery_duration_ms.snapshot();
    assert_eq!(snapshot.count, 3);
    assert_eq!(snapshot.last, 25.0);
    assert_eq!(snapshot.min, 10.0);
    assert_eq!(snapshot.max, 40.0);
    assert!((snapshot.avg - 25.0).abs() < 1e-9);
    assert_eq!(stats.deliveries_failed.load(Ordering::Relaxed), 1);
}

#[test]
fn test_concurrent_recording() {
    let stats = Arc::new(AgentStats::new());

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let stats = Arc::clone(&stats);
            std::thread::spawn(move || {
                for _ in 0..100 {
                    stats.record_poll(i % 2 == 0, 1.0);
                    stats.record_enqueued(2);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(stats.polls_succeeded.load(Ordering::Relaxed), 400);
    assert_eq!(stats.polls_failed.load(Ordering::Relaxed), 400);
    assert_eq!(stats.metrics_enqueued.load(Ordering::Relaxed), 1600);
    assert_eq!(stats.get_poll_success_rate(), 50.0);
    assert_eq!(stats.poll_duration_ms.snapshot().count, 800);
}

struct NullSender;

#[async_trait]
impl Sender for NullSender {
    async fn send(&self, _host_id: &str, _metrics: &[Metric]) -> Result<(), ClientError> {
        Ok(())
    }
}

#[tokio::test]
async fn test_queue_records_enqueue_and_delivery() {
    let stats = Arc::new(AgentStats::new());
    let queue = Arc::new(SendQueue::new(Arc::new(NullSender)).with_stats(Arc::clone(&stats)));

    let metrics = (0..120)
        .map(|i| Metric::new(format!("m{}", i), 1_700_000_000, 0.0))
        .collect();
    queue.enqueue("host", metrics);

    let consumer = Arc::clone(&queue);
    let handle = tokio::spawn(async move { consumer.serve().await });
    queue
        .shutdown(Instant::now() + Duration::from_secs(5))
        .await
        .unwrap();
    handle.await.unwrap();

    assert_eq!(stats.metrics_enqueued.load(Ordering::Relaxed), 120);
    assert_eq!(stats.deliveries_succeeded.load(Ordering::Relaxed), 3);
    assert!(stats.summary().contains("deliveries_ok=3"));
}
