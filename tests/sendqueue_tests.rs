//! Integration tests for the send queue.
//!
//! These tests run the consumer loop against recording and failing senders
//! and verify ordering, chunking, retry and drain-on-shutdown behavior.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

use herakles_traffic_agent::mackerel::ClientError;
use herakles_traffic_agent::{Enqueuer, Metric, SendQueue, Sender, Service};

/// Records every successful delivery. The first `failures` calls fail.
#[derive(Default)]
struct RecordingSender {
    failures: AtomicUsize,
    attempts: AtomicUsize,
    delivered: Mutex<Vec<(String, Vec<Metric>)>>,
}

impl RecordingSender {
    fn failing(failures: usize) -> Self {
        Self {
            failures: AtomicUsize::new(failures),
            ..Default::default()
        }
    }

    fn delivered(&self) -> Vec<(String, Vec<Metric>)> {
        self.delivered.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sender for RecordingSender {
    async fn send(&self, host_id: &str, metrics: &[Metric]) -> Result<(), ClientError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(ClientError::Status {
                status: 503,
                body: "unavailable".into(),
            });
        }
        self.delivered
            .lock()
            .unwrap()
            .push((host_id.to_string(), metrics.to_vec()));
        Ok(())
    }
}

fn metrics(prefix: &str, n: usize) -> Vec<Metric> {
    (0..n)
        .map(|i| Metric::new(format!("{}.{}", prefix, i), 1_700_000_000, i as f64))
        .collect()
}

fn spawn_serve(queue: &Arc<SendQueue>) -> tokio::task::JoinHandle<()> {
    let queue = Arc::clone(queue);
    tokio::spawn(async move { queue.serve().await })
}

#[tokio::test]
async fn test_large_batch_is_delivered_in_ordered_chunks() {
    let sender = Arc::new(RecordingSender::default());
    let queue = Arc::new(SendQueue::new(sender.clone()));

    queue.enqueue("host-a", metrics("m", 101));
    let handle = spawn_serve(&queue);

    queue
        .shutdown(Instant::now() + Duration::from_secs(5))
        .await
        .unwrap();
    handle.await.unwrap();

    let delivered = sender.delivered();
    let sizes: Vec<usize> = delivered.iter().map(|(_, m)| m.len()).collect();
    assert_eq!(sizes, vec![50, 50, 1]);
    assert!(delivered.iter().all(|(host, _)| host == "host-a"));

    let names: Vec<String> = delivered
        .iter()
        .flat_map(|(_, m)| m.iter().map(|metric| metric.name.clone()))
        .collect();
    let expected: Vec<String> = (0..101).map(|i| format!("m.{}", i)).collect();
    assert_eq!(names, expected);
    assert!(queue.is_empty());
}

#[tokio::test]
async fn test_messages_of_different_hosts_keep_fifo_order() {
    let sender = Arc::new(RecordingSender::default());
    let queue = Arc::new(SendQueue::new(sender.clone()));

    queue.enqueue("host-a", metrics("a", 2));
    queue.enqueue("host-b", metrics("b", 3));
    queue.enqueue("host-a", metrics("c", 1));
    let handle = spawn_serve(&queue);

    queue
        .shutdown(Instant::now() + Duration::from_secs(5))
        .await
        .unwrap();
    handle.await.unwrap();

    let hosts: Vec<String> = sender.delivered().into_iter().map(|(h, _)| h).collect();
    assert_eq!(hosts, vec!["host-a", "host-b", "host-a"]);
}

#[tokio::test]
async fn test_failed_delivery_is_retried_until_success() {
    let sender = Arc::new(RecordingSender::failing(2));
    let queue = Arc::new(SendQueue::new(sender.clone()));

    queue.enqueue("host-a", metrics("m", 3));
    let handle = spawn_serve(&queue);

    queue
        .shutdown(Instant::now() + Duration::from_secs(5))
        .await
        .unwrap();
    handle.await.unwrap();

    // delivered exactly once, after two failed attempts
    assert_eq!(sender.attempts.load(Ordering::SeqCst), 3);
    assert_eq!(sender.delivered().len(), 1);
    assert!(queue.is_empty());
}

#[tokio::test]
async fn test_empty_queue_shuts_down_promptly() {
    let sender = Arc::new(RecordingSender::default());
    let queue = Arc::new(SendQueue::new(sender.clone()));
    let handle = spawn_serve(&queue);

    let result = tokio::time::timeout(
        Duration::from_secs(1),
        queue.shutdown(Instant::now() + Duration::from_secs(60)),
    )
    .await;

    assert!(result.is_ok(), "shutdown should not wait for the deadline");
    handle.await.unwrap();
    assert_eq!(sender.attempts.load(Ordering::SeqCst), 0);
    assert!(!queue.alive());
}

#[tokio::test]
async fn test_shutdown_gives_up_at_deadline() {
    let sender = Arc::new(RecordingSender::failing(usize::MAX));
    let queue = Arc::new(SendQueue::new(sender.clone()));

    queue.enqueue("host-a", metrics("m", 1));
    let handle = spawn_serve(&queue);

    let started = Instant::now();
    queue
        .shutdown(Instant::now() + Duration::from_millis(300))
        .await
        .unwrap();
    handle.await.unwrap();

    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(sender.attempts.load(Ordering::SeqCst) >= 1);
    // undelivered data stays queued rather than being dropped silently
    assert_eq!(queue.len(), 1);
}

#[tokio::test]
async fn test_concurrent_shutdowns_run_once() {
    let sender = Arc::new(RecordingSender::default());
    let queue = Arc::new(SendQueue::new(sender.clone()));
    queue.enqueue("host-a", metrics("m", 10));
    let handle = spawn_serve(&queue);

    let deadline = Instant::now() + Duration::from_secs(5);
    let (first, second) = tokio::join!(queue.shutdown(deadline), queue.shutdown(deadline));

    assert!(first.is_ok());
    assert!(second.is_ok());
    // the sequence above only returns after the consumer stopped
    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("serve loop should have exited")
        .unwrap();
    assert!(!queue.alive());
}

#[tokio::test]
async fn test_serve_after_shutdown_returns_immediately() {
    let queue = Arc::new(SendQueue::new(Arc::new(RecordingSender::default())));
    queue.shutdown(Instant::now()).await.unwrap();

    let result = tokio::time::timeout(Duration::from_secs(1), queue.serve()).await;
    assert!(result.is_ok());
}
