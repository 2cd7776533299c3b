//! Integration tests for the worker loop and the metric ticker.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

use herakles_traffic_agent::collectors::{
    Collector, CollectorError, CollectorFactory, InterfaceInfo, RawSample,
};
use herakles_traffic_agent::config::{Config, RawConfig, RawTarget, TargetConfig};
use herakles_traffic_agent::health_stats::AgentStats;
use herakles_traffic_agent::ticker::{MetricTicker, Ticker};
use herakles_traffic_agent::{Enqueuer, Metric, Service, Worker};

/// Counts ticks; each tick takes `delay`.
struct CountingTicker {
    ticks: AtomicUsize,
    finished: AtomicUsize,
    delay: Duration,
}

impl CountingTicker {
    fn new(delay: Duration) -> Self {
        Self {
            ticks: AtomicUsize::new(0),
            finished: AtomicUsize::new(0),
            delay,
        }
    }
}

#[async_trait]
impl Ticker for CountingTicker {
    async fn tick(&self) {
        self.ticks.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.finished.fetch_add(1, Ordering::SeqCst);
    }

    async fn reload(&self, _target: Arc<TargetConfig>) {}

    fn identity(&self) -> String {
        "host=192.0.2.1,port=161,hostID=abc".into()
    }
}

fn spawn_serve(worker: &Arc<Worker>) -> tokio::task::JoinHandle<()> {
    let worker = Arc::clone(worker);
    tokio::spawn(async move { worker.serve().await })
}

#[tokio::test]
async fn test_first_tick_is_immediate() {
    let ticker = Arc::new(CountingTicker::new(Duration::ZERO));
    let worker = Arc::new(Worker::new(ticker.clone(), Duration::from_secs(3600)));
    let handle = spawn_serve(&worker);

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(ticker.ticks.load(Ordering::SeqCst), 1);

    worker.shutdown(Instant::now()).await.unwrap();
    handle.await.unwrap();
}

#[tokio::test]
async fn test_ticks_repeat_per_period() {
    let ticker = Arc::new(CountingTicker::new(Duration::ZERO));
    let worker = Arc::new(Worker::new(ticker.clone(), Duration::from_millis(50)));
    let handle = spawn_serve(&worker);

    tokio::time::sleep(Duration::from_millis(280)).await;
    worker.shutdown(Instant::now()).await.unwrap();
    handle.await.unwrap();

    let ticks = ticker.ticks.load(Ordering::SeqCst);
    assert!(ticks >= 3, "expected several ticks, got {}", ticks);
}

#[tokio::test]
async fn test_shutdown_waits_for_inflight_tick() {
    let ticker = Arc::new(CountingTicker::new(Duration::from_millis(200)));
    let worker = Arc::new(Worker::new(ticker.clone(), Duration::from_secs(3600)));
    let handle = spawn_serve(&worker);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(ticker.ticks.load(Ordering::SeqCst), 1);

    worker.shutdown(Instant::now()).await.unwrap();
    assert_eq!(ticker.finished.load(Ordering::SeqCst), 1);
    handle.await.unwrap();
}

#[tokio::test]
async fn test_no_tick_after_shutdown() {
    let ticker = Arc::new(CountingTicker::new(Duration::ZERO));
    let worker = Arc::new(Worker::new(ticker.clone(), Duration::from_millis(20)));
    let handle = spawn_serve(&worker);

    tokio::time::sleep(Duration::from_millis(50)).await;
    worker.shutdown(Instant::now()).await.unwrap();
    handle.await.unwrap();

    let ticks = ticker.ticks.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(ticker.ticks.load(Ordering::SeqCst), ticks);
}

#[tokio::test]
async fn test_shutdown_is_idempotent() {
    let ticker = Arc::new(CountingTicker::new(Duration::ZERO));
    let worker = Arc::new(Worker::new(ticker, Duration::from_secs(1)));
    let handle = spawn_serve(&worker);

    assert!(worker.alive());
    worker.shutdown(Instant::now()).await.unwrap();
    worker.shutdown(Instant::now()).await.unwrap();
    assert!(!worker.alive());
    handle.await.unwrap();
}

#[tokio::test]
async fn test_serve_after_shutdown_never_ticks() {
    let ticker = Arc::new(CountingTicker::new(Duration::ZERO));
    let worker = Worker::new(ticker.clone(), Duration::from_secs(1));

    worker.shutdown(Instant::now()).await.unwrap();
    tokio::time::timeout(Duration::from_secs(1), worker.serve())
        .await
        .unwrap();
    assert_eq!(ticker.ticks.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_worker_reports_ticker_identity() {
    let worker = Worker::new(
        Arc::new(CountingTicker::new(Duration::ZERO)),
        Duration::from_secs(1),
    );
    assert_eq!(worker.identity(), "host=192.0.2.1,port=161,hostID=abc");
    assert_eq!(worker.period(), Duration::from_secs(1));
}

// ---------------------------------------------------------------------------
// MetricTicker
// ---------------------------------------------------------------------------

/// Error counter that grows by 5 per poll, shared across rebuilt collectors.
struct GrowingCollector {
    errors: Arc<AtomicU64>,
    fail_counters: bool,
    fail_custom: bool,
}

#[async_trait]
impl Collector for GrowingCollector {
    async fn collect(&self) -> Result<Vec<RawSample>, CollectorError> {
        if self.fail_counters {
            return Err(CollectorError::Request {
                target: "192.0.2.1:161".into(),
                message: "no response".into(),
            });
        }
        let value = self.errors.fetch_add(5, Ordering::SeqCst);
        Ok(vec![RawSample::new(1, "ifInErrors", "eth0", value)])
    }

    async fn collect_custom(&self) -> Result<HashMap<String, f64>, CollectorError> {
        if self.fail_custom {
            return Err(CollectorError::Request {
                target: "192.0.2.1:161".into(),
                message: "timeout".into(),
            });
        }
        Ok(HashMap::from([("custom.custommibs.x.temp".to_string(), 42.0)]))
    }

    async fn collect_interfaces(&self) -> Result<Vec<InterfaceInfo>, CollectorError> {
        Ok(Vec::new())
    }
}

struct GrowingFactory {
    errors: Arc<AtomicU64>,
    builds: AtomicUsize,
    fail_counters: AtomicBool,
    fail_custom: AtomicBool,
}

impl GrowingFactory {
    fn new() -> Self {
        Self {
            errors: Arc::new(AtomicU64::new(100)),
            builds: AtomicUsize::new(0),
            fail_counters: AtomicBool::new(false),
            fail_custom: AtomicBool::new(false),
        }
    }
}

impl CollectorFactory for GrowingFactory {
    fn build(&self, _target: &Arc<TargetConfig>) -> Arc<dyn Collector> {
        self.builds.fetch_add(1, Ordering::SeqCst);
        Arc::new(GrowingCollector {
            errors: Arc::clone(&self.errors),
            fail_counters: self.fail_counters.load(Ordering::SeqCst),
            fail_custom: self.fail_custom.load(Ordering::SeqCst),
        })
    }
}

#[derive(Default)]
struct RecordingQueue {
    batches: Mutex<Vec<(String, Vec<Metric>)>>,
}

impl RecordingQueue {
    fn names(&self) -> Vec<Vec<String>> {
        self.batches
            .lock()
            .unwrap()
            .iter()
            .map(|(_, m)| m.iter().map(|metric| metric.name.clone()).collect())
            .collect()
    }
}

impl Enqueuer for RecordingQueue {
    fn enqueue(&self, host_id: &str, metrics: Vec<Metric>) {
        self.batches
            .lock()
            .unwrap()
            .push((host_id.to_string(), metrics));
    }
}

fn target(host_id: &str) -> Arc<TargetConfig> {
    let raw = RawConfig {
        api_key: Some("key".into()),
        collector: vec![RawTarget {
            host_id: host_id.into(),
            host: "192.0.2.1".into(),
            community: "public".into(),
            mibs: vec!["ifInErrors".into()],
            ..Default::default()
        }],
        ..Default::default()
    };
    let mut config = Config::from_raw(raw, None, None).unwrap();
    config.targets.remove(0)
}

#[tokio::test]
async fn test_metric_ticker_first_tick_only_sends_custom_values() {
    let factory = Arc::new(GrowingFactory::new());
    let queue = Arc::new(RecordingQueue::default());
    let ticker = MetricTicker::new(
        &target("abc"),
        queue.clone(),
        factory,
        Arc::new(AgentStats::new()),
    );

    ticker.tick().await;
    assert_eq!(queue.names(), vec![vec!["custom.custommibs.x.temp".to_string()]]);
}

#[tokio::test]
async fn test_metric_ticker_emits_diff_on_second_tick() {
    let factory = Arc::new(GrowingFactory::new());
    factory.fail_custom.store(true, Ordering::SeqCst);
    let queue = Arc::new(RecordingQueue::default());
    let stats = Arc::new(AgentStats::new());
    let ticker = MetricTicker::new(&target("abc"), queue.clone(), factory, stats.clone());

    ticker.tick().await;
    ticker.tick().await;

    let batches = queue.batches.lock().unwrap().clone();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].0, "abc");
    assert_eq!(batches[0].1[0].name, "custom.interface.ifInErrors.eth0");
    assert_eq!(batches[0].1[0].value, 5.0);
    assert_eq!(stats.get_poll_success_rate(), 100.0);
}

#[tokio::test]
async fn test_metric_ticker_sends_custom_values_when_counters_fail() {
    let factory = Arc::new(GrowingFactory::new());
    factory.fail_counters.store(true, Ordering::SeqCst);
    let queue = Arc::new(RecordingQueue::default());
    let stats = Arc::new(AgentStats::new());
    let ticker = MetricTicker::new(&target("abc"), queue.clone(), factory, stats.clone());

    ticker.tick().await;
    ticker.tick().await;

    let batches = queue.batches.lock().unwrap().clone();
    assert_eq!(batches.len(), 2);
    for (host_id, metrics) in &batches {
        assert_eq!(host_id, "abc");
        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics[0].name, "custom.custommibs.x.temp");
        assert_eq!(metrics[0].value, 42.0);
    }
    assert_eq!(stats.polls_failed.load(Ordering::Relaxed), 2);
    assert_eq!(stats.get_poll_success_rate(), 0.0);
}

#[tokio::test]
async fn test_metric_ticker_baseline_survives_reload() {
    let factory = Arc::new(GrowingFactory::new());
    factory.fail_custom.store(true, Ordering::SeqCst);
    let queue = Arc::new(RecordingQueue::default());
    let ticker = MetricTicker::new(
        &target("abc"),
        queue.clone(),
        factory.clone(),
        Arc::new(AgentStats::new()),
    );

    ticker.tick().await;
    assert!(queue.names().is_empty());

    // same identity, new configuration object
    ticker.reload(target("abc")).await;
    assert_eq!(factory.builds.load(Ordering::SeqCst), 2);

    ticker.tick().await;
    assert_eq!(
        queue.names(),
        vec![vec!["custom.interface.ifInErrors.eth0".to_string()]]
    );
}
