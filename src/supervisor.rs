//! Service supervision: startup, hot reload and shutdown.
//!
//! The [`Supervisor`] owns every running service (two workers per target plus
//! the send queue). It launches workers spread over a settle window, reconciles
//! the running set against a freshly loaded configuration on reload, and stops
//! everything within a deadline on shutdown. Only the control loop mutates the
//! service set.

use std::collections::HashSet;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::collectors::CollectorFactory;
use crate::config::{AgentSettings, ConfigSource, TargetConfig};
use crate::health_stats::AgentStats;
use crate::sdnotify::{Readiness, ReadinessNotifier};
use crate::sendqueue::{Enqueuer, SendQueue, Sender};
use crate::service::{Service, ServiceError};
use crate::signals::ControlEvent;
use crate::ticker::{MetadataTicker, MetadataUpdater, MetricTicker};
use crate::worker::Worker;

pub const EXIT_OK: i32 = 0;
pub const EXIT_CONFIG: i32 = 1;
pub const EXIT_FORCED: i32 = 2;

/// Extra time past the shutdown deadline for in-flight work to return.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Worker launch schedule: batch sizes and the pause between batches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaggerPlan {
    pub batches: Vec<usize>,
    pub interval: Duration,
}

/// Spreads `count` launches over `limit`.
///
/// The gap is `limit / count` clamped to `[min, max]`. When that gap would be
/// below `min`, launches are grouped into `limit / min` batches (at least one)
/// separated by `min`, with the remainder spread over the first batches.
pub fn stagger_plan(count: usize, limit: Duration, min: Duration, max: Duration) -> StaggerPlan {
    if count == 0 {
        return StaggerPlan {
            batches: Vec::new(),
            interval: Duration::ZERO,
        };
    }

    let wait = limit / count as u32;
    if wait < min {
        let batch_count = (limit.as_nanos() / min.as_nanos()).max(1) as usize;
        let batch_count = batch_count.min(count);
        let base = count / batch_count;
        let remainder = count % batch_count;
        let batches = (0..batch_count)
            .map(|i| if i < remainder { base + 1 } else { base })
            .collect();
        return StaggerPlan {
            batches,
            interval: min,
        };
    }

    StaggerPlan {
        batches: vec![1; count],
        interval: wait.min(max.max(min)),
    }
}

/// External collaborators the supervisor wires into workers.
pub struct Dependencies {
    pub factory: Arc<dyn CollectorFactory>,
    pub sender: Arc<dyn Sender>,
    pub updater: Arc<dyn MetadataUpdater>,
    pub notifier: Arc<dyn ReadinessNotifier>,
    pub source: Arc<dyn ConfigSource>,
}

/// Outcome of one reconciliation, by target identity.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    pub reloaded: Vec<String>,
    pub started: Vec<String>,
    pub stopped: Vec<String>,
}

pub struct Supervisor {
    settings: AgentSettings,
    services: Vec<Arc<dyn Service>>,
    queue: Arc<SendQueue>,
    factory: Arc<dyn CollectorFactory>,
    updater: Arc<dyn MetadataUpdater>,
    notifier: Arc<dyn ReadinessNotifier>,
    source: Arc<dyn ConfigSource>,
    stats: Arc<AgentStats>,
    /// Shutdowns of services removed by reload.
    retiring: JoinSet<()>,
    is_shutdown: AtomicBool,
}

impl Supervisor {
    pub fn new(settings: AgentSettings, deps: Dependencies) -> Self {
        let stats = Arc::new(AgentStats::new());
        let queue = Arc::new(
            SendQueue::new(deps.sender)
                .with_backlog_thresholds(settings.queue_warn_backlog, settings.queue_critical_backlog)
                .with_stats(Arc::clone(&stats)),
        );
        Self {
            settings,
            services: Vec::new(),
            queue,
            factory: deps.factory,
            updater: deps.updater,
            notifier: deps.notifier,
            source: deps.source,
            stats,
            retiring: JoinSet::new(),
            is_shutdown: AtomicBool::new(false),
        }
    }

    pub fn services(&self) -> &[Arc<dyn Service>] {
        &self.services
    }

    pub fn queue(&self) -> &Arc<SendQueue> {
        &self.queue
    }

    pub fn stats(&self) -> &Arc<AgentStats> {
        &self.stats
    }

    /// Shutdowns of reload-removed services not yet reaped.
    pub fn retiring_count(&self) -> usize {
        self.retiring.len()
    }

    fn notify(&self, state: Readiness) {
        if let Err(e) = self.notifier.notify(state) {
            warn!("Failed to send readiness notification {:?}: {}", state, e);
        }
    }

    fn launch(service: &Arc<dyn Service>) {
        let service = Arc::clone(service);
        tokio::spawn(async move {
            service.serve().await;
        });
    }

    /// Metadata and metric workers for one target.
    fn build_workers(&self, target: &Arc<TargetConfig>) -> [Arc<dyn Service>; 2] {
        let queue: Arc<dyn Enqueuer> = self.queue.clone();
        let metadata = MetadataTicker::new(
            target,
            Arc::clone(&self.updater),
            Arc::clone(&self.factory),
            Arc::clone(&self.stats),
        );
        let metric = MetricTicker::new(
            target,
            queue,
            Arc::clone(&self.factory),
            Arc::clone(&self.stats),
        );
        let metadata: Arc<dyn Service> = Arc::new(Worker::new(
            Arc::new(metadata),
            self.settings.metadata_interval(),
        ));
        let metric: Arc<dyn Service> =
            Arc::new(Worker::new(Arc::new(metric), self.settings.poll_interval()));
        [metadata, metric]
    }

    async fn push_graph_defs(&self, target: &TargetConfig) {
        if target.graph_defs.is_empty() {
            return;
        }
        if let Err(e) = self.updater.create_graph_defs(&target.graph_defs).await {
            warn!("Failed to create graph definitions for {}: {}", target.id(), e);
        }
    }

    /// Starts the send queue and staggers the workers of `targets`, then reports ready.
    ///
    /// `events` is watched while graph definitions are pushed and between
    /// launches. A stop event ends startup early and is returned to the caller.
    /// A reload received meanwhile is applied once every worker is running.
    pub async fn start(
        &mut self,
        targets: &[Arc<TargetConfig>],
        events: &mut mpsc::Receiver<ControlEvent>,
    ) -> Option<ControlEvent> {
        let queue: Arc<dyn Service> = self.queue.clone();
        Self::launch(&queue);
        self.services.push(queue);

        let mut watch = StartupEvents::default();
        let mut pending = Vec::with_capacity(targets.len() * 2);
        for target in unique_targets(targets) {
            if let Err(event) = watch.race(self.push_graph_defs(target), events).await {
                info!("Startup interrupted by {:?}", event);
                return Some(event);
            }
            pending.extend(self.build_workers(target));
        }

        let plan = stagger_plan(
            pending.len(),
            self.settings.startup_settle(),
            self.settings.startup_min_interval(),
            self.settings.startup_max_interval(),
        );
        debug!(
            "Starting {} workers in {} batches, {:?} apart",
            pending.len(),
            plan.batches.len(),
            plan.interval
        );

        let mut pending = pending.into_iter();
        for (i, size) in plan.batches.iter().enumerate() {
            if i > 0 {
                let pause = tokio::time::sleep(plan.interval);
                if let Err(event) = watch.race(pause, events).await {
                    info!(
                        "Startup interrupted by {:?} with {} services running",
                        event,
                        self.services.len()
                    );
                    return Some(event);
                }
            }
            for service in pending.by_ref().take(*size) {
                Self::launch(&service);
                self.services.push(service);
            }
        }

        info!(
            "Initialized: {} targets, {} services",
            targets.len(),
            self.services.len()
        );
        self.notify(Readiness::Ready);

        if watch.reload {
            self.reload().await;
        }
        None
    }

    /// Brings the running services in line with `targets`.
    ///
    /// Surviving targets are reloaded in place and new targets get fresh
    /// workers. Services of vanished targets leave the running set at once and
    /// are shut down in the background.
    pub async fn reconcile(&mut self, targets: &[Arc<TargetConfig>]) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        while self.retiring.try_join_next().is_some() {}
        self.services.retain(|s| s.alive());

        let alive: HashSet<String> = self
            .services
            .iter()
            .map(|s| s.identity())
            .filter(|id| !id.is_empty())
            .collect();
        let wanted: HashSet<String> = targets.iter().map(|t| t.id()).collect();

        for target in unique_targets(targets) {
            let id = target.id();
            if alive.contains(&id) {
                for service in self.services.iter().filter(|s| s.identity() == id) {
                    service.reload(Arc::clone(target)).await;
                }
                info!("Reloaded {}", id);
                report.reloaded.push(id);
            } else {
                self.push_graph_defs(target).await;
                for service in self.build_workers(target) {
                    Self::launch(&service);
                    self.services.push(service);
                }
                info!("Started {} by reload", id);
                report.started.push(id);
            }
        }

        let deadline = Instant::now() + self.settings.shutdown_timeout();
        let mut stopped = HashSet::new();
        for service in &self.services {
            let id = service.identity();
            if id.is_empty() || wanted.contains(&id) {
                continue;
            }
            let service = Arc::clone(service);
            let label = id.clone();
            self.retiring.spawn(async move {
                if let Err(e) = service.shutdown(deadline).await {
                    warn!("Failed to shut down {}: {}", label, e);
                }
            });
            if stopped.insert(id.clone()) {
                info!("Shutting down {} by reload", id);
                report.stopped.push(id);
            }
        }
        // retired services are awaited through `retiring`
        self.services
            .retain(|s| s.identity().is_empty() || wanted.contains(&s.identity()));

        report
    }

    /// Re-reads the configuration and reconciles. A configuration that fails
    /// to load leaves every running service untouched.
    pub async fn reload(&mut self) -> Option<ReconcileReport> {
        self.notify(Readiness::Reloading);
        let report = match self.source.load() {
            Ok(config) => {
                if config.agent != self.settings {
                    warn!("Changes to agent settings take effect after a restart");
                }
                Some(self.reconcile(&config.targets).await)
            }
            Err(e) => {
                warn!("Failed to load configuration, keeping the running one: {}", e);
                None
            }
        };
        self.notify(Readiness::Ready);
        report
    }

    /// Stops every service within the configured deadline. Idempotent.
    pub async fn shutdown(&mut self) -> Result<(), ServiceError> {
        if self
            .is_shutdown
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Ok(());
        }

        self.notify(Readiness::Stopping);
        let deadline = Instant::now() + self.settings.shutdown_timeout();

        let mut stopping = JoinSet::new();
        for service in &self.services {
            let service = Arc::clone(service);
            stopping.spawn(async move {
                let label = match service.identity() {
                    id if id.is_empty() => "send queue".to_string(),
                    id => id,
                };
                service.shutdown(deadline).await.map_err(|e| {
                    error!("Failed to shut down {}: {}", label, e);
                    e
                })
            });
        }

        let retiring = &mut self.retiring;
        let barrier = async move {
            let mut result = Ok(());
            while let Some(joined) = stopping.join_next().await {
                match joined {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => result = Err(e),
                    Err(e) => result = Err(ServiceError::Task(e.to_string())),
                }
            }
            while retiring.join_next().await.is_some() {}
            result
        };

        let result = match tokio::time::timeout_at(deadline + SHUTDOWN_GRACE, barrier).await {
            Ok(result) => result,
            Err(_) => Err(ServiceError::DeadlineExceeded {
                identity: "supervisor".into(),
            }),
        };

        info!("Shutdown finished: {}", self.stats.summary());
        result
    }

    /// Starts `targets` and handles control events until exit. Returns the exit code.
    pub async fn serve(
        mut self,
        targets: &[Arc<TargetConfig>],
        mut events: mpsc::Receiver<ControlEvent>,
    ) -> i32 {
        match self.start(targets, &mut events).await {
            None => self.run(events).await,
            Some(ControlEvent::Quit) => {
                warn!("Forced exit requested");
                EXIT_FORCED
            }
            Some(_) => self.stop(events).await,
        }
    }

    /// Handles control events until the process should exit and returns the exit code.
    pub async fn run(mut self, mut events: mpsc::Receiver<ControlEvent>) -> i32 {
        loop {
            match events.recv().await {
                Some(ControlEvent::Reload) => {
                    self.reload().await;
                }
                Some(ControlEvent::Interrupt) | Some(ControlEvent::Terminate) | None => break,
                Some(ControlEvent::Quit) => {
                    warn!("Forced exit requested");
                    return EXIT_FORCED;
                }
            }
        }
        self.stop(events).await
    }

    /// Graceful shutdown. A second interrupt or a quit forces the exit.
    async fn stop(mut self, mut events: mpsc::Receiver<ControlEvent>) -> i32 {
        info!("Shutting down...");
        let shutdown = self.shutdown();
        tokio::pin!(shutdown);

        let result = loop {
            tokio::select! {
                result = &mut shutdown => break result,
                event = events.recv() => match event {
                    Some(ControlEvent::Interrupt) | Some(ControlEvent::Quit) => {
                        warn!("Forced shutdown");
                        return EXIT_FORCED;
                    }
                    Some(event) => debug!("Ignoring {:?} during shutdown", event),
                    None => break (&mut shutdown).await,
                },
            }
        };

        match result {
            Ok(()) => EXIT_OK,
            Err(e) => {
                error!("Shutdown failed: {}", e);
                EXIT_FORCED
            }
        }
    }
}

/// Control events seen while workers are still launching.
#[derive(Debug, Default)]
struct StartupEvents {
    reload: bool,
    closed: bool,
}

impl StartupEvents {
    /// Drives `work` to completion unless a stop event arrives first.
    async fn race<F: Future>(
        &mut self,
        work: F,
        events: &mut mpsc::Receiver<ControlEvent>,
    ) -> Result<F::Output, ControlEvent> {
        tokio::pin!(work);
        loop {
            tokio::select! {
                output = &mut work => return Ok(output),
                event = events.recv(), if !self.closed => match event {
                    Some(ControlEvent::Reload) => {
                        debug!("Reload deferred until startup completes");
                        self.reload = true;
                    }
                    Some(event) => return Err(event),
                    None => self.closed = true,
                },
            }
        }
    }
}

/// Targets in order with later duplicates of an identity dropped.
fn unique_targets(targets: &[Arc<TargetConfig>]) -> Vec<&Arc<TargetConfig>> {
    let mut seen = HashSet::new();
    targets
        .iter()
        .filter(|t| {
            let id = t.id();
            if seen.insert(id.clone()) {
                true
            } else {
                warn!("Duplicate target {} ignored", id);
                false
            }
        })
        .collect()
}
