//! Monitoring engine lifecycle.
//!
//! The engine owns one of each building block and drives them from two
//! periodic tasks: a cycle loop (run every health check, then evaluate rules
//! and dispatch new alerts) and a retention loop. Cycles never overlap; a
//! cycle started manually waits for a timer-driven one to finish.
//!
//! `stop()` signals both loops to exit at their next tick. A cycle already
//! running is allowed to finish, so alerts it triggers are still persisted
//! and dispatched. Probes that time out are detached rather than killed, so
//! cancellation of the probes themselves is best-effort.

use std::path::PathBuf;
use std::sync::{Arc, Weak};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use futures::future::join_all;
use lookout_alert::{default_rules, AlertRuleEngine, RuleSpec};
use lookout_health::{CheckSpec, CommandProbe, ComponentRegistry, FilesystemProbe, HealthCheckScheduler};
use lookout_metrics::MetricsBuffer;
use lookout_notify::{DispatchReport, NotificationDispatcher};
use lookout_types::{
    Component, ComponentSpec, EventBus, HealthResult, Metric, MetricValue, MonitorEvent,
    SharedClock, SystemClock, Tags,
};
use parking_lot::Mutex;
use tokio::sync::{broadcast, watch, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tokio::time::{interval, interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, instrument, warn};

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::export::{ExportSink, FileExportSink, MonitoringExport};
use crate::retention::prune_directory;
use crate::status::{
    CheckStats, CleanupReport, CycleReport, IntegrationStatus, LifecycleState, MonitoringStats,
    SystemStatus,
};

/// Id of the built-in storage health check.
pub const STORAGE_CHECK: &str = "storage";

/// Id of the component backed by the storage check.
pub const STORAGE_COMPONENT: &str = "monitoring-storage";

#[derive(Debug, Default)]
struct Lifecycle {
    state: LifecycleState,
    initialized: bool,
    started_at: Option<chrono::DateTime<chrono::Utc>>,
    shutdown: Option<watch::Sender<bool>>,
}

struct EngineInner {
    config: EngineConfig,
    clock: SharedClock,
    events: EventBus,
    metrics: Arc<MetricsBuffer>,
    registry: Arc<ComponentRegistry>,
    scheduler: HealthCheckScheduler,
    rules: AsyncMutex<AlertRuleEngine>,
    dispatcher: NotificationDispatcher,
    lifecycle: Mutex<Lifecycle>,
    timers: Mutex<Vec<JoinHandle<()>>>,
    cycle_lock: AsyncMutex<()>,
}

/// Process-local monitoring engine.
///
/// Cheap to clone; clones share the same engine.
#[derive(Clone)]
pub struct MonitoringEngine {
    inner: Arc<EngineInner>,
}

impl MonitoringEngine {
    /// Create an engine using the wall clock.
    pub fn new(config: EngineConfig) -> Self {
        Self::with_clock(config, SystemClock::shared())
    }

    /// Create an engine using a specific clock.
    pub fn with_clock(config: EngineConfig, clock: SharedClock) -> Self {
        let events = EventBus::new(config.monitoring.event_capacity.max(1));

        let metrics = Arc::new(
            MetricsBuffer::new(config.monitoring.metrics_capacity)
                .with_clock(clock.clone())
                .with_events(events.clone()),
        );
        let registry = Arc::new(ComponentRegistry::new().with_events(events.clone()));
        let scheduler =
            HealthCheckScheduler::new(metrics.clone(), registry.clone()).with_clock(clock.clone());
        let rules = AlertRuleEngine::new().with_clock(clock.clone());
        let dispatcher = NotificationDispatcher::with_defaults(
            config.storage.alerts_dir(),
            config.alerting.webhook_url.clone(),
        );

        Self {
            inner: Arc::new(EngineInner {
                config,
                clock,
                events,
                metrics,
                registry,
                scheduler,
                rules: AsyncMutex::new(rules),
                dispatcher,
                lifecycle: Mutex::new(Lifecycle::default()),
                timers: Mutex::new(Vec::new()),
                cycle_lock: AsyncMutex::new(()),
            }),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    pub fn state(&self) -> LifecycleState {
        self.inner.lifecycle.lock().state
    }

    pub fn is_running(&self) -> bool {
        self.state() == LifecycleState::Running
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.lifecycle.lock().initialized
    }

    /// Subscribe to engine events. Events published after this call are
    /// observed by the returned receiver.
    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> {
        self.inner.events.subscribe()
    }

    /// Create storage directories and register the built-in checks,
    /// components and rules.
    ///
    /// Idempotent once it has succeeded. On failure the engine stays stopped
    /// and uninitialized.
    #[instrument(skip(self))]
    pub async fn initialize(&self) -> EngineResult<()> {
        {
            let mut lifecycle = self.inner.lifecycle.lock();
            if lifecycle.initialized || lifecycle.state != LifecycleState::Stopped {
                debug!(state = %lifecycle.state, "Engine already initialized");
                return Ok(());
            }
            lifecycle.state = LifecycleState::Initializing;
        }

        let result = self.try_initialize().await;

        let mut lifecycle = self.inner.lifecycle.lock();
        lifecycle.state = LifecycleState::Stopped;
        match &result {
            Ok(()) => {
                lifecycle.initialized = true;
                info!("Monitoring engine initialized");
            }
            Err(e) => error!(error = %e, "Monitoring engine initialization failed"),
        }

        result
    }

    async fn try_initialize(&self) -> EngineResult<()> {
        let config = &self.inner.config;
        let storage = &config.storage;

        for dir in [storage.data_dir.clone(), storage.alerts_dir(), storage.metrics_dir()] {
            tokio::fs::create_dir_all(&dir).await.map_err(|e| {
                EngineError::Initialization(format!("cannot create {}: {}", dir.display(), e))
            })?;
        }

        self.register_health_check(
            STORAGE_CHECK,
            CheckSpec::new("Monitoring storage", Arc::new(FilesystemProbe::new(&storage.data_dir)))
                .with_timeout(config.monitoring.check_timeout())
                .with_interval(config.monitoring.health_check_interval()),
        );
        self.register_component(
            STORAGE_COMPONENT,
            ComponentSpec::new("Monitoring storage", "storage").with_health_check(STORAGE_CHECK),
        );

        for integration in config.integrations.iter().filter(|i| i.enabled) {
            let Some(probe) = CommandProbe::from_argv(&integration.command) else {
                warn!(integration = %integration.name, "Integration enabled without a command, skipping");
                continue;
            };

            let timeout = integration
                .timeout_ms
                .map(Duration::from_millis)
                .unwrap_or_else(|| config.monitoring.check_timeout());
            let check_id = integration.check_id();

            self.register_health_check(
                check_id.clone(),
                CheckSpec::new(integration.name.clone(), Arc::new(probe))
                    .with_timeout(timeout)
                    .with_interval(config.monitoring.health_check_interval()),
            );
            self.register_component(
                integration.name.clone(),
                ComponentSpec::new(integration.name.clone(), "integration")
                    .depends_on(STORAGE_COMPONENT)
                    .with_health_check(check_id),
            );
        }

        let mut rules = self.inner.rules.lock().await;
        for (id, spec) in default_rules(&config.alerting.thresholds, &config.alerting.default_channels) {
            rules.register_rule(id, spec);
        }

        Ok(())
    }

    /// Start the cycle and retention loops.
    ///
    /// A no-op when already running. Must be called within a Tokio runtime.
    pub fn start(&self) -> EngineResult<()> {
        let mut lifecycle = self.inner.lifecycle.lock();

        if lifecycle.state == LifecycleState::Running {
            debug!("Monitoring engine already running");
            return Ok(());
        }
        if !lifecycle.initialized {
            return Err(EngineError::NotInitialized);
        }

        let at = self.inner.clock.now();
        lifecycle.state = LifecycleState::Running;
        lifecycle.started_at = Some(at);

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        lifecycle.shutdown = Some(shutdown_tx);

        let weak = Arc::downgrade(&self.inner);
        let mut timers = self.inner.timers.lock();
        timers.push(spawn_cycle_loop(
            weak.clone(),
            self.inner.config.monitoring.health_check_interval(),
            shutdown_rx.clone(),
        ));
        timers.push(spawn_cleanup_loop(
            weak,
            self.inner.config.monitoring.cleanup_interval(),
            shutdown_rx,
        ));

        info!(
            health_check_interval_secs = self.inner.config.monitoring.health_check_interval().as_secs(),
            cleanup_interval_secs = self.inner.config.monitoring.cleanup_interval().as_secs(),
            "Monitoring started"
        );
        self.inner.events.publish(MonitorEvent::MonitoringStarted { at });

        Ok(())
    }

    /// Stop both loops. A no-op when not running.
    ///
    /// Returns without waiting for a cycle in progress; that cycle completes
    /// in the background.
    pub fn stop(&self) {
        let mut lifecycle = self.inner.lifecycle.lock();
        if lifecycle.state != LifecycleState::Running {
            return;
        }

        if let Some(shutdown) = lifecycle.shutdown.take() {
            let _ = shutdown.send(true);
        }
        self.inner.timers.lock().clear();

        lifecycle.state = LifecycleState::Stopped;
        lifecycle.started_at = None;

        let at = self.inner.clock.now();
        info!("Monitoring stopped");
        self.inner.events.publish(MonitorEvent::MonitoringStopped { at });
    }

    /// Number of periodic tasks currently alive.
    pub fn active_timer_count(&self) -> usize {
        self.inner
            .timers
            .lock()
            .iter()
            .filter(|h| !h.is_finished())
            .count()
    }

    pub fn register_component(&self, id: impl Into<String>, spec: ComponentSpec) -> Component {
        self.inner.registry.register(id, spec)
    }

    pub fn register_health_check(&self, id: impl Into<String>, spec: CheckSpec) {
        self.inner.scheduler.register_check(id, spec);
    }

    pub async fn register_alert_rule(&self, id: impl Into<String>, spec: RuleSpec) {
        self.inner.rules.lock().await.register_rule(id, spec);
    }

    /// Record a metric sample. Safe to call from anywhere, at any time.
    pub fn record_metric(
        &self,
        name: impl Into<String>,
        value: impl Into<MetricValue>,
        metric_type: &str,
        tags: Tags,
    ) -> Metric {
        self.inner.metrics.record(name, value, metric_type, tags)
    }

    /// Run one health check outside the cycle.
    pub async fn run_health_check(&self, id: &str) -> EngineResult<HealthResult> {
        Ok(self.inner.scheduler.run_one(id).await?)
    }

    /// Run every check, then evaluate rules and dispatch new alerts.
    #[instrument(skip(self))]
    pub async fn run_cycle(&self) -> CycleReport {
        let _guard = self.inner.cycle_lock.lock().await;
        let started_at = self.inner.clock.now();

        let checks = self.inner.scheduler.run_all().await;
        let (evaluation, dispatches) = self.evaluate_and_dispatch().await;

        let report = CycleReport {
            started_at,
            checks,
            evaluation,
            dispatches,
        };

        debug!(
            checks = report.checks.len(),
            failed_checks = report.failed_checks(),
            triggered = report.evaluation.triggered.len(),
            resolved = report.evaluation.resolved.len(),
            "Monitoring cycle complete"
        );

        report
    }

    /// Evaluate rules against the current window and dispatch new alerts,
    /// without running checks.
    pub async fn evaluate_alerts(&self) -> CycleReport {
        let _guard = self.inner.cycle_lock.lock().await;
        let started_at = self.inner.clock.now();
        let (evaluation, dispatches) = self.evaluate_and_dispatch().await;

        CycleReport {
            started_at,
            checks: Vec::new(),
            evaluation,
            dispatches,
        }
    }

    async fn evaluate_and_dispatch(&self) -> (lookout_alert::EvaluationReport, Vec<DispatchReport>) {
        let metrics = self.inner.metrics.window();
        let components = self.inner.registry.snapshot();

        let evaluation = self.inner.rules.lock().await.evaluate_all(&metrics, &components);

        for alert in &evaluation.triggered {
            self.inner
                .events
                .publish(MonitorEvent::AlertTriggered(alert.clone()));
        }
        for alert in &evaluation.resolved {
            self.inner
                .events
                .publish(MonitorEvent::AlertResolved(alert.clone()));
        }

        let dispatcher = &self.inner.dispatcher;
        let dispatches = join_all(evaluation.triggered.iter().map(|alert| dispatcher.dispatch(alert))).await;

        (evaluation, dispatches)
    }

    /// Snapshot of the engine. Never fails; reflects the best-known state
    /// even when every check is failing.
    pub async fn status(&self) -> SystemStatus {
        let now = self.inner.clock.now();
        let (state, initialized, started_at) = {
            let lifecycle = self.inner.lifecycle.lock();
            (lifecycle.state, lifecycle.initialized, lifecycle.started_at)
        };

        let uptime_secs = started_at
            .and_then(|at| (now - at).to_std().ok())
            .map_or(0, |d| d.as_secs());

        let integrations = self
            .inner
            .config
            .integrations
            .iter()
            .map(|i| IntegrationStatus {
                name: i.name.clone(),
                enabled: i.enabled,
                status: self.inner.registry.get(&i.name).map(|c| c.status),
            })
            .collect();

        SystemStatus {
            state,
            running: state == LifecycleState::Running,
            initialized,
            started_at,
            uptime_secs,
            components: self.inner.registry.status_counts(),
            metrics_count: self.inner.metrics.size(),
            active_alerts: self.inner.rules.lock().await.active_alerts().len(),
            integrations,
            timestamp: now,
        }
    }

    /// Aggregates across checks, rules, metrics and components.
    pub async fn stats(&self) -> MonitoringStats {
        let (alert_rules, active_alerts) = {
            let rules = self.inner.rules.lock().await;
            (rules.rule_count(), rules.active_alerts().len())
        };

        MonitoringStats {
            health_checks: self
                .inner
                .scheduler
                .snapshot()
                .iter()
                .map(CheckStats::from)
                .collect(),
            alert_rules,
            active_alerts,
            metrics_count: self.inner.metrics.size(),
            metrics_recorded: self.inner.metrics.total_recorded(),
            metrics_evicted: self.inner.metrics.evicted(),
            components: self.inner.registry.status_counts(),
            timestamp: self.inner.clock.now(),
        }
    }

    /// Build an export and, when a sink is given, write it there.
    pub async fn export_data(&self, sink: Option<&dyn ExportSink>) -> EngineResult<MonitoringExport> {
        let export = MonitoringExport {
            exported_at: self.inner.clock.now(),
            status: self.status().await,
            stats: self.stats().await,
            components: self.inner.registry.snapshot(),
            metrics: self.inner.metrics.window(),
            active_alerts: self.inner.rules.lock().await.active_alerts(),
            alert_history: self.inner.dispatcher.store().load_all().await?,
        };

        if let Some(sink) = sink {
            sink.write(&export).await?;
        }

        Ok(export)
    }

    /// Write an export into the metrics directory and return its path.
    pub async fn export_to_storage(&self) -> EngineResult<PathBuf> {
        let path = self.inner.config.storage.metrics_dir().join(format!(
            "export-{}.json",
            self.inner.clock.now().format("%Y%m%dT%H%M%S%.3fZ")
        ));

        let sink = FileExportSink::new(path.clone());
        self.export_data(Some(&sink)).await?;

        info!(path = %path.display(), "Monitoring data exported");
        Ok(path)
    }

    /// Remove alert records, notification logs and exports older than
    /// `retention`, judged by file modification time.
    pub async fn cleanup_old_data(&self, retention: Duration) -> EngineResult<CleanupReport> {
        let now = SystemTime::from(self.inner.clock.now());
        let cutoff = now.checked_sub(retention).unwrap_or(UNIX_EPOCH);
        let storage = &self.inner.config.storage;

        let report = CleanupReport {
            cutoff: cutoff.into(),
            alerts_removed: prune_directory(&storage.alerts_dir(), cutoff).await?,
            metrics_removed: prune_directory(&storage.metrics_dir(), cutoff).await?,
        };

        info!(
            alerts_removed = report.alerts_removed,
            metrics_removed = report.metrics_removed,
            "Retention sweep complete"
        );

        Ok(report)
    }

    /// Clear components, metrics and active alerts. Checks and rules stay
    /// registered; rule cooldowns restart.
    pub async fn reset(&self) {
        let _guard = self.inner.cycle_lock.lock().await;
        self.inner.registry.clear();
        self.inner.metrics.clear();
        self.inner.rules.lock().await.reset();
        info!("Monitoring engine reset");
    }
}

fn spawn_cycle_loop(
    engine: Weak<EngineInner>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                _ = ticker.tick() => {}
            }

            let Some(inner) = engine.upgrade() else { break };
            MonitoringEngine { inner }.run_cycle().await;
        }

        debug!("Cycle loop stopped");
    })
}

fn spawn_cleanup_loop(
    engine: Weak<EngineInner>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                _ = ticker.tick() => {}
            }

            let Some(inner) = engine.upgrade() else { break };
            let engine = MonitoringEngine { inner };
            let retention = engine.config().monitoring.retention();
            if let Err(e) = engine.cleanup_old_data(retention).await {
                error!(error = %e, "Retention sweep failed");
            }
        }
    })
}
