//! Health check scheduling.
//!
//! Each check runs on its own task, raced against its timeout. A timed-out
//! task is detached rather than killed: its eventual result is discarded and
//! whatever it holds is released when it finishes. Cancellation is therefore
//! best-effort; a probe that never returns leaks its task.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use futures::future::join_all;
use lookout_metrics::MetricsBuffer;
use lookout_types::{metric_types, ComponentStatus, HealthResult, SharedClock, SystemClock, Tags};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::error::{HealthError, Result};
use crate::probes::HealthProbe;
use crate::registry::ComponentRegistry;

/// Timeout used when a spec does not set one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Interval recorded when a spec does not set one.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(30);

/// Registration parameters for a health check.
#[derive(Clone)]
pub struct CheckSpec {
    /// Display name.
    pub name: String,

    /// Informational; the engine runs every check each cycle.
    pub interval: Duration,

    /// Maximum time the probe may take.
    pub timeout: Duration,

    /// The check capability.
    pub probe: Arc<dyn HealthProbe>,
}

impl CheckSpec {
    /// Create a spec with default interval and timeout.
    pub fn new(name: impl Into<String>, probe: Arc<dyn HealthProbe>) -> Self {
        Self {
            name: name.into(),
            interval: DEFAULT_INTERVAL,
            timeout: DEFAULT_TIMEOUT,
            probe,
        }
    }

    /// Set the timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the informational interval.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

impl std::fmt::Debug for CheckSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckSpec")
            .field("name", &self.name)
            .field("interval", &self.interval)
            .field("timeout", &self.timeout)
            .field("probe", &self.probe.description())
            .finish()
    }
}

/// Bookkeeping for a registered check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthCheck {
    pub id: String,
    pub name: String,
    pub interval: Duration,
    pub timeout: Duration,

    /// Failures since the last healthy result.
    pub consecutive_failures: u32,

    pub last_result: Option<HealthResult>,
    pub last_run: Option<DateTime<Utc>>,
    pub total_runs: u64,
    pub successful_runs: u64,
}

impl HealthCheck {
    fn new(id: String, spec: &CheckSpec) -> Self {
        Self {
            id,
            name: spec.name.clone(),
            interval: spec.interval,
            timeout: spec.timeout,
            consecutive_failures: 0,
            last_result: None,
            last_run: None,
            total_runs: 0,
            successful_runs: 0,
        }
    }

    /// Fraction of runs that were healthy; `None` before the first run.
    pub fn success_rate(&self) -> Option<f64> {
        if self.total_runs == 0 {
            None
        } else {
            Some(self.successful_runs as f64 / self.total_runs as f64)
        }
    }

    fn record(&mut self, result: &HealthResult, at: DateTime<Utc>) {
        self.total_runs += 1;
        if result.healthy {
            self.successful_runs += 1;
            self.consecutive_failures = 0;
        } else {
            self.consecutive_failures += 1;
        }
        self.last_result = Some(result.clone());
        self.last_run = Some(at);
    }
}

/// Result of one check within a cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckOutcome {
    pub check_id: String,
    pub result: HealthResult,
}

struct RegisteredCheck {
    state: HealthCheck,
    probe: Arc<dyn HealthProbe>,
}

/// Runs registered health checks and propagates their results.
///
/// On completion of a check the scheduler updates the check's counters,
/// records a `health` metric carrying the result, and sets the status of
/// every component linked to the check.
pub struct HealthCheckScheduler {
    checks: DashMap<String, RegisteredCheck>,
    order: RwLock<Vec<String>>,
    metrics: Arc<MetricsBuffer>,
    registry: Arc<ComponentRegistry>,
    clock: SharedClock,
}

impl HealthCheckScheduler {
    /// Create a scheduler writing into `metrics` and `registry`.
    pub fn new(metrics: Arc<MetricsBuffer>, registry: Arc<ComponentRegistry>) -> Self {
        Self {
            checks: DashMap::new(),
            order: RwLock::new(Vec::new()),
            metrics,
            registry,
            clock: SystemClock::shared(),
        }
    }

    /// Use a specific clock for `last_run` / `last_seen` stamps.
    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    /// Register a check, replacing any previous registration for `id`.
    ///
    /// Replacing a check resets its counters.
    pub fn register_check(&self, id: impl Into<String>, spec: CheckSpec) {
        let id = id.into();
        info!(
            check_id = %id,
            name = %spec.name,
            timeout_ms = spec.timeout.as_millis() as u64,
            "Registering health check"
        );

        let replaced = self
            .checks
            .insert(
                id.clone(),
                RegisteredCheck {
                    state: HealthCheck::new(id.clone(), &spec),
                    probe: spec.probe,
                },
            )
            .is_some();

        if !replaced {
            self.order.write().push(id);
        }
    }

    /// Whether a check is registered under `id`.
    pub fn contains(&self, id: &str) -> bool {
        self.checks.contains_key(id)
    }

    /// Snapshot of a check's bookkeeping.
    pub fn get(&self, id: &str) -> Option<HealthCheck> {
        self.checks.get(id).map(|c| c.state.clone())
    }

    /// Snapshot of every check, in registration order.
    pub fn snapshot(&self) -> Vec<HealthCheck> {
        self.order
            .read()
            .iter()
            .filter_map(|id| self.get(id))
            .collect()
    }

    /// Number of registered checks.
    pub fn len(&self) -> usize {
        self.checks.len()
    }

    /// Whether no checks are registered.
    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    /// Run a single check.
    ///
    /// Fails only with [`HealthError::CheckNotFound`]; probe errors, panics
    /// and timeouts come back as an unhealthy result.
    #[instrument(skip(self))]
    pub async fn run_one(&self, id: &str) -> Result<HealthResult> {
        let (probe, timeout) = {
            let check = self
                .checks
                .get(id)
                .ok_or_else(|| HealthError::CheckNotFound(id.to_string()))?;
            (check.probe.clone(), check.state.timeout)
        };

        let result = execute_probe(id, probe, timeout).await;
        self.complete(id, &result);

        Ok(result)
    }

    /// Run every registered check concurrently and wait for all to settle.
    ///
    /// Total latency is bounded by the slowest single timeout, not the sum.
    pub async fn run_all(&self) -> Vec<CheckOutcome> {
        let ids: Vec<String> = self.order.read().clone();

        debug!(count = ids.len(), "Running health checks");

        let runs = ids.iter().map(|id| async move {
            self.run_one(id).await.ok().map(|result| CheckOutcome {
                check_id: id.clone(),
                result,
            })
        });

        join_all(runs).await.into_iter().flatten().collect()
    }

    fn complete(&self, id: &str, result: &HealthResult) {
        let now = self.clock.now();

        let name = match self.checks.get_mut(id) {
            Some(mut check) => {
                check.state.record(result, now);
                if !result.healthy {
                    warn!(
                        check_id = %id,
                        consecutive_failures = check.state.consecutive_failures,
                        error = result.error.as_deref().unwrap_or("unhealthy"),
                        "Health check failed"
                    );
                }
                check.state.name.clone()
            }
            // Unregistered while in flight; nothing left to update.
            None => return,
        };

        let mut tags = Tags::new();
        tags.insert("check".to_string(), id.to_string());
        tags.insert("check_name".to_string(), name);
        self.metrics
            .record(id, result.clone(), metric_types::HEALTH, tags);

        let status = ComponentStatus::from_healthy(result.healthy);
        let updated = self.registry.update_linked(id, status, now);
        if !updated.is_empty() {
            debug!(check_id = %id, components = ?updated, status = %status, "Updated linked components");
        }
    }
}

/// Run a probe on its own task, racing it against `timeout`.
async fn execute_probe(
    check_id: &str,
    probe: Arc<dyn HealthProbe>,
    timeout: Duration,
) -> HealthResult {
    let started = Instant::now();
    let task = tokio::spawn(async move { probe.check().await });

    let result = match tokio::time::timeout(timeout, task).await {
        Ok(Ok(Ok(result))) => result,
        Ok(Ok(Err(reason))) => HealthResult::unhealthy(
            HealthError::CheckExecution {
                check_id: check_id.to_string(),
                reason,
            }
            .to_string(),
        ),
        Ok(Err(join_error)) => {
            let error = if join_error.is_panic() {
                HealthError::CheckPanicked {
                    check_id: check_id.to_string(),
                }
            } else {
                HealthError::CheckExecution {
                    check_id: check_id.to_string(),
                    reason: join_error.to_string(),
                }
            };
            HealthResult::unhealthy(error.to_string())
        }
        Err(_) => HealthResult::unhealthy(
            HealthError::CheckTimeout {
                check_id: check_id.to_string(),
                timeout_ms: timeout.as_millis() as u64,
            }
            .to_string(),
        ),
    };

    result.with_response_time(started.elapsed().as_millis() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probes::probe_fn;
    use lookout_types::{Clock, ComponentSpec, ManualClock};
    use std::sync::atomic::{AtomicU32, Ordering};

    fn scheduler() -> (HealthCheckScheduler, Arc<MetricsBuffer>, Arc<ComponentRegistry>) {
        let metrics = Arc::new(MetricsBuffer::new(100));
        let registry = Arc::new(ComponentRegistry::new());
        (
            HealthCheckScheduler::new(metrics.clone(), registry.clone()),
            metrics,
            registry,
        )
    }

    fn healthy_probe() -> Arc<dyn HealthProbe> {
        probe_fn(|| async { Ok(HealthResult::healthy()) })
    }

    fn failing_probe() -> Arc<dyn HealthProbe> {
        probe_fn(|| async { Ok(HealthResult::unhealthy("connection refused")) })
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_wins_race() {
        let (scheduler, _, _) = scheduler();
        scheduler.register_check(
            "slow",
            CheckSpec::new(
                "Slow check",
                probe_fn(|| async {
                    tokio::time::sleep(Duration::from_millis(2000)).await;
                    Ok(HealthResult::healthy())
                }),
            )
            .with_timeout(Duration::from_millis(100)),
        );

        let started = Instant::now();
        let result = scheduler.run_one("slow").await.unwrap();
        let elapsed = started.elapsed();

        assert!(!result.healthy);
        assert!(result.error.unwrap().contains("timeout"));
        assert!(elapsed >= Duration::from_millis(100));
        assert!(elapsed < Duration::from_millis(500));
        assert_eq!(scheduler.get("slow").unwrap().consecutive_failures, 1);
    }

    #[tokio::test]
    async fn test_probe_error_becomes_failed_result() {
        let (scheduler, _, _) = scheduler();
        scheduler.register_check(
            "broken",
            CheckSpec::new("Broken", probe_fn(|| async { Err("no route to host".to_string()) })),
        );

        let result = scheduler.run_one("broken").await.unwrap();
        assert!(!result.healthy);
        assert_eq!(
            result.error.as_deref(),
            Some("check 'broken' failed: no route to host")
        );
    }

    #[tokio::test]
    async fn test_probe_panic_is_contained() {
        let (scheduler, _, _) = scheduler();
        scheduler.register_check(
            "panicky",
            CheckSpec::new(
                "Panicky",
                probe_fn(|| async {
                    if true {
                        panic!("probe exploded");
                    }
                    Ok(HealthResult::healthy())
                }),
            ),
        );
        scheduler.register_check("fine", CheckSpec::new("Fine", healthy_probe()));

        let outcomes = scheduler.run_all().await;

        assert_eq!(outcomes.len(), 2);
        assert!(!outcomes[0].result.healthy);
        assert!(outcomes[0].result.error.as_ref().unwrap().contains("panicked"));
        assert!(outcomes[1].result.healthy);
    }

    #[tokio::test]
    async fn test_consecutive_failures_reset_on_success() {
        let (scheduler, _, _) = scheduler();
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        scheduler.register_check(
            "flaky",
            CheckSpec::new(
                "Flaky",
                probe_fn(move || {
                    let n = counter.fetch_add(1, Ordering::SeqCst);
                    async move {
                        if n < 2 {
                            Ok(HealthResult::unhealthy("warming up"))
                        } else {
                            Ok(HealthResult::healthy())
                        }
                    }
                }),
            ),
        );

        scheduler.run_one("flaky").await.unwrap();
        scheduler.run_one("flaky").await.unwrap();
        assert_eq!(scheduler.get("flaky").unwrap().consecutive_failures, 2);

        scheduler.run_one("flaky").await.unwrap();
        let check = scheduler.get("flaky").unwrap();
        assert_eq!(check.consecutive_failures, 0);
        assert_eq!(check.total_runs, 3);
        assert_eq!(check.successful_runs, 1);
        assert!(check.last_result.unwrap().healthy);
        assert!(check.last_run.is_some());
    }

    #[tokio::test]
    async fn test_unknown_check() {
        let (scheduler, _, _) = scheduler();
        let err = scheduler.run_one("nope").await.unwrap_err();
        assert!(matches!(err, HealthError::CheckNotFound(id) if id == "nope"));
    }

    #[tokio::test]
    async fn test_linked_component_follows_results() {
        let clock = ManualClock::starting_now();
        let metrics = Arc::new(MetricsBuffer::new(100));
        let registry = Arc::new(ComponentRegistry::new());
        let scheduler = HealthCheckScheduler::new(metrics.clone(), registry.clone())
            .with_clock(Arc::new(clock.clone()));

        registry.register(
            "duckdb",
            ComponentSpec::new("DuckDB", "database").with_health_check("db-ping"),
        );
        scheduler.register_check("db-ping", CheckSpec::new("DuckDB ping", healthy_probe()));

        scheduler.run_one("db-ping").await.unwrap();
        let component = registry.get("duckdb").unwrap();
        assert_eq!(component.status, ComponentStatus::Healthy);
        assert_eq!(component.last_seen, Some(clock.now()));

        scheduler.register_check("db-ping", CheckSpec::new("DuckDB ping", failing_probe()));
        clock.advance(Duration::from_secs(30));
        scheduler.run_one("db-ping").await.unwrap();

        let component = registry.get("duckdb").unwrap();
        assert_eq!(component.status, ComponentStatus::Unhealthy);
        assert_eq!(component.last_seen, Some(clock.now()));
    }

    #[tokio::test]
    async fn test_result_recorded_as_health_metric() {
        let (scheduler, metrics, _) = scheduler();
        scheduler.register_check("storage", CheckSpec::new("Storage", failing_probe()));

        scheduler.run_one("storage").await.unwrap();

        let window = metrics.window();
        assert_eq!(window.len(), 1);
        assert_eq!(window[0].metric_type, metric_types::HEALTH);
        assert_eq!(window[0].tag("check"), Some("storage"));
        assert!(!window[0].value.as_health().unwrap().healthy);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_all_is_concurrent() {
        let (scheduler, _, _) = scheduler();
        for i in 0..4 {
            scheduler.register_check(
                format!("slow-{}", i),
                CheckSpec::new(
                    "Slow",
                    probe_fn(|| async {
                        tokio::time::sleep(Duration::from_millis(500)).await;
                        Ok(HealthResult::healthy())
                    }),
                )
                .with_timeout(Duration::from_secs(1)),
            );
        }
        scheduler.register_check(
            "hung",
            CheckSpec::new(
                "Hung",
                probe_fn(|| async {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(HealthResult::healthy())
                }),
            )
            .with_timeout(Duration::from_millis(800)),
        );

        let started = Instant::now();
        let outcomes = scheduler.run_all().await;
        let elapsed = started.elapsed();

        assert_eq!(outcomes.len(), 5);
        assert_eq!(outcomes.iter().filter(|o| o.result.healthy).count(), 4);
        assert!(elapsed < Duration::from_millis(1000));
        let ids: Vec<_> = outcomes.iter().map(|o| o.check_id.as_str()).collect();
        assert_eq!(ids, vec!["slow-0", "slow-1", "slow-2", "slow-3", "hung"]);
    }

    #[test]
    fn test_reregister_keeps_order_and_resets_counters() {
        let (scheduler, _, _) = scheduler();
        scheduler.register_check("a", CheckSpec::new("A", healthy_probe()));
        scheduler.register_check("b", CheckSpec::new("B", healthy_probe()));
        scheduler.register_check(
            "a",
            CheckSpec::new("A2", healthy_probe()).with_timeout(Duration::from_secs(9)),
        );

        let checks = scheduler.snapshot();
        assert_eq!(checks.len(), 2);
        assert_eq!(checks[0].name, "A2");
        assert_eq!(checks[0].timeout, Duration::from_secs(9));
        assert_eq!(checks[0].success_rate(), None);
    }
}
