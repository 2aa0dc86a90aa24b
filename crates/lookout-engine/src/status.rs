//! Status, statistics and report snapshots.

use chrono::{DateTime, Utc};
use lookout_alert::EvaluationReport;
use lookout_health::{CheckOutcome, HealthCheck};
use lookout_notify::DispatchReport;
use lookout_types::{ComponentStatus, StatusCounts};
use serde::{Deserialize, Serialize};

/// Engine lifecycle state.
///
/// `Stopped -> Initializing -> Stopped` (initialization is a prerequisite of
/// starting), then `Stopped -> Running -> Stopped`. A failed initialization
/// falls back to `Stopped`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    #[default]
    Stopped,
    Initializing,
    Running,
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LifecycleState::Stopped => write!(f, "stopped"),
            LifecycleState::Initializing => write!(f, "initializing"),
            LifecycleState::Running => write!(f, "running"),
        }
    }
}

/// A configured integration and what is known about it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrationStatus {
    pub name: String,
    pub enabled: bool,

    /// Status of the integration's component; `None` if not registered.
    pub status: Option<ComponentStatus>,
}

/// Point-in-time view of the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemStatus {
    pub state: LifecycleState,
    pub running: bool,
    pub initialized: bool,
    pub started_at: Option<DateTime<Utc>>,
    pub uptime_secs: u64,
    pub components: StatusCounts,
    pub metrics_count: usize,
    pub active_alerts: usize,
    pub integrations: Vec<IntegrationStatus>,
    pub timestamp: DateTime<Utc>,
}

/// Per-check aggregates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckStats {
    pub id: String,
    pub name: String,
    pub total_runs: u64,
    pub successful_runs: u64,
    pub success_rate: Option<f64>,
    pub consecutive_failures: u32,
    pub last_run: Option<DateTime<Utc>>,
    pub healthy: Option<bool>,
}

impl From<&HealthCheck> for CheckStats {
    fn from(check: &HealthCheck) -> Self {
        Self {
            id: check.id.clone(),
            name: check.name.clone(),
            total_runs: check.total_runs,
            successful_runs: check.successful_runs,
            success_rate: check.success_rate(),
            consecutive_failures: check.consecutive_failures,
            last_run: check.last_run,
            healthy: check.last_result.as_ref().map(|r| r.healthy),
        }
    }
}

/// Aggregates across the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitoringStats {
    pub health_checks: Vec<CheckStats>,
    pub alert_rules: usize,
    pub active_alerts: usize,
    pub metrics_count: usize,
    pub metrics_recorded: u64,
    pub metrics_evicted: u64,
    pub components: StatusCounts,
    pub timestamp: DateTime<Utc>,
}

/// Outcome of one cycle (or of an evaluation-only pass, with no checks).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleReport {
    pub started_at: DateTime<Utc>,
    pub checks: Vec<CheckOutcome>,
    pub evaluation: EvaluationReport,
    pub dispatches: Vec<DispatchReport>,
}

impl CycleReport {
    pub fn failed_checks(&self) -> usize {
        self.checks.iter().filter(|c| !c.result.healthy).count()
    }
}

/// Outcome of a retention sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupReport {
    /// Files older than this were removed.
    pub cutoff: DateTime<Utc>,
    pub alerts_removed: usize,
    pub metrics_removed: usize,
}

impl CleanupReport {
    pub fn total_removed(&self) -> usize {
        self.alerts_removed + self.metrics_removed
    }
}
