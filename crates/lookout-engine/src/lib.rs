//! # Lookout Engine - monitoring lifecycle
//!
//! [`MonitoringEngine`] wires the metrics buffer, component registry, health
//! check scheduler, alert rule engine and notification dispatcher into one
//! process-local engine:
//!
//! ```text
//! stopped ──initialize()──▶ initializing ──ok──▶ stopped (initialized)
//!                                  └──err──▶ stopped
//! stopped (initialized) ──start()──▶ running ──stop()──▶ stopped
//! ```
//!
//! While running, a cycle loop runs every check concurrently, then evaluates
//! the alert rules against the metrics window and dispatches new alerts; a
//! retention loop removes persisted artifacts past their retention window.
//!
//! ## Example
//!
//! ```rust,no_run
//! use lookout_engine::{EngineConfig, MonitoringEngine};
//! use lookout_types::{metric_types, Tags};
//!
//! # async fn example() -> lookout_engine::EngineResult<()> {
//! let engine = MonitoringEngine::new(EngineConfig::load(None)?);
//! engine.initialize().await?;
//! engine.start()?;
//!
//! engine.record_metric("error_rate", 0.12, metric_types::ERROR_RATE, Tags::new());
//! let status = engine.status().await;
//! println!("{} components, {} metrics", status.components.total, status.metrics_count);
//!
//! engine.stop();
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod export;
pub mod logging;
pub mod retention;
pub mod status;

pub use config::{
    AlertingConfig, EngineConfig, IntegrationConfig, LoggingConfig, MonitoringConfig, StorageConfig,
    SECS_PER_DAY,
};
pub use engine::{MonitoringEngine, STORAGE_CHECK, STORAGE_COMPONENT};
pub use error::{EngineError, EngineResult};
pub use export::{ExportSink, FileExportSink, MonitoringExport};
pub use logging::init_tracing;
pub use status::{
    CheckStats, CleanupReport, CycleReport, IntegrationStatus, LifecycleState, MonitoringStats,
    SystemStatus,
};
