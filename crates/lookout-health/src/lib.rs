//! # Lookout Health - component registry and health-check scheduling
//!
//! This crate owns the two stateful pieces of the engine that deal with
//! liveness of external dependencies:
//!
//! - [`ComponentRegistry`]: logical components, their declared dependencies
//!   and the status derived from their linked health check
//! - [`HealthCheckScheduler`]: registered checks, each raced against its own
//!   timeout; all checks of a cycle run concurrently
//!
//! Check capabilities are [`HealthProbe`] implementations. A probe that
//! errors, panics or hangs degrades to a failed [`HealthResult`]; nothing a
//! probe does can propagate out of the scheduler.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use lookout_health::{probe_fn, CheckSpec, ComponentRegistry, HealthCheckScheduler};
//! use lookout_metrics::MetricsBuffer;
//! use lookout_types::{ComponentSpec, HealthResult};
//!
//! # async fn example() {
//! let metrics = Arc::new(MetricsBuffer::default());
//! let registry = Arc::new(ComponentRegistry::new());
//! let scheduler = HealthCheckScheduler::new(metrics, registry.clone());
//!
//! registry.register("duckdb", ComponentSpec::new("DuckDB", "database").with_health_check("duckdb-ping"));
//! scheduler.register_check(
//!     "duckdb-ping",
//!     CheckSpec::new("DuckDB ping", probe_fn(|| async { Ok(HealthResult::healthy()) }))
//!         .with_timeout(Duration::from_secs(2)),
//! );
//!
//! let outcomes = scheduler.run_all().await;
//! assert!(outcomes[0].result.healthy);
//! # }
//! ```
//!
//! [`HealthResult`]: lookout_types::HealthResult

pub mod error;
pub mod probes;
pub mod registry;
pub mod scheduler;

pub use error::{HealthError, Result};
pub use probes::{probe_fn, CommandProbe, FilesystemProbe, HealthProbe};
pub use registry::ComponentRegistry;
pub use scheduler::{CheckOutcome, CheckSpec, HealthCheck, HealthCheckScheduler};
