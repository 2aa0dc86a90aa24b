//! Lookout Types - shared domain model for the monitoring engine.
//!
//! Every other `lookout-*` crate speaks in these types:
//!
//! - [`Component`]: a logical part of the data stack whose health is tracked
//! - [`HealthResult`]: the outcome of a single health probe
//! - [`Metric`]: an immutable, timestamped sample
//! - [`Alert`]: a firing alert produced by a rule
//! - [`MonitorEvent`]: observable engine events, fanned out through an [`EventBus`]
//! - [`Clock`]: injectable time source used for cooldown and retention arithmetic

pub mod alert;
pub mod clock;
pub mod component;
pub mod event;
pub mod health;
pub mod metric;

pub use alert::{Alert, Severity};
pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use component::{Component, ComponentSpec, ComponentStatus, StatusCounts};
pub use event::{EventBus, MonitorEvent};
pub use health::HealthResult;
pub use metric::{metric_types, Metric, MetricValue, Tags};

/// Free-form structured details attached to health results and alerts.
pub type Details = serde_json::Map<String, serde_json::Value>;
