//! Metric samples.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::HealthResult;

/// Metric tags.
pub type Tags = BTreeMap<String, String>;

/// Well-known metric type tags.
pub mod metric_types {
    /// Health check outcomes recorded by the scheduler.
    pub const HEALTH: &str = "health";
    /// Error-rate samples (fraction, 0.0-1.0).
    pub const ERROR_RATE: &str = "error_rate";
    /// Latency samples, in milliseconds.
    pub const PERFORMANCE: &str = "performance";
    /// Data quality scores (0.0-1.0).
    pub const DATA_QUALITY: &str = "data_quality";
    /// Fallback for missing or blank types.
    pub const CUSTOM: &str = "custom";
}

/// Value carried by a metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    /// Plain numeric sample.
    Number(f64),
    /// A health check outcome.
    Health(HealthResult),
    /// Arbitrary structured payload.
    Structured(serde_json::Value),
}

impl MetricValue {
    /// Numeric view of the value, if it has one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetricValue::Number(value) => Some(*value),
            MetricValue::Structured(value) => value.as_f64(),
            MetricValue::Health(_) => None,
        }
    }

    /// Health view of the value, if it is a check outcome.
    pub fn as_health(&self) -> Option<&HealthResult> {
        match self {
            MetricValue::Health(result) => Some(result),
            _ => None,
        }
    }
}

impl From<f64> for MetricValue {
    fn from(value: f64) -> Self {
        MetricValue::Number(value)
    }
}

impl From<u64> for MetricValue {
    fn from(value: u64) -> Self {
        MetricValue::Number(value as f64)
    }
}

impl From<HealthResult> for MetricValue {
    fn from(value: HealthResult) -> Self {
        MetricValue::Health(value)
    }
}

impl From<serde_json::Value> for MetricValue {
    fn from(value: serde_json::Value) -> Self {
        MetricValue::Structured(value)
    }
}

/// An immutable, timestamped metric sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    /// Metric name (e.g. `error_rate`, `storage`).
    pub name: String,

    /// Sample value.
    pub value: MetricValue,

    /// Category tag (see [`metric_types`]).
    #[serde(rename = "type")]
    pub metric_type: String,

    /// Free-form tags.
    #[serde(default)]
    pub tags: Tags,

    /// When the sample was recorded.
    pub timestamp: DateTime<Utc>,
}

impl Metric {
    /// Build a metric, substituting [`metric_types::CUSTOM`] for a blank type.
    pub fn new(
        name: impl Into<String>,
        value: impl Into<MetricValue>,
        metric_type: &str,
        tags: Tags,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let metric_type = match metric_type.trim() {
            "" => metric_types::CUSTOM.to_string(),
            t => t.to_string(),
        };

        Self {
            name: name.into(),
            value: value.into(),
            metric_type,
            tags,
            timestamp,
        }
    }

    /// Whether this is a health-check sample.
    pub fn is_health(&self) -> bool {
        self.metric_type == metric_types::HEALTH
    }

    /// Look up a tag.
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }
}
