//! Alerts and their severities.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Details;

/// Alert severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

/// A firing alert.
///
/// At most one alert per rule is active at a time. Every trigger gets a fresh
/// id, even when two triggers share an instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    /// Unique id (`<rule_id>-<uuid>`).
    pub id: String,

    /// Rule that produced the alert.
    pub rule_id: String,

    /// Display name of the rule.
    pub rule_name: String,

    /// Severity inherited from the rule.
    pub severity: Severity,

    /// Trigger instant.
    pub timestamp: DateTime<Utc>,

    /// Human-readable summary.
    pub message: String,

    /// Condition-specific details.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Details>,

    /// Notification channels the alert is routed to.
    #[serde(default)]
    pub channels: Vec<String>,
}

impl Alert {
    /// Create an alert for a rule triggered at `timestamp`.
    pub fn new(
        rule_id: impl Into<String>,
        rule_name: impl Into<String>,
        severity: Severity,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let rule_id = rule_id.into();
        let rule_name = rule_name.into();

        Self {
            id: format!("{}-{}", rule_id, Uuid::new_v4()),
            message: format!("{} triggered", rule_name),
            rule_id,
            rule_name,
            severity,
            timestamp,
            details: None,
            channels: Vec::new(),
        }
    }

    /// Attach condition details.
    pub fn with_details(mut self, details: Option<Details>) -> Self {
        self.details = details;
        self
    }

    /// Route the alert to channels.
    pub fn with_channels(mut self, channels: Vec<String>) -> Self {
        self.channels = channels;
        self
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Critical > Severity::Warning);
        assert!(Severity::Warning > Severity::Info);
        assert_eq!(Severity::Critical.to_string(), "critical");
    }

    #[test]
    fn test_alert_ids_unique_per_trigger() {
        let at = DateTime::from_timestamp_millis(1_700_000_000_123).unwrap();
        let first = Alert::new("high-error-rate", "High Error Rate", Severity::Warning, at);
        let second = Alert::new("high-error-rate", "High Error Rate", Severity::Warning, at);

        assert!(first.id.starts_with("high-error-rate-"));
        assert_ne!(first.id, second.id);
        assert_eq!(first.message, "High Error Rate triggered");
        assert!(first.channels.is_empty());
    }
}
