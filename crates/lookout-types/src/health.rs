//! Health probe outcomes.

use serde::{Deserialize, Serialize};

use crate::Details;

/// Outcome of one health check execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResult {
    /// Whether the probed dependency is healthy.
    pub healthy: bool,

    /// Time the probe took, in milliseconds.
    pub response_time_ms: u64,

    /// Probe-specific details.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Details>,

    /// Failure description when unhealthy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HealthResult {
    /// A healthy result.
    pub fn healthy() -> Self {
        Self {
            healthy: true,
            response_time_ms: 0,
            details: None,
            error: None,
        }
    }

    /// An unhealthy result with an error description.
    pub fn unhealthy(error: impl Into<String>) -> Self {
        Self {
            healthy: false,
            response_time_ms: 0,
            details: None,
            error: Some(error.into()),
        }
    }

    /// Attach a single detail entry.
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.details
            .get_or_insert_with(Details::new)
            .insert(key.into(), value.into());
        self
    }

    /// Set the measured response time.
    pub fn with_response_time(mut self, response_time_ms: u64) -> Self {
        self.response_time_ms = response_time_ms;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unhealthy_carries_error() {
        let result = HealthResult::unhealthy("connection refused").with_response_time(12);
        assert!(!result.healthy);
        assert_eq!(result.error.as_deref(), Some("connection refused"));
        assert_eq!(result.response_time_ms, 12);
    }

    #[test]
    fn test_details_accumulate() {
        let result = HealthResult::healthy()
            .with_detail("path", "/tmp/probe")
            .with_detail("bytes", 4);

        let details = result.details.unwrap();
        assert_eq!(details.len(), 2);
        assert_eq!(details["bytes"], 4);
    }
}
