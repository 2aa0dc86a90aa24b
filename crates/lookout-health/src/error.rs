//! Error types for lookout-health.

use thiserror::Error;

/// Errors raised while scheduling health checks.
///
/// Only [`HealthError::CheckNotFound`] is ever returned to callers. The
/// remaining variants describe contained failures and are rendered into the
/// `error` field of a failed `HealthResult`.
#[derive(Debug, Error)]
pub enum HealthError {
    /// No check registered under this id.
    #[error("health check not found: {0}")]
    CheckNotFound(String),

    /// The check did not settle before its timeout.
    #[error("timeout: check '{check_id}' did not complete within {timeout_ms}ms")]
    CheckTimeout { check_id: String, timeout_ms: u64 },

    /// The check capability returned an error.
    #[error("check '{check_id}' failed: {reason}")]
    CheckExecution { check_id: String, reason: String },

    /// The check capability panicked.
    #[error("check '{check_id}' panicked")]
    CheckPanicked { check_id: String },
}

/// Result type for health operations.
pub type Result<T> = std::result::Result<T, HealthError>;
