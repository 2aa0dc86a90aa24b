//! Error types for lookout-alert.

use thiserror::Error;

/// Errors raised by the rule engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AlertError {
    /// A rule's condition failed or panicked. Contained: the rule is skipped
    /// for the current evaluation.
    #[error("rule '{rule_id}' evaluation failed: {reason}")]
    RuleEvaluation { rule_id: String, reason: String },

    /// No rule registered under this id.
    #[error("alert rule not found: {0}")]
    RuleNotFound(String),
}

/// Result type for alert operations.
pub type Result<T> = std::result::Result<T, AlertError>;
