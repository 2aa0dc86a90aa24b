//! Error types for lookout-notify.

use thiserror::Error;

/// Errors raised while persisting or delivering alerts.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// Filesystem failure while persisting or appending.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Alert could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A channel failed to deliver.
    #[error("delivery via '{channel}' failed: {reason}")]
    Delivery { channel: String, reason: String },

    /// No channel registered under this name.
    #[error("unknown channel: {0}")]
    UnknownChannel(String),
}

impl NotifyError {
    pub fn delivery(channel: impl Into<String>, reason: impl ToString) -> Self {
        Self::Delivery {
            channel: channel.into(),
            reason: reason.to_string(),
        }
    }
}

/// Result type for notification operations.
pub type Result<T> = std::result::Result<T, NotifyError>;
