//! Error types for the monitoring engine

use lookout_health::HealthError;
use lookout_notify::NotifyError;
use thiserror::Error;

/// Engine errors
#[derive(Debug, Error)]
pub enum EngineError {
    /// `start()` was called before a successful `initialize()`.
    #[error("monitoring engine is not initialized")]
    NotInitialized,

    /// `initialize()` failed; the engine stays stopped.
    #[error("initialization failed: {0}")]
    Initialization(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error(transparent)]
    Health(#[from] HealthError),

    #[error(transparent)]
    Notify(#[from] NotifyError),
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
