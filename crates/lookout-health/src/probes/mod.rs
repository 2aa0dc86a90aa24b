//! Health check capabilities.
//!
//! A [`HealthProbe`] performs one probe of an external dependency: a DuckDB
//! ping, a filesystem round-trip, a `--version` call on a wrapped tool. The
//! scheduler owns timing, timeouts and failure containment; probes only
//! report what they observed.

mod command;
mod filesystem;

pub use command::CommandProbe;
pub use filesystem::FilesystemProbe;

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use lookout_types::HealthResult;

/// A health check capability.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    /// Probe the dependency.
    ///
    /// `Err` means the probe itself could not run; an unreachable dependency
    /// should normally be reported as `Ok(HealthResult::unhealthy(..))`.
    async fn check(&self) -> Result<HealthResult, String>;

    /// Short description for logs.
    fn description(&self) -> &str {
        "health probe"
    }
}

/// Adapt an async closure into a [`HealthProbe`].
pub fn probe_fn<F, Fut>(check_fn: F) -> Arc<dyn HealthProbe>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<HealthResult, String>> + Send + 'static,
{
    Arc::new(ClosureProbe { check_fn })
}

/// Probe implementation using a closure.
struct ClosureProbe<F> {
    check_fn: F,
}

#[async_trait]
impl<F, Fut> HealthProbe for ClosureProbe<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<HealthResult, String>> + Send,
{
    async fn check(&self) -> Result<HealthResult, String> {
        (self.check_fn)().await
    }

    fn description(&self) -> &str {
        "closure probe"
    }
}
