//! Notification channels.

mod console;
mod file;
mod webhook;

pub use console::{format_alert_line, ConsoleChannel};
pub use file::FileChannel;
pub use webhook::WebhookChannel;

use async_trait::async_trait;
use lookout_types::Alert;

use crate::error::Result;

pub const CONSOLE: &str = "console";
pub const FILE: &str = "file";
pub const WEBHOOK: &str = "webhook";

/// A delivery strategy for alerts.
///
/// Channels do not retry; a failed `send` is logged by the dispatcher and
/// does not affect other channels or persistence.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    /// Name alerts use to route to this channel.
    fn name(&self) -> &str;

    /// Deliver one alert.
    async fn send(&self, alert: &Alert) -> Result<()>;
}
