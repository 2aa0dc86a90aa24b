use std::io::Write;

use async_trait::async_trait;
use lookout_types::Alert;

use super::{NotificationChannel, CONSOLE};
use crate::error::Result;

/// One-line human-readable rendering of an alert.
pub fn format_alert_line(alert: &Alert) -> String {
    format!(
        "{} [{}] {}: {} ({})",
        alert.timestamp.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        alert.severity.to_string().to_uppercase(),
        alert.rule_name,
        alert.message,
        alert.id
    )
}

/// Writes alerts to standard output.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleChannel;

#[async_trait]
impl NotificationChannel for ConsoleChannel {
    fn name(&self) -> &str {
        CONSOLE
    }

    async fn send(&self, alert: &Alert) -> Result<()> {
        writeln!(std::io::stdout(), "{}", format_alert_line(alert))?;
        Ok(())
    }
}
