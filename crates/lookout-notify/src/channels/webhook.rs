use std::time::Duration;

use async_trait::async_trait;
use lookout_types::Alert;
use serde_json::json;
use tracing::debug;

use super::{NotificationChannel, WEBHOOK};
use crate::error::{NotifyError, Result};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Posts alerts as JSON to an HTTP endpoint.
///
/// Without a URL the channel accepts alerts and drops them, leaving the
/// transport to whoever wires one up.
#[derive(Debug, Clone)]
pub struct WebhookChannel {
    url: Option<String>,
    client: reqwest::Client,
}

impl WebhookChannel {
    pub fn new(url: Option<String>) -> Self {
        Self {
            url: url.filter(|u| !u.trim().is_empty()),
            client: reqwest::Client::new(),
        }
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    fn render_body(alert: &Alert) -> serde_json::Value {
        json!({
            "alert_id": alert.id,
            "rule_id": alert.rule_id,
            "rule_name": alert.rule_name,
            "severity": alert.severity,
            "message": alert.message,
            "timestamp": alert.timestamp.to_rfc3339(),
            "details": alert.details,
        })
    }
}

#[async_trait]
impl NotificationChannel for WebhookChannel {
    fn name(&self) -> &str {
        WEBHOOK
    }

    async fn send(&self, alert: &Alert) -> Result<()> {
        let Some(url) = &self.url else {
            debug!(alert_id = %alert.id, "No webhook URL configured, skipping delivery");
            return Ok(());
        };

        let response = self
            .client
            .post(url)
            .timeout(REQUEST_TIMEOUT)
            .json(&Self::render_body(alert))
            .send()
            .await
            .map_err(|e| NotifyError::delivery(WEBHOOK, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::delivery(WEBHOOK, format!("endpoint returned {}", status)));
        }

        debug!(alert_id = %alert.id, status = status.as_u16(), "Webhook delivered");
        Ok(())
    }
}
