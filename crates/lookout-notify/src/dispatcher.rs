//! Alert dispatch.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use futures::future::join_all;
use lookout_types::Alert;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::channels::{ConsoleChannel, FileChannel, NotificationChannel, WebhookChannel};
use crate::error::{NotifyError, Result};
use crate::store::AlertStore;

/// Result of sending an alert to one channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DeliveryOutcome {
    Delivered,
    UnknownChannel,
    Failed { reason: String },
}

impl DeliveryOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, DeliveryOutcome::Delivered)
    }
}

/// Result of dispatching one alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchReport {
    pub alert_id: String,

    /// Whether this dispatch wrote the alert record. `false` if it already
    /// existed or the write failed.
    pub persisted: bool,

    /// Per-channel outcome, in the alert's channel order.
    pub deliveries: Vec<(String, DeliveryOutcome)>,
}

/// Routes alerts to named channels and records them durably.
pub struct NotificationDispatcher {
    channels: BTreeMap<String, Arc<dyn NotificationChannel>>,
    store: AlertStore,
}

impl NotificationDispatcher {
    /// Dispatcher with no channels, persisting into `store`.
    pub fn new(store: AlertStore) -> Self {
        Self {
            channels: BTreeMap::new(),
            store,
        }
    }

    /// Dispatcher with the `console`, `file` and `webhook` channels.
    ///
    /// Alert records and the daily logs share `alerts_dir`.
    pub fn with_defaults(alerts_dir: impl Into<PathBuf>, webhook_url: Option<String>) -> Self {
        let alerts_dir = alerts_dir.into();
        let mut dispatcher = Self::new(AlertStore::new(alerts_dir.clone()));
        dispatcher.register_channel(Arc::new(ConsoleChannel));
        dispatcher.register_channel(Arc::new(FileChannel::new(alerts_dir)));
        dispatcher.register_channel(Arc::new(WebhookChannel::new(webhook_url)));
        dispatcher
    }

    /// Add a channel, replacing any channel with the same name.
    pub fn register_channel(&mut self, channel: Arc<dyn NotificationChannel>) {
        self.channels.insert(channel.name().to_string(), channel);
    }

    pub fn channel_names(&self) -> Vec<String> {
        self.channels.keys().cloned().collect()
    }

    pub fn store(&self) -> &AlertStore {
        &self.store
    }

    /// Send an alert to one channel. Never fails; problems are logged and
    /// reported in the outcome.
    pub async fn send(&self, channel: &str, alert: &Alert) -> DeliveryOutcome {
        let Some(target) = self.channels.get(channel) else {
            let error = NotifyError::UnknownChannel(channel.to_string());
            warn!(alert_id = %alert.id, channel, error = %error, "Unknown notification channel");
            return DeliveryOutcome::UnknownChannel;
        };

        match target.send(alert).await {
            Ok(()) => {
                debug!(alert_id = %alert.id, channel, "Notification delivered");
                DeliveryOutcome::Delivered
            }
            Err(e) => {
                warn!(alert_id = %alert.id, channel, error = %e, "Notification delivery failed");
                DeliveryOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Record an alert. Returns `false` when it was already recorded.
    pub async fn persist(&self, alert: &Alert) -> Result<bool> {
        self.store.persist(alert).await
    }

    /// Persist an alert, then send it to each of its channels concurrently.
    ///
    /// A persistence failure is logged and does not stop delivery; a channel
    /// failure does not affect the others.
    pub async fn dispatch(&self, alert: &Alert) -> DispatchReport {
        let persisted = match self.persist(alert).await {
            Ok(written) => written,
            Err(e) => {
                error!(alert_id = %alert.id, error = %e, "Failed to persist alert");
                false
            }
        };

        let outcomes = join_all(alert.channels.iter().map(|channel| self.send(channel, alert))).await;

        DispatchReport {
            alert_id: alert.id.clone(),
            persisted,
            deliveries: alert.channels.iter().cloned().zip(outcomes).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use lookout_types::Severity;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingChannel {
        sent: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl NotificationChannel for RecordingChannel {
        fn name(&self) -> &str {
            "recording"
        }

        async fn send(&self, alert: &Alert) -> Result<()> {
            self.sent.lock().push(alert.id.clone());
            Ok(())
        }
    }

    struct BrokenChannel;

    #[async_trait]
    impl NotificationChannel for BrokenChannel {
        fn name(&self) -> &str {
            "broken"
        }

        async fn send(&self, _alert: &Alert) -> Result<()> {
            Err(NotifyError::delivery("broken", "smtp relay refused"))
        }
    }

    fn alert(channels: &[&str]) -> Alert {
        Alert::new("component-failure", "Component Failure", Severity::Critical, Utc::now())
            .with_channels(channels.iter().map(|c| c.to_string()).collect())
    }

    #[tokio::test]
    async fn test_dispatch_isolates_channel_failures() {
        let dir = tempfile::tempdir().unwrap();
        let recording = Arc::new(RecordingChannel::default());
        let mut dispatcher = NotificationDispatcher::new(AlertStore::new(dir.path()));
        dispatcher.register_channel(recording.clone());
        dispatcher.register_channel(Arc::new(BrokenChannel));

        let alert = alert(&["broken", "pager", "recording"]);
        let report = dispatcher.dispatch(&alert).await;

        assert!(report.persisted);
        assert_eq!(report.deliveries.len(), 3);
        assert!(matches!(report.deliveries[0].1, DeliveryOutcome::Failed { .. }));
        assert_eq!(report.deliveries[1], ("pager".to_string(), DeliveryOutcome::UnknownChannel));
        assert!(report.deliveries[2].1.is_delivered());
        assert_eq!(*recording.sent.lock(), vec![alert.id.clone()]);
    }

    #[tokio::test]
    async fn test_dispatch_persists_exactly_once() {
        let dir = tempfile::tempdir().unwrap();
        let dispatcher = NotificationDispatcher::new(AlertStore::new(dir.path()));
        let alert = alert(&[]);

        assert!(dispatcher.dispatch(&alert).await.persisted);
        assert!(!dispatcher.dispatch(&alert).await.persisted);
        assert_eq!(dispatcher.store().load_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_persist_failure_does_not_block_delivery() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"").unwrap();

        let recording = Arc::new(RecordingChannel::default());
        let mut dispatcher = NotificationDispatcher::new(AlertStore::new(blocker));
        dispatcher.register_channel(recording.clone());

        let report = dispatcher.dispatch(&alert(&["recording"])).await;

        assert!(!report.persisted);
        assert!(report.deliveries[0].1.is_delivered());
    }

    #[tokio::test]
    async fn test_default_channels() {
        let dir = tempfile::tempdir().unwrap();
        let dispatcher = NotificationDispatcher::with_defaults(dir.path(), None);

        assert_eq!(dispatcher.channel_names(), vec!["console", "file", "webhook"]);

        let report = dispatcher.dispatch(&alert(&["file", "webhook"])).await;
        assert!(report.deliveries.iter().all(|(_, o)| o.is_delivered()));

        let day = Utc::now().date_naive().format("%Y-%m-%d").to_string();
        let log = dir.path().join(format!("alerts-{}.log", day));
        let records = std::fs::read_dir(dir.path())
            .unwrap()
            .filter(|e| e.as_ref().unwrap().file_name().to_string_lossy().starts_with("alert-"))
            .count();

        assert!(log.exists());
        assert_eq!(records, 1);
    }

    #[tokio::test]
    async fn test_send_unknown_channel() {
        let dir = tempfile::tempdir().unwrap();
        let dispatcher = NotificationDispatcher::new(AlertStore::new(dir.path()));

        let outcome = dispatcher.send("sms", &alert(&["sms"])).await;
        assert_eq!(outcome, DeliveryOutcome::UnknownChannel);
    }
}
