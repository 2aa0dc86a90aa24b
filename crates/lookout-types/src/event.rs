//! Observable engine events.

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;

use crate::{Alert, Component, Metric};

/// Events emitted by the monitoring engine.
#[derive(Debug, Clone)]
pub enum MonitorEvent {
    /// A component was registered (or re-registered).
    ComponentRegistered(Component),

    /// A metric was appended to the buffer.
    MetricRecorded(Metric),

    /// A rule fired outside its cooldown.
    AlertTriggered(Alert),

    /// A previously active alert's condition evaluated false.
    AlertResolved(Alert),

    /// Periodic ticking started.
    MonitoringStarted { at: DateTime<Utc> },

    /// Periodic ticking stopped.
    MonitoringStopped { at: DateTime<Utc> },
}

impl MonitorEvent {
    /// Dotted event name.
    pub fn event_name(&self) -> &'static str {
        match self {
            MonitorEvent::ComponentRegistered(_) => "component.registered",
            MonitorEvent::MetricRecorded(_) => "metric.recorded",
            MonitorEvent::AlertTriggered(_) => "alert.triggered",
            MonitorEvent::AlertResolved(_) => "alert.resolved",
            MonitorEvent::MonitoringStarted { .. } => "monitoring.started",
            MonitorEvent::MonitoringStopped { .. } => "monitoring.stopped",
        }
    }
}

/// Broadcast fan-out of [`MonitorEvent`]s.
///
/// Subscribers observe every event published after they subscribed. Slow
/// subscribers that fall more than `capacity` events behind see a lag error
/// from their receiver rather than blocking publishers.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<MonitorEvent>,
}

impl EventBus {
    /// Create a bus retaining up to `capacity` undelivered events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Subscribe to subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> {
        self.tx.subscribe()
    }

    /// Publish an event; having no subscribers is not an error.
    pub fn publish(&self, event: MonitorEvent) {
        let _ = self.tx.send(event);
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ComponentSpec;

    #[tokio::test]
    async fn test_subscriber_sees_later_events() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        let component = Component::from_spec("duckdb", ComponentSpec::new("DuckDB", "database"));
        bus.publish(MonitorEvent::ComponentRegistered(component));

        let event = rx.recv().await.unwrap();
        assert_eq!(event.event_name(), "component.registered");
    }

    #[test]
    fn test_publish_without_subscribers() {
        let bus = EventBus::default();
        bus.publish(MonitorEvent::MonitoringStarted { at: Utc::now() });
        assert_eq!(bus.subscriber_count(), 0);
    }
}
