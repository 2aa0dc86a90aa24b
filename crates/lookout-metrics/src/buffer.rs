//! Fixed-capacity FIFO metric buffer.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use lookout_types::{EventBus, Metric, MetricValue, MonitorEvent, SharedClock, SystemClock, Tags};
use parking_lot::RwLock;
use tracing::trace;

/// Capacity used when none is configured.
pub const DEFAULT_CAPACITY: usize = 100;

/// Bounded, append-only metric buffer.
///
/// Recording the `capacity + 1`th sample evicts the oldest one. Insertion
/// order is the only ordering guarantee. Safe to share across threads.
#[derive(Debug)]
pub struct MetricsBuffer {
    capacity: usize,
    samples: RwLock<VecDeque<Metric>>,
    clock: SharedClock,
    events: Option<EventBus>,
    total_recorded: AtomicU64,
    evicted: AtomicU64,
}

impl MetricsBuffer {
    /// Create a buffer holding at most `capacity` samples (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            samples: RwLock::new(VecDeque::with_capacity(capacity)),
            clock: SystemClock::shared(),
            events: None,
            total_recorded: AtomicU64::new(0),
            evicted: AtomicU64::new(0),
        }
    }

    /// Use a specific clock for timestamps.
    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    /// Publish `metric.recorded` events on `events`.
    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    /// Append a sample and return it.
    ///
    /// A blank `metric_type` is recorded as `custom`. Never fails.
    pub fn record(
        &self,
        name: impl Into<String>,
        value: impl Into<MetricValue>,
        metric_type: &str,
        tags: Tags,
    ) -> Metric {
        let metric = Metric::new(name, value, metric_type, tags, self.clock.now());

        {
            let mut samples = self.samples.write();
            while samples.len() >= self.capacity {
                samples.pop_front();
                self.evicted.fetch_add(1, Ordering::Relaxed);
            }
            samples.push_back(metric.clone());
        }
        self.total_recorded.fetch_add(1, Ordering::Relaxed);

        trace!(name = %metric.name, metric_type = %metric.metric_type, "Metric recorded");

        if let Some(events) = &self.events {
            events.publish(MonitorEvent::MetricRecorded(metric.clone()));
        }

        metric
    }

    /// Append a sample with no tags.
    pub fn record_value(
        &self,
        name: impl Into<String>,
        value: impl Into<MetricValue>,
        metric_type: &str,
    ) -> Metric {
        self.record(name, value, metric_type, Tags::new())
    }

    /// Snapshot of every buffered sample, oldest first.
    pub fn window(&self) -> Vec<Metric> {
        self.samples.read().iter().cloned().collect()
    }

    /// Snapshot of buffered samples matching `predicate`, oldest first.
    pub fn window_filtered<P>(&self, predicate: P) -> Vec<Metric>
    where
        P: Fn(&Metric) -> bool,
    {
        self.samples
            .read()
            .iter()
            .filter(|m| predicate(m))
            .cloned()
            .collect()
    }

    /// The most recent `count` samples, oldest first.
    pub fn latest(&self, count: usize) -> Vec<Metric> {
        let samples = self.samples.read();
        let skip = samples.len().saturating_sub(count);
        samples.iter().skip(skip).cloned().collect()
    }

    /// Number of buffered samples.
    pub fn size(&self) -> usize {
        self.samples.read().len()
    }

    /// Whether the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.samples.read().is_empty()
    }

    /// Configured capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Samples recorded since creation, including evicted ones.
    pub fn total_recorded(&self) -> u64 {
        self.total_recorded.load(Ordering::Relaxed)
    }

    /// Samples evicted to make room.
    pub fn evicted(&self) -> u64 {
        self.evicted.load(Ordering::Relaxed)
    }

    /// Drop every buffered sample.
    pub fn clear(&self) {
        self.samples.write().clear();
    }
}

impl Default for MetricsBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
