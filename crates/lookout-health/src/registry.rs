//! Registry of logical components.
//!
//! Components are created on registration and only ever mutated by the
//! scheduler when a linked check completes. Reads hand out snapshots.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use lookout_types::{Component, ComponentSpec, ComponentStatus, EventBus, MonitorEvent, StatusCounts};
use tracing::{debug, info};

/// Concurrent component registry.
#[derive(Debug, Default)]
pub struct ComponentRegistry {
    components: DashMap<String, Component>,
    events: Option<EventBus>,
}

impl ComponentRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish `component.registered` events on `events`.
    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    /// Register a component, or overwrite an existing one's metadata.
    ///
    /// Re-registration keeps the current `status` and `last_seen`.
    pub fn register(&self, id: impl Into<String>, spec: ComponentSpec) -> Component {
        let id = id.into();
        let mut component = Component::from_spec(id.clone(), spec);

        if let Some(existing) = self.components.get(&id) {
            component.status = existing.status;
            component.last_seen = existing.last_seen;
            debug!(component_id = %id, "Re-registering component");
        } else {
            info!(component_id = %id, component_type = %component.component_type, "Registering component");
        }

        self.components.insert(id, component.clone());

        if let Some(events) = &self.events {
            events.publish(MonitorEvent::ComponentRegistered(component.clone()));
        }

        component
    }

    /// Set a component's status. Unknown ids are ignored; returns whether a
    /// component was updated.
    pub fn update_status(&self, id: &str, status: ComponentStatus, at: DateTime<Utc>) -> bool {
        match self.components.get_mut(id) {
            Some(mut component) => {
                if component.status != status {
                    debug!(
                        component_id = %id,
                        old_status = %component.status,
                        new_status = %status,
                        "Component status changed"
                    );
                }
                component.status = status;
                component.last_seen = Some(at);
                true
            }
            None => false,
        }
    }

    /// Update every component linked to `check_id`; returns their ids.
    pub fn update_linked(
        &self,
        check_id: &str,
        status: ComponentStatus,
        at: DateTime<Utc>,
    ) -> Vec<String> {
        let linked: Vec<String> = self
            .components
            .iter()
            .filter(|c| c.health_check_id.as_deref() == Some(check_id))
            .map(|c| c.id.clone())
            .collect();

        linked
            .into_iter()
            .filter(|id| self.update_status(id, status, at))
            .collect()
    }

    /// Look up a component.
    pub fn get(&self, id: &str) -> Option<Component> {
        self.components.get(id).map(|c| c.clone())
    }

    /// Snapshot of every component, ordered by id.
    pub fn snapshot(&self) -> Vec<Component> {
        let mut components: Vec<Component> =
            self.components.iter().map(|c| c.value().clone()).collect();
        components.sort_by(|a, b| a.id.cmp(&b.id));
        components
    }

    /// Ids the component declares as dependencies (empty if unknown).
    pub fn dependencies_of(&self, id: &str) -> Vec<String> {
        self.components
            .get(id)
            .map(|c| c.dependencies.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Ids of components that declare a dependency on `id`, ordered.
    pub fn dependents_of(&self, id: &str) -> Vec<String> {
        let mut dependents: Vec<String> = self
            .components
            .iter()
            .filter(|c| c.dependencies.contains(id))
            .map(|c| c.id.clone())
            .collect();
        dependents.sort();
        dependents
    }

    /// Component counts by status.
    pub fn status_counts(&self) -> StatusCounts {
        StatusCounts::from_components(self.snapshot().iter())
    }

    /// Number of registered components.
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Whether no components are registered.
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Remove every component. Only used on engine reset.
    pub fn clear(&self) {
        self.components.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry_with_lineage() -> ComponentRegistry {
        let registry = ComponentRegistry::new();
        registry.register("storage", ComponentSpec::new("Storage", "filesystem"));
        registry.register(
            "duckdb",
            ComponentSpec::new("DuckDB", "database").depends_on("storage"),
        );
        registry.register(
            "dbt",
            ComponentSpec::new("dbt", "transformation").depends_on("duckdb"),
        );
        registry.register(
            "dagster",
            ComponentSpec::new("Dagster", "orchestrator")
                .depends_on("dbt")
                .depends_on("duckdb"),
        );
        registry
    }

    #[test]
    fn test_reregister_preserves_status() {
        let registry = ComponentRegistry::new();
        registry.register("duckdb", ComponentSpec::new("DuckDB", "database"));

        let at = Utc::now();
        assert!(registry.update_status("duckdb", ComponentStatus::Healthy, at));

        let updated = registry.register(
            "duckdb",
            ComponentSpec::new("DuckDB (local)", "database").with_health_check("duckdb-ping"),
        );

        assert_eq!(updated.name, "DuckDB (local)");
        assert_eq!(updated.status, ComponentStatus::Healthy);
        assert_eq!(updated.last_seen, Some(at));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_update_unknown_is_noop() {
        let registry = ComponentRegistry::new();
        assert!(!registry.update_status("ghost", ComponentStatus::Unhealthy, Utc::now()));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_update_linked() {
        let registry = ComponentRegistry::new();
        registry.register(
            "duckdb",
            ComponentSpec::new("DuckDB", "database").with_health_check("db-ping"),
        );
        registry.register("dbt", ComponentSpec::new("dbt", "transformation"));

        let updated = registry.update_linked("db-ping", ComponentStatus::Unhealthy, Utc::now());

        assert_eq!(updated, vec!["duckdb".to_string()]);
        assert_eq!(registry.get("duckdb").unwrap().status, ComponentStatus::Unhealthy);
        assert_eq!(registry.get("dbt").unwrap().status, ComponentStatus::Unknown);
    }

    #[test]
    fn test_lineage_queries() {
        let registry = registry_with_lineage();

        assert_eq!(registry.dependencies_of("dagster"), vec!["dbt", "duckdb"]);
        assert_eq!(registry.dependents_of("duckdb"), vec!["dagster", "dbt"]);
        assert!(registry.dependents_of("dagster").is_empty());
        assert!(registry.dependencies_of("unknown").is_empty());
    }

    #[test]
    fn test_snapshot_ordered_and_counts() {
        let registry = registry_with_lineage();
        registry.update_status("storage", ComponentStatus::Healthy, Utc::now());
        registry.update_status("dbt", ComponentStatus::Unhealthy, Utc::now());

        let ids: Vec<_> = registry.snapshot().into_iter().map(|c| c.id).collect();
        assert_eq!(ids, vec!["dagster", "dbt", "duckdb", "storage"]);

        let counts = registry.status_counts();
        assert_eq!(counts.total, 4);
        assert_eq!(counts.healthy, 1);
        assert_eq!(counts.unhealthy, 1);
        assert_eq!(counts.unknown, 2);
    }

    #[tokio::test]
    async fn test_register_emits_event() {
        let events = EventBus::new(4);
        let mut rx = events.subscribe();
        let registry = ComponentRegistry::new().with_events(events);

        registry.register("duckdb", ComponentSpec::new("DuckDB", "database"));

        match rx.recv().await.unwrap() {
            MonitorEvent::ComponentRegistered(c) => assert_eq!(c.id, "duckdb"),
            other => panic!("unexpected event: {}", other.event_name()),
        }
    }
}
