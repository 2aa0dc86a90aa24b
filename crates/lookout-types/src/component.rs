//! Logical components of the monitored data stack.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Health status of a component.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    /// No linked check has completed yet.
    #[default]
    Unknown,
    /// Last linked check reported healthy.
    Healthy,
    /// Last linked check failed or timed out.
    Unhealthy,
}

impl ComponentStatus {
    /// Status implied by a check outcome.
    pub fn from_healthy(healthy: bool) -> Self {
        if healthy {
            ComponentStatus::Healthy
        } else {
            ComponentStatus::Unhealthy
        }
    }
}

impl fmt::Display for ComponentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComponentStatus::Unknown => write!(f, "unknown"),
            ComponentStatus::Healthy => write!(f, "healthy"),
            ComponentStatus::Unhealthy => write!(f, "unhealthy"),
        }
    }
}

/// Registration metadata for a component.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentSpec {
    /// Display name.
    pub name: String,

    /// Free-form type tag (e.g. `database`, `orchestrator`, `integration`).
    #[serde(rename = "type")]
    pub component_type: String,

    /// Ids of components this one depends on.
    #[serde(default)]
    pub dependencies: BTreeSet<String>,

    /// Health check whose results drive this component's status.
    #[serde(default)]
    pub health_check_id: Option<String>,
}

impl ComponentSpec {
    /// Create a spec with no dependencies and no linked check.
    pub fn new(name: impl Into<String>, component_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            component_type: component_type.into(),
            dependencies: BTreeSet::new(),
            health_check_id: None,
        }
    }

    /// Declare a dependency on another component.
    pub fn depends_on(mut self, component_id: impl Into<String>) -> Self {
        self.dependencies.insert(component_id.into());
        self
    }

    /// Link the component to a health check.
    pub fn with_health_check(mut self, check_id: impl Into<String>) -> Self {
        self.health_check_id = Some(check_id.into());
        self
    }
}

/// A registered component and its derived health.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    /// Unique id.
    pub id: String,

    /// Display name.
    pub name: String,

    /// Free-form type tag.
    #[serde(rename = "type")]
    pub component_type: String,

    /// Ids of components this one depends on.
    pub dependencies: BTreeSet<String>,

    /// Linked health check, if any.
    pub health_check_id: Option<String>,

    /// Current derived status.
    pub status: ComponentStatus,

    /// When a linked check last completed.
    pub last_seen: Option<DateTime<Utc>>,
}

impl Component {
    /// Build a fresh component from its spec.
    pub fn from_spec(id: impl Into<String>, spec: ComponentSpec) -> Self {
        Self {
            id: id.into(),
            name: spec.name,
            component_type: spec.component_type,
            dependencies: spec.dependencies,
            health_check_id: spec.health_check_id,
            status: ComponentStatus::Unknown,
            last_seen: None,
        }
    }

    /// Whether the component is currently healthy.
    pub fn is_healthy(&self) -> bool {
        self.status == ComponentStatus::Healthy
    }
}

/// Component counts grouped by status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub total: usize,
    pub healthy: usize,
    pub unhealthy: usize,
    pub unknown: usize,
}

impl StatusCounts {
    /// Tally a set of components.
    pub fn from_components<'a>(components: impl IntoIterator<Item = &'a Component>) -> Self {
        let mut counts = Self::default();
        for component in components {
            counts.total += 1;
            match component.status {
                ComponentStatus::Healthy => counts.healthy += 1,
                ComponentStatus::Unhealthy => counts.unhealthy += 1,
                ComponentStatus::Unknown => counts.unknown += 1,
            }
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_builder() {
        let spec = ComponentSpec::new("DuckDB", "database")
            .depends_on("storage")
            .with_health_check("duckdb-ping");

        assert!(spec.dependencies.contains("storage"));
        assert_eq!(spec.health_check_id.as_deref(), Some("duckdb-ping"));

        let component = Component::from_spec("duckdb", spec);
        assert_eq!(component.status, ComponentStatus::Unknown);
        assert!(component.last_seen.is_none());
    }

    #[test]
    fn test_status_counts() {
        let mut healthy = Component::from_spec("a", ComponentSpec::new("A", "t"));
        healthy.status = ComponentStatus::Healthy;
        let mut unhealthy = Component::from_spec("b", ComponentSpec::new("B", "t"));
        unhealthy.status = ComponentStatus::Unhealthy;
        let unknown = Component::from_spec("c", ComponentSpec::new("C", "t"));

        let counts = StatusCounts::from_components([&healthy, &unhealthy, &unknown]);
        assert_eq!(counts.total, 3);
        assert_eq!(counts.healthy, 1);
        assert_eq!(counts.unhealthy, 1);
        assert_eq!(counts.unknown, 1);
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&ComponentStatus::Unhealthy).unwrap();
        assert_eq!(json, "\"unhealthy\"");
    }
}
