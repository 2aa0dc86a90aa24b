//! Configuration for the monitoring engine

use std::path::PathBuf;
use std::time::Duration;

use lookout_alert::DefaultRuleThresholds;
use serde::{Deserialize, Serialize};

/// Seconds in a retention day.
pub const SECS_PER_DAY: u64 = 86_400;

/// Main engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Storage configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// Check scheduling and retention
    #[serde(default)]
    pub monitoring: MonitoringConfig,

    /// Alert rules and notification routing
    #[serde(default)]
    pub alerting: AlertingConfig,

    /// Wrapped data tools to health-check
    #[serde(default = "default_integrations")]
    pub integrations: Vec<IntegrationConfig>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root directory for alert records, logs and exports
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

impl StorageConfig {
    /// Alert records and daily notification logs
    pub fn alerts_dir(&self) -> PathBuf {
        self.data_dir.join("alerts")
    }

    /// Metric exports
    pub fn metrics_dir(&self) -> PathBuf {
        self.data_dir.join("metrics")
    }
}

/// Check scheduling and retention
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    /// Health check cycle interval in seconds
    #[serde(default = "default_health_interval")]
    pub health_check_interval_secs: u64,

    /// Retention sweep interval in seconds
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_secs: u64,

    /// Age after which persisted artifacts are removed
    #[serde(default = "default_retention_days")]
    pub retention_days: u64,

    /// Metrics buffer capacity
    #[serde(default = "default_metrics_capacity")]
    pub metrics_capacity: usize,

    /// Timeout for built-in checks in milliseconds
    #[serde(default = "default_check_timeout")]
    pub check_timeout_ms: u64,

    /// Event channel capacity
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            health_check_interval_secs: default_health_interval(),
            cleanup_interval_secs: default_cleanup_interval(),
            retention_days: default_retention_days(),
            metrics_capacity: default_metrics_capacity(),
            check_timeout_ms: default_check_timeout(),
            event_capacity: default_event_capacity(),
        }
    }
}

impl MonitoringConfig {
    pub fn health_check_interval(&self) -> Duration {
        Duration::from_secs(self.health_check_interval_secs.max(1))
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs.max(1))
    }

    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_days.saturating_mul(SECS_PER_DAY))
    }

    pub fn check_timeout(&self) -> Duration {
        Duration::from_millis(self.check_timeout_ms)
    }
}

/// Alert rules and notification routing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertingConfig {
    /// Thresholds for the built-in rules
    #[serde(default)]
    pub thresholds: DefaultRuleThresholds,

    /// Channels the built-in rules notify
    #[serde(default = "default_channels")]
    pub default_channels: Vec<String>,

    /// Endpoint for the webhook channel
    #[serde(default)]
    pub webhook_url: Option<String>,
}

impl Default for AlertingConfig {
    fn default() -> Self {
        Self {
            thresholds: DefaultRuleThresholds::default(),
            default_channels: default_channels(),
            webhook_url: None,
        }
    }
}

/// A wrapped data tool probed by running a command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrationConfig {
    pub name: String,

    #[serde(default)]
    pub enabled: bool,

    /// Program and arguments; healthy when it exits successfully
    #[serde(default)]
    pub command: Vec<String>,

    /// Overrides `monitoring.check_timeout_ms`
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

impl IntegrationConfig {
    fn disabled(name: &str, command: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            enabled: false,
            command: command.iter().map(|s| s.to_string()).collect(),
            timeout_ms: None,
        }
    }

    /// Id of the health check registered for this integration
    pub fn check_id(&self) -> String {
        format!("integration.{}", self.name)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// JSON format
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// Default value helpers
fn default_data_dir() -> PathBuf {
    PathBuf::from("./.lookout")
}

fn default_health_interval() -> u64 {
    30
}

fn default_cleanup_interval() -> u64 {
    3600
}

fn default_retention_days() -> u64 {
    7
}

fn default_metrics_capacity() -> usize {
    lookout_metrics::DEFAULT_CAPACITY
}

fn default_check_timeout() -> u64 {
    5000
}

fn default_event_capacity() -> usize {
    1024
}

fn default_channels() -> Vec<String> {
    vec!["console".to_string(), "file".to_string()]
}

fn default_integrations() -> Vec<IntegrationConfig> {
    vec![
        IntegrationConfig::disabled("duckdb", &["duckdb", "--version"]),
        IntegrationConfig::disabled("dbt", &["dbt", "--version"]),
        IntegrationConfig::disabled("dagster", &["dagster", "--version"]),
        IntegrationConfig::disabled("pyairbyte", &["python3", "-c", "import airbyte"]),
    ]
}

fn default_log_level() -> String {
    "info".to_string()
}

impl EngineConfig {
    /// Load configuration: defaults, then an optional file, then `LOOKOUT_*`
    /// environment variables (`__` separates nested keys, e.g.
    /// `LOOKOUT_MONITORING__RETENTION_DAYS=3`).
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        // Add default configuration
        builder = builder.add_source(config::Config::try_from(&EngineConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("LOOKOUT")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }

    /// Configuration rooted at a specific data directory
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            storage: StorageConfig {
                data_dir: data_dir.into(),
            },
            ..Default::default()
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            monitoring: MonitoringConfig::default(),
            alerting: AlertingConfig::default(),
            integrations: default_integrations(),
            logging: LoggingConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.storage.data_dir, PathBuf::from("./.lookout"));
        assert_eq!(config.storage.alerts_dir(), PathBuf::from("./.lookout/alerts"));
        assert_eq!(config.monitoring.health_check_interval(), Duration::from_secs(30));
        assert_eq!(config.monitoring.retention(), Duration::from_secs(7 * 86_400));
        assert_eq!(config.alerting.default_channels, vec!["console", "file"]);
        assert!(config.alerting.webhook_url.is_none());
    }

    #[test]
    fn test_integrations_disabled_by_default() {
        let config = EngineConfig::default();
        let names: Vec<_> = config.integrations.iter().map(|i| i.name.as_str()).collect();

        assert_eq!(names, vec!["duckdb", "dbt", "dagster", "pyairbyte"]);
        assert!(config.integrations.iter().all(|i| !i.enabled));
        assert_eq!(config.integrations[0].check_id(), "integration.duckdb");
    }

    #[test]
    fn test_huge_retention_saturates() {
        let monitoring = MonitoringConfig {
            retention_days: u64::MAX,
            ..Default::default()
        };
        assert_eq!(monitoring.retention(), Duration::from_secs(u64::MAX));
    }

    #[test]
    fn test_zero_intervals_are_clamped() {
        let monitoring = MonitoringConfig {
            health_check_interval_secs: 0,
            cleanup_interval_secs: 0,
            ..Default::default()
        };
        assert_eq!(monitoring.health_check_interval(), Duration::from_secs(1));
        assert_eq!(monitoring.cleanup_interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lookout.toml");
        std::fs::write(
            &path,
            r#"
[storage]
data_dir = "/var/lib/lookout"

[monitoring]
retention_days = 3

[alerting]
default_channels = ["file", "webhook"]
webhook_url = "http://localhost:9000/hooks/alerts"

[alerting.thresholds]
error_rate = 0.1
"#,
        )
        .unwrap();

        let config = EngineConfig::load(path.to_str()).unwrap();

        assert_eq!(config.storage.data_dir, PathBuf::from("/var/lib/lookout"));
        assert_eq!(config.monitoring.retention_days, 3);
        assert_eq!(config.monitoring.health_check_interval_secs, 30);
        assert_eq!(config.alerting.default_channels, vec!["file", "webhook"]);
        assert_eq!(config.alerting.thresholds.error_rate, 0.1);
        assert_eq!(config.alerting.thresholds.sample_size, 10);
        assert_eq!(
            config.alerting.webhook_url.as_deref(),
            Some("http://localhost:9000/hooks/alerts")
        );
    }
}
