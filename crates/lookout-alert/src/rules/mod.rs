//! Built-in alert rules.
//!
//! [`default_rules`] returns the rule set registered by the engine at
//! initialization: component failure, high error rate, performance
//! degradation and data quality degradation.

mod component_failure;
mod mean_threshold;

pub use component_failure::ComponentFailureCondition;
pub use mean_threshold::{CompareOp, MeanThresholdCondition};

use std::sync::Arc;
use std::time::Duration;

use lookout_types::{metric_types, Severity};
use serde::{Deserialize, Serialize};

use crate::engine::RuleSpec;

pub const COMPONENT_FAILURE: &str = "component-failure";
pub const HIGH_ERROR_RATE: &str = "high-error-rate";
pub const PERFORMANCE_DEGRADATION: &str = "performance-degradation";
pub const DATA_QUALITY_DEGRADATION: &str = "data-quality-degradation";

/// Thresholds for the built-in rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultRuleThresholds {
    /// Mean error rate above which `high-error-rate` fires (fraction).
    pub error_rate: f64,

    /// Mean response time above which `performance-degradation` fires.
    pub response_time_ms: f64,

    /// Mean quality score below which `data-quality-degradation` fires.
    pub quality_score: f64,

    /// Number of most recent samples averaged by the mean rules.
    pub sample_size: usize,
}

impl Default for DefaultRuleThresholds {
    fn default() -> Self {
        Self {
            error_rate: 0.05,
            response_time_ms: 5000.0,
            quality_score: 0.8,
            sample_size: 10,
        }
    }
}

/// The built-in rules, keyed by rule id, in registration order.
pub fn default_rules(thresholds: &DefaultRuleThresholds, channels: &[String]) -> Vec<(String, RuleSpec)> {
    let mean = |metric_name: &str, metric_type: &str, operator, threshold| {
        Arc::new(MeanThresholdCondition {
            metric_name: metric_name.to_string(),
            metric_type: metric_type.to_string(),
            operator,
            threshold,
            sample_size: thresholds.sample_size,
        })
    };

    vec![
        (
            COMPONENT_FAILURE.to_string(),
            RuleSpec::new("Component Failure", Arc::new(ComponentFailureCondition), Severity::Critical)
                .with_cooldown(Duration::from_secs(5 * 60)),
        ),
        (
            HIGH_ERROR_RATE.to_string(),
            RuleSpec::new(
                "High Error Rate",
                mean("error_rate", metric_types::ERROR_RATE, CompareOp::GreaterThan, thresholds.error_rate),
                Severity::Warning,
            )
            .with_cooldown(Duration::from_secs(10 * 60)),
        ),
        (
            PERFORMANCE_DEGRADATION.to_string(),
            RuleSpec::new(
                "Performance Degradation",
                mean(
                    "response_time",
                    metric_types::PERFORMANCE,
                    CompareOp::GreaterThan,
                    thresholds.response_time_ms,
                ),
                Severity::Warning,
            )
            .with_cooldown(Duration::from_secs(15 * 60)),
        ),
        (
            DATA_QUALITY_DEGRADATION.to_string(),
            RuleSpec::new(
                "Data Quality Degradation",
                mean(
                    "quality_score",
                    metric_types::DATA_QUALITY,
                    CompareOp::LessThan,
                    thresholds.quality_score,
                ),
                Severity::Warning,
            )
            .with_cooldown(Duration::from_secs(30 * 60)),
        ),
    ]
    .into_iter()
    .map(|(id, spec)| (id, spec.with_channels(channels.iter().cloned())))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::AlertRuleEngine;
    use chrono::Utc;
    use lookout_types::{Metric, Tags};

    fn engine_with_defaults() -> AlertRuleEngine {
        let mut engine = AlertRuleEngine::new();
        let channels = vec!["console".to_string(), "file".to_string()];
        for (id, spec) in default_rules(&DefaultRuleThresholds::default(), &channels) {
            engine.register_rule(id, spec);
        }
        engine
    }

    fn sample(name: &str, value: f64, metric_type: &str) -> Metric {
        Metric::new(name, value, metric_type, Tags::new(), Utc::now())
    }

    #[test]
    fn test_default_rule_set() {
        let engine = engine_with_defaults();
        let rules = engine.rules();

        let ids: Vec<_> = rules.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![COMPONENT_FAILURE, HIGH_ERROR_RATE, PERFORMANCE_DEGRADATION, DATA_QUALITY_DEGRADATION]
        );
        assert_eq!(rules[0].severity, Severity::Critical);
        assert_eq!(rules[3].cooldown, Duration::from_secs(1800));
        assert!(rules.iter().all(|r| r.notification_channels == vec!["console", "file"]));
    }

    #[test]
    fn test_high_error_rate_scenario() {
        let mut engine = engine_with_defaults();
        let metrics = vec![
            sample("error_rate", 0.1, metric_types::ERROR_RATE),
            sample("error_rate", 0.08, metric_types::ERROR_RATE),
        ];

        let report = engine.evaluate_all(&metrics, &[]);

        assert_eq!(report.triggered.len(), 1);
        let alert = &report.triggered[0];
        assert_eq!(alert.rule_name, "High Error Rate");
        assert_eq!(alert.severity, Severity::Warning);
        assert!(report.failures.is_empty());
    }

    #[test]
    fn test_healthy_metrics_stay_quiet() {
        let mut engine = engine_with_defaults();
        let metrics = vec![
            sample("error_rate", 0.01, metric_types::ERROR_RATE),
            sample("response_time", 120.0, metric_types::PERFORMANCE),
            sample("quality_score", 0.97, metric_types::DATA_QUALITY),
        ];

        assert!(engine.evaluate_all(&metrics, &[]).is_quiet());
    }
}
