use lookout_types::{Details, Metric};
use serde_json::json;

use crate::condition::{AlertCondition, EvaluationContext};

/// Direction of a threshold comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    GreaterThan,
    LessThan,
}

impl CompareOp {
    fn check(self, value: f64, threshold: f64) -> bool {
        match self {
            Self::GreaterThan => value > threshold,
            Self::LessThan => value < threshold,
        }
    }
}

impl std::fmt::Display for CompareOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::GreaterThan => write!(f, "greater_than"),
            Self::LessThan => write!(f, "less_than"),
        }
    }
}

/// Fires when the mean of the most recent matching samples crosses a
/// threshold.
///
/// A sample matches when its name equals `metric_name` or its type equals
/// `metric_type`. Non-numeric samples are ignored; no samples means no alert.
#[derive(Debug, Clone)]
pub struct MeanThresholdCondition {
    pub metric_name: String,
    pub metric_type: String,
    pub operator: CompareOp,
    pub threshold: f64,

    /// How many of the most recent matching samples are averaged.
    pub sample_size: usize,
}

impl MeanThresholdCondition {
    fn recent_values(&self, metrics: &[Metric]) -> Vec<f64> {
        let mut values: Vec<f64> = metrics
            .iter()
            .rev()
            .filter(|m| m.name == self.metric_name || m.metric_type == self.metric_type)
            .filter_map(|m| m.value.as_f64())
            .take(self.sample_size.max(1))
            .collect();
        values.reverse();
        values
    }

    fn mean(values: &[f64]) -> Option<f64> {
        if values.is_empty() {
            None
        } else {
            Some(values.iter().sum::<f64>() / values.len() as f64)
        }
    }
}

impl AlertCondition for MeanThresholdCondition {
    fn evaluate(&self, ctx: &EvaluationContext<'_>) -> Result<bool, String> {
        Ok(Self::mean(&self.recent_values(ctx.metrics))
            .is_some_and(|mean| self.operator.check(mean, self.threshold)))
    }

    fn details(&self, ctx: &EvaluationContext<'_>) -> Option<Details> {
        let values = self.recent_values(ctx.metrics);
        let mean = Self::mean(&values)?;

        let mut details = Details::new();
        details.insert("metric".into(), json!(self.metric_name));
        details.insert("mean".into(), json!(mean));
        details.insert("operator".into(), json!(self.operator.to_string()));
        details.insert("threshold".into(), json!(self.threshold));
        details.insert("samples".into(), json!(values.len()));
        Some(details)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use lookout_types::{metric_types, HealthResult, Tags};

    fn metric(name: &str, value: f64, metric_type: &str) -> Metric {
        Metric::new(name, value, metric_type, Tags::new(), Utc::now())
    }

    fn latency_rule(sample_size: usize) -> MeanThresholdCondition {
        MeanThresholdCondition {
            metric_name: "response_time".into(),
            metric_type: metric_types::PERFORMANCE.into(),
            operator: CompareOp::GreaterThan,
            threshold: 5000.0,
            sample_size,
        }
    }

    #[test]
    fn test_only_recent_samples_count() {
        let metrics = vec![
            metric("response_time", 20_000.0, metric_types::PERFORMANCE),
            metric("response_time", 100.0, metric_types::PERFORMANCE),
            metric("response_time", 200.0, metric_types::PERFORMANCE),
        ];
        let ctx = EvaluationContext::new(&metrics, &[], Utc::now());

        assert_eq!(latency_rule(10).evaluate(&ctx), Ok(true));
        assert_eq!(latency_rule(2).evaluate(&ctx), Ok(false));
    }

    #[test]
    fn test_matches_by_name_or_type_and_skips_non_numeric() {
        let metrics = vec![
            metric("api_latency", 9000.0, metric_types::PERFORMANCE),
            metric("response_time", 7000.0, metric_types::CUSTOM),
            Metric::new(
                "response_time",
                HealthResult::healthy(),
                metric_types::HEALTH,
                Tags::new(),
                Utc::now(),
            ),
            metric("rows_loaded", 1.0, metric_types::CUSTOM),
        ];
        let ctx = EvaluationContext::new(&metrics, &[], Utc::now());
        let rule = latency_rule(10);

        assert_eq!(rule.evaluate(&ctx), Ok(true));
        let details = rule.details(&ctx).unwrap();
        assert_eq!(details["samples"], 2);
        assert_eq!(details["mean"], 8000.0);
    }

    #[test]
    fn test_no_samples_never_fires() {
        let ctx = EvaluationContext::new(&[], &[], Utc::now());
        let rule = latency_rule(10);

        assert_eq!(rule.evaluate(&ctx), Ok(false));
        assert!(rule.details(&ctx).is_none());
    }

    #[test]
    fn test_less_than() {
        let metrics = vec![metric("quality_score", 0.6, metric_types::DATA_QUALITY)];
        let ctx = EvaluationContext::new(&metrics, &[], Utc::now());
        let rule = MeanThresholdCondition {
            metric_name: "quality_score".into(),
            metric_type: metric_types::DATA_QUALITY.into(),
            operator: CompareOp::LessThan,
            threshold: 0.8,
            sample_size: 10,
        };

        assert_eq!(rule.evaluate(&ctx), Ok(true));
    }
}
