use std::collections::BTreeMap;

use lookout_types::{Details, Metric};
use serde_json::json;

use crate::condition::{AlertCondition, EvaluationContext};

/// Fires when the most recent health metric of any check reports unhealthy.
///
/// Only the latest sample per check counts, so a check that failed once and
/// has since recovered does not keep the rule firing while the old sample is
/// still buffered.
#[derive(Debug, Clone, Copy, Default)]
pub struct ComponentFailureCondition;

impl ComponentFailureCondition {
    /// Checks whose latest health sample is unhealthy, with their error.
    fn failing_checks(metrics: &[Metric]) -> BTreeMap<&str, Option<&str>> {
        let mut latest = BTreeMap::new();
        for metric in metrics {
            if let Some(result) = metric.value.as_health() {
                let check = metric.tag("check").unwrap_or(metric.name.as_str());
                latest.insert(check, result);
            }
        }

        latest
            .into_iter()
            .filter(|(_, result)| !result.healthy)
            .map(|(check, result)| (check, result.error.as_deref()))
            .collect()
    }
}

impl AlertCondition for ComponentFailureCondition {
    fn evaluate(&self, ctx: &EvaluationContext<'_>) -> Result<bool, String> {
        Ok(!Self::failing_checks(ctx.metrics).is_empty())
    }

    fn details(&self, ctx: &EvaluationContext<'_>) -> Option<Details> {
        let failing = Self::failing_checks(ctx.metrics);
        let unhealthy_components: Vec<&str> = ctx
            .components
            .iter()
            .filter(|c| {
                c.health_check_id
                    .as_deref()
                    .is_some_and(|check| failing.contains_key(check))
            })
            .map(|c| c.id.as_str())
            .collect();

        let mut details = Details::new();
        details.insert("failed_checks".into(), json!(failing));
        details.insert("components".into(), json!(unhealthy_components));
        Some(details)
    }
}
