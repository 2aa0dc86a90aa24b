//! Alert conditions.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use lookout_types::{Component, Details, Metric};

/// What a condition can see during one evaluation pass.
#[derive(Debug, Clone, Copy)]
pub struct EvaluationContext<'a> {
    /// The metrics window, oldest first.
    pub metrics: &'a [Metric],

    /// Component snapshot taken for this pass.
    pub components: &'a [Component],

    /// Evaluation instant.
    pub now: DateTime<Utc>,
}

impl<'a> EvaluationContext<'a> {
    pub fn new(metrics: &'a [Metric], components: &'a [Component], now: DateTime<Utc>) -> Self {
        Self {
            metrics,
            components,
            now,
        }
    }
}

/// A pure predicate over the metrics window.
///
/// Returning `Err` (or panicking) marks the rule as failed for this pass; it
/// never triggers an alert and never affects other rules.
pub trait AlertCondition: Send + Sync {
    /// Whether the rule should fire.
    fn evaluate(&self, ctx: &EvaluationContext<'_>) -> Result<bool, String>;

    /// Details attached to the alert when the condition fires.
    fn details(&self, _ctx: &EvaluationContext<'_>) -> Option<Details> {
        None
    }
}

/// Adapt an infallible closure over the metrics window into a condition.
pub fn condition_fn<F>(predicate: F) -> Arc<dyn AlertCondition>
where
    F: Fn(&[Metric]) -> bool + Send + Sync + 'static,
{
    try_condition_fn(move |metrics: &[Metric]| Ok(predicate(metrics)))
}

/// Adapt a fallible closure over the metrics window into a condition.
pub fn try_condition_fn<F>(predicate: F) -> Arc<dyn AlertCondition>
where
    F: Fn(&[Metric]) -> Result<bool, String> + Send + Sync + 'static,
{
    Arc::new(FnCondition { predicate })
}

struct FnCondition<F> {
    predicate: F,
}

impl<F> AlertCondition for FnCondition<F>
where
    F: Fn(&[Metric]) -> Result<bool, String> + Send + Sync,
{
    fn evaluate(&self, ctx: &EvaluationContext<'_>) -> Result<bool, String> {
        (self.predicate)(ctx.metrics)
    }
}
