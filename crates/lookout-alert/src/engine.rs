//! Rule registration and evaluation.

use std::any::Any;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use lookout_types::{Alert, Component, Details, Metric, Severity, SharedClock, SystemClock};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use crate::condition::{AlertCondition, EvaluationContext};
use crate::error::{AlertError, Result};

/// Cooldown used when a spec does not set one.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(300);

/// Registration parameters for a rule.
#[derive(Clone)]
pub struct RuleSpec {
    pub name: String,
    pub condition: Arc<dyn AlertCondition>,
    pub severity: Severity,

    /// Minimum time between two triggers of this rule.
    pub cooldown: Duration,

    pub notification_channels: Vec<String>,
}

impl RuleSpec {
    pub fn new(name: impl Into<String>, condition: Arc<dyn AlertCondition>, severity: Severity) -> Self {
        Self {
            name: name.into(),
            condition,
            severity,
            cooldown: DEFAULT_COOLDOWN,
            notification_channels: Vec::new(),
        }
    }

    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    pub fn with_channels<I, S>(mut self, channels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.notification_channels = channels.into_iter().map(Into::into).collect();
        self
    }
}

impl std::fmt::Debug for RuleSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleSpec")
            .field("name", &self.name)
            .field("severity", &self.severity)
            .field("cooldown", &self.cooldown)
            .field("notification_channels", &self.notification_channels)
            .finish_non_exhaustive()
    }
}

/// Bookkeeping for a registered rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRule {
    pub id: String,
    pub name: String,
    pub severity: Severity,
    pub cooldown: Duration,
    pub notification_channels: Vec<String>,
    pub last_triggered: Option<DateTime<Utc>>,

    /// Passes in which the condition was invoked (cooldown skips excluded).
    pub evaluations: u64,

    /// Passes in which the condition failed or panicked.
    pub failures: u64,
}

impl AlertRule {
    fn in_cooldown(&self, now: DateTime<Utc>) -> bool {
        match self.last_triggered {
            None => false,
            // A negative elapsed time means the clock moved backwards; stay quiet.
            Some(last) => (now - last)
                .to_std()
                .map_or(true, |elapsed| elapsed < self.cooldown),
        }
    }
}

struct RegisteredRule {
    info: AlertRule,
    condition: Arc<dyn AlertCondition>,
}

/// A rule whose condition failed during a pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleFailure {
    pub rule_id: String,
    pub reason: String,
}

/// Outcome of one evaluation pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    /// New alerts, in rule registration order. These are to be dispatched.
    pub triggered: Vec<Alert>,

    /// Previously active alerts whose condition evaluated false.
    pub resolved: Vec<Alert>,

    pub failures: Vec<RuleFailure>,

    /// Rules skipped because they were inside their cooldown.
    pub skipped: Vec<String>,
}

impl EvaluationReport {
    pub fn is_quiet(&self) -> bool {
        self.triggered.is_empty() && self.resolved.is_empty() && self.failures.is_empty()
    }
}

/// Evaluates registered rules against a metrics window.
///
/// Not re-entrant: `evaluate_all` takes `&mut self`, so callers sharing an
/// engine wrap it in a lock.
pub struct AlertRuleEngine {
    rules: Vec<RegisteredRule>,
    active_alerts: HashMap<String, Alert>,
    clock: SharedClock,
}

impl AlertRuleEngine {
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            active_alerts: HashMap::new(),
            clock: SystemClock::shared(),
        }
    }

    /// Use a specific clock for cooldown arithmetic.
    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    /// Register a rule, replacing any previous rule with the same id.
    ///
    /// A replaced rule keeps its position, `last_triggered` and counters, so
    /// re-registration does not reset an ongoing cooldown.
    pub fn register_rule(&mut self, id: impl Into<String>, spec: RuleSpec) {
        let id = id.into();

        if let Some(existing) = self.rules.iter_mut().find(|r| r.info.id == id) {
            debug!(rule_id = %id, "Replacing alert rule");
            existing.info.name = spec.name;
            existing.info.severity = spec.severity;
            existing.info.cooldown = spec.cooldown;
            existing.info.notification_channels = spec.notification_channels;
            existing.condition = spec.condition;
            return;
        }

        info!(
            rule_id = %id,
            name = %spec.name,
            severity = %spec.severity,
            cooldown_secs = spec.cooldown.as_secs(),
            "Registering alert rule"
        );

        self.rules.push(RegisteredRule {
            info: AlertRule {
                id,
                name: spec.name,
                severity: spec.severity,
                cooldown: spec.cooldown,
                notification_channels: spec.notification_channels,
                last_triggered: None,
                evaluations: 0,
                failures: 0,
            },
            condition: spec.condition,
        });
    }

    /// Remove a rule and any alert it has active.
    pub fn remove_rule(&mut self, id: &str) -> Result<AlertRule> {
        let index = self
            .rules
            .iter()
            .position(|r| r.info.id == id)
            .ok_or_else(|| AlertError::RuleNotFound(id.to_string()))?;

        self.active_alerts.remove(id);
        Ok(self.rules.remove(index).info)
    }

    /// Evaluate every rule, in registration order.
    ///
    /// For each rule: skip it while inside its cooldown; otherwise run the
    /// condition. `true` creates a new alert and restarts the cooldown;
    /// `false` resolves the rule's active alert, if any. A failing or
    /// panicking condition is recorded in the report and never fires.
    pub fn evaluate_all(&mut self, metrics: &[Metric], components: &[Component]) -> EvaluationReport {
        let now = self.clock.now();
        let ctx = EvaluationContext::new(metrics, components, now);
        let mut report = EvaluationReport::default();

        for rule in &mut self.rules {
            let rule_id = rule.info.id.clone();

            if rule.info.in_cooldown(now) {
                trace!(rule_id = %rule_id, "Rule inside cooldown, skipping");
                report.skipped.push(rule_id);
                continue;
            }

            rule.info.evaluations += 1;

            match evaluate_contained(rule.condition.as_ref(), &ctx) {
                Ok(true) => {
                    let details = details_contained(rule.condition.as_ref(), &ctx);
                    let alert = Alert::new(rule_id.clone(), rule.info.name.clone(), rule.info.severity, now)
                        .with_details(details)
                        .with_channels(rule.info.notification_channels.clone());

                    info!(
                        rule_id = %rule_id,
                        alert_id = %alert.id,
                        severity = %alert.severity,
                        "Alert triggered"
                    );

                    rule.info.last_triggered = Some(now);
                    self.active_alerts.insert(rule_id, alert.clone());
                    report.triggered.push(alert);
                }
                Ok(false) => {
                    if let Some(alert) = self.active_alerts.remove(&rule_id) {
                        info!(rule_id = %rule_id, alert_id = %alert.id, "Alert resolved");
                        report.resolved.push(alert);
                    }
                }
                Err(reason) => {
                    rule.info.failures += 1;
                    let error = AlertError::RuleEvaluation {
                        rule_id: rule_id.clone(),
                        reason: reason.clone(),
                    };
                    warn!(rule_id = %rule_id, error = %error, "Alert rule evaluation failed");
                    report.failures.push(RuleFailure { rule_id, reason });
                }
            }
        }

        report
    }

    /// Active alerts, in rule registration order.
    pub fn active_alerts(&self) -> Vec<Alert> {
        self.rules
            .iter()
            .filter_map(|r| self.active_alerts.get(&r.info.id).cloned())
            .collect()
    }

    /// The active alert for a rule.
    pub fn active_alert(&self, rule_id: &str) -> Option<&Alert> {
        self.active_alerts.get(rule_id)
    }

    pub fn rule(&self, id: &str) -> Option<AlertRule> {
        self.rules
            .iter()
            .find(|r| r.info.id == id)
            .map(|r| r.info.clone())
    }

    /// Rule bookkeeping, in registration order.
    pub fn rules(&self) -> Vec<AlertRule> {
        self.rules.iter().map(|r| r.info.clone()).collect()
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Drop active alerts and restart every cooldown. Rules stay registered.
    pub fn reset(&mut self) {
        self.active_alerts.clear();
        for rule in &mut self.rules {
            rule.info.last_triggered = None;
        }
    }
}

impl Default for AlertRuleEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn evaluate_contained(
    condition: &dyn AlertCondition,
    ctx: &EvaluationContext<'_>,
) -> std::result::Result<bool, String> {
    catch_unwind(AssertUnwindSafe(|| condition.evaluate(ctx)))
        .unwrap_or_else(|payload| Err(format!("condition panicked: {}", panic_message(&*payload))))
}

fn details_contained(condition: &dyn AlertCondition, ctx: &EvaluationContext<'_>) -> Option<Details> {
    catch_unwind(AssertUnwindSafe(|| condition.details(ctx))).unwrap_or(None)
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}
