//! # Lookout Alert - declarative alert rules
//!
//! An [`AlertRuleEngine`] holds rules (a condition over the metrics window, a
//! severity, a cooldown and the channels to notify) and evaluates them in
//! registration order. It keeps at most one active alert per rule:
//!
//! - a condition that turns true outside the rule's cooldown triggers a new
//!   alert and restarts the cooldown
//! - a condition that turns false resolves the rule's active alert
//! - a condition that errors or panics is reported and skipped
//!
//! Cooldown is measured from the last trigger, not the last evaluation, so a
//! condition that stays true notifies once per cooldown window.

pub mod condition;
pub mod engine;
pub mod error;
pub mod rules;

pub use condition::{condition_fn, try_condition_fn, AlertCondition, EvaluationContext};
pub use engine::{AlertRule, AlertRuleEngine, EvaluationReport, RuleFailure, RuleSpec, DEFAULT_COOLDOWN};
pub use error::{AlertError, Result};
pub use rules::{default_rules, DefaultRuleThresholds};
