//! Threshold alert rules
//!
//! Rules are global to the monitor, not per resource. A rule whose condition
//! is neither `above` nor `below` is kept but never fires.

use crate::models::metric_names;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Comparison direction of an alert rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AlertCondition {
    /// Fires when value > threshold
    Above,
    /// Fires when value < threshold
    Below,
    /// Anything else; never fires
    Unrecognized(String),
}

impl AlertCondition {
    pub fn check(&self, value: f64, threshold: f64) -> bool {
        match self {
            AlertCondition::Above => value > threshold,
            AlertCondition::Below => value < threshold,
            AlertCondition::Unrecognized(_) => false,
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, AlertCondition::Unrecognized(_))
    }
}

impl From<String> for AlertCondition {
    fn from(s: String) -> Self {
        match s.as_str() {
            "above" => AlertCondition::Above,
            "below" => AlertCondition::Below,
            _ => AlertCondition::Unrecognized(s),
        }
    }
}

impl From<AlertCondition> for String {
    fn from(c: AlertCondition) -> Self {
        c.to_string()
    }
}

impl std::fmt::Display for AlertCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertCondition::Above => write!(f, "above"),
            AlertCondition::Below => write!(f, "below"),
            AlertCondition::Unrecognized(s) => write!(f, "{}", s),
        }
    }
}

/// Threshold rule evaluated against every resource in the metrics store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRule {
    pub metric: String,
    pub threshold: f64,
    pub condition: AlertCondition,
}

impl AlertRule {
    pub fn above(metric: impl Into<String>, threshold: f64) -> Self {
        Self {
            metric: metric.into(),
            threshold,
            condition: AlertCondition::Above,
        }
    }

    pub fn below(metric: impl Into<String>, threshold: f64) -> Self {
        Self {
            metric: metric.into(),
            threshold,
            condition: AlertCondition::Below,
        }
    }

    /// Build the alert for `value` if the rule fires
    pub fn evaluate(&self, resource_id: &str, value: f64, at: DateTime<Utc>) -> Option<Alert> {
        if !self.condition.check(value, self.threshold) {
            return None;
        }

        Some(Alert {
            timestamp: at,
            resource_id: resource_id.to_string(),
            metric: self.metric.clone(),
            value,
            threshold: self.threshold,
            description: format!(
                "Resource {} has {} of {:.2} which is {} the threshold of {:.2}",
                resource_id, self.metric, value, self.condition, self.threshold
            ),
        })
    }
}

/// High CPU, high memory and daily spend over 100
pub fn default_rules() -> Vec<AlertRule> {
    vec![
        AlertRule::above(metric_names::CPU_UTILIZATION, 80.0),
        AlertRule::above(metric_names::MEMORY_UTILIZATION, 80.0),
        AlertRule::above(metric_names::COST_PER_DAY, 100.0),
    ]
}

/// A fired alert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub timestamp: DateTime<Utc>,
    pub resource_id: String,
    pub metric: String,
    pub value: f64,
    pub threshold: f64,
    pub description: String,
}
