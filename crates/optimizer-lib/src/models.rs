//! Core data models for the cost optimizer

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Canonical metric names shared by providers, snapshots and alert rules
pub mod metric_names {
    pub const CPU_UTILIZATION: &str = "CPUUtilization";
    pub const MEMORY_UTILIZATION: &str = "MemoryUtilization";
    pub const NETWORK_IN: &str = "NetworkIn";
    pub const NETWORK_OUT: &str = "NetworkOut";
    pub const DISK_READ_OPS: &str = "DiskReadOps";
    pub const DISK_WRITE_OPS: &str = "DiskWriteOps";
    pub const COST_PER_DAY: &str = "CostPerDay";
}

/// Hours in the 30-day month used for every monthly cost figure
pub const HOURS_PER_MONTH: f64 = 24.0 * 30.0;

/// Longest observation or cost window, in days, accepted from callers
pub const MAX_WINDOW_DAYS: u32 = 3650;

/// A billable compute resource as last reported by its provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Catalog key, e.g. `t3.large`
    pub resource_type: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub provider: String,
    #[serde(default)]
    pub labels: HashMap<String, String>,
}

/// Size and hourly price of an instance type as listed in the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceType {
    pub name: String,
    pub vcpu: u32,
    pub memory_gb: f64,
    pub price_per_hour: f64,
    #[serde(default = "default_generation")]
    pub generation: String,
}

fn default_generation() -> String {
    "current".to_string()
}

impl InstanceType {
    pub fn new(name: impl Into<String>, vcpu: u32, memory_gb: f64, price_per_hour: f64) -> Self {
        Self {
            name: name.into(),
            vcpu,
            memory_gb,
            price_per_hour,
            generation: default_generation(),
        }
    }

    /// Cost of running this type for a 30-day month
    pub fn monthly_cost(&self) -> f64 {
        self.price_per_hour * HOURS_PER_MONTH
    }
}

/// One averaged reading per tracked metric over an observation window.
///
/// Utilization fields are percentages as reported by the provider; they are
/// not clamped. Network and disk fields hold the mean hourly total.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageSnapshot {
    pub cpu_utilization: f64,
    pub memory_utilization: f64,
    pub network_in: f64,
    pub network_out: f64,
    pub disk_read_ops: f64,
    pub disk_write_ops: f64,
}

impl UsageSnapshot {
    /// Set the field backing `metric`. Returns false for names the snapshot does not track.
    pub fn set(&mut self, metric: &str, value: f64) -> bool {
        let slot = match metric {
            metric_names::CPU_UTILIZATION => &mut self.cpu_utilization,
            metric_names::MEMORY_UTILIZATION => &mut self.memory_utilization,
            metric_names::NETWORK_IN => &mut self.network_in,
            metric_names::NETWORK_OUT => &mut self.network_out,
            metric_names::DISK_READ_OPS => &mut self.disk_read_ops,
            metric_names::DISK_WRITE_OPS => &mut self.disk_write_ops,
            _ => return false,
        };
        *slot = value;
        true
    }

    pub fn to_map(&self) -> HashMap<String, f64> {
        HashMap::from([
            (metric_names::CPU_UTILIZATION.to_string(), self.cpu_utilization),
            (metric_names::MEMORY_UTILIZATION.to_string(), self.memory_utilization),
            (metric_names::NETWORK_IN.to_string(), self.network_in),
            (metric_names::NETWORK_OUT.to_string(), self.network_out),
            (metric_names::DISK_READ_OPS.to_string(), self.disk_read_ops),
            (metric_names::DISK_WRITE_OPS.to_string(), self.disk_write_ops),
        ])
    }
}

/// A single point of a provider time series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Datapoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

/// Statistic requested from the provider for each bucket of a series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Statistic {
    Average,
    Sum,
}

/// Closed time range of a metric query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl MetricWindow {
    /// Window of `days` ending at `end`. The start saturates at the
    /// earliest representable instant.
    pub fn days_until(end: DateTime<Utc>, days: u32) -> Self {
        let start = end
            .checked_sub_signed(chrono::Duration::days(i64::from(days)))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        Self { start, end }
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.start && ts <= self.end
    }
}

/// How the engine picks a replacement among qualifying catalog entries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateSelection {
    /// First qualifying entry in catalog declaration order
    #[default]
    DeclarationOrder,
    /// Qualifying entry with the closest vCPU count, then the lowest price
    NearestFit,
}

/// Thresholds that decide when a resource is over- or under-provisioned
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RightsizingPolicy {
    pub min_cpu_percent: f64,
    pub max_cpu_percent: f64,
    pub min_memory_percent: f64,
    pub max_memory_percent: f64,
    /// Default observation window in days
    pub observation_period_days: u32,
    #[serde(default)]
    pub candidate_selection: CandidateSelection,
}

impl Default for RightsizingPolicy {
    fn default() -> Self {
        Self {
            min_cpu_percent: 20.0,
            max_cpu_percent: 80.0,
            min_memory_percent: 20.0,
            max_memory_percent: 80.0,
            observation_period_days: 14,
            candidate_selection: CandidateSelection::DeclarationOrder,
        }
    }
}

/// Direction of a rightsizing recommendation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    Downsize,
    Upsize,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Downsize => write!(f, "Downsize"),
            Action::Upsize => write!(f, "Upsize"),
        }
    }
}

/// Financial significance of a recommendation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    /// Priority of a downsize by its projected monthly saving
    pub fn from_saving(monthly_saving: f64) -> Self {
        if monthly_saving > 100.0 {
            Priority::High
        } else if monthly_saving > 50.0 {
            Priority::Medium
        } else {
            Priority::Low
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Priority::High => write!(f, "HIGH"),
            Priority::Medium => write!(f, "MEDIUM"),
            Priority::Low => write!(f, "LOW"),
        }
    }
}

/// Rightsizing recommendation for a single resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub resource_id: String,
    pub resource_type: String,
    pub current_spec: InstanceType,
    pub recommended_spec: InstanceType,
    pub action: Action,
    pub reason: String,
    /// Negative for an upsize, where it is the added monthly cost
    pub projected_monthly_saving: f64,
    pub current_monthly_cost: f64,
    pub priority: Priority,
}

/// A cost line item reported by a provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostRecord {
    pub amount: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub service: String,
    #[serde(default)]
    pub resource_id: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

pub(crate) fn default_currency() -> String {
    "USD".to_string()
}
