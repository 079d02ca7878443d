//! Resource monitoring
//!
//! This module provides threshold alert rules, the shared metrics store and
//! the scheduler that keeps the store fresh and evaluates rules against it.

mod rules;
mod scheduler;
mod store;

#[cfg(test)]
mod tests;

pub use rules::{default_rules, Alert, AlertCondition, AlertRule};
pub use scheduler::{
    CycleReport, MonitorConfig, MonitorScheduler, MonitorSchedulerBuilder, MonitorState,
    DEFAULT_MONITOR_INTERVAL,
};
pub use store::{MetricsStore, MetricsUpdate, ResourceMetrics, DEFAULT_ALERT_HISTORY_LIMIT};
