//! Usage aggregation
//!
//! Collapses a window of hourly datapoints per metric into a single
//! [`UsageSnapshot`]. Every field is the arithmetic mean of the hourly points
//! the provider returned: utilization metrics are requested as hourly
//! averages, network and disk counters as hourly sums, so the snapshot holds
//! mean utilization and mean hourly throughput respectively.

use crate::error::AnalysisError;
use crate::models::{metric_names, Datapoint, MetricWindow, Statistic, UsageSnapshot};
use crate::observability::OptimizerMetrics;
use crate::provider::CloudProvider;
use chrono::{DateTime, Utc};
use std::time::{Duration, Instant};
use tracing::debug;

/// Bucket size requested from providers
pub const HOURLY_GRANULARITY: Duration = Duration::from_secs(60 * 60);

/// A metric the aggregator queries and the statistic it asks for
#[derive(Debug, Clone, Copy)]
pub struct UsageMetric {
    pub name: &'static str,
    pub statistic: Statistic,
}

/// The fixed set of metrics that make up a usage snapshot
pub const USAGE_METRICS: [UsageMetric; 6] = [
    UsageMetric {
        name: metric_names::CPU_UTILIZATION,
        statistic: Statistic::Average,
    },
    UsageMetric {
        name: metric_names::MEMORY_UTILIZATION,
        statistic: Statistic::Average,
    },
    UsageMetric {
        name: metric_names::NETWORK_IN,
        statistic: Statistic::Sum,
    },
    UsageMetric {
        name: metric_names::NETWORK_OUT,
        statistic: Statistic::Sum,
    },
    UsageMetric {
        name: metric_names::DISK_READ_OPS,
        statistic: Statistic::Sum,
    },
    UsageMetric {
        name: metric_names::DISK_WRITE_OPS,
        statistic: Statistic::Sum,
    },
];

/// Builds usage snapshots from provider metric series
#[derive(Debug, Clone)]
pub struct UsageAggregator {
    granularity: Duration,
    metrics: OptimizerMetrics,
}

impl Default for UsageAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl UsageAggregator {
    pub fn new() -> Self {
        Self {
            granularity: HOURLY_GRANULARITY,
            metrics: OptimizerMetrics::new(),
        }
    }

    /// Aggregate the window of `window_days` ending now
    pub async fn aggregate(
        &self,
        provider: &dyn CloudProvider,
        resource_id: &str,
        window_days: u32,
    ) -> Result<UsageSnapshot, AnalysisError> {
        self.aggregate_until(provider, resource_id, window_days, Utc::now())
            .await
    }

    /// Aggregate the window of `window_days` ending at `end`.
    ///
    /// Fails on the first metric query error; a partial snapshot is never
    /// returned. A metric with no datapoints stays at zero.
    pub async fn aggregate_until(
        &self,
        provider: &dyn CloudProvider,
        resource_id: &str,
        window_days: u32,
        end: DateTime<Utc>,
    ) -> Result<UsageSnapshot, AnalysisError> {
        AnalysisError::check_window(window_days)?;
        let start = Instant::now();
        let window = MetricWindow::days_until(end, window_days);
        let mut usage = UsageSnapshot::default();

        for metric in USAGE_METRICS {
            let mut points = provider
                .fetch_metric_series(
                    resource_id,
                    metric.name,
                    window,
                    self.granularity,
                    metric.statistic,
                )
                .await
                .map_err(|source| AnalysisError::MetricQuery {
                    metric: metric.name.to_string(),
                    source,
                })?;

            if let Some(avg) = mean_of_series(&mut points) {
                usage.set(metric.name, avg);
            }
        }

        self.metrics
            .observe_aggregation_latency(start.elapsed().as_secs_f64());
        debug!(
            resource_id = %resource_id,
            provider = %provider.name(),
            window_days = window_days,
            cpu = usage.cpu_utilization,
            memory = usage.memory_utilization,
            "Aggregated resource usage"
        );

        Ok(usage)
    }
}

/// Sort a series by timestamp and return its mean, or `None` when empty
pub fn mean_of_series(points: &mut [Datapoint]) -> Option<f64> {
    if points.is_empty() {
        return None;
    }
    points.sort_by_key(|p| p.timestamp);
    let sum: f64 = points.iter().map(|p| p.value).sum();
    Some(sum / points.len() as f64)
}
