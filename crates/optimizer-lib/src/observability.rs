//! Observability for the optimizer
//!
//! Provides:
//! - Prometheus metrics (monitor cycle latency, aggregation latency, alert and
//!   recommendation counters, provider error counters)
//! - Structured JSON logging with tracing

use crate::models::Recommendation;
use crate::monitor::Alert;
use prometheus::{register_histogram, register_int_counter, register_int_gauge, Histogram, IntCounter, IntGauge};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for latency measurements (in seconds). Provider calls
/// are remote, so the range runs well past a second.
const LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<OptimizerMetricsInner> = OnceLock::new();

struct OptimizerMetricsInner {
    monitor_cycle_seconds: Histogram,
    aggregation_seconds: Histogram,
    resources_monitored: IntGauge,
    alerts_raised: IntCounter,
    recommendations_generated: IntCounter,
    provider_errors: IntCounter,
    refresh_errors: IntCounter,
}

impl OptimizerMetricsInner {
    fn new() -> Self {
        Self {
            monitor_cycle_seconds: register_histogram!(
                "cost_optimizer_monitor_cycle_seconds",
                "Time spent on one monitor refresh and alert evaluation cycle",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register monitor_cycle_seconds"),

            aggregation_seconds: register_histogram!(
                "cost_optimizer_aggregation_seconds",
                "Time spent aggregating usage metrics for one resource",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register aggregation_seconds"),

            resources_monitored: register_int_gauge!(
                "cost_optimizer_resources_monitored",
                "Number of resources held in the metrics store"
            )
            .expect("Failed to register resources_monitored"),

            alerts_raised: register_int_counter!(
                "cost_optimizer_alerts_raised_total",
                "Total number of threshold alerts raised"
            )
            .expect("Failed to register alerts_raised"),

            recommendations_generated: register_int_counter!(
                "cost_optimizer_recommendations_generated_total",
                "Total number of rightsizing recommendations generated"
            )
            .expect("Failed to register recommendations_generated"),

            provider_errors: register_int_counter!(
                "cost_optimizer_provider_errors_total",
                "Total number of failed provider resource listings"
            )
            .expect("Failed to register provider_errors"),

            refresh_errors: register_int_counter!(
                "cost_optimizer_refresh_errors_total",
                "Total number of failed per-resource metric refreshes"
            )
            .expect("Failed to register refresh_errors"),
        }
    }
}

/// Prometheus handle
///
/// Lightweight handle to the global metrics instance; clones share the same
/// underlying metrics.
#[derive(Clone, Debug)]
pub struct OptimizerMetrics {
    _private: (),
}

impl Default for OptimizerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl OptimizerMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(OptimizerMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &OptimizerMetricsInner {
        GLOBAL_METRICS.get_or_init(OptimizerMetricsInner::new)
    }

    pub fn observe_cycle_latency(&self, duration_secs: f64) {
        self.inner().monitor_cycle_seconds.observe(duration_secs);
    }

    pub fn observe_aggregation_latency(&self, duration_secs: f64) {
        self.inner().aggregation_seconds.observe(duration_secs);
    }

    pub fn set_resources_monitored(&self, count: usize) {
        self.inner().resources_monitored.set(count as i64);
    }

    pub fn add_alerts_raised(&self, count: usize) {
        self.inner().alerts_raised.inc_by(count as u64);
    }

    pub fn inc_recommendations_generated(&self) {
        self.inner().recommendations_generated.inc();
    }

    pub fn inc_provider_errors(&self) {
        self.inner().provider_errors.inc();
    }

    pub fn inc_refresh_errors(&self) {
        self.inner().refresh_errors.inc();
    }
}

/// Structured logger for optimizer events
#[derive(Clone, Debug)]
pub struct StructuredLogger {
    component: String,
}

impl StructuredLogger {
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
        }
    }

    pub fn log_recommendation(&self, rec: &Recommendation) {
        info!(
            event = "recommendation_generated",
            component = %self.component,
            resource_id = %rec.resource_id,
            current_type = %rec.current_spec.name,
            recommended_type = %rec.recommended_spec.name,
            action = %rec.action,
            projected_monthly_saving = rec.projected_monthly_saving,
            priority = %rec.priority,
            reason = %rec.reason,
            "Generated rightsizing recommendation"
        );
    }

    pub fn log_alert(&self, alert: &Alert) {
        warn!(
            event = "alert_raised",
            component = %self.component,
            resource_id = %alert.resource_id,
            metric = %alert.metric,
            value = alert.value,
            threshold = alert.threshold,
            "{}",
            alert.description
        );
    }

    /// Log the outcome of one monitor cycle
    pub fn log_cycle(
        &self,
        resources_refreshed: usize,
        provider_failures: usize,
        refresh_failures: usize,
        alerts_raised: usize,
        duration_ms: u128,
    ) {
        info!(
            event = "monitor_cycle_complete",
            component = %self.component,
            resources_refreshed = resources_refreshed,
            provider_failures = provider_failures,
            refresh_failures = refresh_failures,
            alerts_raised = alerts_raised,
            duration_ms = duration_ms as u64,
            "Monitor cycle complete"
        );
    }

    pub fn log_provider_failure(&self, provider: &str, resource_id: Option<&str>, error: &str) {
        warn!(
            event = "provider_failure",
            component = %self.component,
            provider = %provider,
            resource_id = ?resource_id,
            error = %error,
            "Cloud provider request failed"
        );
    }

    pub fn log_startup(&self, version: &str, providers: usize, rules: usize) {
        info!(
            event = "optimizer_started",
            component = %self.component,
            version = %version,
            providers = providers,
            alert_rules = rules,
            "Cost optimizer started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "optimizer_shutdown",
            component = %self.component,
            reason = %reason,
            "Cost optimizer shutting down"
        );
    }
}
