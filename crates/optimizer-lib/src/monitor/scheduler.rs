//! Monitor scheduler
//!
//! Periodically refreshes the current metrics of every resource of every
//! provider into the [`MetricsStore`] and evaluates the alert rules against
//! it. Each cycle moves through `Idle -> Refreshing -> Evaluating -> Idle`.

use super::rules::AlertRule;
use super::store::{MetricsStore, MetricsUpdate, ResourceMetrics, DEFAULT_ALERT_HISTORY_LIMIT};
use crate::health::{components, HealthRegistry};
use crate::observability::{OptimizerMetrics, StructuredLogger};
use crate::provider::CloudProvider;
use anyhow::Result;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

pub const DEFAULT_MONITOR_INTERVAL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Time between cycles; the first cycle runs one interval after start
    pub interval: Duration,
    /// Alerts retained per resource
    pub alert_history_limit: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_MONITOR_INTERVAL,
            alert_history_limit: DEFAULT_ALERT_HISTORY_LIMIT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MonitorState {
    Idle,
    Refreshing,
    Evaluating,
}

/// Outcome of one refresh and evaluation cycle
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleReport {
    pub providers_polled: usize,
    pub provider_failures: usize,
    pub resources_refreshed: usize,
    pub refresh_failures: usize,
    pub alerts_raised: usize,
}

pub struct MonitorScheduler {
    providers: Vec<Arc<dyn CloudProvider>>,
    rules: Vec<AlertRule>,
    store: MetricsStore,
    config: MonitorConfig,
    state_tx: watch::Sender<MonitorState>,
    health: Option<HealthRegistry>,
    metrics: OptimizerMetrics,
    logger: StructuredLogger,
}

impl MonitorScheduler {
    /// Fails when `config.interval` is zero
    pub fn new(
        providers: Vec<Arc<dyn CloudProvider>>,
        rules: Vec<AlertRule>,
        config: MonitorConfig,
    ) -> Result<Self> {
        if config.interval.is_zero() {
            anyhow::bail!("Monitor interval must be greater than zero");
        }

        for rule in rules.iter().filter(|r| !r.condition.is_recognized()) {
            warn!(
                metric = %rule.metric,
                condition = %rule.condition,
                "Alert rule has an unrecognized condition and will never fire"
            );
        }

        let (state_tx, _) = watch::channel(MonitorState::Idle);

        Ok(Self {
            providers,
            rules,
            store: MetricsStore::new(config.alert_history_limit),
            config,
            state_tx,
            health: None,
            metrics: OptimizerMetrics::new(),
            logger: StructuredLogger::new("monitor"),
        })
    }

    pub fn with_health(mut self, health: HealthRegistry) -> Self {
        self.health = Some(health);
        self
    }

    pub fn rules(&self) -> &[AlertRule] {
        &self.rules
    }

    pub fn store(&self) -> &MetricsStore {
        &self.store
    }

    pub fn state(&self) -> MonitorState {
        *self.state_tx.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<MonitorState> {
        self.state_tx.subscribe()
    }

    pub async fn get_metrics(&self, resource_id: &str) -> Option<ResourceMetrics> {
        self.store.get(resource_id).await
    }

    pub async fn get_all_metrics(&self) -> HashMap<String, ResourceMetrics> {
        self.store.snapshot().await
    }

    /// Run cycles until `shutdown` fires. A cycle already in flight is
    /// completed before the signal is observed.
    pub async fn run(self: Arc<Self>, mut shutdown: broadcast::Receiver<()>) {
        info!(
            interval_secs = self.config.interval.as_secs(),
            providers = self.providers.len(),
            rules = self.rules.len(),
            "Starting monitor scheduler"
        );

        let mut ticker = interval_at(Instant::now() + self.config.interval, self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.recv() => {
                    info!("Shutting down monitor scheduler");
                    break;
                }
                _ = ticker.tick() => {
                    self.run_cycle().await;
                }
            }
        }
    }

    /// One refresh and evaluation cycle
    pub async fn run_cycle(&self) -> CycleReport {
        let started = Instant::now();
        let mut report = CycleReport::default();

        self.state_tx.send_replace(MonitorState::Refreshing);
        let updates = self.refresh(&mut report).await;
        report.resources_refreshed = updates.len();

        self.state_tx.send_replace(MonitorState::Evaluating);
        let alerts = self.store.publish_and_evaluate(updates, &self.rules).await;
        report.alerts_raised = alerts.len();
        for alert in &alerts {
            self.logger.log_alert(alert);
        }

        self.state_tx.send_replace(MonitorState::Idle);

        let elapsed = started.elapsed();
        self.metrics.observe_cycle_latency(elapsed.as_secs_f64());
        self.metrics.add_alerts_raised(alerts.len());
        self.metrics.set_resources_monitored(self.store.len().await);
        self.logger.log_cycle(
            report.resources_refreshed,
            report.provider_failures,
            report.refresh_failures,
            report.alerts_raised,
            elapsed.as_millis(),
        );
        self.update_health(&report).await;

        report
    }

    /// Fetch current metrics from every provider without touching the store
    async fn refresh(&self, report: &mut CycleReport) -> Vec<MetricsUpdate> {
        let mut updates = Vec::new();

        for provider in &self.providers {
            report.providers_polled += 1;

            let resources = match provider.list_resources().await {
                Ok(resources) => resources,
                Err(e) => {
                    report.provider_failures += 1;
                    self.metrics.inc_provider_errors();
                    self.logger
                        .log_provider_failure(provider.name(), None, &e.to_string());
                    continue;
                }
            };

            for resource in resources {
                match provider.current_metrics(&resource.id).await {
                    Ok(metrics) => updates.push(MetricsUpdate {
                        resource_id: resource.id,
                        provider: provider.name().to_string(),
                        metrics,
                        observed_at: Utc::now(),
                    }),
                    Err(e) => {
                        report.refresh_failures += 1;
                        self.metrics.inc_refresh_errors();
                        debug!(
                            provider = %provider.name(),
                            resource_id = %resource.id,
                            error = %e,
                            "Failed to refresh resource metrics"
                        );
                    }
                }
            }
        }

        updates
    }

    async fn update_health(&self, report: &CycleReport) {
        let Some(health) = &self.health else {
            return;
        };

        health.set_healthy(components::MONITOR).await;

        if report.providers_polled > 0 && report.provider_failures == report.providers_polled {
            health
                .set_unhealthy(components::PROVIDERS, "All providers failed to list resources")
                .await;
        } else if report.provider_failures > 0 || report.refresh_failures > 0 {
            health
                .set_degraded(
                    components::PROVIDERS,
                    format!(
                        "{} of {} providers failed, {} resource refreshes failed",
                        report.provider_failures, report.providers_polled, report.refresh_failures
                    ),
                )
                .await;
        } else {
            health.set_healthy(components::PROVIDERS).await;
        }
    }
}

/// Builder for the monitor scheduler
pub struct MonitorSchedulerBuilder {
    providers: Vec<Arc<dyn CloudProvider>>,
    rules: Option<Vec<AlertRule>>,
    config: MonitorConfig,
    health: Option<HealthRegistry>,
}

impl MonitorSchedulerBuilder {
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
            rules: None,
            config: MonitorConfig::default(),
            health: None,
        }
    }

    pub fn provider(mut self, provider: Arc<dyn CloudProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn providers(mut self, providers: impl IntoIterator<Item = Arc<dyn CloudProvider>>) -> Self {
        self.providers.extend(providers);
        self
    }

    /// Replace the default rule set
    pub fn rules(mut self, rules: Vec<AlertRule>) -> Self {
        self.rules = Some(rules);
        self
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.config.interval = interval;
        self
    }

    pub fn alert_history_limit(mut self, limit: usize) -> Self {
        self.config.alert_history_limit = limit;
        self
    }

    pub fn health(mut self, health: HealthRegistry) -> Self {
        self.health = Some(health);
        self
    }

    pub fn build(self) -> Result<MonitorScheduler> {
        let rules = self.rules.unwrap_or_else(super::rules::default_rules);
        let scheduler = MonitorScheduler::new(self.providers, rules, self.config)?;

        Ok(match self.health {
            Some(health) => scheduler.with_health(health),
            None => scheduler,
        })
    }
}

impl Default for MonitorSchedulerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
