//! On-demand optimization requests
//!
//! Locates a resource across the configured providers, aggregates its usage
//! over the observation window and runs it through the recommendation engine.
//! Recommendations are only reported; nothing is resized.

use super::{CostSummary, RecommendationEngine, UsageAggregator};
use crate::error::AnalysisError;
use crate::health::{components, HealthRegistry};
use crate::models::{MetricWindow, Recommendation, Resource};
use crate::observability::{OptimizerMetrics, StructuredLogger};
use crate::provider::CloudProvider;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, warn};

/// Entry point for recommendation and cost queries
pub struct OptimizationService {
    providers: Vec<Arc<dyn CloudProvider>>,
    aggregator: UsageAggregator,
    engine: RecommendationEngine,
    health: Option<HealthRegistry>,
    logger: StructuredLogger,
    metrics: OptimizerMetrics,
}

impl OptimizationService {
    pub fn new(providers: Vec<Arc<dyn CloudProvider>>, engine: RecommendationEngine) -> Self {
        Self {
            providers,
            aggregator: UsageAggregator::new(),
            engine,
            health: None,
            logger: StructuredLogger::new("optimization-service"),
            metrics: OptimizerMetrics::new(),
        }
    }

    /// Report analysis outcomes to the `analyzer` health component
    pub fn with_health(mut self, health: HealthRegistry) -> Self {
        self.health = Some(health);
        self
    }

    pub fn engine(&self) -> &RecommendationEngine {
        &self.engine
    }

    /// Recommendation for one resource over `window_days` (0 means the
    /// policy's observation period).
    ///
    /// Returns `Ok(None)` when the resource's type is not in the catalog or
    /// its usage does not call for a change.
    pub async fn compute_recommendation(
        &self,
        resource_id: &str,
        window_days: u32,
    ) -> Result<Option<Recommendation>, AnalysisError> {
        let days = self.window_days(window_days)?;
        let result = match self.find_resource(resource_id).await {
            Ok((provider, resource)) => self.evaluate(provider.as_ref(), &resource, days).await,
            Err(e) => Err(e),
        };

        match &result {
            Err(e @ (AnalysisError::MetricQuery { .. } | AnalysisError::Provider(_))) => {
                self.report_degraded(format!("Analysis of {} failed: {}", resource_id, e))
                    .await
            }
            _ => self.report_healthy().await,
        }
        result
    }

    /// Recommendations for every resource of every provider. Per-resource
    /// failures are logged and skipped; only an invalid window is an error.
    pub async fn recommend_all(
        &self,
        window_days: u32,
    ) -> Result<Vec<Recommendation>, AnalysisError> {
        let days = self.window_days(window_days)?;
        let mut recommendations = Vec::new();
        let mut failures = 0usize;

        for provider in &self.providers {
            let resources = match provider.list_resources().await {
                Ok(resources) => resources,
                Err(e) => {
                    failures += 1;
                    self.logger.log_provider_failure(provider.name(), None, &e.to_string());
                    continue;
                }
            };

            for resource in resources {
                match self.evaluate(provider.as_ref(), &resource, days).await {
                    Ok(Some(rec)) => recommendations.push(rec),
                    Ok(None) => {}
                    Err(e) => {
                        failures += 1;
                        warn!(resource_id = %resource.id, error = %e, "Skipping resource analysis");
                    }
                }
            }
        }

        if failures > 0 {
            self.report_degraded(format!("{} provider listings or analyses failed", failures))
                .await;
        } else {
            self.report_healthy().await;
        }
        Ok(recommendations)
    }

    /// Spend over the last `days` across all providers
    pub async fn cost_summary(&self, days: u32) -> Result<CostSummary, AnalysisError> {
        let window = MetricWindow::days_until(Utc::now(), AnalysisError::check_window(days)?);
        let (start, end) = (window.start, window.end);
        let mut summary = CostSummary::from_records(&[], start, end);

        for provider in &self.providers {
            match provider.cost_data(start, end).await {
                Ok(records) => {
                    if summary.record_count == 0 {
                        if let Some(first) = records.first() {
                            summary.currency = first.currency.clone();
                        }
                    }
                    summary.merge(CostSummary::from_records(&records, start, end));
                }
                Err(e) => {
                    self.logger.log_provider_failure(provider.name(), None, &e.to_string());
                }
            }
        }

        Ok(summary)
    }

    async fn report_healthy(&self) {
        if let Some(health) = &self.health {
            health.set_healthy(components::ANALYZER).await;
        }
    }

    async fn report_degraded(&self, message: String) {
        if let Some(health) = &self.health {
            health.set_degraded(components::ANALYZER, message).await;
        }
    }

    /// 0 selects the policy's observation period
    fn window_days(&self, requested: u32) -> Result<u32, AnalysisError> {
        let days = if requested == 0 {
            self.engine.policy().observation_period_days
        } else {
            requested
        };
        AnalysisError::check_window(days)
    }

    async fn evaluate(
        &self,
        provider: &dyn CloudProvider,
        resource: &Resource,
        days: u32,
    ) -> Result<Option<Recommendation>, AnalysisError> {
        let usage = self.aggregator.aggregate(provider, &resource.id, days).await?;
        let recommendation = self.engine.evaluate(resource, &usage);

        match &recommendation {
            Some(rec) => {
                self.metrics.inc_recommendations_generated();
                self.logger.log_recommendation(rec);
            }
            None => debug!(
                resource_id = %resource.id,
                resource_type = %resource.resource_type,
                "No rightsizing change recommended"
            ),
        }

        Ok(recommendation)
    }

    /// First provider whose inventory contains `resource_id`. A listing
    /// failure only surfaces when no other provider knows the resource.
    async fn find_resource(
        &self,
        resource_id: &str,
    ) -> Result<(Arc<dyn CloudProvider>, Resource), AnalysisError> {
        let mut first_error = None;

        for provider in &self.providers {
            match provider.list_resources().await {
                Ok(resources) => {
                    if let Some(resource) = resources.into_iter().find(|r| r.id == resource_id) {
                        return Ok((Arc::clone(provider), resource));
                    }
                }
                Err(e) => {
                    self.logger
                        .log_provider_failure(provider.name(), Some(resource_id), &e.to_string());
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(AnalysisError::Provider(e)),
            None => Err(AnalysisError::ResourceNotFound(resource_id.to_string())),
        }
    }
}
