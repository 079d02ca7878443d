//! Cloud provider capability
//!
//! The core never talks to a vendor API directly. Everything it needs from a
//! cloud account goes through [`CloudProvider`]: the resource inventory, metric
//! series for aggregation, a cheap current-metrics view for the monitor, and
//! cost line items.

mod inventory;

pub use inventory::{Inventory, InventoryProvider};

use crate::error::ProviderResult;
use crate::models::{CostRecord, Datapoint, MetricWindow, Resource, Statistic};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::time::Duration;

pub use async_trait::async_trait;

/// Trait implemented by every cloud account the optimizer observes
#[async_trait]
pub trait CloudProvider: Send + Sync {
    /// Provider name (e.g. "aws", "aws:prod-account")
    fn name(&self) -> &str;

    /// List all compute resources of the account
    async fn list_resources(&self) -> ProviderResult<Vec<Resource>>;

    /// Fetch one metric series for a resource, bucketed by `granularity`
    async fn fetch_metric_series(
        &self,
        resource_id: &str,
        metric: &str,
        window: MetricWindow,
        granularity: Duration,
        statistic: Statistic,
    ) -> ProviderResult<Vec<Datapoint>>;

    /// Latest value of every metric the provider tracks for a resource
    async fn current_metrics(&self, resource_id: &str) -> ProviderResult<HashMap<String, f64>>;

    /// Cost line items within `[start, end)`
    async fn cost_data(
        &self,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
    ) -> ProviderResult<Vec<CostRecord>> {
        Ok(Vec::new())
    }
}
