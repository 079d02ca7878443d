//! Inventory-backed provider
//!
//! Serves resources, hourly metric series, current metrics and cost line
//! items from a JSON inventory document. When constructed from a file the
//! document is re-read on every resource listing so edits show up on the next
//! monitor cycle.

use super::{async_trait, CloudProvider};
use crate::error::{ProviderError, ProviderResult};
use crate::models::{CostRecord, Datapoint, MetricWindow, Resource, Statistic};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

/// Window used when current metrics are derived from series
const CURRENT_METRICS_WINDOW_DAYS: u32 = 1;

/// Inventory document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Inventory {
    pub name: String,
    #[serde(default)]
    pub resources: Vec<Resource>,
    /// resource id -> metric name -> datapoints
    #[serde(default)]
    pub series: HashMap<String, HashMap<String, Vec<Datapoint>>>,
    /// resource id -> metric name -> latest value
    #[serde(default)]
    pub current: HashMap<String, HashMap<String, f64>>,
    #[serde(default)]
    pub costs: Vec<CostRecord>,
}

impl Inventory {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_resource(mut self, resource: Resource) -> Self {
        self.resources.push(resource);
        self
    }

    pub fn with_series(mut self, resource_id: &str, metric: &str, points: Vec<Datapoint>) -> Self {
        self.series
            .entry(resource_id.to_string())
            .or_default()
            .insert(metric.to_string(), points);
        self
    }

    pub fn with_current(mut self, resource_id: &str, metric: &str, value: f64) -> Self {
        self.current
            .entry(resource_id.to_string())
            .or_default()
            .insert(metric.to_string(), value);
        self
    }

    pub fn with_cost(mut self, record: CostRecord) -> Self {
        self.costs.push(record);
        self
    }

    fn knows(&self, resource_id: &str) -> bool {
        self.resources.iter().any(|r| r.id == resource_id)
    }
}

/// Provider serving an [`Inventory`]
pub struct InventoryProvider {
    name: String,
    inventory: RwLock<Inventory>,
    source: Option<PathBuf>,
}

impl InventoryProvider {
    pub fn new(inventory: Inventory) -> Self {
        Self {
            name: inventory.name.clone(),
            inventory: RwLock::new(inventory),
            source: None,
        }
    }

    /// Load an inventory file; the provider keeps the file's `name` for its lifetime
    pub async fn from_file(path: impl AsRef<Path>) -> ProviderResult<Self> {
        let path = path.as_ref().to_path_buf();
        let inventory = read_inventory(&path).await?;
        Ok(Self {
            name: inventory.name.clone(),
            inventory: RwLock::new(inventory),
            source: Some(path),
        })
    }

    async fn reload(&self) -> ProviderResult<()> {
        if let Some(path) = &self.source {
            let fresh = read_inventory(path).await?;
            *self.inventory.write().await = fresh;
            debug!(provider = %self.name, path = %path.display(), "Reloaded inventory");
        }
        Ok(())
    }
}

async fn read_inventory(path: &Path) -> ProviderResult<Inventory> {
    let content = tokio::fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&content)?)
}

fn mean_within(points: &[Datapoint], window: &MetricWindow) -> Option<f64> {
    let values: Vec<f64> = points
        .iter()
        .filter(|p| window.contains(p.timestamp))
        .map(|p| p.value)
        .collect();
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

#[async_trait]
impl CloudProvider for InventoryProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list_resources(&self) -> ProviderResult<Vec<Resource>> {
        self.reload().await?;
        let inventory = self.inventory.read().await;
        Ok(inventory
            .resources
            .iter()
            .cloned()
            .map(|mut r| {
                if r.provider.is_empty() {
                    r.provider = self.name.clone();
                }
                r
            })
            .collect())
    }

    /// Series are stored pre-bucketed, so `granularity` and `statistic` only
    /// describe what the stored points already are.
    async fn fetch_metric_series(
        &self,
        resource_id: &str,
        metric: &str,
        window: MetricWindow,
        _granularity: Duration,
        _statistic: Statistic,
    ) -> ProviderResult<Vec<Datapoint>> {
        let inventory = self.inventory.read().await;
        if !inventory.knows(resource_id) {
            return Err(ProviderError::NotFound(resource_id.to_string()));
        }

        Ok(inventory
            .series
            .get(resource_id)
            .and_then(|metrics| metrics.get(metric))
            .map(|points| {
                points
                    .iter()
                    .filter(|p| window.contains(p.timestamp))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn current_metrics(&self, resource_id: &str) -> ProviderResult<HashMap<String, f64>> {
        let inventory = self.inventory.read().await;
        if !inventory.knows(resource_id) {
            return Err(ProviderError::NotFound(resource_id.to_string()));
        }

        if let Some(current) = inventory.current.get(resource_id) {
            return Ok(current.clone());
        }

        // No reported values, fall back to the last day of each series
        let window = MetricWindow::days_until(Utc::now(), CURRENT_METRICS_WINDOW_DAYS);
        Ok(inventory
            .series
            .get(resource_id)
            .map(|metrics| {
                metrics
                    .iter()
                    .filter_map(|(name, points)| {
                        mean_within(points, &window).map(|avg| (name.clone(), avg))
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn cost_data(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> ProviderResult<Vec<CostRecord>> {
        let inventory = self.inventory.read().await;
        Ok(inventory
            .costs
            .iter()
            .filter(|c| c.start >= start && c.start < end)
            .cloned()
            .collect())
    }
}
