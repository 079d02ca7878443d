//! Shared metrics store
//!
//! One writer (the scheduler) and any number of readers. Readers always get
//! owned copies so no lock outlives a call.

use super::rules::{Alert, AlertRule};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Alerts kept per resource before the oldest is evicted
pub const DEFAULT_ALERT_HISTORY_LIMIT: usize = 1000;

/// Latest metric snapshot and alert history of one resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceMetrics {
    pub resource_id: String,
    pub provider: String,
    pub metrics: HashMap<String, f64>,
    pub last_updated: DateTime<Utc>,
    pub alert_history: VecDeque<Alert>,
}

impl ResourceMetrics {
    fn push_alert(&mut self, alert: Alert, limit: usize) {
        while self.alert_history.len() >= limit {
            self.alert_history.pop_front();
        }
        self.alert_history.push_back(alert);
    }
}

/// A freshly fetched snapshot waiting to be published
#[derive(Debug, Clone)]
pub struct MetricsUpdate {
    pub resource_id: String,
    pub provider: String,
    pub metrics: HashMap<String, f64>,
    pub observed_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct MetricsStore {
    entries: Arc<RwLock<HashMap<String, ResourceMetrics>>>,
    alert_history_limit: usize,
}

impl Default for MetricsStore {
    fn default() -> Self {
        Self::new(DEFAULT_ALERT_HISTORY_LIMIT)
    }
}

impl MetricsStore {
    /// A limit of zero is replaced by the default
    pub fn new(alert_history_limit: usize) -> Self {
        let alert_history_limit = if alert_history_limit == 0 {
            tracing::warn!(
                default = DEFAULT_ALERT_HISTORY_LIMIT,
                "Alert history limit of 0 is not allowed, using default"
            );
            DEFAULT_ALERT_HISTORY_LIMIT
        } else {
            alert_history_limit
        };

        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            alert_history_limit,
        }
    }

    pub fn alert_history_limit(&self) -> usize {
        self.alert_history_limit
    }

    pub async fn get(&self, resource_id: &str) -> Option<ResourceMetrics> {
        self.entries.read().await.get(resource_id).cloned()
    }

    pub async fn snapshot(&self) -> HashMap<String, ResourceMetrics> {
        self.entries.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Publish `updates` and evaluate `rules` against every stored resource
    /// under a single write guard. Returns the alerts raised.
    ///
    /// Existing entries keep their alert history; only the metric snapshot
    /// and timestamp are replaced. Entries are never removed.
    pub async fn publish_and_evaluate(
        &self,
        updates: Vec<MetricsUpdate>,
        rules: &[AlertRule],
    ) -> Vec<Alert> {
        let mut entries = self.entries.write().await;

        for update in updates {
            match entries.get_mut(&update.resource_id) {
                Some(entry) => {
                    entry.provider = update.provider;
                    entry.metrics = update.metrics;
                    entry.last_updated = update.observed_at;
                }
                None => {
                    entries.insert(
                        update.resource_id.clone(),
                        ResourceMetrics {
                            resource_id: update.resource_id,
                            provider: update.provider,
                            metrics: update.metrics,
                            last_updated: update.observed_at,
                            alert_history: VecDeque::new(),
                        },
                    );
                }
            }
        }

        let now = Utc::now();
        let mut raised = Vec::new();
        for entry in entries.values_mut() {
            for rule in rules {
                let Some(&value) = entry.metrics.get(&rule.metric) else {
                    continue;
                };
                if let Some(alert) = rule.evaluate(&entry.resource_id, value, now) {
                    entry.push_alert(alert.clone(), self.alert_history_limit);
                    raised.push(alert);
                }
            }
        }

        raised
    }
}
