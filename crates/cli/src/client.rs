//! API client for the optimizer agent

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use url::Url;

pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        // Without a trailing slash, join() would replace the last path segment
        let mut base_url = Url::parse(base_url).context("Invalid API URL")?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// URL of `segments` under the base URL. Each segment is
    /// percent-encoded, so ids containing `/`, `?` or `#` stay one segment.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("API URL cannot carry a path: {}", self.base_url))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// GET `url`, failing on any non-2xx status
    pub async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        let (status, body) = self.get_raw(url).await?;
        if !status.is_success() {
            anyhow::bail!("API error ({}): {}", status, error_message(&body));
        }
        serde_json::from_str(&body).context("Failed to parse response")
    }

    /// GET `url`, also accepting `accepted` statuses whose body carries
    /// the same payload (health endpoints answer 503 with a report)
    pub async fn get_accepting<T: DeserializeOwned>(
        &self,
        url: Url,
        accepted: &[StatusCode],
    ) -> Result<(StatusCode, T)> {
        let (status, body) = self.get_raw(url).await?;
        if !status.is_success() && !accepted.contains(&status) {
            anyhow::bail!("API error ({}): {}", status, error_message(&body));
        }
        let parsed = serde_json::from_str(&body).context("Failed to parse response")?;
        Ok((status, parsed))
    }

    async fn get_raw(&self, url: Url) -> Result<(StatusCode, String)> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        let status = response.status();
        let body = response.text().await.context("Failed to read response")?;
        Ok((status, body))
    }

    pub async fn recommendation(&self, resource_id: &str, days: Option<u32>) -> Result<Option<Recommendation>> {
        let url = self.endpoint(&["api", "v1", "resources", resource_id, "recommendation"])?;
        self.get(with_days(url, days)).await
    }

    pub async fn recommendations(&self, days: Option<u32>) -> Result<Vec<Recommendation>> {
        let url = self.endpoint(&["api", "v1", "recommendations"])?;
        self.get(with_days(url, days)).await
    }

    pub async fn all_metrics(&self) -> Result<HashMap<String, ResourceMetrics>> {
        self.get(self.endpoint(&["api", "v1", "resources", "metrics"])?)
            .await
    }

    pub async fn resource_metrics(&self, resource_id: &str) -> Result<ResourceMetrics> {
        self.get(self.endpoint(&["api", "v1", "resources", resource_id, "metrics"])?)
            .await
    }

    pub async fn alerts(&self, resource_id: &str) -> Result<Vec<Alert>> {
        self.get(self.endpoint(&["api", "v1", "resources", resource_id, "alerts"])?)
            .await
    }

    pub async fn catalog(&self) -> Result<Vec<InstanceSpec>> {
        self.get(self.endpoint(&["api", "v1", "catalog"])?).await
    }

    pub async fn costs(&self, days: Option<u32>) -> Result<CostSummary> {
        let url = self.endpoint(&["api", "v1", "costs"])?;
        self.get(with_days(url, days)).await
    }

    pub async fn health(&self) -> Result<HealthResponse> {
        let (_, health) = self
            .get_accepting(self.endpoint(&["healthz"])?, &[StatusCode::SERVICE_UNAVAILABLE])
            .await?;
        Ok(health)
    }

    pub async fn readiness(&self) -> Result<ReadinessResponse> {
        let (_, readiness) = self
            .get_accepting(self.endpoint(&["readyz"])?, &[StatusCode::SERVICE_UNAVAILABLE])
            .await?;
        Ok(readiness)
    }
}

fn with_days(mut url: Url, days: Option<u32>) -> Url {
    if let Some(days) = days {
        url.query_pairs_mut().append_pair("days", &days.to_string());
    }
    url
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorResponse>(body)
        .map(|e| e.error)
        .unwrap_or_else(|_| body.to_string())
}

// API response types

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceSpec {
    pub name: String,
    pub vcpu: u32,
    pub memory_gb: f64,
    pub price_per_hour: f64,
    #[serde(default)]
    pub generation: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub resource_id: String,
    pub resource_type: String,
    pub current_spec: InstanceSpec,
    pub recommended_spec: InstanceSpec,
    pub action: String,
    pub reason: String,
    pub projected_monthly_saving: f64,
    pub current_monthly_cost: f64,
    pub priority: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub timestamp: DateTime<Utc>,
    pub resource_id: String,
    pub metric: String,
    pub value: f64,
    pub threshold: f64,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceMetrics {
    pub resource_id: String,
    pub provider: String,
    pub metrics: HashMap<String, f64>,
    pub last_updated: DateTime<Utc>,
    #[serde(default)]
    pub alert_history: Vec<Alert>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostSummary {
    pub total: f64,
    pub currency: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub by_service: BTreeMap<String, f64>,
    #[serde(default)]
    pub record_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub last_check_timestamp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub components: BTreeMap<String, ComponentHealth>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
