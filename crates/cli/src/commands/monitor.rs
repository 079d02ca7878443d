//! Monitored metrics and alert commands

use anyhow::Result;
use colored::Colorize;
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{format_percent, format_timestamp, print_json, print_rows, OutputFormat};

#[derive(Tabled)]
struct ResourceRow {
    #[tabled(rename = "Resource")]
    resource_id: String,
    #[tabled(rename = "Provider")]
    provider: String,
    #[tabled(rename = "Metrics")]
    metrics: String,
    #[tabled(rename = "Alerts")]
    alerts: usize,
    #[tabled(rename = "Updated")]
    last_updated: String,
}

#[derive(Tabled)]
struct AlertRow {
    #[tabled(rename = "Time")]
    timestamp: String,
    #[tabled(rename = "Metric")]
    metric: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Threshold")]
    threshold: String,
    #[tabled(rename = "Description")]
    description: String,
}

fn format_metrics(metrics: &std::collections::HashMap<String, f64>) -> String {
    let mut pairs: Vec<_> = metrics.iter().collect();
    pairs.sort_by(|a, b| a.0.cmp(b.0));
    pairs
        .iter()
        .map(|(name, value)| {
            if name.ends_with("Utilization") {
                format!("{}={}", name, format_percent(**value))
            } else {
                format!("{}={:.2}", name, value)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Latest metrics for one resource, or all of them
pub async fn show_metrics(
    client: &ApiClient,
    resource_id: Option<String>,
    format: OutputFormat,
) -> Result<()> {
    let mut entries: Vec<_> = match &resource_id {
        Some(id) => vec![client.resource_metrics(id).await?],
        None => client.all_metrics().await?.into_values().collect(),
    };
    entries.sort_by(|a, b| a.resource_id.cmp(&b.resource_id));

    if format == OutputFormat::Json && resource_id.is_some() {
        return print_json(&entries[0]);
    }

    let rows = entries
        .iter()
        .map(|e| ResourceRow {
            resource_id: e.resource_id.clone(),
            provider: e.provider.clone(),
            metrics: format_metrics(&e.metrics),
            alerts: e.alert_history.len(),
            last_updated: format_timestamp(&e.last_updated),
        })
        .collect();

    print_rows(&entries, rows, format, "No resources monitored yet")
}

/// Alert history of one resource, newest first
pub async fn show_alerts(
    client: &ApiClient,
    resource_id: &str,
    limit: Option<usize>,
    format: OutputFormat,
) -> Result<()> {
    let mut alerts = client.alerts(resource_id).await?;
    alerts.reverse();
    if let Some(limit) = limit {
        alerts.truncate(limit);
    }

    let rows = alerts
        .iter()
        .map(|a| AlertRow {
            timestamp: format_timestamp(&a.timestamp),
            metric: a.metric.clone(),
            value: format!("{:.2}", a.value).red().to_string(),
            threshold: format!("{:.2}", a.threshold),
            description: a.description.clone(),
        })
        .collect();

    print_rows(&alerts, rows, format, "No alerts raised for this resource")
}
