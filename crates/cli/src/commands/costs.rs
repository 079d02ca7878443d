//! Cost and catalog commands

use anyhow::Result;
use colored::Colorize;
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{format_currency, print_json, print_rows, OutputFormat};

#[derive(Tabled)]
struct ServiceCostRow {
    #[tabled(rename = "Service")]
    service: String,
    #[tabled(rename = "Cost")]
    cost: String,
    #[tabled(rename = "Share")]
    share: String,
}

#[derive(Tabled)]
struct CatalogRow {
    #[tabled(rename = "Type")]
    name: String,
    #[tabled(rename = "vCPU")]
    vcpu: u32,
    #[tabled(rename = "Memory (GiB)")]
    memory_gb: f64,
    #[tabled(rename = "Hourly")]
    hourly: String,
    #[tabled(rename = "Monthly")]
    monthly: String,
}

/// Spend over the last `days`, broken down by service
pub async fn show_costs(client: &ApiClient, days: Option<u32>, format: OutputFormat) -> Result<()> {
    let summary = client.costs(days).await?;

    if format == OutputFormat::Json {
        return print_json(&summary);
    }

    println!("{}", "Cost Summary".bold());
    println!("{}", "=".repeat(50));
    println!(
        "Period:   {} to {}",
        summary.start.format("%Y-%m-%d"),
        summary.end.format("%Y-%m-%d")
    );
    println!(
        "Total:    {}",
        format_currency(summary.total, &summary.currency).cyan()
    );
    println!("Records:  {}", summary.record_count);
    println!();

    let mut services: Vec<_> = summary.by_service.iter().collect();
    services.sort_by(|a, b| b.1.total_cmp(a.1));
    let rows = services
        .into_iter()
        .map(|(service, amount)| ServiceCostRow {
            service: service.clone(),
            cost: format_currency(*amount, &summary.currency),
            share: if summary.total > 0.0 {
                format!("{:.1}%", amount / summary.total * 100.0)
            } else {
                "-".to_string()
            },
        })
        .collect();

    print_rows(&summary, rows, format, "No cost records in this period")
}

/// Instance types the engine chooses from
pub async fn show_catalog(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let catalog = client.catalog().await?;

    let rows = catalog
        .iter()
        .map(|t| CatalogRow {
            name: t.name.clone(),
            vcpu: t.vcpu,
            memory_gb: t.memory_gb,
            hourly: format!("${:.4}", t.price_per_hour),
            monthly: format_currency(t.price_per_hour * 720.0, "USD"),
        })
        .collect();

    print_rows(&catalog, rows, format, "Catalog is empty")
}
