//! Agent status command

use anyhow::Result;
use colored::Colorize;
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{color_status, print_info, print_json, OutputFormat};

#[derive(Tabled)]
struct ComponentRow {
    #[tabled(rename = "Component")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Message")]
    message: String,
}

pub async fn show_status(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let health = client.health().await?;
    let readiness = client.readiness().await?;

    if format == OutputFormat::Json {
        return print_json(&serde_json::json!({
            "health": health,
            "readiness": readiness,
        }));
    }

    println!("{}", "Optimizer Agent".bold());
    println!("{}", "=".repeat(50));
    println!("Endpoint:  {}", client.base_url().as_str().cyan());
    println!("Health:    {}", color_status(&health.status));
    let ready = if readiness.ready { "ready" } else { "not ready" };
    println!("Readiness: {}", color_status(ready));
    if let Some(reason) = &readiness.reason {
        print_info(reason);
    }
    println!();

    let rows: Vec<ComponentRow> = health
        .components
        .iter()
        .map(|(name, c)| ComponentRow {
            name: name.clone(),
            status: color_status(&c.status),
            message: c.message.clone().unwrap_or_default(),
        })
        .collect();
    println!(
        "{}",
        tabled::Table::new(rows).with(tabled::settings::Style::rounded())
    );

    Ok(())
}
