//! Output formatting utilities

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use colored::Colorize;
use serde::{Deserialize, Serialize};
use tabled::{settings::Style, Table, Tabled};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

/// Print rows as a rounded table, or `items` as JSON
pub fn print_rows<T: Serialize, R: Tabled>(
    items: &T,
    rows: Vec<R>,
    format: OutputFormat,
    empty_message: &str,
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => print_json(items)?,
        OutputFormat::Table => {
            if rows.is_empty() {
                print_warning(empty_message);
            } else {
                println!("{}", Table::new(rows).with(Style::rounded()));
            }
        }
    }
    Ok(())
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

pub fn format_currency(amount: f64, currency: &str) -> String {
    let sign = if amount < 0.0 { "-" } else { "" };
    let amount = amount.abs();
    match currency {
        "USD" => format!("{}${:.2}", sign, amount),
        "EUR" => format!("{}€{:.2}", sign, amount),
        "GBP" => format!("{}£{:.2}", sign, amount),
        _ => format!("{}{:.2} {}", sign, amount, currency),
    }
}

/// Negative savings (upsizes) are a cost increase
pub fn color_saving(amount: f64) -> String {
    let formatted = format_currency(amount, "USD");
    if amount > 0.0 {
        formatted.green().to_string()
    } else if amount < 0.0 {
        formatted.red().to_string()
    } else {
        formatted
    }
}

pub fn color_priority(priority: &str) -> String {
    match priority.to_uppercase().as_str() {
        "HIGH" => priority.red().bold().to_string(),
        "MEDIUM" => priority.yellow().to_string(),
        "LOW" => priority.green().to_string(),
        _ => priority.to_string(),
    }
}

pub fn color_status(status: &str) -> String {
    match status.to_lowercase().as_str() {
        "healthy" | "ready" => status.green().to_string(),
        "degraded" => status.yellow().to_string(),
        "unhealthy" | "not ready" => status.red().to_string(),
        _ => status.to_string(),
    }
}

pub fn format_percent(value: f64) -> String {
    format!("{:.1}%", value)
}

pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M").to_string()
}
