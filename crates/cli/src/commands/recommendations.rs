//! Recommendation commands

use anyhow::Result;
use colored::Colorize;
use tabled::Tabled;

use crate::client::{ApiClient, Recommendation};
use crate::output::{
    color_priority, color_saving, format_currency, print_json, print_rows, print_success,
    OutputFormat,
};

#[derive(Tabled)]
struct RecommendationRow {
    #[tabled(rename = "Resource")]
    resource_id: String,
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Current")]
    current: String,
    #[tabled(rename = "Recommended")]
    recommended: String,
    #[tabled(rename = "Monthly Saving")]
    saving: String,
    #[tabled(rename = "Priority")]
    priority: String,
}

impl From<&Recommendation> for RecommendationRow {
    fn from(r: &Recommendation) -> Self {
        Self {
            resource_id: r.resource_id.clone(),
            action: r.action.clone(),
            current: r.current_spec.name.clone(),
            recommended: r.recommended_spec.name.clone(),
            saving: color_saving(r.projected_monthly_saving),
            priority: color_priority(&r.priority),
        }
    }
}

/// Recommendation for a single resource
pub async fn show_recommendation(
    client: &ApiClient,
    resource_id: &str,
    days: Option<u32>,
    format: OutputFormat,
) -> Result<()> {
    let recommendation = client.recommendation(resource_id, days).await?;

    if format == OutputFormat::Json {
        return print_json(&recommendation);
    }

    let Some(rec) = recommendation else {
        print_success(&format!("{} is right-sized, no change recommended", resource_id));
        return Ok(());
    };

    println!("{}", "Rightsizing Recommendation".bold());
    println!("{}", "=".repeat(50));
    println!("Resource:        {}", rec.resource_id.cyan());
    println!("Action:          {}", rec.action);
    println!(
        "Current type:    {} ({} vCPU, {} GiB, {})",
        rec.current_spec.name,
        rec.current_spec.vcpu,
        rec.current_spec.memory_gb,
        format_currency(rec.current_monthly_cost, "USD")
    );
    println!(
        "Recommended:     {} ({} vCPU, {} GiB)",
        rec.recommended_spec.name.green(),
        rec.recommended_spec.vcpu,
        rec.recommended_spec.memory_gb
    );
    println!("Monthly saving:  {}", color_saving(rec.projected_monthly_saving));
    println!("Priority:        {}", color_priority(&rec.priority));
    println!("Reason:          {}", rec.reason);

    Ok(())
}

/// Recommendations across every monitored resource
pub async fn list_recommendations(
    client: &ApiClient,
    days: Option<u32>,
    priority: Option<String>,
    format: OutputFormat,
) -> Result<()> {
    let mut recommendations = client.recommendations(days).await?;
    if let Some(priority) = &priority {
        recommendations.retain(|r| r.priority.eq_ignore_ascii_case(priority));
    }
    recommendations.sort_by(|a, b| b.projected_monthly_saving.total_cmp(&a.projected_monthly_saving));

    let rows: Vec<RecommendationRow> = recommendations.iter().map(Into::into).collect();
    print_rows(&recommendations, rows, format, "No recommendations found")?;

    if format == OutputFormat::Table && !recommendations.is_empty() {
        let total: f64 = recommendations
            .iter()
            .map(|r| r.projected_monthly_saving)
            .filter(|s| *s > 0.0)
            .sum();
        println!(
            "\nTotal: {} recommendations, {} potential monthly savings",
            recommendations.len(),
            format_currency(total, "USD").green()
        );
    }

    Ok(())
}
