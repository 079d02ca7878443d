//! Cloud Cost Optimizer CLI
//!
//! Queries a running optimizer agent for rightsizing recommendations,
//! monitored metrics, alerts and spend.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{costs, monitor, recommendations, status};

#[derive(Parser)]
#[command(name = "coopt")]
#[command(author, version, about = "CLI for Cloud Cost Optimizer", long_about = None)]
pub struct Cli {
    /// Agent URL (also COOPT_API_URL, then the config file)
    #[arg(long, env = "COOPT_API_URL")]
    pub api_url: Option<String>,

    /// Output format
    #[arg(long, short)]
    pub format: Option<output::OutputFormat>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(flatten)]
    Query(QueryCommands),

    /// Manage the CLI config file
    #[command(subcommand)]
    Config(ConfigCommands),
}

/// Commands that talk to the agent
#[derive(Subcommand)]
pub enum QueryCommands {
    /// Rightsizing recommendation for one resource
    Recommend {
        resource_id: String,

        /// Observation window in days (agent policy default if omitted)
        #[arg(long, short)]
        days: Option<u32>,
    },

    /// Recommendations for every resource
    Recommendations {
        #[arg(long, short)]
        days: Option<u32>,

        /// Only show this priority (high, medium, low)
        #[arg(long, short)]
        priority: Option<String>,
    },

    /// Latest monitored metrics
    Metrics {
        /// Show a single resource
        resource_id: Option<String>,
    },

    /// Alert history of a resource
    Alerts {
        resource_id: String,

        /// Show at most this many of the newest alerts
        #[arg(long, short)]
        limit: Option<usize>,
    },

    /// Spend by service
    Costs {
        #[arg(long, short, default_value_t = 30)]
        days: u32,
    },

    /// Instance types available for rightsizing
    Catalog,

    /// Agent health and readiness
    Status,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the effective configuration
    Show,

    /// Store the agent URL
    SetUrl { url: String },

    /// Store the default output format
    SetFormat { format: output::OutputFormat },

    /// Store the default observation window
    SetDays { days: u32 },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run(Cli::parse()).await {
        output::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut cfg = config::Config::load()?;
    let format = cli.format.or(cfg.default_format).unwrap_or_default();

    match cli.command {
        Commands::Config(cmd) => configure(&mut cfg, cmd, cli.api_url, format),
        Commands::Query(query) => {
            let client = client::ApiClient::new(&cfg.resolve_api_url(cli.api_url))?;
            execute(&client, query, cfg.default_days, format).await
        }
    }
}

async fn execute(
    client: &client::ApiClient,
    query: QueryCommands,
    default_days: Option<u32>,
    format: output::OutputFormat,
) -> Result<()> {
    match query {
        QueryCommands::Recommend { resource_id, days } => {
            recommendations::show_recommendation(client, &resource_id, days.or(default_days), format)
                .await
        }
        QueryCommands::Recommendations { days, priority } => {
            recommendations::list_recommendations(client, days.or(default_days), priority, format)
                .await
        }
        QueryCommands::Metrics { resource_id } => {
            monitor::show_metrics(client, resource_id, format).await
        }
        QueryCommands::Alerts { resource_id, limit } => {
            monitor::show_alerts(client, &resource_id, limit, format).await
        }
        QueryCommands::Costs { days } => costs::show_costs(client, Some(days), format).await,
        QueryCommands::Catalog => costs::show_catalog(client, format).await,
        QueryCommands::Status => status::show_status(client, format).await,
    }
}

fn configure(
    cfg: &mut config::Config,
    cmd: ConfigCommands,
    api_url: Option<String>,
    format: output::OutputFormat,
) -> Result<()> {
    match cmd {
        ConfigCommands::Show => {
            let effective = serde_json::json!({
                "path": config::Config::config_path()?,
                "api_url": cfg.resolve_api_url(api_url),
                "default_format": format,
                "default_days": cfg.default_days,
            });
            output::print_json(&effective)?;
            return Ok(());
        }
        ConfigCommands::SetUrl { url } => {
            client::ApiClient::new(&url)?;
            cfg.api_url = Some(url);
        }
        ConfigCommands::SetFormat { format } => cfg.default_format = Some(format),
        ConfigCommands::SetDays { days } => cfg.default_days = Some(days),
    }

    let path = cfg.save()?;
    output::print_success(&format!("Saved {}", path.display()));
    Ok(())
}
