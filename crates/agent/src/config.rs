//! Agent configuration
//!
//! Layered from an optional file (path in `OPTIMIZER_CONFIG`, default
//! `optimizer` with any supported extension) and `OPTIMIZER_*` environment
//! variables. Environment wins.

use anyhow::{Context, Result};
use optimizer_lib::monitor::{default_rules, AlertRule, DEFAULT_ALERT_HISTORY_LIMIT};
use optimizer_lib::{CandidateSelection, RightsizingPolicy};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

const ENV_PREFIX: &str = "OPTIMIZER";
const DEFAULT_CONFIG_FILE: &str = "optimizer";

#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// Port for health, metrics and query endpoints
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    #[serde(default = "default_monitor_interval")]
    pub monitor_interval_secs: u64,

    #[serde(default = "default_observation_period")]
    pub observation_period_days: u32,

    #[serde(default = "default_min_percent")]
    pub min_cpu_percent: f64,
    #[serde(default = "default_max_percent")]
    pub max_cpu_percent: f64,
    #[serde(default = "default_min_percent")]
    pub min_memory_percent: f64,
    #[serde(default = "default_max_percent")]
    pub max_memory_percent: f64,

    #[serde(default)]
    pub candidate_selection: CandidateSelection,

    #[serde(default = "default_alert_history_limit")]
    pub alert_history_limit: usize,

    /// Inventory documents, one provider each
    #[serde(default)]
    pub inventory_paths: Vec<PathBuf>,

    /// Instance catalog override; the built-in t3 family otherwise
    #[serde(default)]
    pub catalog_path: Option<PathBuf>,

    #[serde(default = "default_rules")]
    pub alert_rules: Vec<AlertRule>,
}

fn default_api_port() -> u16 {
    8080
}

fn default_monitor_interval() -> u64 {
    300
}

fn default_observation_period() -> u32 {
    14
}

fn default_min_percent() -> f64 {
    20.0
}

fn default_max_percent() -> f64 {
    80.0
}

fn default_alert_history_limit() -> usize {
    DEFAULT_ALERT_HISTORY_LIMIT
}

impl AgentConfig {
    /// Load from the file named by `OPTIMIZER_CONFIG` and the environment
    pub fn load() -> Result<Self> {
        let file = std::env::var(format!("{}_CONFIG", ENV_PREFIX))
            .unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        Self::load_from(&file)
    }

    /// Load from `file` (optional on disk) and the environment
    pub fn load_from(file: &str) -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(file).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("inventory_paths"),
            )
            .build()
            .with_context(|| format!("Failed to read configuration from {}", file))?;

        let parsed: Self = config
            .try_deserialize()
            .context("Invalid optimizer configuration")?;
        parsed.validate()?;
        Ok(parsed)
    }

    fn validate(&self) -> Result<()> {
        if self.monitor_interval_secs == 0 {
            anyhow::bail!("monitor_interval_secs must be greater than zero");
        }
        if self.min_cpu_percent > self.max_cpu_percent
            || self.min_memory_percent > self.max_memory_percent
        {
            anyhow::bail!("Minimum utilization thresholds must not exceed the maximums");
        }
        Ok(())
    }

    pub fn monitor_interval(&self) -> Duration {
        Duration::from_secs(self.monitor_interval_secs)
    }

    pub fn policy(&self) -> RightsizingPolicy {
        RightsizingPolicy {
            min_cpu_percent: self.min_cpu_percent,
            max_cpu_percent: self.max_cpu_percent,
            min_memory_percent: self.min_memory_percent,
            max_memory_percent: self.max_memory_percent,
            observation_period_days: self.observation_period_days,
            candidate_selection: self.candidate_selection,
        }
    }
}
