//! Cost optimizer agent
//!
//! Long-running daemon: monitors every configured provider's resources,
//! raises threshold alerts and serves recommendations over HTTP.

use anyhow::{Context, Result};
use optimizer_agent::{api, config::AgentConfig};
use optimizer_lib::{
    health::{components, HealthRegistry},
    monitor::MonitorSchedulerBuilder,
    observability::StructuredLogger,
    CloudProvider, InstanceCatalog, InventoryProvider, OptimizationService, RecommendationEngine,
};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const OPTIMIZER_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting optimizer-agent");

    let config = AgentConfig::load()?;
    info!(
        api_port = config.api_port,
        monitor_interval_secs = config.monitor_interval_secs,
        inventories = config.inventory_paths.len(),
        "Agent configured"
    );

    let health_registry = HealthRegistry::new();
    health_registry.register(components::MONITOR).await;
    health_registry.register(components::PROVIDERS).await;
    health_registry.register(components::ANALYZER).await;

    let catalog = Arc::new(match &config.catalog_path {
        Some(path) => InstanceCatalog::from_json_file(path)?,
        None => InstanceCatalog::default(),
    });

    let mut providers: Vec<Arc<dyn CloudProvider>> = Vec::new();
    for path in &config.inventory_paths {
        let provider = InventoryProvider::from_file(path)
            .await
            .with_context(|| format!("Failed to load inventory {}", path.display()))?;
        info!(provider = %provider.name(), path = %path.display(), "Loaded inventory");
        providers.push(Arc::new(provider));
    }
    if providers.is_empty() {
        warn!("No inventories configured, nothing will be monitored");
    }

    let logger = StructuredLogger::new("agent");
    logger.log_startup(OPTIMIZER_VERSION, providers.len(), config.alert_rules.len());

    let scheduler = Arc::new(
        MonitorSchedulerBuilder::new()
            .providers(providers.iter().cloned())
            .rules(config.alert_rules.clone())
            .interval(config.monitor_interval())
            .alert_history_limit(config.alert_history_limit)
            .health(health_registry.clone())
            .build()?,
    );

    let service = Arc::new(
        OptimizationService::new(
            providers,
            RecommendationEngine::new(Arc::clone(&catalog), config.policy()),
        )
        .with_health(health_registry.clone()),
    );

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let monitor_handle = tokio::spawn(Arc::clone(&scheduler).run(shutdown_rx));

    let app_state = Arc::new(api::AppState::new(
        health_registry.clone(),
        scheduler,
        service,
        catalog,
    ));

    health_registry.set_ready(true).await;

    let api_handle = tokio::spawn(api::serve(config.api_port, app_state));

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result?;
            logger.log_shutdown("SIGINT received");
        }
        result = api_handle => {
            logger.log_shutdown("API server stopped");
            result??;
        }
    }

    health_registry.set_ready(false).await;
    let _ = shutdown_tx.send(());
    monitor_handle.await?;
    info!("Shutdown complete");

    Ok(())
}
