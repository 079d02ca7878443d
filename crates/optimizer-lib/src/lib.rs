//! Cloud cost optimizer library
//!
//! This crate provides the core functionality for:
//! - Usage aggregation and rightsizing recommendations
//! - Resource monitoring with threshold alerts
//! - The cloud provider capability and a file-backed inventory provider
//! - Health checks and observability

pub mod analysis;
pub mod catalog;
pub mod error;
pub mod health;
pub mod models;
pub mod monitor;
pub mod observability;
pub mod provider;

pub use analysis::{CostSummary, OptimizationService, RecommendationEngine, UsageAggregator};
pub use catalog::InstanceCatalog;
pub use error::{AnalysisError, ProviderError};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use monitor::{MonitorScheduler, MonitorSchedulerBuilder, ResourceMetrics};
pub use observability::{OptimizerMetrics, StructuredLogger};
pub use provider::{CloudProvider, InventoryProvider};
