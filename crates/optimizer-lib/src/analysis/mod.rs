//! Rightsizing analysis
//!
//! This module provides:
//! - Usage aggregation from provider metric series
//! - The rule-driven recommendation engine
//! - The on-demand optimization service
//! - Cost summaries

mod aggregator;
mod costs;
mod engine;
mod service;

pub use aggregator::{mean_of_series, UsageAggregator, UsageMetric, HOURLY_GRANULARITY, USAGE_METRICS};
pub use costs::CostSummary;
pub use engine::RecommendationEngine;
pub use service::OptimizationService;
