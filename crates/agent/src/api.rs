//! HTTP API for health checks, Prometheus metrics and read-only queries

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use optimizer_lib::{
    health::{ComponentStatus, HealthRegistry},
    monitor::MonitorScheduler,
    observability::OptimizerMetrics,
    AnalysisError, InstanceCatalog, OptimizationService,
};
use prometheus::{Encoder, TextEncoder};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info};

const DEFAULT_COST_DAYS: u32 = 30;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub health_registry: HealthRegistry,
    pub metrics: OptimizerMetrics,
    pub scheduler: Arc<MonitorScheduler>,
    pub service: Arc<OptimizationService>,
    pub catalog: Arc<InstanceCatalog>,
}

impl AppState {
    pub fn new(
        health_registry: HealthRegistry,
        scheduler: Arc<MonitorScheduler>,
        service: Arc<OptimizationService>,
        catalog: Arc<InstanceCatalog>,
    ) -> Self {
        Self {
            health_registry,
            metrics: OptimizerMetrics::new(),
            scheduler,
            service,
            catalog,
        }
    }
}

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Upstream(String),
    Internal(String),
}

impl From<AnalysisError> for ApiError {
    fn from(err: AnalysisError) -> Self {
        match err {
            AnalysisError::ResourceNotFound(id) => {
                ApiError::NotFound(format!("Resource {} not found", id))
            }
            err @ AnalysisError::InvalidWindow { .. } => ApiError::BadRequest(err.to_string()),
            other => ApiError::Upstream(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Upstream(msg) => {
                error!(error = %msg, "Provider request failed");
                (StatusCode::BAD_GATEWAY, msg)
            }
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct WindowQuery {
    pub days: Option<u32>,
}

/// 200 while healthy or degraded, 503 when unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy | ComponentStatus::Degraded => StatusCode::OK,
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

async fn metrics() -> Result<impl IntoResponse, ApiError> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder
        .encode(&prometheus::gather(), &mut buffer)
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok((
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    ))
}

async fn all_resource_metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.scheduler.get_all_metrics().await)
}

async fn resource_metrics(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .scheduler
        .get_metrics(&id)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("No metrics for resource {}", id)))
}

async fn resource_alerts(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .scheduler
        .get_metrics(&id)
        .await
        .map(|entry| Json(entry.alert_history))
        .ok_or_else(|| ApiError::NotFound(format!("No metrics for resource {}", id)))
}

/// `null` body when no change is recommended
async fn resource_recommendation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<WindowQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let recommendation = state
        .service
        .compute_recommendation(&id, query.days.unwrap_or(0))
        .await?;
    Ok(Json(recommendation))
}

async fn recommendations(
    State(state): State<Arc<AppState>>,
    Query(query): Query<WindowQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let recommendations = state.service.recommend_all(query.days.unwrap_or(0)).await?;
    Ok(Json(recommendations))
}

async fn catalog(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.catalog.iter().cloned().collect::<Vec<_>>())
}

async fn costs(
    State(state): State<Arc<AppState>>,
    Query(query): Query<WindowQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let summary = state
        .service
        .cost_summary(query.days.unwrap_or(DEFAULT_COST_DAYS))
        .await?;
    Ok(Json(summary))
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/api/v1/resources/metrics", get(all_resource_metrics))
        .route("/api/v1/resources/:id/metrics", get(resource_metrics))
        .route("/api/v1/resources/:id/alerts", get(resource_alerts))
        .route(
            "/api/v1/resources/:id/recommendation",
            get(resource_recommendation),
        )
        .route("/api/v1/recommendations", get(recommendations))
        .route("/api/v1/catalog", get(catalog))
        .route("/api/v1/costs", get(costs))
        .with_state(state)
}

pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
