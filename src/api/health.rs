/// Health check and metrics endpoints
///
/// `/health` answers without touching any backing service. `/health/detailed`
/// pings every enabled source.

use crate::{context::AppContext, metrics, sources::DataSource};
use axum::{extract::State, http::StatusCode, response::Json, routing::get, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

/// Health status response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    /// Overall status: "healthy", "degraded", or "unhealthy"
    pub status: String,

    /// Application version
    pub version: String,

    /// Individual source checks
    pub checks: Vec<ComponentHealth>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Health status of one source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub name: String,

    /// Status: "healthy" or "unhealthy"
    pub status: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time_ms: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Build health check routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/health", get(health_basic))
        .route("/health/detailed", get(health_detailed))
        .route("/metrics", get(metrics_handler))
}

/// Basic health check
pub async fn health_basic() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Ping every enabled source
pub async fn health_detailed(State(ctx): State<AppContext>) -> (StatusCode, Json<HealthStatus>) {
    let start = Instant::now();
    let timeout = ctx.config.source_timeout();

    let checks =
        futures::future::join_all(ctx.sources.iter().map(|s| check_source(s.clone(), timeout)))
            .await;

    let overall_status = determine_overall_status(&checks);

    let health = HealthStatus {
        status: overall_status.clone(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks,
        message: match overall_status.as_str() {
            "healthy" => None,
            "degraded" => Some("Some sources are unavailable".to_string()),
            _ => Some("No source is available".to_string()),
        },
    };

    let status_code = match overall_status.as_str() {
        "unhealthy" => StatusCode::SERVICE_UNAVAILABLE,
        // Degraded still serves lookups from the remaining sources
        _ => StatusCode::OK,
    };

    tracing::info!(
        status = %overall_status,
        duration_ms = start.elapsed().as_millis(),
        "health_check_completed"
    );

    (status_code, Json(health))
}

/// Prometheus text exposition
pub async fn metrics_handler() -> String {
    metrics::render_metrics()
}

async fn check_source(source: Arc<dyn DataSource>, timeout: std::time::Duration) -> ComponentHealth {
    let start = Instant::now();

    let error = match tokio::time::timeout(timeout, source.ping()).await {
        Ok(Ok(_)) => None,
        Ok(Err(e)) => Some(e.to_string()),
        Err(_) => Some(format!("no response within {}ms", timeout.as_millis())),
    };

    ComponentHealth {
        name: source.id().to_string(),
        status: if error.is_none() { "healthy" } else { "unhealthy" }.to_string(),
        response_time_ms: Some(start.elapsed().as_millis() as u64),
        error,
    }
}

/// Overall status: all sources down is unhealthy, some down is degraded
fn determine_overall_status(checks: &[ComponentHealth]) -> String {
    let unhealthy_count = checks.iter().filter(|c| c.status == "unhealthy").count();

    if !checks.is_empty() && unhealthy_count == checks.len() {
        "unhealthy".to_string()
    } else if unhealthy_count > 0 {
        "degraded".to_string()
    } else {
        "healthy".to_string()
    }
}
