/// HTTP server setup and routing
use crate::{
    context::AppContext,
    error::{RegistryError, RegistryResult},
    rate_limit::{rate_limit_middleware, track_http_metrics},
};
use axum::{
    http::{header, Method, StatusCode},
    middleware,
    response::Json,
    Router,
};
use serde_json::json;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

/// Build the main application router
/// Returns Router<()> because state is already provided
pub fn build_router(ctx: AppContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .merge(crate::api::routes())
        // Route layer so the matched path is known when labelling
        .route_layer(middleware::from_fn(track_http_metrics))
        .with_state(ctx.clone())
        .layer(middleware::from_fn_with_state(ctx, rate_limit_middleware))
        .layer(cors)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .fallback(not_found)
}

/// 404 handler
async fn not_found() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "NotFound",
            "message": "Endpoint not found"
        })),
    )
}

/// Start the HTTP server
///
/// Ctrl-C fires the context's shutdown token, cancelling in-flight
/// resolutions, then drains connections.
pub async fn serve(ctx: AppContext) -> RegistryResult<()> {
    let addr = format!("{}:{}", ctx.config.service.hostname, ctx.config.service.port);

    info!("Writing registry listening on {}", addr);
    info!("   Contract: {} (chain {})", ctx.config.chain.contract_address, ctx.config.chain.chain_id);

    let shutdown = ctx.shutdown.clone();
    let app = build_router(ctx);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| RegistryError::Internal(format!("Failed to bind to {}: {}", addr, e)))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutdown requested");
            }
            shutdown.cancel();
        })
        .await
        .map_err(|e| RegistryError::Internal(format!("Server error: {}", e)))?;

    Ok(())
}
