//! API layer - routes, handlers, and middleware

pub mod handlers;
pub mod middleware;

use crate::state::AppState;
use axum::{
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde_json::json;
use std::time::{Duration, UNIX_EPOCH};

const READY_TIMEOUT: Duration = Duration::from_secs(2);

pub fn create_router(state: AppState) -> Router {
    let body_limit = state.config.server.body_limit;
    let cors_origins = state.config.server.cors_origins.clone();

    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness))
        .route("/metrics", get(handlers::metrics_handler))
        .route("/api/search/variant", post(handlers::search_variant))
        .with_state(state)
        // Applied in reverse order
        .layer(axum::middleware::from_fn(middleware::request_id_middleware))
        .layer(axum::middleware::from_fn(middleware::metrics_middleware))
        .layer(middleware::compression())
        .layer(middleware::cors(&cors_origins))
        .layer(DefaultBodyLimit::max(body_limit))
}

async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "togovar-server",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Ready once the backend answers; reports the reference data age.
async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    let loaded_at = state
        .registry
        .snapshot()
        .loaded_at
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    let backend = match tokio::time::timeout(READY_TIMEOUT, state.backend.ping()).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(e.to_string()),
        Err(_) => Err("timed out".to_string()),
    };

    match backend {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "status": "ready", "registry_loaded_at": loaded_at })),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "unavailable",
                    "backend": e,
                    "registry_loaded_at": loaded_at
                })),
            )
        }
    }
}
