use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

use crate::controller::{AppState, Summary};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: &'static str,
    timestamp: chrono::DateTime<chrono::Utc>,
    version: &'static str,
    network: Summary,
    subscribers: usize,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let network = state.controller.summary();
    let status = if network.transformers > 0 { "healthy" } else { "degraded" };
    tracing::debug!(status, transformers = network.transformers, "Health check completed");

    (
        StatusCode::OK,
        Json(HealthResponse {
            status,
            timestamp: chrono::Utc::now(),
            version: env!("CARGO_PKG_VERSION"),
            network,
            subscribers: state.notifier.subscriber_count(),
        }),
    )
}

/// GET /health/live
pub async fn liveness_check() -> impl IntoResponse {
    StatusCode::OK
}
