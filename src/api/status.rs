//! Status and health endpoints for liverelay

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;

use super::{AppState, HealthResponse, HealthStatus, StatusResponse};

/// Service status handler
///
/// Reports the upstream session snapshot and subscriber count.
pub async fn service_status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        service: "liverelay",
        version: env!("CARGO_PKG_VERSION"),
        session: state.sessions.status().await,
        subscribers: state.gateway.connection_count(),
    })
}

/// Liveness check handler
pub async fn health_check() -> impl IntoResponse {
    let status = HealthStatus::Healthy;
    (
        status.to_status_code(),
        Json(HealthResponse {
            status,
            timestamp: Utc::now(),
        }),
    )
}
