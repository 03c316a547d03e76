//! API module for liverelay
//!
//! This module contains the HTTP endpoints, the subscriber WebSocket
//! endpoint, and server setup with middleware and graceful shutdown.

pub mod server;
pub mod status;
pub mod ws;

pub use server::{create_router, create_server, shutdown_signal};

use std::sync::Arc;

use crate::config::Config;
use crate::gateway::BroadcastManager;
use crate::relay::{SessionManager, SessionStatus};

/// Shared state handed to every HTTP and WebSocket handler
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub gateway: Arc<BroadcastManager>,
    pub sessions: Arc<SessionManager>,
}

/// Service status response
#[derive(Debug, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    /// Service name
    pub service: &'static str,
    /// Application version from Cargo.toml
    pub version: &'static str,
    /// Current upstream session snapshot
    pub session: SessionStatus,
    /// Number of connected subscribers
    pub subscribers: usize,
}

/// Health check response
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct HealthResponse {
    /// Service status
    pub status: HealthStatus,
    /// Current timestamp
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Health status enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Service is healthy
    Healthy,
    /// Service is unhealthy
    Unhealthy,
}

impl HealthStatus {
    /// Check if the status is healthy
    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthStatus::Healthy)
    }

    /// Convert to HTTP status code
    pub fn to_status_code(&self) -> axum::http::StatusCode {
        match self {
            HealthStatus::Healthy => axum::http::StatusCode::OK,
            HealthStatus::Unhealthy => axum::http::StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_status() {
        assert!(HealthStatus::Healthy.is_healthy());
        assert!(!HealthStatus::Unhealthy.is_healthy());

        assert_eq!(
            HealthStatus::Healthy.to_status_code(),
            axum::http::StatusCode::OK
        );
        assert_eq!(
            HealthStatus::Unhealthy.to_status_code(),
            axum::http::StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
