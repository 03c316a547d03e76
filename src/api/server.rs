//! HTTP server implementation for liverelay
//!
//! This module sets up the Axum web server with all routes, middleware,
//! and graceful shutdown handling. The request timeout applies to the plain
//! HTTP routes only; the subscriber WebSocket route stays open for the life
//! of the connection.

use axum::{
    extract::MatchedPath,
    http::{header, Method, Request},
    routing::{any, get},
    Router,
};
use std::net::SocketAddr;

use axum::http::HeaderName;
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer},
    LatencyUnit,
};
use uuid::Uuid;

use crate::api::{status, ws, AppState};
use crate::error::Result;

/// Request ID generator
#[derive(Clone, Default)]
struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = Uuid::new_v4().to_string();
        Some(RequestId::new(id.parse().ok()?))
    }
}

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    // Plain HTTP routes get the request timeout; the WebSocket route must not
    let http_routes = Router::new()
        .route("/", get(status::service_status))
        .route("/healthz", get(status::health_check))
        .layer(TimeoutLayer::new(state.config.server.request_timeout()));

    let app = Router::new()
        .merge(http_routes)
        .route("/ws", any(ws::ws_handler))
        .with_state(state);

    // Apply middleware
    app.layer(PropagateRequestIdLayer::new(HeaderName::from_static(
        "x-request-id",
    )))
    .layer(SetRequestIdLayer::new(
        HeaderName::from_static("x-request-id"),
        MakeRequestUuid,
    ))
    .layer(
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE]),
    )
    .layer(
        TraceLayer::new_for_http()
            .make_span_with(|request: &Request<_>| {
                let matched_path =
                    request.extensions().get::<MatchedPath>().map(MatchedPath::as_str);
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("unknown");

                tracing::info_span!(
                    "http_request",
                    method = ?request.method(),
                    matched_path,
                    request_id,
                    latency = tracing::field::Empty,
                    status = tracing::field::Empty,
                )
            })
            .on_request(DefaultOnRequest::new().level(tracing::Level::INFO))
            .on_response(
                DefaultOnResponse::new()
                    .level(tracing::Level::INFO)
                    .latency_unit(LatencyUnit::Millis),
            ),
    )
}

/// Create and start the HTTP server
pub async fn create_server(state: AppState) -> Result<()> {
    let addr: SocketAddr = state
        .config
        .server
        .address()
        .parse()
        .map_err(|e| crate::error::Error::config(format!("Invalid server address: {}", e)))?;

    tracing::info!(
        address = %addr,
        environment = %state.config.server.environment,
        "Starting HTTP server"
    );

    let app = create_router(state);

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| crate::error::Error::internal(format!("Failed to bind to {}: {}", addr, e)))?;

    tracing::info!(
        address = %addr,
        "HTTP server listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| crate::error::Error::internal(format!("Server error: {}", e)))
}

/// Shutdown signal handler
///
/// Waits for CTRL+C or SIGTERM signals to gracefully shutdown the server.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received CTRL+C, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
