//! liverelay - a live-stream event relay
//!
//! This application connects to one upstream live session at a time,
//! normalizes and classifies its events, coalesces them into batches, and
//! fans the batches out to WebSocket subscribers.

use std::sync::Arc;

use liverelay::api::{self, AppState};
use liverelay::config::Config;
use liverelay::error::Result;
use liverelay::gateway::BroadcastManager;
use liverelay::logging;
use liverelay::models::ClassifierOptions;
use liverelay::relay::{spawn_pipeline, SessionManager};
use liverelay::upstream::WsConnector;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration from environment
    let config = Arc::new(Config::from_env()?);

    // Validate configuration
    config.validate()?;

    // Initialize logging/tracing
    logging::init_tracing(&config.server.log_level, &config.server.environment)?;

    // Log configuration
    config.log_config();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting liverelay");

    let gateway = Arc::new(BroadcastManager::new());
    let events_tx = spawn_pipeline(Arc::clone(&gateway), &config.relay);

    let connector = Arc::new(WsConnector::new(config.upstream.clone()));
    let sessions = Arc::new(SessionManager::new(
        connector,
        Arc::clone(&gateway),
        events_tx,
        config.upstream.clone(),
        ClassifierOptions {
            guess_requires_follower: config.relay.guess_requires_follower,
        },
    ));

    let state = AppState {
        config,
        gateway,
        sessions,
    };

    api::server::create_server(state).await?;

    tracing::info!("liverelay shutdown complete");
    Ok(())
}
