//! Configuration module for liverelay
//!
//! This module handles loading and validating configuration from environment
//! variables, providing strongly-typed configuration structures for all
//! application components.

use envconfig::Envconfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{Error, Result};

/// Main configuration structure for liverelay
#[derive(Debug, Clone, Deserialize, Serialize, Envconfig)]
pub struct Config {
    /// Server configuration
    #[serde(flatten)]
    #[envconfig(nested)]
    pub server: ServerConfig,

    /// Upstream session configuration
    #[serde(flatten)]
    #[envconfig(nested)]
    pub upstream: UpstreamConfig,

    /// Relay pipeline configuration
    #[serde(flatten)]
    #[envconfig(nested)]
    pub relay: RelayConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize, Envconfig)]
pub struct ServerConfig {
    /// Host to bind to
    #[envconfig(from = "HOST", default = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[envconfig(from = "PORT", default = "3000")]
    pub port: u16,

    /// Log level
    #[envconfig(from = "LOG_LEVEL", default = "info")]
    pub log_level: String,

    /// Environment (development, staging, production)
    #[envconfig(from = "ENVIRONMENT", default = "development")]
    pub environment: String,

    /// Request timeout in seconds (plain HTTP routes only)
    #[envconfig(from = "REQUEST_TIMEOUT_SECS", default = "30")]
    pub request_timeout_secs: u64,
}

impl ServerConfig {
    /// Get the server address as a string
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Check if running in development mode
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// Check if running in production mode
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

/// Upstream session configuration
#[derive(Debug, Clone, Deserialize, Serialize, Envconfig)]
pub struct UpstreamConfig {
    /// WebSocket URL of the upstream live-session bridge
    #[envconfig(from = "UPSTREAM_URL", default = "ws://127.0.0.1:8081/live")]
    pub url: String,

    /// Connect handshake timeout in milliseconds
    #[envconfig(from = "UPSTREAM_CONNECT_TIMEOUT_MS", default = "15000")]
    pub connect_timeout_ms: u64,

    /// Delay before reconnecting after an involuntary disconnect, in milliseconds
    #[envconfig(from = "UPSTREAM_RECONNECT_DELAY_MS", default = "5000")]
    pub reconnect_delay_ms: u64,

    /// Whether a failed initial connect is retried automatically
    #[envconfig(from = "UPSTREAM_RETRY_FAILED_CONNECT", default = "false")]
    pub retry_failed_connect: bool,

    /// Delay between retries after a failed initial connect, in milliseconds
    #[envconfig(from = "UPSTREAM_FAILED_CONNECT_RETRY_MS", default = "10000")]
    pub failed_connect_retry_ms: u64,
}

impl UpstreamConfig {
    /// Get connect timeout as Duration
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Get reconnect delay as Duration
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    /// Get failed-connect retry delay as Duration
    pub fn failed_connect_retry_delay(&self) -> Duration {
        Duration::from_millis(self.failed_connect_retry_ms)
    }
}

/// What drives a batch-buffer flush check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FlushTrigger {
    /// Check the flush interval on every enqueue
    Enqueue,
    /// Check the flush interval on a fixed wall-clock tick
    Interval,
}

impl std::str::FromStr for FlushTrigger {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "enqueue" => Ok(FlushTrigger::Enqueue),
            "interval" => Ok(FlushTrigger::Interval),
            other => Err(Error::config(format!("Unknown flush trigger: {}", other))),
        }
    }
}

/// Relay pipeline configuration
#[derive(Debug, Clone, Deserialize, Serialize, Envconfig)]
pub struct RelayConfig {
    /// Minimum interval between batch flushes, in milliseconds
    #[envconfig(from = "RELAY_FLUSH_INTERVAL_MS", default = "100")]
    pub flush_interval_ms: u64,

    /// Flush trigger mode (enqueue, interval)
    #[envconfig(from = "RELAY_FLUSH_TRIGGER", default = "enqueue")]
    pub flush_trigger: String,

    /// Whether five-letter guesses require the sender to be a follower
    #[envconfig(from = "RELAY_GUESS_REQUIRES_FOLLOWER", default = "false")]
    pub guess_requires_follower: bool,

    /// Per-subscriber outbound queue depth
    #[envconfig(from = "RELAY_MAX_SEND_QUEUE", default = "256")]
    pub max_send_queue: usize,
}

impl RelayConfig {
    /// Get flush interval as Duration
    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }

    /// Parse the flush trigger mode
    pub fn trigger(&self) -> Result<FlushTrigger> {
        self.flush_trigger.parse()
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if it exists (for local development)
        dotenv::dotenv().ok();

        // Parse configuration from environment
        Config::init_from_env().map_err(Error::from)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        // Validate server config
        if self.server.port == 0 {
            return Err(Error::config("Server port cannot be 0"));
        }

        // Validate upstream config
        if self.upstream.url.is_empty() {
            return Err(Error::config("Upstream URL cannot be empty"));
        }

        // Validate relay config
        if self.relay.flush_interval_ms == 0 {
            return Err(Error::config("Flush interval must be at least 1 ms"));
        }
        if self.relay.max_send_queue == 0 {
            return Err(Error::config("Send queue depth must be at least 1"));
        }
        self.relay.trigger()?;

        Ok(())
    }

    /// Log configuration
    pub fn log_config(&self) {
        tracing::info!(
            server_address = %self.server.address(),
            environment = %self.server.environment,
            log_level = %self.server.log_level,
            "Server configuration"
        );

        tracing::info!(
            url = %self.upstream.url,
            reconnect_delay_ms = %self.upstream.reconnect_delay_ms,
            retry_failed_connect = %self.upstream.retry_failed_connect,
            "Upstream configuration"
        );

        tracing::info!(
            flush_interval_ms = %self.relay.flush_interval_ms,
            flush_trigger = %self.relay.flush_trigger,
            guess_requires_follower = %self.relay.guess_requires_follower,
            "Relay configuration"
        );
    }
}
