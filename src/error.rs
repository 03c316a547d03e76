//! Error handling module for liverelay
//!
//! This module defines the error types used throughout the application,
//! providing a unified error handling strategy with proper error context
//! and HTTP response mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Result type alias for liverelay operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for liverelay
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Upstream connection failures (invalid or offline target, handshake errors)
    #[error("Connection error: {0}")]
    Connection(String),

    /// Empty or malformed target identity, rejected before any connection attempt
    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::Config(msg.into())
    }

    /// Create a connection error
    pub fn connection<S: Into<String>>(msg: S) -> Self {
        Error::Connection(msg.into())
    }

    /// Create an invalid-target error
    pub fn invalid_target<S: Into<String>>(msg: S) -> Self {
        Error::InvalidTarget(msg.into())
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Error::Internal(msg.into())
    }

    /// Get the appropriate HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::InvalidTarget(_) => StatusCode::BAD_REQUEST,
            Error::Connection(_) => StatusCode::BAD_GATEWAY,
            Error::Config(_) | Error::Serialization(_) | Error::Io(_) | Error::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            },
        }
    }

    /// Check if this error is reported only to the requesting subscriber
    pub fn is_requester_scoped(&self) -> bool {
        matches!(self, Error::Connection(_) | Error::InvalidTarget(_))
    }
}

/// Implement IntoResponse for automatic error responses in Axum
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Create error response body
        let body = Json(json!({
            "error": {
                "message": self.to_string(),
                "type": error_type(&self),
                "status": status.as_u16(),
            }
        }));

        // Log error based on severity
        match status {
            StatusCode::INTERNAL_SERVER_ERROR => {
                tracing::error!(error = ?self, "Internal server error");
            },
            StatusCode::BAD_REQUEST => {
                tracing::warn!(error = ?self, "Client error");
            },
            _ => {
                tracing::info!(error = ?self, "Request error");
            },
        }

        (status, body).into_response()
    }
}

/// Get a string representation of the error type
fn error_type(error: &Error) -> &'static str {
    match error {
        Error::Config(_) => "configuration_error",
        Error::Connection(_) => "connection_error",
        Error::InvalidTarget(_) => "invalid_target",
        Error::Serialization(_) => "serialization_error",
        Error::Io(_) => "io_error",
        Error::Internal(_) => "internal_error",
    }
}

/// Convert from anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Internal(err.to_string())
    }
}

/// Convert from envconfig::Error to our Error type
impl From<envconfig::Error> for Error {
    fn from(err: envconfig::Error) -> Self {
        Error::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(
            Error::invalid_target("test").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            Error::connection("test").status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            Error::internal("test").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_requester_scoped() {
        assert!(Error::connection("offline").is_requester_scoped());
        assert!(Error::invalid_target("empty").is_requester_scoped());
        assert!(!Error::internal("boom").is_requester_scoped());
    }

    #[test]
    fn test_error_display() {
        let err = Error::invalid_target("target identity is empty");
        assert_eq!(err.to_string(), "Invalid target: target identity is empty");
    }
}
