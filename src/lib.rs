//! liverelay library
//!
//! This library exposes the core modules of liverelay for use in integration
//! tests and as a library for other applications.

pub mod api;
pub mod config;
pub mod error;
pub mod gateway;
pub mod logging;
pub mod models;
pub mod relay;
pub mod test_utils;
pub mod upstream;

// Re-export commonly used types at the crate root
pub use config::Config;
pub use error::{Error, Result};

// Re-export model types
pub use models::{ChatClass, ClassifierOptions, EventKind, NormalizedEvent};

// Re-export wire and gateway types
pub use gateway::{BroadcastManager, Inbound, Outbound};

// Re-export relay types
pub use relay::{spawn_pipeline, SessionManager, SessionStatus};

// Re-export API server functions
pub use api::server::{create_router, create_server, shutdown_signal};
