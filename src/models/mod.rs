//! Data models for liverelay
//!
//! This module contains the domain models used throughout the relay:
//! the normalized event envelope, chat classification, and the errors
//! produced while interpreting upstream payloads.

pub mod classify;
pub mod error;
pub mod event;

// Re-export commonly used types
pub use classify::{classify_chat, ChatClass, ClassifierOptions};
pub use error::NormalizeError;
pub use event::{EventKind, NormalizedEvent};
