//! Broadcast gateway for liverelay
//!
//! This module provides:
//! - The inbound/outbound wire message formats spoken to subscribers
//! - The fan-out manager delivering batches and lifecycle notifications

mod broadcast;

pub use broadcast::{BroadcastManager, ClientConnection};

use serde::{Deserialize, Serialize};

use crate::models::NormalizedEvent;
use crate::upstream::SessionState;

/// Message received from a subscriber connection
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Inbound {
    /// Connect the relay to a new upstream target
    SetTarget {
        /// Target identity, optionally prefixed with `@`
        target: String,
    },
}

/// Message sent to subscriber connections
///
/// `SessionEstablished` and `SessionFailed` are requester-scoped; the rest
/// are broadcast to every connected subscriber.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Outbound {
    /// The upstream session resolved; carries the state plus target identity
    #[serde(rename_all = "camelCase")]
    SessionEstablished {
        unique_id: String,
        #[serde(flatten)]
        state: SessionState,
    },

    /// The upstream connect attempt failed
    SessionFailed { reason: String },

    /// A coalesced batch of normalized events
    Batch { events: Vec<NormalizedEvent> },

    /// The upstream session dropped involuntarily; a reconnect is pending
    Disconnected { reason: String },

    /// The live broadcast ended; no reconnect will follow
    StreamEnd,
}

impl Outbound {
    /// Shorthand for a session-failed notification
    pub fn session_failed<S: Into<String>>(reason: S) -> Self {
        Outbound::SessionFailed {
            reason: reason.into(),
        }
    }

    /// Shorthand for a disconnected notification
    pub fn disconnected<S: Into<String>>(reason: S) -> Self {
        Outbound::Disconnected {
            reason: reason.into(),
        }
    }
}
