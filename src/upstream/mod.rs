//! Upstream live-session seam for liverelay
//!
//! The upstream source is a black box behind two traits: a connector that
//! establishes a session for a target identity, and a handle for tearing the
//! session down. Events arrive on a channel owned by the session, so the
//! relay never couples to a concrete transport. The production implementation
//! lives in [`ws`]; tests use the scripted mock in `crate::test_utils`.

pub mod ws;

pub use ws::WsConnector;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::mpsc;

use crate::error::Result;
use crate::models::EventKind;

/// Resolved state of a freshly connected upstream session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    /// Room or stream identifier resolved by the upstream source
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room_id: Option<String>,

    /// Remaining state fields, passed through opaquely
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A signal delivered by an upstream session
#[derive(Debug, Clone)]
pub enum UpstreamEvent {
    /// A raw payload tagged with its event kind
    Event(EventKind, Value),
    /// Involuntary mid-session loss; the session is dead and may be retried
    Disconnected,
    /// The live broadcast ended; terminal for this target
    StreamEnded,
}

/// An established upstream session
pub struct UpstreamSession {
    /// State captured when the connect call resolved
    pub state: SessionState,
    /// Event stream; closes when the session dies or is torn down
    pub events: mpsc::Receiver<UpstreamEvent>,
    /// Handle for tearing the session down
    pub handle: Box<dyn UpstreamHandle>,
}

/// Establishes upstream sessions for target identities
#[async_trait]
pub trait UpstreamConnector: Send + Sync {
    /// Connect to the live session of the given target
    ///
    /// Fails with `Error::Connection` when the target is invalid or offline.
    async fn connect(&self, target: &str) -> Result<UpstreamSession>;
}

/// Tears down an established upstream session
#[async_trait]
pub trait UpstreamHandle: Send {
    /// Disconnect from the upstream session
    ///
    /// Best-effort: callers treat failures as non-fatal.
    async fn disconnect(&mut self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_session_state_serialization() {
        let state = SessionState {
            room_id: Some("7312".to_string()),
            extra: json!({"viewerCount": 250})
                .as_object()
                .cloned()
                .unwrap(),
        };

        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["roomId"], "7312");
        assert_eq!(json["viewerCount"], 250);
    }

    #[test]
    fn test_session_state_default_omits_room_id() {
        let json = serde_json::to_value(SessionState::default()).unwrap();
        assert!(json.get("roomId").is_none());
    }
}
