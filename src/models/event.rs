//! Event data models for liverelay
//!
//! This module defines the core event structures used throughout the pipeline:
//! the event kind tag, and the normalized envelope that wraps every raw
//! upstream payload before batching and broadcast.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::NormalizeError;

/// Keys promoted out of the raw payload into envelope fields.
const PROMOTED_KEYS: &[&str] = &["userId", "nickname", "profilePictureUrl", "comment"];

/// Event kinds carried on the wire
///
/// `Chat`, `Like`, `Member`, `Social`, `RoomUser` and `Gift` are produced by
/// normalization; `WinCheck` and `Guess` only ever appear after chat
/// classification promotes a `Chat` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventKind {
    /// Plain chat message
    Chat,
    /// Recognized chat command (`!win`)
    WinCheck,
    /// Five-letter guess extracted from chat
    Guess,
    /// Like tap
    Like,
    /// Viewer joined the room
    Member,
    /// Follow or share
    Social,
    /// Viewer count update
    RoomUser,
    /// Gift sent to the host
    Gift,
}

impl EventKind {
    /// Parse event kind from its wire tag
    pub fn from_str(s: &str) -> Result<Self, NormalizeError> {
        match s {
            "chat" => Ok(EventKind::Chat),
            "winCheck" => Ok(EventKind::WinCheck),
            "guess" => Ok(EventKind::Guess),
            "like" => Ok(EventKind::Like),
            "member" => Ok(EventKind::Member),
            "social" => Ok(EventKind::Social),
            "roomUser" => Ok(EventKind::RoomUser),
            "gift" => Ok(EventKind::Gift),
            _ => Err(NormalizeError::UnknownKind(s.to_string())),
        }
    }

    /// Convert to wire tag
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Chat => "chat",
            EventKind::WinCheck => "winCheck",
            EventKind::Guess => "guess",
            EventKind::Like => "like",
            EventKind::Member => "member",
            EventKind::Social => "social",
            EventKind::RoomUser => "roomUser",
            EventKind::Gift => "gift",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Normalized event ready for batching and broadcast
///
/// A uniform envelope around a raw upstream payload. The known user fields
/// are promoted; everything else is preserved untouched in `extra` so that
/// consumers needing pass-through data still get it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedEvent {
    /// Event kind (wire field `type`)
    #[serde(rename = "type")]
    pub kind: EventKind,

    /// Originating user identifier (`userId`, falling back to `uniqueId`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    /// Display name of the originating user
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,

    /// Avatar reference of the originating user
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_picture_url: Option<String>,

    /// Chat text (chat events only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,

    /// Uppercased five-letter guess (guess events only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guess: Option<String>,

    /// When the relay received the event
    pub received_at: DateTime<Utc>,

    /// Remaining payload fields, passed through opaquely
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl NormalizedEvent {
    /// Normalize a raw upstream payload into a uniform envelope
    ///
    /// This is a pure transform and never fails: missing or malformed
    /// optional fields degrade to `None`, and a non-object payload produces
    /// an envelope with empty pass-through data.
    pub fn from_payload(kind: EventKind, payload: &Value) -> Self {
        let obj = payload.as_object();

        let user_id = obj
            .and_then(|o| non_empty_string(o.get("userId")))
            .or_else(|| obj.and_then(|o| non_empty_string(o.get("uniqueId"))));
        let nickname = obj.and_then(|o| non_empty_string(o.get("nickname")));
        let profile_picture_url = obj.and_then(|o| non_empty_string(o.get("profilePictureUrl")));
        let comment = if kind == EventKind::Chat {
            obj.and_then(|o| o.get("comment"))
                .and_then(Value::as_str)
                .map(|s| s.trim().to_string())
        } else {
            None
        };

        let extra = obj
            .map(|o| {
                o.iter()
                    .filter(|(k, _)| !PROMOTED_KEYS.contains(&k.as_str()))
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect()
            })
            .unwrap_or_default();

        Self {
            kind,
            user_id,
            nickname,
            profile_picture_url,
            comment,
            guess: None,
            received_at: Utc::now(),
            extra,
        }
    }

    /// Whether the payload carried a truthy `isFollower` flag
    pub fn is_follower(&self) -> bool {
        self.extra.get("isFollower").and_then(Value::as_bool) == Some(true)
    }
}

/// Extract a non-empty string field, treating "" as absent
fn non_empty_string(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
