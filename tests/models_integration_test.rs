//! Integration tests for liverelay data models
//!
//! These tests verify the end-to-end behavior of payload normalization,
//! chat classification, and wire serialization through the public API.

use serde_json::json;
use liverelay::{ChatClass, ClassifierOptions, EventKind, NormalizedEvent};
use liverelay::models::classify_chat;

#[test]
fn test_chat_payload_normalization_and_wire_shape() {
    let payload = json!({
        "userId": "u-123",
        "uniqueId": "alice",
        "nickname": "Alice",
        "profilePictureUrl": "https://cdn.example/alice.jpg",
        "comment": "  hello there  ",
        "isFollower": true,
    });

    let event = NormalizedEvent::from_payload(EventKind::Chat, &payload);
    assert_eq!(event.kind, EventKind::Chat);
    assert_eq!(event.user_id.as_deref(), Some("u-123"));
    assert_eq!(event.comment.as_deref(), Some("hello there"));
    assert!(event.is_follower());

    let wire = serde_json::to_value(&event).unwrap();
    assert_eq!(wire["type"], "chat");
    assert_eq!(wire["nickname"], "Alice");
    assert_eq!(wire["comment"], "hello there");
    // Non-promoted fields pass through untouched
    assert_eq!(wire["uniqueId"], "alice");
    assert_eq!(wire["isFollower"], true);
    // Promoted fields are not duplicated inside the passthrough map
    assert!(wire.get("extra").is_none());
}

#[test]
fn test_classification_promotes_chat_sub_kinds() {
    let opts = ClassifierOptions::default();

    let win = NormalizedEvent::from_payload(
        EventKind::Chat,
        &json!({"uniqueId": "bob", "comment": "!WIN"}),
    )
    .classify(&opts);
    assert_eq!(win.kind, EventKind::WinCheck);

    let guess = NormalizedEvent::from_payload(
        EventKind::Chat,
        &json!({"uniqueId": "bob", "comment": "crane"}),
    )
    .classify(&opts);
    assert_eq!(guess.kind, EventKind::Guess);
    assert_eq!(guess.guess.as_deref(), Some("CRANE"));
    // The original comment survives promotion
    assert_eq!(guess.comment.as_deref(), Some("crane"));

    let plain = NormalizedEvent::from_payload(
        EventKind::Chat,
        &json!({"uniqueId": "bob", "comment": "six letters"}),
    )
    .classify(&opts);
    assert_eq!(plain.kind, EventKind::Chat);
    assert!(plain.guess.is_none());
}

#[test]
fn test_classification_leaves_non_chat_untouched() {
    let opts = ClassifierOptions::default();
    let gift = NormalizedEvent::from_payload(
        EventKind::Gift,
        &json!({"uniqueId": "carol", "giftName": "rose", "comment": "crane"}),
    )
    .classify(&opts);

    // Comment-shaped fields on a gift never trigger promotion
    assert_eq!(gift.kind, EventKind::Gift);
    assert!(gift.guess.is_none());
}

#[test]
fn test_follower_gated_guessing() {
    let gated = ClassifierOptions {
        guess_requires_follower: true,
    };

    assert_eq!(classify_chat("crane", true, &gated), ChatClass::Guess("CRANE".to_string()));
    assert_eq!(classify_chat("crane", false, &gated), ChatClass::Plain);
    // The command is never follower-gated
    assert_eq!(classify_chat("!win", false, &gated), ChatClass::WinCheck);
}

#[test]
fn test_viewer_count_passthrough() {
    let event = NormalizedEvent::from_payload(EventKind::RoomUser, &json!({"viewerCount": 512}));

    let wire = serde_json::to_value(&event).unwrap();
    assert_eq!(wire["type"], "roomUser");
    assert_eq!(wire["viewerCount"], 512);
    assert!(wire.get("comment").is_none());
}

#[test]
fn test_non_object_payload_yields_bare_event() {
    let event = NormalizedEvent::from_payload(EventKind::Like, &json!(null));

    assert_eq!(event.kind, EventKind::Like);
    assert!(event.user_id.is_none());
    assert!(event.extra.is_empty());

    let wire = serde_json::to_value(&event).unwrap();
    assert_eq!(wire["type"], "like");
}
