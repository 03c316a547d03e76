//! Chat classification for liverelay
//!
//! Every chat message maps to exactly one sub-kind, checked in precedence
//! order: recognized command, five-letter guess, plain chat. Commands win
//! over accidental five-letter collisions, and anything that matches neither
//! pattern is preserved as plain chat rather than dropped.

use super::event::{EventKind, NormalizedEvent};

/// The single recognized chat command
const WIN_COMMAND: &str = "!win";

/// Options controlling chat classification
#[derive(Debug, Clone, Copy, Default)]
pub struct ClassifierOptions {
    /// Gate five-letter guesses on the sender's follower flag
    pub guess_requires_follower: bool,
}

/// Chat sub-kind classification result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatClass {
    /// Recognized command token (win check)
    WinCheck,
    /// Exactly five alphabetic characters, case-normalized to uppercase
    Guess(String),
    /// Everything else
    Plain,
}

/// Classify a chat message into its sub-kind
///
/// The command check is case-insensitive; the guess check uppercases the
/// trimmed text and requires exactly five ASCII alphabetic characters.
pub fn classify_chat(text: &str, is_follower: bool, opts: &ClassifierOptions) -> ChatClass {
    let trimmed = text.trim();

    if trimmed.eq_ignore_ascii_case(WIN_COMMAND) {
        return ChatClass::WinCheck;
    }

    if trimmed.len() == 5 && trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
        if !opts.guess_requires_follower || is_follower {
            return ChatClass::Guess(trimmed.to_ascii_uppercase());
        }
    }

    ChatClass::Plain
}

impl NormalizedEvent {
    /// Apply chat classification to this event
    ///
    /// Promotes a `Chat` event to `WinCheck` or `Guess` when its comment
    /// matches; non-chat events are returned unchanged.
    pub fn classify(mut self, opts: &ClassifierOptions) -> Self {
        if self.kind != EventKind::Chat {
            return self;
        }

        let text = self.comment.clone().unwrap_or_default();
        match classify_chat(&text, self.is_follower(), opts) {
            ChatClass::WinCheck => {
                self.kind = EventKind::WinCheck;
            },
            ChatClass::Guess(guess) => {
                self.kind = EventKind::Guess;
                self.guess = Some(guess);
            },
            ChatClass::Plain => {},
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ungated() -> ClassifierOptions {
        ClassifierOptions::default()
    }

    fn gated() -> ClassifierOptions {
        ClassifierOptions {
            guess_requires_follower: true,
        }
    }

    #[test]
    fn test_win_command_case_insensitive() {
        assert_eq!(classify_chat("!WIN", false, &ungated()), ChatClass::WinCheck);
        assert_eq!(classify_chat("!win", false, &ungated()), ChatClass::WinCheck);
        assert_eq!(classify_chat(" !Win ", false, &ungated()), ChatClass::WinCheck);
    }

    #[test]
    fn test_five_letter_guess_uppercased() {
        assert_eq!(
            classify_chat("APPLE", false, &ungated()),
            ChatClass::Guess("APPLE".to_string())
        );
        assert_eq!(
            classify_chat("apple ", false, &ungated()),
            ChatClass::Guess("APPLE".to_string())
        );
    }

    #[test]
    fn test_plain_chat() {
        assert_eq!(classify_chat("hi there", false, &ungated()), ChatClass::Plain);
        // Four letters is not a guess
        assert_eq!(classify_chat("APPL", false, &ungated()), ChatClass::Plain);
        // Six letters is not a guess
        assert_eq!(classify_chat("apples", false, &ungated()), ChatClass::Plain);
        // Digits disqualify
        assert_eq!(classify_chat("app1e", false, &ungated()), ChatClass::Plain);
        assert_eq!(classify_chat("", false, &ungated()), ChatClass::Plain);
    }

    #[test]
    fn test_command_wins_over_guess_pattern() {
        // "!win" is four chars plus punctuation so it cannot collide, but a
        // hypothetical five-letter command token must still classify as command
        assert_eq!(classify_chat("!win", true, &gated()), ChatClass::WinCheck);
    }

    #[test]
    fn test_follower_gate() {
        // Gated: non-followers fall through to plain chat
        assert_eq!(classify_chat("apple", false, &gated()), ChatClass::Plain);
        assert_eq!(
            classify_chat("apple", true, &gated()),
            ChatClass::Guess("APPLE".to_string())
        );
        // Ungated: follower flag is irrelevant
        assert_eq!(
            classify_chat("apple", false, &ungated()),
            ChatClass::Guess("APPLE".to_string())
        );
    }

    #[test]
    fn test_classify_promotes_chat_event() {
        let payload = json!({"userId": "u1", "comment": "crane"});
        let event =
            NormalizedEvent::from_payload(EventKind::Chat, &payload).classify(&ungated());
        assert_eq!(event.kind, EventKind::Guess);
        assert_eq!(event.guess.as_deref(), Some("CRANE"));
        // Original comment is preserved for display
        assert_eq!(event.comment.as_deref(), Some("crane"));
    }

    #[test]
    fn test_classify_leaves_plain_chat() {
        let payload = json!({"userId": "u1", "comment": "gg everyone"});
        let event =
            NormalizedEvent::from_payload(EventKind::Chat, &payload).classify(&ungated());
        assert_eq!(event.kind, EventKind::Chat);
        assert!(event.guess.is_none());
    }

    #[test]
    fn test_classify_ignores_non_chat() {
        let payload = json!({"userId": "u1", "comment": "apple"});
        let event =
            NormalizedEvent::from_payload(EventKind::Like, &payload).classify(&ungated());
        assert_eq!(event.kind, EventKind::Like);
    }

    #[test]
    fn test_classify_respects_follower_gate_from_payload() {
        let payload = json!({"userId": "u1", "comment": "apple", "isFollower": false});
        let event = NormalizedEvent::from_payload(EventKind::Chat, &payload).classify(&gated());
        assert_eq!(event.kind, EventKind::Chat);

        let payload = json!({"userId": "u1", "comment": "apple", "isFollower": true});
        let event = NormalizedEvent::from_payload(EventKind::Chat, &payload).classify(&gated());
        assert_eq!(event.kind, EventKind::Guess);
    }
}
