//! Model-level error types for liverelay
//!
//! Normalization itself never fails; the only fallible model operation is
//! parsing an event kind tag from an upstream frame.

use thiserror::Error;

/// Errors produced while interpreting upstream payloads
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NormalizeError {
    /// The frame carried an event kind tag this relay does not know
    #[error("Unknown event kind: {0}")]
    UnknownKind(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_kind_display() {
        let err = NormalizeError::UnknownKind("dance".to_string());
        assert_eq!(err.to_string(), "Unknown event kind: dance");
    }
}
