//! # Error Hierarchy
//!
//! Shared error types for the foundational layer, built with `thiserror`.
//! Subsystem crates define their own enums (signing protocol, audit chain,
//! proofs) and wrap these where they surface canonicalization failures.

use thiserror::Error;

/// Top-level error type for foundational operations.
#[derive(Error, Debug)]
pub enum AttestError {
    /// Canonicalization failure during digest computation.
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    /// A digest string could not be parsed.
    #[error("invalid digest: {0}")]
    InvalidDigest(String),

    /// An identifier string could not be parsed.
    #[error("invalid identifier \"{value}\": {reason}")]
    InvalidIdentifier {
        /// The rejected input.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Timestamp string is not valid UTC RFC 3339.
    #[error("invalid timestamp \"{value}\": {reason}")]
    InvalidTimestamp {
        /// The string that failed to parse.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// Non-integer numbers have no single textual form and are refused.
    #[error("float values are not permitted in canonical representations; use integer micro-units or strings: {0}")]
    FloatRejected(f64),

    /// JSON serialization failed during canonicalization.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_rejected_display_names_value() {
        let err = CanonicalizationError::FloatRejected(0.8);
        assert!(err.to_string().contains("0.8"));
    }

    #[test]
    fn canonicalization_converts_into_top_level() {
        let err: AttestError = CanonicalizationError::FloatRejected(1.5).into();
        assert!(matches!(err, AttestError::Canonicalization(_)));
        assert!(err.to_string().starts_with("canonicalization error"));
    }

    #[test]
    fn invalid_timestamp_display() {
        let err = AttestError::InvalidTimestamp {
            value: "yesterday".into(),
            reason: "not RFC 3339".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("yesterday"));
        assert!(msg.contains("not RFC 3339"));
    }
}
