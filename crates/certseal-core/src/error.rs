//! # Error Types
//!
//! Structured errors for the foundational layer. All errors use `thiserror`
//! for derive-based `Display` and `Error` implementations.

use thiserror::Error;

/// Error during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// Float values are not permitted in canonical representations.
    /// Grades and scores must be strings or integers.
    #[error("float values are not permitted in canonical representations; use string or integer: {0}")]
    FloatRejected(f64),

    /// JSON serialization failed.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

/// Error parsing a 32-byte hash from its hex representation.
#[derive(Error, Debug)]
pub enum HashParseError {
    /// The input was not 64 hex characters.
    #[error("expected 64 hex chars, got {0}")]
    Length(usize),

    /// The input contained a non-hex character.
    #[error("invalid hex at offset {offset}")]
    InvalidHex {
        /// Byte offset of the first invalid character pair.
        offset: usize,
    },
}
