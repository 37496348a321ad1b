//! # Error Types
//!
//! Parsing failures for the primitive types.

use thiserror::Error;

/// Errors raised while parsing primitive values from text or JSON.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeError {
    /// The input was not valid hex.
    #[error("Invalid hex string: {0}")]
    InvalidHex(String),

    /// The decoded byte length does not match the type.
    #[error("Invalid length: expected {expected} bytes, got {actual}")]
    InvalidLength {
        /// Expected length in bytes
        expected: usize,
        /// Actual length in bytes
        actual: usize,
    },

    /// The input could not be read as an unsigned 256-bit amount.
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
}
