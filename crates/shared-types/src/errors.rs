//! # Error Types
//!
//! Errors shared by every crate that encodes or decodes transaction payloads.

use thiserror::Error;

/// Encoding or decoding of a durable payload failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CodecError {
    /// Payload could not be serialized.
    #[error("Encoding failed: {0}")]
    Encode(String),

    /// Payload bytes are not a valid transaction.
    #[error("Decoding failed: {0}")]
    Decode(String),
}
