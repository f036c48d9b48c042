//! # Domain Errors
//!
//! Error types for the Reliable Storage subsystem.
//!
//! ## Design Principles
//!
//! - Corruption carries the file offset and the failed check so recovery can act on it
//! - Logical inconsistencies (bad delete, use after dispose) are caller bugs and never retried
//! - No panics in domain logic (use Result instead)

use std::fmt;
use std::io;
use thiserror::Error;

/// Which validation check a block failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorruptionKind {
    /// First field is not the begin sentinel.
    BeginMarker,
    /// Last field is not the end sentinel.
    EndMarker,
    /// Payload hash does not match the stored hash.
    Hash,
    /// Reserved size smaller than used size, negative size or unreadable key.
    ImpossibleSize,
    /// Stream ended inside the block.
    Incomplete,
}

impl fmt::Display for CorruptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            CorruptionKind::BeginMarker => "begin marker mismatch",
            CorruptionKind::EndMarker => "end marker mismatch",
            CorruptionKind::Hash => "hash mismatch",
            CorruptionKind::ImpossibleSize => "impossible block size",
            CorruptionKind::Incomplete => "incomplete block",
        };
        f.write_str(text)
    }
}

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Underlying file operation failed.
    #[error("Storage I/O error: {0}")]
    Io(#[from] io::Error),

    /// A block failed validation.
    #[error("Corrupted block at offset {offset}: {kind}")]
    BlockCorrupted { offset: u64, kind: CorruptionKind },

    /// Delete of a block that is not active and was not deleted by this transaction.
    #[error(
        "Inconsistent delete of {primary_key}: block holds transaction {stored_transaction_id}, \
         delete requested by transaction {requested_transaction_id}"
    )]
    InconsistentDelete {
        primary_key: String,
        stored_transaction_id: i32,
        requested_transaction_id: i32,
    },

    /// No block is stored for this key.
    #[error("No block stored for key {0}")]
    KeyNotFound(String),

    /// The storage was disposed.
    #[error("Storage already disposed")]
    Disposed,

    /// The data directory is held by another process.
    #[error("Data directory locked: {0}")]
    Locked(String),

    /// The object processor rejected a persisted payload.
    #[error("Object processor failed: {0}")]
    Processing(String),
}

impl StorageError {
    pub fn corrupted(offset: u64, kind: CorruptionKind) -> Self {
        StorageError::BlockCorrupted { offset, kind }
    }

    /// Whether load-time recovery can repair this error.
    pub fn is_corruption(&self) -> bool {
        matches!(self, StorageError::BlockCorrupted { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StorageError::corrupted(128, CorruptionKind::Hash);
        let msg = err.to_string();
        assert!(msg.contains("offset 128"));
        assert!(msg.contains("hash mismatch"));
        assert!(err.is_corruption());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::Other, "disk failure");
        let storage_err: StorageError = io_err.into();

        match storage_err {
            StorageError::Io(inner) => assert!(inner.to_string().contains("disk failure")),
            _ => panic!("Expected Io"),
        }
    }

    #[test]
    fn test_inconsistent_delete_names_both_ids() {
        let err = StorageError::InconsistentDelete {
            primary_key: "orders@1".into(),
            stored_transaction_id: 4,
            requested_transaction_id: 9,
        };
        let msg = err.to_string();
        assert!(msg.contains("transaction 4"));
        assert!(msg.contains("transaction 9"));
        assert!(!err.is_corruption());
    }
}
