//! # Persistence Errors

use std::io;
use std::path::PathBuf;

use sc_01_reliable_storage::StorageError;
use sc_02_transaction_log::TransactionLogError;
use shared_types::CodecError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistenceError {
    /// Durability of a new transaction could not be guaranteed.
    #[error("Error writing data in transaction log: {0}")]
    TransactionLogWrite(#[source] TransactionLogError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Transaction log error: {0}")]
    Log(#[from] TransactionLogError),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Schema file {path}: {reason}")]
    Schema { path: PathBuf, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Rollback failed: {0}")]
    Rollback(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl PersistenceError {
    pub fn schema(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        PersistenceError::Schema {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_write_message() {
        let err = PersistenceError::TransactionLogWrite(TransactionLogError::Disposed);
        assert_eq!(
            err.to_string(),
            "Error writing data in transaction log: Transaction log already disposed"
        );
    }
}
