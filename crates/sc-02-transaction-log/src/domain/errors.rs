//! # Transaction Log Errors
//!
//! Everything except `Io` and `Corrupted` is a protocol error made by the
//! caller and is never retried.

use std::io;
use thiserror::Error;

use super::transaction::TransactionStatus;

#[derive(Debug, Error)]
pub enum TransactionLogError {
    #[error("Transaction log I/O error: {0}")]
    Io(#[from] io::Error),

    /// The log file cannot be replayed.
    #[error("Corrupted transaction log at offset {offset}: {reason}")]
    Corrupted { offset: u64, reason: String },

    /// A status change the state machine does not allow.
    #[error("Transaction {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: i64,
        from: TransactionStatus,
        to: TransactionStatus,
    },

    /// Only delayed transactions can be canceled.
    #[error("Transaction {id} is not delayed and cannot be canceled")]
    NotDelayed { id: i64 },

    /// The transaction handed back is not the one at the head of the queue.
    #[error("Expected transaction {expected} at queue head, found {actual:?}")]
    UnexpectedHead { expected: i64, actual: Option<i64> },

    #[error("Cannot clear the log: {count} transactions pending")]
    PendingTransactions { count: usize },

    #[error("Transaction log already disposed")]
    Disposed,
}

impl TransactionLogError {
    pub fn corrupted(offset: u64, reason: impl Into<String>) -> Self {
        TransactionLogError::Corrupted {
            offset,
            reason: reason.into(),
        }
    }
}
