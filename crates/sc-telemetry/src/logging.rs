//! Structured logging helpers.
//!
//! Every event carries a `subsystem` field so log pipelines can split the
//! storage, transaction log, persistence and full-text streams.

/// Subsystem names used in the `subsystem` log field.
pub mod subsystems {
    pub const STORAGE: &str = "reliable-storage";
    pub const TRANSACTION_LOG: &str = "transaction-log";
    pub const PERSISTENCE: &str = "persistence";
    pub const FULL_TEXT: &str = "full-text";
}

/// Helper to create structured log entries with consistent formatting.
#[macro_export]
macro_rules! log_event {
    (info, $subsystem:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::info!(
            subsystem = $subsystem,
            $($($field)*,)?
            $msg
        )
    };

    (warn, $subsystem:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::warn!(
            subsystem = $subsystem,
            $($($field)*,)?
            $msg
        )
    };

    (error, $subsystem:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::error!(
            subsystem = $subsystem,
            $($($field)*,)?
            $msg
        )
    };

    (debug, $subsystem:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::debug!(
            subsystem = $subsystem,
            $($($field)*,)?
            $msg
        )
    };
}

/// Log a block-related event with standard fields.
#[macro_export]
macro_rules! log_block_event {
    ($level:ident, $msg:expr, $primary_key:expr, $offset:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            subsystem = $crate::logging::subsystems::STORAGE,
            primary_key = %$primary_key,
            offset = $offset,
            $($($field)*,)?
            $msg
        )
    };
}

/// Log a transaction-related event with standard fields.
#[macro_export]
macro_rules! log_tx_event {
    ($level:ident, $subsystem:expr, $msg:expr, $transaction_id:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            subsystem = $subsystem,
            transaction_id = $transaction_id,
            $($($field)*,)?
            $msg
        )
    };
}
