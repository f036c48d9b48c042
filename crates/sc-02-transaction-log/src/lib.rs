//! # Transaction Log (sc-02)
//!
//! Write-ahead log in front of reliable storage. Every transaction is
//! durable in `transaction_log.bin` before anything touches the data file,
//! and a single consumer applies them in order.
//!
//! ## State Machine
//!
//! ```text
//! ToProcess ──start_processing──→ Processing ──end_processing──→ Processed
//!     │                               │
//!     └──cancel_transaction (delayed)─┼──→ Canceled
//!                                     └── reload ──→ ToProcess
//! ```
//!
//! ## Delayed Transactions
//!
//! A transaction logged with `delay_ms > 0` is the first stage of a
//! two-stage commit: the consumer sleeps until the delay has elapsed since
//! enqueue, and `cancel_transaction` may pull it out in the meantime.

pub mod domain;
pub mod service;

pub use domain::errors::TransactionLogError;
pub use domain::transaction::{TransactionData, TransactionStatus};
pub use service::TransactionLog;
