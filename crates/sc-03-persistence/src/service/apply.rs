//! # Apply Thread
//!
//! The only writer of storage while the engine runs. Transactions are taken
//! from the log head one at a time, so they reach storage in log order.
//!
//! ## Failures
//!
//! A failed application is logged, counted and put back to `ToProcess` at
//! the head of the log. It is retried with a doubling pause until
//! `apply_attempts` is used up; nothing logged after it is applied first.
//! When the attempts run out the thread halts on that transaction and leaves
//! it, and everything behind it, pending for the next start. Block writes
//! keyed by transaction id make the partial first attempts safe to repeat.

use std::io;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use sc_01_reliable_storage::{ReliableStorage, ReliableStorageApi};
use sc_02_transaction_log::{TransactionData, TransactionLog, TransactionLogError};
use sc_telemetry::{
    log_event, log_tx_event, logging::subsystems, metric_inc, time_histogram, APPLY_DURATION,
    APPLY_FAILURES, TRANSACTIONS_APPLIED,
};
use shared_types::{encode_object, DurableTransaction};

use crate::domain::errors::PersistenceError;

const THREAD_NAME: &str = "sc-persistence-apply";

/// Pause after a log read error, and before the first retry of a failed
/// transaction.
const RETRY_PAUSE: Duration = Duration::from_millis(100);

/// Upper bound of the doubling retry pause.
const MAX_RETRY_PAUSE: Duration = Duration::from_secs(2);

/// Granularity at which a retry pause notices the stop flag.
const STOP_POLL: Duration = Duration::from_millis(20);

pub(crate) struct ApplyWorker {
    pub(crate) log: Arc<TransactionLog>,
    pub(crate) storage: Arc<Mutex<ReliableStorage>>,
    pub(crate) stop: Arc<AtomicBool>,
    pub(crate) failures: Arc<AtomicU64>,
    /// Id of the transaction the thread halted on.
    pub(crate) halted_on: Arc<Mutex<Option<i64>>>,
    pub(crate) max_attempts: u32,
}

/// Result of one attempt at the head transaction.
enum Outcome {
    Applied,
    /// Back at the head as `ToProcess`.
    Retry,
    /// The log no longer accepts status changes for this head.
    Stuck,
}

pub(crate) fn spawn(worker: ApplyWorker) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name(THREAD_NAME.to_string())
        .spawn(move || worker.run())
}

impl ApplyWorker {
    fn run(self) {
        log_event!(debug, subsystems::PERSISTENCE, "Apply thread started");
        let mut attempts = 0u32;
        while !self.stop.load(Ordering::Acquire) {
            let tx = match self.log.start_processing() {
                Ok(Some(tx)) => tx,
                // Canceled delayed head, or disposal.
                Ok(None) => {
                    if self.log.is_disposed() {
                        break;
                    }
                    continue;
                }
                Err(TransactionLogError::Disposed) => break,
                Err(e) => {
                    log_event!(
                        error,
                        subsystems::PERSISTENCE,
                        "Cannot take transaction from log",
                        error = %e
                    );
                    thread::sleep(RETRY_PAUSE);
                    continue;
                }
            };
            match self.apply(&tx) {
                Outcome::Applied => attempts = 0,
                Outcome::Retry => {
                    attempts += 1;
                    if attempts >= self.max_attempts {
                        self.halt(&tx, attempts);
                        break;
                    }
                    self.back_off(attempts);
                }
                Outcome::Stuck => {
                    self.halt(&tx, attempts + 1);
                    break;
                }
            }
        }
        log_event!(debug, subsystems::PERSISTENCE, "Apply thread stopped");
    }

    fn apply(&self, tx: &TransactionData) -> Outcome {
        let _timer = time_histogram!(APPLY_DURATION);
        match apply_transaction(&self.storage, tx) {
            Ok(items) => match self.log.end_processing(tx) {
                Ok(()) => {
                    metric_inc!(TRANSACTIONS_APPLIED);
                    log_tx_event!(
                        debug,
                        subsystems::PERSISTENCE,
                        "Transaction applied",
                        tx.id,
                        items = items
                    );
                    Outcome::Applied
                }
                Err(e) => {
                    log_tx_event!(
                        error,
                        subsystems::PERSISTENCE,
                        "Cannot mark transaction processed",
                        tx.id,
                        error = %e
                    );
                    Outcome::Stuck
                }
            },
            Err(e) => {
                self.failures.fetch_add(1, Ordering::AcqRel);
                metric_inc!(APPLY_FAILURES);
                log_tx_event!(
                    error,
                    subsystems::PERSISTENCE,
                    "Error applying transaction",
                    tx.id,
                    error = %e
                );
                match self.log.retry_processing(tx) {
                    Ok(()) => Outcome::Retry,
                    Err(e) => {
                        log_tx_event!(
                            error,
                            subsystems::PERSISTENCE,
                            "Cannot return failed transaction to the log",
                            tx.id,
                            error = %e
                        );
                        Outcome::Stuck
                    }
                }
            }
        }
    }

    /// Sleep before the next attempt; cut short by the stop flag.
    fn back_off(&self, attempts: u32) {
        let pause = RETRY_PAUSE
            .saturating_mul(1 << (attempts - 1).min(16))
            .min(MAX_RETRY_PAUSE);
        let deadline = Instant::now() + pause;
        while !self.stop.load(Ordering::Acquire) {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            thread::sleep((deadline - now).min(STOP_POLL));
        }
    }

    fn halt(&self, tx: &TransactionData, attempts: u32) {
        *self.halted_on.lock() = Some(tx.id);
        log_tx_event!(
            error,
            subsystems::PERSISTENCE,
            "Apply halted, transaction left pending for the next start",
            tx.id,
            attempts = attempts,
            pending = self.log.pending_count()
        );
    }
}

/// Write every item of a logged transaction to storage. Returns the item count.
pub(crate) fn apply_transaction(
    storage: &Mutex<ReliableStorage>,
    tx: &TransactionData,
) -> Result<usize, PersistenceError> {
    let transaction = DurableTransaction::from_bytes(&tx.data)?;
    // Blocks carry the low 32 bits of the log id.
    let transaction_id = tx.id as i32;

    let mut storage = storage.lock();
    for item in transaction.items_to_put() {
        storage.store_block(&encode_object(item)?, &item.global_key(), transaction_id)?;
    }
    for item in transaction.items_to_delete() {
        storage.delete_block(&item.global_key(), transaction_id)?;
    }
    Ok(transaction.items_to_put().len() + transaction.items_to_delete().len())
}
