//! # Persistence Engine Service
//!
//! ## Ownership
//!
//! - `ReliableStorage` sits behind an `Arc<Mutex<_>>` shared by the apply
//!   thread and direct readers; the mutex is the only thing serialising them
//! - `TransactionLog` is internally synchronised and shared by `Arc`
//! - The data-directory lock is held until the engine is dropped
//!
//! ## Shutdown
//!
//! Stop flag, then log disposal (wakes the apply thread), then join, then
//! storage disposal.
//!
//! ## Halted apply
//!
//! A transaction that keeps failing halts the apply thread (see `apply.rs`).
//! Draining then returns instead of waiting forever, the log is kept, and
//! the halted transaction is the first one replayed at the next start.
//!
//! ## Files
//!
//! - `apply.rs` - apply thread
//! - `rollback.rs` - directory-level rollback for staged imports

mod apply;
pub mod rollback;

use std::fs;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use sc_01_reliable_storage::{
    DataDirectoryLock, LoadReport, ReliableStorage, ReliableStorageApi, StorageError,
};
use sc_02_transaction_log::TransactionLog;
use sc_telemetry::{log_event, logging::subsystems};
use shared_types::DurableTransaction;

use crate::adapters::{ContainerObjectProcessor, SchemaStore};
use crate::domain::config::PersistenceConfig;
use crate::domain::errors::PersistenceError;
use crate::ports::outbound::DataContainer;

/// How often a drain checks whether the apply thread halted.
const HALT_POLL: Duration = Duration::from_millis(50);

/// What happened during `PersistenceEngine::start`.
#[derive(Debug, Clone, Default)]
pub struct StartupReport {
    /// Transactions found pending in the log.
    pub replayed_transactions: usize,
    /// Failed attempts during replay, retries included.
    pub replay_failures: u64,
    /// Transaction the apply thread halted on during replay.
    pub halted_transaction: Option<i64>,
    /// False when the log was kept because replay did not drain it.
    pub log_cleared: bool,
    /// Final load, the one that filled the container.
    pub load: LoadReport,
}

pub struct PersistenceEngine<C: DataContainer + 'static> {
    config: PersistenceConfig,
    container: Arc<RwLock<C>>,
    storage: Arc<Mutex<ReliableStorage>>,
    log: Arc<TransactionLog>,
    schema: SchemaStore,
    stop: Arc<AtomicBool>,
    apply_failures: Arc<AtomicU64>,
    halted_on: Arc<Mutex<Option<i64>>>,
    apply_thread: Option<JoinHandle<()>>,
    startup: StartupReport,
    // Declared last: released after storage and log are closed.
    _lock: Option<DataDirectoryLock>,
}

impl<C: DataContainer + 'static> PersistenceEngine<C> {
    /// Open everything, replay pending transactions and fill `container`.
    pub fn start(config: PersistenceConfig, container: Arc<RwLock<C>>) -> Result<Self, PersistenceError> {
        config.validate()?;
        let data_dir = config.data_directory();
        fs::create_dir_all(&data_dir)?;
        let lock = if config.lock_data_directory {
            Some(
                DataDirectoryLock::acquire_with_timeout(&data_dir, config.lock_timeout())
                    .map_err(StorageError::from)?,
            )
        } else {
            None
        };
        log_event!(
            info,
            subsystems::PERSISTENCE,
            "Starting persistence engine",
            working_directory = %config.working_directory.display()
        );

        // 1. Storage, with the processor bound to the container.
        let mut storage = ReliableStorage::open(config.storage_path())?
            .with_processor(ContainerObjectProcessor::new(Arc::clone(&container)));
        if let Some(backup_path) = config.backup_storage_path() {
            storage = storage.with_backup(ReliableStorage::open(backup_path)?);
        }

        // 2. Schema and sequences, under the schema lock.
        let schema = SchemaStore::open(&config)?;

        // 3. Transaction log.
        let log = Arc::new(TransactionLog::open(config.transaction_log_path())?);
        let replayed_transactions = log.pending_count();

        // 4. Index-only load so replay can address existing blocks.
        if replayed_transactions > 0 {
            log_event!(
                info,
                subsystems::PERSISTENCE,
                "Replaying pending transactions",
                pending = replayed_transactions
            );
            storage.load_persistent_data(false)?;
        }

        // 5. Apply thread.
        let storage = Arc::new(Mutex::new(storage));
        let stop = Arc::new(AtomicBool::new(false));
        let apply_failures = Arc::new(AtomicU64::new(0));
        let halted_on = Arc::new(Mutex::new(None));
        let apply_thread = apply::spawn(apply::ApplyWorker {
            log: Arc::clone(&log),
            storage: Arc::clone(&storage),
            stop: Arc::clone(&stop),
            failures: Arc::clone(&apply_failures),
            halted_on: Arc::clone(&halted_on),
            max_attempts: config.apply_attempts,
        })?;

        // From here on, an early return stops the thread through Drop.
        let mut engine = Self {
            config,
            container,
            storage,
            log,
            schema,
            stop,
            apply_failures,
            halted_on,
            apply_thread: Some(apply_thread),
            startup: StartupReport::default(),
            _lock: lock,
        };

        // 6. Drain, or stop at the transaction the apply thread halted on.
        let log_cleared = engine.drain(None);
        let replay_failures = engine.apply_failures.load(Ordering::Acquire);
        let halted_transaction = engine.halted_transaction();

        // 7. Compact log and storage.
        if log_cleared {
            engine.log.clear_log()?;
        } else {
            log_event!(
                warn,
                subsystems::PERSISTENCE,
                "Keeping transaction log for the next start",
                pending = engine.log.pending_count(),
                failed_attempts = replay_failures
            );
        }
        engine.storage.lock().clean_storage()?;

        // 8. Full load into the container.
        let load = engine.storage.lock().load_persistent_data(true)?;

        log_event!(
            info,
            subsystems::PERSISTENCE,
            "Persistence engine started",
            replayed = replayed_transactions,
            replay_failures = replay_failures,
            objects = load.active_blocks
        );
        engine.startup = StartupReport {
            replayed_transactions,
            replay_failures,
            halted_transaction,
            log_cleared,
            load,
        };
        Ok(engine)
    }

    /// Log a transaction for the apply thread. Returns its log id.
    ///
    /// Delayed transactions wait `two_stage_delay_ms` and can be canceled
    /// with `cancel_delayed_transaction` until then.
    pub fn new_transaction(
        &self,
        transaction: &DurableTransaction,
        is_delayed: bool,
    ) -> Result<i64, PersistenceError> {
        let payload = transaction.to_bytes()?;
        let delay_ms = if is_delayed {
            self.config.two_stage_delay_ms
        } else {
            0
        };
        self.log.new_transaction(&payload, delay_ms).map_err(|e| {
            log_event!(
                error,
                subsystems::PERSISTENCE,
                "Error writing data in transaction log",
                error = %e
            );
            PersistenceError::TransactionLogWrite(e)
        })
    }

    /// Cancel the delayed transaction at the head of the log.
    pub fn cancel_delayed_transaction(&self) -> Result<(), PersistenceError> {
        Ok(self.log.cancel_transaction()?)
    }

    /// Wait until every logged transaction was applied. False on timeout,
    /// or when the apply thread halted with transactions still pending.
    pub fn wait_for_pending(&self, timeout: Option<Duration>) -> bool {
        self.drain(timeout)
    }

    fn drain(&self, timeout: Option<Duration>) -> bool {
        let deadline = timeout.map(|t| Instant::now() + t);
        loop {
            if self.halted_transaction().is_some() || self.log.is_disposed() {
                return self.log.pending_count() == 0;
            }
            let slice = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return false;
                    }
                    (deadline - now).min(HALT_POLL)
                }
                None => HALT_POLL,
            };
            if self.log.wait_until_empty(Some(slice)) {
                return true;
            }
        }
    }

    /// Transaction blocking the log since the apply thread halted on it.
    pub fn halted_transaction(&self) -> Option<i64> {
        *self.halted_on.lock()
    }

    pub fn pending_transactions(&self) -> usize {
        self.log.pending_count()
    }

    /// Failed apply attempts since start, replay and retries included.
    pub fn apply_failures(&self) -> u64 {
        self.apply_failures.load(Ordering::Acquire)
    }

    pub fn storage(&self) -> Arc<Mutex<ReliableStorage>> {
        Arc::clone(&self.storage)
    }

    pub fn container(&self) -> Arc<RwLock<C>> {
        Arc::clone(&self.container)
    }

    pub fn schema(&self) -> &SchemaStore {
        &self.schema
    }

    pub fn config(&self) -> &PersistenceConfig {
        &self.config
    }

    pub fn startup_report(&self) -> &StartupReport {
        &self.startup
    }

    pub fn is_running(&self) -> bool {
        self.apply_thread.is_some()
    }

    /// Stop the apply thread and close files. Idempotent.
    pub fn stop(&mut self) {
        let Some(handle) = self.apply_thread.take() else {
            return;
        };
        self.stop.store(true, Ordering::Release);
        self.log.dispose();
        if handle.join().is_err() {
            log_event!(error, subsystems::PERSISTENCE, "Apply thread panicked");
        }
        self.storage.lock().dispose();
        log_event!(
            info,
            subsystems::PERSISTENCE,
            "Persistence engine stopped",
            pending = self.log.pending_count()
        );
    }
}

impl<C: DataContainer + 'static> Drop for PersistenceEngine<C> {
    fn drop(&mut self) {
        self.stop();
    }
}
