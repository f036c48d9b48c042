//! # Transaction Log Service
//!
//! Durable FIFO of opaque transactions with exactly one consumer.
//!
//! ## Concurrency
//!
//! One mutex guards the file and the queue. Two condition variables hang
//! off it:
//!
//! - `queue_signal`: the queue became non-empty or the log was disposed
//! - `wake_signal`: a delayed head was canceled or the log was disposed
//!
//! A third, `drained_signal`, lets startup wait for replay to finish.
//!
//! ## Crash behaviour
//!
//! The header is rewritten only after a record is fully written, so a torn
//! append is cut off on reload. Records left in `Processing` are demoted to
//! `ToProcess` and replayed; applying a transaction twice must be harmless.

#[cfg(test)]
mod tests;

use std::collections::VecDeque;
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{Duration, Instant, SystemTime};

use parking_lot::{Condvar, Mutex, MutexGuard};
use sc_telemetry::logging::subsystems;
use sc_telemetry::{
    log_event, log_tx_event, metric_inc, PENDING_TRANSACTIONS, TRANSACTIONS_CANCELED,
    TRANSACTIONS_LOGGED,
};

use crate::domain::errors::TransactionLogError;
use crate::domain::transaction::{
    ticks_from_system_time, TransactionData, TransactionStatus, HEADER_SIZE,
};

/// Last id handed out in this process. Reloads push it past every id on disk.
static LAST_TRANSACTION_ID: AtomicI64 = AtomicI64::new(0);

fn next_transaction_id() -> i64 {
    LAST_TRANSACTION_ID.fetch_add(1, Ordering::SeqCst) + 1
}

struct LogState {
    file: Option<File>,
    /// End of the last complete record.
    last_offset: u64,
    pending: VecDeque<TransactionData>,
    disposed: bool,
}

impl LogState {
    fn file(&self) -> Result<&File, TransactionLogError> {
        match (&self.file, self.disposed) {
            (Some(file), false) => Ok(file),
            _ => Err(TransactionLogError::Disposed),
        }
    }

    fn write_status(
        &self,
        offset: u64,
        status: TransactionStatus,
    ) -> Result<(), TransactionLogError> {
        let mut file = self.file()?;
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(&(status as i32).to_le_bytes())?;
        file.sync_data()?;
        Ok(())
    }

    fn head_id(&self) -> Option<i64> {
        self.pending.front().map(|tx| tx.id)
    }

    fn publish_pending(&self) {
        PENDING_TRANSACTIONS.set(self.pending.len() as f64);
    }
}

/// Append-only log of pending transactions.
pub struct TransactionLog {
    path: PathBuf,
    state: Mutex<LogState>,
    queue_signal: Condvar,
    wake_signal: Condvar,
    drained_signal: Condvar,
}

impl std::fmt::Debug for TransactionLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionLog")
            .field("path", &self.path)
            .field("pending", &self.pending_count())
            .finish()
    }
}

impl TransactionLog {
    /// Open the log at `path`, replaying every record in it.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, TransactionLogError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        let len = file.metadata()?.len();
        let last_offset = if len < HEADER_SIZE {
            write_fresh_header(&file)?;
            HEADER_SIZE
        } else {
            let mut header = [0u8; 8];
            file.seek(SeekFrom::Start(0))?;
            file.read_exact(&mut header)?;
            let last_offset = i64::from_le_bytes(header);
            if last_offset < HEADER_SIZE as i64 || last_offset as u64 > len {
                return Err(TransactionLogError::corrupted(
                    0,
                    format!("last offset {} outside file of {} bytes", last_offset, len),
                ));
            }
            let last_offset = last_offset as u64;
            if last_offset < len {
                log_event!(
                    warn,
                    subsystems::TRANSACTION_LOG,
                    "Discarding torn append at end of transaction log",
                    offset = last_offset,
                    bytes = len - last_offset
                );
                file.set_len(last_offset)?;
            }
            last_offset
        };

        let (pending, max_id) = replay(&file, last_offset)?;
        LAST_TRANSACTION_ID.fetch_max(max_id, Ordering::SeqCst);

        let mut state = LogState {
            file: Some(file),
            last_offset,
            pending: VecDeque::new(),
            disposed: false,
        };
        for mut tx in pending {
            if tx.status == TransactionStatus::Processing {
                log_tx_event!(
                    warn,
                    subsystems::TRANSACTION_LOG,
                    "Transaction interrupted while processing, scheduling replay",
                    tx.id
                );
                state.write_status(tx.offset, TransactionStatus::ToProcess)?;
                tx.status = TransactionStatus::ToProcess;
            }
            state.pending.push_back(tx);
        }
        state.publish_pending();

        log_event!(
            info,
            subsystems::TRANSACTION_LOG,
            "Transaction log opened",
            path = %path.display(),
            pending = state.pending.len(),
            last_offset = last_offset
        );

        Ok(Self {
            path,
            state: Mutex::new(state),
            queue_signal: Condvar::new(),
            wake_signal: Condvar::new(),
            drained_signal: Condvar::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a transaction and wake the consumer. Returns its id.
    ///
    /// The record is synced before the header moves past it.
    pub fn new_transaction(&self, data: &[u8], delay_ms: i32) -> Result<i64, TransactionLogError> {
        let mut state = self.state.lock();
        let offset = state.last_offset;
        let tx = TransactionData {
            id: next_transaction_id(),
            timestamp: ticks_from_system_time(SystemTime::now()),
            data: data.to_vec(),
            offset,
            delay_ms: delay_ms.max(0),
            status: TransactionStatus::ToProcess,
        };

        {
            let mut file = state.file()?;
            file.seek(SeekFrom::Start(offset))?;
            file.write_all(&tx.encode())?;
            file.sync_data()?;
            let end = offset + tx.record_size();
            file.seek(SeekFrom::Start(0))?;
            file.write_all(&(end as i64).to_le_bytes())?;
            file.sync_data()?;
        }
        state.last_offset = offset + tx.record_size();

        let id = tx.id;
        log_tx_event!(
            debug,
            subsystems::TRANSACTION_LOG,
            "Transaction logged",
            id,
            offset = offset,
            bytes = data.len(),
            delay_ms = tx.delay_ms
        );
        state.pending.push_back(tx);
        state.publish_pending();
        metric_inc!(TRANSACTIONS_LOGGED);
        self.queue_signal.notify_all();
        Ok(id)
    }

    /// Block until a transaction can be applied and mark it `Processing`.
    ///
    /// Returns `None` when the log is disposed, or when the delayed head was
    /// canceled during its wait. The returned transaction stays at the head
    /// until `end_processing`, or goes back to `ToProcess` through
    /// `retry_processing`.
    pub fn start_processing(&self) -> Result<Option<TransactionData>, TransactionLogError> {
        let mut state = self.state.lock();

        let head = loop {
            if state.disposed {
                return Ok(None);
            }
            if let Some(head) = state.pending.front() {
                break head.clone();
            }
            self.queue_signal.wait(&mut state);
        };

        if head.status != TransactionStatus::ToProcess {
            return Err(TransactionLogError::InvalidTransition {
                id: head.id,
                from: head.status,
                to: TransactionStatus::Processing,
            });
        }

        if head.is_delayed() && !self.wait_for_delay(&mut state, &head) {
            return Ok(None);
        }

        state.write_status(head.offset, TransactionStatus::Processing)?;
        let front = state
            .pending
            .front_mut()
            .ok_or(TransactionLogError::UnexpectedHead {
                expected: head.id,
                actual: None,
            })?;
        front.status = TransactionStatus::Processing;
        log_tx_event!(
            trace,
            subsystems::TRANSACTION_LOG,
            "Transaction processing",
            head.id
        );
        Ok(Some(front.clone()))
    }

    /// Sleep out the head's remaining delay. False when it was canceled or
    /// the log disposed in the meantime.
    fn wait_for_delay(&self, state: &mut MutexGuard<'_, LogState>, head: &TransactionData) -> bool {
        let deadline = Instant::now() + head.remaining_delay(SystemTime::now());
        loop {
            if state.disposed || state.head_id() != Some(head.id) {
                return false;
            }
            if Instant::now() >= deadline {
                return true;
            }
            self.wake_signal.wait_until(state, deadline);
        }
    }

    /// Dequeue the head and mark it `Processed`.
    pub fn end_processing(&self, tx: &TransactionData) -> Result<(), TransactionLogError> {
        let mut state = self.state.lock();
        self.check_processing_head(&state, tx)?;
        state.write_status(tx.offset, TransactionStatus::Processed)?;
        state.pending.pop_front();
        self.after_dequeue(&state);
        log_tx_event!(
            trace,
            subsystems::TRANSACTION_LOG,
            "Transaction processed",
            tx.id
        );
        Ok(())
    }

    /// Put a head whose application failed back to `ToProcess`.
    ///
    /// The transaction keeps its place at the head, so nothing logged after
    /// it can be processed before it succeeds.
    pub fn retry_processing(&self, tx: &TransactionData) -> Result<(), TransactionLogError> {
        let mut state = self.state.lock();
        self.check_processing_head(&state, tx)?;
        state.write_status(tx.offset, TransactionStatus::ToProcess)?;
        if let Some(front) = state.pending.front_mut() {
            front.status = TransactionStatus::ToProcess;
        }
        self.queue_signal.notify_all();
        log_tx_event!(
            warn,
            subsystems::TRANSACTION_LOG,
            "Transaction returned for retry",
            tx.id
        );
        Ok(())
    }

    /// Cancel the delayed head. No-op on an empty queue.
    pub fn cancel_transaction(&self) -> Result<(), TransactionLogError> {
        let mut state = self.state.lock();
        let Some(head) = state.pending.front() else {
            return Ok(());
        };
        let (id, offset, status) = (head.id, head.offset, head.status);
        if !head.is_delayed() {
            return Err(TransactionLogError::NotDelayed { id });
        }
        if !status.can_move_to(TransactionStatus::Canceled) {
            return Err(TransactionLogError::InvalidTransition {
                id,
                from: status,
                to: TransactionStatus::Canceled,
            });
        }

        state.write_status(offset, TransactionStatus::Canceled)?;
        state.pending.pop_front();
        self.after_dequeue(&state);
        self.wake_signal.notify_all();
        metric_inc!(TRANSACTIONS_CANCELED);
        log_tx_event!(
            debug,
            subsystems::TRANSACTION_LOG,
            "Transaction canceled",
            id
        );
        Ok(())
    }

    /// Recreate an empty log. Only allowed with nothing pending.
    pub fn clear_log(&self) -> Result<(), TransactionLogError> {
        let mut state = self.state.lock();
        if !state.pending.is_empty() {
            return Err(TransactionLogError::PendingTransactions {
                count: state.pending.len(),
            });
        }
        {
            let file = state.file()?;
            file.set_len(0)?;
            write_fresh_header(file)?;
        }
        state.last_offset = HEADER_SIZE;
        log_event!(
            info,
            subsystems::TRANSACTION_LOG,
            "Transaction log cleared",
            path = %self.path.display()
        );
        Ok(())
    }

    pub fn pending_count(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// Copy of the pending queue, head first.
    pub fn pending(&self) -> Vec<TransactionData> {
        self.state.lock().pending.iter().cloned().collect()
    }

    /// Block until the queue is empty. False on timeout or disposal.
    pub fn wait_until_empty(&self, timeout: Option<Duration>) -> bool {
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut state = self.state.lock();
        while !state.pending.is_empty() {
            if state.disposed {
                return false;
            }
            match deadline {
                Some(deadline) => {
                    if self
                        .drained_signal
                        .wait_until(&mut state, deadline)
                        .timed_out()
                        && !state.pending.is_empty()
                    {
                        return false;
                    }
                }
                None => self.drained_signal.wait(&mut state),
            }
        }
        true
    }

    /// Close the file and release every waiting thread.
    pub fn dispose(&self) {
        let mut state = self.state.lock();
        state.disposed = true;
        state.file = None;
        self.queue_signal.notify_all();
        self.wake_signal.notify_all();
        self.drained_signal.notify_all();
    }

    pub fn is_disposed(&self) -> bool {
        self.state.lock().disposed
    }

    fn check_processing_head(
        &self,
        state: &LogState,
        tx: &TransactionData,
    ) -> Result<(), TransactionLogError> {
        state.file()?;
        let head = state
            .pending
            .front()
            .ok_or(TransactionLogError::UnexpectedHead {
                expected: tx.id,
                actual: None,
            })?;
        if head.id != tx.id {
            return Err(TransactionLogError::UnexpectedHead {
                expected: tx.id,
                actual: Some(head.id),
            });
        }
        if head.status != TransactionStatus::Processing {
            return Err(TransactionLogError::InvalidTransition {
                id: head.id,
                from: head.status,
                to: TransactionStatus::Processed,
            });
        }
        Ok(())
    }

    fn after_dequeue(&self, state: &LogState) {
        state.publish_pending();
        if state.pending.is_empty() {
            self.drained_signal.notify_all();
        }
    }
}

impl Drop for TransactionLog {
    fn drop(&mut self) {
        self.dispose();
    }
}

fn write_fresh_header(mut file: &File) -> Result<(), TransactionLogError> {
    file.seek(SeekFrom::Start(0))?;
    file.write_all(&(HEADER_SIZE as i64).to_le_bytes())?;
    file.sync_data()?;
    Ok(())
}

/// Read every record up to `last_offset`; return the pending ones and the highest id.
fn replay(file: &File, last_offset: u64) -> Result<(Vec<TransactionData>, i64), TransactionLogError> {
    let mut reader = BufReader::new(file);
    reader.seek(SeekFrom::Start(HEADER_SIZE))?;
    let mut offset = HEADER_SIZE;
    let mut pending = Vec::new();
    let mut max_id = 0;

    while offset < last_offset {
        let tx = TransactionData::decode(&mut reader, offset)?;
        offset += tx.record_size();
        max_id = max_id.max(tx.id);
        if tx.status.is_pending() {
            pending.push(tx);
        }
    }
    if offset != last_offset {
        return Err(TransactionLogError::corrupted(
            offset,
            "last record overruns header offset",
        ));
    }
    Ok((pending, max_id))
}
