//! # Load and Corruption Recovery
//!
//! ## Algorithm
//!
//! 1. Scan blocks sequentially from offset 0, rebuilding the index
//! 2. On the first corrupt block, overwrite the span up to the next valid
//!    block with one dirty block (or truncate a short tail)
//! 3. Restart the scan from offset 0 until a scan completes cleanly
//! 4. Copy keys the backup has but the primary lost back into the primary
//!
//! The search for the next valid block probes every byte offset. Blocks this
//! crate appends are aligned to `block_alignment`, but files written with the
//! unpadded `used * growth_factor` rule do not, and their blocks must still
//! be found.

use std::io::{BufReader, Read, Seek, SeekFrom};

use sc_telemetry::{
    log_event, logging::subsystems, BLOCKS_RECOVERED_FROM_BACKUP, CORRUPT_SPANS_REPAIRED,
};

use super::*;
use crate::domain::block::{BlockRead, BEGIN_MARKER, MIN_DIRTY_BLOCK_SIZE};
use crate::domain::errors::CorruptionKind;
use crate::domain::repair::LoadReport;
use crate::ports::inbound::ReliableStorageApi;

impl ReliableStorage {
    /// Load the primary and, concurrently, the backup; then recover from backup.
    pub(crate) fn load_with_backup(
        &mut self,
        use_processor: bool,
    ) -> Result<LoadReport, StorageError> {
        let mut backup = self.backup.take();

        let (primary_result, backup_result) = std::thread::scope(|scope| {
            let backup_load = backup
                .as_deref_mut()
                .map(|backup| scope.spawn(move || backup.load_local(false)));
            let primary = self.load_local(use_processor);
            let backup = backup_load.map(|handle| {
                handle.join().unwrap_or_else(|_| {
                    Err(StorageError::Io(std::io::Error::new(
                        std::io::ErrorKind::Other,
                        "backup load thread panicked",
                    )))
                })
            });
            (primary, backup)
        });
        self.backup = backup;

        let mut report = primary_result?;

        match backup_result {
            Some(Ok(backup_report)) => {
                if !backup_report.is_clean() {
                    log_event!(
                        warn,
                        subsystems::STORAGE,
                        "Backup storage repaired during load",
                        repaired_spans = backup_report.repaired_spans
                    );
                }
                report.recovered_from_backup = self.recover_from_backup(use_processor)?;
                report.active_blocks += report.recovered_from_backup;
            }
            Some(Err(e)) => {
                log_event!(
                    error,
                    subsystems::STORAGE,
                    "Backup load failed, skipping backup recovery",
                    error = %e
                );
            }
            None => {}
        }

        if use_processor {
            let data_dir = self
                .path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default();
            if let Some(processor) = self.processor.as_mut() {
                processor.end_process(&data_dir);
            }
        }

        log_event!(
            info,
            subsystems::STORAGE,
            "Storage loaded",
            path = %self.path.display(),
            active = report.active_blocks,
            deleted = report.deleted_blocks,
            dirty = report.dirty_blocks,
            repaired_spans = report.repaired_spans,
            recovered_from_backup = report.recovered_from_backup
        );
        Ok(report)
    }

    /// Scan this file until a pass completes without corruption.
    pub(crate) fn load_local(&mut self, use_processor: bool) -> Result<LoadReport, StorageError> {
        let mut report = LoadReport::new();
        // Blocks before this offset were already handed to the processor.
        let mut processed_up_to = 0u64;
        let mut last_repair: Option<u64> = None;

        loop {
            match self.scan(use_processor, &mut processed_up_to, &mut report) {
                Ok(()) => {
                    self.loaded = true;
                    return Ok(report);
                }
                Err(StorageError::BlockCorrupted { offset, kind }) => {
                    if last_repair.is_some_and(|previous| offset <= previous) {
                        // A repaired span must never fail again.
                        return Err(StorageError::corrupted(offset, kind));
                    }
                    self.mark_invalid_blocks_as_dirty(offset, kind, &mut report)?;
                    last_repair = Some(offset);
                    report.scan_restarts += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn scan(
        &mut self,
        use_processor: bool,
        processed_up_to: &mut u64,
        report: &mut LoadReport,
    ) -> Result<(), StorageError> {
        self.index.clear();
        self.inactive_blocks = 0;
        report.reset_counts();

        let file = self.file.as_ref().ok_or(StorageError::Disposed)?;
        let mut reader = BufReader::new(file);
        reader.seek(SeekFrom::Start(0))?;
        let mut offset = 0u64;

        while let Some(block) = PersistentBlock::read(&mut reader, offset)? {
            match block.status {
                BlockStatus::Active | BlockStatus::Deleted => {
                    // Later copies of a key win.
                    self.index.insert(
                        block.primary_key.clone(),
                        BlockLocation {
                            offset,
                            last_transaction_id: block.last_transaction_id,
                            status: block.status,
                        },
                    );
                }
                BlockStatus::Dirty => {}
            }

            match block.status {
                BlockStatus::Active => {
                    report.active_blocks += 1;
                    if use_processor && offset >= *processed_up_to {
                        if let Some(processor) = self.processor.as_mut() {
                            if let Err(e) = processor.process(block.raw_data()) {
                                log_block_event!(
                                    warn,
                                    "Object processor rejected block",
                                    block.primary_key,
                                    offset,
                                    error = %e
                                );
                            }
                        }
                        *processed_up_to = offset + block.storage_size;
                    }
                }
                BlockStatus::Deleted => {
                    report.deleted_blocks += 1;
                    self.inactive_blocks += 1;
                }
                BlockStatus::Dirty => {
                    report.dirty_blocks += 1;
                    self.inactive_blocks += 1;
                }
            }

            offset += block.storage_size;
        }
        Ok(())
    }

    /// Overwrite the corrupt region starting at `bad_offset`.
    ///
    /// The region ends at the next offset holding a valid block, or at end
    /// of file. A tail too short for a dirty block is cut off.
    pub(crate) fn mark_invalid_blocks_as_dirty(
        &mut self,
        bad_offset: u64,
        kind: CorruptionKind,
        report: &mut LoadReport,
    ) -> Result<(), StorageError> {
        let file_len = self.storage_size()?;
        let step = self.config.block_alignment.max(1);
        let next_valid = self.find_next_valid_block(bad_offset, file_len)?;

        let span = match next_valid {
            Some(next) => next - bad_offset,
            None => {
                let tail = file_len - bad_offset;
                tail - tail % step
            }
        };

        match PersistentBlock::make_dirty_block(span) {
            Some(dirty) => {
                self.write_at(bad_offset, &dirty.to_bytes())?;
                if next_valid.is_none() && bad_offset + span < file_len {
                    self.file()?.set_len(bad_offset + span)?;
                }
                report.record_repair(span);
                log_block_event!(
                    warn,
                    "Corrupt span replaced by dirty block",
                    "#",
                    bad_offset,
                    kind = %kind,
                    span_bytes = span,
                    next_valid = ?next_valid
                );
            }
            _ => {
                self.file()?.set_len(bad_offset)?;
                report.record_repair(file_len - bad_offset);
                log_block_event!(
                    warn,
                    "Corrupt tail truncated",
                    "#",
                    bad_offset,
                    kind = %kind,
                    span_bytes = file_len - bad_offset
                );
            }
        }
        self.file()?.sync_data()?;
        metric_inc!(CORRUPT_SPANS_REPAIRED);
        Ok(())
    }

    /// First offset after `bad_offset` (at least one dirty block away) where
    /// a fully valid block starts.
    fn find_next_valid_block(
        &self,
        bad_offset: u64,
        file_len: u64,
    ) -> Result<Option<u64>, StorageError> {
        let marker = BEGIN_MARKER.to_le_bytes();
        let mut position = bad_offset + MIN_DIRTY_BLOCK_SIZE;
        if position >= file_len {
            return Ok(None);
        }

        let mut reader = BufReader::new(self.file()?);
        reader.seek(SeekFrom::Start(position))?;

        // Last four bytes read; `seen` counts how many of them are valid.
        let mut window = [0u8; 4];
        let mut seen = 0;
        while position < file_len {
            let mut byte = [0u8; 1];
            reader.read_exact(&mut byte)?;
            position += 1;
            window.rotate_left(1);
            window[3] = byte[0];
            seen = (seen + 1).min(4);
            if seen < 4 || window != marker {
                continue;
            }

            let candidate = position - 4;
            reader.seek(SeekFrom::Start(candidate))?;
            if let BlockRead::Block(block) = PersistentBlock::parse(&mut reader, candidate)? {
                if block.is_valid_block() {
                    return Ok(Some(candidate));
                }
            }
            reader.seek(SeekFrom::Start(position))?;
        }
        Ok(None)
    }

    /// Store keys that are active in the backup but unknown to the primary.
    fn recover_from_backup(&mut self, use_processor: bool) -> Result<u64, StorageError> {
        let Some(backup) = self.backup.take() else {
            return Ok(0);
        };

        let mut recovered = 0;
        let result: Result<(), StorageError> = (|| {
            for key in backup.keys() {
                if self.index.contains_key(&key) {
                    continue;
                }
                let Some(block) = backup.read_block(&key)? else {
                    continue;
                };
                self.store_local(block.raw_data(), &key, block.last_transaction_id)?;
                if use_processor {
                    if let Some(processor) = self.processor.as_mut() {
                        if let Err(e) = processor.process(block.raw_data()) {
                            log_block_event!(
                                warn,
                                "Object processor rejected recovered block",
                                key,
                                block.offset,
                                error = %e
                            );
                        }
                    }
                }
                recovered += 1;
                metric_inc!(BLOCKS_RECOVERED_FROM_BACKUP);
                log_block_event!(
                    warn,
                    "Block recovered from backup",
                    key,
                    block.offset,
                    transaction_id = block.last_transaction_id
                );
            }
            Ok(())
        })();

        self.backup = Some(backup);
        result.map(|()| recovered)
    }
}
