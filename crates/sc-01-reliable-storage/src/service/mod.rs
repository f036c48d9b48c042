//! # Reliable Storage Service
//!
//! File-backed implementation of `ReliableStorageApi` over `datastore.bin`.
//!
//! ## Architecture
//!
//! - One file handle, no internal locking; callers serialize access
//! - In-memory index `primary key -> BlockLocation`, rebuilt on every load
//! - Optional backup mirror written synchronously on every store and delete
//!
//! ## Files
//!
//! - `api.rs` - `ReliableStorageApi` implementation
//! - `recovery.rs` - load scan, dirty-span repair, backup recovery
//! - `compaction.rs` - `clean_storage`

mod api;
mod compaction;
mod recovery;

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use sc_telemetry::{log_block_event, metric_inc, BLOCKS_DELETED, BLOCKS_WRITTEN};

use crate::domain::block::{BlockRead, BlockStatus, PersistentBlock};
use crate::domain::errors::StorageError;
use crate::domain::value_objects::{BlockLocation, StorageConfig};
use crate::ports::outbound::PersistentObjectProcessor;

/// Durable block store over a single file.
pub struct ReliableStorage {
    /// Path of `datastore.bin`.
    pub(crate) path: PathBuf,
    /// `None` once disposed.
    pub(crate) file: Option<File>,
    pub(crate) config: StorageConfig,
    /// Latest indexed copy of every key (active or tombstoned).
    pub(crate) index: HashMap<String, BlockLocation>,
    /// Deleted and dirty blocks since the last compaction.
    pub(crate) inactive_blocks: u64,
    /// Set once a scan has rebuilt the index from the file.
    pub(crate) loaded: bool,
    pub(crate) processor: Option<Box<dyn PersistentObjectProcessor>>,
    pub(crate) backup: Option<Box<ReliableStorage>>,
}

impl std::fmt::Debug for ReliableStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReliableStorage")
            .field("path", &self.path)
            .field("keys", &self.index.len())
            .field("inactive_blocks", &self.inactive_blocks)
            .field("has_backup", &self.backup.is_some())
            .finish()
    }
}

impl ReliableStorage {
    /// Open (or create) the storage file at `path` with default settings.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        Self::open_with_config(path, StorageConfig::default())
    }

    pub fn open_with_config(
        path: impl AsRef<Path>,
        config: StorageConfig,
    ) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = open_data_file(&path)?;

        Ok(Self {
            path,
            file: Some(file),
            config,
            index: HashMap::new(),
            inactive_blocks: 0,
            loaded: false,
            processor: None,
            backup: None,
        })
    }

    /// Attach the processor fed by `load_persistent_data(true)`.
    pub fn with_processor(mut self, processor: impl PersistentObjectProcessor + 'static) -> Self {
        self.processor = Some(Box::new(processor));
        self
    }

    /// Mirror every store and delete into `backup`.
    pub fn with_backup(mut self, backup: ReliableStorage) -> Self {
        self.backup = Some(Box::new(backup));
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    pub fn backup(&self) -> Option<&ReliableStorage> {
        self.backup.as_deref()
    }

    /// Current file length in bytes.
    pub fn storage_size(&self) -> Result<u64, StorageError> {
        Ok(self.file()?.metadata()?.len())
    }

    /// Index entry of `primary_key`, tombstones included.
    pub fn location(&self, primary_key: &str) -> Option<BlockLocation> {
        self.index.get(primary_key).copied()
    }

    /// Flush file contents to disk, backup included.
    pub fn sync(&self) -> Result<(), StorageError> {
        self.file()?.sync_data()?;
        if let Some(backup) = &self.backup {
            backup.sync()?;
        }
        Ok(())
    }

    /// Close the file. Every later call fails with `Disposed`.
    pub fn dispose(&mut self) {
        self.file = None;
        if let Some(backup) = self.backup.as_mut() {
            backup.dispose();
        }
    }

    pub(crate) fn file(&self) -> Result<&File, StorageError> {
        self.file.as_ref().ok_or(StorageError::Disposed)
    }

    // =========================================================================
    // BLOCK I/O
    // =========================================================================

    pub(crate) fn parse_at(&self, offset: u64) -> Result<BlockRead, StorageError> {
        let mut reader = BufReader::new(self.file()?);
        reader.seek(SeekFrom::Start(offset))?;
        Ok(PersistentBlock::parse(&mut reader, offset)?)
    }

    pub(crate) fn read_at(&self, offset: u64) -> Result<Option<PersistentBlock>, StorageError> {
        let mut reader = BufReader::new(self.file()?);
        reader.seek(SeekFrom::Start(offset))?;
        PersistentBlock::read(&mut reader, offset)
    }

    pub(crate) fn write_at(&self, offset: u64, bytes: &[u8]) -> Result<(), StorageError> {
        let mut file = self.file()?;
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(bytes)?;
        Ok(())
    }

    /// Append at end of file and return the block offset.
    fn append(&self, block: &mut PersistentBlock) -> Result<u64, StorageError> {
        let mut file = self.file()?;
        let offset = file.seek(SeekFrom::End(0))?;
        block.offset = offset;
        file.write_all(&block.to_bytes())?;
        Ok(offset)
    }

    // =========================================================================
    // WRITE PATH
    // =========================================================================

    /// Store into this file only, without mirroring.
    pub(crate) fn store_local(
        &mut self,
        data: &[u8],
        primary_key: &str,
        transaction_id: i32,
    ) -> Result<(), StorageError> {
        let mut block = PersistentBlock::new(data, primary_key, transaction_id);

        if let Some(location) = self.location(primary_key) {
            // Old copy is read leniently: a damaged one only forces an append.
            match self.parse_at(location.offset)? {
                BlockRead::Block(old)
                    if old.is_valid_block() && old.reserved_data_size > block.used_data_size =>
                {
                    block.set_reserved_data_size(old.reserved_data_size);
                    block.offset = location.offset;
                    self.write_at(location.offset, &block.to_bytes())?;
                    if old.status != BlockStatus::Active {
                        self.inactive_blocks = self.inactive_blocks.saturating_sub(1);
                    }
                    self.index.insert(
                        primary_key.to_string(),
                        BlockLocation {
                            offset: location.offset,
                            last_transaction_id: transaction_id,
                            status: BlockStatus::Active,
                        },
                    );
                    metric_inc!(BLOCKS_WRITTEN, &["in_place"]);
                    log_block_event!(
                        trace,
                        "Block rewritten in place",
                        primary_key,
                        location.offset,
                        transaction_id = transaction_id
                    );
                    return Ok(());
                }
                BlockRead::Block(mut old) => {
                    if old.is_valid_block() {
                        old.status = BlockStatus::Dirty;
                        self.write_at(location.offset, &old.to_bytes())?;
                    } else {
                        let status_at = location.offset + old.status_field_offset();
                        self.write_at(status_at, &(BlockStatus::Dirty as i32).to_le_bytes())?;
                    }
                    if location.status == BlockStatus::Active {
                        self.inactive_blocks += 1;
                    }
                }
                BlockRead::Unparseable(kind) => {
                    log_block_event!(
                        warn,
                        "Previous copy unreadable, appending new copy",
                        primary_key,
                        location.offset,
                        kind = %kind
                    );
                    self.inactive_blocks += 1;
                }
                BlockRead::EndOfStream => {}
            }
        }

        let reserved = self
            .config
            .reserved_size_for(primary_key, block.used_data_size);
        block.set_reserved_data_size(reserved);
        let offset = self.append(&mut block)?;
        self.index.insert(
            primary_key.to_string(),
            BlockLocation {
                offset,
                last_transaction_id: transaction_id,
                status: BlockStatus::Active,
            },
        );
        metric_inc!(BLOCKS_WRITTEN, &["append"]);
        log_block_event!(
            trace,
            "Block appended",
            primary_key,
            offset,
            transaction_id = transaction_id,
            reserved = reserved
        );
        Ok(())
    }

    /// Tombstone in this file only, without mirroring.
    pub(crate) fn delete_local(
        &mut self,
        primary_key: &str,
        transaction_id: i32,
    ) -> Result<(), StorageError> {
        let location = self
            .location(primary_key)
            .ok_or_else(|| StorageError::KeyNotFound(primary_key.to_string()))?;
        let mut block = self
            .read_at(location.offset)?
            .ok_or_else(|| StorageError::KeyNotFound(primary_key.to_string()))?;

        if block.status == BlockStatus::Active {
            block.status = BlockStatus::Deleted;
            block.last_transaction_id = transaction_id;
            self.write_at(location.offset, &block.to_bytes())?;
            self.inactive_blocks += 1;
            metric_inc!(BLOCKS_DELETED);
            log_block_event!(
                trace,
                "Block deleted",
                primary_key,
                location.offset,
                transaction_id = transaction_id
            );
        } else if block.last_transaction_id != transaction_id {
            return Err(StorageError::InconsistentDelete {
                primary_key: primary_key.to_string(),
                stored_transaction_id: block.last_transaction_id,
                requested_transaction_id: transaction_id,
            });
        }

        // The tombstone stays indexed so a replayed delete still finds it.
        self.index.insert(
            primary_key.to_string(),
            BlockLocation {
                offset: location.offset,
                last_transaction_id: transaction_id,
                status: BlockStatus::Deleted,
            },
        );
        Ok(())
    }
}

pub(crate) fn open_data_file(path: &Path) -> Result<File, StorageError> {
    Ok(OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)?)
}
