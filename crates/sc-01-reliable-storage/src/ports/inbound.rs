//! # Inbound Ports (Driving Ports)
//!
//! The API the persistence engine drives. `ReliableStorage` is the file
//! implementation; the trait lets the engine be exercised against others.

use crate::domain::block::PersistentBlock;
use crate::domain::errors::StorageError;
use crate::domain::repair::LoadReport;

/// Durable keyed block store.
///
/// Implementations do no internal locking. Callers serialize access.
pub trait ReliableStorageApi {
    /// Store the latest version of `primary_key`.
    ///
    /// Rewrites the existing block in place when it is valid and its reserved
    /// area exceeds the new payload; otherwise marks it dirty and appends.
    /// Replaying the same call is harmless.
    fn store_block(
        &mut self,
        data: &[u8],
        primary_key: &str,
        transaction_id: i32,
    ) -> Result<(), StorageError>;

    /// Tombstone the block of `primary_key`.
    ///
    /// ## Errors
    ///
    /// - `KeyNotFound`: nothing was ever stored for the key
    /// - `InconsistentDelete`: the block is not active and was not deleted by `transaction_id`
    fn delete_block(&mut self, primary_key: &str, transaction_id: i32) -> Result<(), StorageError>;

    /// Scan the file, rebuild the index and optionally feed active payloads
    /// to the object processor. Corruption is repaired, not returned.
    fn load_persistent_data(&mut self, use_object_processor: bool)
        -> Result<LoadReport, StorageError>;

    /// Rewrite the file with active blocks only.
    fn clean_storage(&mut self) -> Result<(), StorageError>;

    /// Current active block of `primary_key`.
    fn read_block(&self, primary_key: &str) -> Result<Option<PersistentBlock>, StorageError>;

    /// Keys with an active block.
    fn keys(&self) -> Vec<String>;

    /// Number of active blocks.
    fn block_count(&self) -> usize;

    /// Deleted and dirty blocks awaiting compaction.
    fn inactive_block_count(&self) -> u64;
}
