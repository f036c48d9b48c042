//! # Value Objects
//!
//! Configuration and index entries for Reliable Storage.

use super::block::{BlockStatus, PersistentBlock};

/// Configuration for the storage engine.
#[derive(Debug, Clone, PartialEq)]
pub struct StorageConfig {
    /// Reserved size of an appended block relative to its payload (default: 1.5).
    ///
    /// The slack lets later, slightly larger versions be written in place.
    pub growth_factor: f64,

    /// Alignment of appended blocks (default: 4).
    ///
    /// Every appended block is padded so its on-disk size is a multiple of
    /// this value. Readers do not rely on it: files holding unaligned blocks
    /// load and repair the same way. A step of 1 gives the unpadded layout.
    pub block_alignment: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            growth_factor: 1.5,
            block_alignment: 4,
        }
    }
}

impl StorageConfig {
    /// Reserved payload size for a block appended at end of file.
    pub fn reserved_size_for(&self, primary_key: &str, used: i32) -> i32 {
        let grown = ((used as f64) * self.growth_factor) as i64;
        let reserved = grown.max(used as i64);
        let total = PersistentBlock::overhead(primary_key) as i64 + reserved;
        let step = self.block_alignment.max(1) as i64;
        let padding = (step - total % step) % step;
        (reserved + padding).min(i32::MAX as i64) as i32
    }
}

/// Where the current copy of a key lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockLocation {
    pub offset: u64,
    pub last_transaction_id: i32,
    /// `Active` or `Deleted`; dirty copies are never indexed.
    pub status: BlockStatus,
}

impl BlockLocation {
    pub fn is_active(&self) -> bool {
        self.status == BlockStatus::Active
    }
}
