//! # Load Report
//!
//! What a `load_persistent_data` pass found and fixed. Corruption is healed
//! silently during load; the report is how callers still get to see it.

/// Result of loading a storage file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Live blocks in the final clean scan.
    pub active_blocks: u64,
    /// Tombstoned blocks in the final clean scan.
    pub deleted_blocks: u64,
    /// Superseded or repaired blocks in the final clean scan.
    pub dirty_blocks: u64,
    /// Corrupt regions overwritten with a dirty block or truncated.
    pub repaired_spans: u64,
    /// Bytes covered by those regions.
    pub repaired_bytes: u64,
    /// Keys copied back from the backup mirror.
    pub recovered_from_backup: u64,
    /// Times the scan started over from offset 0 after a repair.
    pub scan_restarts: u64,
}

impl LoadReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// No corruption was found and nothing came from backup.
    pub fn is_clean(&self) -> bool {
        self.repaired_spans == 0 && self.recovered_from_backup == 0
    }

    pub fn record_repair(&mut self, span_bytes: u64) {
        self.repaired_spans += 1;
        self.repaired_bytes += span_bytes;
    }

    /// Forget block counts before a rescan; repair totals are kept.
    pub(crate) fn reset_counts(&mut self) {
        self.active_blocks = 0;
        self.deleted_blocks = 0;
        self.dirty_blocks = 0;
    }
}
