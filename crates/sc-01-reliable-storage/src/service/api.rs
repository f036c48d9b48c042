//! # Reliable Storage API Implementation

use super::*;
use crate::domain::repair::LoadReport;
use crate::ports::inbound::ReliableStorageApi;
use sc_telemetry::{log_event, logging::subsystems};

impl ReliableStorageApi for ReliableStorage {
    fn store_block(
        &mut self,
        data: &[u8],
        primary_key: &str,
        transaction_id: i32,
    ) -> Result<(), StorageError> {
        self.store_local(data, primary_key, transaction_id)?;
        if let Some(backup) = self.backup.as_mut() {
            backup.store_local(data, primary_key, transaction_id)?;
        }
        Ok(())
    }

    fn delete_block(&mut self, primary_key: &str, transaction_id: i32) -> Result<(), StorageError> {
        self.delete_local(primary_key, transaction_id)?;
        if let Some(backup) = self.backup.as_mut() {
            match backup.delete_local(primary_key, transaction_id) {
                Ok(()) => {}
                // Mirror attached after the key was written: nothing to tombstone.
                Err(StorageError::KeyNotFound(_)) => {
                    log_event!(
                        debug,
                        subsystems::STORAGE,
                        "Deleted key absent from backup",
                        primary_key = %primary_key
                    );
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    fn load_persistent_data(
        &mut self,
        use_object_processor: bool,
    ) -> Result<LoadReport, StorageError> {
        self.load_with_backup(use_object_processor)
    }

    fn clean_storage(&mut self) -> Result<(), StorageError> {
        self.compact()
    }

    fn read_block(&self, primary_key: &str) -> Result<Option<PersistentBlock>, StorageError> {
        match self.location(primary_key) {
            Some(location) if location.is_active() => self.read_at(location.offset),
            _ => Ok(None),
        }
    }

    fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .index
            .iter()
            .filter(|(_, location)| location.is_active())
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        keys
    }

    fn block_count(&self) -> usize {
        self.index.values().filter(|l| l.is_active()).count()
    }

    fn inactive_block_count(&self) -> u64 {
        self.inactive_blocks
    }
}
