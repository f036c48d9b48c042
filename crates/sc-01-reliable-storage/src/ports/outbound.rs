//! # Outbound Ports (Driven Ports)
//!
//! What the storage needs from its host while loading.

use std::path::Path;

use crate::domain::errors::StorageError;

/// Rebuilds in-memory objects from stored payloads.
///
/// A failing `process` call is logged and the load continues with the
/// next block.
pub trait PersistentObjectProcessor: Send {
    /// Reconstruct one object from an active block payload.
    fn process(&mut self, data: &[u8]) -> Result<(), StorageError>;

    /// Called once after a load completes, with the data directory.
    fn end_process(&mut self, data_dir: &Path);
}

impl<P: PersistentObjectProcessor + ?Sized> PersistentObjectProcessor for Box<P> {
    fn process(&mut self, data: &[u8]) -> Result<(), StorageError> {
        (**self).process(data)
    }

    fn end_process(&mut self, data_dir: &Path) {
        (**self).end_process(data_dir)
    }
}
