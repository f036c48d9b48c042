//! Object processors that need no host data structure.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::domain::errors::StorageError;
use crate::ports::outbound::PersistentObjectProcessor;

/// Discards every payload. Used for index-only loads.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObjectProcessor;

impl PersistentObjectProcessor for NullObjectProcessor {
    fn process(&mut self, _data: &[u8]) -> Result<(), StorageError> {
        Ok(())
    }

    fn end_process(&mut self, _data_dir: &Path) {}
}

#[derive(Debug, Default)]
struct Recorded {
    payloads: Vec<Vec<u8>>,
    completed_loads: Vec<PathBuf>,
}

/// Keeps every processed payload, readable through clones of the processor.
#[derive(Debug, Default, Clone)]
pub struct RecordingObjectProcessor {
    inner: Arc<Mutex<Recorded>>,
}

impl RecordingObjectProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn payloads(&self) -> Vec<Vec<u8>> {
        self.inner.lock().payloads.clone()
    }

    /// Data directories passed to `end_process`, one per finished load.
    pub fn completed_loads(&self) -> Vec<PathBuf> {
        self.inner.lock().completed_loads.clone()
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.payloads.clear();
        inner.completed_loads.clear();
    }
}

impl PersistentObjectProcessor for RecordingObjectProcessor {
    fn process(&mut self, data: &[u8]) -> Result<(), StorageError> {
        self.inner.lock().payloads.push(data.to_vec());
        Ok(())
    }

    fn end_process(&mut self, data_dir: &Path) {
        self.inner.lock().completed_loads.push(data_dir.to_path_buf());
    }
}
