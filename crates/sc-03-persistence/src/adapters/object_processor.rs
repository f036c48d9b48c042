//! Feeds stored object payloads into a `DataContainer`.

use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;
use sc_01_reliable_storage::{PersistentObjectProcessor, StorageError};
use sc_telemetry::{log_event, logging::subsystems};
use shared_types::decode_object;

use super::json_file::{read_json, write_json};
use crate::domain::errors::PersistenceError;
use crate::domain::hints::{FullTextHints, HINTS_FILE, HINT_TOKENS_PER_COLLECTION};
use crate::ports::outbound::DataContainer;

pub struct ContainerObjectProcessor<C> {
    container: Arc<RwLock<C>>,
    /// Objects handed over since the last `end_process`.
    loaded: usize,
}

impl<C: DataContainer> ContainerObjectProcessor<C> {
    pub fn new(container: Arc<RwLock<C>>) -> Self {
        Self {
            container,
            loaded: 0,
        }
    }
}

impl<C: DataContainer> PersistentObjectProcessor for ContainerObjectProcessor<C> {
    fn process(&mut self, data: &[u8]) -> Result<(), StorageError> {
        let object = decode_object(data).map_err(|e| StorageError::Processing(e.to_string()))?;
        self.container.write().load_object(object);
        self.loaded += 1;
        Ok(())
    }

    fn end_process(&mut self, data_dir: &Path) {
        let hints = self
            .container
            .read()
            .full_text_hints(HINT_TOKENS_PER_COLLECTION);
        if !hints.is_empty() {
            if let Err(e) = write_json(&data_dir.join(HINTS_FILE), &hints) {
                log_event!(
                    warn,
                    subsystems::PERSISTENCE,
                    "Cannot write full-text hints",
                    error = %e
                );
            }
        }

        log_event!(
            info,
            subsystems::PERSISTENCE,
            "Objects loaded into memory",
            objects = self.loaded
        );
        self.loaded = 0;
    }
}

/// Hints left by the previous full load, if any.
pub fn load_hints(data_dir: &Path) -> Result<Option<FullTextHints>, PersistenceError> {
    read_json(&data_dir.join(HINTS_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MemoryDataContainer;
    use shared_types::{encode_object, PackedObject};
    use tempfile::TempDir;

    #[test]
    fn test_process_loads_objects() {
        let container = Arc::new(RwLock::new(MemoryDataContainer::default()));
        let mut processor = ContainerObjectProcessor::new(Arc::clone(&container));
        let object = PackedObject::new("orders", 7, vec![1, 2, 3]);

        processor.process(&encode_object(&object).unwrap()).unwrap();

        assert_eq!(container.read().get("orders", &7.into()), Some(&object));
    }

    #[test]
    fn test_garbage_payload_is_rejected() {
        let container = Arc::new(RwLock::new(MemoryDataContainer::default()));
        let mut processor = ContainerObjectProcessor::new(container);

        let result = processor.process(&[0xFF; 3]);

        assert!(matches!(result, Err(StorageError::Processing(_))));
    }

    #[test]
    fn test_end_process_writes_hints() {
        let dir = TempDir::new().unwrap();
        let container = Arc::new(RwLock::new(MemoryDataContainer::default()));
        let mut processor = ContainerObjectProcessor::new(Arc::clone(&container));
        let object = PackedObject::new("notes", 1, vec![]).with_full_text(vec!["hello world".into()]);
        processor.process(&encode_object(&object).unwrap()).unwrap();

        processor.end_process(dir.path());

        let hints = load_hints(dir.path()).unwrap().unwrap();
        assert_eq!(hints.collections["notes"].len(), 2);
        assert!(load_hints(&dir.path().join("elsewhere")).unwrap().is_none());
    }
}
