//! # Crash Recovery Scenarios
//!
//! Interrupted runs and damaged files across the transaction log (sc-02),
//! reliable storage (sc-01) and the persistence engine (sc-03):
//!
//! 1. **Log written, storage half-updated**: the pending transaction is
//!    replayed and already-written items are overwritten in place
//! 2. **One scrambled block among many**: only that object is lost
//! 3. **Garbage after the last block**: truncated, nothing lost
//! 4. **Torn log record**: ignored, the log stays usable
//! 5. **Mirror on a second disk**: a lost object comes back from backup

#[cfg(test)]
mod tests {
    use std::fs::OpenOptions;
    use std::io::{Seek, SeekFrom, Write};
    use std::path::Path;
    use std::sync::Arc;
    use std::time::Duration;

    use parking_lot::RwLock;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use tempfile::TempDir;

    use sc_01_reliable_storage::{ReliableStorage, ReliableStorageApi};
    use sc_02_transaction_log::TransactionLog;
    use sc_03_persistence::{MemoryDataContainer, PersistenceConfig, PersistenceEngine};
    use shared_types::{encode_object, DurableTransaction, KeyValue, PackedObject};

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    type Engine = PersistenceEngine<MemoryDataContainer>;

    const WAIT: Option<Duration> = Some(Duration::from_secs(10));

    fn config(dir: &TempDir) -> PersistenceConfig {
        PersistenceConfig::new(dir.path()).with_lock_timeout_ms(500)
    }

    fn start(config: &PersistenceConfig) -> Engine {
        let container = Arc::new(RwLock::new(MemoryDataContainer::default()));
        PersistenceEngine::start(config.clone(), container).unwrap()
    }

    fn invoice(id: i64) -> PackedObject {
        let data = (0..96u8).map(|b| b.wrapping_mul(id as u8)).collect();
        PackedObject::new("invoices", id, data)
            .with_full_text(vec![format!("invoice number {}", id)])
    }

    /// One transaction per invoice, so each gets its own block.
    fn fill(config: &PersistenceConfig, count: i64) {
        let engine = start(config);
        for id in 0..count {
            engine
                .new_transaction(&DurableTransaction::Put { items: vec![invoice(id)] }, false)
                .unwrap();
        }
        assert!(engine.wait_for_pending(WAIT));
    }

    fn count(engine: &Engine) -> usize {
        engine.container().read().count("invoices")
    }

    fn get(engine: &Engine, id: i64) -> Option<PackedObject> {
        engine
            .container()
            .read()
            .get("invoices", &KeyValue::Int(id))
            .cloned()
    }

    fn overwrite(path: &Path, offset: u64, bytes: &[u8]) {
        let mut file = OpenOptions::new().write(true).open(path).unwrap();
        file.seek(SeekFrom::Start(offset)).unwrap();
        file.write_all(bytes).unwrap();
    }

    fn append(path: &Path, bytes: &[u8]) {
        let mut file = OpenOptions::new().append(true).open(path).unwrap();
        file.write_all(bytes).unwrap();
    }

    // =============================================================================
    // INTERRUPTED APPLY
    // =============================================================================

    #[test]
    fn test_half_applied_transaction_is_replayed() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        let items = vec![invoice(1), invoice(2), invoice(3)];
        {
            let log = TransactionLog::open(config.transaction_log_path()).unwrap();
            let payload = DurableTransaction::Put { items: items.clone() }.to_bytes().unwrap();
            log.new_transaction(&payload, 0).unwrap();
            let tx = log.start_processing().unwrap().unwrap();

            // Died after the first block reached storage.
            let mut storage = ReliableStorage::open(config.storage_path()).unwrap();
            storage
                .store_block(&encode_object(&items[0]).unwrap(), &items[0].global_key(), tx.id as i32)
                .unwrap();
        }

        let engine = start(&config);

        let report = engine.startup_report();
        assert_eq!(report.replayed_transactions, 1);
        assert_eq!(report.replay_failures, 0);
        assert_eq!(count(&engine), 3);
        for item in &items {
            let loaded = engine
                .container()
                .read()
                .get("invoices", &item.primary_key)
                .cloned();
            assert_eq!(loaded.as_ref(), Some(item));
        }
        let storage = engine.storage();
        assert_eq!(storage.lock().inactive_block_count(), 0);
    }

    // =============================================================================
    // DAMAGED STORAGE
    // =============================================================================

    #[test]
    fn test_scrambled_block_loses_only_its_object() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        fill(&config, 20);

        let mut rng = StdRng::seed_from_u64(7);
        let victim = rng.gen_range(1..19i64);
        let key = invoice(victim).global_key();
        let offset = {
            let mut storage = ReliableStorage::open(config.storage_path()).unwrap();
            storage.load_persistent_data(false).unwrap();
            storage.location(&key).unwrap().offset
        };
        // begin marker, length-prefixed key, five i32 fields, then the payload
        let payload_start = offset + 4 + 1 + key.len() as u64 + 20;
        let garbage: Vec<u8> = (0..8).map(|_| rng.gen()).collect();
        overwrite(&config.storage_path(), payload_start, &garbage);

        let engine = start(&config);

        assert_eq!(count(&engine), 19);
        assert!(get(&engine, victim).is_none());
        for id in (0..20).filter(|id| *id != victim) {
            assert_eq!(get(&engine, id), Some(invoice(id)));
        }
        let ranked = engine
            .container()
            .read()
            .search("invoices", &format!("number {}", victim), None);
        assert!(ranked.iter().all(|doc| doc.primary_key != KeyValue::Int(victim)));
    }

    #[test]
    fn test_garbage_tail_is_truncated() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        fill(&config, 5);
        append(&config.storage_path(), &[0x55, 0x55, 0x55, 0x55, 0x01, 0x02, 0x03]);

        let engine = start(&config);

        assert_eq!(count(&engine), 5);
        drop(engine);
        let engine = start(&config);
        assert_eq!(count(&engine), 5);
        assert!(engine.startup_report().load.is_clean());
    }

    #[test]
    fn test_torn_log_record_is_ignored() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        fill(&config, 3);
        append(&config.transaction_log_path(), &[0, 0, 0, 0, 9, 9]);

        let engine = start(&config);

        assert_eq!(engine.startup_report().replayed_transactions, 0);
        assert_eq!(count(&engine), 3);
        engine
            .new_transaction(&DurableTransaction::Put { items: vec![invoice(3)] }, false)
            .unwrap();
        assert!(engine.wait_for_pending(WAIT));
        assert_eq!(engine.storage().lock().block_count(), 4);
    }

    #[test]
    fn test_lost_object_returns_from_backup() {
        let dir = TempDir::new().unwrap();
        let backup_dir = TempDir::new().unwrap();
        let config = config(&dir).with_backup_directory(backup_dir.path());
        fill(&config, 10);

        let key = invoice(4).global_key();
        let offset = {
            let mut storage = ReliableStorage::open(config.storage_path()).unwrap();
            storage.load_persistent_data(false).unwrap();
            storage.location(&key).unwrap().offset
        };
        overwrite(&config.storage_path(), offset, &[0; 4]);

        let engine = start(&config);

        assert_eq!(count(&engine), 10);
        assert_eq!(get(&engine, 4), Some(invoice(4)));
        assert_eq!(engine.startup_report().load.recovered_from_backup, 1);
    }

    #[test]
    fn test_repeated_restarts_are_stable() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        fill(&config, 8);

        let mut sizes = Vec::new();
        for _ in 0..3 {
            let engine = start(&config);
            assert_eq!(count(&engine), 8);
            sizes.push(engine.storage().lock().storage_size().unwrap());
        }

        assert!(sizes.windows(2).all(|pair| pair[0] == pair[1]));
    }
}
