//! # Search Flows
//!
//! Full-text search (sc-04) over objects that went through the persistence
//! engine (sc-03) and came back from disk.
//!
//! 1. **Restart**: the index is rebuilt from stored objects
//! 2. **Hints**: frequent tokens of one run become the next run's stop-list
//! 3. **Deletes**: deleted objects never reappear in results

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use parking_lot::RwLock;
    use tempfile::TempDir;

    use sc_03_persistence::{
        load_hints, MemoryDataContainer, PersistenceConfig, PersistenceEngine,
    };
    use sc_04_full_text::FullTextConfig;
    use shared_types::{DurableTransaction, KeyValue, PackedObject};

    const WAIT: Option<Duration> = Some(Duration::from_secs(10));

    fn article(id: i64, lines: &[&str]) -> PackedObject {
        PackedObject::new("articles", id, id.to_le_bytes().to_vec())
            .with_full_text(lines.iter().map(|line| line.to_string()).collect())
    }

    fn start(
        config: &PersistenceConfig,
        container: MemoryDataContainer,
    ) -> PersistenceEngine<MemoryDataContainer> {
        PersistenceEngine::start(config.clone(), Arc::new(RwLock::new(container))).unwrap()
    }

    fn commit(engine: &PersistenceEngine<MemoryDataContainer>, transaction: DurableTransaction) {
        engine.new_transaction(&transaction, false).unwrap();
        assert!(engine.wait_for_pending(WAIT));
    }

    fn library() -> Vec<PackedObject> {
        vec![
            article(1, &["Rust ownership explained", "borrowing without tears"]),
            article(2, &["Cooking with cast iron", "seasoning the pan"]),
            article(3, &["The borrow checker", "ownership in practice"]),
            article(4, &["Gardening notes", "tomatoes need sun"]),
        ]
    }

    #[test]
    fn test_index_is_rebuilt_after_restart() {
        let dir = TempDir::new().unwrap();
        let config = PersistenceConfig::new(dir.path());
        {
            let engine = start(&config, MemoryDataContainer::default());
            commit(&engine, DurableTransaction::Put { items: library() });
        }

        let engine = start(&config, MemoryDataContainer::default());
        let container = engine.container();
        let container = container.read();

        let ranked = container.search("articles", "ownership", None);
        let keys: Vec<KeyValue> = ranked.iter().map(|doc| doc.primary_key.clone()).collect();
        assert_eq!(keys.len(), 2);
        assert!(keys.contains(&KeyValue::Int(1)));
        assert!(keys.contains(&KeyValue::Int(3)));

        let ranked = container.search("articles", "cast iron pan", Some(1));
        assert_eq!(ranked[0].primary_key, KeyValue::Int(2));
        assert!(container.search("articles", "spaceships", None).is_empty());
    }

    #[test]
    fn test_deleted_objects_leave_results() {
        let dir = TempDir::new().unwrap();
        let config = PersistenceConfig::new(dir.path());
        {
            let engine = start(&config, MemoryDataContainer::default());
            commit(&engine, DurableTransaction::Put { items: library() });
            commit(
                &engine,
                DurableTransaction::Mixed {
                    items_to_put: vec![article(5, &["Ownership of a cat"])],
                    items_to_delete: vec![article(1, &[])],
                },
            );
        }

        let engine = start(&config, MemoryDataContainer::default());
        let container = engine.container();
        let ranked = container.read().search("articles", "ownership", None);

        let keys: Vec<KeyValue> = ranked.iter().map(|doc| doc.primary_key.clone()).collect();
        assert!(!keys.contains(&KeyValue::Int(1)));
        assert!(keys.contains(&KeyValue::Int(3)));
        assert!(keys.contains(&KeyValue::Int(5)));
    }

    #[test]
    fn test_hints_seed_next_run_stop_list() {
        let dir = TempDir::new().unwrap();
        let config = PersistenceConfig::new(dir.path());
        let items: Vec<PackedObject> = (0..6)
            .map(|id| article(id, &["daily report", &format!("subject {}", id)]))
            .collect();
        {
            let engine = start(&config, MemoryDataContainer::default());
            commit(&engine, DurableTransaction::Put { items });
        }
        // The first full load wrote the hints; the second run consumes them.
        drop(start(&config, MemoryDataContainer::default()));

        let hints = load_hints(&config.data_directory()).unwrap().unwrap();
        let container = MemoryDataContainer::new(FullTextConfig::default()).with_hints(&hints, 3);
        let engine = start(&config, container);
        let container = engine.container();
        let container = container.read();

        let index = container.full_text_index("articles").unwrap();
        assert!(index.is_ignored("daily"));
        assert!(index.is_ignored("report"));
        assert_eq!(index.posting_count("daily"), 0);
        assert_eq!(container.count("articles"), 6);
    }
}
