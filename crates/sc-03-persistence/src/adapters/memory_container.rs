//! # In-Memory Data Container
//!
//! Objects by collection and primary key, with one full-text index per
//! collection fed from each object's `full_text` lines.

use std::collections::HashMap;

use sc_04_full_text::{FullTextConfig, FullTextIndex, LinePointer, LineProvider, RankedDocument};
use shared_types::{KeyValue, PackedObject};

use crate::domain::hints::FullTextHints;
use crate::ports::outbound::DataContainer;

#[derive(Debug)]
struct Collection {
    objects: HashMap<KeyValue, PackedObject>,
    full_text: FullTextIndex,
}

#[derive(Debug, Default)]
pub struct MemoryDataContainer {
    full_text_config: FullTextConfig,
    /// Extra stop-list entries per collection, from a previous run's hints.
    seeded_stop_lists: HashMap<String, Vec<String>>,
    collections: HashMap<String, Collection>,
}

impl MemoryDataContainer {
    pub fn new(full_text_config: FullTextConfig) -> Self {
        Self {
            full_text_config,
            ..Self::default()
        }
    }

    /// Ignore up to `per_collection` hinted tokens in each collection's index.
    pub fn with_hints(mut self, hints: &FullTextHints, per_collection: usize) -> Self {
        for collection in hints.collections.keys() {
            self.seeded_stop_lists
                .insert(collection.clone(), hints.stop_list(collection, per_collection));
        }
        self
    }

    fn collection_mut(&mut self, name: &str) -> &mut Collection {
        let full_text_config = &self.full_text_config;
        let seeded_stop_lists = &self.seeded_stop_lists;
        self.collections.entry(name.to_string()).or_insert_with(|| {
            let mut config = full_text_config.clone();
            if let Some(seeded) = seeded_stop_lists.get(name) {
                config = config.with_tokens_to_ignore(seeded);
            }
            Collection {
                objects: HashMap::new(),
                full_text: FullTextIndex::new(config),
            }
        })
    }

    /// Insert or replace an object and re-index its text.
    pub fn put(&mut self, object: PackedObject) {
        let collection = self.collection_mut(&object.collection);
        if object.full_text.is_empty() {
            collection.full_text.delete_document(&object.primary_key);
        } else {
            collection
                .full_text
                .index_document(&object.full_text, object.primary_key.clone());
        }
        collection.objects.insert(object.primary_key.clone(), object);
    }

    pub fn remove(&mut self, collection: &str, primary_key: &KeyValue) -> Option<PackedObject> {
        let collection = self.collections.get_mut(collection)?;
        collection.full_text.delete_document(primary_key);
        collection.objects.remove(primary_key)
    }

    pub fn get(&self, collection: &str, primary_key: &KeyValue) -> Option<&PackedObject> {
        self.collections.get(collection)?.objects.get(primary_key)
    }

    pub fn count(&self, collection: &str) -> usize {
        self.collections
            .get(collection)
            .map_or(0, |collection| collection.objects.len())
    }

    pub fn total_count(&self) -> usize {
        self.collections.values().map(|c| c.objects.len()).sum()
    }

    pub fn collections(&self) -> Vec<String> {
        let mut names: Vec<String> = self.collections.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn full_text_index(&self, collection: &str) -> Option<&FullTextIndex> {
        self.collections.get(collection).map(|c| &c.full_text)
    }

    /// Best documents of a collection, scored with the order bonus.
    pub fn search(&self, collection: &str, query: &str, max_results: Option<usize>) -> Vec<RankedDocument> {
        let Some(collection) = self.collections.get(collection) else {
            return Vec::new();
        };
        let provider = |pointer: &LinePointer| {
            collection
                .objects
                .get(&pointer.primary_key)
                .and_then(|object| object.full_text.get(pointer.line as usize).cloned())
        };
        collection
            .full_text
            .search_best_documents(query, max_results, Some(&provider as &dyn LineProvider))
    }
}

impl DataContainer for MemoryDataContainer {
    fn load_object(&mut self, object: PackedObject) {
        self.put(object);
    }

    fn full_text_hints(&self, tokens_per_collection: usize) -> FullTextHints {
        let mut hints = FullTextHints::default();
        for (name, collection) in &self.collections {
            hints.add_collection(
                name.clone(),
                collection.full_text.most_frequent_tokens(tokens_per_collection),
            );
        }
        hints
    }
}
