//! # Schema and Sequence Files
//!
//! `schema.json` maps collection names to opaque schema documents;
//! `sequence.json` maps sequence names to the last value handed out.
//! Both live in memory behind one `RwLock` and are rewritten whole on change.

use std::collections::BTreeMap;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use sc_telemetry::{log_event, logging::subsystems};
use serde_json::Value;

use super::json_file::{read_json, write_json};
use crate::domain::config::PersistenceConfig;
use crate::domain::errors::PersistenceError;

#[derive(Debug, Default)]
struct SchemaState {
    collections: BTreeMap<String, Value>,
    sequences: BTreeMap<String, i64>,
}

#[derive(Debug)]
pub struct SchemaStore {
    schema_path: PathBuf,
    sequence_path: PathBuf,
    state: RwLock<SchemaState>,
}

impl SchemaStore {
    pub fn new(schema_path: impl Into<PathBuf>, sequence_path: impl Into<PathBuf>) -> Self {
        Self {
            schema_path: schema_path.into(),
            sequence_path: sequence_path.into(),
            state: RwLock::new(SchemaState::default()),
        }
    }

    /// Store for the working directory of `config`, loaded from disk.
    pub fn open(config: &PersistenceConfig) -> Result<Self, PersistenceError> {
        let store = Self::new(config.schema_path(), config.sequence_path());
        store.reload()?;
        Ok(store)
    }

    /// Replace the in-memory state with the file contents.
    pub fn reload(&self) -> Result<(), PersistenceError> {
        let mut state = self.state.write();
        state.collections = read_json(&self.schema_path)?.unwrap_or_default();
        state.sequences = read_json(&self.sequence_path)?.unwrap_or_default();
        log_event!(
            info,
            subsystems::PERSISTENCE,
            "Schema loaded",
            collections = state.collections.len(),
            sequences = state.sequences.len()
        );
        Ok(())
    }

    pub fn schema_path(&self) -> &Path {
        &self.schema_path
    }

    pub fn sequence_path(&self) -> &Path {
        &self.sequence_path
    }

    pub fn collections(&self) -> Vec<String> {
        self.state.read().collections.keys().cloned().collect()
    }

    pub fn collection_schema(&self, name: &str) -> Option<Value> {
        self.state.read().collections.get(name).cloned()
    }

    pub fn set_collection_schema(&self, name: &str, schema: Value) -> Result<(), PersistenceError> {
        let mut state = self.state.write();
        state.collections.insert(name.to_string(), schema);
        write_json(&self.schema_path, &state.collections)
    }

    /// Returns false when the collection was not declared.
    pub fn remove_collection(&self, name: &str) -> Result<bool, PersistenceError> {
        let mut state = self.state.write();
        if state.collections.remove(name).is_none() {
            return Ok(false);
        }
        write_json(&self.schema_path, &state.collections)?;
        Ok(true)
    }

    /// Last value handed out for `name`.
    pub fn sequence_value(&self, name: &str) -> Option<i64> {
        self.state.read().sequences.get(name).copied()
    }

    /// Reserve `count` consecutive values; the file is saved before they are returned.
    pub fn next_sequence_values(
        &self,
        name: &str,
        count: u32,
    ) -> Result<RangeInclusive<i64>, PersistenceError> {
        let count = i64::from(count.max(1));
        let mut state = self.state.write();
        let last = state.sequences.get(name).copied().unwrap_or(0);
        let range = (last + 1)..=(last + count);
        state.sequences.insert(name.to_string(), *range.end());
        write_json(&self.sequence_path, &state.sequences)?;
        Ok(range)
    }

    /// Move a sequence forward to at least `value` (after an import).
    pub fn raise_sequence(&self, name: &str, value: i64) -> Result<(), PersistenceError> {
        let mut state = self.state.write();
        let current = state.sequences.entry(name.to_string()).or_insert(0);
        if value <= *current {
            return Ok(());
        }
        *current = value;
        write_json(&self.sequence_path, &state.sequences)
    }
}
