//! # Core Domain Entities
//!
//! - `KeyValue`: a primary-key value (the identity of a document)
//! - `PackedObject`: one serialized object together with its collection and key

use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator between the collection name and the primary key in a global key.
pub const GLOBAL_KEY_SEPARATOR: char = '@';

/// A primary-key value.
///
/// Ordering puts every integer key before every string key, which keeps
/// ranking output deterministic when scores tie.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum KeyValue {
    /// Integer key (sequences, numeric ids).
    Int(i64),
    /// String key (natural keys, GUID text).
    Str(String),
}

impl KeyValue {
    /// Textual form used inside global keys and persisted hints.
    pub fn as_key_string(&self) -> String {
        match self {
            KeyValue::Int(value) => value.to_string(),
            KeyValue::Str(value) => value.clone(),
        }
    }
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyValue::Int(value) => write!(f, "{}", value),
            KeyValue::Str(value) => write!(f, "{}", value),
        }
    }
}

impl From<i64> for KeyValue {
    fn from(value: i64) -> Self {
        KeyValue::Int(value)
    }
}

impl From<&str> for KeyValue {
    fn from(value: &str) -> Self {
        KeyValue::Str(value.to_string())
    }
}

impl From<String> for KeyValue {
    fn from(value: String) -> Self {
        KeyValue::Str(value)
    }
}

/// A serialized object as stored in a durable block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackedObject {
    /// Name of the collection the object belongs to.
    pub collection: String,
    /// Primary key inside the collection.
    pub primary_key: KeyValue,
    /// Opaque object body.
    pub data: Vec<u8>,
    /// Text lines fed to the full-text index (empty when the collection has none).
    pub full_text: Vec<String>,
}

impl PackedObject {
    pub fn new(collection: impl Into<String>, primary_key: impl Into<KeyValue>, data: Vec<u8>) -> Self {
        Self {
            collection: collection.into(),
            primary_key: primary_key.into(),
            data,
            full_text: Vec::new(),
        }
    }

    /// Attach full-text content.
    pub fn with_full_text(mut self, lines: Vec<String>) -> Self {
        self.full_text = lines;
        self
    }

    /// Key under which the object is stored durably: `collection@primary_key`.
    pub fn global_key(&self) -> String {
        format!(
            "{}{}{}",
            self.collection,
            GLOBAL_KEY_SEPARATOR,
            self.primary_key.as_key_string()
        )
    }
}
