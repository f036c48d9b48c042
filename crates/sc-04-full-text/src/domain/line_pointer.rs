//! # Postings and Results
//!
//! A `LinePointer` never changes once inserted into a posting set. Whether it
//! is still live is decided by comparing its `revision` with the document's
//! current revision, kept outside the sets.

use serde::{Deserialize, Serialize};
use shared_types::KeyValue;

/// One line of one indexed version of a document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LinePointer {
    pub primary_key: KeyValue,
    /// Indexing generation of the document this line belongs to.
    pub revision: u64,
    /// Zero-based line index inside the document.
    pub line: u32,
}

impl LinePointer {
    pub fn new(primary_key: KeyValue, revision: u64, line: u32) -> Self {
        Self {
            primary_key,
            revision,
            line,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub pointer: LinePointer,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedDocument {
    pub primary_key: KeyValue,
    pub score: f64,
}
