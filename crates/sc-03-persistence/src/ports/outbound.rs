//! # Outbound Ports (Driven Ports)

use shared_types::PackedObject;

use crate::domain::hints::FullTextHints;

/// In-memory store rebuilt from storage at startup.
///
/// Only the final load of the startup sequence feeds it. Later writes reach
/// it through the caller, not through the engine.
pub trait DataContainer: Send + Sync {
    /// Insert or replace one object read back from storage.
    fn load_object(&mut self, object: PackedObject);

    /// Most frequent full-text tokens of each collection.
    fn full_text_hints(&self, tokens_per_collection: usize) -> FullTextHints;
}
