//! # Adapters Module
//!
//! - `json_file`: atomic JSON reads and writes
//! - `schema_store`: `schema.json` and `sequence.json`
//! - `memory_container`: `DataContainer` over hash maps with full-text indexes
//! - `object_processor`: feeds stored payloads into a `DataContainer`

pub mod json_file;
pub mod memory_container;
pub mod object_processor;
pub mod schema_store;

pub use memory_container::MemoryDataContainer;
pub use object_processor::{load_hints, ContainerObjectProcessor};
pub use schema_store::SchemaStore;
