//! # Reliable Storage (sc-01)
//!
//! Durable storage of the latest version of every object as a sequence of
//! `PersistentBlock` records in a single file (`datastore.bin`).
//!
//! ## Behaviour
//!
//! | Operation | Effect |
//! |-----------|--------|
//! | `store_block` | In-place rewrite when the old copy is valid and has room, else mark dirty + append |
//! | `delete_block` | Status rewritten to `Deleted`; replay with the same transaction id is a no-op |
//! | `load_persistent_data` | Scan, repair corrupt spans, restart until clean, recover from backup |
//! | `clean_storage` | Copy active blocks to a fresh file |
//!
//! ## Crate Structure (Hexagonal Architecture)
//!
//! - `domain/` - Block format, codec, errors, config
//! - `ports/` - `ReliableStorageApi` (inbound), `PersistentObjectProcessor` (outbound)
//! - `adapters/` - Data-directory lock, ready-made processors
//! - `service/` - `ReliableStorage`, the file-backed implementation
//!
//! ## Usage
//!
//! ```ignore
//! use sc_01_reliable_storage::{ReliableStorage, ReliableStorageApi};
//!
//! let mut storage = ReliableStorage::open("/var/lib/shard/data/datastore.bin")?;
//! storage.load_persistent_data(false)?;
//! storage.store_block(b"payload", "orders@17", 42)?;
//! ```

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::{DataDirectoryLock, LockError, NullObjectProcessor, RecordingObjectProcessor};
pub use domain::block::{compute_hash, BlockRead, BlockStatus, PersistentBlock};
pub use domain::errors::{CorruptionKind, StorageError};
pub use domain::repair::LoadReport;
pub use domain::value_objects::{BlockLocation, StorageConfig};
pub use ports::inbound::ReliableStorageApi;
pub use ports::outbound::PersistentObjectProcessor;
pub use service::ReliableStorage;
