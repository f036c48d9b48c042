//! # Persistence Engine (sc-03)
//!
//! Ties the transaction log to reliable storage and rebuilds the in-memory
//! data container from disk at startup.
//!
//! ## Startup
//!
//! 1. Open storage with a processor bound to the data container
//! 2. Load `schema.json` and `sequence.json`
//! 3. Open and replay the transaction log
//! 4. If transactions are pending, load storage without the processor
//! 5. Start the apply thread
//! 6. Wait until the log drains
//! 7. Clear the log and compact storage
//! 8. Load storage again, feeding every object to the container
//!
//! ## Crate Structure (Hexagonal Architecture)
//!
//! - `domain/` - Config, errors, full-text hints
//! - `ports/` - `DataContainer` (outbound)
//! - `adapters/` - Schema store, in-memory container, object processor
//! - `service/` - `PersistenceEngine`, apply loop, directory rollback
//!
//! ## Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use parking_lot::RwLock;
//! use sc_03_persistence::{MemoryDataContainer, PersistenceConfig, PersistenceEngine};
//!
//! let container = Arc::new(RwLock::new(MemoryDataContainer::default()));
//! let engine = PersistenceEngine::start(PersistenceConfig::new("/var/lib/shard"), container)?;
//! engine.new_transaction(&transaction, false)?;
//! ```

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::{load_hints, ContainerObjectProcessor, MemoryDataContainer, SchemaStore};
pub use domain::config::PersistenceConfig;
pub use domain::errors::PersistenceError;
pub use domain::hints::{FullTextHints, TokenFrequency, HINTS_FILE};
pub use ports::outbound::DataContainer;
pub use service::rollback::{delete_rollback_data, rollback_data, store_data_for_rollback};
pub use service::{PersistenceEngine, StartupReport};
