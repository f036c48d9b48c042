//! # Adapters Module
//!
//! - `lock`: exclusive data-directory lock
//! - `processor`: ready-made object processors

pub mod lock;
pub mod processor;

pub use lock::{DataDirectoryLock, LockError};
pub use processor::{NullObjectProcessor, RecordingObjectProcessor};
