//! # Data Directory Lock
//!
//! Keeps two processes from opening the same `datastore.bin` for writing.
//! Two writers appending to one file would interleave blocks and the next
//! load would repair half of both as dirty space.

mod flock;

pub use flock::{is_process_running, DataDirectoryLock, LockError, DEFAULT_LOCK_TIMEOUT};
