//! # Domain Layer
//!
//! Pure logic for the Reliable Storage subsystem: the block format, its
//! codec, validation errors and the value types the service works with.
//!
//! ## Modules
//!
//! - `block` - `PersistentBlock`, status, markers and hash
//! - `codec` - little-endian field and string encoding
//! - `errors` - storage error types
//! - `repair` - `LoadReport` for load-time corruption handling
//! - `value_objects` - configuration and index entries

pub mod block;
pub mod codec;
pub mod errors;
pub mod repair;
pub mod value_objects;
