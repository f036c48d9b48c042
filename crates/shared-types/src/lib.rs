//! # Shared Types Crate
//!
//! Object and transaction types exchanged between the Shardcache subsystems.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: every type that crosses a crate boundary lives here.
//! - **Opaque Payloads**: object bodies are pre-serialized bytes; the core never
//!   interprets them.
//! - **Global Keys**: durable blocks are addressed by `collection@primary_key`, so a
//!   single storage file can hold every collection.

pub mod entities;
pub mod errors;
pub mod transactions;

pub use entities::*;
pub use errors::*;
pub use transactions::*;
