//! # Ports Layer
//!
//! - `inbound.rs` - Driving port (the storage API the persistence engine calls)
//! - `outbound.rs` - Driven port (the object processor fed during load)

pub mod inbound;
pub mod outbound;
