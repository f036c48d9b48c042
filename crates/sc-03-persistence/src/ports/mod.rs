//! # Ports
//!
//! - `outbound`: the in-memory store the engine loads objects into

pub mod outbound;
