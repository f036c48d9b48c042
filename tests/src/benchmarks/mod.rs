//! # Shardcache Benchmarks
//!
//! Criterion groups per subsystem, wired up by `benches/subsystem_benchmarks.rs`.

pub mod sc_01_reliable_storage;
pub mod sc_04_full_text;
