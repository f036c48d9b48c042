//! # Shardcache Test Suite
//!
//! Unified test crate containing:
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── benchmarks/       # Criterion groups per subsystem
//! │   ├── sc_01_reliable_storage.rs
//! │   └── sc_04_full_text.rs
//! │
//! └── integration/      # Scenarios spanning several subsystems
//!     ├── crash_recovery.rs
//!     └── search_flows.rs
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p sc-tests
//!
//! # By category
//! cargo test -p sc-tests integration::crash_recovery::
//!
//! # Benchmarks
//! cargo bench -p sc-tests
//! ```

pub mod benchmarks;
pub mod integration;
