//! # Integration Scenarios
//!
//! Each scenario drives a real `PersistenceEngine` over a temporary working
//! directory, then tampers with files between runs the way a crash or a bad
//! disk would.

pub mod crash_recovery;
pub mod search_flows;
