//! # Domain Layer
//!
//! - `transaction` - records, statuses and their binary layout
//! - `errors` - transaction log errors

pub mod errors;
pub mod transaction;
