//! # Persistence Domain

pub mod config;
pub mod errors;
pub mod hints;
