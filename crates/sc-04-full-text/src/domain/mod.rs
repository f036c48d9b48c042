//! # Full-Text Domain

pub mod config;
pub mod line_pointer;
pub mod scoring;
pub mod tokenizer;
