//! # Full-Text Index (sc-04)
//!
//! One in-memory inverted index per collection, fed with the text lines of
//! each document.
//!
//! ## Ranking
//!
//! | Strategy | Unit | Boost |
//! |----------|------|-------|
//! | Same line | `LinePointer` | Lines holding two or more query tokens, times `same_line_bonus` |
//! | Same document | Document | Distinct matched tokens x 100 |
//!
//! Both strategies run in parallel; the merged result keeps the best score per
//! line. An optional `LineProvider` adds an order-preservation bonus to
//! same-line hits.
//!
//! ## Eviction
//!
//! When live postings exceed `max_indexed_tokens`, the most frequent token is
//! dropped from the index and ignored from then on, until `max_tokens_to_ignore`
//! tokens have been dropped.
//!
//! ## Crate Structure
//!
//! - `domain/` - Tokenizer, `LinePointer`, config, scoring helpers
//! - `ports/` - `LineProvider`
//! - `service/` - `FullTextIndex`
//!
//! ## Usage
//!
//! ```ignore
//! use sc_04_full_text::{FullTextConfig, FullTextIndex};
//!
//! let mut index = FullTextIndex::new(FullTextConfig::default());
//! index.index_document(&["the quick brown fox".to_string()], "A".into());
//! let best = index.search_best_documents("quick fox", Some(10), None);
//! ```

pub mod domain;
pub mod ports;
pub mod service;

pub use domain::config::FullTextConfig;
pub use domain::line_pointer::{LinePointer, RankedDocument, SearchHit};
pub use domain::tokenizer::{normalize, tokenize, tokenize_one_line, CharClass, Token, TokenizedLine};
pub use ports::LineProvider;
pub use service::FullTextIndex;
