//! # Full-Text Hints
//!
//! Most frequent tokens per collection, written beside the data after every
//! full load so the next start can seed its stop-lists.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub const HINTS_FILE: &str = "fulltext_hints.json";

/// Tokens listed per collection.
pub const HINT_TOKENS_PER_COLLECTION: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenFrequency {
    pub token: String,
    pub postings: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FullTextHints {
    pub collections: BTreeMap<String, Vec<TokenFrequency>>,
}

impl FullTextHints {
    pub fn is_empty(&self) -> bool {
        self.collections.values().all(Vec::is_empty)
    }

    pub fn add_collection(&mut self, collection: impl Into<String>, tokens: Vec<(String, usize)>) {
        if tokens.is_empty() {
            return;
        }
        self.collections.insert(
            collection.into(),
            tokens
                .into_iter()
                .map(|(token, postings)| TokenFrequency { token, postings })
                .collect(),
        );
    }

    /// Up to `count` hinted tokens of a collection, most frequent first.
    pub fn stop_list(&self, collection: &str, count: usize) -> Vec<String> {
        self.collections
            .get(collection)
            .map(|tokens| {
                tokens
                    .iter()
                    .take(count)
                    .map(|frequency| frequency.token.clone())
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_list() {
        let mut hints = FullTextHints::default();
        assert!(hints.is_empty());
        hints.add_collection("orders", vec![("the".into(), 40), ("of".into(), 12)]);
        hints.add_collection("empty", Vec::new());

        assert!(!hints.is_empty());
        assert_eq!(hints.stop_list("orders", 1), vec!["the".to_string()]);
        assert!(hints.stop_list("empty", 10).is_empty());
        assert!(!hints.collections.contains_key("empty"));
    }
}
