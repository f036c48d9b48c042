//! Full-text index settings.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FullTextConfig {
    /// Live postings above which the most frequent token gets evicted.
    pub max_indexed_tokens: usize,
    /// Ceiling on evicted tokens.
    pub max_tokens_to_ignore: usize,
    /// Stop-list, matched against normalized tokens.
    pub tokens_to_ignore: Vec<String>,
    pub same_line_bonus: f64,
    /// Hits scoring at or below `max_score * noise_floor_ratio` are dropped.
    pub noise_floor_ratio: f64,
}

impl Default for FullTextConfig {
    fn default() -> Self {
        Self {
            max_indexed_tokens: 10_000_000,
            max_tokens_to_ignore: 100,
            tokens_to_ignore: Vec::new(),
            same_line_bonus: 1000.0,
            noise_floor_ratio: 0.01,
        }
    }
}

impl FullTextConfig {
    pub fn with_max_indexed_tokens(mut self, max: usize) -> Self {
        self.max_indexed_tokens = max;
        self
    }

    pub fn with_max_tokens_to_ignore(mut self, max: usize) -> Self {
        self.max_tokens_to_ignore = max;
        self
    }

    /// Add stop-list entries; they are normalized the same way indexed text is.
    pub fn with_tokens_to_ignore<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.tokens_to_ignore
            .extend(tokens.into_iter().map(|t| super::tokenizer::normalize(t.as_ref())));
        self
    }
}
