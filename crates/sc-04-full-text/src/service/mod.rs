//! # Full-Text Index Service
//!
//! ## State
//!
//! - `positions_by_token`: token -> posting set. An empty set marks an ignored
//!   token (stop-list or evicted); ignored tokens are never indexed again.
//! - `positions_by_document`: primary key -> line pointers of its live version
//! - `tokens_by_document`: primary key -> tokens holding its postings
//! - `live_revisions`: primary key -> revision whose postings are live
//!
//! Deleting or replacing a document removes its postings from every set it
//! touched, so a non-empty set holds live postings only and its length is
//! the token's frequency. A set emptied that way is dropped, not ignored.
//!
//! ## Files
//!
//! - `search.rs` - same-line and same-document ranking

mod search;

use std::collections::{HashMap, HashSet};

use sc_telemetry::{log_event, logging::subsystems, FULLTEXT_IGNORED_TOKENS};
use shared_types::KeyValue;

use crate::domain::config::FullTextConfig;
use crate::domain::line_pointer::LinePointer;
use crate::domain::tokenizer::tokenize;

#[derive(Debug)]
pub struct FullTextIndex {
    config: FullTextConfig,
    positions_by_token: HashMap<String, HashSet<LinePointer>>,
    positions_by_document: HashMap<KeyValue, Vec<LinePointer>>,
    tokens_by_document: HashMap<KeyValue, HashSet<String>>,
    live_revisions: HashMap<KeyValue, u64>,
    /// Live postings per document, for exact `entries` accounting.
    document_postings: HashMap<KeyValue, usize>,
    next_revision: u64,
    /// Live postings in the whole index.
    entries: usize,
    /// Tokens evicted for being too frequent; the stop-list is not counted.
    ignored_tokens: usize,
}

impl FullTextIndex {
    pub fn new(config: FullTextConfig) -> Self {
        let positions_by_token = config
            .tokens_to_ignore
            .iter()
            .map(|token| (token.clone(), HashSet::new()))
            .collect();

        Self {
            config,
            positions_by_token,
            positions_by_document: HashMap::new(),
            tokens_by_document: HashMap::new(),
            live_revisions: HashMap::new(),
            document_postings: HashMap::new(),
            next_revision: 1,
            entries: 0,
            ignored_tokens: 0,
        }
    }

    pub fn config(&self) -> &FullTextConfig {
        &self.config
    }

    /// Index every line of a document, replacing any previous version.
    pub fn index_document<S: AsRef<str>>(&mut self, content: &[S], primary_key: KeyValue) {
        if self.live_revisions.contains_key(&primary_key) {
            self.delete_document(&primary_key);
        }

        let revision = self.next_revision;
        self.next_revision += 1;
        self.live_revisions.insert(primary_key.clone(), revision);

        let mut pointers = Vec::with_capacity(content.len());
        for (line, tokenized) in tokenize(content).into_iter().enumerate() {
            let pointer = LinePointer::new(primary_key.clone(), revision, line as u32);
            self.index_line(&tokenized.tokens, &pointer);
            pointers.push(pointer);
        }
        self.positions_by_document.insert(primary_key, pointers);
    }

    fn index_line(&mut self, tokens: &[String], pointer: &LinePointer) {
        let mut added = 0;
        for token in tokens {
            let inserted = match self.positions_by_token.get_mut(token) {
                Some(postings) if postings.is_empty() => false,
                Some(postings) => postings.insert(pointer.clone()),
                None => {
                    self.positions_by_token
                        .insert(token.clone(), HashSet::from([pointer.clone()]));
                    true
                }
            };
            if inserted {
                added += 1;
                self.tokens_by_document
                    .entry(pointer.primary_key.clone())
                    .or_default()
                    .insert(token.clone());
            }
        }

        if added > 0 {
            self.entries += added;
            *self
                .document_postings
                .entry(pointer.primary_key.clone())
                .or_default() += added;
        }

        self.evict_most_frequent_token();
    }

    /// Drop the most frequent token once the index is over its size limit.
    fn evict_most_frequent_token(&mut self) {
        if self.entries <= self.config.max_indexed_tokens
            || self.ignored_tokens >= self.config.max_tokens_to_ignore
        {
            return;
        }

        // Sets hold live postings only, so the set length is the frequency.
        let victim = self
            .positions_by_token
            .iter()
            .filter(|(_, postings)| !postings.is_empty())
            .max_by(|a, b| a.1.len().cmp(&b.1.len()).then_with(|| b.0.cmp(a.0)))
            .map(|(token, _)| token.clone());
        let Some(token) = victim else {
            return;
        };

        let postings = self
            .positions_by_token
            .get_mut(&token)
            .map(std::mem::take)
            .unwrap_or_default();
        for pointer in &postings {
            if let Some(count) = self.document_postings.get_mut(&pointer.primary_key) {
                *count = count.saturating_sub(1);
            }
        }
        let removed = postings.len();
        self.entries = self.entries.saturating_sub(removed);
        self.ignored_tokens += 1;
        FULLTEXT_IGNORED_TOKENS.set(self.ignored_tokens as f64);

        log_event!(
            debug,
            subsystems::FULL_TEXT,
            "Token evicted from full-text index",
            token = %token,
            postings = removed,
            ignored_tokens = self.ignored_tokens
        );
    }

    /// Remove every posting of `primary_key`. Returns false if it was not indexed.
    pub fn delete_document(&mut self, primary_key: &KeyValue) -> bool {
        if self.live_revisions.remove(primary_key).is_none() {
            return false;
        }
        self.positions_by_document.remove(primary_key);
        for token in self.tokens_by_document.remove(primary_key).unwrap_or_default() {
            let Some(postings) = self.positions_by_token.get_mut(&token) else {
                continue;
            };
            // Evicted since: nothing left to remove, and the token stays ignored.
            if postings.is_empty() {
                continue;
            }
            postings.retain(|pointer| &pointer.primary_key != primary_key);
            if postings.is_empty() {
                self.positions_by_token.remove(&token);
            }
        }
        let live = self.document_postings.remove(primary_key).unwrap_or(0);
        self.entries = self.entries.saturating_sub(live);
        true
    }

    pub(crate) fn is_live(&self, pointer: &LinePointer) -> bool {
        self.live_revisions.get(&pointer.primary_key) == Some(&pointer.revision)
    }

    // =========================================================================
    // STATISTICS
    // =========================================================================

    pub fn entries(&self) -> usize {
        self.entries
    }

    pub fn ignored_tokens(&self) -> usize {
        self.ignored_tokens
    }

    /// Tokens currently indexed (ignored ones excluded).
    pub fn token_count(&self) -> usize {
        self.positions_by_token
            .values()
            .filter(|postings| !postings.is_empty())
            .count()
    }

    pub fn document_count(&self) -> usize {
        self.live_revisions.len()
    }

    pub fn contains_document(&self, primary_key: &KeyValue) -> bool {
        self.live_revisions.contains_key(primary_key)
    }

    /// Line pointers of the live version of a document.
    pub fn document_lines(&self, primary_key: &KeyValue) -> Option<&[LinePointer]> {
        self.positions_by_document.get(primary_key).map(Vec::as_slice)
    }

    /// Live postings of a normalized token.
    pub fn posting_count(&self, token: &str) -> usize {
        self.positions_by_token
            .get(token)
            .map(|postings| postings.iter().filter(|p| self.is_live(p)).count())
            .unwrap_or(0)
    }

    pub fn is_ignored(&self, token: &str) -> bool {
        self.positions_by_token
            .get(token)
            .is_some_and(HashSet::is_empty)
    }

    /// Up to `count` indexed tokens with the most live postings, most frequent first.
    pub fn most_frequent_tokens(&self, count: usize) -> Vec<(String, usize)> {
        let mut tokens: Vec<(String, usize)> = self
            .positions_by_token
            .keys()
            .map(|token| (token.clone(), self.posting_count(token)))
            .filter(|(_, postings)| *postings > 0)
            .collect();
        tokens.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        tokens.truncate(count);
        tokens
    }
}
