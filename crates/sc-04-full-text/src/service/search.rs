//! # Ranking
//!
//! Query tokens are weighted by `log10(entries / live_postings)` and visited
//! rarest first. Same-line and same-document scoring run on two rayon tasks
//! over the same read-only posting lists.

use std::collections::{HashMap, HashSet};

use sc_telemetry::{metric_inc, FULLTEXT_QUERIES};
use shared_types::KeyValue;

use super::FullTextIndex;
use crate::domain::line_pointer::{LinePointer, RankedDocument, SearchHit};
use crate::domain::scoring::{apply_noise_floor, merge_max, order_bonus, token_weight};
use crate::domain::tokenizer::tokenize_one_line;
use crate::ports::LineProvider;

/// Distinct-token multiplier for documents matching several tokens.
const DOCUMENT_TOKEN_BONUS: f64 = 100.0;

struct TokenPostings<'a> {
    token: &'a str,
    live: Vec<&'a LinePointer>,
    weight: f64,
}

impl FullTextIndex {
    /// Line-level hits for `query`, best first.
    pub fn find(&self, query: &str, line_provider: Option<&dyn LineProvider>) -> Vec<SearchHit> {
        metric_inc!(FULLTEXT_QUERIES);

        let query_tokens: Vec<String> = tokenize_one_line(query)
            .into_iter()
            .map(|token| token.normalized)
            .collect();
        let postings = self.query_postings(&query_tokens);
        if postings.is_empty() {
            return Vec::new();
        }

        let (mut same_line, same_document) = rayon::join(
            || self.same_line_find(&postings),
            || self.same_document_find(&postings),
        );

        if let Some(provider) = line_provider {
            for (pointer, score) in same_line.iter_mut() {
                if let Some(text) = provider.line(pointer) {
                    let line_tokens: Vec<String> = tokenize_one_line(&text)
                        .into_iter()
                        .map(|token| token.normalized)
                        .collect();
                    *score *= order_bonus(&query_tokens, &line_tokens);
                }
            }
        }

        let mut hits: Vec<SearchHit> = merge_max(same_line, same_document)
            .into_iter()
            .map(|(pointer, score)| SearchHit { pointer, score })
            .collect();
        hits.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.pointer.cmp(&b.pointer))
        });
        hits
    }

    /// Documents ranked by the summed score of their hits.
    pub fn search_best_documents(
        &self,
        query: &str,
        max_results: Option<usize>,
        line_provider: Option<&dyn LineProvider>,
    ) -> Vec<RankedDocument> {
        let mut by_document: HashMap<KeyValue, f64> = HashMap::new();
        for hit in self.find(query, line_provider) {
            *by_document.entry(hit.pointer.primary_key).or_default() += hit.score;
        }

        let mut documents: Vec<RankedDocument> = by_document
            .into_iter()
            .map(|(primary_key, score)| RankedDocument { primary_key, score })
            .collect();
        documents.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.primary_key.cmp(&b.primary_key))
        });
        if let Some(max) = max_results {
            documents.truncate(max);
        }
        documents
    }

    /// Live postings of each distinct indexed query token, rarest first.
    fn query_postings<'a>(&'a self, query_tokens: &'a [String]) -> Vec<TokenPostings<'a>> {
        let mut seen = HashSet::new();
        let mut postings: Vec<TokenPostings<'a>> = query_tokens
            .iter()
            .filter(|&token| seen.insert(token.as_str()))
            .filter_map(|token| {
                let live: Vec<&LinePointer> = self
                    .positions_by_token
                    .get(token)?
                    .iter()
                    .filter(|pointer| self.is_live(pointer))
                    .collect();
                if live.is_empty() {
                    return None;
                }
                Some(TokenPostings {
                    token,
                    weight: token_weight(self.entries, live.len()),
                    live,
                })
            })
            .collect();
        postings.sort_by(|a, b| {
            a.live
                .len()
                .cmp(&b.live.len())
                .then_with(|| a.token.cmp(b.token))
        });
        postings
    }

    /// Lines holding at least two query tokens.
    fn same_line_find(&self, postings: &[TokenPostings<'_>]) -> HashMap<LinePointer, f64> {
        let mut lines: HashMap<&LinePointer, (f64, usize)> = HashMap::new();
        for token in postings {
            for &pointer in &token.live {
                let entry = lines.entry(pointer).or_insert((0.0, 0));
                entry.0 += token.weight;
                entry.1 += 1;
            }
        }

        let scores = lines
            .into_iter()
            .filter(|(_, (_, matched))| *matched > 1)
            .map(|(pointer, (score, _))| (pointer.clone(), score * self.config.same_line_bonus))
            .collect();
        apply_noise_floor(scores, self.config.noise_floor_ratio)
    }

    /// Document-level scores, reported on the first matching line of each document.
    fn same_document_find(&self, postings: &[TokenPostings<'_>]) -> HashMap<LinePointer, f64> {
        struct DocumentScore<'a> {
            score: f64,
            distinct_tokens: usize,
            first_line: &'a LinePointer,
        }

        let mut documents: HashMap<&KeyValue, DocumentScore<'_>> = HashMap::new();
        for token in postings {
            let mut counted: HashSet<&KeyValue> = HashSet::new();
            for &pointer in &token.live {
                let entry = documents
                    .entry(&pointer.primary_key)
                    .or_insert(DocumentScore {
                        score: 0.0,
                        distinct_tokens: 0,
                        first_line: pointer,
                    });
                entry.score += token.weight;
                if counted.insert(&pointer.primary_key) {
                    entry.distinct_tokens += 1;
                }
                if pointer.line < entry.first_line.line {
                    entry.first_line = pointer;
                }
            }
        }

        let scores = documents
            .into_values()
            .map(|document| {
                let score = if document.distinct_tokens > 1 {
                    document.score * document.distinct_tokens as f64 * DOCUMENT_TOKEN_BONUS
                } else {
                    document.score
                };
                (document.first_line.clone(), score)
            })
            .collect();
        apply_noise_floor(scores, self.config.noise_floor_ratio)
    }
}
