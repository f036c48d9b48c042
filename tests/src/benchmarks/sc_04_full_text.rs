//! # SC-04 Full-Text Benchmarks
//!
//! - Tokenizing mixed-script lines
//! - Indexing a corpus of generated documents
//! - Multi-token queries with and without the order bonus

use std::collections::HashMap;

use criterion::{black_box, BenchmarkId, Criterion, Throughput};
use rand::seq::SliceRandom;
use rand::rngs::StdRng;
use rand::SeedableRng;

use sc_04_full_text::{tokenize, FullTextConfig, FullTextIndex, LinePointer, LineProvider};
use shared_types::KeyValue;

const WORDS: [&str; 24] = [
    "invoice", "delivery", "customer", "pallet", "warehouse", "urgent", "fragile", "return",
    "refund", "address", "street", "paris", "berlin", "café", "müller", "order", "shipped",
    "pending", "cancelled", "express", "weekend", "monday", "parcelNumber", "trackingId",
];

fn corpus(documents: usize, lines_per_document: usize) -> HashMap<KeyValue, Vec<String>> {
    let mut rng = StdRng::seed_from_u64(42);
    (0..documents as i64)
        .map(|id| {
            let lines = (0..lines_per_document)
                .map(|_| {
                    WORDS
                        .choose_multiple(&mut rng, 6)
                        .copied()
                        .collect::<Vec<_>>()
                        .join(" ")
                })
                .collect();
            (KeyValue::Int(id), lines)
        })
        .collect()
}

fn build_index(corpus: &HashMap<KeyValue, Vec<String>>) -> FullTextIndex {
    let mut index = FullTextIndex::new(FullTextConfig::default());
    for (key, lines) in corpus {
        index.index_document(lines, key.clone());
    }
    index
}

pub fn bench_tokenize(c: &mut Criterion) {
    let mut group = c.benchmark_group("sc-04-tokenize");
    let lines: Vec<String> = corpus(100, 1).into_values().flatten().collect();
    group.throughput(Throughput::Elements(lines.len() as u64));

    group.bench_function("tokenize_100_lines", |b| {
        b.iter(|| black_box(tokenize(&lines)))
    });

    group.finish();
}

pub fn bench_index(c: &mut Criterion) {
    let mut group = c.benchmark_group("sc-04-index");
    group.sample_size(10);

    for documents in [1_000usize, 10_000] {
        let corpus = corpus(documents, 3);
        group.throughput(Throughput::Elements(documents as u64));
        group.bench_with_input(BenchmarkId::new("index_documents", documents), &corpus, |b, corpus| {
            b.iter(|| black_box(build_index(corpus).entries()))
        });
    }

    group.finish();
}

pub fn bench_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("sc-04-search");
    let corpus = corpus(10_000, 3);
    let index = build_index(&corpus);
    let provider = |pointer: &LinePointer| {
        corpus
            .get(&pointer.primary_key)
            .and_then(|lines| lines.get(pointer.line as usize).cloned())
    };

    for query in ["urgent", "urgent pallet", "fragile express delivery paris"] {
        group.bench_with_input(BenchmarkId::new("without_order_bonus", query), query, |b, query| {
            b.iter(|| black_box(index.search_best_documents(query, Some(20), None)))
        });
        group.bench_with_input(BenchmarkId::new("with_order_bonus", query), query, |b, query| {
            b.iter(|| {
                black_box(index.search_best_documents(
                    query,
                    Some(20),
                    Some(&provider as &dyn LineProvider),
                ))
            })
        });
    }

    group.finish();
}
