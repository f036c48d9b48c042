//! # Shardcache Subsystem Benchmarks
//!
//! | Subsystem | Operation | Target |
//! |-----------|-----------|--------|
//! | sc-01 Reliable Storage | In-place block rewrite | < 50µs |
//! | sc-01 Reliable Storage | Load 10k blocks | < 100ms |
//! | sc-04 Full-Text | Index 10k documents | < 1s |
//! | sc-04 Full-Text | Multi-token query | < 5ms |

use criterion::{criterion_group, criterion_main};

use sc_tests::benchmarks::{sc_01_reliable_storage, sc_04_full_text};

criterion_group!(
    storage_benches,
    sc_01_reliable_storage::bench_store_block,
    sc_01_reliable_storage::bench_load
);

criterion_group!(
    full_text_benches,
    sc_04_full_text::bench_tokenize,
    sc_04_full_text::bench_index,
    sc_04_full_text::bench_search
);

criterion_main!(storage_benches, full_text_benches);
