//! # SC-01 Reliable Storage Benchmarks
//!
//! - Appending new blocks
//! - Rewriting a block in place (same size, new transaction)
//! - Full load of a populated file through the object processor

use std::time::Duration;

use criterion::{black_box, BenchmarkId, Criterion, Throughput};
use rand::Rng;
use tempfile::TempDir;

use sc_01_reliable_storage::{RecordingObjectProcessor, ReliableStorage, ReliableStorageApi};

fn random_payload(len: usize) -> Vec<u8> {
    let mut rng = rand::thread_rng();
    (0..len).map(|_| rng.gen()).collect()
}

fn populated(dir: &TempDir, blocks: usize, payload_len: usize) -> ReliableStorage {
    let mut storage = ReliableStorage::open(dir.path().join("datastore.bin")).unwrap();
    for i in 0..blocks {
        storage
            .store_block(&random_payload(payload_len), &format!("bench@{}", i), i as i32)
            .unwrap();
    }
    storage
}

pub fn bench_store_block(c: &mut Criterion) {
    let mut group = c.benchmark_group("sc-01-store-block");
    group.measurement_time(Duration::from_secs(5));

    for payload_len in [64usize, 1024, 16 * 1024] {
        let payload = random_payload(payload_len);
        group.throughput(Throughput::Bytes(payload_len as u64));

        group.bench_with_input(BenchmarkId::new("append", payload_len), &payload, |b, payload| {
            let dir = TempDir::new().unwrap();
            let mut storage = ReliableStorage::open(dir.path().join("datastore.bin")).unwrap();
            let mut next = 0i32;
            b.iter(|| {
                next += 1;
                storage
                    .store_block(black_box(payload), &format!("bench@{}", next), next)
                    .unwrap();
            })
        });

        group.bench_with_input(BenchmarkId::new("in_place", payload_len), &payload, |b, payload| {
            let dir = TempDir::new().unwrap();
            let mut storage = ReliableStorage::open(dir.path().join("datastore.bin")).unwrap();
            storage.store_block(payload, "bench@hot", 0).unwrap();
            let mut next = 0i32;
            b.iter(|| {
                next += 1;
                storage.store_block(black_box(payload), "bench@hot", next).unwrap();
            })
        });
    }

    group.finish();
}

pub fn bench_load(c: &mut Criterion) {
    let mut group = c.benchmark_group("sc-01-load");
    group.sample_size(10);

    for blocks in [1_000usize, 10_000] {
        let dir = TempDir::new().unwrap();
        drop(populated(&dir, blocks, 256));
        group.throughput(Throughput::Elements(blocks as u64));

        group.bench_with_input(BenchmarkId::new("with_processor", blocks), &dir, |b, dir| {
            b.iter(|| {
                let processor = RecordingObjectProcessor::new();
                let mut storage = ReliableStorage::open(dir.path().join("datastore.bin"))
                    .unwrap()
                    .with_processor(processor.clone());
                black_box(storage.load_persistent_data(true).unwrap())
            })
        });
    }

    group.finish();
}
