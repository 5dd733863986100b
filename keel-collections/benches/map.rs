//! Benchmarks comparing the keel collections against std's maps.
//!
//! Run with: cargo bench
//!
//! All containers are pre-allocated for fair comparison; the keel maps
//! reuse their storage across iterations via clear().

use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};
use keel_collections::{DynamicHashMap, DynamicOrderedMap};
use std::collections::{BTreeMap, HashMap};

const COUNT: usize = 100_000;

// ============================================================================
// Insert Benchmarks
// ============================================================================

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert");
    group.throughput(Throughput::Elements(COUNT as u64));

    // Pre-allocate ONCE, reuse via clear()
    let mut keel_hash: DynamicHashMap<u64, u64> = DynamicHashMap::with_capacity(COUNT);
    let mut keel_ordered: DynamicOrderedMap<u64, u64> = DynamicOrderedMap::with_capacity(COUNT);
    let mut std_hash: HashMap<u64, u64> = HashMap::with_capacity(COUNT);
    let mut std_btree: BTreeMap<u64, u64> = BTreeMap::new();

    group.bench_function("keel-hash", |b| {
        b.iter(|| {
            for i in 0..COUNT as u64 {
                black_box(keel_hash.insert(i, i).unwrap());
            }
            keel_hash.clear();
        });
    });

    group.bench_function("std-hash", |b| {
        b.iter(|| {
            for i in 0..COUNT as u64 {
                black_box(std_hash.insert(i, i));
            }
            std_hash.clear();
        });
    });

    group.bench_function("keel-ordered", |b| {
        b.iter(|| {
            for i in 0..COUNT as u64 {
                black_box(keel_ordered.insert(i, i).unwrap());
            }
            keel_ordered.clear();
        });
    });

    group.bench_function("std-btree", |b| {
        b.iter(|| {
            for i in 0..COUNT as u64 {
                black_box(std_btree.insert(i, i));
            }
            std_btree.clear();
        });
    });

    group.finish();
}

// ============================================================================
// Lookup Benchmarks (Random Access)
// ============================================================================

fn bench_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("lookup");

    const LOOKUPS: usize = 10_000;
    group.throughput(Throughput::Elements(LOOKUPS as u64));

    let mut keel_hash: DynamicHashMap<u64, u64> = DynamicHashMap::with_capacity(COUNT);
    let mut keel_ordered: DynamicOrderedMap<u64, u64> = DynamicOrderedMap::with_capacity(COUNT);
    let mut std_hash: HashMap<u64, u64> = HashMap::with_capacity(COUNT);
    let mut std_btree: BTreeMap<u64, u64> = BTreeMap::new();
    for i in 0..COUNT as u64 {
        keel_hash.insert(i, i * 2).unwrap();
        keel_ordered.insert(i, i * 2).unwrap();
        std_hash.insert(i, i * 2);
        std_btree.insert(i, i * 2);
    }

    // Pseudo-random keys (deterministic for reproducibility)
    let keys: Vec<u64> = (0..LOOKUPS)
        .map(|i| ((i * 7919) % COUNT) as u64) // Prime multiplier for pseudo-random spread
        .collect();

    group.bench_function("keel-hash", |b| {
        b.iter(|| {
            let mut sum = 0u64;
            for key in &keys {
                sum += black_box(*keel_hash.get(key).unwrap());
            }
            sum
        });
    });

    group.bench_function("std-hash", |b| {
        b.iter(|| {
            let mut sum = 0u64;
            for key in &keys {
                sum += black_box(*std_hash.get(key).unwrap());
            }
            sum
        });
    });

    group.bench_function("keel-ordered", |b| {
        b.iter(|| {
            let mut sum = 0u64;
            for key in &keys {
                sum += black_box(*keel_ordered.get(key).unwrap());
            }
            sum
        });
    });

    group.bench_function("std-btree", |b| {
        b.iter(|| {
            let mut sum = 0u64;
            for key in &keys {
                sum += black_box(*std_btree.get(key).unwrap());
            }
            sum
        });
    });

    group.finish();
}

// ============================================================================
// Insert/Remove Cycle (Churn Pattern)
// ============================================================================

fn bench_churn(c: &mut Criterion) {
    let mut group = c.benchmark_group("churn");

    const CYCLES: usize = 100_000;
    group.throughput(Throughput::Elements(CYCLES as u64 * 2)); // insert + remove

    let mut keel_hash: DynamicHashMap<u64, u64> = DynamicHashMap::with_capacity(1024);
    let mut keel_ordered: DynamicOrderedMap<u64, u64> = DynamicOrderedMap::with_capacity(1024);
    let mut std_hash: HashMap<u64, u64> = HashMap::with_capacity(1024);
    let mut std_btree: BTreeMap<u64, u64> = BTreeMap::new();

    group.bench_function("keel-hash", |b| {
        b.iter(|| {
            for i in 0..CYCLES as u64 {
                keel_hash.insert(i, i).unwrap();
                black_box(keel_hash.remove(&i));
            }
        });
    });

    group.bench_function("std-hash", |b| {
        b.iter(|| {
            for i in 0..CYCLES as u64 {
                std_hash.insert(i, i);
                black_box(std_hash.remove(&i));
            }
        });
    });

    group.bench_function("keel-ordered", |b| {
        b.iter(|| {
            for i in 0..CYCLES as u64 {
                keel_ordered.insert(i, i).unwrap();
                black_box(keel_ordered.remove(&i));
            }
        });
    });

    group.bench_function("std-btree", |b| {
        b.iter(|| {
            for i in 0..CYCLES as u64 {
                std_btree.insert(i, i);
                black_box(std_btree.remove(&i));
            }
        });
    });

    group.finish();
}

// ============================================================================
// Full Iteration
// ============================================================================

fn bench_iterate(c: &mut Criterion) {
    let mut group = c.benchmark_group("iterate");
    group.throughput(Throughput::Elements(COUNT as u64));

    let mut keel_hash: DynamicHashMap<u64, u64> = DynamicHashMap::with_capacity(COUNT);
    let mut keel_ordered: DynamicOrderedMap<u64, u64> = DynamicOrderedMap::with_capacity(COUNT);
    let mut std_hash: HashMap<u64, u64> = HashMap::with_capacity(COUNT);
    let mut std_btree: BTreeMap<u64, u64> = BTreeMap::new();
    for i in 0..COUNT as u64 {
        keel_hash.insert(i, i).unwrap();
        keel_ordered.insert(i, i).unwrap();
        std_hash.insert(i, i);
        std_btree.insert(i, i);
    }

    group.bench_function("keel-hash", |b| {
        b.iter(|| {
            let mut sum = 0u64;
            for (_, v) in keel_hash.iter() {
                sum += *v;
            }
            black_box(sum)
        });
    });

    group.bench_function("std-hash", |b| {
        b.iter(|| {
            let mut sum = 0u64;
            for (_, v) in std_hash.iter() {
                sum += *v;
            }
            black_box(sum)
        });
    });

    group.bench_function("keel-ordered", |b| {
        b.iter(|| {
            let mut sum = 0u64;
            for (_, v) in keel_ordered.iter() {
                sum += *v;
            }
            black_box(sum)
        });
    });

    group.bench_function("std-btree", |b| {
        b.iter(|| {
            let mut sum = 0u64;
            for (_, v) in std_btree.iter() {
                sum += *v;
            }
            black_box(sum)
        });
    });

    group.finish();
}

criterion_group!(benches, bench_insert, bench_lookup, bench_churn, bench_iterate);

criterion_main!(benches);
