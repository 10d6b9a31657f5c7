//! Benchmarks for the Redb storage adapter.

#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion, Throughput};

use keyport_storage::{ManagedStorage, RawEntry, RawStorage, RedbStorage};

fn populated(num_keys: u64) -> RedbStorage {
    let storage = RedbStorage::in_memory("bench").unwrap();
    for i in 0..num_keys {
        let key = format!("key:{i:05}");
        let value = format!("value:{i:05}");
        storage.set_raw(b"bench/", key.as_bytes(), value.as_bytes(), 0).unwrap();
    }
    storage
}

/// Benchmark single key-value writes.
fn bench_set_single(c: &mut Criterion) {
    let mut group = c.benchmark_group("redb_set_single");
    group.throughput(Throughput::Elements(1));

    group.bench_function("set_single", |b| {
        b.iter_batched(
            || RedbStorage::in_memory("bench").unwrap(),
            |storage| {
                storage.set_raw(b"bench/", b"key", b"value", 0).unwrap();
            },
            BatchSize::SmallInput,
        );
    });

    group.finish();
}

/// Benchmark random reads from a populated store.
fn bench_get_random(c: &mut Criterion) {
    const NUM_KEYS: u64 = 10000;
    let mut group = c.benchmark_group("redb_get_random");
    group.throughput(Throughput::Elements(100));

    let storage = populated(NUM_KEYS);
    group.bench_function("get_random_100", |b| {
        b.iter(|| {
            for i in (0..100).map(|x| x * 97 % NUM_KEYS) {
                let key = format!("key:{i:05}");
                let _ = black_box(storage.get_raw(b"bench/", key.as_bytes(), true).unwrap());
            }
        });
    });

    group.finish();
}

/// Benchmark read-modify-write counters.
fn bench_increment(c: &mut Criterion) {
    let mut group = c.benchmark_group("redb_increment");
    group.throughput(Throughput::Elements(1));

    let storage = RedbStorage::in_memory("bench").unwrap();
    group.bench_function("increment", |b| {
        b.iter(|| black_box(storage.increment().by_prefix("c/").by_key("n").execute().unwrap()));
    });

    group.finish();
}

/// Benchmark prefix enumeration.
fn bench_enumerate(c: &mut Criterion) {
    let mut group = c.benchmark_group("redb_enumerate");

    for size in [100, 1000, 10000] {
        group.throughput(Throughput::Elements(size));
        let storage = populated(size);
        group.bench_function(format!("enumerate_{size}"), |b| {
            b.iter(|| {
                let mut count = 0u64;
                storage
                    .enumerate_raw(b"bench/", b"bench/", 256, false, &mut |_: &RawEntry| {
                        count += 1;
                        true
                    })
                    .unwrap();
                black_box(count);
            });
        });
    }

    group.finish();
}

/// Benchmark a full backup into memory.
fn bench_backup(c: &mut Criterion) {
    let mut group = c.benchmark_group("redb_backup");
    group.throughput(Throughput::Elements(10000));

    let storage = populated(10000);
    group.bench_function("backup_10000", |b| {
        b.iter(|| {
            let mut out = Vec::new();
            storage.backup(&mut out, 0).unwrap();
            black_box(out.len());
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_set_single,
    bench_get_random,
    bench_increment,
    bench_enumerate,
    bench_backup,
);

criterion_main!(benches);
