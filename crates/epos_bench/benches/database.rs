//! Collection operation benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use epos_bench::person;
use epos_codec::to_value;
use epos_core::{Config, Database, StorageMode};
use tempfile::TempDir;

/// Opens a fresh database of the given mode; the directory must outlive it.
fn open(mode: StorageMode) -> (Database, TempDir) {
    let dir = TempDir::new().unwrap();
    let config = Config::default().root(dir.path()).mode(mode);
    (Database::open_with_config("bench", config).unwrap(), dir)
}

const MODES: [(&str, StorageMode); 2] = [("memory", StorageMode::Memory), ("file", StorageMode::File)];

/// Benchmark inserting a typed record.
fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert");

    for (label, mode) in MODES {
        group.bench_function(BenchmarkId::from_parameter(label), |b| {
            let (db, _dir) = open(mode);
            let coll = db.coll("people").unwrap();
            let record = person();

            b.iter(|| {
                let id = coll.insert_as(black_box(&record)).unwrap();
                black_box(id);
            });
        });
    }
    group.finish();
}

/// Benchmark replacing an existing record.
fn bench_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("update");

    for (label, mode) in MODES {
        group.bench_function(BenchmarkId::from_parameter(label), |b| {
            let (db, _dir) = open(mode);
            let coll = db.coll("people").unwrap();
            let value = to_value(&person()).unwrap();
            let id = coll.insert(&value).unwrap();

            b.iter(|| {
                coll.update(black_box(id), black_box(&value)).unwrap();
            });
        });
    }
    group.finish();
}

/// Benchmark deleting records, one fresh insert per iteration.
fn bench_delete(c: &mut Criterion) {
    let mut group = c.benchmark_group("delete");

    for (label, mode) in MODES {
        group.bench_function(BenchmarkId::from_parameter(label), |b| {
            let (db, _dir) = open(mode);
            let coll = db.coll("people").unwrap();
            let value = to_value(&person()).unwrap();

            b.iter_batched(
                || coll.insert(&value).unwrap(),
                |id| coll.delete(black_box(id)).unwrap(),
                criterion::BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

/// Benchmark reading a record back.
fn bench_get(c: &mut Criterion) {
    let mut group = c.benchmark_group("get");

    for (label, mode) in MODES {
        group.bench_function(BenchmarkId::from_parameter(label), |b| {
            let (db, _dir) = open(mode);
            let coll = db.coll("people").unwrap();
            let id = coll.insert_as(&person()).unwrap();

            b.iter(|| {
                let value = coll.get(black_box(id)).unwrap();
                black_box(value);
            });
        });
    }
    group.finish();
}

/// Benchmark a full pass over populated collections.
fn bench_iterate(c: &mut Criterion) {
    let mut group = c.benchmark_group("iterate");

    for count in [100usize, 1000, 10000] {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            let (db, _dir) = open(StorageMode::Memory);
            let coll = db.coll("people").unwrap();
            let value = to_value(&person()).unwrap();
            for _ in 0..count {
                coll.insert(&value).unwrap();
            }

            b.iter(|| {
                let n = coll.iter().filter(Result::is_ok).count();
                black_box(n);
            });
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_insert,
    bench_update,
    bench_delete,
    bench_get,
    bench_iterate,
);

criterion_main!(benches);
