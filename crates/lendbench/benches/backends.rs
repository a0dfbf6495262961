//! In-process backend benchmarks.
//!
//! Compares SQLite against the key-value join logic on the four queries.

use chrono::NaiveDate;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use lendbench::backends::{Backend, KeyValueBackend, MemoryStore, SqliteBackend};
use lendbench::dataset::generator::{generate, GeneratorConfig};
use lendbench::query::{QueryId, QueryParams};

fn dataset(scale: usize) -> lendbench::Dataset {
    generate(
        &GeneratorConfig::new(scale, scale, scale * 2)
            .with_seed(7)
            .with_reference_date(NaiveDate::from_ymd_opt(2023, 6, 1).unwrap()),
    )
}

fn bench_queries(c: &mut Criterion) {
    let params = QueryParams::new("j");

    for scale in [100, 1000] {
        let data = dataset(scale);

        let mut sqlite = SqliteBackend::in_memory().unwrap();
        sqlite.load(&data).unwrap();
        let mut memory = KeyValueBackend::new(MemoryStore::default());
        memory.load(&data).unwrap();

        for query in QueryId::ALL {
            let mut group = c.benchmark_group(format!("backends/{}", query));

            group.bench_with_input(BenchmarkId::new("sqlite", scale), &query, |b, &query| {
                b.iter(|| {
                    let rows = sqlite.run_query(query, &params).unwrap();
                    black_box(rows.len());
                });
            });

            group.bench_with_input(BenchmarkId::new("memory", scale), &query, |b, &query| {
                b.iter(|| {
                    let rows = memory.run_query(query, &params).unwrap();
                    black_box(rows.len());
                });
            });

            group.finish();
        }
    }
}

fn bench_load(c: &mut Criterion) {
    let mut group = c.benchmark_group("backends/load");
    let data = dataset(500);

    group.bench_function("sqlite", |b| {
        let mut sqlite = SqliteBackend::in_memory().unwrap();
        b.iter(|| black_box(sqlite.load(&data).unwrap()));
    });

    group.bench_function("memory", |b| {
        let mut memory = KeyValueBackend::new(MemoryStore::default());
        b.iter(|| black_box(memory.load(&data).unwrap()));
    });

    group.finish();
}

criterion_group!(benches, bench_queries, bench_load);
criterion_main!(benches);
