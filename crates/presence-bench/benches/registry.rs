//! Registry benchmarks for the presence mock.
//!
//! These benchmarks measure channel lookup and subscription cost.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use presence_mock_bench::{identified_client, populated_registry};

/// Benchmark lookups of channels that already exist.
fn bench_get_existing(c: &mut Criterion) {
    let mut group = c.benchmark_group("registry_get_existing");

    for channels in [1, 100, 10_000] {
        let registry = populated_registry(channels, 0);
        group.bench_with_input(BenchmarkId::from_parameter(channels), &channels, |b, _| {
            b.iter(|| registry.get_or_create(black_box("presence-room-0")));
        });
    }

    group.finish();
}

/// Benchmark first-time channel creation.
fn bench_create(c: &mut Criterion) {
    c.bench_function("registry_create_1000", |b| {
        b.iter(|| populated_registry(black_box(1_000), 0));
    });
}

/// Benchmark a full subscribe with a synchronous authorizer.
fn bench_subscribe(c: &mut Criterion) {
    let registry = populated_registry(1, 10);
    let client = identified_client(&registry, "alice");

    c.bench_function("client_subscribe", |b| {
        b.iter(|| client.subscribe(black_box("presence-room-0")));
    });
}

criterion_group!(benches, bench_get_existing, bench_create, bench_subscribe);
criterion_main!(benches);
