//! Install list resolution performance benchmarks
//!
//! Benchmarks best-effort and strict resolution over layered catalogs,
//! plus the standalone feature graph cycle check.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use provision_benchmarks::{criterion_config, layered_catalog, top_layer};
use provision_resolver::{FeatureGraph, RepositoryResolver};

/// Benchmark best-effort resolution for growing catalogs
fn bench_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolution");
    group.sample_size(20);

    for layers in [4usize, 8, 16].iter() {
        let width = 8;
        let catalog = layered_catalog(*layers, width);
        let roots = top_layer(*layers, width);
        let resolver = RepositoryResolver::new(catalog);

        group.throughput(Throughput::Elements((*layers * width) as u64));
        group.bench_with_input(BenchmarkId::new("layers", layers), &roots, |b, roots| {
            b.iter(|| black_box(resolver.resolve(roots.iter())));
        });
    }

    group.finish();
}

/// Benchmark strict resolution, which adds the solver pass
fn bench_strict_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("strict_resolution");
    group.sample_size(20);

    for layers in [4usize, 8].iter() {
        let width = 8;
        let resolver = RepositoryResolver::new(layered_catalog(*layers, width));
        let roots = top_layer(*layers, width);

        group.bench_with_input(BenchmarkId::new("layers", layers), &roots, |b, roots| {
            b.iter(|| black_box(resolver.resolve_as_set(roots.iter())));
        });
    }

    group.finish();
}

/// Benchmark cycle detection over the whole catalog graph
fn bench_cycle_check(c: &mut Criterion) {
    let catalog = layered_catalog(16, 16);
    let features = catalog.features();

    c.bench_function("cycle_check", |b| {
        b.iter(|| {
            let graph = FeatureGraph::from_features(catalog.as_ref(), features.iter());
            black_box(graph.cycles())
        });
    });
}

criterion_group! {
    name = benches;
    config = criterion_config();
    targets = bench_resolution, bench_strict_resolution, bench_cycle_check
}
criterion_main!(benches);
