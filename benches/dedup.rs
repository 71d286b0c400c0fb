use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use dedup_engine::{
    Content, DedupKey, DedupStrategy, Deduper, Fingerprint, KeyField, Strategy,
};
use serde_json::json;
use std::sync::Arc;

fn finding() -> Content {
    json!({
        "spec": {
            "source": "trivy",
            "category": "vulnerability",
            "severity": "HIGH",
            "rule": "CVE-2024-0001",
            "resource": {"kind": "Deployment", "name": "api", "namespace": "prod"},
            "details": {"package": "openssl", "installed": "3.0.1", "fixed": "3.0.2"},
            "detectedAt": "2024-01-01T00:00:00Z"
        },
        "metadata": {"resourceVersion": "42", "uid": "abc"}
    })
    .as_object()
    .cloned()
    .unwrap()
}

fn key(i: usize) -> DedupKey {
    DedupKey::new("trivy", "prod", "Deployment", format!("api-{i}"), "Vulnerability", "ff")
}

/// Benchmark fingerprint computation speed
fn bench_fingerprint(c: &mut Criterion) {
    let mut group = c.benchmark_group("fingerprint");

    let small = json!({"severity": "HIGH"}).as_object().cloned().unwrap();
    let nested = finding();
    let wide: Content = (0..50)
        .map(|i| (format!("field{i}"), json!({"value": i, "timestamp": "now"})))
        .collect();

    group.bench_function("small", |b| b.iter(|| Fingerprint::of(black_box(&small))));
    group.bench_function("canonical_nested", |b| {
        b.iter(|| Fingerprint::of(black_box(&nested)))
    });
    group.bench_function("wide_no_canonical", |b| {
        b.iter(|| Fingerprint::of(black_box(&wide)))
    });

    group.finish();
}

/// Benchmark single-threaded decision throughput per strategy
fn bench_strategies(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let _guard = runtime.enter();

    let mut group = c.benchmark_group("should_create");
    group.throughput(Throughput::Elements(1000));

    let content = finding();
    let strategies = [
        Strategy::fingerprint(),
        Strategy::event_stream(100),
        Strategy::key_based([KeyField::Source, KeyField::Name]).unwrap(),
    ];

    for strategy in strategies {
        let deduper = Deduper::new(60, 10_000).unwrap();
        group.bench_with_input(
            BenchmarkId::new("strategy", strategy.name()),
            &strategy,
            |b, strategy| {
                b.iter(|| {
                    for i in 0..1000 {
                        black_box(strategy.should_create(&deduper, &key(i % 100), &content));
                    }
                })
            },
        );
        deduper.stop();
    }

    group.finish();
}

/// Benchmark inserts into a full store
fn bench_at_capacity(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let _guard = runtime.enter();

    let mut group = c.benchmark_group("at_capacity");
    group.throughput(Throughput::Elements(1000));

    for max_size in [100, 1_000, 10_000] {
        let deduper = Deduper::new(60, max_size).unwrap();
        let strategy = Strategy::event_stream(100);
        let content = Content::new();
        let mut next = 0usize;

        group.bench_with_input(BenchmarkId::new("max_size", max_size), &max_size, |b, _| {
            b.iter(|| {
                for _ in 0..1000 {
                    next += 1;
                    black_box(strategy.should_create(&deduper, &key(next), &content));
                }
            })
        });
        deduper.stop();
    }

    group.finish();
}

/// Benchmark multi-threaded concurrent throughput
fn bench_concurrent(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let _guard = runtime.enter();

    let mut group = c.benchmark_group("concurrent");

    for num_threads in [2, 4, 8] {
        group.throughput(Throughput::Elements((num_threads as u64) * 1000));
        let deduper = Arc::new(Deduper::new(60, 100_000).unwrap());
        let strategy = Arc::new(Strategy::fingerprint());
        let content = Arc::new(finding());

        group.bench_with_input(
            BenchmarkId::new("threads", num_threads),
            &num_threads,
            |b, &num_threads| {
                b.iter(|| {
                    let handles: Vec<_> = (0..num_threads)
                        .map(|t| {
                            let deduper = Arc::clone(&deduper);
                            let strategy = Arc::clone(&strategy);
                            let content = Arc::clone(&content);
                            std::thread::spawn(move || {
                                for i in 0..1000 {
                                    // Threads overlap on half of the buckets
                                    let k = key((t * 500 + i) % 4000);
                                    black_box(strategy.should_create(&deduper, &k, &content));
                                }
                            })
                        })
                        .collect();
                    for handle in handles {
                        handle.join().unwrap();
                    }
                })
            },
        );
        deduper.stop();
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_fingerprint,
    bench_strategies,
    bench_at_capacity,
    bench_concurrent
);
criterion_main!(benches);
