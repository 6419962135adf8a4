//! Benchmarks for the similarity scan at realistic per-case pattern counts

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use precedente::cosine_similarity;

fn bench_cosine(c: &mut Criterion) {
    let query: Vec<f64> = (0..10).map(|i| (i as f64) / 10.0).collect();
    let stored: Vec<f64> = (0..10).map(|i| (i as f64) / 9.5).collect();

    c.bench_function("cosine_10d", |b| {
        b.iter(|| cosine_similarity(black_box(&query), black_box(&stored)).unwrap())
    });
}

fn bench_linear_scan(c: &mut Criterion) {
    // per-case pattern counts are bounded by page counts; 500 is already a
    // pathological caso
    let mut group = c.benchmark_group("linear_scan");
    for count in [10usize, 100, 500] {
        let query: Vec<f64> = (0..10).map(|i| (i as f64) / 10.0).collect();
        let patterns: Vec<Vec<f64>> = (0..count)
            .map(|p| (0..10).map(|i| ((i + p) % 10) as f64 / 10.0).collect())
            .collect();

        group.bench_with_input(BenchmarkId::from_parameter(count), &patterns, |b, pats| {
            b.iter(|| {
                let mut best = 0.0f64;
                for stored in pats {
                    let sim = cosine_similarity(black_box(&query), stored).unwrap();
                    if sim > best {
                        best = sim;
                    }
                }
                best
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_cosine, bench_linear_scan);
criterion_main!(benches);
