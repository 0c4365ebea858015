//! Benchmarks for classifier fitting, prediction and ROC-AUC ranking
//!
//! Run with: cargo bench --bench model_benchmark

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::prelude::*;
use rand::SeedableRng;

use lorisk::model::{roc_auc, GaussianNaiveBayes};
use lorisk::pipeline::matrix::FeatureMatrix;

/// Synthetic scaled matrix where class 1 sits higher on every feature
fn generate_matrix(n_rows: usize, n_features: usize, seed: u64) -> FeatureMatrix {
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);

    let target: Vec<u8> = (0..n_rows).map(|_| u8::from(rng.gen::<bool>())).collect();
    let values: Vec<Vec<f64>> = (0..n_features)
        .map(|_| {
            target
                .iter()
                .map(|&t| {
                    let shift = if t == 1 { 0.3 } else { 0.0 };
                    (rng.gen::<f64>() * 0.7 + shift).min(1.0)
                })
                .collect()
        })
        .collect();
    let columns = (0..n_features).map(|i| format!("feature_{}", i)).collect();

    FeatureMatrix::new(columns, values, target).expect("Failed to create FeatureMatrix")
}

/// Fit and predict for growing row counts
fn benchmark_by_rows(c: &mut Criterion) {
    let mut group = c.benchmark_group("naive_bayes_by_rows");
    group.sample_size(30);

    let n_features = 40;
    let row_counts = [1_000, 10_000, 100_000];

    for n_rows in row_counts {
        let matrix = generate_matrix(n_rows, n_features, 42);
        let model = GaussianNaiveBayes::fit(&matrix).expect("fit");

        group.throughput(Throughput::Elements(n_rows as u64));

        group.bench_with_input(BenchmarkId::new("fit", n_rows), &matrix, |b, matrix| {
            b.iter(|| {
                let _ = GaussianNaiveBayes::fit(black_box(matrix));
            });
        });

        group.bench_with_input(
            BenchmarkId::new("predict_probability", n_rows),
            &(&model, &matrix),
            |b, (model, matrix)| {
                b.iter(|| {
                    let _ = model.predict_probability(black_box(*matrix));
                });
            },
        );
    }

    group.finish();
}

/// Rank-based AUC, which sorts every score
fn benchmark_roc_auc(c: &mut Criterion) {
    let mut group = c.benchmark_group("roc_auc");
    group.sample_size(30);

    for n_rows in [10_000, 100_000, 1_000_000] {
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        let truth: Vec<u8> = (0..n_rows).map(|_| u8::from(rng.gen::<bool>())).collect();
        // coarse scores so ties are common
        let scores: Vec<f64> = truth
            .iter()
            .map(|&t| ((rng.gen::<f64>() + f64::from(t) * 0.2) * 100.0).round() / 100.0)
            .collect();

        group.throughput(Throughput::Elements(n_rows as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(n_rows),
            &(&truth, &scores),
            |b, (truth, scores)| {
                b.iter(|| {
                    let _ = roc_auc(black_box(*truth), black_box(*scores));
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, benchmark_by_rows, benchmark_roc_auc);
criterion_main!(benches);
