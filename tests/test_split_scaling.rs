//! Tests for splitting, undersampling and min-max scaling

use lorisk::pipeline::matrix::FeatureMatrix;
use lorisk::pipeline::scaling::{normalize_partitions, MinMaxScaler, ScalingStrategy};
use lorisk::pipeline::split::{split_and_rebalance, train_test_split, undersample};
use rand::rngs::StdRng;
use rand::SeedableRng;

#[path = "common/mod.rs"]
mod common;

fn processed_matrix(rows: usize) -> FeatureMatrix {
    FeatureMatrix::from_dataframe(&common::create_processed_dataframe(rows, 42), "target").unwrap()
}

fn imbalanced_matrix() -> FeatureMatrix {
    // 90 repaid, 10 defaults
    let values: Vec<f64> = (0..100).map(|i| i as f64).collect();
    let target: Vec<u8> = (0..100).map(|i| u8::from(i % 10 == 0)).collect();
    FeatureMatrix::new(vec!["x".into()], vec![values], target).unwrap()
}

#[test]
fn test_split_partitions_every_row_once() {
    let matrix = processed_matrix(200);
    let mut rng = StdRng::seed_from_u64(10);

    let split = train_test_split(&matrix, 0.9, &mut rng).unwrap();

    assert_eq!(split.train.n_rows(), 180);
    assert_eq!(split.test.n_rows(), 20);
    let mut seen: Vec<f64> = split
        .train
        .column_values(0)
        .iter()
        .chain(split.test.column_values(0).iter())
        .copied()
        .collect();
    let mut original = matrix.column_values(0).to_vec();
    seen.sort_by(f64::total_cmp);
    original.sort_by(f64::total_cmp);
    assert_eq!(seen, original);
}

#[test]
fn test_floor_of_train_fraction() {
    let matrix = processed_matrix(15);
    let mut rng = StdRng::seed_from_u64(10);

    let split = train_test_split(&matrix, 0.9, &mut rng).unwrap();
    assert_eq!(split.train.n_rows(), 13);
    assert_eq!(split.test.n_rows(), 2);
}

#[test]
fn test_same_seed_same_partitions() {
    let matrix = processed_matrix(120);

    let (a, _) = split_and_rebalance(&matrix, 0.9, &mut StdRng::seed_from_u64(10)).unwrap();
    let (b, _) = split_and_rebalance(&matrix, 0.9, &mut StdRng::seed_from_u64(10)).unwrap();

    assert_eq!(a.train, b.train);
    assert_eq!(a.test, b.test);
}

#[test]
fn test_undersampled_train_is_balanced_test_untouched() {
    let matrix = imbalanced_matrix();

    let (split, report) = split_and_rebalance(&matrix, 0.9, &mut StdRng::seed_from_u64(10)).unwrap();

    let (negatives, positives) = split.train.class_counts();
    assert_eq!(negatives, positives);
    assert_eq!(positives, report.train_counts.1);
    assert_eq!(split.test.n_rows(), 10, "Test partition is never resampled");
    assert_eq!(report.test_counts.0 + report.test_counts.1, 10);
}

#[test]
fn test_undersample_keeps_every_minority_row() {
    let matrix = imbalanced_matrix();

    let balanced = undersample(&matrix, &mut StdRng::seed_from_u64(3)).unwrap();

    assert_eq!(balanced.class_counts(), (10, 10));
    let minority: Vec<f64> = balanced
        .column_values(0)
        .iter()
        .zip(balanced.target())
        .filter(|(_, &t)| t == 1)
        .map(|(&v, _)| v)
        .collect();
    assert_eq!(minority, vec![0.0, 10.0, 20.0, 30.0, 40.0, 50.0, 60.0, 70.0, 80.0, 90.0]);
}

#[test]
fn test_missing_cells_zero_filled_per_partition() {
    let target: Vec<u8> = (0..20).map(|i| (i % 2) as u8).collect();
    let values: Vec<f64> = (0..20).map(|i| if i % 5 == 0 { f64::NAN } else { i as f64 }).collect();
    let matrix = FeatureMatrix::new(vec!["x".into()], vec![values], target).unwrap();

    let (split, report) = split_and_rebalance(&matrix, 0.5, &mut StdRng::seed_from_u64(1)).unwrap();

    assert_eq!(split.train.missing_cells(), 0);
    assert_eq!(split.test.missing_cells(), 0);
    assert!(report.train_filled + report.test_filled <= 4);
}

#[test]
fn test_scaled_training_values_in_unit_interval() {
    let matrix = processed_matrix(100);
    let (split, _) = split_and_rebalance(&matrix, 0.9, &mut StdRng::seed_from_u64(10)).unwrap();

    let (train, test, _) = normalize_partitions(split.train, split.test, ScalingStrategy::PerPartition).unwrap();

    for partition in [&train, &test] {
        for index in 0..partition.n_features() {
            assert!(partition
                .column_values(index)
                .iter()
                .all(|v| (0.0..=1.0).contains(v)));
        }
    }
}

#[test]
fn test_fit_on_train_stores_scaler() {
    let matrix = processed_matrix(100);
    let (split, _) = split_and_rebalance(&matrix, 0.9, &mut StdRng::seed_from_u64(10)).unwrap();
    let train_fit = MinMaxScaler::fit(&split.train);

    let (_, _, scaler) = normalize_partitions(split.train, split.test, ScalingStrategy::FitOnTrain).unwrap();

    assert_eq!(scaler, Some(train_fit));
}

#[test]
fn test_mismatched_columns_rejected() {
    let train = FeatureMatrix::new(vec!["a".into(), "b".into()], vec![vec![0.0], vec![1.0]], vec![0]).unwrap();
    let test = FeatureMatrix::new(vec!["a".into(), "c".into()], vec![vec![0.0], vec![1.0]], vec![0]).unwrap();

    let err = normalize_partitions(train, test, ScalingStrategy::PerPartition).unwrap_err();
    assert!(err.is_schema_violation());
    let message = err.to_string();
    assert!(message.contains("missing:b"));
    assert!(message.contains("unexpected:c"));
}
