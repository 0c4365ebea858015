//! Train/test splitting and majority-class undersampling
//!
//! Randomness is always supplied by the caller so a seeded generator gives
//! reproducible partitions.

use rand::seq::index;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;

use crate::error::{PipelineError, PipelineResult};
use crate::pipeline::matrix::FeatureMatrix;

pub const DEFAULT_TRAIN_FRACTION: f64 = 0.9;
pub const DEFAULT_SEED: u64 = 10;

/// Train and test partitions of a feature matrix
#[derive(Debug, Clone)]
pub struct Split {
    pub train: FeatureMatrix,
    pub test: FeatureMatrix,
}

/// Class counts observed while splitting, for reporting
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct SplitReport {
    pub train_rows: usize,
    pub test_rows: usize,
    /// `(class 0, class 1)` in the training partition before undersampling
    pub train_counts: (usize, usize),
    /// `(class 0, class 1)` after undersampling
    pub balanced_counts: (usize, usize),
    pub test_counts: (usize, usize),
    pub train_filled: usize,
    pub test_filled: usize,
}

/// Shuffle rows and cut them into train and test partitions.
///
/// `floor(n * train_fraction)` rows go to training. There is no stratification
/// beyond what random sampling gives.
pub fn train_test_split<R: Rng + ?Sized>(
    matrix: &FeatureMatrix,
    train_fraction: f64,
    rng: &mut R,
) -> PipelineResult<Split> {
    if !(train_fraction > 0.0 && train_fraction < 1.0) {
        return Err(PipelineError::quality(
            "split",
            format!("train fraction must be in (0, 1), got {}", train_fraction),
            Vec::new(),
        ));
    }

    let n = matrix.n_rows();
    let mut order: Vec<usize> = (0..n).collect();
    order.shuffle(rng);

    let n_train = (n as f64 * train_fraction).floor() as usize;
    let (train_idx, test_idx) = order.split_at(n_train);

    Ok(Split {
        train: matrix.select_rows(train_idx),
        test: matrix.select_rows(test_idx),
    })
}

/// Randomly drop majority-class rows until both classes have the minority
/// count. Minority rows are kept in their original order after the sampled
/// majority rows.
pub fn undersample<R: Rng + ?Sized>(train: &FeatureMatrix, rng: &mut R) -> PipelineResult<FeatureMatrix> {
    let (negatives, positives) = train.class_counts();
    if negatives == 0 || positives == 0 {
        return Err(PipelineError::quality(
            "split",
            format!(
                "training partition needs both classes to balance, found {} class-0 and {} class-1 rows",
                negatives, positives
            ),
            vec!["target".to_string()],
        ));
    }

    let majority_class: u8 = if negatives >= positives { 0 } else { 1 };
    let minority_count = negatives.min(positives);

    let majority_rows: Vec<usize> = rows_of_class(train, majority_class);
    let minority_rows: Vec<usize> = rows_of_class(train, 1 - majority_class);

    let mut selected: Vec<usize> = index::sample(rng, majority_rows.len(), minority_count)
        .into_iter()
        .map(|i| majority_rows[i])
        .collect();
    selected.extend(minority_rows);

    Ok(train.select_rows(&selected))
}

fn rows_of_class(matrix: &FeatureMatrix, class: u8) -> Vec<usize> {
    matrix
        .target()
        .iter()
        .enumerate()
        .filter(|(_, &t)| t == class)
        .map(|(i, _)| i)
        .collect()
}

/// Split, balance the training partition only, then zero-fill each partition
/// on its own.
pub fn split_and_rebalance<R: Rng + ?Sized>(
    matrix: &FeatureMatrix,
    train_fraction: f64,
    rng: &mut R,
) -> PipelineResult<(Split, SplitReport)> {
    let split = train_test_split(matrix, train_fraction, rng)?;
    let train_counts = split.train.class_counts();

    let mut train = undersample(&split.train, rng)?;
    let mut test = split.test;

    let train_filled = train.fill_missing_with_zero();
    let test_filled = test.fill_missing_with_zero();

    let report = SplitReport {
        train_rows: train.n_rows(),
        test_rows: test.n_rows(),
        train_counts,
        balanced_counts: train.class_counts(),
        test_counts: test.class_counts(),
        train_filled,
        test_filled,
    };

    tracing::info!(
        train_rows = report.train_rows,
        test_rows = report.test_rows,
        train_class_0 = report.balanced_counts.0,
        train_class_1 = report.balanced_counts.1,
        test_class_0 = report.test_counts.0,
        test_class_1 = report.test_counts.1,
        "Split and undersampled dataset"
    );

    Ok((Split { train, test }, report))
}
