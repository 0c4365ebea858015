//! Min-max normalization
//!
//! The historical pipeline fits a separate scaler on each partition, so the
//! test set is scaled by its own ranges rather than the training ranges.
//! `ScalingStrategy::FitOnTrain` applies the training ranges instead; test
//! values outside those ranges then fall outside `[0, 1]`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PipelineResult;
use crate::pipeline::matrix::{ensure_columns_match, FeatureMatrix};

/// Where the scaling ranges come from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScalingStrategy {
    /// Each partition is scaled by its own min and max
    #[default]
    PerPartition,
    /// Ranges are fit on training data and reused for every other partition
    FitOnTrain,
}

impl fmt::Display for ScalingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalingStrategy::PerPartition => write!(f, "per-partition"),
            ScalingStrategy::FitOnTrain => write!(f, "fit-on-train"),
        }
    }
}

impl FromStr for ScalingStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "per-partition" | "partition" => Ok(ScalingStrategy::PerPartition),
            "fit-on-train" | "train" => Ok(ScalingStrategy::FitOnTrain),
            other => Err(format!(
                "Invalid scaling strategy '{}'. Options: per-partition, fit-on-train",
                other
            )),
        }
    }
}

/// Per-column minimum and maximum
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinMaxScaler {
    pub columns: Vec<String>,
    pub mins: Vec<f64>,
    pub maxs: Vec<f64>,
}

impl MinMaxScaler {
    /// Learn column ranges, ignoring NaN cells
    pub fn fit(matrix: &FeatureMatrix) -> Self {
        let mut mins = Vec::with_capacity(matrix.n_features());
        let mut maxs = Vec::with_capacity(matrix.n_features());

        for index in 0..matrix.n_features() {
            let (min, max) = matrix
                .column_values(index)
                .iter()
                .filter(|v| !v.is_nan())
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
            if min > max {
                // No observed values
                mins.push(0.0);
                maxs.push(0.0);
            } else {
                mins.push(min);
                maxs.push(max);
            }
        }

        Self {
            columns: matrix.columns().to_vec(),
            mins,
            maxs,
        }
    }

    /// Scale a single value of column `index`. Constant columns map to 0.
    pub fn scale(&self, index: usize, value: f64) -> f64 {
        let range = self.maxs[index] - self.mins[index];
        if range == 0.0 {
            0.0
        } else {
            (value - self.mins[index]) / range
        }
    }

    /// Apply the learned ranges. The matrix must carry the fitted columns in
    /// the fitted order.
    pub fn transform(&self, mut matrix: FeatureMatrix) -> PipelineResult<FeatureMatrix> {
        ensure_columns_match(&self.columns, matrix.columns(), matrix.n_rows())?;
        for (index, column) in matrix.values_mut().iter_mut().enumerate() {
            for value in column.iter_mut() {
                *value = self.scale(index, *value);
            }
        }
        Ok(matrix)
    }

    pub fn fit_transform(matrix: FeatureMatrix) -> PipelineResult<(Self, FeatureMatrix)> {
        let scaler = Self::fit(&matrix);
        let scaled = scaler.transform(matrix)?;
        Ok((scaler, scaled))
    }
}

/// Scale both partitions with the chosen strategy. Returns the scaler fit on
/// training data when the strategy reuses it.
pub fn normalize_partitions(
    train: FeatureMatrix,
    test: FeatureMatrix,
    strategy: ScalingStrategy,
) -> PipelineResult<(FeatureMatrix, FeatureMatrix, Option<MinMaxScaler>)> {
    train.ensure_same_columns(&test)?;

    let result = match strategy {
        ScalingStrategy::PerPartition => {
            let (_, train) = MinMaxScaler::fit_transform(train)?;
            let (_, test) = MinMaxScaler::fit_transform(test)?;
            (train, test, None)
        }
        ScalingStrategy::FitOnTrain => {
            let (scaler, train) = MinMaxScaler::fit_transform(train)?;
            let test = scaler.transform(test)?;
            (train, test, Some(scaler))
        }
    };

    tracing::debug!(%strategy, "Normalized partitions");
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix(columns: Vec<Vec<f64>>) -> FeatureMatrix {
        let rows = columns[0].len();
        let names = (0..columns.len()).map(|i| format!("c{}", i)).collect();
        FeatureMatrix::new(names, columns, vec![0; rows]).unwrap()
    }

    #[test]
    fn test_scaled_columns_span_unit_interval() {
        let m = matrix(vec![vec![5.0, 10.0, 7.5], vec![-2.0, 0.0, 2.0]]);
        let (_, scaled) = MinMaxScaler::fit_transform(m).unwrap();

        assert_eq!(scaled.column_values(0), &[0.0, 1.0, 0.5]);
        assert_eq!(scaled.column_values(1), &[0.0, 0.5, 1.0]);
    }

    #[test]
    fn test_constant_column_maps_to_zero() {
        let m = matrix(vec![vec![3.0, 3.0, 3.0]]);
        let (scaler, scaled) = MinMaxScaler::fit_transform(m).unwrap();

        assert_eq!(scaler.mins[0], scaler.maxs[0]);
        assert!(scaled.column_values(0).iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_fit_on_train_reuses_ranges() {
        let train = matrix(vec![vec![0.0, 10.0]]);
        let test = matrix(vec![vec![5.0, 20.0]]);

        let (_, test_scaled, scaler) = normalize_partitions(train, test, ScalingStrategy::FitOnTrain).unwrap();
        assert!(scaler.is_some());
        assert_eq!(test_scaled.column_values(0), &[0.5, 2.0]);
    }

    #[test]
    fn test_per_partition_uses_own_ranges() {
        let train = matrix(vec![vec![0.0, 10.0]]);
        let test = matrix(vec![vec![5.0, 20.0]]);

        let (_, test_scaled, scaler) = normalize_partitions(train, test, ScalingStrategy::PerPartition).unwrap();
        assert!(scaler.is_none());
        assert_eq!(test_scaled.column_values(0), &[0.0, 1.0]);
    }

    #[test]
    fn test_strategy_from_str() {
        assert_eq!("fit-on-train".parse::<ScalingStrategy>().unwrap(), ScalingStrategy::FitOnTrain);
        assert_eq!("per-partition".parse::<ScalingStrategy>().unwrap(), ScalingStrategy::PerPartition);
        assert!("global".parse::<ScalingStrategy>().is_err());
    }
}
