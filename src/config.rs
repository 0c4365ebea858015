//! Run configuration shared by the CLI, the model artifact and the metrics export

use serde::{Deserialize, Serialize};

use crate::pipeline::features::OutlierPolicy;
use crate::pipeline::scaling::ScalingStrategy;
use crate::pipeline::split::{DEFAULT_SEED, DEFAULT_TRAIN_FRACTION};

/// Rows polars inspects to infer CSV column types
pub const DEFAULT_INFER_SCHEMA_LENGTH: usize = 10_000;

/// Settings that change pipeline output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Seed for the split and undersampling generator
    pub seed: u64,
    /// Share of rows assigned to the training partition
    pub train_fraction: f64,
    pub outlier_policy: OutlierPolicy,
    pub scaling: ScalingStrategy,
    /// Run the type normalizer between cleaning and feature building
    pub normalize_types: bool,
    /// `None` scans the full file before fixing types
    pub infer_schema_length: Option<usize>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            train_fraction: DEFAULT_TRAIN_FRACTION,
            outlier_policy: OutlierPolicy::default(),
            scaling: ScalingStrategy::default(),
            normalize_types: false,
            infer_schema_length: Some(DEFAULT_INFER_SCHEMA_LENGTH),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_historical_run() {
        let config = PipelineConfig::default();
        assert_eq!(config.seed, 10);
        assert_eq!(config.train_fraction, 0.9);
        assert_eq!(config.scaling, ScalingStrategy::PerPartition);
        assert!(!config.normalize_types);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: PipelineConfig = serde_json::from_str(r#"{"seed": 3, "scaling": "fit-on-train"}"#).unwrap();
        assert_eq!(config.seed, 3);
        assert_eq!(config.scaling, ScalingStrategy::FitOnTrain);
        assert_eq!(config.train_fraction, DEFAULT_TRAIN_FRACTION);
    }
}
