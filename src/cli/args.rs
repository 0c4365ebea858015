//! Command-line argument definitions using clap

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::PipelineConfig;
use crate::pipeline::features::{OutlierPolicy, DEFAULT_QUANTILE};
use crate::pipeline::scaling::ScalingStrategy;

/// Default location of the exported data dictionary
pub const DEFAULT_DICTIONARY: &str = "data/raw/LCDataDictionary.csv";

/// Lorisk - Prepare loan data and train a default risk classifier
#[derive(Parser, Debug)]
#[command(name = "lorisk")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Number of rows to use for schema inference (CSV only).
    /// Use 0 for full table scan (very slow for large files).
    #[arg(long, global = true, default_value = "10000")]
    pub infer_schema_length: usize,

    /// Skip the banner and summary tables
    #[arg(short, long, global = true, default_value = "false")]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Label rows and resolve missing values
    Clean {
        /// Raw loan extract (CSV or Parquet)
        input: PathBuf,

        /// Cleaned output file (CSV or Parquet, determined by extension)
        output: PathBuf,

        #[command(flatten)]
        dictionary: DictionaryArgs,
    },

    /// Derive model features from a cleaned file
    Features {
        /// Cleaned input file
        input: PathBuf,

        /// Processed output file
        output: PathBuf,

        #[command(flatten)]
        features: FeatureArgs,
    },

    /// Sample, clean and build features in one run.
    /// Reads INPUT_DIR/loan.csv; writes OUTPUT_DIR/interim and OUTPUT_DIR/processed.
    MakeDataset {
        /// Directory holding loan.csv
        input_dir: PathBuf,

        /// Directory receiving interim/ and processed/
        output_dir: PathBuf,

        /// Rows to sample from the raw extract, 0 for all rows
        n_samples: usize,

        #[command(flatten)]
        dictionary: DictionaryArgs,

        #[command(flatten)]
        features: FeatureArgs,

        /// Seed for row sampling
        #[arg(long, env = "LORISK_SEED", default_value = "10")]
        seed: u64,
    },

    /// Train and evaluate the classifier on a processed file
    Train {
        /// Processed input file with a `target` column
        input: PathBuf,

        /// Model artifact output (JSON)
        model_output: PathBuf,

        /// Write test-set predictions, one label per line
        #[arg(long)]
        predictions: Option<PathBuf>,

        /// Write evaluation metrics as JSON
        #[arg(long)]
        metrics: Option<PathBuf>,

        #[command(flatten)]
        training: TrainingArgs,
    },

    /// Predict labels for a processed file with a saved model
    Predict {
        /// Model artifact written by `train`
        model: PathBuf,

        /// Processed file to score
        data: PathBuf,

        /// Predictions output, one label per line
        output: PathBuf,
    },

    /// Draw a seeded random subset of rows from a CSV file
    Sample {
        /// Number of rows to keep
        #[arg(value_parser = validate_sample_size)]
        n: usize,

        /// Input CSV file
        input: PathBuf,

        /// Output CSV file
        output: PathBuf,

        /// Seed for row sampling
        #[arg(long, env = "LORISK_SEED", default_value = "10")]
        seed: u64,
    },
}

#[derive(Args, Debug, Clone)]
pub struct DictionaryArgs {
    /// Data dictionary CSV with LoanStatNew and Description columns
    #[arg(long, env = "LORISK_DICTIONARY", default_value = DEFAULT_DICTIONARY)]
    pub dictionary: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct FeatureArgs {
    /// Outlier handling for monetary columns.
    /// Options: "clip" (drop rows above a quantile, default) or "log" (ln(v + 1))
    #[arg(long, env = "LORISK_OUTLIER_POLICY", default_value = "clip")]
    pub outlier_policy: OutlierPolicy,

    /// Quantile used by the clip policy (0.0 to 1.0]
    #[arg(long, default_value = "0.99", value_parser = validate_quantile)]
    pub quantile: f64,

    /// Convert raw string columns to typed columns before building features
    #[arg(long, default_value = "false")]
    pub normalize_types: bool,
}

impl FeatureArgs {
    /// Outlier policy with the configured quantile applied
    pub fn policy(&self) -> OutlierPolicy {
        match self.outlier_policy {
            OutlierPolicy::PercentileClip { .. } => OutlierPolicy::PercentileClip {
                quantile: self.quantile,
            },
            OutlierPolicy::LogScale => OutlierPolicy::LogScale,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct TrainingArgs {
    /// Seed for the split and undersampling
    #[arg(long, env = "LORISK_SEED", default_value = "10")]
    pub seed: u64,

    /// Share of rows assigned to training (0.0 to 1.0, exclusive)
    #[arg(long, default_value = "0.9", value_parser = validate_train_fraction)]
    pub train_fraction: f64,

    /// Scaling strategy. Options: "per-partition" (default) or "fit-on-train"
    #[arg(long, env = "LORISK_SCALING", default_value = "per-partition")]
    pub scaling: ScalingStrategy,
}

impl Cli {
    /// Schema inference length as the loader expects it
    pub fn schema_length(&self) -> Option<usize> {
        if self.infer_schema_length == 0 {
            None
        } else {
            Some(self.infer_schema_length)
        }
    }

    /// Pipeline settings for the selected command. Options a command does not
    /// take keep their defaults.
    pub fn pipeline_config(&self) -> PipelineConfig {
        let mut config = PipelineConfig {
            infer_schema_length: self.schema_length(),
            ..Default::default()
        };

        match &self.command {
            Commands::Features { features, .. } => {
                config.outlier_policy = features.policy();
                config.normalize_types = features.normalize_types;
            }
            Commands::MakeDataset { features, seed, .. } => {
                config.outlier_policy = features.policy();
                config.normalize_types = features.normalize_types;
                config.seed = *seed;
            }
            Commands::Train { training, .. } => {
                config.seed = training.seed;
                config.train_fraction = training.train_fraction;
                config.scaling = training.scaling;
            }
            Commands::Sample { seed, .. } => config.seed = *seed,
            Commands::Clean { .. } | Commands::Predict { .. } => {}
        }

        config
    }
}

/// Validator for the clip quantile
fn validate_quantile(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;

    if value > 0.0 && value <= 1.0 {
        Ok(value)
    } else {
        Err(format!("quantile must be in (0.0, 1.0], got {}", value))
    }
}

/// Validator for train_fraction
fn validate_train_fraction(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;

    if value > 0.0 && value < 1.0 {
        Ok(value)
    } else {
        Err(format!("train_fraction must be between 0.0 and 1.0, got {}", value))
    }
}

/// Validator for the sample subcommand row count
fn validate_sample_size(s: &str) -> Result<usize, String> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid row count", s))?;

    if value == 0 {
        Err("sample size must be at least 1".to_string())
    } else {
        Ok(value)
    }
}
