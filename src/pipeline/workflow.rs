//! End-to-end stage composition
//!
//! The in-memory functions (`clean_dataset`, `build_features`, `train_model`,
//! `predict_labels`) chain the stages on frames. The `*_file` wrappers and
//! `make_dataset` add the file layout used by the command line.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use polars::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;

use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::model::{evaluate, Evaluation, GaussianNaiveBayes, ModelArtifact};
use crate::pipeline::dictionary::{load_dictionary, SchemaDictionary};
use crate::pipeline::dtypes::normalize_types;
use crate::pipeline::features::{add_features, FeatureReport};
use crate::pipeline::loader::{load_dataset, save_dataset, write_predictions};
use crate::pipeline::matrix::{ensure_columns_match, feature_frame, frame_to_columns, FeatureMatrix};
use crate::pipeline::missing::{resolve_missing_values, MissingReport};
use crate::pipeline::sampling::sample_file;
use crate::pipeline::scaling::{normalize_partitions, MinMaxScaler, ScalingStrategy};
use crate::pipeline::split::{split_and_rebalance, SplitReport};
use crate::pipeline::target::{add_target_variable, LabelSummary, TARGET_COLUMN};

/// Raw extract name inside the `make-dataset` input directory
pub const RAW_FILE_STEM: &str = "loan";

/// Outcome of labeling plus missing value resolution
#[derive(Debug, Clone, Serialize)]
pub struct CleaningReport {
    pub labels: LabelSummary,
    pub missing: MissingReport,
}

/// Label rows and resolve every missing value
pub fn clean_dataset(df: DataFrame, dictionary: &SchemaDictionary) -> PipelineResult<(DataFrame, CleaningReport)> {
    let (df, labels) = add_target_variable(df)?;
    let (df, missing) = resolve_missing_values(df, dictionary)?;
    Ok((df, CleaningReport { labels, missing }))
}

/// Optionally normalize types, then derive the model features
pub fn build_features(df: DataFrame, config: &PipelineConfig) -> PipelineResult<(DataFrame, FeatureReport)> {
    let df = if config.normalize_types {
        normalize_types(df)?
    } else {
        df
    };
    add_features(df, config.outlier_policy)
}

/// Everything produced by one training run
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub artifact: ModelArtifact,
    pub evaluation: Evaluation,
    pub split: SplitReport,
}

/// Split, balance, scale, fit and score a processed frame
pub fn train_model(df: &DataFrame, config: &PipelineConfig) -> PipelineResult<TrainingOutcome> {
    let matrix = FeatureMatrix::from_dataframe(df, TARGET_COLUMN)?;
    let mut rng = StdRng::seed_from_u64(config.seed);

    let (split, split_report) = split_and_rebalance(&matrix, config.train_fraction, &mut rng)?;
    let (train, test, scaler) = normalize_partitions(split.train, split.test, config.scaling)?;

    let model = GaussianNaiveBayes::fit(&train)?;
    let evaluation = evaluate(&model, &test)?;

    Ok(TrainingOutcome {
        artifact: ModelArtifact::new(model, config.clone(), scaler),
        evaluation,
        split: split_report,
    })
}

/// Predict labels for a processed frame. A `target` column, if present, is
/// ignored.
pub fn predict_labels(artifact: &ModelArtifact, df: &DataFrame) -> PipelineResult<Vec<u8>> {
    let features = feature_frame(df, Some(TARGET_COLUMN))?;
    let (columns, values) = frame_to_columns(&features)?;
    ensure_columns_match(&artifact.feature_names, &columns, df.height())?;

    let mut matrix = FeatureMatrix::new(columns, values, vec![0; df.height()])?;
    matrix.fill_missing_with_zero();

    let scaled = match (artifact.config.scaling, &artifact.scaler) {
        (ScalingStrategy::PerPartition, _) => MinMaxScaler::fit_transform(matrix)?.1,
        (ScalingStrategy::FitOnTrain, Some(scaler)) => scaler.transform(matrix)?,
        (ScalingStrategy::FitOnTrain, None) => {
            return Err(PipelineError::quality(
                "predict",
                "model was trained with fit-on-train scaling but carries no scaler",
                Vec::new(),
            ))
        }
    };

    artifact.model.predict(&scaled)
}

/// Clean `input` into `output`
pub fn clean_file(
    input: &Path,
    output: &Path,
    dictionary_path: &Path,
    config: &PipelineConfig,
) -> Result<CleaningReport> {
    let dictionary = load_dictionary(dictionary_path)?;
    let df = load_dataset(input, config.infer_schema_length)?;
    let (mut cleaned, report) = clean_dataset(df, &dictionary)
        .with_context(|| format!("Failed to clean {}", input.display()))?;
    save_dataset(&mut cleaned, output)?;
    Ok(report)
}

/// Build features from a cleaned file into `output`
pub fn features_file(input: &Path, output: &Path, config: &PipelineConfig) -> Result<FeatureReport> {
    let df = load_dataset(input, config.infer_schema_length)?;
    let (mut processed, report) = build_features(df, config)
        .with_context(|| format!("Failed to build features from {}", input.display()))?;
    save_dataset(&mut processed, output)?;
    Ok(report)
}

/// Train on a processed file, save the model and optionally the test-set
/// predictions
pub fn train_file(
    input: &Path,
    model_output: &Path,
    predictions_output: Option<&Path>,
    config: &PipelineConfig,
) -> Result<TrainingOutcome> {
    let df = load_dataset(input, config.infer_schema_length)?;
    let outcome = train_model(&df, config)
        .with_context(|| format!("Failed to train on {}", input.display()))?;

    outcome.artifact.save(model_output)?;
    if let Some(path) = predictions_output {
        write_predictions(&outcome.evaluation.predictions, path)?;
    }
    Ok(outcome)
}

/// Score a processed file with a saved model. Returns the number of rows
/// predicted.
pub fn predict_file(model_path: &Path, data: &Path, output: &Path) -> Result<usize> {
    let artifact = ModelArtifact::load(model_path)?;
    let df = load_dataset(data, artifact.config.infer_schema_length)?;
    let predictions = predict_labels(&artifact, &df)
        .with_context(|| format!("Failed to predict {}", data.display()))?;
    write_predictions(&predictions, output)?;

    tracing::info!(
        rows = predictions.len(),
        output = %output.display(),
        "Saved predictions"
    );
    Ok(predictions.len())
}

/// Files written by [`make_dataset`]
#[derive(Debug, Clone)]
pub struct DatasetPaths {
    pub sampled: Option<PathBuf>,
    pub cleaned: PathBuf,
    pub processed: PathBuf,
}

impl DatasetPaths {
    /// Layout under `output_dir` for a run sampling `n_samples` rows, `0`
    /// meaning the full extract
    pub fn new(output_dir: &Path, n_samples: usize) -> Self {
        let name = if n_samples > 0 {
            format!("{}_sampled_{}", RAW_FILE_STEM, n_samples)
        } else {
            RAW_FILE_STEM.to_string()
        };
        let interim = output_dir.join("interim");
        Self {
            sampled: (n_samples > 0).then(|| interim.join(format!("{}.csv", name))),
            cleaned: interim.join(format!("{}-cleaned.csv", name)),
            processed: output_dir.join("processed").join(format!("{}.csv", name)),
        }
    }
}

/// Reports gathered by [`make_dataset`]
#[derive(Debug, Clone)]
pub struct DatasetOutcome {
    pub paths: DatasetPaths,
    pub cleaning: CleaningReport,
    pub features: FeatureReport,
}

/// Sample (when `n_samples > 0`), clean and build features from
/// `input_dir/loan.csv`
pub fn make_dataset(
    input_dir: &Path,
    output_dir: &Path,
    n_samples: usize,
    dictionary_path: &Path,
    config: &PipelineConfig,
) -> Result<DatasetOutcome> {
    let raw = input_dir.join(format!("{}.csv", RAW_FILE_STEM));
    let paths = DatasetPaths::new(output_dir, n_samples);

    let clean_input = match &paths.sampled {
        Some(sampled) => {
            let mut rng = StdRng::seed_from_u64(config.seed);
            sample_file(&raw, sampled, n_samples, config.infer_schema_length, &mut rng)?;
            sampled.clone()
        }
        None => raw,
    };

    tracing::info!(input = %clean_input.display(), output = %paths.cleaned.display(), "Cleaning");
    let cleaning = clean_file(&clean_input, &paths.cleaned, dictionary_path, config)?;

    tracing::info!(input = %paths.cleaned.display(), output = %paths.processed.display(), "Building features");
    let features = features_file(&paths.cleaned, &paths.processed, config)?;

    Ok(DatasetOutcome {
        paths,
        cleaning,
        features,
    })
}
