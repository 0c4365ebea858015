//! Evaluation metrics export

use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;

use crate::config::PipelineConfig;
use crate::model::{ConfusionMatrix, Evaluation, Metric};
use crate::pipeline::split::SplitReport;

/// Metadata about the training run
#[derive(Serialize)]
pub struct RunMetadata {
    /// Timestamp of the run (ISO 8601 format)
    pub timestamp: String,
    /// Lorisk version
    pub lorisk_version: String,
    /// Processed input file
    pub input_file: String,
    /// Settings the model was trained with
    pub config: PipelineConfig,
}

/// Scores on the held-out partition
#[derive(Serialize)]
pub struct EvaluationScores {
    pub roc_auc: Metric,
    pub accuracy: Metric,
    pub precision: Metric,
    pub recall: Metric,
    /// `[[TP, FN], [FP, TN]]`
    pub confusion_matrix: [[usize; 2]; 2],
    pub confusion: ConfusionMatrix,
}

/// Complete metrics export
#[derive(Serialize)]
pub struct MetricsExport {
    pub metadata: RunMetadata,
    pub split: SplitReport,
    pub scores: EvaluationScores,
}

impl MetricsExport {
    pub fn new(input_file: &str, config: &PipelineConfig, split: &SplitReport, evaluation: &Evaluation) -> Self {
        Self {
            metadata: RunMetadata {
                timestamp: Utc::now().to_rfc3339(),
                lorisk_version: env!("CARGO_PKG_VERSION").to_string(),
                input_file: input_file.to_string(),
                config: config.clone(),
            },
            split: *split,
            scores: EvaluationScores {
                roc_auc: evaluation.roc_auc,
                accuracy: evaluation.metrics.accuracy,
                precision: evaluation.metrics.precision,
                recall: evaluation.metrics.recall,
                confusion_matrix: evaluation.confusion.as_array(),
                confusion: evaluation.confusion,
            },
        }
    }
}

/// Write evaluation results to a JSON file
///
/// # Arguments
/// * `export` - Assembled metrics and run metadata
/// * `output_path` - Path to write the JSON file
pub fn export_metrics(export: &MetricsExport, output_path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(export).context("Failed to serialize metrics to JSON")?;

    std::fs::write(output_path, json)
        .with_context(|| format!("Failed to write metrics to {}", output_path.display()))?;

    Ok(())
}
