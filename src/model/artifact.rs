//! Persisted model: the fitted classifier plus what is needed to score new data

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::config::PipelineConfig;
use crate::model::naive_bayes::GaussianNaiveBayes;
use crate::pipeline::scaling::MinMaxScaler;

/// Serialized to JSON by `train`, read back by `predict`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    /// Crate version that wrote the artifact
    pub version: String,
    /// Feature names in the order the model expects
    pub feature_names: Vec<String>,
    pub config: PipelineConfig,
    pub model: GaussianNaiveBayes,
    /// Training ranges, present only for the fit-on-train strategy
    pub scaler: Option<MinMaxScaler>,
}

impl ModelArtifact {
    pub fn new(model: GaussianNaiveBayes, config: PipelineConfig, scaler: Option<MinMaxScaler>) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            feature_names: model.features().to_vec(),
            config,
            model,
            scaler,
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create model file: {}", path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)
            .with_context(|| format!("Failed to write model to {}", path.display()))?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open model file: {}", path.display()))?;
        let artifact: Self = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to parse model file: {}", path.display()))?;
        Ok(artifact)
    }
}
