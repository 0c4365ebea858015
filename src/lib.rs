//! Lorisk: consumer-loan default risk pipeline
//!
//! Labels raw loan records, resolves missing values, derives features,
//! balances and scales the data, and trains a Gaussian Naive Bayes
//! classifier evaluated by ROC AUC and a confusion matrix.

pub mod cli;
pub mod config;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod report;
pub mod utils;

pub use config::PipelineConfig;
pub use error::{PipelineError, PipelineResult};
