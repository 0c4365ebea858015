//! Classifier training, scoring and persistence

pub mod artifact;
pub mod metrics;
pub mod naive_bayes;

pub use artifact::ModelArtifact;
pub use metrics::{evaluate, roc_auc, ConfusionMatrix, Evaluation, Metric, Metrics};
pub use naive_bayes::GaussianNaiveBayes;
