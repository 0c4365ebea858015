//! Gaussian Naive Bayes for the binary default target
//!
//! Each feature is modeled as a normal distribution per class; class priors
//! come from training label frequencies. Variances are smoothed by a small
//! fraction of the largest feature variance so constant features do not
//! produce zero-width likelihoods.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, PipelineResult};
use crate::pipeline::matrix::{ensure_columns_match, FeatureMatrix};

/// Portion of the largest feature variance added to every variance
pub const VAR_SMOOTHING: f64 = 1e-9;

/// Number of classes in the binary target
const N_CLASSES: usize = 2;

/// Fitted class-conditional statistics. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GaussianNaiveBayes {
    features: Vec<String>,
    /// Prior probability of class 0 and class 1
    priors: [f64; N_CLASSES],
    /// `means[class][feature]`
    means: [Vec<f64>; N_CLASSES],
    /// `variances[class][feature]`, smoothing included
    variances: [Vec<f64>; N_CLASSES],
    epsilon: f64,
}

impl GaussianNaiveBayes {
    /// Estimate priors, means and variances from a training matrix.
    ///
    /// # Errors
    /// `DataQualityViolation` when a class is absent or the matrix still has
    /// missing cells.
    pub fn fit(train: &FeatureMatrix) -> PipelineResult<Self> {
        let missing = train.missing_cells();
        if missing > 0 {
            return Err(PipelineError::quality(
                "train",
                format!("{} missing cell(s) in training matrix", missing),
                Vec::new(),
            ));
        }

        let (negatives, positives) = train.class_counts();
        let counts = [negatives, positives];
        if counts.iter().any(|&c| c == 0) {
            return Err(PipelineError::quality(
                "train",
                format!(
                    "both classes required to fit, found {} class-0 and {} class-1 rows",
                    negatives, positives
                ),
                vec!["target".to_string()],
            ));
        }

        let n_features = train.n_features();
        let target = train.target();

        let mut means: [Vec<f64>; N_CLASSES] = [vec![0.0; n_features], vec![0.0; n_features]];
        let mut variances: [Vec<f64>; N_CLASSES] = [vec![0.0; n_features], vec![0.0; n_features]];
        let mut max_variance: f64 = 0.0;

        for feature in 0..n_features {
            let values = train.column_values(feature);
            max_variance = max_variance.max(population_variance(values));

            for class in 0..N_CLASSES {
                let class_values: Vec<f64> = values
                    .iter()
                    .zip(target.iter())
                    .filter(|(_, &t)| t as usize == class)
                    .map(|(&v, _)| v)
                    .collect();
                means[class][feature] = mean(&class_values);
                variances[class][feature] = population_variance(&class_values);
            }
        }

        // Floor keeps variances positive when every feature is constant
        let epsilon = (VAR_SMOOTHING * max_variance).max(f64::EPSILON);
        for class_variances in variances.iter_mut() {
            for v in class_variances.iter_mut() {
                *v += epsilon;
            }
        }

        let total = train.n_rows() as f64;
        let model = Self {
            features: train.columns().to_vec(),
            priors: [negatives as f64 / total, positives as f64 / total],
            means,
            variances,
            epsilon,
        };

        tracing::info!(
            rows = train.n_rows(),
            features = n_features,
            prior_default = model.priors[1],
            "Fitted Gaussian Naive Bayes"
        );

        Ok(model)
    }

    pub fn features(&self) -> &[String] {
        &self.features
    }

    pub fn priors(&self) -> [f64; N_CLASSES] {
        self.priors
    }

    /// Mean of `feature` under `class`
    pub fn mean(&self, class: usize, feature: usize) -> f64 {
        self.means[class][feature]
    }

    /// Smoothed variance of `feature` under `class`
    pub fn variance(&self, class: usize, feature: usize) -> f64 {
        self.variances[class][feature]
    }

    /// Joint log likelihood `log P(c) + sum log N(x | mean, var)` per class
    fn joint_log_likelihood(&self, row: &[f64]) -> [f64; N_CLASSES] {
        let mut jll = [0.0; N_CLASSES];
        for (class, out) in jll.iter_mut().enumerate() {
            let mut log_prob = self.priors[class].ln();
            for (feature, &x) in row.iter().enumerate() {
                let var = self.variances[class][feature];
                let diff = x - self.means[class][feature];
                log_prob -= 0.5 * (2.0 * PI * var).ln();
                log_prob -= 0.5 * diff * diff / var;
            }
            *out = log_prob;
        }
        jll
    }

    /// Probability of class 1 for one row
    pub fn probability_row(&self, row: &[f64]) -> f64 {
        let [jll0, jll1] = self.joint_log_likelihood(row);
        let max = jll0.max(jll1);
        let log_norm = max + ((jll0 - max).exp() + (jll1 - max).exp()).ln();
        (jll1 - log_norm).exp()
    }

    /// Predicted class for one row; ties go to class 0
    pub fn predict_row(&self, row: &[f64]) -> u8 {
        let [jll0, jll1] = self.joint_log_likelihood(row);
        u8::from(jll1 > jll0)
    }

    /// Class-1 probability for every row of `matrix`
    pub fn predict_probability(&self, matrix: &FeatureMatrix) -> PipelineResult<Vec<f64>> {
        ensure_columns_match(&self.features, matrix.columns(), matrix.n_rows())?;
        Ok((0..matrix.n_rows())
            .map(|i| self.probability_row(&matrix.row(i)))
            .collect())
    }

    /// Predicted class for every row of `matrix`
    pub fn predict(&self, matrix: &FeatureMatrix) -> PipelineResult<Vec<u8>> {
        ensure_columns_match(&self.features, matrix.columns(), matrix.n_rows())?;
        Ok((0..matrix.n_rows())
            .map(|i| self.predict_row(&matrix.row(i)))
            .collect())
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn population_variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn separable() -> FeatureMatrix {
        FeatureMatrix::new(
            vec!["a".into(), "b".into()],
            vec![
                vec![0.0, 0.1, 0.2, 0.8, 0.9, 1.0],
                vec![0.1, 0.0, 0.2, 0.9, 1.0, 0.8],
            ],
            vec![0, 0, 0, 1, 1, 1],
        )
        .unwrap()
    }

    #[test]
    fn test_fit_estimates_priors_and_means() {
        let model = GaussianNaiveBayes::fit(&separable()).unwrap();
        assert_eq!(model.priors(), [0.5, 0.5]);
        assert!((model.mean(0, 0) - 0.1).abs() < 1e-12);
        assert!((model.mean(1, 0) - 0.9).abs() < 1e-12);
        assert!(model.variance(0, 0) > 0.0);
    }

    #[test]
    fn test_predicts_training_clusters() {
        let train = separable();
        let model = GaussianNaiveBayes::fit(&train).unwrap();
        assert_eq!(model.predict(&train).unwrap(), vec![0, 0, 0, 1, 1, 1]);

        let probabilities = model.predict_probability(&train).unwrap();
        assert!(probabilities.iter().all(|p| (0.0..=1.0).contains(p)));
        assert!(probabilities[0] < 0.5);
        assert!(probabilities[5] > 0.5);
    }

    #[test]
    fn test_constant_feature_does_not_break_fit() {
        let train = FeatureMatrix::new(
            vec!["a".into(), "constant".into()],
            vec![vec![0.0, 0.1, 0.9, 1.0], vec![0.0, 0.0, 0.0, 0.0]],
            vec![0, 0, 1, 1],
        )
        .unwrap();

        let model = GaussianNaiveBayes::fit(&train).unwrap();
        let probabilities = model.predict_probability(&train).unwrap();
        assert!(probabilities.iter().all(|p| p.is_finite()));
    }

    #[test]
    fn test_all_constant_features_give_prior_probability() {
        let train = FeatureMatrix::new(
            vec!["a".into(), "b".into()],
            vec![vec![0.0; 4], vec![1.0; 4]],
            vec![0, 1, 0, 1],
        )
        .unwrap();

        let model = GaussianNaiveBayes::fit(&train).unwrap();
        assert!(model.variance(0, 0) > 0.0);

        let probabilities = model.predict_probability(&train).unwrap();
        assert!(probabilities.iter().all(|p| (p - 0.5).abs() < 1e-12));
    }

    #[test]
    fn test_single_class_is_rejected() {
        let train = FeatureMatrix::new(vec!["a".into()], vec![vec![0.0, 1.0]], vec![1, 1]).unwrap();
        let err = GaussianNaiveBayes::fit(&train).unwrap_err();
        assert!(err.is_data_quality_violation());
    }

    #[test]
    fn test_predict_rejects_different_columns() {
        let model = GaussianNaiveBayes::fit(&separable()).unwrap();
        let other = FeatureMatrix::new(vec!["a".into()], vec![vec![0.0]], vec![0]).unwrap();
        assert!(model.predict(&other).unwrap_err().is_schema_violation());
    }
}
