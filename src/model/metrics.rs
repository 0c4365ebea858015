//! Classification metrics with explicit undefined results

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, PipelineResult};
use crate::model::naive_bayes::GaussianNaiveBayes;
use crate::pipeline::matrix::FeatureMatrix;

/// A ratio metric that may have a zero denominator
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Computed(f64),
    Undefined,
}

impl Metric {
    fn ratio(numerator: usize, denominator: usize) -> Self {
        if denominator == 0 {
            Metric::Undefined
        } else {
            Metric::Computed(numerator as f64 / denominator as f64)
        }
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            Metric::Computed(v) => Some(*v),
            Metric::Undefined => None,
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Metric::Undefined)
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Computed(v) => write!(f, "{:.4}", v),
            Metric::Undefined => write!(f, "undefined"),
        }
    }
}

/// Binary confusion counts with class 1 (default) as the positive class
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub true_positives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
    pub true_negatives: usize,
}

impl ConfusionMatrix {
    /// Count outcomes for paired truth and prediction labels.
    ///
    /// # Errors
    /// `DataQualityViolation` when the slices differ in length.
    pub fn from_labels(truth: &[u8], predicted: &[u8]) -> PipelineResult<Self> {
        ensure_same_length(truth.len(), predicted.len())?;

        let mut matrix = Self::default();
        for (&t, &p) in truth.iter().zip(predicted.iter()) {
            match (t == 1, p == 1) {
                (true, true) => matrix.true_positives += 1,
                (false, true) => matrix.false_positives += 1,
                (true, false) => matrix.false_negatives += 1,
                (false, false) => matrix.true_negatives += 1,
            }
        }
        Ok(matrix)
    }

    /// `[[TP, FN], [FP, TN]]`, rows are actual positive then actual negative
    pub fn as_array(&self) -> [[usize; 2]; 2] {
        [
            [self.true_positives, self.false_negatives],
            [self.false_positives, self.true_negatives],
        ]
    }

    pub fn total(&self) -> usize {
        self.true_positives + self.false_positives + self.false_negatives + self.true_negatives
    }
}

/// Threshold metrics derived from a confusion matrix
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub accuracy: Metric,
    pub precision: Metric,
    pub recall: Metric,
}

impl Metrics {
    pub fn from_confusion(cm: &ConfusionMatrix) -> Self {
        Self {
            accuracy: Metric::ratio(cm.true_positives + cm.true_negatives, cm.total()),
            precision: Metric::ratio(cm.true_positives, cm.true_positives + cm.false_positives),
            recall: Metric::ratio(cm.true_positives, cm.true_positives + cm.false_negatives),
        }
    }
}

/// Area under the ROC curve via the rank-sum statistic.
///
/// Tied scores receive their average rank. Undefined when `truth` holds a
/// single class.
pub fn roc_auc(truth: &[u8], scores: &[f64]) -> PipelineResult<Metric> {
    ensure_same_length(truth.len(), scores.len())?;

    let positives = truth.iter().filter(|&&t| t == 1).count();
    let negatives = truth.len() - positives;
    if positives == 0 || negatives == 0 {
        return Ok(Metric::Undefined);
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    let mut ranks = vec![0.0; scores.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && scores[order[end]] == scores[order[start]] {
            end += 1;
        }
        // ranks are 1-based; ties share the mean of start+1..=end
        let average = (start + 1 + end) as f64 / 2.0;
        for &i in &order[start..end] {
            ranks[i] = average;
        }
        start = end;
    }

    let positive_rank_sum: f64 = truth
        .iter()
        .zip(ranks.iter())
        .filter(|(&t, _)| t == 1)
        .map(|(_, &r)| r)
        .sum();
    let p = positives as f64;
    let u = positive_rank_sum - p * (p + 1.0) / 2.0;

    Ok(Metric::Computed(u / (p * negatives as f64)))
}

/// Everything computed when scoring a model on a labeled partition
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluation {
    pub predictions: Vec<u8>,
    pub probabilities: Vec<f64>,
    pub roc_auc: Metric,
    pub confusion: ConfusionMatrix,
    pub metrics: Metrics,
}

/// Score `model` on `test` and summarize the outcome
pub fn evaluate(model: &GaussianNaiveBayes, test: &FeatureMatrix) -> PipelineResult<Evaluation> {
    let predictions = model.predict(test)?;
    let probabilities = model.predict_probability(test)?;

    let confusion = ConfusionMatrix::from_labels(test.target(), &predictions)?;
    let metrics = Metrics::from_confusion(&confusion);
    let roc_auc = roc_auc(test.target(), &probabilities)?;

    tracing::info!(
        rows = test.n_rows(),
        roc_auc = %roc_auc,
        accuracy = %metrics.accuracy,
        precision = %metrics.precision,
        recall = %metrics.recall,
        "Evaluated model"
    );

    Ok(Evaluation {
        predictions,
        probabilities,
        roc_auc,
        confusion,
        metrics,
    })
}

fn ensure_same_length(truth: usize, other: usize) -> PipelineResult<()> {
    if truth != other {
        return Err(PipelineError::quality(
            "evaluate",
            format!("{} labels paired with {} predictions", truth, other),
            Vec::new(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confusion_is_positive_first() {
        let truth = [1, 1, 0, 0, 1];
        let predicted = [1, 0, 1, 0, 1];
        let cm = ConfusionMatrix::from_labels(&truth, &predicted).unwrap();

        assert_eq!(cm.as_array(), [[2, 1], [1, 1]]);
        assert_eq!(cm.total(), 5);
    }

    #[test]
    fn test_precision_undefined_without_positive_predictions() {
        let cm = ConfusionMatrix::from_labels(&[1, 0, 0], &[0, 0, 0]).unwrap();
        let metrics = Metrics::from_confusion(&cm);

        assert_eq!(metrics.precision, Metric::Undefined);
        assert_eq!(metrics.recall, Metric::Computed(0.0));
        assert_eq!(metrics.accuracy.value(), Some(2.0 / 3.0));
    }

    #[test]
    fn test_recall_undefined_without_actual_positives() {
        let cm = ConfusionMatrix::from_labels(&[0, 0], &[1, 0]).unwrap();
        let metrics = Metrics::from_confusion(&cm);

        assert!(metrics.recall.is_undefined());
        assert_eq!(metrics.precision, Metric::Computed(0.0));
    }

    #[test]
    fn test_accuracy_undefined_on_empty_set() {
        let cm = ConfusionMatrix::from_labels(&[], &[]).unwrap();
        assert!(Metrics::from_confusion(&cm).accuracy.is_undefined());
    }

    #[test]
    fn test_roc_auc_perfect_and_inverted() {
        let truth = [0, 0, 1, 1];
        assert_eq!(roc_auc(&truth, &[0.1, 0.2, 0.8, 0.9]).unwrap(), Metric::Computed(1.0));
        assert_eq!(roc_auc(&truth, &[0.9, 0.8, 0.2, 0.1]).unwrap(), Metric::Computed(0.0));
    }

    #[test]
    fn test_roc_auc_ties_count_half() {
        let truth = [0, 1];
        assert_eq!(roc_auc(&truth, &[0.5, 0.5]).unwrap(), Metric::Computed(0.5));
    }

    #[test]
    fn test_roc_auc_mixed_ordering() {
        // one of four positive/negative pairs is misordered
        let truth = [0, 1, 0, 1];
        let auc = roc_auc(&truth, &[0.1, 0.3, 0.4, 0.8]).unwrap();
        assert_eq!(auc, Metric::Computed(0.75));
    }

    #[test]
    fn test_roc_auc_single_class_is_undefined() {
        assert_eq!(roc_auc(&[1, 1, 1], &[0.2, 0.4, 0.9]).unwrap(), Metric::Undefined);
    }

    #[test]
    fn test_length_mismatch_is_rejected() {
        assert!(ConfusionMatrix::from_labels(&[1, 0], &[1]).is_err());
        assert!(roc_auc(&[1, 0], &[0.3]).is_err());
    }

    #[test]
    fn test_metric_display() {
        assert_eq!(Metric::Computed(0.5).to_string(), "0.5000");
        assert_eq!(Metric::Undefined.to_string(), "undefined");
    }
}
