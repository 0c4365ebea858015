//! Target derivation from loan status
//!
//! Loans are labeled by their terminal status. Active loans ("Current",
//! "In Grace Period", ...) have no known outcome yet and are removed from the
//! labeled population.

use polars::prelude::*;
use serde::Serialize;

use crate::error::{PipelineError, PipelineResult};
use crate::pipeline::columns::{filter_rows, has_column, string_values};

/// Raw status column consumed by the labeler
pub const STATUS_COLUMN: &str = "loan_status";
/// Binary outcome column produced by the labeler
pub const TARGET_COLUMN: &str = "target";

/// Statuses that count as a default (target = 1)
pub const DEFAULT_STATUSES: [&str; 4] = [
    "Charged Off",
    "Default",
    "Does not meet the credit policy. Status:Charged Off",
    "Late (31-120 days)",
];

/// Statuses that count as a repaid loan (target = 0)
pub const NON_DEFAULT_STATUSES: [&str; 2] = [
    "Fully Paid",
    "Does not meet the credit policy. Status:Fully Paid",
];

/// Classification of a single loan status value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Default,
    NonDefault,
    /// Outcome not yet known; row is discarded
    Unlabeled,
}

impl StatusClass {
    pub fn target(self) -> Option<bool> {
        match self {
            StatusClass::Default => Some(true),
            StatusClass::NonDefault => Some(false),
            StatusClass::Unlabeled => None,
        }
    }
}

/// Classify a raw status value. Matching is exact.
pub fn classify_status(status: Option<&str>) -> StatusClass {
    match status {
        Some(s) if DEFAULT_STATUSES.contains(&s) => StatusClass::Default,
        Some(s) if NON_DEFAULT_STATUSES.contains(&s) => StatusClass::NonDefault,
        _ => StatusClass::Unlabeled,
    }
}

/// Row and class counts produced by the labeler
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LabelSummary {
    pub rows_before: usize,
    pub rows_after: usize,
    pub defaults: usize,
    pub non_defaults: usize,
}

impl LabelSummary {
    /// Rows removed because their status has no terminal outcome
    pub fn discarded(&self) -> usize {
        self.rows_before - self.rows_after
    }
}

/// Derive the boolean `target` column, keep only labeled rows and drop the
/// status column.
///
/// # Errors
/// `SchemaViolation` when `loan_status` is absent.
pub fn add_target_variable(df: DataFrame) -> PipelineResult<(DataFrame, LabelSummary)> {
    if !has_column(&df, STATUS_COLUMN) {
        return Err(PipelineError::schema(
            "target",
            vec![STATUS_COLUMN.to_string()],
            df.height(),
        ));
    }

    let rows_before = df.height();
    let classes: Vec<StatusClass> = string_values(&df, STATUS_COLUMN)?
        .iter()
        .map(|s| classify_status(s.as_deref()))
        .collect();

    let keep: Vec<bool> = classes.iter().map(|c| c.target().is_some()).collect();
    let targets: Vec<bool> = classes.iter().filter_map(|c| c.target()).collect();

    let mut labeled = filter_rows(&df, &keep)?.drop(STATUS_COLUMN)?;
    labeled.with_column(Series::new(TARGET_COLUMN.into(), &targets))?;

    let defaults = targets.iter().filter(|&&t| t).count();
    let summary = LabelSummary {
        rows_before,
        rows_after: labeled.height(),
        defaults,
        non_defaults: targets.len() - defaults,
    };

    tracing::info!(
        rows_before = summary.rows_before,
        rows_after = summary.rows_after,
        discarded = summary.discarded(),
        defaults = summary.defaults,
        non_defaults = summary.non_defaults,
        "Added target column"
    );

    Ok((labeled, summary))
}

/// Count `(defaults, non_defaults)` in an already labeled frame
pub fn count_targets(df: &DataFrame) -> PipelineResult<(usize, usize)> {
    if !has_column(df, TARGET_COLUMN) {
        return Err(PipelineError::schema(
            "target",
            vec![TARGET_COLUMN.to_string()],
            df.height(),
        ));
    }

    let cast = df.column(TARGET_COLUMN)?.cast(&DataType::Boolean)?;
    let mut defaults = 0;
    let mut non_defaults = 0;
    for value in cast.bool()?.into_iter().flatten() {
        if value {
            defaults += 1;
        } else {
            non_defaults += 1;
        }
    }
    Ok((defaults, non_defaults))
}
