//! Feature engineering and outlier handling
//!
//! Two alternative outlier policies exist and exactly one runs per call:
//! percentile clipping removes rows above a per-column quantile, log scaling
//! compresses the same columns with `ln(v + 1)` and keeps every row.

use std::fmt;
use std::str::FromStr;

use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, PipelineResult};
use crate::pipeline::columns::{
    drop_present, filter_rows, float_values, is_model_ready, require_columns, string_values,
};

/// Monetary and balance fields with heavy right tails
pub const OUTLIER_COLUMNS: [&str; 13] = [
    "annual_inc",
    "revol_bal",
    "tot_cur_bal",
    "total_bal_il",
    "max_bal_bc",
    "total_rev_hi_lim",
    "avg_cur_bal",
    "bc_open_to_buy",
    "delinq_amnt",
    "tot_hi_cred_lim",
    "total_bal_ex_mort",
    "total_bc_limit",
    "total_il_high_credit_limit",
];

pub const GRADE_COLUMN: &str = "grade";
pub const VERIFICATION_COLUMN: &str = "verification_status";
pub const LOAN_AMOUNT_COLUMN: &str = "loan_amnt";
pub const ANNUAL_INCOME_COLUMN: &str = "annual_inc";
pub const RATIO_COLUMN: &str = "loan_income_ratio";
pub const GRADE_ORDINAL_COLUMN: &str = "grade_ordinal";

/// Categorical sources that are redundant once encoded
pub const REDUNDANT_COLUMNS: [&str; 9] = [
    "grade",
    "sub_grade",
    "home_ownership",
    "verification_status",
    "purpose",
    "addr_state",
    "issue_d",
    "earliest_cr_line",
    "is_36_month_term",
];

pub const DEFAULT_QUANTILE: f64 = 0.99;

/// How heavy-tailed monetary columns are tamed
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutlierPolicy {
    /// Drop rows above the given quantile, one column at a time
    PercentileClip { quantile: f64 },
    /// Replace each value by `ln(v + 1)`; inputs must be non-negative
    LogScale,
}

impl Default for OutlierPolicy {
    fn default() -> Self {
        OutlierPolicy::PercentileClip {
            quantile: DEFAULT_QUANTILE,
        }
    }
}

impl fmt::Display for OutlierPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutlierPolicy::PercentileClip { quantile } => write!(f, "clip (q={})", quantile),
            OutlierPolicy::LogScale => write!(f, "log"),
        }
    }
}

impl FromStr for OutlierPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "clip" | "percentile" | "percentile-clip" => Ok(OutlierPolicy::default()),
            "log" | "log-scale" => Ok(OutlierPolicy::LogScale),
            other => Err(format!(
                "Invalid outlier policy '{}'. Options: clip, log",
                other
            )),
        }
    }
}

/// Result of a division whose denominator may be zero
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Ratio {
    Computed(f64),
    Undefined,
}

impl Ratio {
    pub fn of(numerator: f64, denominator: f64) -> Self {
        if denominator == 0.0 || !numerator.is_finite() || !denominator.is_finite() {
            Ratio::Undefined
        } else {
            Ratio::Computed(numerator / denominator)
        }
    }

    pub fn value(self) -> Option<f64> {
        match self {
            Ratio::Computed(v) => Some(v),
            Ratio::Undefined => None,
        }
    }
}

/// Counts describing one feature transformation run
#[derive(Debug, Clone, Default, Serialize)]
pub struct FeatureReport {
    pub rows_before: usize,
    pub rows_after: usize,
    /// `(column, quantile value, rows removed)` for percentile clipping
    pub clipped: Vec<(String, f64, usize)>,
    pub undefined_ratios: usize,
    pub dropped: Vec<String>,
}

/// Linear-interpolated quantile of the non-missing values, `None` when empty
pub fn quantile(values: &[Option<f64>], q: f64) -> Option<f64> {
    let mut sorted: Vec<f64> = values
        .iter()
        .filter_map(|v| *v)
        .filter(|v| !v.is_nan())
        .collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let position = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

/// Grade letter to ordinal: A=1 .. G=7
pub fn grade_ordinal(grade: &str) -> Option<i32> {
    match grade.trim() {
        "A" => Some(1),
        "B" => Some(2),
        "C" => Some(3),
        "D" => Some(4),
        "E" => Some(5),
        "F" => Some(6),
        "G" => Some(7),
        _ => None,
    }
}

/// Derive engineered features, handle outliers and drop categorical sources.
///
/// # Errors
/// * `SchemaViolation` when a required source column is absent
/// * `DataQualityViolation` when log scaling meets a negative value, or when a
///   non-numeric column survives
pub fn add_features(mut df: DataFrame, policy: OutlierPolicy) -> PipelineResult<(DataFrame, FeatureReport)> {
    let mut required: Vec<&str> = OUTLIER_COLUMNS.to_vec();
    required.extend([LOAN_AMOUNT_COLUMN, GRADE_COLUMN, VERIFICATION_COLUMN]);
    require_columns(&df, "features", &required)?;

    let mut report = FeatureReport {
        rows_before: df.height(),
        ..Default::default()
    };

    // Ratio of raw amounts, before log scaling rewrites them
    add_income_ratio(&mut df)?;

    let mut df = match policy {
        OutlierPolicy::PercentileClip { quantile } => clip_percentiles(df, quantile, &mut report)?,
        OutlierPolicy::LogScale => {
            let mut df = log_scale(df)?;
            add_grade_ordinal(&mut df)?;
            df
        }
    };

    add_grade_flags(&mut df)?;
    add_verification_flag(&mut df)?;
    report.undefined_ratios = df.column(RATIO_COLUMN)?.null_count();

    let redundant: Vec<String> = REDUNDANT_COLUMNS.iter().map(|s| s.to_string()).collect();
    let (df, mut dropped) = drop_present(df, &redundant);

    // Anything still textual has no encoding in this pipeline
    let unencoded: Vec<String> = df
        .get_columns()
        .iter()
        .filter(|c| !is_model_ready(c.dtype()))
        .map(|c| c.name().to_string())
        .collect();
    for name in &unencoded {
        tracing::debug!(column = %name, "Dropping unencoded non-numeric column");
    }
    let (df, unencoded) = drop_present(df, &unencoded);
    dropped.extend(unencoded);
    report.dropped = dropped;

    validate_model_ready(&df)?;
    report.rows_after = df.height();

    tracing::info!(
        %policy,
        rows_before = report.rows_before,
        rows_after = report.rows_after,
        undefined_ratios = report.undefined_ratios,
        columns = df.width(),
        "Built features"
    );

    Ok((df, report))
}

/// Remove rows above the quantile, recomputing it per column on the rows
/// that survived the previous columns. Missing values never pass the check.
fn clip_percentiles(mut df: DataFrame, q: f64, report: &mut FeatureReport) -> PipelineResult<DataFrame> {
    for name in OUTLIER_COLUMNS {
        let values = float_values(&df, name)?;
        let Some(limit) = quantile(&values, q) else {
            continue;
        };
        let keep: Vec<bool> = values.iter().map(|v| matches!(v, Some(x) if *x <= limit)).collect();
        let before = df.height();
        df = filter_rows(&df, &keep)?;
        report.clipped.push((name.to_string(), limit, before - df.height()));
    }
    Ok(df)
}

/// `ln(v + 1)` for every outlier column. Nulls stay null.
fn log_scale(mut df: DataFrame) -> PipelineResult<DataFrame> {
    for name in OUTLIER_COLUMNS {
        let values = float_values(&df, name)?;
        let negatives = values.iter().filter(|v| matches!(v, Some(x) if *x < 0.0)).count();
        if negatives > 0 {
            return Err(PipelineError::quality(
                "features",
                format!(
                    "{} negative value(s) in '{}' out of {} rows; log scaling requires non-negative input",
                    negatives,
                    name,
                    df.height()
                ),
                vec![name.to_string()],
            ));
        }
        let scaled: Vec<Option<f64>> = values.iter().map(|v| v.map(f64::ln_1p)).collect();
        df.with_column(Series::new(name.into(), scaled))?;
    }
    Ok(df)
}

fn add_grade_ordinal(df: &mut DataFrame) -> PipelineResult<()> {
    let ordinals: Vec<Option<i32>> = string_values(df, GRADE_COLUMN)?
        .iter()
        .map(|g| g.as_deref().and_then(grade_ordinal))
        .collect();
    df.with_column(Series::new(GRADE_ORDINAL_COLUMN.into(), ordinals))?;
    Ok(())
}

fn add_grade_flags(df: &mut DataFrame) -> PipelineResult<()> {
    let grades = string_values(df, GRADE_COLUMN)?;
    let flag = |members: &[&str]| -> Vec<bool> {
        grades
            .iter()
            .map(|g| matches!(g.as_deref(), Some(g) if members.contains(&g.trim())))
            .collect()
    };

    let grade_a = flag(&["A"]);
    let grade_a_or_b = flag(&["A", "B"]);
    let grade_f_or_g = flag(&["F", "G"]);

    df.with_column(Series::new("is_grade_a".into(), grade_a))?;
    df.with_column(Series::new("is_grade_a_or_b".into(), grade_a_or_b))?;
    df.with_column(Series::new("is_grade_f_or_g".into(), grade_f_or_g))?;
    Ok(())
}

fn add_verification_flag(df: &mut DataFrame) -> PipelineResult<()> {
    let verified: Vec<bool> = string_values(df, VERIFICATION_COLUMN)?
        .iter()
        .map(|s| s.as_deref() != Some("Not Verified"))
        .collect();
    df.with_column(Series::new("is_verified".into(), verified))?;
    Ok(())
}

/// Loan amount over annual income; undefined ratios are stored as null
fn add_income_ratio(df: &mut DataFrame) -> PipelineResult<()> {
    let amounts = float_values(df, LOAN_AMOUNT_COLUMN)?;
    let incomes = float_values(df, ANNUAL_INCOME_COLUMN)?;

    let ratios: Vec<Option<f64>> = amounts
        .iter()
        .zip(incomes.iter())
        .map(|(amount, income)| match (amount, income) {
            (Some(a), Some(i)) => Ratio::of(*a, *i).value(),
            _ => None,
        })
        .collect();

    let undefined = ratios.iter().filter(|r| r.is_none()).count();
    if undefined > 0 {
        tracing::warn!(rows = undefined, "Loan to income ratio undefined (zero or missing income)");
    }

    df.with_column(Series::new(RATIO_COLUMN.into(), ratios))?;
    Ok(())
}

fn validate_model_ready(df: &DataFrame) -> PipelineResult<()> {
    let offending: Vec<String> = df
        .get_columns()
        .iter()
        .filter(|c| !is_model_ready(c.dtype()))
        .map(|c| format!("{} ({})", c.name(), c.dtype()))
        .collect();

    if offending.is_empty() {
        Ok(())
    } else {
        Err(PipelineError::quality(
            "features",
            format!("non-numeric column(s) remain: {}", offending.join(", ")),
            offending,
        ))
    }
}
