//! Missing value resolution
//!
//! Every column of the labeled frame ends this stage either dropped, zero
//! imputed, turned into a presence flag, or kept untouched. The decision for
//! each column comes from a [`DispositionTable`] built once from fixed naming
//! rules and the data dictionary, then applied generically.

use polars::prelude::*;
use serde::Serialize;

use crate::error::{PipelineError, PipelineResult};
use crate::pipeline::columns::{
    columns_with_missing, drop_present, filter_rows, has_column, missing_count, string_values,
};
use crate::pipeline::dictionary::SchemaDictionary;

/// Opaque identifiers and reference URLs
pub const IDENTIFIER_COLUMNS: [&str; 3] = ["id", "member_id", "url"];

/// Column whose nulls get a sentinel category instead of a drop
pub const EMPLOYMENT_LENGTH_COLUMN: &str = "emp_length";
/// Sentinel category for unknown employment length
pub const EMPLOYMENT_LENGTH_SENTINEL: &str = "0 years";

pub const APPLICATION_TYPE_COLUMN: &str = "application_type";
pub const INDIVIDUAL_APPLICATION: &str = "Individual";

/// Name fragments that mark co-borrower fields
pub const JOINT_MARKERS: [&str; 2] = ["joint", "sec_app"];

/// Trailing payment and credit pull fields: post-origination information
const POST_ORIGINATION_COLUMNS: [&str; 4] = [
    "next_pymnt_d",
    "last_pymnt_d",
    "last_pymnt_amnt",
    "last_credit_pull_d",
];

/// Sparse months-since field dropped without a flag
const SPARSE_RECENCY_COLUMNS: [&str; 1] = ["mths_since_rcnt_il"];

/// Free text with no fixed vocabulary
const FREE_TEXT_COLUMNS: [&str; 3] = ["emp_title", "desc", "title"];

const FLAG_LIKE_COLUMNS: [&str; 11] = [
    "max_bal_bc",
    "open_acc_6m",
    "open_act_il",
    "open_il_12m",
    "open_il_24m",
    "total_bal_il",
    "open_rv_24m",
    "open_rv_12m",
    "inq_last_12m",
    "inq_fi",
    "total_cu_tl",
];

/// Fields where a missing value plausibly means zero occurrences
const LOW_FREQUENCY_COLUMNS: [&str; 18] = [
    "tot_cur_bal",
    "tot_coll_amt",
    "emp_length",
    "avg_cur_bal",
    "tax_liens",
    "total_rev_hi_lim",
    "total_il_high_credit_limit",
    "tot_hi_cred_lim",
    "pct_tl_nvr_dlq",
    "percent_bc_gt_75",
    "bc_open_to_buy",
    "mort_acc",
    "acc_open_past_24mths",
    "total_bc_limit",
    "total_bal_ex_mort",
    "pub_rec_bankruptcies",
    "collections_12_mths_ex_med",
    "chargeoff_within_12_mths",
];

const ZERO_MONTHS_COLUMNS: [&str; 6] = [
    "mo_sin_rcnt_rev_tl_op",
    "mo_sin_rcnt_tl",
    "mths_since_recent_inq",
    "mo_sin_old_rev_tl_op",
    "mo_sin_old_il_acct",
    "mths_since_recent_bc",
];

/// Credit history fields that are only missing on a few legacy rows
const LEGACY_SPARSE_COLUMNS: [&str; 8] = [
    "dti",
    "inq_last_6mths",
    "delinq_2yrs",
    "open_acc",
    "pub_rec",
    "total_acc",
    "acc_now_delinq",
    "delinq_amnt",
];

/// Months-since-event fields whose absence is informative:
/// `(source column, derived "has ever had event" flag)`
pub const PRESENCE_FLAG_COLUMNS: [(&str, &str); 5] = [
    ("mths_since_last_record", "has_public_record"),
    ("mths_since_recent_bc_dlq", "has_recent_bc_dlq"),
    ("mths_since_last_major_derog", "has_major_derog"),
    ("mths_since_recent_revol_delinq", "has_recent_revol_delinq"),
    ("mths_since_last_delinq", "has_recent_delinq"),
];

/// What happens to a column during resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnDisposition {
    Drop(DropReason),
    ZeroImpute,
    /// Replace the column by a boolean flag with the given name
    DerivePresenceFlag(String),
    Keep,
}

/// Why a column is dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    Identifier,
    SettlementOrHardship,
    JointApplication,
    PostOrigination,
    SparseRecency,
    FreeText,
}

/// Name pattern matched by a rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnPattern {
    Exact(String),
    Prefix(String),
    Contains(String),
}

impl ColumnPattern {
    pub fn matches(&self, name: &str) -> bool {
        match self {
            ColumnPattern::Exact(exact) => name == exact,
            ColumnPattern::Prefix(prefix) => name.starts_with(prefix.as_str()),
            ColumnPattern::Contains(fragment) => name.contains(fragment.as_str()),
        }
    }
}

/// A single entry of the disposition table
#[derive(Debug, Clone)]
pub struct DispositionRule {
    pub pattern: ColumnPattern,
    pub disposition: ColumnDisposition,
    /// Pattern rules only fire for columns that actually have missing values
    pub only_if_missing: bool,
}

/// Ordered rule list; the first matching rule wins, unmatched columns are kept
#[derive(Debug, Clone, Default)]
pub struct DispositionTable {
    rules: Vec<DispositionRule>,
}

impl DispositionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The fixed loan-data table extended with the dictionary's settlement and
    /// hardship fields.
    pub fn for_loan_data(dictionary: &SchemaDictionary) -> Self {
        let mut table = Self::new();

        for name in IDENTIFIER_COLUMNS {
            table.exact(name, ColumnDisposition::Drop(DropReason::Identifier));
        }
        for name in dictionary.settlement_columns() {
            table.exact(&name, ColumnDisposition::Drop(DropReason::SettlementOrHardship));
        }
        for marker in JOINT_MARKERS {
            table.push(
                ColumnPattern::Contains(marker.to_string()),
                ColumnDisposition::Drop(DropReason::JointApplication),
                false,
            );
        }
        for name in POST_ORIGINATION_COLUMNS {
            table.exact(name, ColumnDisposition::Drop(DropReason::PostOrigination));
        }
        for name in SPARSE_RECENCY_COLUMNS {
            table.exact(name, ColumnDisposition::Drop(DropReason::SparseRecency));
        }
        for name in FREE_TEXT_COLUMNS {
            table.exact(name, ColumnDisposition::Drop(DropReason::FreeText));
        }
        for (source, flag) in PRESENCE_FLAG_COLUMNS {
            table.exact(source, ColumnDisposition::DerivePresenceFlag(flag.to_string()));
        }
        for name in FLAG_LIKE_COLUMNS
            .iter()
            .chain(LOW_FREQUENCY_COLUMNS.iter())
            .chain(ZERO_MONTHS_COLUMNS.iter())
            .chain(LEGACY_SPARSE_COLUMNS.iter())
        {
            table.exact(name, ColumnDisposition::ZeroImpute);
        }

        // Count fields and utilization ratios
        table.push(ColumnPattern::Prefix("num_".into()), ColumnDisposition::ZeroImpute, true);
        table.push(ColumnPattern::Contains("_util".into()), ColumnDisposition::ZeroImpute, true);

        table
    }

    fn exact(&mut self, name: &str, disposition: ColumnDisposition) {
        self.push(ColumnPattern::Exact(name.to_string()), disposition, false);
    }

    pub fn push(&mut self, pattern: ColumnPattern, disposition: ColumnDisposition, only_if_missing: bool) {
        self.rules.push(DispositionRule {
            pattern,
            disposition,
            only_if_missing,
        });
    }

    /// Disposition for `name`, given whether the column has missing values
    pub fn classify(&self, name: &str, has_missing: bool) -> ColumnDisposition {
        self.rules
            .iter()
            .filter(|rule| has_missing || !rule.only_if_missing)
            .find(|rule| rule.pattern.matches(name))
            .map(|rule| rule.disposition.clone())
            .unwrap_or(ColumnDisposition::Keep)
    }

    /// Exact names that no column of `df` carries
    pub fn absent_exact_names(&self, df: &DataFrame) -> Vec<String> {
        self.rules
            .iter()
            .filter_map(|rule| match &rule.pattern {
                ColumnPattern::Exact(name) if !has_column(df, name) => Some(name.clone()),
                _ => None,
            })
            .collect()
    }
}

/// What the resolver did, for reporting
#[derive(Debug, Clone, Default, Serialize)]
pub struct MissingReport {
    pub rows_before: usize,
    pub rows_after: usize,
    pub columns_before: usize,
    pub columns_after: usize,
    /// Columns with missing values on entry
    pub columns_with_missing_before: usize,
    pub dropped: Vec<(String, DropReason)>,
    pub zero_imputed: Vec<String>,
    pub presence_flags: Vec<(String, String)>,
    /// Dictionary settlement/hardship fields the frame does not carry
    pub dictionary_misses: Vec<String>,
    /// Rows removed because they are not single-applicant loans
    pub non_individual_rows: usize,
}

/// Per-column missing counts, sorted by count descending
pub fn analyze_missing_values(df: &DataFrame) -> PipelineResult<Vec<(String, usize)>> {
    let mut counts = Vec::with_capacity(df.width());
    for column in df.get_columns() {
        counts.push((column.name().to_string(), missing_count(column)?));
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    Ok(counts)
}

/// Resolve every missing value in the labeled loan frame.
///
/// # Errors
/// * `SchemaViolation` when `application_type` is absent
/// * `DataQualityViolation` when any column still has missing values after
///   the disposition table has been applied
pub fn resolve_missing_values(
    df: DataFrame,
    dictionary: &SchemaDictionary,
) -> PipelineResult<(DataFrame, MissingReport)> {
    let table = DispositionTable::for_loan_data(dictionary);
    resolve_with_table(df, dictionary, &table)
}

/// Same as [`resolve_missing_values`] with a caller supplied table
pub fn resolve_with_table(
    df: DataFrame,
    dictionary: &SchemaDictionary,
    table: &DispositionTable,
) -> PipelineResult<(DataFrame, MissingReport)> {
    let mut report = MissingReport {
        rows_before: df.height(),
        columns_before: df.width(),
        columns_with_missing_before: columns_with_missing(&df)?.len(),
        ..Default::default()
    };

    tracing::info!(
        columns_with_missing = report.columns_with_missing_before,
        "Columns with missing values before cleaning"
    );

    if !has_column(&df, APPLICATION_TYPE_COLUMN) {
        return Err(PipelineError::schema(
            "missing",
            vec![APPLICATION_TYPE_COLUMN.to_string()],
            df.height(),
        ));
    }

    tracing::debug!(
        absent = table.absent_exact_names(&df).len(),
        "Disposition rules naming columns not in dataset"
    );

    let mut df = fill_sentinel_category(df, EMPLOYMENT_LENGTH_COLUMN, EMPLOYMENT_LENGTH_SENTINEL)?;

    for name in dictionary.settlement_columns() {
        if !has_column(&df, &name) {
            let miss = PipelineError::LookupMiss { column: name.clone() };
            tracing::debug!(%miss, "Skipping dictionary column");
            report.dictionary_misses.push(name);
        }
    }

    // Single-applicant loans only
    let application_types = string_values(&df, APPLICATION_TYPE_COLUMN)?;
    let keep: Vec<bool> = application_types
        .iter()
        .map(|t| t.as_deref() == Some(INDIVIDUAL_APPLICATION))
        .collect();
    let before = df.height();
    df = filter_rows(&df, &keep)?;
    report.non_individual_rows = before - df.height();

    // Classify against the state after row filtering
    let missing: Vec<(String, usize)> = columns_with_missing(&df)?;
    let names: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();

    let mut to_drop: Vec<String> = Vec::new();
    for name in &names {
        let has_missing = missing.iter().any(|(m, _)| m == name);
        match table.classify(name, has_missing) {
            ColumnDisposition::Drop(reason) => {
                tracing::debug!(column = %name, ?reason, "Dropping column");
                to_drop.push(name.clone());
                report.dropped.push((name.clone(), reason));
            }
            ColumnDisposition::ZeroImpute => {
                if has_missing {
                    let filled = zero_fill(df.column(name)?)?;
                    df.with_column(filled)?;
                    tracing::debug!(column = %name, "Zero imputed");
                    report.zero_imputed.push(name.clone());
                }
            }
            ColumnDisposition::DerivePresenceFlag(flag) => {
                let present: Vec<bool> = df
                    .column(name)?
                    .as_materialized_series()
                    .is_not_null()
                    .into_iter()
                    .map(|v| v.unwrap_or(false))
                    .collect();
                df.with_column(Series::new(flag.as_str().into(), &present))?;
                to_drop.push(name.clone());
                report.presence_flags.push((name.clone(), flag));
            }
            ColumnDisposition::Keep => {}
        }
    }

    let (df, _) = drop_present(df, &to_drop);

    let remaining = columns_with_missing(&df)?;
    if !remaining.is_empty() {
        let detail = remaining
            .iter()
            .map(|(name, count)| format!("{} ({} missing)", name, count))
            .collect::<Vec<_>>()
            .join(", ");
        return Err(PipelineError::quality(
            "missing",
            format!(
                "{} column(s) still contain missing values across {} rows: {}",
                remaining.len(),
                df.height(),
                detail
            ),
            remaining.into_iter().map(|(name, _)| name).collect(),
        ));
    }

    report.rows_after = df.height();
    report.columns_after = df.width();

    tracing::info!(
        rows_before = report.rows_before,
        rows_after = report.rows_after,
        columns_before = report.columns_before,
        columns_after = report.columns_after,
        dropped = report.dropped.len(),
        zero_imputed = report.zero_imputed.len(),
        presence_flags = report.presence_flags.len(),
        "Columns with missing values after cleaning: 0"
    );

    Ok((df, report))
}

/// Fill nulls of a categorical column with a fixed category. Absent columns
/// are left alone.
fn fill_sentinel_category(mut df: DataFrame, name: &str, sentinel: &str) -> PipelineResult<DataFrame> {
    if !has_column(&df, name) {
        return Ok(df);
    }

    let filled: Vec<String> = string_values(&df, name)?
        .into_iter()
        .map(|v| v.unwrap_or_else(|| sentinel.to_string()))
        .collect();
    df.with_column(Series::new(name.into(), filled))?;
    Ok(df)
}

/// Replace missing cells by zero. Numeric and boolean columns become Float64
/// (or stay Boolean); string columns get the literal "0".
fn zero_fill(column: &Column) -> PipelineResult<Series> {
    let name = column.name().clone();
    match column.dtype() {
        DataType::Boolean => {
            let values: Vec<bool> = column.bool()?.into_iter().map(|v| v.unwrap_or(false)).collect();
            Ok(Series::new(name, values))
        }
        DataType::String => {
            let values: Vec<String> = column
                .str()?
                .into_iter()
                .map(|v| v.unwrap_or("0").to_string())
                .collect();
            Ok(Series::new(name, values))
        }
        _ => {
            let cast = column.cast(&DataType::Float64)?;
            let values: Vec<f64> = cast
                .f64()?
                .into_iter()
                .map(|v| match v {
                    Some(x) if !x.is_nan() => x,
                    _ => 0.0,
                })
                .collect();
            Ok(Series::new(name, values))
        }
    }
}
