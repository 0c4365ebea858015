//! Raw string field coercion (opt-in stage)
//!
//! Every conversion is guarded by its source column being present with its
//! raw dtype, and converted sources are removed, so running the stage on its
//! own output changes nothing.

use chrono::NaiveDate;
use polars::prelude::*;

use crate::error::PipelineResult;
use crate::pipeline::columns::{drop_present, has_column, string_values};

/// `(source, flag, value that maps to true)`
const BOOLEAN_INDICATORS: [(&str, &str, &str); 5] = [
    ("pymnt_plan", "is_payment_plan", "y"),
    ("initial_list_status", "is_whole_loan", "w"),
    ("application_type", "is_individual_app", "Individual"),
    ("term", "is_36_month_term", "36 months"),
    ("disbursement_method", "is_cash", "Cash"),
];

pub const TERM_COLUMN: &str = "term";
pub const TERM_MONTHS_COLUMN: &str = "term_months";

pub const DATE_COLUMNS: [&str; 2] = ["issue_d", "earliest_cr_line"];

pub const CATEGORY_COLUMNS: [&str; 6] = [
    "grade",
    "sub_grade",
    "home_ownership",
    "verification_status",
    "purpose",
    "addr_state",
];

pub const EMPLOYMENT_LENGTH_COLUMN: &str = "emp_length";

/// High-cardinality free text
pub const FREE_TEXT_COLUMNS: [&str; 4] = ["emp_title", "desc", "title", "zip_code"];

/// Coerce indicator strings to booleans, term to months, dates to `Date`,
/// nominal strings to `Categorical` and employment length to years.
pub fn normalize_types(df: DataFrame) -> PipelineResult<DataFrame> {
    let width_before = df.width();

    let df = convert_indicators(df)?;
    let df = convert_dates(df)?;
    let df = convert_categories(df)?;
    let df = convert_employment_length(df)?;

    let free_text: Vec<String> = FREE_TEXT_COLUMNS.iter().map(|s| s.to_string()).collect();
    let (df, dropped) = drop_present(df, &free_text);

    tracing::info!(
        columns_before = width_before,
        columns_after = df.width(),
        free_text_dropped = dropped.len(),
        "Normalized column types"
    );

    Ok(df)
}

fn is_raw_string(df: &DataFrame, name: &str) -> PipelineResult<bool> {
    Ok(has_column(df, name) && matches!(df.column(name)?.dtype(), DataType::String))
}

fn convert_indicators(mut df: DataFrame) -> PipelineResult<DataFrame> {
    let mut converted: Vec<String> = Vec::new();

    for (source, flag, truthy) in BOOLEAN_INDICATORS {
        if !is_raw_string(&df, source)? {
            continue;
        }
        let values: Vec<bool> = string_values(&df, source)?
            .iter()
            .map(|v| v.as_deref().map(str::trim) == Some(truthy))
            .collect();
        df.with_column(Series::new(flag.into(), &values))?;
        converted.push(source.to_string());
    }

    if converted.iter().any(|c| c == TERM_COLUMN) {
        let months: Vec<Option<i32>> = string_values(&df, TERM_COLUMN)?
            .iter()
            .map(|v| v.as_deref().and_then(leading_integer))
            .collect();
        df.with_column(Series::new(TERM_MONTHS_COLUMN.into(), months))?;
    }

    let (df, _) = drop_present(df, &converted);
    Ok(df)
}

fn convert_dates(mut df: DataFrame) -> PipelineResult<DataFrame> {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default();

    for name in DATE_COLUMNS {
        if !is_raw_string(&df, name)? {
            continue;
        }
        let days: Vec<Option<i32>> = string_values(&df, name)?
            .iter()
            .map(|v| {
                v.as_deref()
                    .and_then(parse_loan_date)
                    .map(|d| (d - epoch).num_days() as i32)
            })
            .collect();
        let dates = Series::new(name.into(), days).cast(&DataType::Date)?;
        df.with_column(dates)?;
    }

    Ok(df)
}

fn convert_categories(mut df: DataFrame) -> PipelineResult<DataFrame> {
    for name in CATEGORY_COLUMNS {
        if !is_raw_string(&df, name)? {
            continue;
        }
        let categorical = df
            .column(name)?
            .cast(&DataType::Categorical(None, CategoricalOrdering::Physical))?;
        df.with_column(categorical)?;
    }
    Ok(df)
}

fn convert_employment_length(mut df: DataFrame) -> PipelineResult<DataFrame> {
    if !is_raw_string(&df, EMPLOYMENT_LENGTH_COLUMN)? {
        return Ok(df);
    }

    let years: Vec<Option<f64>> = string_values(&df, EMPLOYMENT_LENGTH_COLUMN)?
        .iter()
        .map(|v| v.as_deref().and_then(employment_years))
        .collect();
    df.with_column(Series::new(EMPLOYMENT_LENGTH_COLUMN.into(), years))?;
    Ok(df)
}

/// Years of employment: "10+ years" is 11, "< 1 year" is 0, otherwise the
/// leading numeral.
pub fn employment_years(raw: &str) -> Option<f64> {
    let rewritten = match raw.trim() {
        "10+ years" => "11 years",
        "< 1 year" => "0 years",
        other => other,
    };
    leading_integer(rewritten).map(f64::from)
}

/// Leading run of ASCII digits after trimming, e.g. " 36 months" -> 36
pub fn leading_integer(raw: &str) -> Option<i32> {
    let digits: String = raw.trim().chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

/// Parse the loan file date formats: "Dec-2015", "Dec-15" and "2015-12-01".
/// Month-only dates resolve to the first of the month.
pub fn parse_loan_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    let year_digits = raw.rsplit('-').next().map(str::len).unwrap_or(0);
    let format = if year_digits == 2 { "%d-%b-%y" } else { "%d-%b-%Y" };
    NaiveDate::parse_from_str(&format!("01-{}", raw), format).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_frame() -> DataFrame {
        df! {
            "pymnt_plan" => ["n", "y"],
            "initial_list_status" => ["w", "f"],
            "application_type" => ["Individual", "Individual"],
            "term" => [" 36 months", " 60 months"],
            "disbursement_method" => ["Cash", "DirectPay"],
            "issue_d" => ["Dec-2015", "Jan-2016"],
            "earliest_cr_line" => ["Aug-2003", "2001-05-01"],
            "grade" => ["A", "C"],
            "emp_length" => ["10+ years", "< 1 year"],
            "emp_title" => ["Teacher", "Nurse"],
            "zip_code" => ["123xx", "456xx"],
            "loan_amnt" => [1000i64, 2000],
        }
        .unwrap()
    }

    #[test]
    fn test_employment_years_rewrites() {
        assert_eq!(employment_years("10+ years"), Some(11.0));
        assert_eq!(employment_years("< 1 year"), Some(0.0));
        assert_eq!(employment_years("3 years"), Some(3.0));
        assert_eq!(employment_years("n/a"), None);
    }

    #[test]
    fn test_parse_loan_date_formats() {
        assert_eq!(parse_loan_date("Dec-2015"), NaiveDate::from_ymd_opt(2015, 12, 1));
        assert_eq!(parse_loan_date("2001-05-01"), NaiveDate::from_ymd_opt(2001, 5, 1));
        assert_eq!(parse_loan_date("Aug-03"), NaiveDate::from_ymd_opt(2003, 8, 1));
        assert_eq!(parse_loan_date("garbage"), None);
    }

    #[test]
    fn test_normalize_types_conversions() {
        let df = normalize_types(raw_frame()).unwrap();

        for dropped in ["pymnt_plan", "term", "emp_title", "zip_code", "application_type"] {
            assert!(!has_column(&df, dropped), "{} should be dropped", dropped);
        }

        let term_flag: Vec<Option<bool>> = df.column("is_36_month_term").unwrap().bool().unwrap().into_iter().collect();
        assert_eq!(term_flag, vec![Some(true), Some(false)]);

        let months: Vec<Option<i32>> = df.column("term_months").unwrap().i32().unwrap().into_iter().collect();
        assert_eq!(months, vec![Some(36), Some(60)]);

        let years: Vec<Option<f64>> = df.column("emp_length").unwrap().f64().unwrap().into_iter().collect();
        assert_eq!(years, vec![Some(11.0), Some(0.0)]);

        assert_eq!(df.column("issue_d").unwrap().dtype(), &DataType::Date);
        assert!(matches!(df.column("grade").unwrap().dtype(), DataType::Categorical(_, _)));
    }

    #[test]
    fn test_normalize_types_is_idempotent() {
        let once = normalize_types(raw_frame()).unwrap();
        let twice = normalize_types(once.clone()).unwrap();

        assert_eq!(once.get_column_names(), twice.get_column_names());
        assert!(once.equals_missing(&twice));
    }
}
