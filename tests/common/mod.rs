//! Shared test utilities and fixture generators

#![allow(dead_code)]

use polars::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::{Path, PathBuf};

use lorisk::pipeline::features::OUTLIER_COLUMNS;
use lorisk::pipeline::SchemaDictionary;

/// Multipliers for monetary columns over the 12 fixture rows. The two
/// largest labeled values are equal so a 0.99 clip keeps every labeled row.
const SPREAD: [f64; 12] = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 9.0, 3.0, 2.0];

/// Raw loan extract with 12 rows:
/// - rows 0..5 `Fully Paid`, rows 5..10 `Charged Off`, rows 10..12 `Current`
/// - all `Individual` applications
/// - missing values in fields covered by every disposition kind
/// - row 3 has zero annual income
pub fn create_loan_dataframe() -> DataFrame {
    let statuses = [
        "Fully Paid", "Fully Paid", "Fully Paid", "Fully Paid", "Fully Paid",
        "Charged Off", "Charged Off", "Charged Off", "Charged Off", "Charged Off",
        "Current", "Current",
    ];
    let grades = ["A", "B", "A", "C", "B", "D", "E", "F", "G", "D", "A", "B"];

    let mut df = df! {
        "id" => (1..=12i64).collect::<Vec<_>>(),
        "member_id" => (101..=112i64).collect::<Vec<_>>(),
        "url" => (1..=12).map(|i| format!("https://example.org/loan/{}", i)).collect::<Vec<_>>(),
        "loan_status" => statuses,
        "application_type" => ["Individual"; 12],
        "loan_amnt" => [5000.0f64, 8000.0, 12000.0, 3000.0, 10000.0, 15000.0, 20000.0, 25000.0, 30000.0, 18000.0, 7000.0, 9000.0],
        "int_rate" => [6.5f64, 9.1, 7.2, 12.4, 10.0, 15.3, 18.7, 22.1, 25.9, 16.0, 6.9, 8.8],
        "term" => [" 36 months", " 36 months", " 36 months", " 60 months", " 36 months", " 60 months", " 60 months", " 60 months", " 60 months", " 36 months", " 36 months", " 36 months"],
        "grade" => grades,
        "sub_grade" => grades.iter().map(|g| format!("{}1", g)).collect::<Vec<_>>(),
        "emp_length" => [Some("10+ years"), Some("2 years"), None, Some("< 1 year"), Some("5 years"), None, Some("3 years"), Some("1 year"), None, Some("7 years"), Some("4 years"), Some("6 years")],
        "emp_title" => [Some("Teacher"), None, Some("Nurse"), None, Some("Engineer"), Some("Driver"), None, Some("Clerk"), Some("Chef"), None, Some("Pilot"), None],
        "home_ownership" => ["RENT", "MORTGAGE", "OWN", "RENT", "MORTGAGE", "RENT", "RENT", "OWN", "RENT", "MORTGAGE", "OWN", "RENT"],
        "verification_status" => ["Verified", "Not Verified", "Source Verified", "Not Verified", "Verified", "Verified", "Not Verified", "Source Verified", "Verified", "Not Verified", "Verified", "Verified"],
        "purpose" => ["car", "debt_consolidation", "credit_card", "other", "car", "debt_consolidation", "medical", "other", "small_business", "credit_card", "car", "other"],
        "addr_state" => ["CA", "NY", "TX", "CA", "WA", "FL", "NV", "CA", "NY", "TX", "OR", "CA"],
        "issue_d" => ["Dec-2015", "Jan-2016", "Mar-2016", "Jun-2016", "Dec-2015", "Feb-2016", "Jul-2016", "Aug-2016", "Sep-2016", "Oct-2016", "Nov-2016", "Dec-2016"],
        "earliest_cr_line" => ["Aug-2003", "Jan-1999", "Mar-2005", "Jun-2010", "Dec-2001", "Feb-1995", "Jul-2008", "Aug-2012", "Sep-2000", "Oct-2004", "Nov-1998", "Dec-2006"],
        "dti" => [Some(12.5f64), Some(18.0), None, Some(25.1), Some(9.9), Some(30.2), Some(22.0), Some(28.4), Some(35.0), Some(19.5), Some(11.0), Some(14.2)],
        "revol_util" => [Some(45.0f64), None, Some(30.5), Some(80.1), Some(12.0), Some(95.0), None, Some(70.0), Some(88.8), Some(50.0), Some(20.0), Some(33.0)],
        "num_tl_op_past_12m" => [Some(1i64), Some(2), None, Some(0), Some(3), Some(4), Some(2), None, Some(5), Some(1), Some(0), Some(2)],
        "mths_since_last_delinq" => [None, Some(12i64), None, Some(40), None, Some(3), Some(7), None, Some(1), Some(20), None, Some(15)],
        "mths_since_last_record" => [None::<i64>, None, None, Some(80), None, None, Some(50), None, None, None, None, None],
        "last_pymnt_d" => [Some("Jan-2018"), Some("Feb-2018"), None, Some("Mar-2018"), Some("Jan-2019"), Some("Apr-2017"), None, Some("May-2017"), Some("Jun-2017"), Some("Jul-2017"), Some("Aug-2018"), Some("Sep-2018")],
        "hardship_flag" => ["N"; 12],
    }
    .unwrap();

    for (i, name) in OUTLIER_COLUMNS.iter().enumerate() {
        let base = 1000.0 * (i as f64 + 1.0);
        let mut values: Vec<f64> = SPREAD.iter().map(|m| base * m).collect();
        if *name == "annual_inc" {
            values = SPREAD.iter().map(|m| 20000.0 * m).collect();
            values[3] = 0.0;
        }
        df.with_column(Series::new((*name).into(), values)).unwrap();
    }

    df
}

/// Data dictionary frame: two settlement/hardship fields (one absent from the
/// loan fixture), an unrelated field and an incomplete row
pub fn create_dictionary_dataframe() -> DataFrame {
    df! {
        "LoanStatNew" => [Some("hardship_flag"), Some("settlement_status"), Some("loan_amnt"), Some("orphan")],
        "Description" => [
            Some("Flags whether or not the borrower is on a hardship plan"),
            Some("The status of the borrower's settlement plan"),
            Some("The listed amount of the loan applied for by the borrower"),
            None,
        ],
    }
    .unwrap()
}

pub fn create_dictionary() -> SchemaDictionary {
    SchemaDictionary::from_dataframe(&create_dictionary_dataframe()).unwrap()
}

/// Processed-style frame with two informative features, one noise feature and
/// a boolean target alternating by row
pub fn create_processed_dataframe(rows: usize, seed: u64) -> DataFrame {
    let mut rng = StdRng::seed_from_u64(seed);
    let target: Vec<bool> = (0..rows).map(|i| i % 2 == 1).collect();

    let signal: Vec<f64> = target
        .iter()
        .map(|&t| if t { 3.0 } else { 0.0 } + rng.gen_range(-1.0..1.0))
        .collect();
    let ratio: Vec<f64> = target
        .iter()
        .map(|&t| if t { 0.6 } else { 0.2 } + rng.gen_range(-0.15..0.15))
        .collect();
    let noise: Vec<f64> = (0..rows).map(|_| rng.gen_range(0.0..100.0)).collect();
    let flag: Vec<bool> = (0..rows).map(|_| rng.gen_bool(0.5)).collect();

    df! {
        "int_rate" => signal,
        "loan_income_ratio" => ratio,
        "revol_bal" => noise,
        "is_verified" => flag,
        "target" => target,
    }
    .unwrap()
}

/// Write a frame as CSV and return its path
pub fn write_csv(df: &DataFrame, dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    let mut df = df.clone();
    let mut file = std::fs::File::create(&path).unwrap();
    CsvWriter::new(&mut file).finish(&mut df).unwrap();
    path
}
