//! Data dictionary lookup
//!
//! The loan data ships with a reference table mapping each raw column name
//! (`LoanStatNew`) to a free-text `Description`. The missing value resolver
//! uses it to find settlement and hardship fields, which only exist for loans
//! that went into a workout program and would leak the outcome.

use std::path::Path;

use anyhow::{Context, Result};
use polars::prelude::*;

use crate::error::PipelineResult;
use crate::pipeline::columns::{require_columns, string_values};

/// Column holding the raw field name
pub const NAME_COLUMN: &str = "LoanStatNew";
/// Column holding the field description
pub const DESCRIPTION_COLUMN: &str = "Description";

/// Terms whose presence in a description marks a settlement/hardship field
pub const SETTLEMENT_TERMS: [&str; 2] = ["settle", "hardship"];

/// One valid dictionary row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DictionaryEntry {
    pub name: String,
    pub description: String,
}

/// In-memory view of the data dictionary
#[derive(Debug, Clone, Default)]
pub struct SchemaDictionary {
    entries: Vec<DictionaryEntry>,
}

impl SchemaDictionary {
    pub fn new(entries: Vec<DictionaryEntry>) -> Self {
        Self { entries }
    }

    /// Build from a frame with `LoanStatNew` and `Description` columns.
    ///
    /// Rows with a missing or blank name or description are skipped, matching
    /// how the reference table is cleaned before any lookup. Names are trimmed
    /// because the published workbook carries trailing spaces.
    pub fn from_dataframe(df: &DataFrame) -> PipelineResult<Self> {
        require_columns(df, "dictionary", &[NAME_COLUMN, DESCRIPTION_COLUMN])?;

        let names = string_values(df, NAME_COLUMN)?;
        let descriptions = string_values(df, DESCRIPTION_COLUMN)?;

        let entries = names
            .into_iter()
            .zip(descriptions)
            .filter_map(|(name, description)| {
                let name = name?.trim().to_string();
                let description = description?.trim().to_string();
                if name.is_empty() || description.is_empty() {
                    None
                } else {
                    Some(DictionaryEntry { name, description })
                }
            })
            .collect();

        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[DictionaryEntry] {
        &self.entries
    }

    /// Names of all fields whose description contains any of `terms`
    /// (case-insensitive substring match), in dictionary order, deduplicated.
    pub fn columns_matching(&self, terms: &[&str]) -> Vec<String> {
        let terms: Vec<String> = terms.iter().map(|t| t.to_lowercase()).collect();
        let mut names: Vec<String> = Vec::new();

        for entry in &self.entries {
            let description = entry.description.to_lowercase();
            if terms.iter().any(|t| description.contains(t.as_str())) && !names.contains(&entry.name) {
                names.push(entry.name.clone());
            }
        }

        names
    }

    /// Settlement and hardship field names
    pub fn settlement_columns(&self) -> Vec<String> {
        self.columns_matching(&SETTLEMENT_TERMS)
    }
}

/// Load the data dictionary from a CSV file
pub fn load_dictionary(path: &Path) -> Result<SchemaDictionary> {
    let df = LazyCsvReader::new(path)
        .with_infer_schema_length(Some(0))
        .finish()
        .with_context(|| format!("Failed to load data dictionary: {}", path.display()))?
        .collect()
        .with_context(|| format!("Failed to read data dictionary: {}", path.display()))?;

    let dictionary = SchemaDictionary::from_dataframe(&df)
        .with_context(|| format!("Invalid data dictionary: {}", path.display()))?;

    tracing::debug!(
        path = %path.display(),
        entries = dictionary.len(),
        "Loaded data dictionary"
    );

    Ok(dictionary)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_dictionary() -> DataFrame {
        df! {
            NAME_COLUMN => [Some("hardship_flag"), Some("settlement_status "), Some("loan_amnt"), None, Some("debt_settlement_flag"), Some("orphan")],
            DESCRIPTION_COLUMN => [
                Some("Flags whether or not the borrower is on a Hardship plan"),
                Some("The status of the borrower's SETTLEMENT plan"),
                Some("The listed amount of the loan applied for"),
                Some("A settle description without a name"),
                Some("Flags whether the borrower has worked with a debt-settlement company"),
                None,
            ],
        }
        .unwrap()
    }

    #[test]
    fn test_invalid_rows_are_excluded() {
        let dictionary = SchemaDictionary::from_dataframe(&sample_dictionary()).unwrap();
        assert_eq!(dictionary.len(), 4);
    }

    #[test]
    fn test_settlement_columns_case_insensitive() {
        let dictionary = SchemaDictionary::from_dataframe(&sample_dictionary()).unwrap();
        let matches = dictionary.settlement_columns();
        assert_eq!(
            matches,
            vec![
                "hardship_flag".to_string(),
                "settlement_status".to_string(),
                "debt_settlement_flag".to_string(),
            ]
        );
    }

    #[test]
    fn test_missing_dictionary_columns_is_schema_violation() {
        let df = df! {
            "name" => ["a"],
        }
        .unwrap();

        let err = SchemaDictionary::from_dataframe(&df).unwrap_err();
        assert!(err.is_schema_violation());
    }

    #[test]
    fn test_empty_dictionary_matches_nothing() {
        let dictionary = SchemaDictionary::default();
        assert!(dictionary.is_empty());
        assert!(dictionary.settlement_columns().is_empty());
    }
}
