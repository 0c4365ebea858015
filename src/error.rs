//! Error types for the loan risk pipeline.
//!
//! Stages return `PipelineError` so callers can tell a broken input schema
//! apart from a failed data-quality postcondition. The binary and the file
//! wrappers fold these into `anyhow::Error` with added context.

use polars::prelude::PolarsError;
use thiserror::Error;

/// Result alias used by every pipeline stage.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;

/// Errors raised by pipeline stages.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A column required by a stage is absent from the frame.
    #[error("[{stage}] required column(s) missing: {} ({rows} rows in frame)", .columns.join(", "))]
    SchemaViolation {
        /// Stage that detected the violation
        stage: &'static str,
        /// Names of the missing columns
        columns: Vec<String>,
        /// Row count of the frame at the time of the check
        rows: usize,
    },

    /// An optional reference entry named a column the frame does not have.
    ///
    /// Never returned as a stage failure; stages collect these for reporting.
    #[error("reference column '{column}' not present in dataset")]
    LookupMiss {
        /// Column named by the reference table
        column: String,
    },

    /// A stage postcondition or numeric precondition did not hold.
    #[error("[{stage}] data quality violation: {detail}")]
    DataQualityViolation {
        /// Stage that detected the violation
        stage: &'static str,
        /// Human readable description including counts
        detail: String,
        /// Offending column names (may be empty for row-level checks)
        columns: Vec<String>,
    },

    #[error(transparent)]
    Polars(#[from] PolarsError),
}

impl PipelineError {
    pub(crate) fn schema(stage: &'static str, columns: Vec<String>, rows: usize) -> Self {
        PipelineError::SchemaViolation {
            stage,
            columns,
            rows,
        }
    }

    pub(crate) fn quality(stage: &'static str, detail: impl Into<String>, columns: Vec<String>) -> Self {
        PipelineError::DataQualityViolation {
            stage,
            detail: detail.into(),
            columns,
        }
    }

    /// True for failures caused by a missing required column.
    pub fn is_schema_violation(&self) -> bool {
        matches!(self, PipelineError::SchemaViolation { .. })
    }

    /// True for failed postconditions and violated numeric preconditions.
    pub fn is_data_quality_violation(&self) -> bool {
        matches!(self, PipelineError::DataQualityViolation { .. })
    }
}
