//! Numeric feature matrix handed to the model

use polars::prelude::*;

use crate::error::{PipelineError, PipelineResult};
use crate::pipeline::columns::{float_values, has_column, is_model_ready};

/// Column-major feature matrix with a binary target.
///
/// Missing cells are carried as NaN until [`FeatureMatrix::fill_missing_with_zero`]
/// is called on a partition.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    columns: Vec<String>,
    values: Vec<Vec<f64>>,
    target: Vec<u8>,
}

impl FeatureMatrix {
    /// Build from parts. Every column must have one value per target entry.
    pub fn new(columns: Vec<String>, values: Vec<Vec<f64>>, target: Vec<u8>) -> PipelineResult<Self> {
        if columns.len() != values.len() {
            return Err(PipelineError::quality(
                "matrix",
                format!("{} column names for {} value columns", columns.len(), values.len()),
                Vec::new(),
            ));
        }
        let ragged: Vec<String> = columns
            .iter()
            .zip(values.iter())
            .filter(|(_, v)| v.len() != target.len())
            .map(|(name, _)| name.clone())
            .collect();
        if !ragged.is_empty() {
            return Err(PipelineError::quality(
                "matrix",
                format!("column length differs from {} target rows", target.len()),
                ragged,
            ));
        }
        Ok(Self {
            columns,
            values,
            target,
        })
    }

    /// Split a processed frame into features and target. Every feature column
    /// must be numeric or boolean.
    pub fn from_dataframe(df: &DataFrame, target_column: &str) -> PipelineResult<Self> {
        if !has_column(df, target_column) {
            return Err(PipelineError::schema(
                "matrix",
                vec![target_column.to_string()],
                df.height(),
            ));
        }

        let target = target_values(df, target_column)?;
        let features = feature_frame(df, Some(target_column))?;
        let (columns, values) = frame_to_columns(&features)?;
        Self::new(columns, values, target)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn target(&self) -> &[u8] {
        &self.target
    }

    pub fn column_values(&self, index: usize) -> &[f64] {
        &self.values[index]
    }

    pub fn n_rows(&self) -> usize {
        self.target.len()
    }

    pub fn n_features(&self) -> usize {
        self.columns.len()
    }

    /// Feature values of one row
    pub fn row(&self, index: usize) -> Vec<f64> {
        self.values.iter().map(|col| col[index]).collect()
    }

    /// `(class 0 count, class 1 count)`
    pub fn class_counts(&self) -> (usize, usize) {
        let positives = self.target.iter().filter(|&&t| t == 1).count();
        (self.target.len() - positives, positives)
    }

    /// New matrix with the given rows, in the given order
    pub fn select_rows(&self, indices: &[usize]) -> Self {
        Self {
            columns: self.columns.clone(),
            values: self
                .values
                .iter()
                .map(|col| indices.iter().map(|&i| col[i]).collect())
                .collect(),
            target: indices.iter().map(|&i| self.target[i]).collect(),
        }
    }

    /// Count of NaN cells
    pub fn missing_cells(&self) -> usize {
        self.values.iter().flatten().filter(|v| v.is_nan()).count()
    }

    /// Replace NaN cells by zero, returning how many were replaced
    pub fn fill_missing_with_zero(&mut self) -> usize {
        let mut filled = 0;
        for value in self.values.iter_mut().flatten() {
            if value.is_nan() {
                *value = 0.0;
                filled += 1;
            }
        }
        filled
    }

    pub(crate) fn values_mut(&mut self) -> &mut [Vec<f64>] {
        &mut self.values
    }

    /// Fail unless `other` has the same feature names in the same order
    pub fn ensure_same_columns(&self, other: &FeatureMatrix) -> PipelineResult<()> {
        ensure_columns_match(&self.columns, &other.columns, other.n_rows())
    }
}

/// Fail unless `actual` equals `expected` name for name
pub fn ensure_columns_match(expected: &[String], actual: &[String], rows: usize) -> PipelineResult<()> {
    if expected == actual {
        return Ok(());
    }

    let mut differing: Vec<String> = expected
        .iter()
        .filter(|c| !actual.contains(c))
        .map(|c| format!("missing:{}", c))
        .collect();
    differing.extend(
        actual
            .iter()
            .filter(|c| !expected.contains(c))
            .map(|c| format!("unexpected:{}", c)),
    );
    if differing.is_empty() {
        differing.push("column order differs".to_string());
    }

    Err(PipelineError::schema("matrix", differing, rows))
}

/// Feature columns of `df` as a frame, excluding the target when given
pub fn feature_frame(df: &DataFrame, target_column: Option<&str>) -> PipelineResult<DataFrame> {
    let features = match target_column {
        Some(target) if has_column(df, target) => df.drop(target)?,
        _ => df.clone(),
    };

    let non_numeric: Vec<String> = features
        .get_columns()
        .iter()
        .filter(|c| !is_model_ready(c.dtype()))
        .map(|c| c.name().to_string())
        .collect();
    if !non_numeric.is_empty() {
        return Err(PipelineError::quality(
            "matrix",
            format!("feature columns must be numeric or boolean: {}", non_numeric.join(", ")),
            non_numeric,
        ));
    }

    Ok(features)
}

/// Column names and NaN-for-missing values of a numeric frame
pub fn frame_to_columns(df: &DataFrame) -> PipelineResult<(Vec<String>, Vec<Vec<f64>>)> {
    let mut names = Vec::with_capacity(df.width());
    let mut values = Vec::with_capacity(df.width());
    for name in df.get_column_names() {
        let column: Vec<f64> = float_values(df, name.as_str())?
            .into_iter()
            .map(|v| v.unwrap_or(f64::NAN))
            .collect();
        names.push(name.to_string());
        values.push(column);
    }
    Ok((names, values))
}

fn target_values(df: &DataFrame, target_column: &str) -> PipelineResult<Vec<u8>> {
    let values = float_values(df, target_column)?;
    let invalid = values
        .iter()
        .filter(|v| !matches!(v, Some(x) if *x == 0.0 || *x == 1.0))
        .count();
    if invalid > 0 {
        return Err(PipelineError::quality(
            "matrix",
            format!(
                "target column '{}' has {} value(s) outside {{0, 1}} in {} rows",
                target_column,
                invalid,
                df.height()
            ),
            vec![target_column.to_string()],
        ));
    }
    Ok(values.into_iter().map(|v| if v == Some(1.0) { 1 } else { 0 }).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_dataframe_splits_target() {
        let df = df! {
            "a" => [Some(1.0f64), None, Some(3.0)],
            "flag" => [true, false, true],
            "target" => [true, false, false],
        }
        .unwrap();

        let matrix = FeatureMatrix::from_dataframe(&df, "target").unwrap();
        assert_eq!(matrix.columns(), &["a".to_string(), "flag".to_string()]);
        assert_eq!(matrix.target(), &[1, 0, 0]);
        assert_eq!(matrix.class_counts(), (2, 1));
        assert_eq!(matrix.missing_cells(), 1);
        assert_eq!(matrix.row(2), vec![3.0, 1.0]);
    }

    #[test]
    fn test_fill_missing_with_zero() {
        let mut matrix = FeatureMatrix::new(
            vec!["a".into()],
            vec![vec![1.0, f64::NAN, 2.0]],
            vec![0, 1, 0],
        )
        .unwrap();

        assert_eq!(matrix.fill_missing_with_zero(), 1);
        assert_eq!(matrix.column_values(0), &[1.0, 0.0, 2.0]);
        assert_eq!(matrix.missing_cells(), 0);
    }

    #[test]
    fn test_string_feature_rejected() {
        let df = df! {
            "purpose" => ["car", "house"],
            "target" => [0i32, 1],
        }
        .unwrap();

        let err = FeatureMatrix::from_dataframe(&df, "target").unwrap_err();
        assert!(err.is_data_quality_violation());
    }

    #[test]
    fn test_ensure_same_columns_detects_order() {
        let a = FeatureMatrix::new(vec!["x".into(), "y".into()], vec![vec![1.0], vec![2.0]], vec![0]).unwrap();
        let b = FeatureMatrix::new(vec!["y".into(), "x".into()], vec![vec![2.0], vec![1.0]], vec![0]).unwrap();
        let err = a.ensure_same_columns(&b).unwrap_err();
        assert!(err.to_string().contains("column order differs"));
    }
}
