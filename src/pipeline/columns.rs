//! Column access helpers shared by the pipeline stages

use polars::prelude::*;

use crate::error::{PipelineError, PipelineResult};

/// Check whether a column exists in the frame
pub fn has_column(df: &DataFrame, name: &str) -> bool {
    df.get_column_names().iter().any(|c| c.as_str() == name)
}

/// Fail with a schema violation listing every required column that is absent
pub fn require_columns(df: &DataFrame, stage: &'static str, required: &[&str]) -> PipelineResult<()> {
    let missing: Vec<String> = required
        .iter()
        .filter(|name| !has_column(df, name))
        .map(|name| name.to_string())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(PipelineError::schema(stage, missing, df.height()))
    }
}

/// Drop the named columns that are present, returning the names actually removed
pub fn drop_present(df: DataFrame, names: &[String]) -> (DataFrame, Vec<String>) {
    let present: Vec<String> = names
        .iter()
        .filter(|name| has_column(&df, name))
        .cloned()
        .collect();

    if present.is_empty() {
        return (df, present);
    }

    (df.drop_many(&present), present)
}

/// Read a column as optional strings, casting non-string dtypes
pub fn string_values(df: &DataFrame, name: &str) -> PipelineResult<Vec<Option<String>>> {
    let column = df.column(name)?;
    let cast = column.cast(&DataType::String)?;
    Ok(cast
        .str()?
        .into_iter()
        .map(|v| v.map(|s| s.to_string()))
        .collect())
}

/// Read a column as optional floats. Values that cannot be cast become `None`.
pub fn float_values(df: &DataFrame, name: &str) -> PipelineResult<Vec<Option<f64>>> {
    let column = df.column(name)?;
    let cast = column.cast(&DataType::Float64)?;
    Ok(cast.f64()?.into_iter().collect())
}

/// Count missing cells in a column: nulls, plus NaN for float columns
pub fn missing_count(column: &Column) -> PipelineResult<usize> {
    let nulls = column.null_count();
    if !column.dtype().is_float() {
        return Ok(nulls);
    }

    let cast = column.cast(&DataType::Float64)?;
    let nans = cast
        .f64()?
        .into_iter()
        .filter(|v| matches!(v, Some(x) if x.is_nan()))
        .count();

    Ok(nulls + nans)
}

/// Missing cell counts for every column that has at least one missing cell,
/// in frame order
pub fn columns_with_missing(df: &DataFrame) -> PipelineResult<Vec<(String, usize)>> {
    let mut result = Vec::new();
    for column in df.get_columns() {
        let count = missing_count(column)?;
        if count > 0 {
            result.push((column.name().to_string(), count));
        }
    }
    Ok(result)
}

/// Numeric or boolean dtypes are the only ones a feature matrix may carry
pub fn is_model_ready(dtype: &DataType) -> bool {
    dtype.is_primitive_numeric() || matches!(dtype, DataType::Boolean)
}

/// Keep only the rows whose flag is `true`
pub fn filter_rows(df: &DataFrame, keep: &[bool]) -> PipelineResult<DataFrame> {
    let mask: BooleanChunked = keep.iter().copied().collect();
    Ok(df.filter(&mask)?)
}

/// Take rows by position, in the given order
pub fn take_rows(df: &DataFrame, indices: &[usize]) -> PipelineResult<DataFrame> {
    let idx: Vec<IdxSize> = indices.iter().map(|&i| i as IdxSize).collect();
    let idx = IdxCa::from_vec("idx".into(), idx);
    Ok(df.take(&idx)?)
}
