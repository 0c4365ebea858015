//! Dataset loading and saving for CSV and Parquet files

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use polars::prelude::*;

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

/// Load a dataset from a file (CSV or Parquet based on extension).
///
/// # Arguments
/// * `path` - Input file
/// * `infer_schema_length` - Rows inspected to infer CSV types, `None` for all
pub fn load_dataset(path: &Path, infer_schema_length: Option<usize>) -> Result<DataFrame> {
    let extension = extension_of(path);

    let lf = match extension.as_str() {
        "csv" => LazyCsvReader::new(path)
            .with_infer_schema_length(infer_schema_length)
            .finish()
            .with_context(|| format!("Failed to load CSV file: {}", path.display()))?,
        "parquet" => LazyFrame::scan_parquet(path, Default::default())
            .with_context(|| format!("Failed to load Parquet file: {}", path.display()))?,
        _ => anyhow::bail!(
            "Unsupported file format: {}. Supported formats: csv, parquet",
            extension
        ),
    };

    let df = lf
        .collect()
        .with_context(|| format!("Failed to read dataset: {}", path.display()))?;

    tracing::info!(
        path = %path.display(),
        rows = df.height(),
        columns = df.width(),
        "Loaded dataset"
    );

    Ok(df)
}

/// Save dataset to file (CSV or Parquet based on extension)
pub fn save_dataset(df: &mut DataFrame, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let extension = extension_of(path);
    match extension.as_str() {
        "csv" => {
            let mut file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path.display()))?;
            CsvWriter::new(&mut file)
                .finish(df)
                .with_context(|| format!("Failed to write CSV file: {}", path.display()))?;
        }
        "parquet" => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path.display()))?;
            ParquetWriter::new(file)
                .finish(df)
                .with_context(|| format!("Failed to write Parquet file: {}", path.display()))?;
        }
        _ => anyhow::bail!(
            "Unsupported output format: {}. Supported formats: csv, parquet",
            extension
        ),
    }

    tracing::info!(path = %path.display(), rows = df.height(), "Saved dataset");
    Ok(())
}

/// Write one class label per line
pub fn write_predictions(predictions: &[u8], path: &Path) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create predictions file: {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    for label in predictions {
        writeln!(writer, "{}", label)?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to write predictions: {}", path.display()))?;
    Ok(())
}
