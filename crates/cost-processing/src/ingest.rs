//! Reading and writing delimited text.
//!
//! The pipeline core consumes text that has already been fetched; where it
//! came from (a blob download, a local file) is the caller's concern.

use crate::error::{ProcessingError, Result, ResultExt};
use polars::prelude::*;
use std::io::Cursor;
use std::path::Path;
use tracing::{debug, info};

/// Number of rows used to infer column types.
const INFER_SCHEMA_LENGTH: usize = 1000;

/// Parse CSV text (with a header row) into a DataFrame.
///
/// Dates are left as text; the cleaner owns date parsing.
pub fn read_csv_str(text: &str) -> Result<DataFrame> {
    let cursor = Cursor::new(text.as_bytes().to_vec());

    let df = CsvReadOptions::default()
        .with_infer_schema_length(Some(INFER_SCHEMA_LENGTH))
        .with_has_header(true)
        .with_parse_options(CsvParseOptions::default().with_quote_char(Some(b'"')))
        .into_reader_with_file_handle(cursor)
        .finish()
        .context("Failed to read CSV data")?;

    if df.width() == 0 {
        return Err(ProcessingError::Configuration(
            "CSV data contains no columns".to_string(),
        ));
    }

    debug!("Parsed CSV with shape {:?}", df.shape());
    Ok(df)
}

/// Read a CSV file from disk.
pub fn read_csv_file(path: impl AsRef<Path>) -> Result<DataFrame> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .map_err(|e| ProcessingError::Io(e).with_context(format!("Reading {}", path.display())))?;
    let df = read_csv_str(&text)?;
    info!("Loaded {} rows and {} columns from {}", df.height(), df.width(), path.display());
    Ok(df)
}

/// Write a DataFrame as CSV with a header row.
pub fn write_csv_file(df: &mut DataFrame, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let file = std::fs::File::create(path)
        .map_err(|e| ProcessingError::Io(e).with_context(format!("Creating {}", path.display())))?;
    CsvWriter::new(file)
        .include_header(true)
        .finish(df)
        .context(format!("Failed to write {}", path.display()))?;
    info!("Wrote {} rows to {}", df.height(), path.display());
    Ok(())
}

/// Log the first rows of a dataset at info level.
pub fn log_preview(label: &str, df: &DataFrame) {
    info!("{} (first 5 rows):\n{}", label, df.head(Some(5)));
}
