//! Cleaning stage: duplicate removal and date decomposition.
//!
//! The cleaner turns the raw export into a frame where the usage date has
//! been replaced by three integer columns (year, month, day) appended at the
//! end. Dates that cannot be parsed leave nulls in all three columns and are
//! reported rather than rejected.

mod dates;
mod dedup;

pub use dates::{DateParts, parse_date, parse_date_parts};
pub use dedup::remove_duplicates;

use crate::config::ProcessingConfig;
use crate::error::{ProcessingError, Result, ResultExt};
use crate::utils::series_to_strings;
use polars::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

/// A date value that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DateParseIssue {
    /// Row index in the de-duplicated frame.
    pub row: usize,
    /// The raw value, `None` when the cell was null.
    pub value: Option<String>,
}

/// Summary of what the cleaner did.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CleaningReport {
    pub rows_before: usize,
    pub rows_after: usize,
    pub duplicates_removed: usize,
    pub date_parse_failures: Vec<DateParseIssue>,
    pub actions: Vec<String>,
}

impl CleaningReport {
    /// Number of rows whose date could not be decomposed.
    pub fn date_parse_failure_count(&self) -> usize {
        self.date_parse_failures.len()
    }
}

/// Removes duplicates and decomposes the date column.
#[derive(Debug, Clone, Default)]
pub struct DataCleaner {
    config: ProcessingConfig,
}

impl DataCleaner {
    pub fn new(config: ProcessingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ProcessingConfig {
        &self.config
    }

    /// Clean a raw dataset.
    ///
    /// 1. Remove exact duplicate rows (first occurrence kept, order preserved)
    /// 2. Parse the date column and append year, month and day columns
    /// 3. Drop the original date column
    ///
    /// Fails with a configuration error when the dataset is empty or the date
    /// column is missing. Unparseable dates are not fatal.
    pub fn clean(&self, df: DataFrame) -> Result<(DataFrame, CleaningReport)> {
        let date_column = self.config.date_column.as_str();

        if df.height() == 0 {
            return Err(ProcessingError::Configuration(
                "Dataset contains no rows".to_string(),
            ));
        }
        if df.column(date_column).is_err() {
            return Err(ProcessingError::ColumnNotFound(date_column.to_string()));
        }

        info!("Cleaning dataset with {} rows", df.height());

        let mut report = CleaningReport {
            rows_before: df.height(),
            ..Default::default()
        };

        let mut df = if self.config.remove_duplicates {
            let (deduped, removed) =
                remove_duplicates(&df).context("Failed to remove duplicate rows")?;
            report.duplicates_removed = removed;
            if removed > 0 {
                report
                    .actions
                    .push(format!("Removed {} duplicate rows", removed));
            } else {
                report.actions.push("No duplicate rows found".to_string());
            }
            debug!("Removed {} duplicate rows", removed);
            deduped
        } else {
            df
        };

        report.date_parse_failures = self.decompose_dates(&mut df)?;
        report.actions.push(format!(
            "Decomposed '{}' into {}",
            date_column,
            self.config.date_part_columns().join(", ")
        ));

        if !report.date_parse_failures.is_empty() {
            warn!(
                "{} rows have unparseable values in '{}'; their date parts are null",
                report.date_parse_failures.len(),
                date_column
            );
            report.actions.push(format!(
                "{} rows had unparseable dates",
                report.date_parse_failures.len()
            ));
        }

        report.rows_after = df.height();
        info!(
            "Cleaning complete: {} -> {} rows",
            report.rows_before, report.rows_after
        );
        Ok((df, report))
    }

    /// Replace the date column with year, month and day columns.
    fn decompose_dates(&self, df: &mut DataFrame) -> Result<Vec<DateParseIssue>> {
        let date_column = self.config.date_column.as_str();
        let raw = series_to_strings(df.column(date_column)?.as_materialized_series())
            .context("Failed to read date column")?;

        let mut years = Vec::with_capacity(raw.len());
        let mut months = Vec::with_capacity(raw.len());
        let mut days = Vec::with_capacity(raw.len());
        let mut issues = Vec::new();

        for (row, value) in raw.into_iter().enumerate() {
            let parsed = value.as_deref().and_then(parse_date_parts);
            match parsed {
                Some(parts) => {
                    years.push(Some(parts.year));
                    months.push(Some(parts.month));
                    days.push(Some(parts.day));
                }
                None => {
                    years.push(None);
                    months.push(None);
                    days.push(None);
                    issues.push(DateParseIssue { row, value });
                }
            }
        }

        let [year_name, month_name, day_name] = self.config.date_part_columns();
        for (name, values) in [(year_name, years), (month_name, months), (day_name, days)] {
            if df.column(name).is_ok() {
                debug!("Replacing existing column '{}'", name);
            }
            df.with_column(Series::new(name.into(), values))?;
        }

        *df = df.drop(date_column)?;
        Ok(issues)
    }
}
