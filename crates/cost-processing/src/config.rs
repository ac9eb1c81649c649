//! Configuration types for cleaning and encoding.
//!
//! Column names are configuration, not part of the pipeline contract. The
//! defaults match the cost-analysis export (`UsageDate`, `Cost`).

use serde::{Deserialize, Serialize};

/// Default name of the date column decomposed by the cleaner.
pub const DEFAULT_DATE_COLUMN: &str = "UsageDate";

/// Default name of the regression target.
pub const DEFAULT_TARGET_COLUMN: &str = "Cost";

/// Configuration for the cleaning and encoding stages.
///
/// Use [`ProcessingConfig::builder()`] to create a validated configuration.
///
/// # Example
///
/// ```rust,ignore
/// use cost_processing::ProcessingConfig;
///
/// let config = ProcessingConfig::builder()
///     .date_column("BillingDate")
///     .target_column("PreTaxCost")
///     .drop_first(false)
///     .build()?;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingConfig {
    /// Column holding the usage date. Default: "UsageDate"
    pub date_column: String,

    /// Column holding the numeric regression target. Default: "Cost"
    pub target_column: String,

    /// Whether to remove exact duplicate rows. Default: true
    pub remove_duplicates: bool,

    /// Name of the appended year column. Default: "Year"
    pub year_column: String,

    /// Name of the appended month column. Default: "Month"
    pub month_column: String,

    /// Name of the appended day column. Default: "Day"
    pub day_column: String,

    /// Drop the first (lowest sorted) category of every categorical column.
    /// Default: true
    pub drop_first: bool,

    /// Remove rows with any missing feature or target value after encoding,
    /// such as rows whose date could not be parsed. When false, missing
    /// numeric values become NaN and training rejects them. Default: true
    pub drop_incomplete_rows: bool,

    /// Number of equal-width bins in the exploratory histograms. Default: 10
    pub histogram_bins: usize,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            date_column: DEFAULT_DATE_COLUMN.to_string(),
            target_column: DEFAULT_TARGET_COLUMN.to_string(),
            remove_duplicates: true,
            year_column: "Year".to_string(),
            month_column: "Month".to_string(),
            day_column: "Day".to_string(),
            drop_first: true,
            drop_incomplete_rows: true,
            histogram_bins: 10,
        }
    }
}

impl ProcessingConfig {
    /// Create a new configuration builder.
    pub fn builder() -> ProcessingConfigBuilder {
        ProcessingConfigBuilder::default()
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        let names = [
            ("date_column", &self.date_column),
            ("target_column", &self.target_column),
            ("year_column", &self.year_column),
            ("month_column", &self.month_column),
            ("day_column", &self.day_column),
        ];

        for (field, value) in names {
            if value.trim().is_empty() {
                return Err(ConfigValidationError::EmptyColumnName(field.to_string()));
            }
        }

        if self.date_column == self.target_column {
            return Err(ConfigValidationError::ConflictingColumns(
                self.date_column.clone(),
            ));
        }

        let derived = [&self.year_column, &self.month_column, &self.day_column];
        for (i, a) in derived.iter().enumerate() {
            if derived.iter().skip(i + 1).any(|b| a == b) || **a == self.target_column {
                return Err(ConfigValidationError::ConflictingColumns((*a).clone()));
            }
        }

        if self.histogram_bins == 0 {
            return Err(ConfigValidationError::InvalidHistogramBins(
                self.histogram_bins,
            ));
        }

        Ok(())
    }

    /// Names of the three columns appended by the cleaner, in append order.
    pub fn date_part_columns(&self) -> [&str; 3] {
        [
            self.year_column.as_str(),
            self.month_column.as_str(),
            self.day_column.as_str(),
        ]
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Column name for '{0}' must not be empty")]
    EmptyColumnName(String),

    #[error("Column name '{0}' is used for more than one role")]
    ConflictingColumns(String),

    #[error("Invalid histogram bins: {0} (must be at least 1)")]
    InvalidHistogramBins(usize),
}

impl From<ConfigValidationError> for crate::error::ProcessingError {
    fn from(err: ConfigValidationError) -> Self {
        crate::error::ProcessingError::Configuration(err.to_string())
    }
}

/// Builder for [`ProcessingConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct ProcessingConfigBuilder {
    date_column: Option<String>,
    target_column: Option<String>,
    remove_duplicates: Option<bool>,
    year_column: Option<String>,
    month_column: Option<String>,
    day_column: Option<String>,
    drop_first: Option<bool>,
    drop_incomplete_rows: Option<bool>,
    histogram_bins: Option<usize>,
}

impl ProcessingConfigBuilder {
    /// Set the date column decomposed into year/month/day.
    pub fn date_column(mut self, column: impl Into<String>) -> Self {
        self.date_column = Some(column.into());
        self
    }

    /// Set the regression target column.
    pub fn target_column(mut self, column: impl Into<String>) -> Self {
        self.target_column = Some(column.into());
        self
    }

    /// Enable or disable duplicate row removal.
    pub fn remove_duplicates(mut self, remove: bool) -> Self {
        self.remove_duplicates = Some(remove);
        self
    }

    /// Set the names of the appended year, month and day columns.
    pub fn date_part_columns(
        mut self,
        year: impl Into<String>,
        month: impl Into<String>,
        day: impl Into<String>,
    ) -> Self {
        self.year_column = Some(year.into());
        self.month_column = Some(month.into());
        self.day_column = Some(day.into());
        self
    }

    /// Keep or drop the first category of each categorical column.
    pub fn drop_first(mut self, drop: bool) -> Self {
        self.drop_first = Some(drop);
        self
    }

    /// Remove rows with missing feature or target values after encoding.
    pub fn drop_incomplete_rows(mut self, drop: bool) -> Self {
        self.drop_incomplete_rows = Some(drop);
        self
    }

    /// Set the number of histogram bins used by the exploratory profile.
    pub fn histogram_bins(mut self, bins: usize) -> Self {
        self.histogram_bins = Some(bins);
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `ProcessingConfig` or an error if validation fails.
    pub fn build(self) -> Result<ProcessingConfig, ConfigValidationError> {
        let defaults = ProcessingConfig::default();
        let config = ProcessingConfig {
            date_column: self.date_column.unwrap_or(defaults.date_column),
            target_column: self.target_column.unwrap_or(defaults.target_column),
            remove_duplicates: self.remove_duplicates.unwrap_or(defaults.remove_duplicates),
            year_column: self.year_column.unwrap_or(defaults.year_column),
            month_column: self.month_column.unwrap_or(defaults.month_column),
            day_column: self.day_column.unwrap_or(defaults.day_column),
            drop_first: self.drop_first.unwrap_or(defaults.drop_first),
            drop_incomplete_rows: self
                .drop_incomplete_rows
                .unwrap_or(defaults.drop_incomplete_rows),
            histogram_bins: self.histogram_bins.unwrap_or(defaults.histogram_bins),
        };

        config.validate()?;
        Ok(config)
    }
}
