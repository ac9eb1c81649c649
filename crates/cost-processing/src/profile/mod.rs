//! Exploratory profile of a cleaned dataset.
//!
//! Produces the numbers behind the usual exploratory charts: per-column
//! distributions, a correlation matrix over numeric columns and a summary of
//! every numeric feature grouped by target quartile. Nothing is rendered; the
//! report is written as JSON.

mod statistics;

pub use statistics::HistogramBin;

use crate::config::ProcessingConfig;
use crate::error::{ProcessingError, Result, ResultExt};
use crate::utils::{is_categorical_dtype, is_numeric_dtype, series_to_f64, series_to_strings};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

/// Number of target buckets used for the grouped summaries.
const TARGET_BUCKETS: usize = 4;

/// Number of most frequent values listed for text columns.
const TOP_VALUES: usize = 5;

/// Distribution of one numeric column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericColumnProfile {
    pub name: String,
    pub count: usize,
    pub null_count: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub q25: Option<f64>,
    pub median: Option<f64>,
    pub q75: Option<f64>,
    pub max: Option<f64>,
    pub histogram: Vec<HistogramBin>,
}

/// Frequency summary of one text column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoricalColumnProfile {
    pub name: String,
    pub distinct: usize,
    pub null_count: usize,
    /// Most frequent values with their counts, most frequent first.
    pub top_values: Vec<(String, usize)>,
}

/// Pairwise Pearson correlations; `None` where undefined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    pub values: Vec<Vec<Option<f64>>>,
}

impl CorrelationMatrix {
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.columns.iter().position(|c| c == a)?;
        let j = self.columns.iter().position(|c| c == b)?;
        self.values[i][j]
    }
}

/// Statistics of a feature within one target bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketSummary {
    pub target_lower: f64,
    pub target_upper: f64,
    pub count: usize,
    pub min: Option<f64>,
    pub median: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
}

/// A numeric feature summarised per target quartile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetGroupSummary {
    pub column: String,
    pub buckets: Vec<BucketSummary>,
}

/// Exploratory report over a cleaned dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileReport {
    pub row_count: usize,
    pub column_count: usize,
    pub target_column: String,
    pub target: Option<NumericColumnProfile>,
    pub numeric_columns: Vec<NumericColumnProfile>,
    pub categorical_columns: Vec<CategoricalColumnProfile>,
    pub correlation: CorrelationMatrix,
    pub by_target: Vec<TargetGroupSummary>,
}

impl ProfileReport {
    /// Write the report as pretty-printed JSON.
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .map_err(|e| ProcessingError::Io(e).with_context(format!("Writing {}", path.display())))?;
        info!("Profile report written to {}", path.display());
        Ok(())
    }

    pub fn numeric_column(&self, name: &str) -> Option<&NumericColumnProfile> {
        self.numeric_columns.iter().find(|c| c.name == name)
    }
}

/// Builds a [`ProfileReport`].
#[derive(Debug, Clone, Default)]
pub struct DataProfiler {
    config: ProcessingConfig,
}

impl DataProfiler {
    pub fn new(config: ProcessingConfig) -> Self {
        Self { config }
    }

    /// Profile a cleaned frame.
    ///
    /// The target column is profiled separately and excluded from the
    /// per-feature lists, but it takes part in the correlation matrix.
    pub fn profile(&self, df: &DataFrame) -> Result<ProfileReport> {
        let target_name = self.config.target_column.as_str();
        let bins = self.config.histogram_bins;

        let mut numeric: Vec<(String, Vec<Option<f64>>)> = Vec::new();
        let mut categorical_columns = Vec::new();

        for column in df.get_columns() {
            let name = column.name().to_string();
            let series = column.as_materialized_series();

            if is_numeric_dtype(series.dtype()) || name == target_name {
                let values = series_to_f64(series)
                    .context(format!("Failed to read numeric column '{}'", name))?;
                numeric.push((name, values));
            } else if is_categorical_dtype(series.dtype()) {
                categorical_columns.push(categorical_profile(&name, series)?);
            } else {
                debug!("Skipping column '{}' with dtype {}", name, series.dtype());
            }
        }

        let target_values = numeric
            .iter()
            .find(|(name, _)| name == target_name)
            .map(|(_, values)| values.clone());

        let target = target_values
            .as_ref()
            .map(|values| numeric_profile(target_name, values, bins));

        let numeric_columns: Vec<NumericColumnProfile> = numeric
            .iter()
            .filter(|(name, _)| name != target_name)
            .map(|(name, values)| numeric_profile(name, values, bins))
            .collect();

        let correlation = correlation_matrix(&numeric);

        let by_target = match &target_values {
            Some(target) => numeric
                .iter()
                .filter(|(name, _)| name != target_name)
                .map(|(name, values)| target_group_summary(name, values, target))
                .collect(),
            None => Vec::new(),
        };

        info!(
            "Profiled {} numeric and {} text columns",
            numeric_columns.len(),
            categorical_columns.len()
        );

        Ok(ProfileReport {
            row_count: df.height(),
            column_count: df.width(),
            target_column: target_name.to_string(),
            target,
            numeric_columns,
            categorical_columns,
            correlation,
            by_target,
        })
    }
}

fn present(values: &[Option<f64>]) -> Vec<f64> {
    values
        .iter()
        .flatten()
        .copied()
        .filter(|v| v.is_finite())
        .collect()
}

fn numeric_profile(name: &str, values: &[Option<f64>], bins: usize) -> NumericColumnProfile {
    let observed = present(values);
    let sorted = statistics::sorted(&observed);

    NumericColumnProfile {
        name: name.to_string(),
        count: observed.len(),
        null_count: values.len() - observed.len(),
        mean: statistics::mean(&observed),
        std: statistics::std_dev(&observed),
        min: sorted.first().copied(),
        q25: statistics::quantile(&sorted, 0.25),
        median: statistics::quantile(&sorted, 0.5),
        q75: statistics::quantile(&sorted, 0.75),
        max: sorted.last().copied(),
        histogram: statistics::histogram(&observed, bins),
    }
}

fn categorical_profile(name: &str, series: &Series) -> Result<CategoricalColumnProfile> {
    let values = series_to_strings(series)?;
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut null_count = 0;
    for value in values {
        match value {
            Some(v) => *counts.entry(v).or_default() += 1,
            None => null_count += 1,
        }
    }

    let distinct = counts.len();
    let mut top_values: Vec<(String, usize)> = counts.into_iter().collect();
    top_values.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    top_values.truncate(TOP_VALUES);

    Ok(CategoricalColumnProfile {
        name: name.to_string(),
        distinct,
        null_count,
        top_values,
    })
}

fn correlation_matrix(numeric: &[(String, Vec<Option<f64>>)]) -> CorrelationMatrix {
    let columns: Vec<String> = numeric.iter().map(|(name, _)| name.clone()).collect();
    let values = numeric
        .iter()
        .map(|(_, a)| {
            numeric
                .iter()
                .map(|(_, b)| statistics::pearson(a, b))
                .collect()
        })
        .collect();
    CorrelationMatrix { columns, values }
}

fn target_group_summary(
    name: &str,
    values: &[Option<f64>],
    target: &[Option<f64>],
) -> TargetGroupSummary {
    let sorted_target = statistics::sorted(&present(target));
    let edges: Vec<f64> = (0..=TARGET_BUCKETS)
        .filter_map(|i| statistics::quantile(&sorted_target, i as f64 / TARGET_BUCKETS as f64))
        .collect();

    if edges.len() < 2 {
        return TargetGroupSummary {
            column: name.to_string(),
            buckets: Vec::new(),
        };
    }

    let mut grouped: Vec<Vec<f64>> = vec![Vec::new(); TARGET_BUCKETS];
    for (value, y) in values.iter().zip(target) {
        let (Some(value), Some(y)) = (value, y) else {
            continue;
        };
        if !value.is_finite() || !y.is_finite() {
            continue;
        }
        // Last edge is inclusive.
        let bucket = edges[1..]
            .iter()
            .position(|upper| y < upper)
            .unwrap_or(TARGET_BUCKETS - 1);
        grouped[bucket].push(*value);
    }

    let buckets = grouped
        .iter()
        .enumerate()
        .map(|(i, members)| {
            let sorted = statistics::sorted(members);
            BucketSummary {
                target_lower: edges[i],
                target_upper: edges[i + 1],
                count: members.len(),
                min: sorted.first().copied(),
                median: statistics::quantile(&sorted, 0.5),
                max: sorted.last().copied(),
                mean: statistics::mean(members),
            }
        })
        .collect();

    TargetGroupSummary {
        column: name.to_string(),
        buckets,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn cleaned() -> DataFrame {
        df!(
            "ServiceName" => ["Storage", "Compute", "Storage", "Network"],
            "Quantity" => [Some(1.0), Some(2.0), Some(3.0), None],
            "Cost" => [10.0, 20.0, 30.0, 40.0],
            "Year" => [2024i32, 2024, 2024, 2024]
        )
        .unwrap()
    }

    #[test]
    fn test_profile_excludes_target_from_features() {
        let report = DataProfiler::default().profile(&cleaned()).unwrap();

        assert_eq!(report.row_count, 4);
        let names: Vec<&str> = report.numeric_columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Quantity", "Year"]);
        assert_eq!(report.target.as_ref().unwrap().mean, Some(25.0));
    }

    #[test]
    fn test_numeric_profile_counts_nulls() {
        let report = DataProfiler::default().profile(&cleaned()).unwrap();
        let quantity = report.numeric_column("Quantity").unwrap();
        assert_eq!(quantity.count, 3);
        assert_eq!(quantity.null_count, 1);
        assert_eq!(quantity.median, Some(2.0));
        assert_eq!(quantity.histogram.iter().map(|b| b.count).sum::<usize>(), 3);
    }

    #[test]
    fn test_categorical_profile() {
        let report = DataProfiler::default().profile(&cleaned()).unwrap();
        let service = &report.categorical_columns[0];
        assert_eq!(service.distinct, 3);
        assert_eq!(service.top_values[0], ("Storage".to_string(), 2));
    }

    #[test]
    fn test_correlation_includes_target() {
        let report = DataProfiler::default().profile(&cleaned()).unwrap();
        let r = report.correlation.get("Quantity", "Cost").unwrap();
        assert!((r - 1.0).abs() < 1e-12);
        assert_eq!(report.correlation.get("Year", "Cost"), None);
    }

    #[test]
    fn test_target_buckets_cover_rows() {
        let report = DataProfiler::default().profile(&cleaned()).unwrap();
        let quantity = report
            .by_target
            .iter()
            .find(|s| s.column == "Quantity")
            .unwrap();
        assert_eq!(quantity.buckets.len(), 4);
        assert_eq!(quantity.buckets.iter().map(|b| b.count).sum::<usize>(), 3);
    }

    #[test]
    fn test_write_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profile.json");
        let report = DataProfiler::default().profile(&cleaned()).unwrap();
        report.write_to_file(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let restored: ProfileReport = serde_json::from_str(&text).unwrap();
        assert_eq!(restored.target_column, "Cost");
        assert_eq!(restored.numeric_columns.len(), 2);
    }
}
