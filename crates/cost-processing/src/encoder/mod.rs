//! Encoding stage: target extraction and one-hot expansion.
//!
//! The encoder splits a cleaned frame into a numeric [`FeatureMatrix`] and an
//! aligned target vector. Text columns are expanded into 0/1 indicator
//! columns named `{column}_{category}`; with `drop_first` the lowest sorted
//! category of every text column gets no indicator. Numeric columns come
//! first in their original order, followed by the indicator blocks.

mod matrix;
mod schema;

pub use matrix::FeatureMatrix;
pub use schema::{ColumnEncoding, DateDecomposition, EncodingSchema, indicator_name};

use crate::config::ProcessingConfig;
use crate::error::{ProcessingError, Result, ResultExt};
use crate::utils::{is_categorical_dtype, series_to_f64, series_to_strings};
use polars::prelude::*;
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

/// Encoded features, aligned target and the schema that produced them.
#[derive(Debug, Clone)]
pub struct EncodedDataset {
    pub features: FeatureMatrix,
    pub target: Vec<f64>,
    pub schema: EncodingSchema,
    /// Rows removed because a feature or the target was missing.
    pub rows_dropped: usize,
}

impl EncodedDataset {
    pub fn n_rows(&self) -> usize {
        self.target.len()
    }

    /// Features plus the target as the last column.
    pub fn to_dataframe(&self) -> PolarsResult<DataFrame> {
        let mut df = self.features.to_dataframe()?;
        df.with_column(Series::new(
            self.schema.target_column().into(),
            self.target.clone(),
        ))?;
        Ok(df)
    }
}

/// Fits an [`EncodingSchema`] and applies it.
#[derive(Debug, Clone, Default)]
pub struct FeatureEncoder {
    config: ProcessingConfig,
}

impl FeatureEncoder {
    pub fn new(config: ProcessingConfig) -> Self {
        Self { config }
    }

    /// Learn the column layout from a cleaned frame.
    pub fn fit(&self, df: &DataFrame) -> Result<EncodingSchema> {
        let target = self.config.target_column.as_str();
        if df.column(target).is_err() {
            return Err(ProcessingError::ColumnNotFound(target.to_string()));
        }

        let mut numeric = Vec::new();
        let mut one_hot = Vec::new();

        for column in df.get_columns() {
            let name = column.name().as_str();
            if name == target {
                continue;
            }

            if is_categorical_dtype(column.dtype()) {
                let values = series_to_strings(column.as_materialized_series())
                    .context(format!("Failed to read categories of '{}'", name))?;
                let sorted: BTreeSet<String> = values.into_iter().flatten().collect();
                let mut categories: Vec<String> = sorted.into_iter().collect();

                let dropped = if self.config.drop_first && !categories.is_empty() {
                    Some(categories.remove(0))
                } else {
                    None
                };

                debug!(
                    "Column '{}': {} categories encoded, baseline {:?}",
                    name,
                    categories.len(),
                    dropped
                );
                one_hot.push(ColumnEncoding::OneHot {
                    column: name.to_string(),
                    categories,
                    dropped,
                });
            } else {
                numeric.push(ColumnEncoding::Numeric {
                    column: name.to_string(),
                });
            }
        }

        numeric.extend(one_hot);
        EncodingSchema::new(
            target,
            numeric,
            Some(DateDecomposition::from_config(&self.config)),
        )
    }

    /// Fit the schema and encode the same frame.
    ///
    /// Fails when the frame is empty, the target column is missing or the
    /// target holds text that is not numeric.
    pub fn fit_transform(&self, df: &DataFrame) -> Result<EncodedDataset> {
        if df.height() == 0 {
            return Err(ProcessingError::Configuration(
                "Dataset contains no rows".to_string(),
            ));
        }

        let schema = self.fit(df)?;
        let features = schema.transform(df)?;
        let target = self.extract_target(df)?;

        let encoded = if self.config.drop_incomplete_rows {
            drop_incomplete(features, target, schema)?
        } else {
            EncodedDataset {
                features,
                target: target.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect(),
                schema,
                rows_dropped: 0,
            }
        };

        info!(
            "Encoded {} rows into {} features",
            encoded.n_rows(),
            encoded.features.n_features()
        );
        Ok(encoded)
    }

    fn extract_target(&self, df: &DataFrame) -> Result<Vec<Option<f64>>> {
        let name = self.config.target_column.as_str();
        let series = df.column(name)?.as_materialized_series();
        let values = series_to_f64(series).context("Failed to read target column")?;

        // A text target must parse wherever it is present.
        if is_categorical_dtype(series.dtype()) {
            let raw = series_to_strings(series)?;
            if let Some((row, text)) = raw
                .iter()
                .zip(&values)
                .enumerate()
                .find_map(|(i, (r, v))| match (r, v) {
                    (Some(text), None) => Some((i, text)),
                    _ => None,
                })
            {
                return Err(ProcessingError::Configuration(format!(
                    "Target column '{}' has non-numeric value '{}' at row {}",
                    name, text, row
                )));
            }
        }

        Ok(values)
    }
}

fn drop_incomplete(
    features: FeatureMatrix,
    target: Vec<Option<f64>>,
    schema: EncodingSchema,
) -> Result<EncodedDataset> {
    let names = features.feature_names().to_vec();
    let total = target.len();

    let (rows, target): (Vec<Vec<f64>>, Vec<f64>) = features
        .into_rows()
        .into_iter()
        .zip(target)
        .filter_map(|(row, y)| match y {
            Some(y) if y.is_finite() && row.iter().all(|v| v.is_finite()) => Some((row, y)),
            _ => None,
        })
        .unzip();

    let rows_dropped = total - target.len();
    if rows_dropped > 0 {
        warn!(
            "Dropped {} of {} rows with a missing feature or target value",
            rows_dropped, total
        );
    }

    Ok(EncodedDataset {
        features: FeatureMatrix::new(names, rows)?,
        target,
        schema,
        rows_dropped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_two_categories_give_one_indicator() {
        let df = df!(
            "cat" => ["X", "Y", "X"],
            "Cost" => [1.0, 2.0, 3.0]
        )
        .unwrap();

        let encoded = FeatureEncoder::default().fit_transform(&df).unwrap();
        assert_eq!(encoded.features.feature_names(), &["cat_Y"]);
        assert_eq!(
            encoded.features.rows(),
            &[vec![0.0], vec![1.0], vec![0.0]]
        );
        assert_eq!(encoded.target, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_three_categories_give_two_columns() {
        let df = df!(
            "tier" => ["C", "A", "B", "A"],
            "Cost" => [1.0, 2.0, 3.0, 4.0]
        )
        .unwrap();

        let encoded = FeatureEncoder::default().fit_transform(&df).unwrap();
        assert_eq!(encoded.features.feature_names(), &["tier_B", "tier_C"]);

        // Distinct categories map to distinct rows.
        let rows = encoded.features.rows();
        assert_ne!(rows[0], rows[1]);
        assert_ne!(rows[1], rows[2]);
        assert_ne!(rows[0], rows[2]);
        assert_eq!(rows[1], rows[3]);
    }

    #[test]
    fn test_without_drop_first_keeps_all_categories() {
        let config = ProcessingConfig::builder().drop_first(false).build().unwrap();
        let df = df!(
            "cat" => ["X", "Y"],
            "Cost" => [1.0, 2.0]
        )
        .unwrap();

        let encoded = FeatureEncoder::new(config).fit_transform(&df).unwrap();
        assert_eq!(encoded.features.feature_names(), &["cat_X", "cat_Y"]);
    }

    #[test]
    fn test_numeric_columns_come_first() {
        let df = df!(
            "Service" => ["a", "b"],
            "Quantity" => [3i64, 4],
            "Cost" => [1.0, 2.0],
            "Year" => [2024i32, 2024]
        )
        .unwrap();

        let encoded = FeatureEncoder::default().fit_transform(&df).unwrap();
        assert_eq!(
            encoded.features.feature_names(),
            &["Quantity", "Year", "Service_b"]
        );
        assert_eq!(encoded.features.rows()[1], vec![4.0, 2024.0, 1.0]);
    }

    #[test]
    fn test_missing_target_is_configuration_error() {
        let df = df!("cat" => ["X"]).unwrap();
        let err = FeatureEncoder::default().fit_transform(&df).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_text_target_must_be_numeric() {
        let df = df!(
            "cat" => ["X", "Y"],
            "Cost" => ["1.5", "cheap"]
        )
        .unwrap();
        let err = FeatureEncoder::default().fit_transform(&df).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_drop_incomplete_rows_keeps_alignment() {
        let config = ProcessingConfig::builder()
            .drop_incomplete_rows(true)
            .build()
            .unwrap();
        let df = df!(
            "Quantity" => [Some(1.0), None, Some(3.0), Some(4.0)],
            "Cost" => [Some(10.0), Some(20.0), None, Some(40.0)]
        )
        .unwrap();

        let encoded = FeatureEncoder::new(config).fit_transform(&df).unwrap();
        assert_eq!(encoded.rows_dropped, 2);
        assert_eq!(encoded.features.rows(), &[vec![1.0], vec![4.0]]);
        assert_eq!(encoded.target, vec![10.0, 40.0]);
    }

    #[test]
    fn test_default_drops_incomplete_rows() {
        let df = df!(
            "Quantity" => [Some(1.0), None, Some(2.0)],
            "Cost" => [Some(10.0), Some(15.0), Some(20.0)]
        )
        .unwrap();

        let encoded = FeatureEncoder::default().fit_transform(&df).unwrap();
        assert_eq!(encoded.rows_dropped, 1);
        assert_eq!(encoded.target, vec![10.0, 20.0]);
    }

    #[test]
    fn test_kept_missing_values_become_nan() {
        let config = ProcessingConfig::builder()
            .drop_incomplete_rows(false)
            .build()
            .unwrap();
        let df = df!(
            "Quantity" => [Some(1.0), None],
            "Cost" => [Some(10.0), None]
        )
        .unwrap();

        let encoded = FeatureEncoder::new(config).fit_transform(&df).unwrap();
        assert_eq!(encoded.n_rows(), 2);
        assert!(encoded.features.rows()[1][0].is_nan());
        assert!(encoded.target[1].is_nan());
    }

    #[test]
    fn test_to_dataframe_appends_target() {
        let df = df!(
            "cat" => ["X", "Y"],
            "Cost" => [1.0, 2.0]
        )
        .unwrap();
        let encoded = FeatureEncoder::default().fit_transform(&df).unwrap();
        let out = encoded.to_dataframe().unwrap();
        assert_eq!(crate::utils::column_names(&out), vec!["cat_Y", "Cost"]);
    }
}
