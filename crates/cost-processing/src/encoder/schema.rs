//! The fitted encoding: which columns become which features.
//!
//! An [`EncodingSchema`] is learned once from the training frame and then
//! replayed on new data, so training and scoring share one column layout.

use super::matrix::FeatureMatrix;
use crate::cleaner::parse_date_parts;
use crate::config::ProcessingConfig;
use crate::error::{ProcessingError, Result};
use crate::utils::{parse_numeric_string, series_to_f64, series_to_strings};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::collections::{HashMap, HashSet};

/// How one source column maps onto features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ColumnEncoding {
    /// Passed through as a single numeric feature.
    Numeric { column: String },
    /// Expanded into one 0/1 indicator per category.
    ///
    /// `categories` lists the encoded categories in feature order;
    /// `dropped` is the baseline category that has no indicator.
    OneHot {
        column: String,
        categories: Vec<String>,
        dropped: Option<String>,
    },
}

impl ColumnEncoding {
    pub fn column(&self) -> &str {
        match self {
            Self::Numeric { column } | Self::OneHot { column, .. } => column,
        }
    }

    /// Feature names this column produces, in order.
    pub fn feature_names(&self) -> Vec<String> {
        match self {
            Self::Numeric { column } => vec![column.clone()],
            Self::OneHot {
                column, categories, ..
            } => categories
                .iter()
                .map(|category| indicator_name(column, category))
                .collect(),
        }
    }

    pub fn width(&self) -> usize {
        match self {
            Self::Numeric { .. } => 1,
            Self::OneHot { categories, .. } => categories.len(),
        }
    }
}

/// Name of the indicator column for `category` of `column`.
pub fn indicator_name(column: &str, category: &str) -> String {
    format!("{}_{}", column, category)
}

/// Where the cleaner put the decomposed date, so raw records can be scored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateDecomposition {
    pub source_column: String,
    pub year_column: String,
    pub month_column: String,
    pub day_column: String,
}

impl DateDecomposition {
    pub fn from_config(config: &ProcessingConfig) -> Self {
        Self {
            source_column: config.date_column.clone(),
            year_column: config.year_column.clone(),
            month_column: config.month_column.clone(),
            day_column: config.day_column.clone(),
        }
    }
}

/// Fitted column layout of the feature matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodingSchema {
    target_column: String,
    columns: Vec<ColumnEncoding>,
    feature_names: Vec<String>,
    #[serde(default)]
    date_parts: Option<DateDecomposition>,
}

impl EncodingSchema {
    /// Build a schema from column encodings in feature order.
    ///
    /// Fails when two encodings would produce the same feature name.
    pub fn new(
        target_column: impl Into<String>,
        columns: Vec<ColumnEncoding>,
        date_parts: Option<DateDecomposition>,
    ) -> Result<Self> {
        let feature_names: Vec<String> = columns
            .iter()
            .flat_map(ColumnEncoding::feature_names)
            .collect();

        let mut seen = HashSet::with_capacity(feature_names.len());
        if let Some(duplicate) = feature_names.iter().find(|name| !seen.insert(name.as_str())) {
            return Err(ProcessingError::Configuration(format!(
                "Encoded feature name '{}' is produced by more than one column",
                duplicate
            )));
        }

        Ok(Self {
            target_column: target_column.into(),
            columns,
            feature_names,
            date_parts,
        })
    }

    pub fn target_column(&self) -> &str {
        &self.target_column
    }

    pub fn columns(&self) -> &[ColumnEncoding] {
        &self.columns
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    pub fn date_parts(&self) -> Option<&DateDecomposition> {
        self.date_parts.as_ref()
    }

    /// Check that the stored feature names agree with the column encodings.
    ///
    /// Used when a schema is read back from disk.
    pub fn verify(&self) -> Result<()> {
        let rebuilt = Self::new(
            self.target_column.clone(),
            self.columns.clone(),
            self.date_parts.clone(),
        )?;
        if rebuilt.feature_names != self.feature_names {
            return Err(ProcessingError::Configuration(
                "Stored feature names do not match the column encodings".to_string(),
            ));
        }
        Ok(())
    }

    /// Encode a frame with the fitted layout.
    ///
    /// Columns seen at fit time but missing here are filled with zeros.
    /// Columns not seen at fit time are ignored, as are categories not seen
    /// at fit time (their indicator block is all zeros). Null numeric values
    /// become `NaN`.
    pub fn transform(&self, df: &DataFrame) -> Result<FeatureMatrix> {
        let height = df.height();
        let mut rows = vec![Vec::with_capacity(self.n_features()); height];

        for encoding in &self.columns {
            let present = df
                .column(encoding.column())
                .ok()
                .map(|c| c.as_materialized_series());

            match (encoding, present) {
                (ColumnEncoding::Numeric { .. }, Some(series)) => {
                    for (row, value) in rows.iter_mut().zip(series_to_f64(series)?) {
                        row.push(value.unwrap_or(f64::NAN));
                    }
                }
                (ColumnEncoding::OneHot { categories, .. }, Some(series)) => {
                    let positions = category_positions(categories);
                    for (row, value) in rows.iter_mut().zip(series_to_strings(series)?) {
                        push_indicators(row, categories.len(), &positions, value.as_deref());
                    }
                }
                (encoding, None) => {
                    for row in rows.iter_mut() {
                        row.extend(std::iter::repeat_n(0.0, encoding.width()));
                    }
                }
            }
        }

        FeatureMatrix::new(self.feature_names.clone(), rows)
    }

    /// Encode a single JSON record with the fitted layout.
    ///
    /// Follows the same rules as [`transform`](Self::transform). When the
    /// record carries the raw date instead of its parts, the date is
    /// decomposed first.
    pub fn encode_record(&self, record: &Map<String, Value>) -> Result<Vec<f64>> {
        let record = self.decompose_record_date(record);
        let mut features = Vec::with_capacity(self.n_features());

        for encoding in &self.columns {
            let value = record.get(encoding.column());
            match encoding {
                ColumnEncoding::Numeric { column } => {
                    features.push(record_number(column, value)?);
                }
                ColumnEncoding::OneHot {
                    column, categories, ..
                } => {
                    let positions = category_positions(categories);
                    let text = record_category(column, value)?;
                    push_indicators(
                        &mut features,
                        categories.len(),
                        &positions,
                        text.as_deref(),
                    );
                }
            }
        }

        Ok(features)
    }

    fn decompose_record_date<'a>(&self, record: &'a Map<String, Value>) -> Cow<'a, Map<String, Value>> {
        let Some(parts) = &self.date_parts else {
            return Cow::Borrowed(record);
        };
        if record.contains_key(&parts.year_column) {
            return Cow::Borrowed(record);
        }
        let Some(Value::String(raw)) = record.get(&parts.source_column) else {
            return Cow::Borrowed(record);
        };

        let parsed = parse_date_parts(raw);
        let mut owned = record.clone();
        owned.insert(
            parts.year_column.clone(),
            parsed.map_or(Value::Null, |p| Value::from(p.year)),
        );
        owned.insert(
            parts.month_column.clone(),
            parsed.map_or(Value::Null, |p| Value::from(p.month)),
        );
        owned.insert(
            parts.day_column.clone(),
            parsed.map_or(Value::Null, |p| Value::from(p.day)),
        );
        Cow::Owned(owned)
    }
}

fn category_positions(categories: &[String]) -> HashMap<&str, usize> {
    categories
        .iter()
        .enumerate()
        .map(|(i, c)| (c.as_str(), i))
        .collect()
}

fn push_indicators(
    row: &mut Vec<f64>,
    width: usize,
    positions: &HashMap<&str, usize>,
    value: Option<&str>,
) {
    let start = row.len();
    row.extend(std::iter::repeat_n(0.0, width));
    if let Some(&pos) = value.and_then(|v| positions.get(v)) {
        row[start + pos] = 1.0;
    }
}

fn record_number(column: &str, value: Option<&Value>) -> Result<f64> {
    match value {
        None => Ok(0.0),
        Some(Value::Null) => Ok(f64::NAN),
        Some(Value::Bool(b)) => Ok(if *b { 1.0 } else { 0.0 }),
        Some(Value::Number(n)) => n.as_f64().ok_or_else(|| {
            ProcessingError::Configuration(format!("Value for '{}' is out of range", column))
        }),
        Some(Value::String(s)) => parse_numeric_string(s).ok_or_else(|| {
            ProcessingError::Configuration(format!(
                "Value '{}' for '{}' is not numeric",
                s, column
            ))
        }),
        Some(other) => Err(ProcessingError::Configuration(format!(
            "Value for '{}' must be a number, got {}",
            column, other
        ))),
    }
}

fn record_category(column: &str, value: Option<&Value>) -> Result<Option<String>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(Value::Bool(b)) => Ok(Some(b.to_string())),
        Some(other) => Err(ProcessingError::Configuration(format!(
            "Value for '{}' must be a scalar, got {}",
            column, other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn schema() -> EncodingSchema {
        EncodingSchema::new(
            "Cost",
            vec![
                ColumnEncoding::Numeric {
                    column: "Quantity".to_string(),
                },
                ColumnEncoding::OneHot {
                    column: "Service".to_string(),
                    categories: vec!["Compute".to_string(), "Storage".to_string()],
                    dropped: Some("Backup".to_string()),
                },
            ],
            None,
        )
        .unwrap()
    }

    #[test]
    fn test_feature_names() {
        assert_eq!(
            schema().feature_names(),
            &["Quantity", "Service_Compute", "Service_Storage"]
        );
    }

    #[test]
    fn test_duplicate_feature_names_rejected() {
        let result = EncodingSchema::new(
            "Cost",
            vec![
                ColumnEncoding::Numeric {
                    column: "cat_Y".to_string(),
                },
                ColumnEncoding::OneHot {
                    column: "cat".to_string(),
                    categories: vec!["Y".to_string()],
                    dropped: Some("X".to_string()),
                },
            ],
            None,
        );
        assert!(result.unwrap_err().is_configuration());
    }

    #[test]
    fn test_transform_aligns_columns() {
        let df = df!(
            "Service" => [Some("Storage"), Some("Backup"), Some("Network"), None],
            "Extra" => [1, 2, 3, 4]
        )
        .unwrap();

        let matrix = schema().transform(&df).unwrap();
        assert_eq!(
            matrix.rows(),
            &[
                vec![0.0, 0.0, 1.0],
                vec![0.0, 0.0, 0.0],
                vec![0.0, 0.0, 0.0],
                vec![0.0, 0.0, 0.0],
            ]
        );
    }

    #[test]
    fn test_transform_null_numeric_is_nan() {
        let df = df!(
            "Quantity" => [Some(2.0), None],
            "Service" => ["Compute", "Compute"]
        )
        .unwrap();
        let matrix = schema().transform(&df).unwrap();
        assert_eq!(matrix.rows()[0], vec![2.0, 1.0, 0.0]);
        assert!(matrix.rows()[1][0].is_nan());
    }

    #[test]
    fn test_encode_record() {
        let record = json!({"Quantity": 3, "Service": "Compute", "Unknown": "x"});
        let features = schema()
            .encode_record(record.as_object().unwrap())
            .unwrap();
        assert_eq!(features, vec![3.0, 1.0, 0.0]);
    }

    #[test]
    fn test_encode_record_missing_fields_are_zero() {
        let features = schema().encode_record(&Map::new()).unwrap();
        assert_eq!(features, vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_encode_record_rejects_text_for_numeric() {
        let record = json!({"Quantity": "lots"});
        let err = schema()
            .encode_record(record.as_object().unwrap())
            .unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_encode_record_decomposes_raw_date() {
        let schema = EncodingSchema::new(
            "Cost",
            vec![
                ColumnEncoding::Numeric {
                    column: "Year".to_string(),
                },
                ColumnEncoding::Numeric {
                    column: "Month".to_string(),
                },
                ColumnEncoding::Numeric {
                    column: "Day".to_string(),
                },
            ],
            Some(DateDecomposition::from_config(&ProcessingConfig::default())),
        )
        .unwrap();

        let record = json!({"UsageDate": "2024-03-09"});
        let features = schema.encode_record(record.as_object().unwrap()).unwrap();
        assert_eq!(features, vec![2024.0, 3.0, 9.0]);
    }

    #[test]
    fn test_schema_json_roundtrip_verifies() {
        let json = serde_json::to_string(&schema()).unwrap();
        let restored: EncodingSchema = serde_json::from_str(&json).unwrap();
        assert!(restored.verify().is_ok());
        assert_eq!(restored, schema());
    }
}
