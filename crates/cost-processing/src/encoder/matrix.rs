//! Dense row-major feature matrix.

use crate::error::{ProcessingError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Numeric feature matrix with named columns.
///
/// Rows are stored row-major; every row has exactly one value per feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureMatrix {
    feature_names: Vec<String>,
    rows: Vec<Vec<f64>>,
}

impl FeatureMatrix {
    /// Create a matrix, checking that every row matches the feature count.
    pub fn new(feature_names: Vec<String>, rows: Vec<Vec<f64>>) -> Result<Self> {
        let width = feature_names.len();
        if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != width) {
            return Err(ProcessingError::Configuration(format!(
                "Row {} has {} values, expected {}",
                i,
                row.len(),
                width
            )));
        }
        Ok(Self {
            feature_names,
            rows,
        })
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Vec<f64>> {
        self.rows
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Values of one feature across all rows.
    pub fn column_values(&self, index: usize) -> Vec<f64> {
        self.rows.iter().map(|row| row[index]).collect()
    }

    /// A new matrix holding the given rows, in the given order.
    pub fn select_rows(&self, indices: &[usize]) -> Self {
        Self {
            feature_names: self.feature_names.clone(),
            rows: indices.iter().map(|&i| self.rows[i].clone()).collect(),
        }
    }

    /// Convert to a polars DataFrame with one `Float64` column per feature.
    pub fn to_dataframe(&self) -> PolarsResult<DataFrame> {
        let columns = self
            .feature_names
            .iter()
            .enumerate()
            .map(|(i, name)| Series::new(name.as_str().into(), self.column_values(i)).into())
            .collect::<Vec<Column>>();
        DataFrame::new(columns)
    }
}
