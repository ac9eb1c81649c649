//! Inference against a persisted model.
//!
//! A [`Scorer`] wraps a verified [`ModelArtifact`] and answers three kinds
//! of requests:
//!
//! - an already encoded feature vector ([`predict`](Scorer::predict)),
//! - a raw JSON record, encoded with the stored schema
//!   ([`predict_record`](Scorer::predict_record)),
//! - a scoring request body `{"input": [...]}`
//!   ([`score_request`](Scorer::score_request)).
//!
//! # Example
//!
//! ```no_run
//! use cost_learning::Scorer;
//! use serde_json::json;
//!
//! let scorer = Scorer::load("model.json")?;
//! let cost = scorer.predict_record(&json!({
//!     "UsageDate": "2024-03-01",
//!     "ServiceName": "Compute",
//!     "ResourceGroup": "rg-prod",
//!     "Quantity": 12.5
//! }))?;
//! println!("Predicted cost: {cost:.2}");
//! # Ok::<(), cost_learning::LearningError>(())
//! ```

use crate::artifact::ModelArtifact;
use crate::error::{LearningError, Result};
use polars::prelude::*;
use serde_json::{Value, json};
use std::path::Path;
use tracing::{debug, warn};

/// Column appended by [`Scorer::predict_frame`].
pub const PREDICTION_COLUMN: &str = "prediction";

/// Loaded model ready for scoring.
#[derive(Debug, Clone)]
pub struct Scorer {
    artifact: ModelArtifact,
}

static_assertions::assert_impl_all!(Scorer: Send, Sync);

impl Scorer {
    /// Load and verify an artifact from disk.
    ///
    /// # Errors
    ///
    /// Returns [`LearningError::Deserialization`] for a missing, unreadable,
    /// corrupted or inconsistent artifact.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let artifact = ModelArtifact::load(path)?;
        Ok(Self { artifact })
    }

    /// Wrap an artifact that is already in memory.
    pub fn from_artifact(artifact: ModelArtifact) -> Result<Self> {
        artifact.verify()?;
        Ok(Self { artifact })
    }

    pub fn artifact(&self) -> &ModelArtifact {
        &self.artifact
    }

    /// Input dimensionality of the model.
    pub fn n_features(&self) -> usize {
        self.artifact.n_features()
    }

    pub fn feature_names(&self) -> &[String] {
        self.artifact.schema.feature_names()
    }

    /// Predict the cost for one encoded feature vector.
    ///
    /// # Errors
    ///
    /// - [`LearningError::SchemaMismatch`] when `features.len()` differs from
    ///   [`n_features`](Self::n_features).
    /// - [`LearningError::Configuration`] when a value is missing or not
    ///   finite.
    pub fn predict(&self, features: &[f64]) -> Result<f64> {
        let expected = self.n_features();
        if features.len() != expected {
            return Err(LearningError::SchemaMismatch {
                expected,
                actual: features.len(),
            });
        }
        if let Some(i) = features.iter().position(|v| !v.is_finite()) {
            return Err(LearningError::Configuration(format!(
                "Feature '{}' is missing or not finite",
                self.feature_names()[i]
            )));
        }
        self.artifact.model.predict_row(features)
    }

    /// Predict every row; fails on the first invalid row.
    pub fn predict_batch(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>> {
        rows.iter().map(|row| self.predict(row)).collect()
    }

    /// Encode a raw JSON record with the stored schema and predict.
    ///
    /// Unknown fields are ignored. Known fields that are absent count as 0
    /// and unseen categories set no indicator.
    pub fn predict_record(&self, record: &Value) -> Result<f64> {
        let Value::Object(map) = record else {
            return Err(LearningError::Configuration(format!(
                "Record must be a JSON object, got {}",
                record
            )));
        };
        let features = self.artifact.schema.encode_record(map)?;
        debug!("Encoded record into {} features", features.len());
        self.predict(&features)
    }

    /// Encode a cleaned frame with the stored schema and return it with a
    /// `prediction` column appended.
    pub fn predict_frame(&self, df: &DataFrame) -> Result<DataFrame> {
        let matrix = self.artifact.schema.transform(df)?;
        let predictions = self.predict_batch(matrix.rows())?;

        let mut out = df.clone();
        out.with_column(Series::new(PREDICTION_COLUMN.into(), predictions))
            .map_err(cost_processing::ProcessingError::from)?;
        Ok(out)
    }

    /// Answer a scoring request body.
    ///
    /// The request is `{"input": [...]}`. Nested arrays are flattened into a
    /// single feature vector. The response is `{"prediction": [value]}` on
    /// success and `{"error": "<message>"}` on any failure.
    pub fn score_request(&self, body: &str) -> String {
        let response = match self.score_request_inner(body) {
            Ok(prediction) => json!({ "prediction": [prediction] }),
            Err(e) => {
                warn!("Scoring request failed: {}", e);
                json!({ "error": e.to_string() })
            }
        };
        response.to_string()
    }

    fn score_request_inner(&self, body: &str) -> Result<f64> {
        let request: Value = serde_json::from_str(body)?;
        let input = request.get("input").ok_or_else(|| {
            LearningError::Configuration("Request has no 'input' field".to_string())
        })?;

        let mut features = Vec::new();
        flatten_numbers(input, &mut features)?;
        self.predict(&features)
    }
}

fn flatten_numbers(value: &Value, out: &mut Vec<f64>) -> Result<()> {
    match value {
        Value::Array(items) => {
            for item in items {
                flatten_numbers(item, out)?;
            }
            Ok(())
        }
        Value::Number(n) => {
            let v = n.as_f64().ok_or_else(|| {
                LearningError::Configuration(format!("Input value {} is out of range", n))
            })?;
            out.push(v);
            Ok(())
        }
        other => Err(LearningError::Configuration(format!(
            "Input values must be numbers, got {}",
            other
        ))),
    }
}
