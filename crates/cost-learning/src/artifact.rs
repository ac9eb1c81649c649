//! Persisted model artifact.
//!
//! A [`ModelArtifact`] bundles the fitted forest with everything needed to
//! use it later: the encoding schema, the configurations it was trained
//! with, its held-out metrics and descriptive metadata. It is stored as a
//! single JSON document.
//!
//! | Method | Use Case |
//! |--------|----------|
//! | [`save()`](ModelArtifact::save) / [`load()`](ModelArtifact::load) | File-based persistence |
//! | [`to_bytes()`](ModelArtifact::to_bytes) / [`from_bytes()`](ModelArtifact::from_bytes) | Storage or network transfer |

use crate::config::TrainingConfig;
use crate::error::{LearningError, Result};
use crate::forest::RandomForestRegressor;
use crate::metrics::RegressionMetrics;
use crate::trainer::TrainingOutcome;
use chrono::{DateTime, Utc};
use cost_processing::{EncodingSchema, ProcessingConfig};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

/// Version of the on-disk layout. Bumped on incompatible changes.
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

/// Description recorded for every trained model.
pub const MODEL_DESCRIPTION: &str = "Random Forest Regressor for Cost Prediction";

/// A trained model with its schema and metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub format_version: u32,
    pub name: String,
    pub description: String,
    pub tags: BTreeMap<String, String>,
    pub trained_at: DateTime<Utc>,
    pub processing: ProcessingConfig,
    pub training: TrainingConfig,
    pub schema: EncodingSchema,
    pub metrics: RegressionMetrics,
    pub feature_importance: Vec<(String, f64)>,
    pub train_rows: usize,
    pub test_rows: usize,
    pub model: RandomForestRegressor,
}

/// Metadata of an artifact, without the trees.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelInfo {
    pub name: String,
    pub description: String,
    pub tags: BTreeMap<String, String>,
    pub trained_at: DateTime<Utc>,
    pub target_column: String,
    pub n_features: usize,
    pub n_trees: usize,
    pub train_rows: usize,
    pub test_rows: usize,
    pub metrics: RegressionMetrics,
}

impl ModelArtifact {
    /// Assemble an artifact from a finished training run.
    pub fn from_training(
        outcome: TrainingOutcome,
        schema: EncodingSchema,
        processing: ProcessingConfig,
        training: TrainingConfig,
    ) -> Self {
        let tags = BTreeMap::from([
            ("type".to_string(), "regression".to_string()),
            ("algorithm".to_string(), "RandomForest".to_string()),
        ]);

        Self {
            format_version: ARTIFACT_FORMAT_VERSION,
            name: training.model_name.clone(),
            description: MODEL_DESCRIPTION.to_string(),
            tags,
            trained_at: Utc::now(),
            processing,
            training,
            schema,
            metrics: outcome.metrics,
            feature_importance: outcome.feature_importance,
            train_rows: outcome.train_rows,
            test_rows: outcome.test_rows,
            model: outcome.model,
        }
    }

    /// Number of features the model expects.
    pub fn n_features(&self) -> usize {
        self.model.n_features()
    }

    pub fn info(&self) -> ModelInfo {
        ModelInfo {
            name: self.name.clone(),
            description: self.description.clone(),
            tags: self.tags.clone(),
            trained_at: self.trained_at,
            target_column: self.schema.target_column().to_string(),
            n_features: self.n_features(),
            n_trees: self.model.n_trees(),
            train_rows: self.train_rows,
            test_rows: self.test_rows,
            metrics: self.metrics,
        }
    }

    /// Check that the parts of the artifact agree with each other.
    pub fn verify(&self) -> Result<()> {
        if self.format_version != ARTIFACT_FORMAT_VERSION {
            return Err(LearningError::Deserialization(format!(
                "unsupported format version {} (expected {})",
                self.format_version, ARTIFACT_FORMAT_VERSION
            )));
        }
        self.schema
            .verify()
            .map_err(|e| LearningError::Deserialization(e.to_string()))?;
        self.model.verify().map_err(LearningError::Deserialization)?;

        if self.schema.n_features() != self.model.n_features() {
            return Err(LearningError::Deserialization(format!(
                "schema has {} features but model expects {}",
                self.schema.n_features(),
                self.model.n_features()
            )));
        }
        Ok(())
    }

    /// Serialize to JSON bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Deserialize from JSON bytes and verify.
    ///
    /// # Errors
    ///
    /// Returns [`LearningError::Deserialization`] if the bytes are not a
    /// valid artifact.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let artifact: Self = serde_json::from_slice(bytes)
            .map_err(|e| LearningError::Deserialization(e.to_string()))?;
        artifact.verify()?;
        Ok(artifact)
    }

    /// Write the artifact as pretty-printed JSON. Parent directories must
    /// exist.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        info!("Model saved as {}", path.display());
        Ok(())
    }

    /// Read and verify an artifact.
    ///
    /// # Errors
    ///
    /// Returns [`LearningError::Deserialization`] if the file is missing,
    /// unreadable, corrupted or inconsistent.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| {
            LearningError::Deserialization(format!("cannot read {}: {}", path.display(), e))
        })?;
        let artifact = Self::from_bytes(&bytes).map_err(|e| match e {
            LearningError::Deserialization(msg) => {
                LearningError::Deserialization(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })?;
        debug!("Loaded model '{}' from {}", artifact.name, path.display());
        Ok(artifact)
    }
}
