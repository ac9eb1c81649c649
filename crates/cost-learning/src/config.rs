//! Configuration types for training.
//!
//! This module provides [`TrainingConfig`], its builder, and [`MaxFeatures`],
//! the per-split feature sampling rule of the forest.
//!
//! # Example
//!
//! ```
//! use cost_learning::{MaxFeatures, TrainingConfig};
//!
//! let config = TrainingConfig::builder()
//!     .n_estimators(200)
//!     .max_depth(12)
//!     .max_features(MaxFeatures::Sqrt)
//!     .build()
//!     .expect("valid config");
//! ```

use crate::error::LearningError;
use serde::{Deserialize, Serialize};

/// Default model name recorded in artifacts.
pub const DEFAULT_MODEL_NAME: &str = "cost-prediction-model";

/// How many features each split considers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MaxFeatures {
    /// Every feature (the usual choice for regression forests).
    #[default]
    All,
    /// `sqrt(n_features)`, rounded down, at least 1.
    Sqrt,
    /// `log2(n_features)`, rounded down, at least 1.
    Log2,
    /// A fixed number of features, capped at `n_features`.
    Count(usize),
    /// A fraction of the features in `(0.0, 1.0]`, at least 1.
    Fraction(f64),
}

impl MaxFeatures {
    /// Number of features to sample for a model with `n_features` inputs.
    #[must_use]
    pub fn resolve(&self, n_features: usize) -> usize {
        let n = n_features as f64;
        let k = match self {
            MaxFeatures::All => n_features,
            MaxFeatures::Sqrt => n.sqrt() as usize,
            MaxFeatures::Log2 => n.log2() as usize,
            MaxFeatures::Count(count) => *count,
            MaxFeatures::Fraction(fraction) => (n * fraction) as usize,
        };
        k.clamp(1, n_features.max(1))
    }
}

/// Configuration for splitting, fitting and recording a model.
///
/// Defaults: a 20% held-out test set, seed 42 and a 100-tree forest grown
/// to full depth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Fraction of rows held out for evaluation (default: 0.2).
    ///
    /// Must be in `(0.0, 1.0)`.
    pub test_size: f64,

    /// Seed for the split shuffle and the forest (default: 42).
    pub random_seed: u64,

    /// Number of trees (default: 100).
    pub n_estimators: usize,

    /// Maximum tree depth; `None` grows until leaves are pure (default: `None`).
    pub max_depth: Option<usize>,

    /// Minimum samples required to split a node (default: 2).
    pub min_samples_split: usize,

    /// Minimum samples in each leaf (default: 1).
    pub min_samples_leaf: usize,

    /// Features considered per split (default: all).
    pub max_features: MaxFeatures,

    /// Draw a bootstrap sample for each tree (default: true).
    pub bootstrap: bool,

    /// Name recorded in the artifact (default: "cost-prediction-model").
    pub model_name: String,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            test_size: 0.2,
            random_seed: 42,
            n_estimators: 100,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::All,
            bootstrap: true,
            model_name: DEFAULT_MODEL_NAME.to_string(),
        }
    }
}

impl TrainingConfig {
    /// Create a new builder for `TrainingConfig`.
    #[must_use]
    pub fn builder() -> TrainingConfigBuilder {
        TrainingConfigBuilder::default()
    }

    /// Check every constraint listed on [`TrainingConfigBuilder::build`].
    pub fn validate(&self) -> Result<(), LearningError> {
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(LearningError::Configuration(
                "test_size must be between 0.0 and 1.0 (exclusive)".to_string(),
            ));
        }

        if self.n_estimators == 0 {
            return Err(LearningError::Configuration(
                "n_estimators must be at least 1".to_string(),
            ));
        }

        if self.max_depth == Some(0) {
            return Err(LearningError::Configuration(
                "max_depth must be at least 1".to_string(),
            ));
        }

        if self.min_samples_split < 2 {
            return Err(LearningError::Configuration(
                "min_samples_split must be at least 2".to_string(),
            ));
        }

        if self.min_samples_leaf == 0 {
            return Err(LearningError::Configuration(
                "min_samples_leaf must be at least 1".to_string(),
            ));
        }

        match self.max_features {
            MaxFeatures::Count(0) => {
                return Err(LearningError::Configuration(
                    "max_features count must be at least 1".to_string(),
                ));
            }
            MaxFeatures::Fraction(f) if !(f > 0.0 && f <= 1.0) => {
                return Err(LearningError::Configuration(
                    "max_features fraction must be in (0.0, 1.0]".to_string(),
                ));
            }
            _ => {}
        }

        if self.model_name.trim().is_empty() {
            return Err(LearningError::Configuration(
                "model_name must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

/// Builder for [`TrainingConfig`].
///
/// Created via [`TrainingConfig::builder()`]. All setters return `self` to
/// allow method chaining.
#[derive(Debug, Clone, Default)]
pub struct TrainingConfigBuilder {
    config: TrainingConfig,
}

impl TrainingConfigBuilder {
    /// Set the held-out fraction.
    #[must_use]
    pub fn test_size(mut self, size: f64) -> Self {
        self.config.test_size = size;
        self
    }

    /// Set the seed used by the split and the forest.
    #[must_use]
    pub fn random_seed(mut self, seed: u64) -> Self {
        self.config.random_seed = seed;
        self
    }

    /// Set the number of trees.
    #[must_use]
    pub fn n_estimators(mut self, n: usize) -> Self {
        self.config.n_estimators = n;
        self
    }

    /// Limit tree depth.
    #[must_use]
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.config.max_depth = Some(depth);
        self
    }

    #[must_use]
    pub fn min_samples_split(mut self, n: usize) -> Self {
        self.config.min_samples_split = n;
        self
    }

    #[must_use]
    pub fn min_samples_leaf(mut self, n: usize) -> Self {
        self.config.min_samples_leaf = n;
        self
    }

    #[must_use]
    pub fn max_features(mut self, max_features: MaxFeatures) -> Self {
        self.config.max_features = max_features;
        self
    }

    #[must_use]
    pub fn bootstrap(mut self, bootstrap: bool) -> Self {
        self.config.bootstrap = bootstrap;
        self
    }

    /// Set the model name recorded in the artifact.
    #[must_use]
    pub fn model_name(mut self, name: impl Into<String>) -> Self {
        self.config.model_name = name.into();
        self
    }

    /// Build the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`LearningError::Configuration`] if:
    /// - `test_size` is not in range `(0.0, 1.0)`
    /// - `n_estimators`, `max_depth` or `min_samples_leaf` is 0
    /// - `min_samples_split` is less than 2
    /// - `max_features` asks for zero features
    /// - `model_name` is blank
    pub fn build(self) -> Result<TrainingConfig, LearningError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
