//! Training and evaluation.
//!
//! [`Trainer`] splits an encoded dataset, fits a
//! [`RandomForestRegressor`] on the training side and scores it on the
//! held-out side.

use crate::config::TrainingConfig;
use crate::error::Result;
use crate::forest::{RandomForestRegressor, validate_training_data};
use crate::metrics::RegressionMetrics;
use crate::split::{SplitDataset, train_test_split};
use cost_processing::FeatureMatrix;
use tracing::info;

/// Everything produced by one training run.
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub model: RandomForestRegressor,
    pub metrics: RegressionMetrics,
    /// `(feature, importance)` sorted by importance, highest first.
    pub feature_importance: Vec<(String, f64)>,
    pub train_rows: usize,
    pub test_rows: usize,
    /// Held-out predictions, aligned with `split.test_target`.
    pub test_predictions: Vec<f64>,
    pub split: SplitDataset,
}

/// Fits and evaluates the forest.
#[derive(Debug, Clone, Default)]
pub struct Trainer {
    config: TrainingConfig,
}

impl Trainer {
    pub fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Split, fit and evaluate.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for invalid settings, a matrix that is
    /// empty, ragged or misaligned with the target, any missing or
    /// non-finite value, or a split that leaves a side empty.
    pub fn train(&self, features: &FeatureMatrix, target: &[f64]) -> Result<TrainingOutcome> {
        self.train_with_progress(features, target, |_, _| {})
    }

    /// Like [`train`](Self::train), calling `on_tree(0, total)` once the
    /// split is done and `on_tree(done, total)` after each fitted tree.
    pub fn train_with_progress<F>(
        &self,
        features: &FeatureMatrix,
        target: &[f64],
        mut on_tree: F,
    ) -> Result<TrainingOutcome>
    where
        F: FnMut(usize, usize),
    {
        self.config.validate()?;
        validate_training_data(features.rows(), target)?;

        let split = train_test_split(
            features,
            target,
            self.config.test_size,
            self.config.random_seed,
        )?;
        info!(
            "Split {} rows into {} train / {} test",
            features.n_rows(),
            split.train_len(),
            split.test_len()
        );

        on_tree(0, self.config.n_estimators);
        let model = RandomForestRegressor::fit_with_progress(
            split.train_features.rows(),
            &split.train_target,
            &self.config,
            on_tree,
        )?;
        info!("Model training completed ({} trees)", model.n_trees());

        let test_predictions = model.predict(split.test_features.rows())?;
        let metrics = RegressionMetrics::compute(&split.test_target, &test_predictions)?;
        info!(
            "Evaluation: MAE={:.4} RMSE={:.4} R2={:.4}",
            metrics.mae, metrics.rmse, metrics.r2
        );

        let feature_importance = rank_importance(features.feature_names(), model.feature_importances());

        Ok(TrainingOutcome {
            train_rows: split.train_len(),
            test_rows: split.test_len(),
            model,
            metrics,
            feature_importance,
            test_predictions,
            split,
        })
    }
}

/// Pair names with importances, highest first; ties keep feature order.
pub fn rank_importance(names: &[String], importances: &[f64]) -> Vec<(String, f64)> {
    let mut ranked: Vec<(String, f64)> = names
        .iter()
        .cloned()
        .zip(importances.iter().copied())
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranked
}
