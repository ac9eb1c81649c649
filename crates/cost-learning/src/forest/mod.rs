//! Random forest regressor.
//!
//! An ensemble of [`RegressionTree`]s, each grown on a bootstrap sample of
//! the training rows. The prediction is the mean of the tree predictions.
//! Fitting is fully determined by the training data and the seed.

mod tree;

pub use tree::{Node, RegressionTree};

use crate::config::TrainingConfig;
use crate::error::{LearningError, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;
use tree::{TreeGrower, TreeParams};

/// Fitted random forest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForestRegressor {
    n_features: usize,
    trees: Vec<RegressionTree>,
    feature_importances: Vec<f64>,
}

impl RandomForestRegressor {
    /// Fit a forest on `x` (row-major) and `y`.
    ///
    /// # Errors
    ///
    /// Returns [`LearningError::Configuration`] when the matrix is empty, has
    /// no columns, has ragged rows, does not match the target length, or
    /// contains a non-finite value.
    pub fn fit(x: &[Vec<f64>], y: &[f64], config: &TrainingConfig) -> Result<Self> {
        Self::fit_with_progress(x, y, config, |_, _| {})
    }

    /// Like [`fit`](Self::fit), calling `on_tree(done, total)` after each tree.
    pub fn fit_with_progress<F>(
        x: &[Vec<f64>],
        y: &[f64],
        config: &TrainingConfig,
        mut on_tree: F,
    ) -> Result<Self>
    where
        F: FnMut(usize, usize),
    {
        config.validate()?;
        let n_features = validate_training_data(x, y)?;
        let n = y.len();

        let params = TreeParams {
            max_depth: config.max_depth,
            min_samples_split: config.min_samples_split,
            min_samples_leaf: config.min_samples_leaf,
            max_features: config.max_features.resolve(n_features),
        };

        let mut master = StdRng::seed_from_u64(config.random_seed);
        let mut trees = Vec::with_capacity(config.n_estimators);
        let mut importance_sum = vec![0.0; n_features];

        for t in 0..config.n_estimators {
            let mut rng = StdRng::seed_from_u64(master.r#gen::<u64>());
            let samples: Vec<usize> = if config.bootstrap {
                (0..n).map(|_| rng.gen_range(0..n)).collect()
            } else {
                (0..n).collect()
            };

            let (tree, importances) = TreeGrower::new(x, y, n_features, params).grow(&samples, &mut rng);

            let total: f64 = importances.iter().sum();
            if total > 0.0 {
                for (acc, v) in importance_sum.iter_mut().zip(&importances) {
                    *acc += v / total;
                }
            }

            debug!(
                "Tree {}/{}: depth {}, {} leaves",
                t + 1,
                config.n_estimators,
                tree.depth(),
                tree.n_leaves()
            );
            trees.push(tree);
            on_tree(t + 1, config.n_estimators);
        }

        Ok(Self {
            n_features,
            trees,
            feature_importances: normalize(importance_sum),
        })
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn trees(&self) -> &[RegressionTree] {
        &self.trees
    }

    /// Mean impurity decrease per feature, summing to 1 (or all zeros when
    /// no tree ever split).
    pub fn feature_importances(&self) -> &[f64] {
        &self.feature_importances
    }

    /// Predict one row.
    ///
    /// # Errors
    ///
    /// Returns [`LearningError::SchemaMismatch`] when the row width differs
    /// from the training width.
    pub fn predict_row(&self, row: &[f64]) -> Result<f64> {
        if row.len() != self.n_features {
            return Err(LearningError::SchemaMismatch {
                expected: self.n_features,
                actual: row.len(),
            });
        }
        let sum: f64 = self.trees.iter().map(|t| t.predict(row)).sum();
        Ok(sum / self.trees.len() as f64)
    }

    /// Predict every row.
    pub fn predict(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>> {
        rows.iter().map(|row| self.predict_row(row)).collect()
    }

    /// Check internal consistency after deserialization.
    pub fn verify(&self) -> std::result::Result<(), String> {
        if self.trees.is_empty() {
            return Err("forest has no trees".to_string());
        }
        if self.feature_importances.len() != self.n_features {
            return Err(format!(
                "forest has {} importances for {} features",
                self.feature_importances.len(),
                self.n_features
            ));
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.verify(self.n_features)
                .map_err(|e| format!("tree {}: {}", i, e))?;
        }
        Ok(())
    }
}

/// Check the training inputs and return the feature count.
pub fn validate_training_data(x: &[Vec<f64>], y: &[f64]) -> Result<usize> {
    if x.is_empty() {
        return Err(LearningError::Configuration(
            "Training matrix has no rows".to_string(),
        ));
    }
    if x.len() != y.len() {
        return Err(LearningError::Configuration(format!(
            "Training matrix has {} rows but target has {}",
            x.len(),
            y.len()
        )));
    }

    let n_features = x[0].len();
    if n_features == 0 {
        return Err(LearningError::Configuration(
            "Training matrix has no feature columns".to_string(),
        ));
    }

    for (i, row) in x.iter().enumerate() {
        if row.len() != n_features {
            return Err(LearningError::Configuration(format!(
                "Row {} has {} values, expected {}",
                i,
                row.len(),
                n_features
            )));
        }
        if let Some(j) = row.iter().position(|v| !v.is_finite()) {
            return Err(LearningError::Configuration(format!(
                "Row {} has a missing or non-finite value in feature {}",
                i, j
            )));
        }
    }

    if let Some(i) = y.iter().position(|v| !v.is_finite()) {
        return Err(LearningError::Configuration(format!(
            "Target has a missing or non-finite value at row {}",
            i
        )));
    }

    Ok(n_features)
}

fn normalize(values: Vec<f64>) -> Vec<f64> {
    let total: f64 = values.iter().sum();
    if total > 0.0 {
        values.into_iter().map(|v| v / total).collect()
    } else {
        values
    }
}
