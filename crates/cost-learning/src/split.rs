//! Seeded train/test partitioning.

use crate::error::{LearningError, Result};
use cost_processing::FeatureMatrix;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

/// Immutable train/test partition of a feature matrix and its target.
#[derive(Debug, Clone)]
pub struct SplitDataset {
    pub train_features: FeatureMatrix,
    pub train_target: Vec<f64>,
    pub test_features: FeatureMatrix,
    pub test_target: Vec<f64>,
    /// Source row indices of the training rows, in partition order.
    pub train_indices: Vec<usize>,
    /// Source row indices of the test rows, in partition order.
    pub test_indices: Vec<usize>,
}

impl SplitDataset {
    pub fn train_len(&self) -> usize {
        self.train_target.len()
    }

    pub fn test_len(&self) -> usize {
        self.test_target.len()
    }
}

/// Shuffle row indices with `seed` and hold out `ceil(n * test_size)` rows.
///
/// The same inputs and seed always give the same partition.
pub fn train_test_split(
    features: &FeatureMatrix,
    target: &[f64],
    test_size: f64,
    seed: u64,
) -> Result<SplitDataset> {
    let n = features.n_rows();
    if n != target.len() {
        return Err(LearningError::Configuration(format!(
            "Feature matrix has {} rows but target has {}",
            n,
            target.len()
        )));
    }
    if n < 2 {
        return Err(LearningError::Configuration(format!(
            "At least 2 rows are needed to split, got {}",
            n
        )));
    }
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(LearningError::Configuration(
            "test_size must be between 0.0 and 1.0 (exclusive)".to_string(),
        ));
    }

    let n_test = (n as f64 * test_size).ceil() as usize;
    if n_test == 0 || n_test >= n {
        return Err(LearningError::Configuration(format!(
            "test_size {} leaves an empty partition for {} rows",
            test_size, n
        )));
    }

    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let test_indices = indices[..n_test].to_vec();
    let train_indices = indices[n_test..].to_vec();

    Ok(SplitDataset {
        train_features: features.select_rows(&train_indices),
        train_target: train_indices.iter().map(|&i| target[i]).collect(),
        test_features: features.select_rows(&test_indices),
        test_target: test_indices.iter().map(|&i| target[i]).collect(),
        train_indices,
        test_indices,
    })
}
