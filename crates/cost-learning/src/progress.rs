//! Progress reporting for the training pipeline.
//!
//! The [`Pipeline`](crate::Pipeline) reports a [`ProgressUpdate`] at every
//! stage boundary and after every fitted tree.
//!
//! # Example
//!
//! ```
//! use cost_learning::{Pipeline, ProgressUpdate};
//!
//! let pipeline = Pipeline::builder()
//!     .on_progress(|update: ProgressUpdate| {
//!         println!(
//!             "[{}] {:.0}% - {}",
//!             update.stage.display_name(),
//!             update.progress * 100.0,
//!             update.message
//!         );
//!     })
//!     .build()
//!     .expect("valid pipeline");
//! ```

use std::str::FromStr;
use std::sync::Arc;

/// The current stage of the training pipeline.
///
/// Stages run in declaration order. Terminal states:
/// [`Complete`](Self::Complete) and [`Failed`](Self::Failed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum TrainingStage {
    #[default]
    Initializing,
    /// Removing duplicates and decomposing dates.
    Cleaning,
    /// Extracting the target and one-hot encoding features.
    Encoding,
    /// Partitioning rows into train and test sets.
    Splitting,
    /// Fitting trees.
    Training,
    /// Scoring the held-out rows.
    Evaluation,
    Complete,
    Failed,
}

impl TrainingStage {
    /// Machine-readable name, the inverse of [`FromStr`].
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            TrainingStage::Initializing => "initializing",
            TrainingStage::Cleaning => "cleaning",
            TrainingStage::Encoding => "encoding",
            TrainingStage::Splitting => "splitting",
            TrainingStage::Training => "training",
            TrainingStage::Evaluation => "evaluation",
            TrainingStage::Complete => "complete",
            TrainingStage::Failed => "failed",
        }
    }

    /// Human-readable name.
    #[must_use]
    pub fn display_name(&self) -> &'static str {
        match self {
            TrainingStage::Initializing => "Initializing",
            TrainingStage::Cleaning => "Cleaning Data",
            TrainingStage::Encoding => "Encoding Features",
            TrainingStage::Splitting => "Splitting Data",
            TrainingStage::Training => "Training Model",
            TrainingStage::Evaluation => "Evaluating Model",
            TrainingStage::Complete => "Complete",
            TrainingStage::Failed => "Failed",
        }
    }

    /// Share of overall progress spent in this stage.
    #[must_use]
    pub fn weight(&self) -> f64 {
        match self {
            TrainingStage::Initializing => 0.02,
            TrainingStage::Cleaning => 0.08,
            TrainingStage::Encoding => 0.08,
            TrainingStage::Splitting => 0.02,
            TrainingStage::Training => 0.75,
            TrainingStage::Evaluation => 0.05,
            TrainingStage::Complete | TrainingStage::Failed => 0.0,
        }
    }

    /// Cumulative progress at the start of this stage.
    #[must_use]
    pub fn base_progress(&self) -> f64 {
        match self {
            TrainingStage::Initializing => 0.0,
            TrainingStage::Cleaning => 0.02,
            TrainingStage::Encoding => 0.10,
            TrainingStage::Splitting => 0.18,
            TrainingStage::Training => 0.20,
            TrainingStage::Evaluation => 0.95,
            TrainingStage::Complete => 1.0,
            TrainingStage::Failed => 0.0,
        }
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, TrainingStage::Complete | TrainingStage::Failed)
    }
}

impl std::fmt::Display for TrainingStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Error type for parsing a [`TrainingStage`] from a string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseTrainingStageError {
    invalid_value: String,
}

impl ParseTrainingStageError {
    #[must_use]
    pub fn invalid_value(&self) -> &str {
        &self.invalid_value
    }
}

impl std::fmt::Display for ParseTrainingStageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid training stage: '{}'. Valid values are: initializing, cleaning, encoding, \
             splitting, training, evaluation, complete, failed",
            self.invalid_value
        )
    }
}

impl std::error::Error for ParseTrainingStageError {}

impl FromStr for TrainingStage {
    type Err = ParseTrainingStageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "initializing" => Ok(TrainingStage::Initializing),
            "cleaning" => Ok(TrainingStage::Cleaning),
            "encoding" => Ok(TrainingStage::Encoding),
            "splitting" => Ok(TrainingStage::Splitting),
            "training" => Ok(TrainingStage::Training),
            "evaluation" => Ok(TrainingStage::Evaluation),
            "complete" => Ok(TrainingStage::Complete),
            "failed" => Ok(TrainingStage::Failed),
            _ => Err(ParseTrainingStageError {
                invalid_value: s.to_string(),
            }),
        }
    }
}

/// A progress update from the training pipeline.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProgressUpdate {
    /// The current stage.
    pub stage: TrainingStage,

    /// Overall progress from 0.0 to 1.0, non-decreasing during a run.
    pub progress: f64,

    /// Human-readable status message.
    pub message: String,

    /// `(fitted, total)` trees, only set during
    /// [`Training`](TrainingStage::Training).
    pub trees_completed: Option<(usize, usize)>,
}

impl ProgressUpdate {
    /// Update at the start of `stage`.
    pub fn stage_started(stage: TrainingStage, message: impl Into<String>) -> Self {
        Self {
            stage,
            progress: stage.base_progress(),
            message: message.into(),
            trees_completed: None,
        }
    }

    /// Update after `done` of `total` trees have been fitted.
    pub fn tree_fitted(done: usize, total: usize) -> Self {
        let stage = TrainingStage::Training;
        let fraction = if total == 0 {
            1.0
        } else {
            done as f64 / total as f64
        };
        Self {
            stage,
            progress: stage.base_progress() + stage.weight() * fraction,
            message: format!("Fitted tree {}/{}", done, total),
            trees_completed: Some((done, total)),
        }
    }
}

/// Callback receiving [`ProgressUpdate`]s.
///
/// The callback runs on the training thread and should return quickly.
pub type ProgressCallback = Arc<dyn Fn(ProgressUpdate) + Send + Sync>;

#[cfg(test)]
mod tests {
    use super::*;

    const STAGES: [TrainingStage; 8] = [
        TrainingStage::Initializing,
        TrainingStage::Cleaning,
        TrainingStage::Encoding,
        TrainingStage::Splitting,
        TrainingStage::Training,
        TrainingStage::Evaluation,
        TrainingStage::Complete,
        TrainingStage::Failed,
    ];

    #[test]
    fn test_training_stage_roundtrip() {
        for stage in STAGES {
            let parsed: TrainingStage = stage.as_str().parse().unwrap();
            assert_eq!(parsed, stage);
        }
    }

    #[test]
    fn test_training_stage_from_str_error() {
        let err = "unknown".parse::<TrainingStage>().unwrap_err();
        assert_eq!(err.invalid_value(), "unknown");
        assert!(err.to_string().contains("Valid values"));
    }

    #[test]
    fn test_is_terminal() {
        assert!(TrainingStage::Complete.is_terminal());
        assert!(TrainingStage::Failed.is_terminal());
        assert!(!TrainingStage::Training.is_terminal());
    }

    #[test]
    fn test_base_progress_is_cumulative() {
        let running = &STAGES[..6];
        for pair in running.windows(2) {
            let expected = pair[0].base_progress() + pair[0].weight();
            assert!((pair[1].base_progress() - expected).abs() < 1e-9, "{:?}", pair);
        }
        let last = running[5];
        assert!((last.base_progress() + last.weight() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_tree_fitted_progress() {
        let first = ProgressUpdate::tree_fitted(1, 4);
        let last = ProgressUpdate::tree_fitted(4, 4);
        assert_eq!(first.trees_completed, Some((1, 4)));
        assert!(first.progress > TrainingStage::Training.base_progress());
        assert!((last.progress - TrainingStage::Evaluation.base_progress()).abs() < 1e-9);
    }

    #[test]
    fn test_progress_update_default() {
        let update = ProgressUpdate::default();
        assert_eq!(update.stage, TrainingStage::Initializing);
        assert_eq!(update.progress, 0.0);
        assert!(update.message.is_empty());
        assert!(update.trees_completed.is_none());
    }
}
