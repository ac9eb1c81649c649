//! End-to-end training pipeline.
//!
//! The pipeline runs these stages in order:
//!
//! 1. **Cleaning** - drop duplicate rows, decompose the usage date
//! 2. **Encoding** - extract the target, one-hot encode categorical columns
//! 3. **Splitting** - seeded 80/20 train/test partition
//! 4. **Training** - fit the random forest
//! 5. **Evaluation** - score the held-out rows
//!
//! and returns a [`ModelArtifact`] ready to be saved.
//!
//! # Example
//!
//! ```no_run
//! use cost_learning::{Pipeline, TrainingConfig};
//! use cost_processing::read_csv_file;
//!
//! let df = read_csv_file("cost-analysis.csv")?;
//!
//! let pipeline = Pipeline::builder()
//!     .training_config(TrainingConfig::builder().n_estimators(50).build()?)
//!     .on_progress(|update| {
//!         println!("[{}] {:.0}% - {}", update.stage, update.progress * 100.0, update.message);
//!     })
//!     .build()?;
//!
//! let output = pipeline.train(df)?;
//! println!("{}", output.artifact.metrics);
//! output.artifact.save("model.json")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use crate::artifact::ModelArtifact;
use crate::config::TrainingConfig;
use crate::error::{LearningError, Result};
use crate::progress::{ProgressCallback, ProgressUpdate, TrainingStage};
use crate::trainer::Trainer;
use cost_processing::{
    CleaningReport, DataCleaner, EncodedDataset, FeatureEncoder, ProcessingConfig, log_preview,
};
use polars::prelude::DataFrame;
use tracing::{error, info};

/// Everything produced by [`Pipeline::train`].
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// The trained model with its schema and metrics.
    pub artifact: ModelArtifact,
    /// What the cleaner did.
    pub cleaning: CleaningReport,
    /// The encoded feature matrix and target the model was trained on.
    pub dataset: EncodedDataset,
    /// Held-out true values.
    pub test_target: Vec<f64>,
    /// Held-out predictions, aligned with `test_target`.
    pub test_predictions: Vec<f64>,
}

/// The clean, encode, train and evaluate workflow.
///
/// Use [`Pipeline::builder()`] to construct one. Every setting is optional;
/// see [`ProcessingConfig`] and [`TrainingConfig`] for the defaults.
pub struct Pipeline {
    processing: ProcessingConfig,
    training: TrainingConfig,
    progress_callback: Option<ProgressCallback>,
}

static_assertions::assert_impl_all!(Pipeline: Send, Sync);

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("processing", &self.processing)
            .field("training", &self.training)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl Pipeline {
    /// Create a new builder for `Pipeline`.
    #[must_use]
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    pub fn processing_config(&self) -> &ProcessingConfig {
        &self.processing
    }

    pub fn training_config(&self) -> &TrainingConfig {
        &self.training
    }

    /// Run every stage on a raw dataset.
    ///
    /// On failure a [`Failed`](TrainingStage::Failed) update is reported
    /// before the error is returned.
    ///
    /// # Errors
    ///
    /// - [`LearningError::Processing`] if cleaning or encoding fails, for
    ///   example when the date or target column is missing.
    /// - [`LearningError::Configuration`] if the encoded data cannot be
    ///   trained on: too few rows, or missing values with
    ///   `drop_incomplete_rows` disabled.
    pub fn train(&self, df: DataFrame) -> Result<PipelineOutput> {
        match self.run(df) {
            Ok(output) => {
                self.report(ProgressUpdate::stage_started(
                    TrainingStage::Complete,
                    "Training complete",
                ));
                Ok(output)
            }
            Err(e) => {
                error!("Training failed: {}", e);
                self.report(ProgressUpdate {
                    stage: TrainingStage::Failed,
                    progress: 0.0,
                    message: e.to_string(),
                    trees_completed: None,
                });
                Err(e)
            }
        }
    }

    fn run(&self, df: DataFrame) -> Result<PipelineOutput> {
        self.report(ProgressUpdate::stage_started(
            TrainingStage::Initializing,
            format!("Starting with {} rows x {} columns", df.height(), df.width()),
        ));
        log_preview("Dataset preview", &df);

        self.report(ProgressUpdate::stage_started(
            TrainingStage::Cleaning,
            "Removing duplicates and decomposing dates",
        ));
        let (cleaned, cleaning) = DataCleaner::new(self.processing.clone()).clean(df)?;

        self.report(ProgressUpdate::stage_started(
            TrainingStage::Encoding,
            "Encoding categorical features",
        ));
        let encoder = FeatureEncoder::new(self.processing.clone());
        let dataset = encoder.fit_transform(&cleaned)?;
        info!(
            "Encoded {} rows into {} features",
            dataset.n_rows(),
            dataset.features.n_features()
        );

        self.report(ProgressUpdate::stage_started(
            TrainingStage::Splitting,
            "Splitting into train and test sets",
        ));
        let outcome = Trainer::new(self.training.clone()).train_with_progress(
            &dataset.features,
            &dataset.target,
            |done, total| {
                if done == 0 {
                    self.report(ProgressUpdate::stage_started(
                        TrainingStage::Training,
                        format!("Fitting {} trees", total),
                    ));
                    return;
                }
                self.report(ProgressUpdate::tree_fitted(done, total));
                if done == total {
                    self.report(ProgressUpdate::stage_started(
                        TrainingStage::Evaluation,
                        "Evaluating on the test set",
                    ));
                }
            },
        )?;

        let test_target = outcome.split.test_target.clone();
        let test_predictions = outcome.test_predictions.clone();
        let artifact = ModelArtifact::from_training(
            outcome,
            dataset.schema.clone(),
            self.processing.clone(),
            self.training.clone(),
        );

        Ok(PipelineOutput {
            artifact,
            cleaning,
            dataset,
            test_target,
            test_predictions,
        })
    }

    fn report(&self, update: ProgressUpdate) {
        if let Some(callback) = &self.progress_callback {
            callback(update);
        }
    }
}

/// Builder for [`Pipeline`].
///
/// # Optional Configuration
///
/// - [`processing_config()`](Self::processing_config): cleaning and encoding settings
/// - [`training_config()`](Self::training_config): split and forest settings
/// - [`on_progress()`](Self::on_progress): progress callback for monitoring
#[derive(Default)]
pub struct PipelineBuilder {
    processing: Option<ProcessingConfig>,
    training: Option<TrainingConfig>,
    progress_callback: Option<ProgressCallback>,
}

impl std::fmt::Debug for PipelineBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineBuilder")
            .field("processing", &self.processing)
            .field("training", &self.training)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl PipelineBuilder {
    #[must_use]
    pub fn processing_config(mut self, config: ProcessingConfig) -> Self {
        self.processing = Some(config);
        self
    }

    #[must_use]
    pub fn training_config(mut self, config: TrainingConfig) -> Self {
        self.training = Some(config);
        self
    }

    /// Set the progress callback.
    ///
    /// The callback runs on the training thread and should return quickly.
    #[must_use]
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressUpdate) + Send + Sync + 'static,
    {
        self.progress_callback = Some(std::sync::Arc::new(callback));
        self
    }

    /// Build the pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`LearningError::Configuration`] if either configuration is
    /// invalid.
    pub fn build(self) -> Result<Pipeline> {
        let processing = self.processing.unwrap_or_default();
        processing
            .validate()
            .map_err(|e| LearningError::Configuration(e.to_string()))?;

        let training = self.training.unwrap_or_default();
        training.validate()?;

        Ok(Pipeline {
            processing,
            training,
            progress_callback: self.progress_callback,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;
    use std::sync::{Arc, Mutex};

    fn raw_frame(n: usize) -> DataFrame {
        let services = ["Compute", "Storage", "Networking"];
        let dates: Vec<String> = (0..n)
            .map(|i| format!("2024-{:02}-{:02}", i % 12 + 1, i % 28 + 1))
            .collect();
        let service: Vec<&str> = (0..n).map(|i| services[i % 3]).collect();
        let quantity: Vec<f64> = (0..n).map(|i| (i % 17) as f64 + 1.0).collect();
        let cost: Vec<f64> = (0..n)
            .map(|i| quantity[i] * if i % 3 == 1 { 0.5 } else { 2.0 })
            .collect();
        df!(
            "UsageDate" => dates,
            "ServiceName" => service,
            "Quantity" => quantity,
            "Cost" => cost
        )
        .unwrap()
    }

    fn quick() -> TrainingConfig {
        TrainingConfig::builder().n_estimators(8).build().unwrap()
    }

    #[test]
    fn test_builder_defaults() {
        let pipeline = Pipeline::builder().build().unwrap();
        assert_eq!(pipeline.training_config(), &TrainingConfig::default());
        assert_eq!(pipeline.processing_config(), &ProcessingConfig::default());
    }

    #[test]
    fn test_builder_rejects_invalid_training_config() {
        let mut config = TrainingConfig::default();
        config.test_size = 1.5;
        let err = Pipeline::builder().training_config(config).build().unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_train_end_to_end() {
        let pipeline = Pipeline::builder().training_config(quick()).build().unwrap();
        let output = pipeline.train(raw_frame(50)).unwrap();

        assert_eq!(output.dataset.n_rows(), 50);
        assert_eq!(output.cleaning.duplicates_removed, 0);
        assert_eq!(output.artifact.train_rows, 40);
        assert_eq!(output.artifact.test_rows, 10);
        assert_eq!(output.test_target.len(), output.test_predictions.len());
        assert_eq!(
            output.artifact.schema.feature_names(),
            &["Quantity", "Year", "Month", "Day", "ServiceName_Networking", "ServiceName_Storage"]
        );
        assert!(output.artifact.verify().is_ok());
    }

    #[test]
    fn test_progress_is_reported_in_order() {
        let updates = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&updates);
        let pipeline = Pipeline::builder()
            .training_config(quick())
            .on_progress(move |u| sink.lock().unwrap().push(u))
            .build()
            .unwrap();

        pipeline.train(raw_frame(30)).unwrap();

        let updates = updates.lock().unwrap();
        assert_eq!(updates.first().unwrap().stage, TrainingStage::Initializing);
        assert_eq!(updates.last().unwrap().stage, TrainingStage::Complete);
        assert!(
            updates
                .windows(2)
                .all(|w| w[0].progress <= w[1].progress + 1e-12)
        );
        let trees = updates
            .iter()
            .filter(|u| u.trees_completed.is_some())
            .count();
        assert_eq!(trees, 8);

        let training_start = updates
            .iter()
            .position(|u| u.stage == TrainingStage::Training)
            .unwrap();
        assert_eq!(updates[training_start].trees_completed, None);
        assert_eq!(
            updates[training_start].progress,
            TrainingStage::Training.base_progress()
        );
        assert_eq!(updates[training_start - 1].stage, TrainingStage::Splitting);
        assert!(updates.iter().any(|u| u.stage == TrainingStage::Evaluation));
    }

    #[test]
    fn test_failure_reports_failed_stage() {
        let updates = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&updates);
        let pipeline = Pipeline::builder()
            .on_progress(move |u: ProgressUpdate| sink.lock().unwrap().push(u.stage))
            .build()
            .unwrap();

        let df = df!("Cost" => &[1.0, 2.0]).unwrap();
        let err = pipeline.train(df).unwrap_err();
        assert!(matches!(err, LearningError::Processing(_)));
        assert_eq!(updates.lock().unwrap().last(), Some(&TrainingStage::Failed));
    }
}
