//! cost-learning: random-forest cost prediction.
//!
//! This crate trains, evaluates, persists and serves a random forest
//! regressor over cost-analysis exports prepared by [`cost_processing`].
//!
//! # Features
//!
//! - **Pipeline**: clean, encode, split, fit and evaluate in one call
//! - **Random forest**: bootstrap-aggregated CART regression trees, fully
//!   determined by a seed
//! - **Metrics**: MAE, MSE, RMSE and R² on a held-out partition
//! - **Artifacts**: a single JSON file carrying the model, its encoding
//!   schema and metadata
//! - **Scoring**: encoded vectors, raw JSON records or request bodies
//! - **Progress Reporting**: stage and per-tree callbacks
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use cost_learning::{Pipeline, Scorer, TrainingConfig};
//! use cost_processing::read_csv_file;
//!
//! let pipeline = Pipeline::builder()
//!     .training_config(TrainingConfig::default())
//!     .on_progress(|u| println!("{:.0}% - {}", u.progress * 100.0, u.message))
//!     .build()?;
//!
//! let output = pipeline.train(read_csv_file("cost-analysis.csv")?)?;
//! println!("{}", output.artifact.metrics);
//! output.artifact.save("model.json")?;
//!
//! let scorer = Scorer::load("model.json")?;
//! let response = scorer.score_request(r#"{"input": [[12.0, 2024, 3, 1, 0, 1, 0, 1, 0]]}"#);
//! ```
//!
//! # Architecture
//!
//! ```text
//! raw CSV ──► DataCleaner ──► FeatureEncoder ──► Trainer ──► ModelArtifact
//!                                 │                              │
//!                                 └──── EncodingSchema ──────────┤
//!                                                                ▼
//!                                                             Scorer
//! ```

pub mod artifact;
pub mod config;
pub mod error;
pub mod forest;
pub mod metrics;
pub mod pipeline;
pub mod progress;
pub mod scorer;
pub mod split;
pub mod trainer;

// Re-export main types at crate root
pub use artifact::{ModelArtifact, ModelInfo};
pub use config::{MaxFeatures, TrainingConfig, TrainingConfigBuilder};
pub use error::LearningError;
pub use forest::{RandomForestRegressor, RegressionTree};
pub use metrics::RegressionMetrics;
pub use pipeline::{Pipeline, PipelineBuilder, PipelineOutput};
pub use progress::{ProgressCallback, ProgressUpdate, TrainingStage};
pub use scorer::Scorer;
pub use split::{SplitDataset, train_test_split};
pub use trainer::{Trainer, TrainingOutcome};
