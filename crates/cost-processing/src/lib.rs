//! Cost Data Processing Library
//!
//! Cleaning and feature encoding for cost-analysis exports, built on Polars.
//!
//! # Overview
//!
//! - **Ingestion**: CSV text or files into a [`DataFrame`](polars::prelude::DataFrame)
//! - **Cleaning**: duplicate removal and date decomposition ([`DataCleaner`])
//! - **Encoding**: target extraction and one-hot expansion ([`FeatureEncoder`])
//!   with a reusable [`EncodingSchema`]
//! - **Profiling**: distributions, correlations and target-grouped summaries
//!   ([`DataProfiler`])
//! - **Blob download**: optional, behind the `remote` feature ([`BlobSource`])
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use cost_processing::{DataCleaner, FeatureEncoder, ProcessingConfig, read_csv_file};
//!
//! let config = ProcessingConfig::builder()
//!     .target_column("Cost")
//!     .build()?;
//!
//! let raw = read_csv_file("cost-analysis.csv")?;
//! let (cleaned, report) = DataCleaner::new(config.clone()).clean(raw)?;
//! println!("{} dates could not be parsed", report.date_parse_failure_count());
//!
//! let encoded = FeatureEncoder::new(config).fit_transform(&cleaned)?;
//! println!("{} features", encoded.features.n_features());
//! ```

pub mod cleaner;
pub mod config;
pub mod encoder;
pub mod error;
pub mod ingest;
pub mod profile;
pub mod source;
pub mod utils;

// Re-exports for convenient access
pub use cleaner::{CleaningReport, DataCleaner, DateParseIssue};
pub use config::{ConfigValidationError, ProcessingConfig, ProcessingConfigBuilder};
pub use encoder::{
    ColumnEncoding, DateDecomposition, EncodedDataset, EncodingSchema, FeatureEncoder,
    FeatureMatrix,
};
pub use error::{ProcessingError, Result as ProcessingResult, ResultExt};
pub use ingest::{log_preview, read_csv_file, read_csv_str, write_csv_file};
pub use profile::{DataProfiler, ProfileReport};
pub use source::BlobSource;
