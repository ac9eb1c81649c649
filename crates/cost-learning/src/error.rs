//! Error types for the cost-learning crate.
//!
//! This module defines [`LearningError`], the error type returned by every
//! public function in the crate.
//!
//! # Error Handling
//!
//! - Invalid inputs and settings are [`Configuration`](LearningError::Configuration)
//!   errors and are never retried.
//! - Scoring input of the wrong width is a
//!   [`SchemaMismatch`](LearningError::SchemaMismatch).
//! - An artifact that cannot be read back is a
//!   [`Deserialization`](LearningError::Deserialization) error.
//!
//! # Example
//!
//! ```no_run
//! use cost_learning::{LearningError, Scorer};
//!
//! fn score(row: &[f64]) -> Result<f64, LearningError> {
//!     let scorer = Scorer::load("model.json")?;
//!     scorer.predict(row)
//! }
//! ```

use cost_processing::ProcessingError;
use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// The main error type for cost-learning operations.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new variants
/// in future versions without breaking downstream code.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum LearningError {
    /// Invalid training settings or unusable training data.
    ///
    /// Common causes:
    /// - Fewer than two rows, or a split that leaves one side empty
    /// - Feature matrix and target of different lengths
    /// - Missing or non-finite feature or target values
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Scoring input does not have the width the model was trained on.
    #[error("Schema mismatch: expected {expected} features, got {actual}")]
    SchemaMismatch {
        /// Number of features the model was trained on.
        expected: usize,
        /// Number of features supplied.
        actual: usize,
    },

    /// A persisted model could not be read back.
    ///
    /// The file is missing, unreadable, not valid JSON, or internally
    /// inconsistent.
    #[error("Failed to load model: {0}")]
    Deserialization(String),

    /// Cleaning or encoding failed.
    #[error(transparent)]
    Processing(#[from] ProcessingError),

    /// I/O error while writing an artifact.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error while encoding an artifact or a scoring response.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LearningError {
    /// Stable error code for machine consumers.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "CONFIGURATION_ERROR",
            Self::SchemaMismatch { .. } => "SCHEMA_MISMATCH",
            Self::Deserialization(_) => "DESERIALIZATION_ERROR",
            Self::Processing(e) => e.error_code(),
            Self::Io(_) => "IO_ERROR",
            Self::Json(_) => "JSON_ERROR",
        }
    }

    /// Check if this error is a configuration problem, including one raised
    /// while cleaning or encoding.
    pub fn is_configuration(&self) -> bool {
        self.error_code() == "CONFIGURATION_ERROR"
    }
}

impl Serialize for LearningError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("LearningError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for cost-learning operations.
pub type Result<T> = std::result::Result<T, LearningError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LearningError::SchemaMismatch {
            expected: 9,
            actual: 3,
        };
        assert_eq!(
            err.to_string(),
            "Schema mismatch: expected 9 features, got 3"
        );

        let err = LearningError::Deserialization("bad header".to_string());
        assert!(err.to_string().contains("bad header"));
    }

    #[test]
    fn test_processing_error_keeps_code() {
        let err: LearningError = ProcessingError::ColumnNotFound("Cost".to_string()).into();
        assert_eq!(err.error_code(), "CONFIGURATION_ERROR");
        assert!(err.is_configuration());
        assert_eq!(err.to_string(), "Column 'Cost' not found in dataset");
    }

    #[test]
    fn test_error_serializes_as_code_and_message() {
        let err = LearningError::Configuration("empty matrix".to_string());
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], "CONFIGURATION_ERROR");
        assert_eq!(json["message"], "Configuration error: empty matrix");
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: LearningError = io.into();
        assert_eq!(err.error_code(), "IO_ERROR");
    }
}
