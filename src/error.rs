//! Error types for the churn pipeline

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for churn pipeline operations
pub type Result<T> = std::result::Result<T, ChurnError>;

/// Offline pipeline step that produces an artifact.
///
/// Carried by [`ChurnError::MissingArtifact`] so the operator is told which
/// step to (re-)run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStep {
    /// Raw data is supplied by the operator, not produced by a step
    SourceData,
    Preprocess,
    Train,
    Explain,
}

impl PipelineStep {
    /// Human-readable hint on how to produce the artifact
    pub fn hint(&self) -> &'static str {
        match self {
            PipelineStep::SourceData => "place the raw customer CSV there",
            PipelineStep::Preprocess => "run `churn-guard preprocess` first",
            PipelineStep::Train => "run `churn-guard train` first",
            PipelineStep::Explain => "run `churn-guard explain` first",
        }
    }
}

impl fmt::Display for PipelineStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStep::SourceData => "source data",
            PipelineStep::Preprocess => "preprocess",
            PipelineStep::Train => "train",
            PipelineStep::Explain => "explain",
        };
        f.write_str(name)
    }
}

/// Main error type for the churn pipeline
#[derive(Error, Debug)]
pub enum ChurnError {
    #[error("Missing artifact {}: {}", .path.display(), .producer.hint())]
    MissingArtifact { path: PathBuf, producer: PipelineStep },

    #[error("Unknown category for field {field}: {value:?}")]
    UnknownCategory { field: String, value: String },

    #[error("Missing field: {0}")]
    MissingField(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Schema mismatch: expected {expected}, got {actual}")]
    SchemaMismatch { expected: String, actual: String },

    #[error("Data error: {0}")]
    DataError(String),

    #[error("Training error: {0}")]
    TrainingError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Model not fitted")]
    ModelNotFitted,
}

impl ChurnError {
    /// True for errors caused by the caller's record rather than the service
    pub fn is_rejected_input(&self) -> bool {
        matches!(
            self,
            ChurnError::UnknownCategory { .. }
                | ChurnError::MissingField(_)
                | ChurnError::InvalidInput(_)
        )
    }
}

impl From<polars::error::PolarsError> for ChurnError {
    fn from(err: polars::error::PolarsError) -> Self {
        ChurnError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for ChurnError {
    fn from(err: serde_json::Error) -> Self {
        ChurnError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for ChurnError {
    fn from(err: ndarray::ShapeError) -> Self {
        ChurnError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}
