//! Error types for Pulse Motion

use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur during frame processing, estimation and persistence
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("Frame source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Signal too short: captured {captured} samples, need at least {required}")]
    InsufficientSignal { captured: usize, required: usize },

    #[error("Prediction error: {0}")]
    PredictionError(String),

    #[error("Persistence error: {0}")]
    PersistenceError(String),

    #[error("Invalid configuration: {field}: {reason}")]
    InvalidConfig { field: String, reason: String },

    #[error("Unknown session: {0}")]
    SessionNotFound(Uuid),

    #[error("Invalid pipeline state: {0}")]
    InvalidState(String),

    #[error("Unsupported exercise: {0}")]
    UnsupportedExercise(String),

    #[error("Failed to parse input: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ComputeError {
    pub(crate) fn invalid_config(field: &str, reason: impl Into<String>) -> Self {
        ComputeError::InvalidConfig {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether the same session may simply try again after this error.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ComputeError::InsufficientSignal { .. })
    }
}
