//! Error types for the mask-eval library.

use thiserror::Error;

/// Result type for mask-eval operations.
pub type Result<T> = std::result::Result<T, EvalError>;

/// Error types that can occur during evaluation.
#[derive(Error, Debug)]
pub enum EvalError {
    /// Error during JSON parsing or serialization.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Error during I/O operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed annotation or prediction data, naming the offending file.
    #[error("invalid format in {path}: {reason}")]
    InvalidFormat { path: String, reason: String },

    /// Missing file, directory, or image.
    #[error("not found: {0}")]
    NotFound(String),

    /// Same class name mapped to two different ids. Fatal: class identity
    /// is ambiguous and evaluation cannot proceed.
    #[error("vocabulary conflict: {0}")]
    Conflict(String),

    /// Contract violation at the call site, e.g. filtering by class set and
    /// image id simultaneously.
    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    /// Invalid bounding box coordinates.
    #[error("invalid bounding box: {0}")]
    InvalidBoundingBox(String),

    /// Malformed or mismatched run-length mask.
    #[error("invalid mask: {0}")]
    InvalidMask(String),

    /// Confidence score outside [0, 1].
    #[error("invalid confidence: {0}")]
    InvalidConfidence(String),
}
