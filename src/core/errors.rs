// src/core/errors.rs
use thiserror::Error;

/// Errors produced while building surrogate data, fitting, or explaining a generator.
///
/// None of these are recovered inside the crate; every failure aborts the current
/// call and is handed back to the caller.
#[derive(Debug, Error)]
pub enum ShapError {
    /// Unknown, missing or out-of-range configuration value.
    #[error("Configuration Error: {0}")]
    Configuration(String),

    /// A precondition on the filesystem or session state does not hold
    /// (e.g. the result subdirectory already exists).
    #[error("Precondition Failed: {0}")]
    Precondition(String),

    /// Shapes of two collaborating arrays disagree.
    #[error("Data Shape Mismatch: {0}")]
    DataShape(String),

    /// A data source produced nothing to work with.
    #[error("Empty Input: {0}")]
    EmptyInput(String),

    #[error("Invalid Input: {0}")]
    InvalidInput(String),

    #[error("Model Prediction Error: {0}")]
    ModelPrediction(String),

    #[error("Internal Error: {0}")]
    Internal(String),

    #[error("Ndarray Error: {0}")]
    Ndarray(#[from] ndarray::ShapeError),

    #[error("I/O Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization Error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Image Error: {0}")]
    Image(#[from] image::ImageError),
}

// Convenience type alias for Result
pub type Result<T> = std::result::Result<T, ShapError>;
