//! Error types for the Research Assistant.
//!
//! One enum covers every fallible operation outside the answer pipeline's
//! own recovered failures.

use thiserror::Error;

/// Unified error type for the Research Assistant.
///
/// Fallible functions return `Result<T, AppError>`. The answer pipeline itself
/// never surfaces these to its caller; it folds them into the result instead.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Knowledge base and retrieval errors
    #[error("Knowledge error: {0}")]
    Knowledge(String),

    /// Answer pipeline errors
    #[error("Pipeline error: {0}")]
    Pipeline(String),

    /// Query/response ledger errors
    #[error("Ledger error: {0}")]
    Ledger(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
