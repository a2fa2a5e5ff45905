//! Error types for the generation pipeline.

use thiserror::Error;

/// Result type alias for generation operations.
pub type GenResult<T> = Result<T, GenError>;

/// Errors that can occur while orchestrating a generation turn.
#[derive(Error, Debug)]
pub enum GenError {
    #[error("Generation failed: {0}")]
    Generation(String),

    #[error("Generation cancelled by consumer")]
    Cancelled,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Path escapes project root: {0}")]
    PathEscape(String),

    #[error("Artifact persistence failed: {0}")]
    Persistence(String),

    #[error(transparent)]
    Core(#[from] forge_core::CoreError),

    #[error(transparent)]
    Store(#[from] forge_store::StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
