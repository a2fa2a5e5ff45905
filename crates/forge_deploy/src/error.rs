//! Error types for the deploy pipeline.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for deploy operations.
pub type DeployResult<T> = Result<T, DeployError>;

/// Errors that can occur while building or publishing an application.
#[derive(Error, Debug)]
pub enum DeployError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Build failed: {0}")]
    Build(String),

    #[error("Build produced no artifact directory: {0}")]
    MissingArtifact(PathBuf),

    #[error("Publishing failed: {0}")]
    CopyFailed(String),

    #[error("Screenshot capture failed: {0}")]
    Screenshot(String),

    #[error(transparent)]
    Core(#[from] forge_core::CoreError),

    #[error(transparent)]
    Store(#[from] forge_store::StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
