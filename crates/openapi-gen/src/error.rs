//! Error types for `dras-openapi`.

use thiserror::Error;

/// Main error type for spec generation and rendering.
#[derive(Error, Debug)]
pub enum OpenApiGenError {
    /// Two tables produced the same path or schema key.
    #[error("Duplicate table '{0}'")]
    DuplicateTable(String),

    /// JSON rendering errors.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML rendering errors.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type alias for spec generation.
pub type Result<T> = std::result::Result<T, OpenApiGenError>;
