//! Error types for the server.

use dras_openapi::error::OpenApiGenError;
use thiserror::Error;

/// Main error type for startup and configuration.
///
/// Per-request failures never surface here; handlers turn them into HTTP statuses.
#[derive(Error, Debug)]
pub enum DrasError {
    /// Configuration errors (invalid flag values, conflicts)
    #[error("Configuration error: {0}")]
    Config(String),

    /// The dialect is known but has no driver wired up, or is not known at all.
    #[error("Unsupported dialect '{0}': dialect must be 'postgres'")]
    UnsupportedDialect(String),

    /// Database connection errors
    #[error("Connection error: {0}")]
    Connect(#[source] sqlx::Error),

    /// Catalog query errors (table or column discovery)
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// Spec generation or rendering errors
    #[error("OpenAPI error: {0}")]
    OpenApi(#[from] OpenApiGenError),

    /// IO errors (bind, serve)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for server operations.
pub type Result<T> = std::result::Result<T, DrasError>;
