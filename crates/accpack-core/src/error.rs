//! Error types for the accelerator-pack core library.

use thiserror::Error;

/// Result type alias using the core `Error`.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A credential was supplied but is blank
    #[error("Credential `{field}` must not be empty")]
    EmptyCredential { field: &'static str },

    /// A credential was not supplied by any configuration layer
    #[error("Credential `{field}` is not configured")]
    MissingCredential { field: &'static str },

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
