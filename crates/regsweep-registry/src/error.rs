//! Error types for registry operations.

use thiserror::Error;

/// Result type alias for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;

/// Errors that can occur while talking to a registry.
///
/// These are collaborator-scope failures: they never invalidate a
/// retention plan that has already been computed.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Repository or manifest not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Registry error.
    #[error("registry error: {0}")]
    Registry(String),

    /// Authentication error.
    #[error("authentication error: {0}")]
    Auth(String),

    /// The registry refuses manifest deletion (delete is disabled).
    #[error("registry does not allow manifest deletion: {0}")]
    DeleteUnsupported(String),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
