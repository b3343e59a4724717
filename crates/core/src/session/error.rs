//! Session error types.

use thiserror::Error;

/// Session operation errors.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Malformed input to session creation.
    #[error("validation error: {0}")]
    Validation(String),

    /// Session not found.
    #[error("session not found: {0}")]
    NotFound(String),

    /// Operation not allowed for the calling tenant.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Repository operation failed.
    #[error("repository error: {0}")]
    Repository(String),
}

impl SessionError {
    /// Create a validation error.
    #[must_use]
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a not found error.
    #[must_use]
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound(id.into())
    }

    /// Create a repository error.
    #[must_use]
    pub fn repository(msg: impl Into<String>) -> Self {
        Self::Repository(msg.into())
    }
}
