//! Error type shared by the administrative surface and the binaries.

use thiserror::Error;

/// Result type alias using `AppError`.
pub type AppResult<T> = Result<T, AppError>;

/// Message sent in place of server-side failure details.
pub const INTERNAL_MESSAGE: &str = "An internal error occurred";

/// Errors surfaced to API callers.
#[derive(Debug, Error)]
pub enum AppError {
    /// Missing or unknown credentials.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Credentials valid but not sufficient, such as a tenant key on an admin route.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Unknown session or tenant.
    #[error("not found: {0}")]
    NotFound(String),

    /// Malformed input.
    #[error("invalid request: {0}")]
    Validation(String),

    /// Request collides with current state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Persistence failed.
    #[error("database failure: {0}")]
    Database(String),

    /// Document storage failed.
    #[error("storage failure: {0}")]
    Storage(String),

    /// Anything else that is not the caller's fault.
    #[error("internal failure: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::Unauthorized(_) => 401,
            Self::Forbidden(_) => 403,
            Self::NotFound(_) => 404,
            Self::Conflict(_) => 409,
            Self::Database(_) | Self::Storage(_) | Self::Internal(_) => 500,
        }
    }

    /// Snake-case reason code, sent as the `error` field.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::Unauthorized(_) => "unauthorized",
            Self::Forbidden(_) => "forbidden",
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::Database(_) => "database_error",
            Self::Storage(_) => "storage_error",
            Self::Internal(_) => "internal_error",
        }
    }

    /// Whether this is a server-side failure.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        self.status_code() >= 500
    }

    /// Message safe to return to the caller. Server-side details stay in logs.
    #[must_use]
    pub fn public_message(&self) -> String {
        if self.is_server_error() {
            INTERNAL_MESSAGE.to_string()
        } else {
            self.to_string()
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
