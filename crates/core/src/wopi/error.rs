//! WOPI error types.

use thiserror::Error;

use crate::session::SessionError;
use crate::storage::StorageError;

/// WOPI operation errors.
#[derive(Debug, Error)]
pub enum WopiError {
    /// Unknown file id, or the document is absent in storage.
    #[error("file not found: {0}")]
    FileNotFound(String),

    /// Access token does not belong to the session.
    #[error("invalid access token")]
    InvalidToken,

    /// Session is past its expiry.
    #[error("session expired")]
    SessionExpired,

    /// Lock held under a different id, or write to an unlocked non-empty file.
    #[error("lock conflict")]
    LockConflict {
        /// Lock currently held, if any.
        current: Option<String>,
    },

    /// Lock verbs are disabled.
    #[error("locks are not supported")]
    LocksNotSupported,

    /// Unknown `X-WOPI-Override` operation.
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// Malformed request, such as a missing lock id.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Storage read or write failed.
    #[error("storage failure: {0}")]
    Storage(#[source] StorageError),

    /// Session store failed.
    #[error("session store failure: {0}")]
    Session(#[source] SessionError),
}

impl WopiError {
    /// HTTP status code for the wire response.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::FileNotFound(_) => 404,
            Self::InvalidToken | Self::SessionExpired => 401,
            Self::LockConflict { .. } => 409,
            Self::LocksNotSupported | Self::UnsupportedOperation(_) => 501,
            Self::BadRequest(_) => 400,
            Self::Storage(_) | Self::Session(_) => 500,
        }
    }

    /// Machine-readable reason code.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::FileNotFound(_) => "file_not_found",
            Self::InvalidToken => "invalid_token",
            Self::SessionExpired => "session_expired",
            Self::LockConflict { .. } => "lock_conflict",
            Self::LocksNotSupported => "locks_not_supported",
            Self::UnsupportedOperation(_) => "unsupported_operation",
            Self::BadRequest(_) => "bad_request",
            Self::Storage(_) => "storage_error",
            Self::Session(_) => "internal_error",
        }
    }
}

impl From<SessionError> for WopiError {
    fn from(err: SessionError) -> Self {
        Self::Session(err)
    }
}
