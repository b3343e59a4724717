//! Error-to-response mapping for the HTTP layer.
//!
//! Every failure leaves the service as `{"error": <code>, "message": <text>}`.
//! Server-side failures are logged in full and answered with a generic message.

use axum::{
    Json,
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::{error, warn};

use crate::routes::wopi::WOPI_LOCK_HEADER;
use wopi_core::session::SessionError;
use wopi_core::tenant::TenantError;
use wopi_core::wopi::WopiError;
use wopi_shared::{AppError, INTERNAL_MESSAGE};

/// An error on its way to the client.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
    /// Value for `X-WOPI-Lock` on lock conflicts. Empty when unlocked.
    lock: Option<String>,
}

impl ApiError {
    /// Builds an error response.
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            lock: None,
        }
    }

    /// WOPI request without `access_token`.
    pub fn missing_token() -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            "missing_token",
            "access_token query parameter is required",
        )
    }

    /// Caller lacks admin rights.
    pub fn admin_required() -> Self {
        Self::new(
            StatusCode::FORBIDDEN,
            "forbidden",
            "This operation requires an admin token",
        )
    }

    /// HTTP status of the response.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Machine-readable reason code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        self.code
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = if self.status.is_server_error() {
            error!(
                code = self.code,
                status = self.status.as_u16(),
                error = %self.message,
                "Request failed"
            );
            INTERNAL_MESSAGE.to_string()
        } else {
            if self.status != StatusCode::NOT_FOUND {
                warn!(
                    code = self.code,
                    status = self.status.as_u16(),
                    error = %self.message,
                    "Request rejected"
                );
            }
            self.message
        };

        let mut response = (
            self.status,
            Json(json!({ "error": self.code, "message": message })),
        )
            .into_response();

        if let Some(lock) = self.lock
            && let Ok(value) = HeaderValue::from_str(&lock)
        {
            response.headers_mut().insert(WOPI_LOCK_HEADER, value);
        }
        response
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        let status =
            StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        Self::new(status, err.error_code(), err.to_string())
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        let app = match err {
            SessionError::Validation(msg) => AppError::Validation(msg),
            SessionError::NotFound(id) => AppError::NotFound(format!("session {id}")),
            SessionError::Forbidden(msg) => AppError::Forbidden(msg),
            SessionError::Repository(msg) => AppError::Database(msg),
        };
        app.into()
    }
}

impl From<TenantError> for ApiError {
    fn from(err: TenantError) -> Self {
        let app = match err {
            TenantError::Validation(msg) => AppError::Validation(msg),
            TenantError::NotFound(id) => AppError::NotFound(format!("tenant {id}")),
            TenantError::Repository(msg) => AppError::Database(msg),
        };
        app.into()
    }
}

impl From<WopiError> for ApiError {
    fn from(err: WopiError) -> Self {
        let status =
            StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let code = err.error_code();
        let lock = match &err {
            WopiError::LockConflict { current } => Some(current.clone().unwrap_or_default()),
            _ => None,
        };
        Self {
            status,
            code,
            message: err.to_string(),
            lock,
        }
    }
}
