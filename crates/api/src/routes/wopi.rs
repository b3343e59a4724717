//! WOPI wire protocol.
//!
//! Editors authenticate every call with the `access_token` query parameter
//! issued at session creation. Lock verbs share one endpoint and are selected
//! by `X-WOPI-Override`.

use axum::{
    Json, Router,
    body::Bytes,
    extract::{DefaultBodyLimit, Path, Query, State},
    http::{HeaderMap, StatusCode, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;

use crate::{AppState, error::ApiError};
use wopi_core::wopi::WopiError;

/// Lock id header, on requests and on conflict responses.
pub const WOPI_LOCK_HEADER: &str = "x-wopi-lock";

/// Lock verb selector.
pub const WOPI_OVERRIDE_HEADER: &str = "x-wopi-override";

/// Document version header.
pub const WOPI_ITEM_VERSION_HEADER: &str = "x-wopi-itemversion";

/// Largest document accepted by PutFile.
const MAX_DOCUMENT_BYTES: usize = 512 * 1024 * 1024;

/// Query string shared by all WOPI calls. Unknown parameters are ignored.
#[derive(Debug, Deserialize)]
pub struct AccessTokenQuery {
    /// Session access token.
    pub access_token: Option<String>,
}

impl AccessTokenQuery {
    fn require(self) -> Result<String, ApiError> {
        self.access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(ApiError::missing_token)
    }
}

/// Creates the WOPI router, mounted at the service root.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/wopi/files/{file_id}",
            get(check_file_info).post(lock_operation),
        )
        .route(
            "/wopi/files/{file_id}/contents",
            get(get_file).post(put_file),
        )
        .layer(DefaultBodyLimit::max(MAX_DOCUMENT_BYTES))
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|h| h.to_str().ok())
}

/// GET `/wopi/files/{file_id}` - CheckFileInfo.
async fn check_file_info(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
    Query(query): Query<AccessTokenQuery>,
) -> Result<Response, ApiError> {
    let token = query.require()?;
    let info = state.wopi.check_file_info(&file_id, &token).await?;
    Ok(Json(info).into_response())
}

/// GET `/wopi/files/{file_id}/contents` - GetFile.
async fn get_file(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
    Query(query): Query<AccessTokenQuery>,
) -> Result<Response, ApiError> {
    let token = query.require()?;
    let file = state.wopi.get_file(&file_id, &token).await?;
    Ok((
        [
            (CONTENT_TYPE.as_str(), "application/octet-stream".to_string()),
            (WOPI_ITEM_VERSION_HEADER, file.version),
        ],
        file.content,
    )
        .into_response())
}

/// POST `/wopi/files/{file_id}/contents` - PutFile.
async fn put_file(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
    Query(query): Query<AccessTokenQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let token = query.require()?;
    let lock_id = header(&headers, WOPI_LOCK_HEADER);
    let result = state.wopi.put_file(&file_id, &token, &body, lock_id).await?;
    Ok((
        [(WOPI_ITEM_VERSION_HEADER, result.item_version.clone())],
        Json(result),
    )
        .into_response())
}

/// POST `/wopi/files/{file_id}` - LOCK, REFRESH_LOCK, UNLOCK, GET_LOCK.
async fn lock_operation(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
    Query(query): Query<AccessTokenQuery>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let token = query.require()?;
    let lock_id = header(&headers, WOPI_LOCK_HEADER).unwrap_or_default();

    match header(&headers, WOPI_OVERRIDE_HEADER).map(str::trim) {
        Some("LOCK") => state.wopi.lock(&file_id, &token, lock_id).await?,
        Some("REFRESH_LOCK") => state.wopi.refresh_lock(&file_id, &token, lock_id).await?,
        Some("UNLOCK") => state.wopi.unlock(&file_id, &token, lock_id).await?,
        Some("GET_LOCK") => {
            let current = state.wopi.get_lock(&file_id, &token).await?;
            return Ok((
                StatusCode::OK,
                [(WOPI_LOCK_HEADER, current.unwrap_or_default())],
            )
                .into_response());
        }
        Some(other) => return Err(WopiError::UnsupportedOperation(other.to_string()).into()),
        None => {
            return Err(
                WopiError::BadRequest("X-WOPI-Override is required".to_string()).into(),
            );
        }
    }

    Ok(StatusCode::OK.into_response())
}
