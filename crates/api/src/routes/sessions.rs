//! Session administration routes.
//!
//! The tenant always comes from the authenticated caller, never the body.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{AppState, error::ApiError, extract::JsonBody, middleware::Caller};
use wopi_core::session::{CleanupReport, CreateSessionRequest, Session};
use wopi_shared::AppError;

/// Creates the sessions router (requires auth middleware to be applied externally).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/sessions", post(create_session).get(list_sessions))
        .route("/sessions/cleanup", post(cleanup_sessions))
        .route("/sessions/{id}", get(get_session).delete(close_session))
}

/// Session as returned on creation, with what the host needs to open the editor.
#[derive(Debug, Serialize)]
pub struct CreatedSession {
    /// The stored session.
    #[serde(flatten)]
    pub session: Session,
    /// `WOPISrc` to hand to the editor.
    pub wopi_src: String,
    /// Editor to open, `None` when WOPI is disabled for the tenant.
    pub wopi_client_url: Option<String>,
}

/// Filter for listing sessions.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    /// Restrict to one tenant. Ignored for tenant-scoped callers.
    pub tenant_id: Option<String>,
}

/// Cleanup request body.
#[derive(Debug, Default, Deserialize)]
pub struct CleanupRequest {
    /// Only count what would be deleted.
    #[serde(default)]
    pub dry_run: bool,
}

fn wopi_src(public_base_url: &str, file_id: &str) -> String {
    format!(
        "{}/wopi/files/{file_id}",
        public_base_url.trim_end_matches('/')
    )
}

/// POST /sessions - Open a session for the caller's tenant.
async fn create_session(
    State(state): State<AppState>,
    caller: Caller,
    JsonBody(payload): JsonBody<CreateSessionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let ctx = caller.context();
    let tenant = state
        .tenants
        .get(&ctx.tenant_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("tenant {}", ctx.tenant_id)))?;

    if !tenant.active {
        return Err(AppError::Validation(format!("tenant {} is inactive", tenant.id)).into());
    }
    let Some(wopi_client_url) = tenant.wopi_client_url(&state.config.wopi.client_url) else {
        return Err(
            AppError::Validation(format!("WOPI is disabled for tenant {}", tenant.id)).into(),
        );
    };

    let session = state.sessions.create(ctx, payload).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreatedSession {
            wopi_src: wopi_src(&state.config.wopi.public_base_url, &session.file_id),
            wopi_client_url: Some(wopi_client_url),
            session,
        }),
    ))
}

/// GET /sessions - Active sessions, newest first.
async fn list_sessions(
    State(state): State<AppState>,
    caller: Caller,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Session>>, ApiError> {
    let sessions = state
        .sessions
        .list(caller.context(), query.tenant_id.as_deref())
        .await?;
    Ok(Json(sessions))
}

/// GET `/sessions/{id}` - One session.
async fn get_session(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
) -> Result<Json<Session>, ApiError> {
    Ok(Json(state.sessions.get(caller.context(), &id).await?))
}

/// DELETE `/sessions/{id}` - Close a session.
async fn close_session(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let closed = state.sessions.close(caller.context(), &id).await?;
    Ok(Json(json!({ "closed": closed })))
}

/// POST /sessions/cleanup - Purge or count expired sessions. Admin only.
///
/// The body is optional; without one expired sessions are deleted.
async fn cleanup_sessions(
    State(state): State<AppState>,
    caller: Caller,
    payload: Option<JsonBody<CleanupRequest>>,
) -> Result<Json<CleanupReport>, ApiError> {
    let JsonBody(payload) = payload.unwrap_or_default();
    let report = state
        .sessions
        .cleanup(caller.context(), payload.dry_run)
        .await?;
    Ok(Json(report))
}
