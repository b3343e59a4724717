//! Tenant administration routes. Admin only.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde_json::json;
use tracing::info;

use crate::{AppState, error::ApiError, extract::JsonBody, middleware::Caller};
use wopi_core::tenant::{Tenant, TenantError, UpsertTenantInput};

/// Creates the tenants router (requires auth middleware to be applied externally).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/tenants", get(list_tenants).post(upsert_tenant))
        .route("/tenants/{id}", get(get_tenant))
        .route(
            "/tenants/{id}/api-key",
            post(create_api_key).delete(revoke_api_key),
        )
}

/// GET /tenants
async fn list_tenants(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Json<Vec<Tenant>>, ApiError> {
    caller.require_admin()?;
    Ok(Json(state.tenants.list().await?))
}

/// POST /tenants - Create or update a tenant.
async fn upsert_tenant(
    State(state): State<AppState>,
    caller: Caller,
    JsonBody(payload): JsonBody<UpsertTenantInput>,
) -> Result<Json<Tenant>, ApiError> {
    caller.require_admin()?;
    let tenant = state.tenants.upsert(payload).await?;
    info!(tenant_id = %tenant.id, mode = tenant.wopi_mode.as_str(), "Tenant saved");
    Ok(Json(tenant))
}

/// GET `/tenants/{id}`
async fn get_tenant(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
) -> Result<Json<Tenant>, ApiError> {
    caller.require_admin()?;
    let tenant = state
        .tenants
        .get(&id)
        .await?
        .ok_or(TenantError::NotFound(id))?;
    Ok(Json(tenant))
}

/// POST `/tenants/{id}/api-key` - Issue a new API key. The key is shown once.
async fn create_api_key(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    caller.require_admin()?;
    let api_key = state.tenants.create_api_key(&id).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "tenant_id": id, "api_key": api_key })),
    ))
}

/// DELETE `/tenants/{id}/api-key` - Revoke the tenant's API key.
async fn revoke_api_key(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    caller.require_admin()?;
    let revoked = state.tenants.revoke_api_key(&id).await?;
    Ok(Json(json!({ "tenant_id": id, "revoked": revoked })))
}
