//! Authentication middleware for the administrative routes.
//!
//! Resolves the `X-API-Token` header into a [`TenantContext`]:
//! - no global token configured and no header: admin for the default tenant
//! - the global token: admin, acting for `X-Tenant-Id` or the default tenant
//! - an active tenant's API key: confined to that tenant
//! - anything else: 401

use axum::{
    Json,
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, StatusCode, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::warn;

use crate::{AppState, error::ApiError};
use wopi_core::session::token::constant_time_eq;
use wopi_core::tenant::TenantContext;
use wopi_shared::{AppError, DEFAULT_TENANT};

/// Header carrying the admin token or a tenant API key.
pub const API_TOKEN_HEADER: &str = "x-api-token";

/// Header selecting the tenant an admin acts for.
pub const TENANT_ID_HEADER: &str = "x-tenant-id";

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Authentication middleware that resolves the caller's tenant context.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    match resolve_context(&state, request.headers()).await {
        Ok(ctx) => {
            request.extensions_mut().insert(ctx);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

async fn resolve_context(state: &AppState, headers: &HeaderMap) -> Result<TenantContext, ApiError> {
    let configured = state
        .config
        .auth
        .api_token
        .as_deref()
        .filter(|t| !t.is_empty());
    let presented = header(headers, API_TOKEN_HEADER);

    let Some(token) = presented else {
        if configured.is_none() {
            return Ok(TenantContext::admin(DEFAULT_TENANT));
        }
        return Err(ApiError::new(
            StatusCode::UNAUTHORIZED,
            "missing_token",
            "X-API-Token header is required",
        ));
    };

    if configured.is_some_and(|expected| constant_time_eq(token, expected)) {
        let tenant_id = header(headers, TENANT_ID_HEADER).unwrap_or(DEFAULT_TENANT);
        return Ok(TenantContext::admin(tenant_id));
    }

    match state.tenants.find_by_api_key(token).await? {
        Some(tenant) => Ok(TenantContext::tenant(tenant.id)),
        None => {
            warn!("Rejected API request: unknown token");
            Err(AppError::Unauthorized("invalid API token".to_string()).into())
        }
    }
}

/// Extractor for the authenticated caller.
///
/// ```ignore
/// async fn handler(caller: Caller) -> impl IntoResponse {
///     let tenant_id = &caller.context().tenant_id;
///     // ...
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Caller(pub TenantContext);

impl Caller {
    /// The caller's tenant context.
    #[must_use]
    pub fn context(&self) -> &TenantContext {
        &self.0
    }

    /// Fails unless the caller holds the admin token.
    ///
    /// # Errors
    ///
    /// Returns a 403 error for tenant-scoped callers.
    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.0.is_admin {
            Ok(())
        } else {
            Err(ApiError::admin_required())
        }
    }
}

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<serde_json::Value>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<TenantContext>()
            .cloned()
            .map(Caller)
            .ok_or_else(|| {
                (
                    StatusCode::UNAUTHORIZED,
                    Json(json!({
                        "error": "unauthorized",
                        "message": "Authentication required"
                    })),
                )
            })
    }
}
