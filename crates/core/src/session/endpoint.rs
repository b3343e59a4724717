//! Administrative session operations scoped by tenant context.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::error::SessionError;
use super::repository::SessionRepository;
use super::store::SessionStore;
use super::types::{CreateSessionInput, Session};
use crate::tenant::TenantContext;

/// Session creation request as received from the integrating host.
///
/// The tenant is never taken from the body.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateSessionRequest {
    /// Named storage within the tenant.
    pub storage_name: String,
    /// Document path within the storage.
    pub file_path: String,
    /// Requested permission names. Absent means none, which is rejected.
    #[serde(default)]
    pub permissions: Vec<String>,
    /// Account the session is opened for.
    pub account: String,
    /// Display user.
    #[serde(default)]
    pub user: Option<String>,
    /// Correlation id of the originating connection.
    #[serde(default)]
    pub origin_connection_id: Option<String>,
    /// Correlation id of the originating page.
    #[serde(default)]
    pub origin_page_id: Option<String>,
    /// Session lifetime in seconds.
    #[serde(default)]
    pub ttl_seconds: Option<u64>,
}

/// Outcome of a cleanup request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    /// Sessions deleted.
    pub deleted: u64,
    /// Sessions that would be deleted. Only set for dry runs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub would_delete: Option<u64>,
}

/// Administrative surface over the session store.
pub struct SessionEndpoint<R: SessionRepository> {
    store: Arc<SessionStore<R>>,
    default_ttl_secs: u64,
}

impl<R: SessionRepository> SessionEndpoint<R> {
    /// Create a new endpoint. `default_ttl_secs` applies when a request
    /// carries no TTL.
    #[must_use]
    pub fn new(store: Arc<SessionStore<R>>, default_ttl_secs: u64) -> Self {
        Self {
            store,
            default_ttl_secs,
        }
    }

    /// Create a session for the caller's tenant.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Validation` for malformed input.
    pub async fn create(
        &self,
        ctx: &TenantContext,
        request: CreateSessionRequest,
    ) -> Result<Session, SessionError> {
        let session = self
            .store
            .create(CreateSessionInput {
                tenant_id: ctx.tenant_id.clone(),
                storage_name: request.storage_name,
                file_path: request.file_path,
                permissions: request.permissions,
                account: request.account,
                user: request.user,
                origin_connection_id: request.origin_connection_id,
                origin_page_id: request.origin_page_id,
                ttl_seconds: Some(request.ttl_seconds.unwrap_or(self.default_ttl_secs)),
            })
            .await?;

        info!(
            session_id = %session.id,
            tenant_id = %session.tenant_id,
            account = %session.account,
            "WOPI session opened"
        );
        Ok(session)
    }

    /// Get a session visible to the caller.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotFound` if absent or owned by another tenant.
    pub async fn get(&self, ctx: &TenantContext, id: &str) -> Result<Session, SessionError> {
        let session = self.store.get(id).await?;
        if !ctx.can_access(&session.tenant_id) {
            return Err(SessionError::not_found(id));
        }
        Ok(session)
    }

    /// Active sessions. Tenant-scoped callers only ever see their own.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository fails.
    pub async fn list(
        &self,
        ctx: &TenantContext,
        tenant_id: Option<&str>,
    ) -> Result<Vec<Session>, SessionError> {
        let filter = if ctx.is_admin {
            tenant_id
        } else {
            Some(ctx.tenant_id.as_str())
        };
        self.store.list_active(filter).await
    }

    /// Close a session. Returns false if absent or owned by another tenant.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository fails.
    pub async fn close(&self, ctx: &TenantContext, id: &str) -> Result<bool, SessionError> {
        if !ctx.is_admin {
            match self.store.get(id).await {
                Ok(session) if session.tenant_id == ctx.tenant_id => {}
                Ok(_) | Err(SessionError::NotFound(_)) => return Ok(false),
                Err(e) => return Err(e),
            }
        }

        let closed = self.store.remove(id).await?;
        if closed {
            info!(session_id = %id, "WOPI session closed");
        }
        Ok(closed)
    }

    /// Purge expired sessions, or only count them when `dry_run` is set.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Forbidden` for tenant-scoped callers.
    pub async fn cleanup(
        &self,
        ctx: &TenantContext,
        dry_run: bool,
    ) -> Result<CleanupReport, SessionError> {
        if !ctx.is_admin {
            return Err(SessionError::Forbidden(
                "cleanup requires an admin token".to_string(),
            ));
        }

        if dry_run {
            let would_delete = self.store.count_expired().await?;
            return Ok(CleanupReport {
                deleted: 0,
                would_delete: Some(would_delete),
            });
        }

        let deleted = self.store.cleanup_expired().await?;
        info!(deleted, "Expired sessions cleaned up");
        Ok(CleanupReport {
            deleted,
            would_delete: None,
        })
    }
}
