//! Session lifecycle and the per-session collaborative lock.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use super::error::SessionError;
use super::repository::SessionRepository;
use super::token::{generate_access_token, generate_file_id, generate_session_id};
use super::types::{CreateSessionInput, LockState, Session, normalize_permissions};
use crate::clock::Clock;

/// Session lifetime used when the caller does not supply one.
pub const DEFAULT_SESSION_TTL_SECS: u64 = 3600;

/// Lock lifetime used when the caller does not supply one.
pub const DEFAULT_LOCK_TTL_SECS: u64 = 1800;

fn ttl_to_duration(seconds: u64, what: &str) -> Result<Duration, SessionError> {
    if seconds == 0 {
        return Err(SessionError::validation(format!("{what} must be positive")));
    }
    i64::try_from(seconds)
        .ok()
        .and_then(Duration::try_seconds)
        .ok_or_else(|| SessionError::validation(format!("{what} is out of range")))
}

/// Session store: creation, lookup, expiry and locking of sessions.
///
/// Expiry is enforced lazily by callers through [`SessionStore::is_expired`]
/// or [`Session::is_expired_at`]; lookups never filter on it.
pub struct SessionStore<R: SessionRepository> {
    repo: Arc<R>,
    clock: Arc<dyn Clock>,
}

impl<R: SessionRepository> SessionStore<R> {
    /// Create a new session store.
    #[must_use]
    pub fn new(repo: Arc<R>, clock: Arc<dyn Clock>) -> Self {
        Self { repo, clock }
    }

    /// Current time as seen by the store.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Create a session.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Validation` if:
    /// - `permissions` is empty or names an unknown permission
    /// - `account` is empty
    /// - `ttl_seconds` is zero or out of range
    pub async fn create(&self, input: CreateSessionInput) -> Result<Session, SessionError> {
        let permissions = normalize_permissions(&input.permissions)?;
        if input.account.trim().is_empty() {
            return Err(SessionError::validation("account is required"));
        }
        let ttl = ttl_to_duration(
            input.ttl_seconds.unwrap_or(DEFAULT_SESSION_TTL_SECS),
            "ttl_seconds",
        )?;

        let created_at = self.clock.now();
        let session = Session {
            id: generate_session_id(),
            tenant_id: input.tenant_id,
            storage_name: input.storage_name,
            file_path: input.file_path,
            file_id: generate_file_id(),
            access_token: generate_access_token(),
            permissions,
            account: input.account,
            user: input.user,
            origin_connection_id: input.origin_connection_id,
            origin_page_id: input.origin_page_id,
            lock_id: None,
            lock_expires_at: None,
            created_at,
            expires_at: created_at + ttl,
            last_accessed_at: created_at,
        };

        let session = self.repo.insert(session).await?;
        debug!(
            session_id = %session.id,
            tenant_id = %session.tenant_id,
            file_id = %session.file_id,
            "Session created"
        );
        Ok(session)
    }

    /// Get session by ID.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotFound` if no such session exists.
    pub async fn get(&self, id: &str) -> Result<Session, SessionError> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| SessionError::not_found(id))
    }

    /// Get session by access token.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotFound` if no session carries the token.
    pub async fn get_by_token(&self, access_token: &str) -> Result<Session, SessionError> {
        self.repo
            .find_by_token(access_token)
            .await?
            .ok_or_else(|| SessionError::not_found("access token"))
    }

    /// Get session by WOPI file ID.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotFound` if no session carries the file ID.
    pub async fn get_by_file_id(&self, file_id: &str) -> Result<Session, SessionError> {
        self.repo
            .find_by_file_id(file_id)
            .await?
            .ok_or_else(|| SessionError::not_found(file_id))
    }

    /// Record an access. A missing session is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository fails.
    pub async fn touch(&self, id: &str) -> Result<(), SessionError> {
        self.repo.touch(id, self.clock.now()).await?;
        Ok(())
    }

    /// Whether the session is absent or past `expires_at`.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository fails.
    pub async fn is_expired(&self, id: &str) -> Result<bool, SessionError> {
        let now = self.clock.now();
        Ok(self
            .repo
            .find_by_id(id)
            .await?
            .is_none_or(|session| session.is_expired_at(now)))
    }

    /// Unexpired sessions, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository fails.
    pub async fn list_active(&self, tenant_id: Option<&str>) -> Result<Vec<Session>, SessionError> {
        self.repo.list_active(tenant_id, self.clock.now()).await
    }

    /// Number of sessions `cleanup_expired` would delete right now.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository fails.
    pub async fn count_expired(&self) -> Result<u64, SessionError> {
        self.repo.count_expired(self.clock.now()).await
    }

    /// Delete every expired session.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository fails.
    pub async fn cleanup_expired(&self) -> Result<u64, SessionError> {
        let deleted = self.repo.delete_expired(self.clock.now()).await?;
        if deleted > 0 {
            debug!(deleted, "Expired sessions removed");
        }
        Ok(deleted)
    }

    /// Delete one session.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository fails.
    pub async fn remove(&self, id: &str) -> Result<bool, SessionError> {
        self.repo.delete(id).await
    }

    /// Acquire or re-acquire the lock.
    ///
    /// Returns false when the session is absent or another unexpired lock
    /// is held.
    ///
    /// # Errors
    ///
    /// Returns an error if `ttl_seconds` is zero or the repository fails.
    pub async fn set_lock(
        &self,
        session_id: &str,
        lock_id: &str,
        ttl_seconds: u64,
    ) -> Result<bool, SessionError> {
        let ttl = ttl_to_duration(ttl_seconds, "lock ttl")?;
        let now = self.clock.now();
        self.repo
            .try_lock(session_id, lock_id, now + ttl, now)
            .await
    }

    /// Extend a lock still held by `lock_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if `ttl_seconds` is zero or the repository fails.
    pub async fn refresh_lock(
        &self,
        session_id: &str,
        lock_id: &str,
        ttl_seconds: u64,
    ) -> Result<bool, SessionError> {
        let ttl = ttl_to_duration(ttl_seconds, "lock ttl")?;
        let now = self.clock.now();
        self.repo
            .refresh_lock(session_id, lock_id, now + ttl, now)
            .await
    }

    /// Release the lock.
    ///
    /// Returns false when the session is absent or the lock is held under
    /// a different id. Releasing an unlocked session succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository fails.
    pub async fn release_lock(&self, session_id: &str, lock_id: &str) -> Result<bool, SessionError> {
        self.repo.unlock(session_id, lock_id).await
    }

    /// Current lock id. An expired lock is cleared and reported as `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository fails.
    pub async fn get_lock(&self, session_id: &str) -> Result<Option<String>, SessionError> {
        let Some(session) = self.repo.find_by_id(session_id).await? else {
            return Ok(None);
        };
        self.current_lock(&session).await
    }

    /// Current lock id of an already loaded session, with the same lazy
    /// clearing as [`SessionStore::get_lock`].
    ///
    /// # Errors
    ///
    /// Returns an error if the repository fails.
    pub async fn current_lock(&self, session: &Session) -> Result<Option<String>, SessionError> {
        let now = self.clock.now();
        let state = session.lock_state();
        if let Some(lock_id) = state.active_at(now) {
            return Ok(Some(lock_id.to_string()));
        }
        if let LockState::Locked { lock_id, .. } = &state {
            // Conditional on the stale id so a concurrent re-lock survives.
            self.repo.clear_expired_lock(&session.id, lock_id, now).await?;
            debug!(session_id = %session.id, "Expired lock cleared");
        }
        Ok(None)
    }
}
