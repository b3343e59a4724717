//! Session persistence seam.

use chrono::{DateTime, Utc};

use super::error::SessionError;
use super::types::Session;

/// Repository trait for session persistence.
///
/// This trait is implemented by the db crate to provide actual database operations.
/// Every lock method must be a single atomic read-modify-write against one
/// session: two concurrent callers may never both observe success for
/// conflicting lock ids.
pub trait SessionRepository: Send + Sync {
    /// Persist a new session.
    fn insert(
        &self,
        session: Session,
    ) -> impl std::future::Future<Output = Result<Session, SessionError>> + Send;

    /// Find session by ID.
    fn find_by_id(
        &self,
        id: &str,
    ) -> impl std::future::Future<Output = Result<Option<Session>, SessionError>> + Send;

    /// Find session by access token.
    fn find_by_token(
        &self,
        access_token: &str,
    ) -> impl std::future::Future<Output = Result<Option<Session>, SessionError>> + Send;

    /// Find session by WOPI file ID.
    fn find_by_file_id(
        &self,
        file_id: &str,
    ) -> impl std::future::Future<Output = Result<Option<Session>, SessionError>> + Send;

    /// Set `last_accessed_at`. Returns false when the session is gone.
    fn touch(
        &self,
        id: &str,
        at: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<bool, SessionError>> + Send;

    /// Sessions with `expires_at > now`, newest first, optionally of one tenant.
    fn list_active(
        &self,
        tenant_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<Vec<Session>, SessionError>> + Send;

    /// Number of sessions with `expires_at <= now`.
    fn count_expired(
        &self,
        now: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<u64, SessionError>> + Send;

    /// Delete sessions with `expires_at <= now`, returning how many were removed.
    fn delete_expired(
        &self,
        now: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<u64, SessionError>> + Send;

    /// Delete one session. Returns false when it did not exist.
    fn delete(
        &self,
        id: &str,
    ) -> impl std::future::Future<Output = Result<bool, SessionError>> + Send;

    /// Record `lock_id` when the session is unlocked, holds `lock_id`, or
    /// holds a lock with `lock_expires_at <= now`.
    fn try_lock(
        &self,
        id: &str,
        lock_id: &str,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<bool, SessionError>> + Send;

    /// Extend the lock when it is held by `lock_id` and `lock_expires_at > now`.
    fn refresh_lock(
        &self,
        id: &str,
        lock_id: &str,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<bool, SessionError>> + Send;

    /// Clear the lock when it is absent or held by `lock_id`.
    fn unlock(
        &self,
        id: &str,
        lock_id: &str,
    ) -> impl std::future::Future<Output = Result<bool, SessionError>> + Send;

    /// Clear the lock only if it is still `lock_id` and `lock_expires_at <= now`.
    fn clear_expired_lock(
        &self,
        id: &str,
        lock_id: &str,
        now: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<bool, SessionError>> + Send;
}
