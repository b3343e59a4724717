//! Session types and data structures.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::SessionError;

/// Capability granted to the editor holding a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    /// Read access.
    View,
    /// Write access. Always accompanied by [`Permission::View`].
    Edit,
}

impl Permission {
    /// Convert to database string value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::View => "view",
            Self::Edit => "edit",
        }
    }

    /// Parse from database string value.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "view" => Some(Self::View),
            "edit" => Some(Self::Edit),
            _ => None,
        }
    }
}

/// Validates a requested permission set and returns it in canonical order.
///
/// `edit` implies `view`. Duplicates collapse.
///
/// # Errors
///
/// Returns `SessionError::Validation` for an empty set or an unknown name.
pub fn normalize_permissions<S: AsRef<str>>(raw: &[S]) -> Result<Vec<Permission>, SessionError> {
    if raw.is_empty() {
        return Err(SessionError::validation("permissions must not be empty"));
    }

    let mut permissions = Vec::with_capacity(2);
    for name in raw {
        let name = name.as_ref();
        let permission = Permission::parse(name)
            .ok_or_else(|| SessionError::validation(format!("unknown permission: {name}")))?;
        permissions.push(permission);
    }

    if permissions.contains(&Permission::Edit) {
        permissions.push(Permission::View);
    }
    permissions.sort_unstable();
    permissions.dedup();

    Ok(permissions)
}

/// Collaborative lock state of a session, as stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockState {
    /// No lock recorded.
    Unlocked,
    /// A lock is recorded. It may already be past its expiry.
    Locked {
        /// Opaque lock identifier supplied by the editor.
        lock_id: String,
        /// Instant at which the lock stops being honored.
        expires_at: DateTime<Utc>,
    },
}

impl LockState {
    /// Lock id of a lock that is still honored at `now`.
    #[must_use]
    pub fn active_at(&self, now: DateTime<Utc>) -> Option<&str> {
        match self {
            Self::Locked {
                lock_id,
                expires_at,
            } if *expires_at > now => Some(lock_id),
            _ => None,
        }
    }

    /// Whether `set_lock(lock_id)` succeeds against this state at `now`.
    ///
    /// Succeeds when unlocked, when the stored lock has expired, or when the
    /// same id already holds it.
    #[must_use]
    pub fn admits(&self, lock_id: &str, now: DateTime<Utc>) -> bool {
        match self {
            Self::Unlocked => true,
            Self::Locked {
                lock_id: held,
                expires_at,
            } => held == lock_id || *expires_at <= now,
        }
    }

    /// Whether `refresh_lock(lock_id)` succeeds against this state at `now`.
    #[must_use]
    pub fn refreshable_by(&self, lock_id: &str, now: DateTime<Utc>) -> bool {
        self.active_at(now) == Some(lock_id)
    }

    /// Whether `release_lock(lock_id)` succeeds against this state.
    ///
    /// Releasing an absent lock is a no-op success. Expiry is not consulted.
    #[must_use]
    pub fn releasable_by(&self, lock_id: &str) -> bool {
        match self {
            Self::Unlocked => true,
            Self::Locked { lock_id: held, .. } => held == lock_id,
        }
    }
}

/// A WOPI editing session.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Session identifier, `sess_` prefixed.
    pub id: String,
    /// Owning tenant.
    pub tenant_id: String,
    /// Named storage within the tenant.
    pub storage_name: String,
    /// Document path within the storage.
    pub file_path: String,
    /// Opaque WOPI file identifier, `file_` prefixed.
    pub file_id: String,
    /// Bearer credential for WOPI requests.
    pub access_token: String,
    /// Granted permissions in canonical order.
    pub permissions: Vec<Permission>,
    /// Account the session was opened for.
    pub account: String,
    /// Display user.
    pub user: Option<String>,
    /// Correlation id of the originating connection.
    pub origin_connection_id: Option<String>,
    /// Correlation id of the originating page.
    pub origin_page_id: Option<String>,
    /// Current lock id.
    pub lock_id: Option<String>,
    /// Expiry of the current lock.
    pub lock_expires_at: Option<DateTime<Utc>>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Session expiry. Fixed at creation.
    pub expires_at: DateTime<Utc>,
    /// Last successful WOPI access.
    pub last_accessed_at: DateTime<Utc>,
}

impl Session {
    /// A session is expired when `expires_at <= now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Whether the session grants write access.
    #[must_use]
    pub fn can_edit(&self) -> bool {
        self.permissions.contains(&Permission::Edit)
    }

    /// Stored lock state.
    #[must_use]
    pub fn lock_state(&self) -> LockState {
        match (&self.lock_id, self.lock_expires_at) {
            (Some(lock_id), Some(expires_at)) => LockState::Locked {
                lock_id: lock_id.clone(),
                expires_at,
            },
            _ => LockState::Unlocked,
        }
    }
}

// access_token is a bearer credential and stays out of logs.
impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("tenant_id", &self.tenant_id)
            .field("storage_name", &self.storage_name)
            .field("file_path", &self.file_path)
            .field("file_id", &self.file_id)
            .field("access_token", &"<redacted>")
            .field("permissions", &self.permissions)
            .field("account", &self.account)
            .field("user", &self.user)
            .field("lock_id", &self.lock_id)
            .field("lock_expires_at", &self.lock_expires_at)
            .field("created_at", &self.created_at)
            .field("expires_at", &self.expires_at)
            .field("last_accessed_at", &self.last_accessed_at)
            .finish_non_exhaustive()
    }
}

/// Input for creating a session.
#[derive(Debug, Clone)]
pub struct CreateSessionInput {
    /// Owning tenant.
    pub tenant_id: String,
    /// Named storage within the tenant.
    pub storage_name: String,
    /// Document path within the storage.
    pub file_path: String,
    /// Requested permission names (`view`, `edit`).
    pub permissions: Vec<String>,
    /// Account the session is opened for.
    pub account: String,
    /// Display user.
    pub user: Option<String>,
    /// Correlation id of the originating connection.
    pub origin_connection_id: Option<String>,
    /// Correlation id of the originating page.
    pub origin_page_id: Option<String>,
    /// Session lifetime in seconds. Defaults to one hour.
    pub ttl_seconds: Option<u64>,
}
