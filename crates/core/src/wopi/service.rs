//! WOPI verb implementation.

use std::sync::Arc;

use tracing::{error, info, warn};

use super::error::WopiError;
use super::types::{CheckFileInfo, FileContents, PutFileResult, format_version};
use crate::session::token::constant_time_eq;
use crate::session::{DEFAULT_LOCK_TTL_SECS, Session, SessionError, SessionRepository, SessionStore};
use crate::storage::{StorageError, StorageNode, StorageResolver};

/// Protocol switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WopiSettings {
    /// Advertise the lock verbs and require the lock for PutFile.
    pub supports_locks: bool,
    /// Lifetime of a lock in seconds.
    pub lock_ttl_secs: u64,
}

impl Default for WopiSettings {
    fn default() -> Self {
        Self {
            supports_locks: false,
            lock_ttl_secs: DEFAULT_LOCK_TTL_SECS,
        }
    }
}

/// WOPI protocol handler.
///
/// Stateless between calls; everything lives in the session store and storage.
pub struct WopiService<R: SessionRepository, S: StorageResolver> {
    store: Arc<SessionStore<R>>,
    storage: Arc<S>,
    settings: WopiSettings,
}

impl<R: SessionRepository, S: StorageResolver> WopiService<R, S> {
    /// Create a new WOPI handler.
    #[must_use]
    pub fn new(store: Arc<SessionStore<R>>, storage: Arc<S>, settings: WopiSettings) -> Self {
        Self {
            store,
            storage,
            settings,
        }
    }

    /// Protocol switches in effect.
    #[must_use]
    pub fn settings(&self) -> WopiSettings {
        self.settings
    }

    /// CheckFileInfo.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No session carries `file_id`, or the document does not exist
    /// - The token does not match or the session has expired
    /// - Storage fails
    pub async fn check_file_info(
        &self,
        file_id: &str,
        access_token: &str,
    ) -> Result<CheckFileInfo, WopiError> {
        let session = self.authorize(file_id, access_token).await?;
        let node = self.resolve(&session)?;

        let exists = node
            .exists()
            .await
            .map_err(|e| storage_failure(&session, &node, e))?;
        if !exists {
            return Err(WopiError::FileNotFound(file_id.to_string()));
        }

        let size = node
            .size()
            .await
            .map_err(|e| storage_failure(&session, &node, e))?;
        let version = version_of(&session, &node).await?;

        info!(file_id, size, "CheckFileInfo");

        let user = session.user.clone();
        Ok(CheckFileInfo {
            base_file_name: node.basename().to_string(),
            size,
            owner_id: session.account,
            user_id: user.clone().unwrap_or_else(|| "unknown".to_string()),
            user_friendly_name: user.unwrap_or_else(|| "Unknown User".to_string()),
            version,
            user_can_write: true,
            user_can_not_write_relative: true,
            supports_update: true,
            supports_locks: self.settings.supports_locks,
        })
    }

    /// GetFile.
    ///
    /// # Errors
    ///
    /// Same as [`WopiService::check_file_info`]; a location that is not a
    /// regular file is reported as not found.
    pub async fn get_file(
        &self,
        file_id: &str,
        access_token: &str,
    ) -> Result<FileContents, WopiError> {
        let session = self.authorize(file_id, access_token).await?;
        let node = self.resolve(&session)?;

        let is_file = node
            .is_file()
            .await
            .map_err(|e| storage_failure(&session, &node, e))?;
        if !is_file {
            return Err(WopiError::FileNotFound(file_id.to_string()));
        }

        let content = node
            .read_bytes()
            .await
            .map_err(|e| storage_failure(&session, &node, e))?;
        let version = version_of(&session, &node).await?;

        info!(file_id, bytes = content.len(), "GetFile");
        Ok(FileContents { content, version })
    }

    /// PutFile. Replaces the whole document.
    ///
    /// With locks enabled, `lock_id` must match the current lock; an
    /// unlocked document may only be written while it is empty.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Session, token or expiry validation fails
    /// - The lock check fails
    /// - Storage fails
    pub async fn put_file(
        &self,
        file_id: &str,
        access_token: &str,
        content: &[u8],
        lock_id: Option<&str>,
    ) -> Result<PutFileResult, WopiError> {
        let session = self.authorize(file_id, access_token).await?;
        let node = self.resolve(&session)?;

        if self.settings.supports_locks {
            self.check_write_lock(&session, &node, lock_id).await?;
        }

        node.write_bytes(content)
            .await
            .map_err(|e| storage_failure(&session, &node, e))?;
        let item_version = version_of(&session, &node).await?;

        info!(file_id, bytes = content.len(), version = %item_version, "PutFile");
        Ok(PutFileResult { item_version })
    }

    /// Lock.
    ///
    /// # Errors
    ///
    /// Returns `WopiError::LockConflict` with the current lock if another
    /// unexpired lock is held.
    pub async fn lock(
        &self,
        file_id: &str,
        access_token: &str,
        lock_id: &str,
    ) -> Result<(), WopiError> {
        self.ensure_locks()?;
        let session = self.authorize(file_id, access_token).await?;
        let lock_id = require_lock_id(lock_id)?;

        if self
            .store
            .set_lock(&session.id, lock_id, self.settings.lock_ttl_secs)
            .await?
        {
            info!(file_id, "Lock");
            return Ok(());
        }
        Err(self.conflict(&session.id).await)
    }

    /// RefreshLock.
    ///
    /// # Errors
    ///
    /// Returns `WopiError::LockConflict` unless `lock_id` holds an unexpired lock.
    pub async fn refresh_lock(
        &self,
        file_id: &str,
        access_token: &str,
        lock_id: &str,
    ) -> Result<(), WopiError> {
        self.ensure_locks()?;
        let session = self.authorize(file_id, access_token).await?;
        let lock_id = require_lock_id(lock_id)?;

        if self
            .store
            .refresh_lock(&session.id, lock_id, self.settings.lock_ttl_secs)
            .await?
        {
            info!(file_id, "RefreshLock");
            return Ok(());
        }
        Err(self.conflict(&session.id).await)
    }

    /// Unlock. Unlocking an unlocked document succeeds.
    ///
    /// # Errors
    ///
    /// Returns `WopiError::LockConflict` if the lock is held under another id.
    pub async fn unlock(
        &self,
        file_id: &str,
        access_token: &str,
        lock_id: &str,
    ) -> Result<(), WopiError> {
        self.ensure_locks()?;
        let session = self.authorize(file_id, access_token).await?;
        let lock_id = require_lock_id(lock_id)?;

        if self.store.release_lock(&session.id, lock_id).await? {
            info!(file_id, "Unlock");
            return Ok(());
        }
        Err(self.conflict(&session.id).await)
    }

    /// GetLock. An expired lock is cleared and reported as `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails or locks are disabled.
    pub async fn get_lock(
        &self,
        file_id: &str,
        access_token: &str,
    ) -> Result<Option<String>, WopiError> {
        self.ensure_locks()?;
        let session = self.authorize(file_id, access_token).await?;
        Ok(self.store.current_lock(&session).await?)
    }

    async fn authorize(&self, file_id: &str, access_token: &str) -> Result<Session, WopiError> {
        let session = match self.store.get_by_file_id(file_id).await {
            Ok(session) => session,
            Err(SessionError::NotFound(_)) => {
                return Err(WopiError::FileNotFound(file_id.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        if !constant_time_eq(access_token, &session.access_token) {
            warn!(file_id, "Rejected WOPI request: access token mismatch");
            return Err(WopiError::InvalidToken);
        }

        if session.is_expired_at(self.store.now()) {
            warn!(file_id, session_id = %session.id, "Rejected WOPI request: session expired");
            return Err(WopiError::SessionExpired);
        }

        if let Err(e) = self.store.touch(&session.id).await {
            warn!(session_id = %session.id, error = %e, "Failed to record session access");
        }

        Ok(session)
    }

    fn resolve(&self, session: &Session) -> Result<S::Node, WopiError> {
        self.storage
            .resolve(&session.tenant_id, &session.storage_name, &session.file_path)
            .map_err(|e| match e {
                StorageError::InvalidPath(reason) => {
                    warn!(
                        tenant_id = %session.tenant_id,
                        storage_name = %session.storage_name,
                        file_path = %session.file_path,
                        reason = %reason,
                        "Session addresses an invalid storage path"
                    );
                    WopiError::FileNotFound(session.file_id.clone())
                }
                other => {
                    error!(
                        tenant_id = %session.tenant_id,
                        storage_name = %session.storage_name,
                        file_path = %session.file_path,
                        error = %other,
                        "Storage resolution failed"
                    );
                    WopiError::Storage(other)
                }
            })
    }

    async fn check_write_lock(
        &self,
        session: &Session,
        node: &S::Node,
        lock_id: Option<&str>,
    ) -> Result<(), WopiError> {
        match (self.store.current_lock(session).await?, lock_id) {
            (Some(current), Some(requested)) if current == requested => Ok(()),
            (Some(current), _) => Err(WopiError::LockConflict {
                current: Some(current),
            }),
            (None, _) => {
                let exists = node
                    .exists()
                    .await
                    .map_err(|e| storage_failure(session, node, e))?;
                let size = if exists {
                    node.size()
                        .await
                        .map_err(|e| storage_failure(session, node, e))?
                } else {
                    0
                };
                if size == 0 {
                    Ok(())
                } else {
                    Err(WopiError::LockConflict { current: None })
                }
            }
        }
    }

    async fn conflict(&self, session_id: &str) -> WopiError {
        match self.store.get_lock(session_id).await {
            Ok(current) => WopiError::LockConflict { current },
            Err(e) => e.into(),
        }
    }

    fn ensure_locks(&self) -> Result<(), WopiError> {
        if self.settings.supports_locks {
            Ok(())
        } else {
            Err(WopiError::LocksNotSupported)
        }
    }
}

fn require_lock_id(lock_id: &str) -> Result<&str, WopiError> {
    if lock_id.is_empty() {
        return Err(WopiError::BadRequest("X-WOPI-Lock is required".to_string()));
    }
    Ok(lock_id)
}

async fn version_of<N: StorageNode>(session: &Session, node: &N) -> Result<String, WopiError> {
    let mtime = node
        .mtime()
        .await
        .map_err(|e| storage_failure(session, node, e))?;
    Ok(format_version(mtime))
}

fn storage_failure<N: StorageNode>(session: &Session, node: &N, err: StorageError) -> WopiError {
    error!(
        tenant_id = %session.tenant_id,
        storage_name = %session.storage_name,
        file_path = %session.file_path,
        location = %node.location(),
        error = %err,
        "Storage operation failed"
    );
    WopiError::Storage(err)
}
