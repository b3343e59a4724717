//! In-memory session repository for unit tests.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};

use super::error::SessionError;
use super::repository::SessionRepository;
use super::types::Session;

#[derive(Default)]
pub(crate) struct InMemorySessionRepository {
    sessions: Mutex<HashMap<String, Session>>,
}

impl InMemorySessionRepository {
    fn sessions(&self) -> MutexGuard<'_, HashMap<String, Session>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn len(&self) -> usize {
        self.sessions().len()
    }
}

impl SessionRepository for InMemorySessionRepository {
    async fn insert(&self, session: Session) -> Result<Session, SessionError> {
        let mut sessions = self.sessions();
        if sessions.values().any(|s| {
            s.id == session.id
                || s.file_id == session.file_id
                || s.access_token == session.access_token
        }) {
            return Err(SessionError::repository("duplicate key"));
        }
        sessions.insert(session.id.clone(), session.clone());
        Ok(session)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Session>, SessionError> {
        Ok(self.sessions().get(id).cloned())
    }

    async fn find_by_token(&self, access_token: &str) -> Result<Option<Session>, SessionError> {
        Ok(self
            .sessions()
            .values()
            .find(|s| s.access_token == access_token)
            .cloned())
    }

    async fn find_by_file_id(&self, file_id: &str) -> Result<Option<Session>, SessionError> {
        Ok(self
            .sessions()
            .values()
            .find(|s| s.file_id == file_id)
            .cloned())
    }

    async fn touch(&self, id: &str, at: DateTime<Utc>) -> Result<bool, SessionError> {
        Ok(self
            .sessions()
            .get_mut(id)
            .map(|s| s.last_accessed_at = at)
            .is_some())
    }

    async fn list_active(
        &self,
        tenant_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Vec<Session>, SessionError> {
        let mut active: Vec<Session> = self
            .sessions()
            .values()
            .filter(|s| !s.is_expired_at(now))
            .filter(|s| tenant_id.is_none_or(|t| s.tenant_id == t))
            .cloned()
            .collect();
        active.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(active)
    }

    async fn count_expired(&self, now: DateTime<Utc>) -> Result<u64, SessionError> {
        Ok(self
            .sessions()
            .values()
            .filter(|s| s.is_expired_at(now))
            .count() as u64)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, SessionError> {
        let mut sessions = self.sessions();
        let before = sessions.len();
        sessions.retain(|_, s| !s.is_expired_at(now));
        Ok((before - sessions.len()) as u64)
    }

    async fn delete(&self, id: &str) -> Result<bool, SessionError> {
        Ok(self.sessions().remove(id).is_some())
    }

    async fn try_lock(
        &self,
        id: &str,
        lock_id: &str,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<bool, SessionError> {
        let mut sessions = self.sessions();
        let Some(session) = sessions.get_mut(id) else {
            return Ok(false);
        };
        if !session.lock_state().admits(lock_id, now) {
            return Ok(false);
        }
        session.lock_id = Some(lock_id.to_string());
        session.lock_expires_at = Some(expires_at);
        Ok(true)
    }

    async fn refresh_lock(
        &self,
        id: &str,
        lock_id: &str,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<bool, SessionError> {
        let mut sessions = self.sessions();
        let Some(session) = sessions.get_mut(id) else {
            return Ok(false);
        };
        if !session.lock_state().refreshable_by(lock_id, now) {
            return Ok(false);
        }
        session.lock_expires_at = Some(expires_at);
        Ok(true)
    }

    async fn unlock(&self, id: &str, lock_id: &str) -> Result<bool, SessionError> {
        let mut sessions = self.sessions();
        let Some(session) = sessions.get_mut(id) else {
            return Ok(false);
        };
        if !session.lock_state().releasable_by(lock_id) {
            return Ok(false);
        }
        session.lock_id = None;
        session.lock_expires_at = None;
        Ok(true)
    }

    async fn clear_expired_lock(
        &self,
        id: &str,
        lock_id: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, SessionError> {
        let mut sessions = self.sessions();
        let Some(session) = sessions.get_mut(id) else {
            return Ok(false);
        };
        let stale = session.lock_id.as_deref() == Some(lock_id)
            && session.lock_expires_at.is_some_and(|at| at <= now);
        if stale {
            session.lock_id = None;
            session.lock_expires_at = None;
        }
        Ok(stale)
    }
}
