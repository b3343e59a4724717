//! Session repository for database operations.
//!
//! Lock transitions are single conditional `UPDATE`s; `rows_affected`
//! decides the outcome, so concurrent callers cannot both win.

use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Condition, Expr};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};

use crate::entities::sessions;
use wopi_core::session::{
    Permission, Session, SessionError, SessionRepository as SessionRepoTrait,
};

/// Session repository implementation.
#[derive(Debug, Clone)]
pub struct SessionRepository {
    db: DatabaseConnection,
}

impl SessionRepository {
    /// Creates a new session repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn db_err(e: DbErr) -> SessionError {
    SessionError::repository(e.to_string())
}

impl SessionRepoTrait for SessionRepository {
    async fn insert(&self, session: Session) -> Result<Session, SessionError> {
        let permissions = serde_json::to_string(&session.permissions)
            .map_err(|e| SessionError::repository(e.to_string()))?;

        let active_model = sessions::ActiveModel {
            id: Set(session.id.clone()),
            tenant_id: Set(session.tenant_id.clone()),
            storage_name: Set(session.storage_name.clone()),
            file_path: Set(session.file_path.clone()),
            file_id: Set(session.file_id.clone()),
            access_token: Set(session.access_token.clone()),
            permissions: Set(permissions),
            account: Set(session.account.clone()),
            user: Set(session.user.clone()),
            origin_connection_id: Set(session.origin_connection_id.clone()),
            origin_page_id: Set(session.origin_page_id.clone()),
            lock_id: Set(session.lock_id.clone()),
            lock_expires_at: Set(session.lock_expires_at),
            created_at: Set(session.created_at),
            expires_at: Set(session.expires_at),
            last_accessed_at: Set(session.last_accessed_at),
        };

        active_model.insert(&self.db).await.map_err(db_err)?;
        Ok(session)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Session>, SessionError> {
        sessions::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(to_domain)
            .transpose()
    }

    async fn find_by_token(&self, access_token: &str) -> Result<Option<Session>, SessionError> {
        sessions::Entity::find()
            .filter(sessions::Column::AccessToken.eq(access_token))
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(to_domain)
            .transpose()
    }

    async fn find_by_file_id(&self, file_id: &str) -> Result<Option<Session>, SessionError> {
        sessions::Entity::find()
            .filter(sessions::Column::FileId.eq(file_id))
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(to_domain)
            .transpose()
    }

    async fn touch(&self, id: &str, at: DateTime<Utc>) -> Result<bool, SessionError> {
        let result = sessions::Entity::update_many()
            .col_expr(sessions::Column::LastAccessedAt, Expr::value(at))
            .filter(sessions::Column::Id.eq(id))
            .exec(&self.db)
            .await
            .map_err(db_err)?;

        Ok(result.rows_affected > 0)
    }

    async fn list_active(
        &self,
        tenant_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Vec<Session>, SessionError> {
        let mut query = sessions::Entity::find().filter(sessions::Column::ExpiresAt.gt(now));
        if let Some(tenant_id) = tenant_id {
            query = query.filter(sessions::Column::TenantId.eq(tenant_id));
        }

        query
            .order_by_desc(sessions::Column::CreatedAt)
            .order_by_asc(sessions::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(to_domain)
            .collect()
    }

    async fn count_expired(&self, now: DateTime<Utc>) -> Result<u64, SessionError> {
        sessions::Entity::find()
            .filter(sessions::Column::ExpiresAt.lte(now))
            .count(&self.db)
            .await
            .map_err(db_err)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, SessionError> {
        let result = sessions::Entity::delete_many()
            .filter(sessions::Column::ExpiresAt.lte(now))
            .exec(&self.db)
            .await
            .map_err(db_err)?;

        Ok(result.rows_affected)
    }

    async fn delete(&self, id: &str) -> Result<bool, SessionError> {
        let result = sessions::Entity::delete_many()
            .filter(sessions::Column::Id.eq(id))
            .exec(&self.db)
            .await
            .map_err(db_err)?;

        Ok(result.rows_affected > 0)
    }

    async fn try_lock(
        &self,
        id: &str,
        lock_id: &str,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<bool, SessionError> {
        let result = sessions::Entity::update_many()
            .col_expr(sessions::Column::LockId, Expr::value(lock_id))
            .col_expr(sessions::Column::LockExpiresAt, Expr::value(expires_at))
            .filter(sessions::Column::Id.eq(id))
            .filter(
                Condition::any()
                    .add(sessions::Column::LockId.is_null())
                    .add(sessions::Column::LockId.eq(lock_id))
                    .add(sessions::Column::LockExpiresAt.lte(now)),
            )
            .exec(&self.db)
            .await
            .map_err(db_err)?;

        Ok(result.rows_affected > 0)
    }

    async fn refresh_lock(
        &self,
        id: &str,
        lock_id: &str,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<bool, SessionError> {
        let result = sessions::Entity::update_many()
            .col_expr(sessions::Column::LockExpiresAt, Expr::value(expires_at))
            .filter(sessions::Column::Id.eq(id))
            .filter(sessions::Column::LockId.eq(lock_id))
            .filter(sessions::Column::LockExpiresAt.gt(now))
            .exec(&self.db)
            .await
            .map_err(db_err)?;

        Ok(result.rows_affected > 0)
    }

    async fn unlock(&self, id: &str, lock_id: &str) -> Result<bool, SessionError> {
        let result = sessions::Entity::update_many()
            .col_expr(sessions::Column::LockId, Expr::value(Option::<String>::None))
            .col_expr(
                sessions::Column::LockExpiresAt,
                Expr::value(Option::<DateTime<Utc>>::None),
            )
            .filter(sessions::Column::Id.eq(id))
            .filter(
                Condition::any()
                    .add(sessions::Column::LockId.is_null())
                    .add(sessions::Column::LockId.eq(lock_id)),
            )
            .exec(&self.db)
            .await
            .map_err(db_err)?;

        Ok(result.rows_affected > 0)
    }

    async fn clear_expired_lock(
        &self,
        id: &str,
        lock_id: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, SessionError> {
        let result = sessions::Entity::update_many()
            .col_expr(sessions::Column::LockId, Expr::value(Option::<String>::None))
            .col_expr(
                sessions::Column::LockExpiresAt,
                Expr::value(Option::<DateTime<Utc>>::None),
            )
            .filter(sessions::Column::Id.eq(id))
            .filter(sessions::Column::LockId.eq(lock_id))
            .filter(sessions::Column::LockExpiresAt.lte(now))
            .exec(&self.db)
            .await
            .map_err(db_err)?;

        Ok(result.rows_affected > 0)
    }
}

/// Convert a database row to the domain session.
fn to_domain(model: sessions::Model) -> Result<Session, SessionError> {
    let permissions: Vec<Permission> = serde_json::from_str(&model.permissions).map_err(|e| {
        SessionError::repository(format!(
            "invalid permissions on session {}: {e}",
            model.id
        ))
    })?;

    Ok(Session {
        id: model.id,
        tenant_id: model.tenant_id,
        storage_name: model.storage_name,
        file_path: model.file_path,
        file_id: model.file_id,
        access_token: model.access_token,
        permissions,
        account: model.account,
        user: model.user,
        origin_connection_id: model.origin_connection_id,
        origin_page_id: model.origin_page_id,
        lock_id: model.lock_id,
        lock_expires_at: model.lock_expires_at,
        created_at: model.created_at,
        expires_at: model.expires_at,
        last_accessed_at: model.last_accessed_at,
    })
}
