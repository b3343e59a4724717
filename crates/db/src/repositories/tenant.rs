//! Tenant repository for database operations.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use sha2::{Digest, Sha256};
use tracing::info;

use crate::entities::tenants;
use wopi_core::session::token::generate_api_key;
use wopi_core::tenant::{Tenant, TenantError, UpsertTenantInput, WopiMode};
use wopi_shared::DEFAULT_TENANT;

/// Tenant repository for CRUD operations.
#[derive(Debug, Clone)]
pub struct TenantRepository {
    db: DatabaseConnection,
}

fn db_err(e: DbErr) -> TenantError {
    TenantError::Repository(e.to_string())
}

impl TenantRepository {
    /// Creates a new tenant repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Hashes an API key for storage.
    #[must_use]
    pub fn hash_api_key(key: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(key.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Creates the `default` tenant if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn ensure_default(&self) -> Result<Tenant, TenantError> {
        if let Some(tenant) = self.get(DEFAULT_TENANT).await? {
            return Ok(tenant);
        }

        let tenant = self
            .upsert(UpsertTenantInput {
                id: DEFAULT_TENANT.to_string(),
                name: "Default".to_string(),
                wopi_mode: WopiMode::Pool,
                wopi_client_url: None,
                active: true,
            })
            .await?;
        info!(tenant_id = %tenant.id, "Default tenant created");
        Ok(tenant)
    }

    /// Finds a tenant by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn get(&self, id: &str) -> Result<Option<Tenant>, TenantError> {
        tenants::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(to_domain)
            .transpose()
    }

    /// Lists all tenants ordered by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(&self) -> Result<Vec<Tenant>, TenantError> {
        tenants::Entity::find()
            .order_by_asc(tenants::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(to_domain)
            .collect()
    }

    /// Creates a tenant or updates an existing one. The API key is kept.
    ///
    /// # Errors
    ///
    /// Returns an error if validation or the database operation fails.
    pub async fn upsert(&self, input: UpsertTenantInput) -> Result<Tenant, TenantError> {
        input.validate()?;
        let now = Utc::now();

        let existing = tenants::Entity::find_by_id(input.id.as_str())
            .one(&self.db)
            .await
            .map_err(db_err)?;

        let model = if let Some(existing) = existing {
            let mut active: tenants::ActiveModel = existing.into();
            active.name = Set(input.name);
            active.wopi_mode = Set(input.wopi_mode.as_str().to_string());
            active.wopi_client_url = Set(input.wopi_client_url);
            active.active = Set(input.active);
            active.updated_at = Set(now);
            active.update(&self.db).await.map_err(db_err)?
        } else {
            tenants::ActiveModel {
                id: Set(input.id),
                name: Set(input.name),
                wopi_mode: Set(input.wopi_mode.as_str().to_string()),
                wopi_client_url: Set(input.wopi_client_url),
                api_key_hash: Set(None),
                active: Set(input.active),
                created_at: Set(now),
                updated_at: Set(now),
            }
            .insert(&self.db)
            .await
            .map_err(db_err)?
        };

        to_domain(model)
    }

    /// Issues a new API key for a tenant, replacing any previous one.
    ///
    /// The plaintext key is returned once; only its hash is stored.
    ///
    /// # Errors
    ///
    /// Returns `TenantError::NotFound` if the tenant does not exist.
    pub async fn create_api_key(&self, id: &str) -> Result<String, TenantError> {
        let existing = tenants::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or_else(|| TenantError::NotFound(id.to_string()))?;

        let key = generate_api_key();
        let mut active: tenants::ActiveModel = existing.into();
        active.api_key_hash = Set(Some(Self::hash_api_key(&key)));
        active.updated_at = Set(Utc::now());
        active.update(&self.db).await.map_err(db_err)?;

        info!(tenant_id = %id, "Tenant API key issued");
        Ok(key)
    }

    /// Revokes the tenant's API key. Returns whether a key was set.
    ///
    /// # Errors
    ///
    /// Returns `TenantError::NotFound` if the tenant does not exist.
    pub async fn revoke_api_key(&self, id: &str) -> Result<bool, TenantError> {
        let existing = tenants::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or_else(|| TenantError::NotFound(id.to_string()))?;

        if existing.api_key_hash.is_none() {
            return Ok(false);
        }

        let mut active: tenants::ActiveModel = existing.into();
        active.api_key_hash = Set(None);
        active.updated_at = Set(Utc::now());
        active.update(&self.db).await.map_err(db_err)?;

        info!(tenant_id = %id, "Tenant API key revoked");
        Ok(true)
    }

    /// Finds the active tenant owning an API key.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_api_key(&self, key: &str) -> Result<Option<Tenant>, TenantError> {
        tenants::Entity::find()
            .filter(tenants::Column::ApiKeyHash.eq(Self::hash_api_key(key)))
            .filter(tenants::Column::Active.eq(true))
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(to_domain)
            .transpose()
    }
}

/// Convert a database row to the domain tenant.
fn to_domain(model: tenants::Model) -> Result<Tenant, TenantError> {
    let wopi_mode = WopiMode::parse(&model.wopi_mode).ok_or_else(|| {
        TenantError::Repository(format!(
            "unknown wopi_mode {:?} on tenant {}",
            model.wopi_mode, model.id
        ))
    })?;

    Ok(Tenant {
        id: model.id,
        name: model.name,
        wopi_mode,
        wopi_client_url: model.wopi_client_url,
        active: model.active,
        created_at: model.created_at,
        updated_at: model.updated_at,
    })
}
