//! Initial schema: sessions and tenants.

use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Tenants::Table)
                    .if_not_exists()
                    .col(string(Tenants::Id).primary_key())
                    .col(string(Tenants::Name))
                    .col(string(Tenants::WopiMode).default("pool"))
                    .col(string_null(Tenants::WopiClientUrl))
                    .col(string_null(Tenants::ApiKeyHash))
                    .col(boolean(Tenants::Active).default(true))
                    .col(timestamp_with_time_zone(Tenants::CreatedAt))
                    .col(timestamp_with_time_zone(Tenants::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_tenants_api_key_hash")
                    .table(Tenants::Table)
                    .col(Tenants::ApiKeyHash)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Sessions::Table)
                    .if_not_exists()
                    .col(string(Sessions::Id).primary_key())
                    .col(string(Sessions::TenantId))
                    .col(string(Sessions::StorageName))
                    .col(text(Sessions::FilePath))
                    .col(string(Sessions::FileId))
                    .col(string(Sessions::AccessToken))
                    .col(text(Sessions::Permissions))
                    .col(string(Sessions::Account))
                    .col(string_null(Sessions::User))
                    .col(string_null(Sessions::OriginConnectionId))
                    .col(string_null(Sessions::OriginPageId))
                    .col(string_null(Sessions::LockId))
                    .col(timestamp_with_time_zone_null(Sessions::LockExpiresAt))
                    .col(timestamp_with_time_zone(Sessions::CreatedAt))
                    .col(timestamp_with_time_zone(Sessions::ExpiresAt))
                    .col(timestamp_with_time_zone(Sessions::LastAccessedAt))
                    .to_owned(),
            )
            .await?;

        // Protocol lookup paths
        manager
            .create_index(
                Index::create()
                    .name("idx_sessions_file_id")
                    .table(Sessions::Table)
                    .col(Sessions::FileId)
                    .unique()
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_sessions_access_token")
                    .table(Sessions::Table)
                    .col(Sessions::AccessToken)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Cleanup sweep
        manager
            .create_index(
                Index::create()
                    .name("idx_sessions_expires_at")
                    .table(Sessions::Table)
                    .col(Sessions::ExpiresAt)
                    .to_owned(),
            )
            .await?;

        // Per-tenant listing, newest first
        manager
            .create_index(
                Index::create()
                    .name("idx_sessions_tenant_created")
                    .table(Sessions::Table)
                    .col(Sessions::TenantId)
                    .col(Sessions::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Sessions::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Tenants::Table).if_exists().to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Tenants {
    Table,
    Id,
    Name,
    WopiMode,
    WopiClientUrl,
    ApiKeyHash,
    Active,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Sessions {
    Table,
    Id,
    TenantId,
    StorageName,
    FilePath,
    FileId,
    AccessToken,
    Permissions,
    Account,
    User,
    OriginConnectionId,
    OriginPageId,
    LockId,
    LockExpiresAt,
    CreatedAt,
    ExpiresAt,
    LastAccessedAt,
}
