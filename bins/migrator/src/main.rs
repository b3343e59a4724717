//! Database migration runner.
//!
//! Reads `DATABASE_URL` (or `-u <url>`), so it works against PostgreSQL and
//! SQLite alike.
//!
//! Usage:
//!   migrator up      - Apply pending migrations
//!   migrator down    - Roll back the last migration
//!   migrator status  - Show applied and pending migrations
//!   migrator fresh   - Drop everything and migrate from scratch

use sea_orm_migration::prelude::*;
use wopi_db::migration::Migrator;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    cli::run_cli(Migrator).await;
}
