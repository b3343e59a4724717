//! WOPI proxy server.
//!
//! Main entry point: loads configuration, prepares the database, and serves
//! the WOPI protocol alongside the administrative API.

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wopi_api::{AppState, Store, create_router};
use wopi_core::clock::SystemClock;
use wopi_db::connect;
use wopi_db::migration::{Migrator, MigratorTrait};
use wopi_shared::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wopi=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load()?;

    let db = connect(&config.database).await?;
    info!("Connected to database");
    Migrator::up(&db, None).await?;

    let state = AppState::new(config.clone(), db, Arc::new(SystemClock))?;
    let default_tenant = state.tenants.ensure_default().await?;
    info!(tenant_id = %default_tenant.id, "Default tenant ready");

    if config.auth.api_token.is_none() {
        info!("No admin token configured; administrative API acts for the default tenant");
    }

    if let Some(secs) = config.wopi.cleanup_interval_secs.filter(|s| *s > 0) {
        tokio::spawn(sweep_expired(Arc::clone(&state.store), Duration::from_secs(secs)));
        info!(interval_secs = secs, "Expired session sweep enabled");
    }

    let app = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!(
        supports_locks = config.wopi.supports_locks,
        "Server listening on {}", addr
    );

    axum::serve(listener, app).await?;

    Ok(())
}

/// Periodically deletes expired sessions.
async fn sweep_expired(store: Arc<Store>, period: Duration) {
    let mut interval = tokio::time::interval(period);
    // The first tick completes immediately.
    interval.tick().await;
    loop {
        interval.tick().await;
        match store.cleanup_expired().await {
            Ok(0) => {}
            Ok(deleted) => info!(deleted, "Swept expired sessions"),
            Err(e) => error!(error = %e, "Expired session sweep failed"),
        }
    }
}
