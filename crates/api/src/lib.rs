//! HTTP API layer with Axum routes and middleware.
//!
//! This crate provides:
//! - The WOPI wire protocol under `/wopi`
//! - Session and tenant administration under `/api/v1`
//! - Authentication middleware resolving the tenant context
//! - Error-to-response mapping and JSON body extraction

pub mod error;
pub mod extract;
pub mod middleware;
pub mod routes;

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{HeaderName, Request},
};
use sea_orm::DatabaseConnection;
use tower_http::cors::{Any, CorsLayer};
use tower_http::sensitive_headers::SetSensitiveRequestHeadersLayer;
use tower_http::trace::TraceLayer;
use tracing::Span;
use wopi_core::clock::Clock;
use wopi_core::session::{SessionEndpoint, SessionStore};
use wopi_core::storage::{LocalStorage, StorageError};
use wopi_core::wopi::{WopiService, WopiSettings};
use wopi_db::{SessionRepository, TenantRepository};
use wopi_shared::AppConfig;

pub use error::ApiError;

/// Session store backed by the database.
pub type Store = SessionStore<SessionRepository>;

/// WOPI handler backed by the database and local storage.
pub type Wopi = WopiService<SessionRepository, LocalStorage>;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Loaded configuration.
    pub config: Arc<AppConfig>,
    /// Session store, shared with the background sweep.
    pub store: Arc<Store>,
    /// Administrative session operations.
    pub sessions: Arc<SessionEndpoint<SessionRepository>>,
    /// WOPI protocol handler.
    pub wopi: Arc<Wopi>,
    /// Tenant records and API keys.
    pub tenants: Arc<TenantRepository>,
}

impl AppState {
    /// Wires the services over one database connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage configuration is invalid.
    pub fn new(
        config: AppConfig,
        db: DatabaseConnection,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, StorageError> {
        let storage = Arc::new(LocalStorage::from_config(&config.storage)?);
        let store = Arc::new(SessionStore::new(
            Arc::new(SessionRepository::new(db.clone())),
            clock,
        ));
        let sessions = Arc::new(SessionEndpoint::new(
            Arc::clone(&store),
            config.wopi.token_ttl_secs,
        ));
        let wopi = Arc::new(WopiService::new(
            Arc::clone(&store),
            storage,
            WopiSettings {
                supports_locks: config.wopi.supports_locks,
                lock_ttl_secs: config.wopi.lock_ttl_secs,
            },
        ));

        Ok(Self {
            config: Arc::new(config),
            store,
            sessions,
            wopi,
            tenants: Arc::new(TenantRepository::new(db)),
        })
    }
}

/// Request span without the query string, which carries WOPI access tokens.
fn request_span(request: &Request<Body>) -> Span {
    tracing::info_span!(
        "request",
        method = %request.method(),
        path = %request.uri().path(),
    )
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(routes::health::routes())
        .merge(routes::wopi::routes())
        .nest("/api/v1", routes::api_routes_with_state(state.clone()))
        .layer(TraceLayer::new_for_http().make_span_with(request_span))
        .layer(SetSensitiveRequestHeadersLayer::new([HeaderName::from_static(
            middleware::auth::API_TOKEN_HEADER,
        )]))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
