//! Shared harness for router tests: SQLite in memory, a temp storage root and
//! a manual clock.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, Response, StatusCode},
};
use chrono::{TimeZone, Utc};
use http_body_util::BodyExt;
use sea_orm::Database;
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;
use wopi_api::{AppState, create_router};
use wopi_core::clock::{Clock, ManualClock};
use wopi_db::migration::{Migrator, MigratorTrait};
use wopi_shared::AppConfig;
use wopi_shared::config::{
    AuthConfig, DatabaseConfig, ServerConfig, StorageConfig, WopiConfig,
};

pub const ADMIN_TOKEN: &str = "admin-secret";

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub clock: Arc<ManualClock>,
    pub storage: TempDir,
}

pub fn config(storage_root: PathBuf) -> AppConfig {
    AppConfig {
        server: ServerConfig::default(),
        database: DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            min_connections: 1,
        },
        auth: AuthConfig::default(),
        wopi: WopiConfig {
            public_base_url: "https://proxy.example".to_string(),
            client_url: "https://office.example".to_string(),
            ..WopiConfig::default()
        },
        storage: StorageConfig {
            root: storage_root,
            mounts: Vec::new(),
        },
    }
}

pub async fn spawn_app(configure: impl FnOnce(&mut AppConfig)) -> TestApp {
    let storage = TempDir::new().unwrap();
    let mut config = config(storage.path().to_path_buf());
    configure(&mut config);

    let db = Database::connect(config.database.url.as_str())
        .await
        .expect("Failed to connect to database");
    Migrator::up(&db, None).await.expect("Failed to migrate");

    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap(),
    ));
    let state = AppState::new(config, db, Arc::clone(&clock) as Arc<dyn Clock>).unwrap();
    state.tenants.ensure_default().await.unwrap();

    TestApp {
        router: create_router(state.clone()),
        state,
        clock,
        storage,
    }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// Writes a document below `root/{tenant}/{storage}`.
    pub fn seed_document(&self, tenant: &str, storage: &str, path: &str, content: &[u8]) {
        let full = self.storage.path().join(tenant).join(storage).join(path);
        std::fs::create_dir_all(full.parent().unwrap()).unwrap();
        std::fs::write(full, content).unwrap();
    }

    pub fn document_path(&self, tenant: &str, storage: &str, path: &str) -> PathBuf {
        self.storage.path().join(tenant).join(storage).join(path)
    }

    /// Opens a session through the admin API and returns the response body.
    pub async fn create_session(&self, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/api/v1/sessions")
            .header("content-type", "application/json");
        if let Some(token) = token {
            builder = builder.header("x-api-token", token);
        }
        let response = self
            .send(builder.body(Body::from(body.to_string())).unwrap())
            .await;
        let status = response.status();
        (status, json_body(response).await)
    }

    /// Default-tenant session on `docs/report.docx` with view and edit.
    pub async fn open_report(&self, ttl_seconds: u64) -> Value {
        let (status, body) = self
            .create_session(
                None,
                json!({
                    "storage_name": "docs",
                    "file_path": "report.docx",
                    "permissions": ["view", "edit"],
                    "account": "sales",
                    "user": "Ada",
                    "ttl_seconds": ttl_seconds,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body
    }
}

pub async fn json_body(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn raw_body(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn admin_request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("x-api-token", token);
    }
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub fn wopi_uri(session: &Value, suffix: &str) -> String {
    format!(
        "/wopi/files/{}{suffix}?access_token={}",
        session["file_id"].as_str().unwrap(),
        session["access_token"].as_str().unwrap()
    )
}
