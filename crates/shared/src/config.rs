//! Application configuration management.

use std::path::PathBuf;

use serde::Deserialize;

/// Tenant used when no tenant is resolved from the request.
pub const DEFAULT_TENANT: &str = "default";

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Administrative API authentication.
    #[serde(default)]
    pub auth: AuthConfig,
    /// WOPI protocol settings.
    #[serde(default)]
    pub wopi: WopiConfig,
    /// Document storage settings.
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL (`postgres://...` or `sqlite://...`).
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// Administrative API authentication.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthConfig {
    /// Global admin token expected in `X-API-Token`. `None` leaves the
    /// administrative surface open for the default tenant.
    #[serde(default)]
    pub api_token: Option<String>,
}

/// WOPI protocol settings.
#[derive(Debug, Clone, Deserialize)]
pub struct WopiConfig {
    /// Default session TTL in seconds.
    #[serde(default = "default_token_ttl")]
    pub token_ttl_secs: u64,
    /// Collaborative lock TTL in seconds.
    #[serde(default = "default_lock_ttl")]
    pub lock_ttl_secs: u64,
    /// Shared (pool) WOPI client URL.
    #[serde(default = "default_client_url")]
    pub client_url: String,
    /// Externally reachable base URL of this service, used to build `WOPISrc`.
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
    /// Advertise and enforce WOPI locks.
    #[serde(default)]
    pub supports_locks: bool,
    /// Interval of the background sweep of expired sessions. Disabled when unset.
    #[serde(default)]
    pub cleanup_interval_secs: Option<u64>,
}

impl Default for WopiConfig {
    fn default() -> Self {
        Self {
            token_ttl_secs: default_token_ttl(),
            lock_ttl_secs: default_lock_ttl(),
            client_url: default_client_url(),
            public_base_url: default_public_base_url(),
            supports_locks: false,
            cleanup_interval_secs: None,
        }
    }
}

fn default_token_ttl() -> u64 {
    3600 // 1 hour
}

fn default_lock_ttl() -> u64 {
    1800 // 30 minutes
}

fn default_client_url() -> String {
    "https://collabora.example.com".to_string()
}

fn default_public_base_url() -> String {
    "http://localhost:8000".to_string()
}

/// Document storage settings for the local backend.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Base directory; documents live under `root/{tenant_id}/{storage_name}`.
    #[serde(default = "default_storage_root")]
    pub root: PathBuf,
    /// Explicit per-tenant storage locations.
    #[serde(default)]
    pub mounts: Vec<StorageMount>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: default_storage_root(),
            mounts: Vec::new(),
        }
    }
}

fn default_storage_root() -> PathBuf {
    PathBuf::from("./storage")
}

/// A named storage of one tenant mapped to an explicit directory.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageMount {
    /// Owning tenant.
    pub tenant_id: String,
    /// Storage name referenced by sessions.
    pub name: String,
    /// Directory backing the storage.
    pub path: PathBuf,
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("WOPI").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}
