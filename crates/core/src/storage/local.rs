//! Filesystem storage backend on Apache OpenDAL.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use opendal::{ErrorKind, Metadata, Operator, services};
use tracing::debug;
use wopi_shared::config::StorageConfig;

use super::error::StorageError;
use super::{StorageNode, StorageResolver};

/// Staging directory for atomic writes, kept inside each operator root.
const STAGING_DIR: &str = ".wopi-staging";

/// Checks a single path segment used as a directory name.
fn validate_segment(kind: &str, value: &str) -> Result<(), StorageError> {
    if value.is_empty() || value.starts_with('.') || value.contains(['/', '\\', '\0']) {
        return Err(StorageError::invalid_path(format!(
            "invalid {kind}: {value:?}"
        )));
    }
    Ok(())
}

/// Normalizes a document path to relative components.
///
/// Leading slashes, empty segments and `.` are dropped. `..` is rejected
/// rather than resolved.
fn sanitize_file_path(path: &str) -> Result<Vec<&str>, StorageError> {
    let mut parts = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                return Err(StorageError::invalid_path(format!(
                    "parent traversal in {path:?}"
                )));
            }
            STAGING_DIR => {
                return Err(StorageError::invalid_path(format!(
                    "reserved segment in {path:?}"
                )));
            }
            p if p.contains(['\\', '\0']) => {
                return Err(StorageError::invalid_path(format!(
                    "invalid character in {path:?}"
                )));
            }
            p => parts.push(p),
        }
    }
    if parts.is_empty() {
        return Err(StorageError::invalid_path("empty file path"));
    }
    Ok(parts)
}

/// Create an fs operator rooted at `root`.
///
/// Writes are staged under [`STAGING_DIR`] and renamed into place once synced.
fn create_operator(root: &Path) -> Result<Operator, StorageError> {
    let root_str = root.to_str().ok_or_else(|| {
        StorageError::configuration(format!("non UTF-8 storage root {}", root.display()))
    })?;
    let staging = format!("{}/{STAGING_DIR}", root_str.trim_end_matches('/'));

    let builder = services::Fs::default()
        .root(root_str)
        .atomic_write_dir(&staging);

    Ok(Operator::new(builder)
        .map_err(|e| StorageError::configuration(e.to_string()))?
        .finish())
}

#[derive(Debug, Clone)]
struct Mount {
    path: PathBuf,
    operator: Operator,
}

/// Filesystem storage.
///
/// Storages live under `root/{tenant_id}/{storage_name}` unless a mount maps
/// the pair to an explicit directory. Each root gets its own operator.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
    operator: Operator,
    mounts: HashMap<(String, String), Mount>,
}

impl LocalStorage {
    /// Storage rooted at `root` with no explicit mounts.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Configuration` if no operator can be built for
    /// `root`.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        let operator = create_operator(&root)?;
        Ok(Self {
            root,
            operator,
            mounts: HashMap::new(),
        })
    }

    /// Build from configuration.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Configuration` for a mount with an invalid
    /// tenant or storage name, a duplicate mount, or a root no operator can
    /// be built for.
    pub fn from_config(config: &StorageConfig) -> Result<Self, StorageError> {
        let mut storage = Self::new(config.root.clone())?;
        for mount in &config.mounts {
            validate_segment("tenant id", &mount.tenant_id)
                .and_then(|()| validate_segment("storage name", &mount.name))
                .map_err(|e| StorageError::configuration(e.to_string()))?;

            let key = (mount.tenant_id.clone(), mount.name.clone());
            if storage.mounts.contains_key(&key) {
                return Err(StorageError::configuration(format!(
                    "duplicate mount {}/{}",
                    mount.tenant_id, mount.name
                )));
            }
            storage.mounts.insert(
                key,
                Mount {
                    path: mount.path.clone(),
                    operator: create_operator(&mount.path)?,
                },
            );
        }
        Ok(storage)
    }

    /// Map `(tenant_id, storage_name)` to an explicit directory.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Configuration` if no operator can be built for
    /// `path`.
    pub fn with_mount(
        mut self,
        tenant_id: impl Into<String>,
        storage_name: impl Into<String>,
        path: impl Into<PathBuf>,
    ) -> Result<Self, StorageError> {
        let path = path.into();
        let operator = create_operator(&path)?;
        self.mounts.insert(
            (tenant_id.into(), storage_name.into()),
            Mount { path, operator },
        );
        Ok(self)
    }
}

impl StorageResolver for LocalStorage {
    type Node = LocalNode;

    fn resolve(
        &self,
        tenant_id: &str,
        storage_name: &str,
        path: &str,
    ) -> Result<LocalNode, StorageError> {
        validate_segment("tenant id", tenant_id)?;
        validate_segment("storage name", storage_name)?;
        let parts = sanitize_file_path(path)?;
        let relative = parts.join("/");
        let basename = parts.last().map(ToString::to_string).unwrap_or_default();

        let mount = self
            .mounts
            .get(&(tenant_id.to_string(), storage_name.to_string()));
        let (operator, base, key) = match mount {
            Some(m) => (m.operator.clone(), &m.path, relative),
            None => (
                self.operator.clone(),
                &self.root,
                format!("{tenant_id}/{storage_name}/{relative}"),
            ),
        };

        Ok(LocalNode {
            location: format!("{}/{key}", base.display().to_string().trim_end_matches('/')),
            operator,
            key,
            basename,
        })
    }
}

/// A file location behind a storage operator.
#[derive(Debug, Clone)]
pub struct LocalNode {
    operator: Operator,
    key: String,
    basename: String,
    location: String,
}

impl LocalNode {
    /// Key relative to the operator root.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    async fn stat(&self) -> Result<Option<Metadata>, StorageError> {
        match self.operator.stat(&self.key).await {
            Ok(meta) => Ok(Some(meta)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn require_stat(&self) -> Result<Metadata, StorageError> {
        self.stat().await?.ok_or_else(|| StorageError::NotFound {
            key: self.key.clone(),
        })
    }
}

impl StorageNode for LocalNode {
    fn basename(&self) -> &str {
        &self.basename
    }

    fn location(&self) -> String {
        self.location.clone()
    }

    async fn exists(&self) -> Result<bool, StorageError> {
        Ok(self.stat().await?.is_some())
    }

    async fn is_file(&self) -> Result<bool, StorageError> {
        Ok(self
            .stat()
            .await?
            .is_some_and(|meta| meta.mode().is_file()))
    }

    async fn read_bytes(&self) -> Result<Vec<u8>, StorageError> {
        let buffer = self.operator.read(&self.key).await?;
        Ok(buffer.to_vec())
    }

    async fn write_bytes(&self, content: &[u8]) -> Result<(), StorageError> {
        self.operator.write(&self.key, content.to_vec()).await?;
        debug!(location = %self.location, bytes = content.len(), "File written");
        Ok(())
    }

    async fn size(&self) -> Result<u64, StorageError> {
        Ok(self.require_stat().await?.content_length())
    }

    async fn mtime(&self) -> Result<f64, StorageError> {
        let meta = self.require_stat().await?;
        Ok(meta
            .last_modified()
            .map(SystemTime::from)
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map_or(0.0, |d| d.as_secs_f64()))
    }
}
