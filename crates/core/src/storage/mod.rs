//! Storage collaborator.
//!
//! Sessions address documents as `(tenant_id, storage_name, file_path)`.
//! A [`StorageResolver`] turns that triple into a [`StorageNode`], an opaque
//! handle the WOPI handler reads, writes and inspects. [`LocalStorage`] is the
//! filesystem backend, built on an OpenDAL fs operator.

mod error;
mod local;

use std::future::Future;

pub use error::StorageError;
pub use local::{LocalNode, LocalStorage};

/// Handle to one file location in a tenant's storage.
pub trait StorageNode: Send + Sync {
    /// Final path component.
    fn basename(&self) -> &str;

    /// Location used in log context.
    fn location(&self) -> String;

    /// Whether anything exists at this location.
    fn exists(&self) -> impl Future<Output = Result<bool, StorageError>> + Send;

    /// Whether the location is a regular file.
    fn is_file(&self) -> impl Future<Output = Result<bool, StorageError>> + Send;

    /// Read the full content.
    fn read_bytes(&self) -> impl Future<Output = Result<Vec<u8>, StorageError>> + Send;

    /// Replace the full content.
    fn write_bytes(&self, content: &[u8])
    -> impl Future<Output = Result<(), StorageError>> + Send;

    /// Size in bytes.
    fn size(&self) -> impl Future<Output = Result<u64, StorageError>> + Send;

    /// Last modification time as a unix timestamp.
    fn mtime(&self) -> impl Future<Output = Result<f64, StorageError>> + Send;
}

/// Resolves document addresses to storage nodes.
pub trait StorageResolver: Send + Sync {
    /// Node type produced by this resolver.
    type Node: StorageNode;

    /// Resolve a document address.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidPath` if the address cannot name a node
    /// inside the tenant's storage.
    fn resolve(
        &self,
        tenant_id: &str,
        storage_name: &str,
        path: &str,
    ) -> Result<Self::Node, StorageError>;
}
