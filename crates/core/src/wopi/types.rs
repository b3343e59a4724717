//! WOPI wire types.

use serde::Serialize;

/// CheckFileInfo response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CheckFileInfo {
    /// File name without path.
    pub base_file_name: String,
    /// Size in bytes.
    pub size: u64,
    /// Owning account.
    pub owner_id: String,
    /// Editing user id.
    pub user_id: String,
    /// Editing user display name.
    pub user_friendly_name: String,
    /// Current version.
    pub version: String,
    /// Whether the user may write.
    pub user_can_write: bool,
    /// Whether the user is barred from creating files next to this one.
    pub user_can_not_write_relative: bool,
    /// Whether PutFile is supported.
    pub supports_update: bool,
    /// Whether the lock verbs are supported.
    pub supports_locks: bool,
}

/// GetFile result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileContents {
    /// Full file content.
    pub content: Vec<u8>,
    /// Version sent as `X-WOPI-ItemVersion`.
    pub version: String,
}

/// PutFile response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PutFileResult {
    /// Version after the write.
    pub item_version: String,
}

/// Version string derived from a modification time in unix seconds.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn format_version(mtime: f64) -> String {
    (mtime.trunc() as i64).to_string()
}
