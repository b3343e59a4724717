//! WOPI protocol handler.
//!
//! Implements CheckFileInfo, GetFile and PutFile over the session store and
//! the storage collaborator, plus the lock verbs when locks are enabled.
//!
//! Every verb validates in a fixed order: session lookup by `file_id`, then
//! the access token, then session expiry, and only then the storage node.
//! A caller holding a wrong token therefore never learns whether a file exists.

mod error;
mod service;
mod types;


pub use error::WopiError;
pub use service::{WopiService, WopiSettings};
pub use types::{CheckFileInfo, FileContents, PutFileResult, format_version};
