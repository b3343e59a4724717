//! Core business logic for the WOPI proxy.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! Persistence is reached through the repository traits implemented by the db
//! crate, document bytes through the storage traits.
//!
//! # Modules
//!
//! - `clock` - Injected UTC time source
//! - `session` - Session store, token authority, lock manager, administrative endpoint
//! - `storage` - Storage collaborator traits and the local filesystem backend
//! - `tenant` - Tenant context and WOPI client resolution
//! - `wopi` - CheckFileInfo, GetFile, PutFile and the lock verbs

pub mod clock;
pub mod session;
pub mod storage;
pub mod tenant;
pub mod wopi;
