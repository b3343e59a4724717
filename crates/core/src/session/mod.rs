//! WOPI editing sessions.
//!
//! A session binds one document location `(tenant, storage, path)` to a pair
//! of opaque credentials (`file_id`, `access_token`) handed to the editor.
//! This module provides:
//! - Credential generation and comparison (`token`)
//! - The persistence seam implemented by the db crate (`SessionRepository`)
//! - Session lifecycle and the per-session collaborative lock (`SessionStore`)
//! - The administrative surface used by the HTTP layer (`SessionEndpoint`)

mod endpoint;
mod error;
mod repository;
mod store;
pub mod token;
mod types;

#[cfg(test)]
pub(crate) mod memory;
#[cfg(test)]
mod tests;

pub use endpoint::{CleanupReport, CreateSessionRequest, SessionEndpoint};
pub use error::SessionError;
pub use repository::SessionRepository;
pub use store::{DEFAULT_LOCK_TTL_SECS, DEFAULT_SESSION_TTL_SECS, SessionStore};
pub use types::{CreateSessionInput, LockState, Permission, Session, normalize_permissions};
