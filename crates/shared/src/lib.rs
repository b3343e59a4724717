//! Shared configuration and error types for the WOPI proxy.
//!
//! This crate provides common types used across all other crates:
//! - Application-wide error types
//! - Configuration management

pub mod config;
pub mod error;

pub use config::{AppConfig, DEFAULT_TENANT};
pub use error::{AppError, AppResult, INTERNAL_MESSAGE};
