//! `SeaORM` entity definitions.

#![allow(missing_docs)]

pub mod sessions;
pub mod tenants;
