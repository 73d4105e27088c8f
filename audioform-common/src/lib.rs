//! # audioform common library
//!
//! Shared code for the audioform intake service:
//! - Bootstrap configuration (TOML + environment)
//! - Tenant route table
//! - Database initialization
//! - Event types broadcast to dashboard viewers
//! - Timestamp helpers

pub mod config;
#[cfg(feature = "sqlx")]
pub mod db;
pub mod error;
pub mod events;
pub mod tenants;
pub mod time;

pub use error::{Error, Result};
pub use tenants::{Tenant, TenantTable};
