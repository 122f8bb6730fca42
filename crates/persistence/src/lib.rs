//! Persistence layer for the check-in backend.
//!
//! This crate contains:
//! - Database connection management
//! - Entity definitions (database row mappings)
//! - PostgreSQL repositories implementing the domain storage traits
//! - A JSON-file store for single-client deployments

pub mod db;
pub mod entities;
pub mod local;
pub mod metrics;
pub mod repositories;

pub use local::JsonFileStore;
pub use repositories::{PgCheckinLedger, PgInviteRepository};
