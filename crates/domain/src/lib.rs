//! Domain layer for the check-in backend.
//!
//! This crate contains:
//! - Domain models (Invite, CheckinEvent, stats and request/response DTOs)
//! - The issuance and check-in services (code generator, registry,
//!   decode pipeline, validation engine, scan station)
//! - Domain error types

pub mod error;
pub mod models;
pub mod services;

pub use error::{CheckinError, StoreError};
