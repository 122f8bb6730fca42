//! Shared utilities and common types for the check-in backend.
//!
//! This crate provides common functionality used across all other crates:
//! - Image payload encoding (base64 and data URLs)
//! - Common validation logic

pub mod encoding;
pub mod validation;
