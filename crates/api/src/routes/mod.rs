//! HTTP route handlers.

pub mod artifacts;
pub mod health;
pub mod invites;
pub mod scan;
pub mod stats;
