//! Services local to the HTTP server.

pub mod artifacts;

pub use artifacts::{ArtifactError, ArtifactStore};
