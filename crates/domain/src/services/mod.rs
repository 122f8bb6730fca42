//! Domain services for issuance and check-in.
//!
//! Services contain the business logic that operates on domain models.
//! Storage and camera access sit behind traits so the same services run
//! against PostgreSQL, a local file, or in-memory state.

pub mod acquisition;
pub mod barcode;
pub mod code_generator;
pub mod decode;
pub mod registry;
pub mod store;
pub mod validation;

pub use acquisition::{Camera, CameraStream, ScanStation, StationMode};
pub use barcode::{BarcodeDecoder, BarcodeEncoder, QrDecoder, QrEncoder};
pub use code_generator::CodeGenerator;
pub use decode::{DecodeOutcome, DecodePipeline};
pub use registry::InviteRegistry;
pub use store::{CheckinLedger, GrantDecision, InMemoryStore, InviteStore, MemoryState};
pub use validation::ValidationEngine;
