//! Domain models for the check-in backend.

pub mod checkin;
pub mod image;
pub mod invite;
pub mod stats;

pub use checkin::{
    CheckinEvent, CheckinOutcome, EntryPolicy, NewCheckinEvent, ScanSource, ValidationOutcome,
    ValidationStatus,
};
pub use image::{RasterImage, DEFAULT_MAX_IMAGE_DIMENSION};
pub use invite::{Invite, IssuedInvite};
pub use stats::{LedgerStats, StatsResponse};
