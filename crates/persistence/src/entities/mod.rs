//! Database entity definitions (row mappings).

pub mod checkin_event;
pub mod invite;

pub use checkin_event::{CheckinEventEntity, CheckinOutcomeDb, LedgerStatsEntity, ScanSourceDb};
pub use invite::InviteEntity;
