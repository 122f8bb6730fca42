//! Check-in event entity (database row mapping).
//!
//! Maps to the append-only `checkin_events` table.

use chrono::{DateTime, Utc};
use domain::models::{CheckinEvent, CheckinOutcome, LedgerStats, ScanSource};
use sqlx::FromRow;

/// Database enum for checkin_outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "checkin_outcome", rename_all = "snake_case")]
pub enum CheckinOutcomeDb {
    Granted,
    DeniedUnknownCode,
    DeniedAlreadyUsed,
}

impl From<CheckinOutcomeDb> for CheckinOutcome {
    fn from(db: CheckinOutcomeDb) -> Self {
        match db {
            CheckinOutcomeDb::Granted => CheckinOutcome::Granted,
            CheckinOutcomeDb::DeniedUnknownCode => CheckinOutcome::DeniedUnknownCode,
            CheckinOutcomeDb::DeniedAlreadyUsed => CheckinOutcome::DeniedAlreadyUsed,
        }
    }
}

impl From<CheckinOutcome> for CheckinOutcomeDb {
    fn from(outcome: CheckinOutcome) -> Self {
        match outcome {
            CheckinOutcome::Granted => CheckinOutcomeDb::Granted,
            CheckinOutcome::DeniedUnknownCode => CheckinOutcomeDb::DeniedUnknownCode,
            CheckinOutcome::DeniedAlreadyUsed => CheckinOutcomeDb::DeniedAlreadyUsed,
        }
    }
}

/// Database enum for scan_source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "scan_source", rename_all = "lowercase")]
pub enum ScanSourceDb {
    Camera,
    Upload,
    Manual,
}

impl From<ScanSourceDb> for ScanSource {
    fn from(db: ScanSourceDb) -> Self {
        match db {
            ScanSourceDb::Camera => ScanSource::Camera,
            ScanSourceDb::Upload => ScanSource::Upload,
            ScanSourceDb::Manual => ScanSource::Manual,
        }
    }
}

impl From<ScanSource> for ScanSourceDb {
    fn from(source: ScanSource) -> Self {
        match source {
            ScanSource::Camera => ScanSourceDb::Camera,
            ScanSource::Upload => ScanSourceDb::Upload,
            ScanSource::Manual => ScanSourceDb::Manual,
        }
    }
}

/// Database row mapping for the checkin_events table.
#[derive(Debug, Clone, FromRow)]
pub struct CheckinEventEntity {
    pub id: i64,
    pub code: String,
    pub observed_at: DateTime<Utc>,
    pub outcome: CheckinOutcomeDb,
    pub source: ScanSourceDb,
}

impl From<CheckinEventEntity> for CheckinEvent {
    fn from(entity: CheckinEventEntity) -> Self {
        CheckinEvent {
            id: entity.id,
            code: entity.code,
            observed_at: entity.observed_at,
            outcome: entity.outcome.into(),
            source: entity.source.into(),
        }
    }
}

/// Aggregate counts over the ledger.
#[derive(Debug, Clone, FromRow)]
pub struct LedgerStatsEntity {
    pub granted_codes: i64,
    pub granted_events: i64,
    pub denied_events: i64,
}

impl From<LedgerStatsEntity> for LedgerStats {
    fn from(entity: LedgerStatsEntity) -> Self {
        LedgerStats {
            granted_codes: entity.granted_codes,
            granted_events: entity.granted_events,
            denied_events: entity.denied_events,
        }
    }
}
