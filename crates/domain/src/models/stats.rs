//! Reporting models.

use serde::Serialize;

/// Aggregate counts over the check-in ledger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedgerStats {
    /// Distinct codes with at least one granted event.
    pub granted_codes: i64,
    pub granted_events: i64,
    pub denied_events: i64,
}

/// Response for GET /stats.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct StatsResponse {
    pub generated_count: i64,
    pub checked_in_count: i64,
    /// Issued codes that have not been granted yet.
    pub remaining_count: i64,
    pub denied_count: i64,
    pub total_scans: i64,
}

impl StatsResponse {
    pub fn new(generated_count: i64, ledger: LedgerStats) -> Self {
        Self {
            generated_count,
            checked_in_count: ledger.granted_codes,
            remaining_count: (generated_count - ledger.granted_codes).max(0),
            denied_count: ledger.denied_events,
            total_scans: ledger.granted_events + ledger.denied_events,
        }
    }
}
