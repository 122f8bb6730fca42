//! Validation engine.
//!
//! Each attempt moves through `RECEIVED -> LOOKED_UP -> GRANTED | DENIED`:
//!
//! 1. RECEIVED: the candidate is trimmed. Empty or over-long input is
//!    rejected with an error and never reaches the ledger.
//! 2. LOOKED_UP: the registry is queried by exact, case-sensitive code.
//! 3. GRANTED: the invite exists and the entry policy allows it.
//! 4. DENIED: the invite is unknown, or it was already granted under the
//!    single-entry policy.
//!
//! Every attempt that reaches LOOKED_UP appends exactly one ledger event.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use crate::error::CheckinError;
use crate::models::{CheckinOutcome, EntryPolicy, NewCheckinEvent, ScanSource, ValidationOutcome};
use crate::services::store::{CheckinLedger, GrantDecision, InviteStore};

pub const DEFAULT_MAX_CODE_LENGTH: usize = 256;

/// Decides grant or deny for presented codes and records the result.
#[derive(Clone)]
pub struct ValidationEngine {
    invites: Arc<dyn InviteStore>,
    ledger: Arc<dyn CheckinLedger>,
    policy: EntryPolicy,
    max_code_length: usize,
}

impl ValidationEngine {
    pub fn new(
        invites: Arc<dyn InviteStore>,
        ledger: Arc<dyn CheckinLedger>,
        policy: EntryPolicy,
    ) -> Self {
        Self {
            invites,
            ledger,
            policy,
            max_code_length: DEFAULT_MAX_CODE_LENGTH,
        }
    }

    pub fn with_max_code_length(mut self, max_code_length: usize) -> Self {
        self.max_code_length = max_code_length;
        self
    }

    pub fn policy(&self) -> EntryPolicy {
        self.policy
    }

    /// Validates a candidate code from any acquisition path.
    pub async fn validate(
        &self,
        candidate: &str,
        source: ScanSource,
    ) -> Result<ValidationOutcome, CheckinError> {
        // RECEIVED
        let code = candidate.trim();
        if code.is_empty() {
            return Err(CheckinError::EmptyCode);
        }
        if code.chars().count() > self.max_code_length {
            return Err(CheckinError::CodeTooLong {
                max: self.max_code_length,
            });
        }

        // LOOKED_UP
        let invite = self.invites.find_by_code(code).await?;
        debug!(code = %code, source = %source, found = invite.is_some(), "Code looked up");
        let observed_at = Utc::now();

        let Some(invite) = invite else {
            let event = self
                .ledger
                .append(NewCheckinEvent {
                    code: code.to_string(),
                    observed_at,
                    outcome: CheckinOutcome::DeniedUnknownCode,
                    source,
                })
                .await?;
            info!(
                code = %code,
                source = %source,
                event_id = event.id,
                outcome = %event.outcome,
                "Check-in denied"
            );
            return Ok(ValidationOutcome::unknown_code(event.code, event.observed_at));
        };

        match self
            .ledger
            .record_grant(&invite.code, observed_at, source, self.policy)
            .await?
        {
            GrantDecision::Granted(event) => {
                info!(
                    code = %event.code,
                    source = %source,
                    event_id = event.id,
                    outcome = %event.outcome,
                    "Check-in granted"
                );
                Ok(ValidationOutcome::granted(
                    event.code,
                    invite.invitee_name,
                    event.observed_at,
                ))
            }
            GrantDecision::AlreadyUsed {
                event,
                first_granted_at,
            } => {
                info!(
                    code = %event.code,
                    source = %source,
                    event_id = event.id,
                    outcome = %event.outcome,
                    first_granted_at = %first_granted_at,
                    "Check-in denied"
                );
                Ok(ValidationOutcome::already_used(
                    event.code,
                    invite.invitee_name,
                    event.observed_at,
                ))
            }
        }
    }
}
