//! Check-in ledger models and validation results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Outcome recorded for a validation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckinOutcome {
    Granted,
    DeniedUnknownCode,
    DeniedAlreadyUsed,
}

impl CheckinOutcome {
    pub fn is_granted(&self) -> bool {
        matches!(self, CheckinOutcome::Granted)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CheckinOutcome::Granted => "granted",
            CheckinOutcome::DeniedUnknownCode => "denied_unknown_code",
            CheckinOutcome::DeniedAlreadyUsed => "denied_already_used",
        }
    }
}

impl std::fmt::Display for CheckinOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Acquisition path that produced the presented code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanSource {
    Camera,
    #[default]
    Upload,
    Manual,
}

impl ScanSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanSource::Camera => "camera",
            ScanSource::Upload => "upload",
            ScanSource::Manual => "manual",
        }
    }
}

impl std::fmt::Display for ScanSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a valid code may be granted more than once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryPolicy {
    /// The first grant consumes the code; later scans are denied as already used.
    #[default]
    SingleEntry,
    /// Every scan of a known code is granted.
    Unlimited,
}

/// An immutable ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CheckinEvent {
    /// Arrival order within the ledger.
    pub id: i64,
    pub code: String,
    pub observed_at: DateTime<Utc>,
    pub outcome: CheckinOutcome,
    pub source: ScanSource,
}

/// Ledger entry before the ledger assigns its position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCheckinEvent {
    pub code: String,
    pub observed_at: DateTime<Utc>,
    pub outcome: CheckinOutcome,
    pub source: ScanSource,
}

impl NewCheckinEvent {
    /// Event for a known code: GRANTED when `granted`, else DENIED_ALREADY_USED.
    pub fn grant_attempt(
        code: &str,
        observed_at: DateTime<Utc>,
        source: ScanSource,
        granted: bool,
    ) -> Self {
        Self {
            code: code.to_string(),
            observed_at,
            outcome: if granted {
                CheckinOutcome::Granted
            } else {
                CheckinOutcome::DeniedAlreadyUsed
            },
            source,
        }
    }
}

/// User-visible status of a scan or manual entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    Granted,
    Used,
    Invalid,
    NoCodeFound,
}

/// Terminal result of one validation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationOutcome {
    pub status: ValidationStatus,
    pub code: Option<String>,
    pub invitee_name: Option<String>,
    pub observed_at: Option<DateTime<Utc>>,
}

impl ValidationOutcome {
    pub fn granted(code: String, invitee_name: String, observed_at: DateTime<Utc>) -> Self {
        Self {
            status: ValidationStatus::Granted,
            code: Some(code),
            invitee_name: Some(invitee_name),
            observed_at: Some(observed_at),
        }
    }

    pub fn already_used(code: String, invitee_name: String, observed_at: DateTime<Utc>) -> Self {
        Self {
            status: ValidationStatus::Used,
            code: Some(code),
            invitee_name: Some(invitee_name),
            observed_at: Some(observed_at),
        }
    }

    pub fn unknown_code(code: String, observed_at: DateTime<Utc>) -> Self {
        Self {
            status: ValidationStatus::Invalid,
            code: Some(code),
            invitee_name: None,
            observed_at: Some(observed_at),
        }
    }

    pub fn no_code_found() -> Self {
        Self {
            status: ValidationStatus::NoCodeFound,
            code: None,
            invitee_name: None,
            observed_at: None,
        }
    }

    pub fn is_granted(&self) -> bool {
        self.status == ValidationStatus::Granted
    }

    /// Operator-facing message for the outcome.
    pub fn message(&self) -> String {
        let name = self.invitee_name.as_deref().unwrap_or("unknown invitee");
        match self.status {
            ValidationStatus::Granted => format!("Welcome {}!", name),
            ValidationStatus::Used => format!("Already used for {}", name),
            ValidationStatus::Invalid => "Invalid code".to_string(),
            ValidationStatus::NoCodeFound => "No barcode found".to_string(),
        }
    }
}

/// Request to validate a barcode image.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct ScanRequest {
    /// Base64 image or `data:` URL.
    #[validate(custom(function = "shared::validation::validate_not_blank"))]
    pub image_data: String,

    /// Acquisition path (default: upload).
    #[serde(default)]
    pub source: ScanSource,
}

/// Response for scan and manual validation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ScanResponse {
    pub granted: bool,
    pub status: ValidationStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invitee_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_at: Option<DateTime<Utc>>,
}

impl From<ValidationOutcome> for ScanResponse {
    fn from(outcome: ValidationOutcome) -> Self {
        Self {
            granted: outcome.is_granted(),
            status: outcome.status,
            message: outcome.message(),
            code: outcome.code,
            invitee_name: outcome.invitee_name,
            observed_at: outcome.observed_at,
        }
    }
}

/// Query parameters for listing ledger entries.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ListCheckinsQuery {
    /// Maximum entries to return (1-500, default: 50)
    #[validate(range(min = 1, max = 500, message = "limit must be between 1 and 500"))]
    pub limit: Option<i64>,
}

/// Response for listing ledger entries, newest first.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ListCheckinsResponse {
    pub data: Vec<CheckinEvent>,
}
