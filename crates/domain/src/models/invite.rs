//! Invite domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// A registry record binding an access code to an invitee.
///
/// Invites are created once at issuance and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Invite {
    pub code: String,
    pub invitee_name: String,
    pub issued_at: DateTime<Utc>,
}

impl Invite {
    /// File name under which the rendered barcode for this invite is stored.
    pub fn artifact_id(&self) -> String {
        artifact_id_for(&self.code)
    }
}

/// Artifact id for a code. Codes only contain `[A-Z0-9_]`.
pub fn artifact_id_for(code: &str) -> String {
    format!("{}.png", code)
}

/// A freshly issued invite together with its rendered barcode.
#[derive(Debug, Clone)]
pub struct IssuedInvite {
    pub invite: Invite,
    /// PNG-encoded barcode image.
    pub png: Vec<u8>,
}

/// Request to issue a new invite.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct IssueInviteRequest {
    /// Name of the invitee. Surrounding whitespace is ignored.
    #[validate(
        length(max = 255, message = "invitee_name must be at most 255 characters"),
        custom(function = "shared::validation::validate_not_blank")
    )]
    #[serde(alias = "staff_name")]
    pub invitee_name: String,
}

/// Response after issuing an invite.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct IssueInviteResponse {
    pub code: String,
    pub invitee_name: String,
    pub issued_at: DateTime<Utc>,
    /// Rendered barcode as a `data:image/png;base64,` URL.
    pub image_data: String,
    pub artifact_id: String,
    pub download_url: String,
}

/// Public view of a registry record.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct InviteResponse {
    pub code: String,
    pub invitee_name: String,
    pub issued_at: DateTime<Utc>,
    pub artifact_id: String,
}

impl From<Invite> for InviteResponse {
    fn from(invite: Invite) -> Self {
        Self {
            artifact_id: invite.artifact_id(),
            code: invite.code,
            invitee_name: invite.invitee_name,
            issued_at: invite.issued_at,
        }
    }
}
