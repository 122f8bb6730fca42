//! Invite entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::Invite;
use sqlx::FromRow;

/// Database row mapping for the invites table.
#[derive(Debug, Clone, FromRow)]
pub struct InviteEntity {
    pub code: String,
    pub invitee_name: String,
    pub issued_at: DateTime<Utc>,
}

impl From<InviteEntity> for Invite {
    fn from(entity: InviteEntity) -> Self {
        Invite {
            code: entity.code,
            invitee_name: entity.invitee_name,
            issued_at: entity.issued_at,
        }
    }
}
