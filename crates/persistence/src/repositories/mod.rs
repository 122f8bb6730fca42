//! Repository implementations for database operations.

pub mod checkin;
pub mod invite;

pub use checkin::PgCheckinLedger;
pub use invite::PgInviteRepository;

use domain::StoreError;

const UNIQUE_VIOLATION: &str = "23505";

/// Maps a sqlx error onto the storage error the domain understands.
pub(crate) fn store_error(err: sqlx::Error, code: &str) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => {
            StoreError::DuplicateCode(code.to_string())
        }
        _ => StoreError::Database(err.to_string()),
    }
}
