//! Domain error types.

use thiserror::Error;

/// Errors raised by the issuance and check-in services.
///
/// Lookup misses during validation and "no barcode in this image" are not
/// errors; they are reported through `ValidationOutcome` and `DecodeOutcome`.
#[derive(Debug, Error)]
pub enum CheckinError {
    #[error("Invitee name is required")]
    EmptyName,

    #[error("Invitee name must be at most {max} characters")]
    NameTooLong { max: usize },

    #[error("Code is required")]
    EmptyCode,

    #[error("Code must be at most {max} characters")]
    CodeTooLong { max: usize },

    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("Invite not found: {0}")]
    NotFound(String),

    #[error("Camera unavailable: {0}")]
    CameraUnavailable(String),

    #[error("Barcode generation failed: {0}")]
    GenerationFailure(String),

    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl CheckinError {
    /// Returns true for input problems the caller can fix and resubmit.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            CheckinError::EmptyName
                | CheckinError::NameTooLong { .. }
                | CheckinError::EmptyCode
                | CheckinError::CodeTooLong { .. }
                | CheckinError::InvalidImage(_)
        )
    }
}

/// Errors raised by invite store and check-in ledger backends.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Code already issued: {0}")]
    DuplicateCode(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt store: {0}")]
    Corrupt(String),
}
