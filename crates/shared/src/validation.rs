//! Common validation utilities.

use validator::ValidationError;

lazy_static::lazy_static! {
    /// Rendered artifact file names: a single path component ending in `.png`.
    pub static ref ARTIFACT_ID_REGEX: regex::Regex =
        regex::Regex::new(r"^[A-Za-z0-9_-]{1,128}\.png$").unwrap();
}

/// Validates that a string contains something other than whitespace.
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("not_blank");
        err.message = Some("Value must not be empty or whitespace".into());
        Err(err)
    } else {
        Ok(())
    }
}

/// Returns true if the artifact id is safe to join onto the artifact directory.
pub fn is_valid_artifact_id(artifact_id: &str) -> bool {
    ARTIFACT_ID_REGEX.is_match(artifact_id)
}
