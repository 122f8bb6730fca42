//! Image payload encoding helpers.
//!
//! Browsers send camera snapshots and uploaded files as `data:` URLs; other
//! clients send bare base64. Both forms are accepted.

use base64::{engine::general_purpose::STANDARD, Engine};
use thiserror::Error;

/// Errors produced while decoding an image payload.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EncodingError {
    #[error("No image data")]
    Empty,

    #[error("Invalid base64 image data: {0}")]
    InvalidBase64(String),
}

/// Decodes an image payload into raw bytes.
///
/// Anything up to and including the first comma is treated as a data URL
/// header (`data:image/png;base64,`) and discarded.
pub fn decode_image_payload(payload: &str) -> Result<Vec<u8>, EncodingError> {
    let payload = payload.trim();
    let body = match payload.split_once(',') {
        Some((_, body)) => body,
        None => payload,
    };

    // Some clients wrap long base64 lines.
    let body: String = body.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    if body.is_empty() {
        return Err(EncodingError::Empty);
    }

    STANDARD
        .decode(body.as_bytes())
        .map_err(|e| EncodingError::InvalidBase64(e.to_string()))
}

/// Encodes PNG bytes as a `data:image/png;base64,` URL for inline display.
pub fn png_data_url(png: &[u8]) -> String {
    format!("data:image/png;base64,{}", STANDARD.encode(png))
}
