//! Decode pipeline: raster image in, candidate code out.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::CheckinError;
use crate::models::{RasterImage, DEFAULT_MAX_IMAGE_DIMENSION};
use crate::services::barcode::BarcodeDecoder;

/// Result of a decode attempt. Finding nothing is a normal outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeOutcome {
    Code(String),
    NoCodeFound,
}

/// Runs a [`BarcodeDecoder`] off the async executor.
#[derive(Clone)]
pub struct DecodePipeline {
    decoder: Arc<dyn BarcodeDecoder>,
    max_image_dimension: u32,
}

impl DecodePipeline {
    pub fn new(decoder: Arc<dyn BarcodeDecoder>) -> Self {
        Self {
            decoder,
            max_image_dimension: DEFAULT_MAX_IMAGE_DIMENSION,
        }
    }

    pub fn with_max_image_dimension(mut self, max_image_dimension: u32) -> Self {
        self.max_image_dimension = max_image_dimension;
        self
    }

    /// Decodes a raster (camera frame snapshot).
    pub async fn decode(&self, image: RasterImage) -> Result<DecodeOutcome, CheckinError> {
        let decoder = self.decoder.clone();
        self.run(move || Ok(decoder.decode(&image))).await
    }

    /// Decodes an encoded image file (PNG or JPEG upload).
    ///
    /// Bytes that are not an image at all, and images wider or taller than
    /// the configured maximum, fail with `InvalidImage`.
    pub async fn decode_bytes(&self, bytes: Vec<u8>) -> Result<DecodeOutcome, CheckinError> {
        let decoder = self.decoder.clone();
        let max_dimension = self.max_image_dimension;
        self.run(move || {
            let image = RasterImage::from_encoded(&bytes, max_dimension)?;
            Ok(decoder.decode(&image))
        })
        .await
    }

    async fn run<F>(&self, job: F) -> Result<DecodeOutcome, CheckinError>
    where
        F: FnOnce() -> Result<Vec<String>, CheckinError> + Send + 'static,
    {
        let payloads = match tokio::task::spawn_blocking(job).await {
            Ok(result) => result?,
            Err(e) => {
                // Decoder panics surface as an unreadable frame.
                warn!(error = %e, "Barcode decoder aborted, treating frame as unreadable");
                return Ok(DecodeOutcome::NoCodeFound);
            }
        };

        let found = payloads.len();
        match payloads.into_iter().find(|p| !p.trim().is_empty()) {
            Some(code) => {
                debug!(found, "Barcode decoded");
                Ok(DecodeOutcome::Code(code))
            }
            None => Ok(DecodeOutcome::NoCodeFound),
        }
    }
}
