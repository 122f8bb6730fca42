//! Barcode rendering and recognition.
//!
//! The symbology itself is delegated to library crates: `qrcode` builds the
//! module matrix and `rqrr` locates and decodes QR grids in a raster.

use qrcode::{Color, EcLevel, QrCode};

use crate::error::CheckinError;
use crate::models::RasterImage;

const DARK: u8 = 0;
const LIGHT: u8 = 255;

/// Renders a payload as a scannable raster.
pub trait BarcodeEncoder: Send + Sync {
    fn encode(&self, payload: &str) -> Result<RasterImage, CheckinError>;
}

/// Extracts barcode payloads from a raster.
///
/// Returns every payload found, in detection order. An empty vector means
/// the image contains no decodable barcode.
pub trait BarcodeDecoder: Send + Sync {
    fn decode(&self, image: &RasterImage) -> Vec<String>;
}

/// QR encoder with a configurable module size and quiet zone.
#[derive(Debug, Clone)]
pub struct QrEncoder {
    /// Pixels per QR module.
    pub module_px: u32,
    /// Quiet zone width in modules.
    pub quiet_zone: u32,
    pub ec_level: EcLevel,
}

impl Default for QrEncoder {
    fn default() -> Self {
        Self {
            module_px: 10,
            quiet_zone: 4,
            ec_level: EcLevel::L,
        }
    }
}

impl BarcodeEncoder for QrEncoder {
    fn encode(&self, payload: &str) -> Result<RasterImage, CheckinError> {
        let code = QrCode::with_error_correction_level(payload.as_bytes(), self.ec_level)
            .map_err(|e| CheckinError::GenerationFailure(e.to_string()))?;

        let modules = code.width() as u32;
        let colors = code.to_colors();
        let module_px = self.module_px.max(1);
        let span = modules + 2 * self.quiet_zone;
        let size = span * module_px;

        let mut pixels = Vec::with_capacity(size as usize * size as usize);
        for y in 0..size {
            let my = y / module_px;
            for x in 0..size {
                let mx = x / module_px;
                let inside = (self.quiet_zone..self.quiet_zone + modules).contains(&mx)
                    && (self.quiet_zone..self.quiet_zone + modules).contains(&my);
                let level = if inside {
                    let idx = ((my - self.quiet_zone) * modules + (mx - self.quiet_zone)) as usize;
                    match colors[idx] {
                        Color::Dark => DARK,
                        Color::Light => LIGHT,
                    }
                } else {
                    LIGHT
                };
                pixels.push(level);
            }
        }

        RasterImage::new(size, size, pixels)
    }
}

/// QR decoder backed by `rqrr`.
#[derive(Debug, Clone, Copy, Default)]
pub struct QrDecoder;

impl BarcodeDecoder for QrDecoder {
    fn decode(&self, image: &RasterImage) -> Vec<String> {
        let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(
            image.width() as usize,
            image.height() as usize,
            |x, y| image.luma(x, y),
        );

        prepared
            .detect_grids()
            .into_iter()
            .filter_map(|grid| match grid.decode() {
                Ok((_, content)) => Some(content),
                Err(e) => {
                    tracing::debug!(error = ?e, "Detected QR grid could not be decoded");
                    None
                }
            })
            .collect()
    }
}
