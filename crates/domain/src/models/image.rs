//! Raster images flowing from acquisition into the decode pipeline.

use std::io::Cursor;

use image::io::{Limits, Reader};
use image::{codecs::png::PngEncoder, ColorType, ImageEncoder, ImageError};

use crate::error::CheckinError;

/// Largest accepted width or height for uploaded images. Fits a 12 MP
/// phone photo.
pub const DEFAULT_MAX_IMAGE_DIMENSION: u32 = 4096;

/// An 8-bit greyscale raster, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterImage {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl RasterImage {
    /// Wraps raw luma samples; `pixels.len()` must equal `width * height`.
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, CheckinError> {
        if width == 0 || height == 0 {
            return Err(CheckinError::InvalidImage("image has no pixels".into()));
        }
        let expected = width as usize * height as usize;
        if pixels.len() != expected {
            return Err(CheckinError::InvalidImage(format!(
                "expected {} samples for {}x{}, got {}",
                expected,
                width,
                height,
                pixels.len()
            )));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Uniform image of a single grey level.
    pub fn filled(width: u32, height: u32, level: u8) -> Self {
        Self {
            width,
            height,
            pixels: vec![level; width as usize * height as usize],
        }
    }

    /// Decodes an encoded image file (PNG or JPEG) and converts it to greyscale.
    ///
    /// The declared dimensions are checked against `max_dimension` from the
    /// header, before any pixel data is decoded.
    pub fn from_encoded(bytes: &[u8], max_dimension: u32) -> Result<Self, CheckinError> {
        let mut reader = Reader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| CheckinError::InvalidImage(e.to_string()))?;

        let mut limits = Limits::default();
        limits.max_image_width = Some(max_dimension);
        limits.max_image_height = Some(max_dimension);
        reader.limits(limits);

        let decoded = reader.decode().map_err(|e| match e {
            ImageError::Limits(_) => CheckinError::InvalidImage(format!(
                "image exceeds {}x{} pixels",
                max_dimension, max_dimension
            )),
            other => CheckinError::InvalidImage(other.to_string()),
        })?;
        let luma = decoded.to_luma8();
        let (width, height) = luma.dimensions();
        Self::new(width, height, luma.into_raw())
    }

    /// Encodes the image as PNG.
    pub fn to_png(&self) -> Result<Vec<u8>, CheckinError> {
        let mut buf = Cursor::new(Vec::new());
        PngEncoder::new(&mut buf)
            .write_image(&self.pixels, self.width, self.height, ColorType::L8)
            .map_err(|e| CheckinError::GenerationFailure(e.to_string()))?;
        Ok(buf.into_inner())
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Luma sample at (x, y).
    pub fn luma(&self, x: usize, y: usize) -> u8 {
        self.pixels[y * self.width as usize + x]
    }
}
