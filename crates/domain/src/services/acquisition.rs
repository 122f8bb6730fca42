//! Acquisition front-end: camera lifecycle and manual-entry fallback.
//!
//! A [`ScanStation`] owns at most one open camera stream and runs one
//! decode-then-validate attempt at a time. Suspension points are the device
//! open, the frame capture and the decode; none of them time out.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::error::CheckinError;
use crate::models::{RasterImage, ScanSource, ValidationOutcome};
use crate::services::decode::{DecodeOutcome, DecodePipeline};
use crate::services::validation::ValidationEngine;

/// A camera device that can be opened for capture.
#[async_trait]
pub trait Camera: Send + Sync {
    /// Waits for device access. Permission or device failures are reported as
    /// [`CheckinError::CameraUnavailable`].
    async fn open(&self) -> Result<Box<dyn CameraStream>, CheckinError>;
}

/// An open camera stream holding the device.
#[async_trait]
pub trait CameraStream: Send {
    /// Snapshots the current frame.
    async fn capture_frame(&mut self) -> Result<RasterImage, CheckinError>;

    /// Releases the device. Called exactly once per stream by the station.
    fn stop(&mut self);
}

/// What the operator can currently do at the station.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StationMode {
    /// No camera held; camera can be started.
    Idle,
    /// A camera stream is open.
    Camera,
    /// The camera failed; codes must be typed in.
    ManualEntry,
}

/// One operator's scanning station.
pub struct ScanStation {
    camera: Arc<dyn Camera>,
    stream: Option<Box<dyn CameraStream>>,
    pipeline: DecodePipeline,
    engine: ValidationEngine,
    mode: StationMode,
}

impl ScanStation {
    pub fn new(camera: Arc<dyn Camera>, pipeline: DecodePipeline, engine: ValidationEngine) -> Self {
        Self {
            camera,
            stream: None,
            pipeline,
            engine,
            mode: StationMode::Idle,
        }
    }

    pub fn mode(&self) -> StationMode {
        self.mode
    }

    pub fn is_camera_active(&self) -> bool {
        self.stream.is_some()
    }

    /// Opens the camera, releasing any stream already held.
    ///
    /// On failure the station switches to manual entry and holds no device.
    pub async fn start_camera(&mut self) -> Result<(), CheckinError> {
        self.release_stream();

        match self.camera.open().await {
            Ok(stream) => {
                self.stream = Some(stream);
                self.mode = StationMode::Camera;
                info!("Camera started");
                Ok(())
            }
            Err(e) => {
                self.mode = StationMode::ManualEntry;
                warn!(error = %e, "Camera unavailable, manual entry enabled");
                Err(into_camera_unavailable(e))
            }
        }
    }

    /// Releases the camera. Safe to call when no camera is held.
    pub fn stop_camera(&mut self) {
        if self.release_stream() {
            info!("Camera stopped");
        }
        if self.mode == StationMode::Camera {
            self.mode = StationMode::Idle;
        }
    }

    /// Captures one frame, decodes it and validates the payload.
    pub async fn scan_camera(&mut self) -> Result<ValidationOutcome, CheckinError> {
        let Some(stream) = self.stream.as_mut() else {
            return Err(CheckinError::CameraUnavailable("camera not started".into()));
        };

        let frame = match stream.capture_frame().await {
            Ok(frame) => frame,
            Err(e) => {
                self.release_stream();
                self.mode = StationMode::ManualEntry;
                warn!(error = %e, "Frame capture failed, camera released");
                return Err(into_camera_unavailable(e));
            }
        };

        let outcome = self.pipeline.decode(frame).await?;
        self.validate_decoded(outcome, ScanSource::Camera).await
    }

    /// Decodes an uploaded image file and validates the payload.
    pub async fn scan_upload(&self, bytes: Vec<u8>) -> Result<ValidationOutcome, CheckinError> {
        let outcome = self.pipeline.decode_bytes(bytes).await?;
        self.validate_decoded(outcome, ScanSource::Upload).await
    }

    /// Validates a typed code, bypassing the decode pipeline.
    pub async fn enter_code(&self, code: &str) -> Result<ValidationOutcome, CheckinError> {
        self.engine.validate(code, ScanSource::Manual).await
    }

    async fn validate_decoded(
        &self,
        outcome: DecodeOutcome,
        source: ScanSource,
    ) -> Result<ValidationOutcome, CheckinError> {
        match outcome {
            DecodeOutcome::Code(code) => self.engine.validate(&code, source).await,
            DecodeOutcome::NoCodeFound => Ok(ValidationOutcome::no_code_found()),
        }
    }

    fn release_stream(&mut self) -> bool {
        match self.stream.take() {
            Some(mut stream) => {
                stream.stop();
                true
            }
            None => false,
        }
    }
}

impl Drop for ScanStation {
    fn drop(&mut self) {
        self.release_stream();
    }
}

fn into_camera_unavailable(err: CheckinError) -> CheckinError {
    match err {
        CheckinError::CameraUnavailable(_) => err,
        other => CheckinError::CameraUnavailable(other.to_string()),
    }
}
