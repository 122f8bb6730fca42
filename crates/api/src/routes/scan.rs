//! Check-in handlers: barcode image scans and manual code entry.

use axum::{
    extract::{Path, State},
    Json,
};
use domain::models::checkin::{ScanRequest, ScanResponse};
use domain::models::{ScanSource, ValidationOutcome};
use domain::services::DecodeOutcome;
use domain::CheckinError;
use shared::encoding::decode_image_payload;
use tracing::debug;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::metrics::{record_barcode_decode, record_checkin};

/// Decode a barcode image and validate the code it carries.
///
/// POST /api/v1/scan (also POST /scan)
///
/// An image without a readable barcode is not an error: the response has
/// status `no_code_found` and nothing is written to the ledger.
pub async fn scan_image(
    State(state): State<AppState>,
    Json(request): Json<ScanRequest>,
) -> Result<Json<ScanResponse>, ApiError> {
    request.validate()?;

    let bytes = decode_image_payload(&request.image_data)?;
    let decoded = match state.pipeline.decode_bytes(bytes).await {
        Ok(decoded) => decoded,
        Err(e @ CheckinError::InvalidImage(_)) => {
            record_barcode_decode("invalid_image");
            return Err(e.into());
        }
        Err(e) => return Err(e.into()),
    };

    let outcome = match decoded {
        DecodeOutcome::Code(code) => {
            record_barcode_decode("code");
            let outcome = state.engine.validate(&code, request.source).await?;
            record_checkin(outcome.status);
            outcome
        }
        DecodeOutcome::NoCodeFound => {
            record_barcode_decode("no_code");
            debug!(source = %request.source, "No barcode in submitted image");
            ValidationOutcome::no_code_found()
        }
    };

    Ok(Json(outcome.into()))
}

/// Validate a code typed in by the operator.
///
/// GET /api/v1/validate/:code (also GET /validate/:code)
pub async fn validate_code(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<ScanResponse>, ApiError> {
    let outcome = state.engine.validate(&code, ScanSource::Manual).await?;
    record_checkin(outcome.status);
    Ok(Json(outcome.into()))
}
