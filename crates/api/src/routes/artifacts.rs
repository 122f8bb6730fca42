//! Barcode artifact download.

use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
};
use domain::models::invite::artifact_id_for;
use domain::CheckinError;
use shared::validation::is_valid_artifact_id;
use tracing::{info, warn};

use crate::app::AppState;
use crate::error::ApiError;

/// Serve the PNG rendered for an issued code.
///
/// GET /api/v1/download/:artifact_id (also GET /download/:artifact_id)
///
/// If the file is gone but the code is still in the registry, the barcode
/// is rendered again and written back.
pub async fn download(
    State(state): State<AppState>,
    Path(artifact_id): Path<String>,
) -> Result<Response, ApiError> {
    if !is_valid_artifact_id(&artifact_id) {
        return Err(ApiError::NotFound(format!(
            "Artifact not found: {}",
            artifact_id
        )));
    }

    let png = match state.artifacts.load(&artifact_id).await? {
        Some(png) => png,
        None => regenerate(&state, &artifact_id).await?,
    };

    let disposition = format!("attachment; filename=\"{}\"", artifact_id);
    Ok((
        [
            (header::CONTENT_TYPE, "image/png".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        png,
    )
        .into_response())
}

async fn regenerate(state: &AppState, artifact_id: &str) -> Result<Vec<u8>, ApiError> {
    let not_found = || ApiError::NotFound(format!("Artifact not found: {}", artifact_id));

    let code = artifact_id.strip_suffix(".png").ok_or_else(not_found)?;
    if artifact_id_for(code) != artifact_id {
        return Err(not_found());
    }

    let invite = match state.registry.lookup(code).await {
        Ok(invite) => invite,
        Err(CheckinError::NotFound(_)) => return Err(not_found()),
        Err(e) => return Err(e.into()),
    };
    let png = state.registry.render(&invite.code)?;

    if let Err(e) = state.artifacts.save(artifact_id, &png).await {
        warn!(artifact_id = %artifact_id, error = %e, "Failed to rewrite barcode artifact");
    }
    info!(artifact_id = %artifact_id, "Barcode artifact regenerated");
    Ok(png)
}
