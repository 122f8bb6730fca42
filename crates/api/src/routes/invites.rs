//! Invite issuance and lookup handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use domain::models::invite::{InviteResponse, IssueInviteRequest, IssueInviteResponse};
use shared::encoding::png_data_url;
use tracing::{info, warn};
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::metrics::record_invite_issued;

/// Issue a new invite.
///
/// POST /api/v1/invites (also POST /generate)
pub async fn issue_invite(
    State(state): State<AppState>,
    Json(request): Json<IssueInviteRequest>,
) -> Result<(StatusCode, Json<IssueInviteResponse>), ApiError> {
    request.validate()?;

    let issued = state.registry.issue(&request.invitee_name).await?;
    let invite = issued.invite;
    let artifact_id = invite.artifact_id();

    // Downloads re-render from the registry if the file is missing
    if let Err(e) = state.artifacts.save(&artifact_id, &issued.png).await {
        warn!(artifact_id = %artifact_id, error = %e, "Failed to write barcode artifact");
    }

    record_invite_issued();
    info!(code = %invite.code, artifact_id = %artifact_id, "Invite created");

    Ok((
        StatusCode::CREATED,
        Json(IssueInviteResponse {
            image_data: png_data_url(&issued.png),
            download_url: format!("/api/v1/download/{}", artifact_id),
            artifact_id,
            code: invite.code,
            invitee_name: invite.invitee_name,
            issued_at: invite.issued_at,
        }),
    ))
}

/// Look up an invite by code.
///
/// GET /api/v1/invites/:code
pub async fn get_invite(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<InviteResponse>, ApiError> {
    let invite = state.registry.lookup(&code).await?;
    Ok(Json(invite.into()))
}
