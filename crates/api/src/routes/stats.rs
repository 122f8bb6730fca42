//! Reporting handlers.

use axum::{
    extract::{Query, State},
    Json,
};
use domain::models::checkin::{ListCheckinsQuery, ListCheckinsResponse};
use domain::models::StatsResponse;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;

/// Registry and ledger totals.
///
/// GET /api/v1/stats (also GET /stats)
pub async fn get_stats(State(state): State<AppState>) -> Result<Json<StatsResponse>, ApiError> {
    let generated = state.registry.count().await?;
    let ledger = state
        .stores
        .ledger
        .stats()
        .await
        .map_err(domain::CheckinError::from)?;

    Ok(Json(StatsResponse::new(generated, ledger)))
}

/// Most recent ledger entries, newest first.
///
/// GET /api/v1/checkins?limit=
pub async fn list_checkins(
    State(state): State<AppState>,
    Query(query): Query<ListCheckinsQuery>,
) -> Result<Json<ListCheckinsResponse>, ApiError> {
    query.validate()?;

    let limit = query
        .limit
        .unwrap_or(state.config.limits.checkins_page_size);
    let data = state
        .stores
        .ledger
        .recent(limit as usize)
        .await
        .map_err(domain::CheckinError::from)?;

    Ok(Json(ListCheckinsResponse { data }))
}
