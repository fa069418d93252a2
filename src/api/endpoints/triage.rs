//! Triage endpoints.
//!
//! `POST /api/triage` syncs the roster, ranks it and publishes a new
//! snapshot. `GET /api/triage` returns the live snapshot untouched.

use axum::extract::State;
use axum::Json;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::triage::RankingSnapshot;

/// `POST /api/triage`
pub async fn run(State(ctx): State<ApiContext>) -> Result<Json<RankingSnapshot>, ApiError> {
    let snapshot = ctx.blocking(|core| Ok(core.triage()?)).await?;
    Ok(Json(RankingSnapshot::clone(&snapshot)))
}

/// `GET /api/triage`
pub async fn current(State(ctx): State<ApiContext>) -> Result<Json<RankingSnapshot>, ApiError> {
    let snapshot = ctx.core.board().current().ok_or(ApiError::NoRanking)?;
    Ok(Json(RankingSnapshot::clone(&snapshot)))
}
