//! Local store endpoints: import, publish and the two clears.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::db::ClearedCounts;
use crate::fhir::PublishSummary;
use crate::import::{CleanedRow, ImportSummary};

/// `POST /api/import`: body is a JSON array of cleaned rows.
pub async fn import(
    State(ctx): State<ApiContext>,
    body: Result<Json<Vec<CleanedRow>>, JsonRejection>,
) -> Result<Json<ImportSummary>, ApiError> {
    let Json(rows) = body?;
    let summary = ctx.blocking(move |core| Ok(core.import(&rows)?)).await?;
    Ok(Json(summary))
}

/// `POST /api/publish`: upload source rows and replace the roster.
pub async fn publish(State(ctx): State<ApiContext>) -> Result<Json<PublishSummary>, ApiError> {
    let summary = ctx.blocking(|core| Ok(core.publish()?)).await?;
    Ok(Json(summary))
}

/// `DELETE /api/store`
pub async fn clear(State(ctx): State<ApiContext>) -> Result<Json<ClearedCounts>, ApiError> {
    let counts = ctx.blocking(|core| Ok(core.clear_store()?)).await?;
    Ok(Json(counts))
}

/// `DELETE /api/cache`: drop synced records only.
pub async fn clear_cache(State(ctx): State<ApiContext>) -> Result<Json<ClearedCounts>, ApiError> {
    let counts = ctx.blocking(|core| Ok(core.clear_cache()?)).await?;
    Ok(Json(counts))
}
