//! Per-patient endpoints.

use axum::extract::{Path, State};
use axum::Json;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::models::PatientRecord;
use crate::triage::RankedPatient;

/// `GET /api/patients/:id/status`: position, tier and suggested ward
/// from the live snapshot.
pub async fn status(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<RankedPatient>, ApiError> {
    ctx.core
        .patient_status(&id)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Patient {id} is not in the current ranking")))
}

/// `GET /api/patients/:id`: record from the local store, synced from
/// the remote service on a miss.
pub async fn record(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<PatientRecord>, ApiError> {
    let record = ctx.blocking(move |core| Ok(core.patient_record(&id)?)).await?;
    Ok(Json(record))
}
