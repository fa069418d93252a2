//! API error types with structured JSON responses.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::core_state::CoreError;
use crate::fhir::SyncError;
use crate::import::ImportError;

/// Structured error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
}

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("No ranking has been computed")]
    NoRanking,
    #[error("Data integrity: {0}")]
    DataIntegrity(String),
    #[error("Remote record service unavailable: {0}")]
    RemoteUnavailable(String),
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ApiError::NotFound(detail) => (StatusCode::NOT_FOUND, "NOT_FOUND", detail.clone()),
            ApiError::NoRanking => (
                StatusCode::NOT_FOUND,
                "NO_RANKING",
                "No ranking has been computed yet".to_string(),
            ),
            ApiError::DataIntegrity(detail) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "DATA_INTEGRITY",
                detail.clone(),
            ),
            ApiError::RemoteUnavailable(detail) => {
                tracing::warn!(detail, "remote record service unavailable");
                (
                    StatusCode::BAD_GATEWAY,
                    "REMOTE_UNAVAILABLE",
                    detail.clone(),
                )
            }
            ApiError::BadRequest(detail) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", detail.clone())
            }
            ApiError::Internal(detail) => {
                tracing::error!(detail, "API internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = ErrorBody {
            error: ErrorDetail { code, message },
        };
        (status, Json(body)).into_response()
    }
}

impl From<SyncError> for ApiError {
    fn from(err: SyncError) -> Self {
        match err {
            SyncError::NotFound(id) => ApiError::NotFound(format!("Patient {id} not found")),
            SyncError::Database(e) => ApiError::Internal(e.to_string()),
            other => ApiError::RemoteUnavailable(other.to_string()),
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Database(e) => ApiError::Internal(e.to_string()),
            CoreError::Sync(e) => e.into(),
            CoreError::Triage(e) => ApiError::DataIntegrity(e.to_string()),
            CoreError::Import(ImportError::Database(e)) => ApiError::Internal(e.to_string()),
            CoreError::Import(e) => ApiError::BadRequest(e.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        ApiError::Internal(format!("worker task failed: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DatabaseError;
    use crate::models::Signal;
    use crate::triage::TriageError;
    use axum::body::to_bytes;

    async fn body_json(response: Response) -> serde_json::Value {
        let body = to_bytes(response.into_body(), 4096).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn data_integrity_returns_422() {
        let err: ApiError = CoreError::Triage(TriageError::MissingSignal {
            patient_id: "p1".into(),
            signal: Signal::Platelets,
        })
        .into();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "DATA_INTEGRITY");
        assert!(json["error"]["message"].as_str().unwrap().contains("platelets"));
    }

    #[tokio::test]
    async fn no_ranking_returns_404() {
        let response = ApiError::NoRanking.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["error"]["code"], "NO_RANKING");
    }

    #[tokio::test]
    async fn internal_hides_detail() {
        let response = ApiError::Internal("disk on fire".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert_eq!(json["error"]["message"], "An internal error occurred");
    }

    #[test]
    fn sync_errors_map_by_kind() {
        assert!(matches!(
            ApiError::from(SyncError::NotFound("x".into())),
            ApiError::NotFound(_)
        ));
        assert!(matches!(
            ApiError::from(SyncError::Unavailable("x".into())),
            ApiError::RemoteUnavailable(_)
        ));
        assert!(matches!(
            ApiError::from(SyncError::Timeout(30)),
            ApiError::RemoteUnavailable(_)
        ));
        assert!(matches!(
            ApiError::from(SyncError::Database(DatabaseError::ConstraintViolation(
                "duplicate roster id".into(),
            ))),
            ApiError::Internal(_)
        ));
    }

    #[test]
    fn empty_import_is_bad_request() {
        let err = ApiError::from(CoreError::Import(ImportError::EmptyBatch));
        assert!(matches!(err, ApiError::BadRequest(_)));
    }
}
