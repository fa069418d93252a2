//! API router.
//!
//! Returns a composable `Router` with every route nested under `/api/`.

use std::sync::Arc;

use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api::endpoints;
use crate::api::types::ApiContext;
use crate::core_state::CoreState;

/// Build the API router over a shared `CoreState`.
///
/// NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
pub fn api_router(core: Arc<CoreState>) -> Router {
    let ctx = ApiContext::new(core);

    let routes = Router::new()
        .route("/health", get(endpoints::health::check))
        .route(
            "/triage",
            get(endpoints::triage::current).post(endpoints::triage::run),
        )
        .route("/patients/:id", get(endpoints::patients::record))
        .route("/patients/:id/status", get(endpoints::patients::status))
        .route("/import", post(endpoints::store::import))
        .route("/publish", post(endpoints::store::publish))
        .route("/cache", delete(endpoints::store::clear_cache))
        .route("/store", delete(endpoints::store::clear))
        .with_state(ctx);

    Router::new()
        .nest("/api", routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use crate::config::AppConfig;
    use crate::db;
    use crate::fhir::MockRecordService;

    fn test_core(dir: &tempfile::TempDir) -> Arc<CoreState> {
        let config = AppConfig {
            db_path: dir.path().join("api.db"),
            sample_size: 3,
            ..AppConfig::default()
        };
        Arc::new(CoreState::new(config, Arc::new(MockRecordService::new())))
    }

    fn rows_json(n: usize) -> String {
        let rows: Vec<serde_json::Value> = (0..n)
            .map(|i| {
                serde_json::json!({
                    "patient_id": format!("row-{i}"),
                    "regular_ward": 1,
                    "test_result": i % 2,
                    "has_disease": 0,
                    "age_quantile": i,
                    "leukocytes": 0.1,
                    "platelets": 0.2,
                    "mean_platelet_volume": 0.3,
                    "eosinophils": -0.1,
                    "monocytes": i as f64 / 10.0,
                })
            })
            .collect();
        serde_json::to_string(&rows).unwrap()
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<String>) -> (StatusCode, serde_json::Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(json)
            }
            None => Body::empty(),
        };
        let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    #[tokio::test]
    async fn health_reports_empty_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let app = api_router(test_core(&dir));
        let (status, json) = send(&app, "GET", "/api/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ok");
        assert_eq!(json["snapshot_size"], 0);
    }

    #[tokio::test]
    async fn current_ranking_before_any_run_is_404() {
        let dir = tempfile::tempdir().unwrap();
        let app = api_router(test_core(&dir));
        let (status, json) = send(&app, "GET", "/api/triage", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"]["code"], "NO_RANKING");
    }

    #[tokio::test]
    async fn import_publish_triage_and_status() {
        let dir = tempfile::tempdir().unwrap();
        let app = api_router(test_core(&dir));

        let (status, json) = send(&app, "POST", "/api/import", Some(rows_json(4))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["rows_kept"], 4);

        let (status, json) = send(&app, "POST", "/api/publish", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["published"].as_array().unwrap().len(), 3);

        let (status, json) = send(&app, "POST", "/api/triage", None).await;
        assert_eq!(status, StatusCode::OK);
        let patients = json["patients"].as_array().unwrap();
        assert_eq!(patients.len(), 3);
        assert_eq!(patients[0]["health_status"], "emergent");
        assert_eq!(patients[0]["test_result"], true);

        let id = patients[1]["id"].as_str().unwrap().to_string();
        let (status, json) = send(&app, "GET", &format!("/api/patients/{id}/status"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["position"], 1);
        assert_eq!(json["health_status"], "semi_urgent");

        let (status, json) = send(&app, "GET", &format!("/api/patients/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["id"], id.as_str());

        let (_, json) = send(&app, "GET", "/api/health", None).await;
        assert_eq!(json["snapshot_size"], 3);
    }

    #[tokio::test]
    async fn status_for_unranked_patient_is_404() {
        let dir = tempfile::tempdir().unwrap();
        let app = api_router(test_core(&dir));
        let (status, json) = send(&app, "GET", "/api/patients/nobody/status", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn triage_with_unknown_roster_patient_is_422() {
        let dir = tempfile::tempdir().unwrap();
        let core = test_core(&dir);
        let conn = core.open_db().unwrap();
        db::replace_roster(&conn, &["ghost".to_string()]).unwrap();
        drop(conn);

        let app = api_router(core);
        let (status, json) = send(&app, "POST", "/api/triage", None).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json["error"]["code"], "DATA_INTEGRITY");

        let (status, _) = send(&app, "GET", "/api/triage", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn malformed_import_body_is_400() {
        let dir = tempfile::tempdir().unwrap();
        let app = api_router(test_core(&dir));
        let (status, json) = send(&app, "POST", "/api/import", Some("{\"not\":\"rows\"}".into())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["code"], "BAD_REQUEST");

        let (status, _) = send(&app, "POST", "/api/import", Some("[]".into())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn clearing_cache_keeps_roster_for_next_run() {
        let dir = tempfile::tempdir().unwrap();
        let app = api_router(test_core(&dir));
        send(&app, "POST", "/api/import", Some(rows_json(4))).await;
        send(&app, "POST", "/api/publish", None).await;
        send(&app, "POST", "/api/triage", None).await;

        let (status, json) = send(&app, "DELETE", "/api/cache", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["cached"], 3);
        assert_eq!(json["sources"], 0);

        let (status, _) = send(&app, "GET", "/api/triage", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, json) = send(&app, "POST", "/api/triage", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["patients"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn clearing_store_drops_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let app = api_router(test_core(&dir));
        send(&app, "POST", "/api/import", Some(rows_json(2))).await;
        send(&app, "POST", "/api/publish", None).await;
        send(&app, "POST", "/api/triage", None).await;

        let (status, json) = send(&app, "DELETE", "/api/store", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["sources"], 2);

        let (status, _) = send(&app, "GET", "/api/triage", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
