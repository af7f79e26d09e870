//! HTTP request handlers for the provenance service.
//!
//! Implements the recording endpoint, the read-only object lookup, and a
//! health check using axum. Conversion between wire types and domain
//! types happens here, at the boundary; the engine never sees transport
//! concerns.

use axum::{
    extract::{ConnectInfo, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use lineage_domain::RawRequest;
use lineage_engine::{OutcomeKind, Recorder};
use lineage_store::{ObjectLookup, SqliteStore};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// The backing store; rusqlite connections are not thread-safe, so
    /// access is serialized behind a mutex
    pub store: Arc<Mutex<SqliteStore>>,
    /// The recording engine
    pub recorder: Arc<Recorder>,
}

/// Provenance submission request body
///
/// Every caller field is optional on the wire; the engine's validator
/// decides which absences are fatal.
#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    /// Identifier of the registered object the event attaches to
    pub object_uuid: Option<String>,
    /// Name of the submitting service
    pub service_name: Option<String>,
    /// Name of the event category
    pub category_name: Option<String>,
    /// Name of the event
    pub event_name: Option<String>,
    /// Acting account
    pub username: Option<String>,
    /// Account acted on behalf of
    pub proxy_username: Option<String>,
    /// Free-form event data
    pub event_data: Option<String>,
    /// Service version
    pub version: Option<String>,
    /// Whether to track history for this record
    #[serde(default)]
    pub track_history: bool,
    /// Grouping code for history tracking
    pub track_history_code: Option<String>,
}

impl SubmitRequest {
    /// Convert to the engine's raw request, stamping the shell-assigned
    /// fields.
    fn into_raw(self, source_address: String, created_at: i64) -> RawRequest {
        RawRequest {
            object_uuid: self.object_uuid,
            service_name: self.service_name,
            category_name: self.category_name,
            event_name: self.event_name,
            username: self.username,
            proxy_username: self.proxy_username,
            event_data: self.event_data,
            version: self.version,
            track_history: self.track_history,
            track_history_code: self.track_history_code,
            source_address,
            created_at,
        }
    }
}

/// Object lookup query parameters
#[derive(Debug, Deserialize)]
pub struct LookupParams {
    /// The submitting service's own identifier for the object
    pub service_object_id: String,
}

/// Successful object lookup response
#[derive(Debug, Serialize, Deserialize)]
pub struct LookupResponse {
    /// The registered object uuid
    pub uuid: String,
}

/// Error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Overall status
    pub status: String,
    /// Error description
    pub details: String,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthCheckResponse {
    /// Overall health status
    pub status: String,
}

/// POST /provenance - Record a provenance event
///
/// The source address comes from the connection, and the creation time
/// from the server clock; callers cannot supply either.
async fn record_provenance(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(body): Json<SubmitRequest>,
) -> Response {
    let raw = body.into_raw(addr.ip().to_string(), current_epoch_seconds());

    let mut store = state.store.lock().await;
    let outcome = state.recorder.record(&mut *store, raw);

    let status = match outcome.kind {
        OutcomeKind::Recorded => StatusCode::OK,
        OutcomeKind::ValidationFailed | OutcomeKind::ResolutionFailed => StatusCode::BAD_REQUEST,
        OutcomeKind::RegistrationFailed | OutcomeKind::WriteFailed => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, Json(outcome)).into_response()
}

/// GET /objects - Look up the object uuid registered for a service's own
/// object identifier
async fn lookup_object(
    State(state): State<AppState>,
    Query(params): Query<LookupParams>,
) -> Response {
    let store = state.store.lock().await;

    match store.lookup_object(&params.service_object_id) {
        Ok(ObjectLookup::Found(uuid)) => {
            tracing::info!("Lookup object exists: {}", uuid);
            (StatusCode::OK, Json(LookupResponse { uuid })).into_response()
        }
        Ok(ObjectLookup::Missing) => {
            tracing::error!("No object found for {}", params.service_object_id);
            (
                StatusCode::NOT_FOUND,
                Json(ErrorResponse {
                    status: "failed".to_string(),
                    details: "Object does not exist".to_string(),
                }),
            )
                .into_response()
        }
        Ok(ObjectLookup::Ambiguous(count)) => {
            tracing::error!(
                "{} objects found for {}; support has been notified",
                count,
                params.service_object_id
            );
            (
                StatusCode::NOT_FOUND,
                Json(ErrorResponse {
                    status: "failed".to_string(),
                    details: "Multiple objects found with the same service object id; \
                              incident has been reported"
                        .to_string(),
                }),
            )
                .into_response()
        }
        Err(e) => {
            tracing::error!("Object lookup failed for {}: {}", params.service_object_id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    status: "failed".to_string(),
                    details: "Lookup could not be completed".to_string(),
                }),
            )
                .into_response()
        }
    }
}

/// GET /health - Liveness check
async fn health_check() -> Json<HealthCheckResponse> {
    Json(HealthCheckResponse {
        status: "ok".to_string(),
    })
}

/// Build the service router. Only POST is routed for submission; any
/// other verb on the path is rejected before processing.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/provenance", post(record_provenance))
        .route("/objects", get(lookup_object))
        .route("/health", get(health_check))
        .with_state(state)
}

/// Seconds since epoch from the server clock.
fn current_epoch_seconds() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use lineage_domain::DEFAULT_VERSION;
    use lineage_engine::FailureQueue;
    use tower::ServiceExt;

    fn test_state(dir: &tempfile::TempDir) -> AppState {
        let mut store = SqliteStore::new(":memory:").unwrap();
        store.add_event("file-upload").unwrap();
        store.add_category("storage").unwrap();
        store.add_service("data-gateway", DEFAULT_VERSION).unwrap();
        store.register_object("120039", "dg-obj-1").unwrap();

        AppState {
            store: Arc::new(Mutex::new(store)),
            recorder: Arc::new(Recorder::new(FailureQueue::new(
                dir.path().join("failures.log"),
            ))),
        }
    }

    fn post_request(body: serde_json::Value) -> Request<Body> {
        let mut request = Request::builder()
            .method("POST")
            .uri("/provenance")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([10, 0, 4, 17], 9999))));
        request
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_record_success() {
        let dir = tempfile::tempdir().unwrap();
        let app = create_router(test_state(&dir));

        let response = app
            .oneshot(post_request(serde_json::json!({
                "object_uuid": "120039",
                "service_name": "data-gateway",
                "category_name": "storage",
                "event_name": "file-upload",
                "username": "svc_ingest",
            })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "success");
        assert_eq!(body["details"], "Provenance recorded");
    }

    #[tokio::test]
    async fn test_record_validation_failure() {
        let dir = tempfile::tempdir().unwrap();
        let app = create_router(test_state(&dir));

        let response = app
            .oneshot(post_request(serde_json::json!({
                "object_uuid": "not-numeric",
                "service_name": "data-gateway",
                "category_name": "storage",
                "event_name": "file-upload",
                "username": "svc_ingest",
            })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["status"], "failed");
        assert_eq!(body["details"], "Validation failed");
        assert!(body["report"].as_str().unwrap().contains("object_uuid"));
    }

    #[tokio::test]
    async fn test_record_unregistered_object() {
        let dir = tempfile::tempdir().unwrap();
        let app = create_router(test_state(&dir));

        let response = app
            .oneshot(post_request(serde_json::json!({
                "object_uuid": "999999",
                "service_name": "data-gateway",
                "category_name": "storage",
                "event_name": "file-upload",
                "username": "svc_ingest",
            })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["status"], "failed");
    }

    #[tokio::test]
    async fn test_record_with_generated_history_code() {
        let dir = tempfile::tempdir().unwrap();
        let app = create_router(test_state(&dir));

        let response = app
            .oneshot(post_request(serde_json::json!({
                "object_uuid": "120039",
                "service_name": "data-gateway",
                "category_name": "storage",
                "event_name": "file-upload",
                "username": "svc_ingest",
                "track_history": true,
            })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["historyCode"].as_str().unwrap().len(), 64);
    }

    #[tokio::test]
    async fn test_wrong_method_rejected_before_processing() {
        let dir = tempfile::tempdir().unwrap();
        let app = create_router(test_state(&dir));

        let response = app
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri("/provenance")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_object_lookup_found_and_missing() {
        let dir = tempfile::tempdir().unwrap();
        let app = create_router(test_state(&dir));

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/objects?service_object_id=dg-obj-1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["uuid"], "120039");

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/objects?service_object_id=missing")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_health_check() {
        let dir = tempfile::tempdir().unwrap();
        let app = create_router(test_state(&dir));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "ok");
    }
}
