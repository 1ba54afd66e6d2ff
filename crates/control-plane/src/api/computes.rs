// Compute lifecycle HTTP routes

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;

use podplane_core::ComputeSummary;

use super::common::{error_response, owner_id, ErrorResponse, ListResponse};
use crate::service::ComputeLifecycle;

type ApiError = (StatusCode, Json<ErrorResponse>);

/// Request to create a new compute instance
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateComputeRequest {
    /// Preset template to provision from. Defaults to the configured preset.
    #[serde(default)]
    #[schema(example = "base")]
    pub preset_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TerminateQuery {
    pub reason: Option<String>,
}

/// App state for compute routes
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ComputeLifecycle>,
}

impl AppState {
    pub fn new(service: Arc<ComputeLifecycle>) -> Self {
        Self { service }
    }
}

/// Create compute routes
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/v1/computes", get(list_computes).post(create_compute))
        .route(
            "/v1/computes/:compute_id",
            get(get_compute).delete(terminate_compute),
        )
        .with_state(state)
}

/// POST /v1/computes - Provision a new compute instance
#[utoipa::path(
    post,
    path = "/v1/computes",
    request_body = CreateComputeRequest,
    responses(
        (status = 201, description = "Compute created and running", body = ComputeSummary),
        (status = 400, description = "Invalid preset", body = ErrorResponse),
        (status = 401, description = "Missing API key", body = ErrorResponse),
        (status = 502, description = "Orchestrator failure", body = ErrorResponse)
    ),
    tag = "computes"
)]
pub async fn create_compute(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreateComputeRequest>,
) -> Result<(StatusCode, Json<ComputeSummary>), ApiError> {
    let owner = owner_id(&headers).map_err(error_response)?;
    let summary = state
        .service
        .create_compute(&owner, req.preset_id.as_deref())
        .await
        .map_err(error_response)?;
    Ok((StatusCode::CREATED, Json(summary)))
}

/// GET /v1/computes - List the caller's computes
#[utoipa::path(
    get,
    path = "/v1/computes",
    params(
        ("limit" = Option<i64>, Query, description = "Page size (default 50, max 200)"),
        ("offset" = Option<i64>, Query, description = "Rows to skip")
    ),
    responses(
        (status = 200, description = "Computes owned by the caller", body = ListResponse<ComputeSummary>),
        (status = 401, description = "Missing API key", body = ErrorResponse)
    ),
    tag = "computes"
)]
pub async fn list_computes(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> Result<Json<ListResponse<ComputeSummary>>, ApiError> {
    let owner = owner_id(&headers).map_err(error_response)?;
    let computes = state
        .service
        .list_computes(&owner, query.limit.unwrap_or(50), query.offset.unwrap_or(0))
        .await
        .map_err(error_response)?;
    Ok(Json(ListResponse::new(computes)))
}

/// GET /v1/computes/{compute_id} - Fetch one compute
#[utoipa::path(
    get,
    path = "/v1/computes/{compute_id}",
    params(("compute_id" = String, Path, description = "Compute ID")),
    responses(
        (status = 200, description = "Compute found", body = ComputeSummary),
        (status = 401, description = "Missing API key", body = ErrorResponse),
        (status = 404, description = "No such compute for this owner", body = ErrorResponse)
    ),
    tag = "computes"
)]
pub async fn get_compute(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(compute_id): Path<String>,
) -> Result<Json<ComputeSummary>, ApiError> {
    let owner = owner_id(&headers).map_err(error_response)?;
    let summary = state
        .service
        .get_compute(&owner, &compute_id)
        .await
        .map_err(error_response)?;
    Ok(Json(summary))
}

/// DELETE /v1/computes/{compute_id} - Terminate a compute
#[utoipa::path(
    delete,
    path = "/v1/computes/{compute_id}",
    params(
        ("compute_id" = String, Path, description = "Compute ID"),
        ("reason" = Option<String>, Query, description = "Recorded termination reason")
    ),
    responses(
        (status = 200, description = "Termination recorded", body = ComputeSummary),
        (status = 401, description = "Missing API key", body = ErrorResponse),
        (status = 404, description = "No such compute for this owner", body = ErrorResponse)
    ),
    tag = "computes"
)]
pub async fn terminate_compute(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(compute_id): Path<String>,
    Query(query): Query<TerminateQuery>,
) -> Result<Json<ComputeSummary>, ApiError> {
    let owner = owner_id(&headers).map_err(error_response)?;
    let reason = query.reason.as_deref().unwrap_or("user requested");
    let summary = state
        .service
        .terminate_compute(&owner, &compute_id, reason)
        .await
        .map_err(error_response)?;
    Ok(Json(summary))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::MemoryPodDirectory;
    use axum::body::Body;
    use http_body_util::BodyExt;
    use podplane_core::StaticPresetManager;
    use podplane_storage::StorageBackend;
    use tower::ServiceExt;

    fn test_app() -> Router {
        let service = Arc::new(ComputeLifecycle::new(
            StorageBackend::in_memory(),
            Arc::new(MemoryPodDirectory::new()),
            Arc::new(StaticPresetManager::default()),
            "preview.computesdk.com",
            "base",
        ));
        routes(AppState::new(service))
    }

    fn create_request(api_key: Option<&str>) -> axum::http::Request<Body> {
        let mut builder = axum::http::Request::builder()
            .method("POST")
            .uri("/v1/computes")
            .header("content-type", "application/json");
        if let Some(key) = api_key {
            builder = builder.header("x-api-key", key);
        }
        builder.body(Body::from(r#"{}"#)).unwrap()
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn create_without_api_key_is_401() {
        let app = test_app();
        let response = app.oneshot(create_request(None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn create_returns_a_running_summary() {
        let app = test_app();
        let response = app.oneshot(create_request(Some("key-alice"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let body = json_body(response).await;
        assert_eq!(body["status"], "running");
        assert_eq!(body["owner_id"], "key-alice");
        assert!(body["id"].as_str().unwrap().starts_with("cmp_"));
    }

    #[tokio::test]
    async fn lifecycle_round_trip_over_http() {
        let app = test_app();

        let response = app
            .clone()
            .oneshot(create_request(Some("key-alice")))
            .await
            .unwrap();
        let created = json_body(response).await;
        let id = created["id"].as_str().unwrap().to_string();

        // Terminate
        let response = app
            .clone()
            .oneshot(
                axum::http::Request::builder()
                    .method("DELETE")
                    .uri(format!("/v1/computes/{id}?reason=test"))
                    .header("x-api-key", "key-alice")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "terminated");

        // Get reflects the terminal state
        let response = app
            .oneshot(
                axum::http::Request::builder()
                    .uri(format!("/v1/computes/{id}"))
                    .header("x-api-key", "key-alice")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "terminated");
    }

    #[tokio::test]
    async fn list_is_scoped_to_the_api_key() {
        let app = test_app();
        app.clone()
            .oneshot(create_request(Some("key-alice")))
            .await
            .unwrap();
        app.clone()
            .oneshot(create_request(Some("key-bob")))
            .await
            .unwrap();

        let response = app
            .oneshot(
                axum::http::Request::builder()
                    .uri("/v1/computes")
                    .header("x-api-key", "key-alice")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        let data = body["data"].as_array().unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data[0]["owner_id"], "key-alice");
    }

    #[tokio::test]
    async fn unknown_compute_is_404() {
        let app = test_app();
        let response = app
            .oneshot(
                axum::http::Request::builder()
                    .uri("/v1/computes/cmp_missing")
                    .header("x-api-key", "key-alice")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn invalid_preset_is_400() {
        let app = test_app();
        let response = app
            .oneshot(
                axum::http::Request::builder()
                    .method("POST")
                    .uri("/v1/computes")
                    .header("content-type", "application/json")
                    .header("x-api-key", "key-alice")
                    .body(Body::from(r#"{"preset_id":"gpu-xl"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(json_body(response).await["error"]
            .as_str()
            .unwrap()
            .contains("preset"));
    }
}
