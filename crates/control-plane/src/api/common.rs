// Common DTOs for the public API

use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use podplane_core::ComputeError;

/// Standard error response for API endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Error message describing what went wrong.
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// Response wrapper for list endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ListResponse<T> {
    /// Array of items returned by the list operation.
    pub data: Vec<T>,
}

impl<T> ListResponse<T> {
    pub fn new(data: Vec<T>) -> Self {
        Self { data }
    }
}

/// Map a lifecycle error to its HTTP representation.
///
/// Event-store and internal failures log the cause and answer 500 without
/// leaking details; everything else maps per the error taxonomy.
pub fn error_response(err: ComputeError) -> (StatusCode, Json<ErrorResponse>) {
    let (status, message) = match &err {
        ComputeError::OwnerNotAuthenticated => {
            (StatusCode::UNAUTHORIZED, err.to_string())
        }
        ComputeError::InvalidPreset(_) => (StatusCode::BAD_REQUEST, err.to_string()),
        ComputeError::NotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
        ComputeError::Orchestrator(_) => (StatusCode::BAD_GATEWAY, err.to_string()),
        ComputeError::EventStore(_) | ComputeError::Internal(_) => {
            tracing::error!("command failed: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal error".to_string(),
            )
        }
    };
    (status, Json(ErrorResponse::new(message)))
}

/// Extract the owner identity from the X-API-Key header.
pub fn owner_id(headers: &axum::http::HeaderMap) -> Result<String, ComputeError> {
    headers
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or(ComputeError::OwnerNotAuthenticated)
}
