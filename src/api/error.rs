use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

use crate::quote::ReshapeError;
use crate::store::StoreError;

/// Boundary error for the query service. Every variant renders as the JSON
/// error envelope; the router's CORS layer applies to these responses too.
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    Internal(String),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<ReshapeError> for ApiError {
    fn from(err: ReshapeError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::NotFound(message) => {
                (StatusCode::NOT_FOUND, Json(json!({ "error": message }))).into_response()
            }
            ApiError::Internal(message) => {
                error!("request failed: {}", message);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({
                        "error": "Internal server error",
                        "message": message
                    })),
                )
                    .into_response()
            }
        }
    }
}
