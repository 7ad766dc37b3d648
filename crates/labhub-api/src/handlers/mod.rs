//! HTTP handlers.

pub mod health;
pub mod upload;

use axum::Json;
use axum::http::StatusCode;

use crate::dto::response::ApiErrorResponse;

/// Fallback for unknown routes.
pub async fn not_found() -> (StatusCode, Json<ApiErrorResponse>) {
    (
        StatusCode::NOT_FOUND,
        Json(ApiErrorResponse {
            error: "NOT_FOUND".to_string(),
            message: "This page does not exist".to_string(),
        }),
    )
}
