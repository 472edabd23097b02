use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use directory::DirectoryError;
use domain::models::AssignmentConflict;

/// API error taxonomy with an explicit HTTP status mapping.
///
/// Every failure path in the assignment flows produces one of these
/// variants before a response is written; unknown-shaped errors never
/// reach the wire.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Users not in organization: {0:?}")]
    UsersNotInOrganization(Vec<String>),

    #[error("Invalid salesman ids: {0:?}")]
    InvalidSalesmen(Vec<String>),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Assignment conflicts for {} salesman(s)", .0.len())]
    Conflicts(Vec<AssignmentConflict>),

    #[error("Upstream error: {message}")]
    Upstream { status: Option<u16>, message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Unauthorized(message) => {
                (StatusCode::UNAUTHORIZED, Json(json!({ "error": message }))).into_response()
            }
            ApiError::Validation(message) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
            }
            ApiError::UsersNotInOrganization(user_ids) => (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "error": "Some users are not members of the organization",
                    "usersNotInOrganization": user_ids,
                })),
            )
                .into_response(),
            ApiError::InvalidSalesmen(user_ids) => (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "error": "Some users are not salesmen",
                    "invalidSalesmanIds": user_ids,
                })),
            )
                .into_response(),
            ApiError::NotFound(message) => {
                (StatusCode::NOT_FOUND, Json(json!({ "error": message }))).into_response()
            }
            ApiError::Conflicts(conflicts) => (
                StatusCode::CONFLICT,
                Json(json!({
                    "error": "Some salesmen are already assigned to another sales manager",
                    "conflicts": conflicts,
                })),
            )
                .into_response(),
            ApiError::Upstream { status, message } => {
                let status = status
                    .and_then(|code| StatusCode::from_u16(code).ok())
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                tracing::error!(status = status.as_u16(), message = %message, "Upstream directory error");
                (status, Json(json!({ "error": message }))).into_response()
            }
            ApiError::Internal(message) => {
                tracing::error!("Internal error: {}", message);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": message })),
                )
                    .into_response()
            }
        }
    }
}

impl From<DirectoryError> for ApiError {
    fn from(err: DirectoryError) -> Self {
        let status = err.status();
        let message = match err {
            // Forward the directory's own message rather than the wrapper text.
            DirectoryError::Upstream { message, .. } => message,
            other => other.to_string(),
        };
        ApiError::Upstream { status, message }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let message = errors
            .field_errors()
            .values()
            .flat_map(|errors| errors.iter())
            .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
            .next()
            .unwrap_or_else(|| "Invalid request".to_string());
        ApiError::Validation(message)
    }
}
