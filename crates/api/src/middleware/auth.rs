//! Admin authentication middleware.
//!
//! Assignment routes are an administrative surface: every request must
//! carry an `X-Admin-Key` header matching one of the configured keys.

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::app::AppState;
use crate::error::ApiError;

/// Header carrying the admin API key.
pub const ADMIN_KEY_HEADER: &str = "X-Admin-Key";

/// Middleware that requires an admin API key.
///
/// Rejects with 401 when the header is missing or does not match any
/// configured key. With no keys configured the route set is effectively
/// disabled; every request is rejected.
pub async fn require_admin(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let presented = req
        .headers()
        .get(ADMIN_KEY_HEADER)
        .and_then(|v| v.to_str().ok());

    match presented {
        Some(key) if is_valid_key(&state.config.security.admin_api_keys, key) => {
            next.run(req).await
        }
        Some(_) => ApiError::Unauthorized("Invalid admin key".to_string()).into_response(),
        None => ApiError::Unauthorized("Missing admin key".to_string()).into_response(),
    }
}

fn is_valid_key(configured: &[String], presented: &str) -> bool {
    configured.iter().any(|key| key == presented)
}
