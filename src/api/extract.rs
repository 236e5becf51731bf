use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};

use crate::auth::Principal;
use crate::error::AppError;
use crate::server::AppState;

/// Extract a bearer token from the Authorization header.
pub fn bearer_token(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::to_string)
}

/// Authenticated-request extractor: validates the bearer token against the
/// live user row and attaches the resulting principal to the handler.
impl FromRequestParts<AppState> for Principal {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .ok_or_else(|| AppError::Auth("missing bearer token".to_string()))?;

        state.sessions.validate(&token).await
    }
}

/// Best-effort client origin for the audit trail.
pub fn client_ip(parts_headers: &axum::http::HeaderMap) -> Option<String> {
    parts_headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
