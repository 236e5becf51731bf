use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::auth::Principal;
use crate::error::Result;
use crate::server::AppState;

use super::extract::client_ip;
use super::{ok, ApiResponse};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub principal: Principal,
}

pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>> {
    let ip = client_ip(&headers);
    let (token, principal) = state
        .sessions
        .authenticate(&req.username, &req.password, ip.as_deref())
        .await?;

    Ok(ok(LoginResponse { token, principal }))
}

pub async fn verify(principal: Principal) -> Json<ApiResponse<Principal>> {
    ok(principal)
}
