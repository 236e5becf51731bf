use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::auth::Principal;
use crate::domain::message_log::MessageLogEntry;
use crate::error::{AppError, Result};
use crate::messaging::{BroadcastSummary, GatewayStatus, SendOutcome};
use crate::server::AppState;

use super::{ok, ApiResponse};

#[derive(Debug, Serialize)]
pub struct MessagingStatusResponse {
    pub status: GatewayStatus,
    pub broadcast_running: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_broadcast: Option<BroadcastSummary>,
}

pub async fn status(
    State(state): State<AppState>,
    _principal: Principal,
) -> Result<Json<ApiResponse<MessagingStatusResponse>>> {
    Ok(ok(MessagingStatusResponse {
        status: state.messaging.status().await,
        broadcast_running: state.messaging.broadcast_running(),
        last_broadcast: state.messaging.last_broadcast().await,
    }))
}

pub async fn start(
    State(state): State<AppState>,
    _principal: Principal,
) -> Result<Json<ApiResponse<GatewayStatus>>> {
    Ok(ok(state.messaging.start().await?))
}

pub async fn stop(
    State(state): State<AppState>,
    _principal: Principal,
) -> Result<Json<ApiResponse<GatewayStatus>>> {
    Ok(ok(state.messaging.stop().await?))
}

#[derive(Debug, Deserialize)]
pub struct SendRequest {
    pub customer_id: i64,
    pub message: String,
}

pub async fn send(
    State(state): State<AppState>,
    principal: Principal,
    Json(req): Json<SendRequest>,
) -> Result<Json<ApiResponse<SendOutcome>>> {
    if req.message.trim().is_empty() {
        return Err(AppError::Validation("message is required".to_string()));
    }
    let outcome = state
        .messaging
        .send_to_customer(req.customer_id, &req.message, Some(principal.id))
        .await?;
    Ok(ok(outcome))
}

#[derive(Debug, Deserialize)]
pub struct BroadcastRequest {
    pub template: String,
}

#[derive(Debug, Serialize)]
pub struct BroadcastStarted {
    pub started: bool,
    pub total: usize,
}

/// Kick off the debtor broadcast as a background task; clients poll
/// `GET /messaging/status` for progress instead of holding this request.
pub async fn broadcast(
    State(state): State<AppState>,
    principal: Principal,
    Json(req): Json<BroadcastRequest>,
) -> Result<Json<ApiResponse<BroadcastStarted>>> {
    if req.template.trim().is_empty() {
        return Err(AppError::Validation("template is required".to_string()));
    }
    let total = state
        .messaging
        .spawn_broadcast(req.template, Some(principal.id))
        .await?;
    Ok(ok(BroadcastStarted {
        started: true,
        total,
    }))
}

#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    pub limit: Option<i64>,
}

pub async fn logs(
    State(state): State<AppState>,
    _principal: Principal,
    Query(query): Query<LogsQuery>,
) -> Result<Json<ApiResponse<Vec<MessageLogEntry>>>> {
    Ok(ok(state.message_logs.list(query.limit).await?))
}
