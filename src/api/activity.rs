use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use crate::auth::Principal;
use crate::domain::activity::{self, ActivityLogEntry};
use crate::error::Result;
use crate::server::AppState;

use super::{ok, ApiResponse};

#[derive(Debug, Deserialize)]
pub struct ActivityQuery {
    pub limit: Option<i64>,
}

pub async fn list_activity(
    State(state): State<AppState>,
    principal: Principal,
    Query(query): Query<ActivityQuery>,
) -> Result<Json<ApiResponse<Vec<ActivityLogEntry>>>> {
    principal.require_admin()?;
    Ok(ok(activity::list(&state.db, query.limit).await?))
}
