use std::collections::BTreeMap;

use axum::extract::State;
use axum::Json;

use crate::auth::Principal;
use crate::error::Result;
use crate::events::ChangeEvent;
use crate::server::AppState;

use super::{ok, ApiResponse};

pub async fn get_settings(
    State(state): State<AppState>,
    _principal: Principal,
) -> Result<Json<ApiResponse<BTreeMap<String, String>>>> {
    Ok(ok(state.business_settings.all().await?))
}

/// Upsert settings; admin only.
pub async fn update_settings(
    State(state): State<AppState>,
    principal: Principal,
    Json(values): Json<BTreeMap<String, String>>,
) -> Result<Json<ApiResponse<BTreeMap<String, String>>>> {
    principal.require_admin()?;
    state
        .business_settings
        .upsert_many(values, Some(principal.id))
        .await?;

    let all = state.business_settings.all().await?;
    state.registry.publish(ChangeEvent::settings_updated(
        serde_json::to_value(&all)?,
    ));
    Ok(ok(all))
}
