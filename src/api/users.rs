//! User management endpoints, all admin-gated.

use axum::extract::{Path, State};
use axum::Json;

use crate::auth::Principal;
use crate::domain::users::{NewUser, UpdateUser, User};
use crate::error::Result;
use crate::server::AppState;

use super::{ok, ApiResponse};

pub async fn list_users(
    State(state): State<AppState>,
    principal: Principal,
) -> Result<Json<ApiResponse<Vec<User>>>> {
    principal.require_admin()?;
    Ok(ok(state.users.list().await?))
}

pub async fn create_user(
    State(state): State<AppState>,
    principal: Principal,
    Json(new_user): Json<NewUser>,
) -> Result<Json<ApiResponse<User>>> {
    principal.require_admin()?;
    let user = state.users.create(new_user, Some(principal.id)).await?;
    Ok(ok(user))
}

pub async fn update_user(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i64>,
    Json(updates): Json<UpdateUser>,
) -> Result<Json<ApiResponse<User>>> {
    principal.require_admin()?;
    let user = state.users.update(id, updates, Some(principal.id)).await?;
    Ok(ok(user))
}

pub async fn delete_user(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<()>>> {
    principal.require_admin()?;
    state.users.delete(id, principal.id).await?;
    Ok(ok(()))
}
