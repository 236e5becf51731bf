use axum::extract::{Path, Query, State};
use axum::Json;

use crate::auth::Principal;
use crate::domain::customers::{Customer, CustomerFilter, Debtor, NewCustomer, UpdateCustomer};
use crate::error::Result;
use crate::events::ChangeEvent;
use crate::server::AppState;

use super::{ok, ApiResponse};

pub async fn list_customers(
    State(state): State<AppState>,
    _principal: Principal,
    Query(filter): Query<CustomerFilter>,
) -> Result<Json<ApiResponse<Vec<Customer>>>> {
    Ok(ok(state.customers.list(filter).await?))
}

pub async fn get_customer(
    State(state): State<AppState>,
    _principal: Principal,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Customer>>> {
    Ok(ok(state.customers.get(id).await?))
}

pub async fn create_customer(
    State(state): State<AppState>,
    principal: Principal,
    Json(new): Json<NewCustomer>,
) -> Result<Json<ApiResponse<Customer>>> {
    let customer = state.customers.create(new, Some(principal.id)).await?;
    state.registry.publish(ChangeEvent::customer_updated(
        serde_json::to_value(&customer)?,
    ));
    Ok(ok(customer))
}

pub async fn update_customer(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i64>,
    Json(updates): Json<UpdateCustomer>,
) -> Result<Json<ApiResponse<Customer>>> {
    let customer = state
        .customers
        .update(id, updates, Some(principal.id))
        .await?;
    state.registry.publish(ChangeEvent::customer_updated(
        serde_json::to_value(&customer)?,
    ));
    Ok(ok(customer))
}

pub async fn delete_customer(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<()>>> {
    state.customers.delete(id, Some(principal.id)).await?;
    // No payload: clients refetch the list
    state
        .registry
        .publish(ChangeEvent::invalidate("customer_updated"));
    Ok(ok(()))
}

pub async fn customers_with_pending(
    State(state): State<AppState>,
    _principal: Principal,
) -> Result<Json<ApiResponse<Vec<Debtor>>>> {
    Ok(ok(state.customers.with_outstanding_balance().await?))
}
