use axum::extract::{Path, Query, State};
use axum::Json;

use crate::auth::Principal;
use crate::domain::transactions::{
    MonthlyEntry, NewTransaction, Stats, Transaction, TransactionFilter,
};
use crate::error::Result;
use crate::events::ChangeEvent;
use crate::server::AppState;

use super::{ok, ApiResponse};

pub async fn list_transactions(
    State(state): State<AppState>,
    _principal: Principal,
    Query(filter): Query<TransactionFilter>,
) -> Result<Json<ApiResponse<Vec<Transaction>>>> {
    Ok(ok(state.transactions.list(filter).await?))
}

pub async fn create_transaction(
    State(state): State<AppState>,
    principal: Principal,
    Json(new): Json<NewTransaction>,
) -> Result<Json<ApiResponse<Transaction>>> {
    let transaction = state
        .transactions
        .create(&state.customers, new, Some(principal.id))
        .await?;
    state.registry.publish(ChangeEvent::transaction_updated(
        serde_json::to_value(&transaction)?,
    ));
    Ok(ok(transaction))
}

pub async fn mark_settled(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Transaction>>> {
    let receipt = state
        .transactions
        .mark_settled(id, Some(principal.id))
        .await?;
    state.registry.publish(ChangeEvent::transaction_updated(
        serde_json::to_value(&receipt)?,
    ));
    Ok(ok(receipt))
}

pub async fn delete_transaction(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<()>>> {
    state.transactions.delete(id, Some(principal.id)).await?;
    state
        .registry
        .publish(ChangeEvent::invalidate("transaction_updated"));
    Ok(ok(()))
}

pub async fn stats(
    State(state): State<AppState>,
    _principal: Principal,
) -> Result<Json<ApiResponse<Stats>>> {
    Ok(ok(state.transactions.stats().await?))
}

pub async fn monthly(
    State(state): State<AppState>,
    _principal: Principal,
) -> Result<Json<ApiResponse<Vec<MonthlyEntry>>>> {
    Ok(ok(state.transactions.monthly_breakdown().await?))
}
