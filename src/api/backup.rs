//! Full export and partial restore.
//!
//! Restore re-creates customers under fresh ids and upserts settings.
//! Users and transactions are intentionally NOT restored, matching the
//! behavior this system replaced (likely an oversight there; preserved
//! here so a restore never silently rewrites accounts or the ledger).

use std::collections::BTreeMap;

use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::Principal;
use crate::domain::activity;
use crate::domain::customers::{Category, Customer, CustomerFilter, NewCustomer};
use crate::domain::transactions::{Transaction, TransactionFilter};
use crate::domain::users::User;
use crate::error::Result;
use crate::events::ChangeEvent;
use crate::server::AppState;

use super::{ok, ApiResponse};

#[derive(Debug, Serialize)]
pub struct BackupData {
    pub exported_at: DateTime<Utc>,
    /// Password hashes are redacted by `User`'s serialization
    pub users: Vec<User>,
    pub customers: Vec<Customer>,
    pub transactions: Vec<Transaction>,
    pub settings: BTreeMap<String, String>,
}

pub async fn backup(
    State(state): State<AppState>,
    principal: Principal,
) -> Result<Json<ApiResponse<BackupData>>> {
    principal.require_admin()?;

    let data = BackupData {
        exported_at: Utc::now(),
        users: state.users.list().await?,
        customers: state.customers.list(CustomerFilter::default()).await?,
        transactions: state.transactions.list(TransactionFilter::default()).await?,
        settings: state.business_settings.all().await?,
    };

    activity::record(
        &state.db,
        Some(principal.id),
        "BACKUP",
        "Exported full backup",
        None,
    )
    .await?;

    Ok(ok(data))
}

/// Customer entry in a restore payload. Accepts the legacy field names
/// (`nama`, `tipe`, `whatsapp`, `alamat`) alongside the current ones.
#[derive(Debug, Deserialize)]
pub struct RestoreCustomer {
    #[serde(alias = "nama")]
    pub name: String,
    #[serde(alias = "tipe")]
    pub category: Category,
    #[serde(alias = "whatsapp")]
    pub phone: String,
    #[serde(default, alias = "alamat")]
    pub address: Option<String>,
    #[serde(default)]
    pub pppoe_username: Option<String>,
    #[serde(default)]
    pub pppoe_password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RestorePayload {
    #[serde(default)]
    pub customers: Vec<RestoreCustomer>,
    #[serde(default)]
    pub settings: BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
pub struct RestoreSummary {
    pub customers_restored: usize,
    pub settings_restored: usize,
}

pub async fn restore(
    State(state): State<AppState>,
    principal: Principal,
    Json(payload): Json<RestorePayload>,
) -> Result<Json<ApiResponse<RestoreSummary>>> {
    principal.require_admin()?;

    let mut customers_restored = 0;
    for entry in payload.customers {
        state
            .customers
            .create(
                NewCustomer {
                    name: entry.name,
                    category: entry.category,
                    phone: entry.phone,
                    pppoe_username: entry.pppoe_username,
                    pppoe_password: entry.pppoe_password,
                    address: entry.address,
                },
                None,
            )
            .await?;
        customers_restored += 1;
    }

    let settings_restored = payload.settings.len();
    if settings_restored > 0 {
        state
            .business_settings
            .upsert_many(payload.settings, None)
            .await?;
    }

    activity::record(
        &state.db,
        Some(principal.id),
        "RESTORE",
        &format!(
            "Restored backup: {} customers, {} settings",
            customers_restored, settings_restored
        ),
        None,
    )
    .await?;

    state.registry.publish(ChangeEvent::data_restored());

    Ok(ok(RestoreSummary {
        customers_restored,
        settings_restored,
    }))
}
