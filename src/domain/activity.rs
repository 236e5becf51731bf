//! Append-only audit trail of significant actions.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;

use crate::error::Result;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ActivityLogEntry {
    pub id: i64,
    pub user_id: Option<i64>,
    pub action: String,
    pub detail: String,
    pub ip: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Append an audit entry for an authenticated actor.
///
/// Internal/system calls pass `actor = None` and are skipped without error.
pub async fn record(
    pool: &SqlitePool,
    actor: Option<i64>,
    action: &str,
    detail: &str,
    ip: Option<&str>,
) -> Result<()> {
    let Some(user_id) = actor else {
        return Ok(());
    };

    sqlx::query(
        "INSERT INTO activity_logs (user_id, action, detail, ip, created_at)
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(user_id)
    .bind(action)
    .bind(detail)
    .bind(ip)
    .bind(Utc::now())
    .execute(pool)
    .await?;

    tracing::debug!(user_id, action, "Activity recorded");
    Ok(())
}

/// List audit entries newest first, optionally capped.
pub async fn list(pool: &SqlitePool, limit: Option<i64>) -> Result<Vec<ActivityLogEntry>> {
    let limit = limit.unwrap_or(100);
    let entries = sqlx::query_as::<_, ActivityLogEntry>(
        "SELECT id, user_id, action, detail, ip, created_at
         FROM activity_logs
         ORDER BY id DESC
         LIMIT ?",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(entries)
}
