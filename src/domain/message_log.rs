//! Append-only record of attempted outbound notifications.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum MessageOutcome {
    Success,
    Failed,
    Pending,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct MessageLogEntry {
    pub id: i64,
    /// NULL when customer lookup failed before the send
    pub customer_id: Option<i64>,
    pub phone: String,
    pub category: String,
    pub status: MessageOutcome,
    pub preview: String,
    pub error: Option<String>,
    pub sent_by: Option<i64>,
    pub created_at: DateTime<Utc>,
}

pub struct NewMessageLog<'a> {
    pub customer_id: Option<i64>,
    pub phone: &'a str,
    pub category: &'a str,
    pub status: MessageOutcome,
    pub preview: &'a str,
    pub error: Option<&'a str>,
    pub sent_by: Option<i64>,
}

#[derive(Clone)]
pub struct MessageLogStore {
    db: SqlitePool,
}

impl MessageLogStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    pub async fn append(&self, entry: NewMessageLog<'_>) -> Result<i64> {
        let id = sqlx::query(
            "INSERT INTO message_logs
                (customer_id, phone, category, status, preview, error, sent_by, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(entry.customer_id)
        .bind(entry.phone)
        .bind(entry.category)
        .bind(entry.status)
        .bind(entry.preview)
        .bind(entry.error)
        .bind(entry.sent_by)
        .bind(Utc::now())
        .execute(&self.db)
        .await?
        .last_insert_rowid();

        Ok(id)
    }

    pub async fn list(&self, limit: Option<i64>) -> Result<Vec<MessageLogEntry>> {
        let limit = limit.unwrap_or(100);
        let entries = sqlx::query_as::<_, MessageLogEntry>(
            "SELECT id, customer_id, phone, category, status, preview, error, sent_by, created_at
             FROM message_logs
             ORDER BY id DESC
             LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.db)
        .await?;

        Ok(entries)
    }
}
