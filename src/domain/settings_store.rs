//! Tunable business parameters as a key→value map. Upsert-only.

use std::collections::BTreeMap;

use sqlx::SqlitePool;

use crate::error::Result;

use super::activity;

#[derive(Clone)]
pub struct SettingsStore {
    db: SqlitePool,
}

impl SettingsStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    pub async fn all(&self) -> Result<BTreeMap<String, String>> {
        let rows: Vec<(String, String)> =
            sqlx::query_as("SELECT key, value FROM settings ORDER BY key")
                .fetch_all(&self.db)
                .await?;
        Ok(rows.into_iter().collect())
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        let value: Option<(String,)> = sqlx::query_as("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.db)
            .await?;
        Ok(value.map(|(v,)| v))
    }

    /// Upsert every pair in the map. No history is kept.
    #[tracing::instrument(name = "settings.upsert", skip(self, values), fields(count = values.len()))]
    pub async fn upsert_many(
        &self,
        values: BTreeMap<String, String>,
        actor: Option<i64>,
    ) -> Result<()> {
        let keys: Vec<&str> = values.keys().map(String::as_str).collect();
        let detail = format!("Updated settings: {}", keys.join(", "));

        for (key, value) in &values {
            sqlx::query(
                "INSERT INTO settings (key, value) VALUES (?, ?)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            )
            .bind(key)
            .bind(value)
            .execute(&self.db)
            .await?;
        }

        activity::record(&self.db, actor, "UPDATE_SETTINGS", &detail, None).await?;
        Ok(())
    }
}
