//! Financial records and aggregate reporting.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::error::{AppError, Result};

use super::activity;
use super::customers::CustomerStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Direction {
    Income,
    Expense,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum TxStatus {
    Pending,
    Settled,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Transaction {
    pub id: i64,
    pub customer_id: Option<i64>,
    /// Point-in-time copy taken at creation; never synced with later edits
    pub customer_name: String,
    pub customer_category: String,
    pub label: String,
    /// Integer minor-unit currency
    pub amount: i64,
    pub direction: Direction,
    pub status: TxStatus,
    pub description: Option<String>,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct NewTransaction {
    pub customer_id: i64,
    pub label: String,
    pub amount: i64,
    pub direction: Direction,
    #[serde(default)]
    pub status: Option<TxStatus>,
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TransactionFilter {
    pub status: Option<TxStatus>,
    pub direction: Option<Direction>,
    pub customer_id: Option<i64>,
    pub limit: Option<i64>,
}

/// Aggregate totals; absent rows count as zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Stats {
    pub income: i64,
    pub expense: i64,
    pub pending: i64,
    pub balance: i64,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct MonthlyEntry {
    pub month: i64,
    pub income: i64,
    pub expense: i64,
}

const TX_COLUMNS: &str = "id, customer_id, customer_name, customer_category, label, amount, \
     direction, status, description, created_by, created_at";

#[derive(Clone)]
pub struct TransactionStore {
    db: SqlitePool,
}

impl TransactionStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    pub async fn list(&self, filter: TransactionFilter) -> Result<Vec<Transaction>> {
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {} FROM transactions WHERE 1=1", TX_COLUMNS));

        if let Some(status) = filter.status {
            qb.push(" AND status = ").push_bind(status);
        }
        if let Some(direction) = filter.direction {
            qb.push(" AND direction = ").push_bind(direction);
        }
        if let Some(customer_id) = filter.customer_id {
            qb.push(" AND customer_id = ").push_bind(customer_id);
        }
        qb.push(" ORDER BY created_at DESC, id DESC");
        if let Some(limit) = filter.limit {
            qb.push(" LIMIT ").push_bind(limit);
        }

        let transactions = qb
            .build_query_as::<Transaction>()
            .fetch_all(&self.db)
            .await?;
        Ok(transactions)
    }

    pub async fn get(&self, id: i64) -> Result<Transaction> {
        sqlx::query_as::<_, Transaction>(&format!(
            "SELECT {} FROM transactions WHERE id = ?",
            TX_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("transaction {} not found", id)))
    }

    /// Create a transaction, snapshotting the customer's current name and
    /// category into the record.
    #[tracing::instrument(name = "transactions.create", skip(self, customers, new), fields(customer_id = new.customer_id))]
    pub async fn create(
        &self,
        customers: &CustomerStore,
        new: NewTransaction,
        actor: Option<i64>,
    ) -> Result<Transaction> {
        if new.amount <= 0 {
            return Err(AppError::Validation("amount must be positive".to_string()));
        }
        if new.label.trim().is_empty() {
            return Err(AppError::Validation("label is required".to_string()));
        }

        let customer = customers.get(new.customer_id).await?;
        let status = new.status.unwrap_or(TxStatus::Pending);

        let id = sqlx::query(
            "INSERT INTO transactions
                (customer_id, customer_name, customer_category, label, amount, direction,
                 status, description, created_by, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(customer.id)
        .bind(&customer.name)
        .bind(customer.category.as_str())
        .bind(&new.label)
        .bind(new.amount)
        .bind(new.direction)
        .bind(status)
        .bind(&new.description)
        .bind(actor)
        .bind(Utc::now())
        .execute(&self.db)
        .await?
        .last_insert_rowid();

        activity::record(
            &self.db,
            actor,
            "CREATE_TRANSACTION",
            &format!(
                "Recorded {} transaction of {} for '{}'",
                new.label, new.amount, customer.name
            ),
            None,
        )
        .await?;

        self.get(id).await
    }

    #[tracing::instrument(name = "transactions.delete", skip(self))]
    pub async fn delete(&self, id: i64, actor: Option<i64>) -> Result<()> {
        let tx = self.get(id).await?;
        sqlx::query("DELETE FROM transactions WHERE id = ?")
            .bind(id)
            .execute(&self.db)
            .await?;

        activity::record(
            &self.db,
            actor,
            "DELETE_TRANSACTION",
            &format!("Deleted transaction #{} ('{}')", tx.id, tx.label),
            None,
        )
        .await?;

        Ok(())
    }

    /// Flip a transaction pending→settled AND insert a synthetic settled
    /// income receipt of the same amount, inside one database transaction.
    ///
    /// The invoice/receipt dual-write is an accounting pattern inherited
    /// from the original system. It is NOT idempotent: calling this on an
    /// already-settled record inserts another receipt. Callers that need
    /// exactly-once must check status first.
    #[tracing::instrument(name = "transactions.mark_settled", skip(self))]
    pub async fn mark_settled(&self, id: i64, actor: Option<i64>) -> Result<Transaction> {
        let original = self.get(id).await?;
        let now = Utc::now();

        let mut db_tx = self.db.begin().await?;

        sqlx::query("UPDATE transactions SET status = 'settled' WHERE id = ?")
            .bind(id)
            .execute(&mut *db_tx)
            .await?;

        let receipt_id = sqlx::query(
            "INSERT INTO transactions
                (customer_id, customer_name, customer_category, label, amount, direction,
                 status, description, created_by, created_at)
             VALUES (?, ?, ?, ?, ?, 'income', 'settled', ?, ?, ?)",
        )
        .bind(original.customer_id)
        .bind(&original.customer_name)
        .bind(&original.customer_category)
        .bind("payment-receipt")
        .bind(original.amount)
        .bind(format!("Automatic receipt for transaction #{}", original.id))
        .bind(actor)
        .bind(now)
        .execute(&mut *db_tx)
        .await?
        .last_insert_rowid();

        db_tx.commit().await?;

        activity::record(
            &self.db,
            actor,
            "SETTLE_TRANSACTION",
            &format!(
                "Settled transaction #{} and issued receipt #{}",
                original.id, receipt_id
            ),
            None,
        )
        .await?;

        self.get(receipt_id).await
    }

    /// Aggregate totals over the whole ledger.
    pub async fn stats(&self) -> Result<Stats> {
        let stats = sqlx::query_as::<_, Stats>(
            "SELECT
                COALESCE(SUM(CASE WHEN direction = 'income' THEN amount ELSE 0 END), 0) AS income,
                COALESCE(SUM(CASE WHEN direction = 'expense' THEN amount ELSE 0 END), 0) AS expense,
                COALESCE(SUM(CASE WHEN status = 'pending' THEN amount ELSE 0 END), 0) AS pending,
                COALESCE(SUM(CASE WHEN direction = 'income' THEN amount ELSE -amount END), 0) AS balance
             FROM transactions",
        )
        .fetch_one(&self.db)
        .await?;

        Ok(stats)
    }

    /// Per-month income/expense sums for the current calendar year.
    /// Months without activity are omitted.
    pub async fn monthly_breakdown(&self) -> Result<Vec<MonthlyEntry>> {
        let entries = sqlx::query_as::<_, MonthlyEntry>(
            "SELECT
                CAST(strftime('%m', created_at) AS INTEGER) AS month,
                COALESCE(SUM(CASE WHEN direction = 'income' THEN amount ELSE 0 END), 0) AS income,
                COALESCE(SUM(CASE WHEN direction = 'expense' THEN amount ELSE 0 END), 0) AS expense
             FROM transactions
             WHERE strftime('%Y', created_at) = strftime('%Y', 'now')
             GROUP BY month
             ORDER BY month",
        )
        .fetch_all(&self.db)
        .await?;

        Ok(entries)
    }
}
