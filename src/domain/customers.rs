//! Billable customers (internet/PPPoE and gas-delivery).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::error::{AppError, Result};

use super::activity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Category {
    Internet,
    Gas,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Internet => "internet",
            Category::Gas => "gas",
        }
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Customer {
    pub id: i64,
    pub name: String,
    pub category: Category,
    pub phone: String,
    /// Only meaningful for category=internet, but not enforced
    pub pppoe_username: Option<String>,
    pub pppoe_password: Option<String>,
    pub address: Option<String>,
    pub is_active: bool,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A customer with at least one pending transaction and a positive
/// outstanding sum.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Debtor {
    pub id: i64,
    pub name: String,
    pub category: Category,
    pub phone: String,
    pub pppoe_username: Option<String>,
    pub pppoe_password: Option<String>,
    pub address: Option<String>,
    pub pending_total: i64,
}

#[derive(Debug, Deserialize)]
pub struct NewCustomer {
    pub name: String,
    pub category: Category,
    pub phone: String,
    pub pppoe_username: Option<String>,
    pub pppoe_password: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateCustomer {
    pub name: Option<String>,
    pub category: Option<Category>,
    pub phone: Option<String>,
    pub pppoe_username: Option<Option<String>>,
    pub pppoe_password: Option<Option<String>>,
    pub address: Option<Option<String>>,
    pub is_active: Option<bool>,
}

/// Optional list filters, AND-combined; an omitted filter is no constraint.
#[derive(Debug, Default, Deserialize)]
pub struct CustomerFilter {
    pub category: Option<Category>,
    pub is_active: Option<bool>,
    pub search: Option<String>,
}

const CUSTOMER_COLUMNS: &str = "id, name, category, phone, pppoe_username, pppoe_password, \
     address, is_active, created_by, created_at, updated_at";

#[derive(Clone)]
pub struct CustomerStore {
    db: SqlitePool,
}

impl CustomerStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    pub async fn list(&self, filter: CustomerFilter) -> Result<Vec<Customer>> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {} FROM customers WHERE 1=1",
            CUSTOMER_COLUMNS
        ));

        if let Some(category) = filter.category {
            qb.push(" AND category = ").push_bind(category);
        }
        if let Some(is_active) = filter.is_active {
            qb.push(" AND is_active = ").push_bind(is_active);
        }
        if let Some(search) = filter.search.filter(|s| !s.is_empty()) {
            let pattern = format!("%{}%", search);
            qb.push(" AND (name LIKE ")
                .push_bind(pattern.clone())
                .push(" OR phone LIKE ")
                .push_bind(pattern)
                .push(")");
        }
        qb.push(" ORDER BY name");

        let customers = qb.build_query_as::<Customer>().fetch_all(&self.db).await?;
        Ok(customers)
    }

    pub async fn get(&self, id: i64) -> Result<Customer> {
        sqlx::query_as::<_, Customer>(&format!(
            "SELECT {} FROM customers WHERE id = ?",
            CUSTOMER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("customer {} not found", id)))
    }

    #[tracing::instrument(name = "customers.create", skip(self, new), fields(name = %new.name))]
    pub async fn create(&self, new: NewCustomer, actor: Option<i64>) -> Result<Customer> {
        if new.name.trim().is_empty() {
            return Err(AppError::Validation("customer name is required".to_string()));
        }
        if new.phone.trim().is_empty() {
            return Err(AppError::Validation("phone number is required".to_string()));
        }

        let now = Utc::now();
        let id = sqlx::query(
            "INSERT INTO customers
                (name, category, phone, pppoe_username, pppoe_password, address, is_active,
                 created_by, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, 1, ?, ?, ?)",
        )
        .bind(&new.name)
        .bind(new.category)
        .bind(&new.phone)
        .bind(&new.pppoe_username)
        .bind(&new.pppoe_password)
        .bind(&new.address)
        .bind(actor)
        .bind(now)
        .bind(now)
        .execute(&self.db)
        .await?
        .last_insert_rowid();

        activity::record(
            &self.db,
            actor,
            "CREATE_CUSTOMER",
            &format!("Created customer '{}'", new.name),
            None,
        )
        .await?;

        self.get(id).await
    }

    #[tracing::instrument(name = "customers.update", skip(self, updates))]
    pub async fn update(
        &self,
        id: i64,
        updates: UpdateCustomer,
        actor: Option<i64>,
    ) -> Result<Customer> {
        let mut customer = self.get(id).await?;

        if let Some(name) = updates.name {
            customer.name = name;
        }
        if let Some(category) = updates.category {
            customer.category = category;
        }
        if let Some(phone) = updates.phone {
            customer.phone = phone;
        }
        if let Some(pppoe_username) = updates.pppoe_username {
            customer.pppoe_username = pppoe_username;
        }
        if let Some(pppoe_password) = updates.pppoe_password {
            customer.pppoe_password = pppoe_password;
        }
        if let Some(address) = updates.address {
            customer.address = address;
        }
        if let Some(is_active) = updates.is_active {
            customer.is_active = is_active;
        }

        sqlx::query(
            "UPDATE customers SET name = ?, category = ?, phone = ?, pppoe_username = ?,
                 pppoe_password = ?, address = ?, is_active = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(&customer.name)
        .bind(customer.category)
        .bind(&customer.phone)
        .bind(&customer.pppoe_username)
        .bind(&customer.pppoe_password)
        .bind(&customer.address)
        .bind(customer.is_active)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.db)
        .await?;

        activity::record(
            &self.db,
            actor,
            "UPDATE_CUSTOMER",
            &format!("Updated customer '{}'", customer.name),
            None,
        )
        .await?;

        self.get(id).await
    }

    /// Hard delete. Dependent transactions keep their denormalized snapshot
    /// and get a NULL customer reference (ON DELETE SET NULL).
    #[tracing::instrument(name = "customers.delete", skip(self))]
    pub async fn delete(&self, id: i64, actor: Option<i64>) -> Result<()> {
        let customer = self.get(id).await?;

        sqlx::query("DELETE FROM customers WHERE id = ?")
            .bind(id)
            .execute(&self.db)
            .await?;

        activity::record(
            &self.db,
            actor,
            "DELETE_CUSTOMER",
            &format!("Deleted customer '{}'", customer.name),
            None,
        )
        .await?;

        Ok(())
    }

    /// Active customers annotated with their positive pending-transaction sum.
    pub async fn with_outstanding_balance(&self) -> Result<Vec<Debtor>> {
        let debtors = sqlx::query_as::<_, Debtor>(
            "SELECT c.id, c.name, c.category, c.phone, c.pppoe_username, c.pppoe_password,
                    c.address, SUM(t.amount) AS pending_total
             FROM customers c
             JOIN transactions t ON t.customer_id = c.id AND t.status = 'pending'
             WHERE c.is_active = 1
             GROUP BY c.id
             HAVING SUM(t.amount) > 0
             ORDER BY pending_total DESC",
        )
        .fetch_all(&self.db)
        .await?;

        Ok(debtors)
    }
}
