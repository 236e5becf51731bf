//! User accounts and role-gated management operations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::auth::password;
use crate::error::{AppError, Result};

use super::activity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Staff,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    /// bcrypt hash, never serialized into responses
    #[serde(skip_serializing)]
    pub password: String,
    pub name: String,
    pub role: Role,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub name: String,
    pub role: Role,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateUser {
    pub username: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

#[derive(Clone)]
pub struct UserStore {
    db: SqlitePool,
}

impl UserStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    pub async fn list(&self) -> Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            "SELECT id, username, password, name, role, is_active, created_at, updated_at
             FROM users ORDER BY id",
        )
        .fetch_all(&self.db)
        .await?;
        Ok(users)
    }

    pub async fn get(&self, id: i64) -> Result<User> {
        sqlx::query_as::<_, User>(
            "SELECT id, username, password, name, role, is_active, created_at, updated_at
             FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("user {} not found", id)))
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, password, name, role, is_active, created_at, updated_at
             FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    #[tracing::instrument(name = "users.create", skip(self, new_user), fields(username = %new_user.username))]
    pub async fn create(&self, new_user: NewUser, actor: Option<i64>) -> Result<User> {
        if new_user.username.trim().is_empty() || new_user.password.is_empty() {
            return Err(AppError::Validation(
                "username and password are required".to_string(),
            ));
        }

        if self.find_by_username(&new_user.username).await?.is_some() {
            return Err(AppError::Conflict(format!(
                "username '{}' is already taken",
                new_user.username
            )));
        }

        let hashed = password::hash(&new_user.password)?;
        let now = Utc::now();
        let id = sqlx::query(
            "INSERT INTO users (username, password, name, role, is_active, created_at, updated_at)
             VALUES (?, ?, ?, ?, 1, ?, ?)",
        )
        .bind(&new_user.username)
        .bind(&hashed)
        .bind(&new_user.name)
        .bind(new_user.role)
        .bind(now)
        .bind(now)
        .execute(&self.db)
        .await?
        .last_insert_rowid();

        activity::record(
            &self.db,
            actor,
            "CREATE_USER",
            &format!("Created user '{}'", new_user.username),
            None,
        )
        .await?;

        self.get(id).await
    }

    #[tracing::instrument(name = "users.update", skip(self, updates))]
    pub async fn update(&self, id: i64, updates: UpdateUser, actor: Option<i64>) -> Result<User> {
        let mut user = self.get(id).await?;

        if let Some(username) = updates.username {
            if username != user.username {
                if self.find_by_username(&username).await?.is_some() {
                    return Err(AppError::Conflict(format!(
                        "username '{}' is already taken",
                        username
                    )));
                }
                user.username = username;
            }
        }
        if let Some(name) = updates.name {
            user.name = name;
        }
        if let Some(role) = updates.role {
            user.role = role;
        }
        if let Some(is_active) = updates.is_active {
            user.is_active = is_active;
        }
        if let Some(plain) = updates.password {
            if !plain.is_empty() {
                user.password = password::hash(&plain)?;
            }
        }

        sqlx::query(
            "UPDATE users SET username = ?, password = ?, name = ?, role = ?, is_active = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(&user.username)
        .bind(&user.password)
        .bind(&user.name)
        .bind(user.role)
        .bind(user.is_active)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.db)
        .await?;

        activity::record(
            &self.db,
            actor,
            "UPDATE_USER",
            &format!("Updated user '{}'", user.username),
            None,
        )
        .await?;

        self.get(id).await
    }

    /// Delete a user account. Self-deletion is rejected.
    #[tracing::instrument(name = "users.delete", skip(self))]
    pub async fn delete(&self, id: i64, actor: i64) -> Result<()> {
        if id == actor {
            return Err(AppError::Validation(
                "cannot delete your own account".to_string(),
            ));
        }

        let user = self.get(id).await?;
        sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.db)
            .await?;

        activity::record(
            &self.db,
            Some(actor),
            "DELETE_USER",
            &format!("Deleted user '{}'", user.username),
            None,
        )
        .await?;

        Ok(())
    }
}
