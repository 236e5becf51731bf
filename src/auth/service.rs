use sqlx::SqlitePool;

use crate::config::JwtConfig;
use crate::domain::activity;
use crate::domain::users::UserStore;
use crate::error::{AppError, Result};

use super::{password, JwtService, Principal};

/// Verifies credentials, issues bearer tokens and resolves them back to a
/// live principal.
pub struct SessionService {
    db: SqlitePool,
    users: UserStore,
    jwt: JwtService,
}

impl SessionService {
    pub fn new(db: SqlitePool, config: &JwtConfig) -> Self {
        Self {
            users: UserStore::new(db.clone()),
            jwt: JwtService::new(config),
            db,
        }
    }

    /// Verify a handle/secret pair and issue a session token.
    ///
    /// Unknown handle and wrong secret are indistinguishable to the caller.
    /// A deactivated account is rejected even with correct credentials.
    #[tracing::instrument(name = "auth.authenticate", skip(self, secret))]
    pub async fn authenticate(
        &self,
        handle: &str,
        secret: &str,
        ip: Option<&str>,
    ) -> Result<(String, Principal)> {
        let user = self
            .users
            .find_by_username(handle)
            .await?
            .filter(|u| password::verify(secret, &u.password))
            .ok_or_else(|| AppError::Auth("invalid username or password".to_string()))?;

        if !user.is_active {
            return Err(AppError::Auth("account is disabled".to_string()));
        }

        let token = self.jwt.issue(&user)?;

        activity::record(
            &self.db,
            Some(user.id),
            "LOGIN",
            &format!("User '{}' logged in", user.username),
            ip,
        )
        .await?;

        tracing::info!(user_id = user.id, username = %user.username, "Login successful");

        Ok((
            token,
            Principal {
                id: user.id,
                username: user.username,
                name: user.name,
                role: user.role,
            },
        ))
    }

    /// Resolve a bearer token to a principal.
    ///
    /// The user row is re-read on every call so deactivation revokes
    /// outstanding tokens before they expire; the embedded role is never
    /// trusted. Side-effect free.
    pub async fn validate(&self, token: &str) -> Result<Principal> {
        let claims = self.jwt.decode(token)?;

        let user = self
            .users
            .find_by_username(&claims.username)
            .await?
            .filter(|u| u.id == claims.sub)
            .ok_or_else(|| AppError::Auth("account no longer exists".to_string()))?;

        if !user.is_active {
            return Err(AppError::Auth("account is disabled".to_string()));
        }

        Ok(Principal {
            id: user.id,
            username: user.username,
            name: user.name,
            role: user.role,
        })
    }
}
