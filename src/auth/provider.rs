use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::{Pool, Row, Sqlite};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::AuthError;

/// Sessions older than this are refused by `verify` and swept on sign-in.
pub const SESSION_MAX_AGE_DAYS: u32 = 30;

#[cfg(not(test))]
const HASH_COST: u32 = bcrypt::DEFAULT_COST;
#[cfg(test)]
const HASH_COST: u32 = 4;

const SQL_TIMESTAMP: &str = "%Y-%m-%dT%H:%M:%SZ";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub email: String,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Password sign-in. `InvalidCredentials` for any unknown email or
    /// wrong password.
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError>;

    /// Invalidates the server-side session. Unknown tokens are not an error.
    async fn sign_out(&self, token: &str) -> Result<(), AuthError>;

    async fn verify(&self, token: &str) -> Result<Option<Session>, AuthError>;
}

/// Identity provider over the `admins` and `sessions` tables.
#[derive(Clone)]
pub struct SqlIdentityProvider {
    pool: Pool<Sqlite>,
}

impl SqlIdentityProvider {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    pub async fn create_admin(&self, email: &str, password: &str) -> Result<(), AuthError> {
        let email = normalize_email(email);
        let exists: Option<String> = sqlx::query_scalar("SELECT email FROM admins WHERE email = ?")
            .bind(&email)
            .fetch_optional(&self.pool)
            .await?;
        if exists.is_some() {
            return Err(AuthError::AdminExists(email));
        }

        let hash = bcrypt::hash(password, HASH_COST)?;
        sqlx::query("INSERT INTO admins (email, password_hash) VALUES (?, ?)")
            .bind(&email)
            .bind(hash)
            .execute(&self.pool)
            .await?;

        info!(%email, "admin created");
        Ok(())
    }

    /// Deletes sessions past [`SESSION_MAX_AGE_DAYS`]. Returns how many went.
    pub async fn prune_expired_sessions(&self) -> Result<u64, AuthError> {
        let pruned = sqlx::query("DELETE FROM sessions WHERE created_at < strftime(?, 'now', ?)")
            .bind(SQL_TIMESTAMP)
            .bind(max_age_modifier())
            .execute(&self.pool)
            .await?
            .rows_affected();
        if pruned > 0 {
            debug!(pruned, "expired sessions removed");
        }
        Ok(pruned)
    }
}

#[async_trait]
impl IdentityProvider for SqlIdentityProvider {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let email = normalize_email(email);
        let row = sqlx::query("SELECT password_hash FROM admins WHERE email = ?")
            .bind(&email)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            warn!(%email, "sign-in for unknown admin");
            return Err(AuthError::InvalidCredentials);
        };
        let expected: String = row.try_get("password_hash")?;
        if !bcrypt::verify(password, &expected)? {
            warn!(%email, "sign-in with wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        self.prune_expired_sessions().await?;
        let token = new_token();
        sqlx::query("INSERT INTO sessions (token, admin_email) VALUES (?, ?)")
            .bind(&token)
            .bind(&email)
            .execute(&self.pool)
            .await?;

        info!(%email, "admin signed in");
        Ok(Session { token, email })
    }

    async fn sign_out(&self, token: &str) -> Result<(), AuthError> {
        sqlx::query("DELETE FROM sessions WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn verify(&self, token: &str) -> Result<Option<Session>, AuthError> {
        let email: Option<String> =
            sqlx::query_scalar(
                "SELECT admin_email FROM sessions WHERE token = ? AND created_at >= strftime(?, 'now', ?)",
            )
            .bind(token)
            .bind(SQL_TIMESTAMP)
            .bind(max_age_modifier())
            .fetch_optional(&self.pool)
            .await?;
        Ok(email.map(|email| Session {
            token: token.to_string(),
            email,
        }))
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn max_age_modifier() -> String {
    format!("-{SESSION_MAX_AGE_DAYS} days")
}

fn new_token() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}
