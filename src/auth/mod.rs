//! Admin authentication.
//!
//! [`IdentityProvider`] checks credentials and owns server-side sessions.
//! [`TokenStore`] keeps the session token on the client between runs.
//! [`AuthGate`] ties the two together and moves an explicit
//! [`AuthContext`] between its two states; protected screens are handed that
//! context instead of reading any global flag.

pub mod gate;
pub mod provider;
pub mod token_store;

use thiserror::Error;

use crate::database::StoreError;

pub use gate::{AuthContext, AuthGate, AuthState, GateDecision};
pub use provider::{IdentityProvider, Session, SqlIdentityProvider};
pub use token_store::{FileTokenStore, MemoryTokenStore, TokenStore};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("admin `{0}` already exists")]
    AdminExists(String),
    #[error("password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),
    #[error("session storage failed: {0}")]
    TokenStorage(#[from] std::io::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<sqlx::Error> for AuthError {
    fn from(e: sqlx::Error) -> Self {
        AuthError::Store(StoreError::Database(e))
    }
}

impl AuthError {
    /// Wording shown to the person at the login form.
    pub fn localized(&self) -> String {
        match self {
            AuthError::InvalidCredentials => "خطأ في اسم المستخدم أو كلمة المرور".to_string(),
            other => other.to_string(),
        }
    }
}
