use std::sync::Arc;
use tracing::{info, warn};

use super::{AuthError, IdentityProvider, Session, TokenStore};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AuthState {
    #[default]
    Unauthenticated,
    Authenticated(Session),
}

/// Current-session state, handed to every protected screen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthContext {
    state: AuthState,
}

impl AuthContext {
    pub fn authenticated(session: Session) -> Self {
        Self {
            state: AuthState::Authenticated(session),
        }
    }

    pub fn state(&self) -> &AuthState {
        &self.state
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.state, AuthState::Authenticated(_))
    }

    pub fn session(&self) -> Option<&Session> {
        match &self.state {
            AuthState::Authenticated(session) => Some(session),
            AuthState::Unauthenticated => None,
        }
    }

    fn set(&mut self, state: AuthState) {
        self.state = state;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Render,
    RedirectToLogin,
}

#[derive(Clone)]
pub struct AuthGate {
    provider: Arc<dyn IdentityProvider>,
    tokens: Arc<dyn TokenStore>,
}

impl AuthGate {
    pub fn new(provider: Arc<dyn IdentityProvider>, tokens: Arc<dyn TokenStore>) -> Self {
        Self { provider, tokens }
    }

    pub fn provider(&self) -> &Arc<dyn IdentityProvider> {
        &self.provider
    }

    /// Unauthenticated -> Authenticated. On failure the context is left as
    /// it was and nothing is persisted.
    pub async fn login(
        &self,
        ctx: &mut AuthContext,
        email: &str,
        password: &str,
    ) -> Result<(), AuthError> {
        let session = self.provider.sign_in(email, password).await?;
        self.tokens.save(&session.token)?;
        ctx.set(AuthState::Authenticated(session));
        Ok(())
    }

    /// Clears the stored token and the context even when the provider
    /// cannot be reached; the provider error is still returned.
    pub async fn logout(&self, ctx: &mut AuthContext) -> Result<(), AuthError> {
        let token = self
            .tokens
            .load()
            .or_else(|| ctx.session().map(|s| s.token.clone()));

        let cleared = self.tokens.clear();
        ctx.set(AuthState::Unauthenticated);

        if let Some(token) = token {
            if let Err(e) = self.provider.sign_out(&token).await {
                warn!(error = %e, "server-side sign-out failed");
                return Err(e);
            }
        }
        cleared?;
        info!("signed out");
        Ok(())
    }

    /// Run before a protected screen renders. Without a stored token that
    /// the provider still recognises, the context drops to Unauthenticated.
    pub async fn evaluate(&self, ctx: &mut AuthContext) -> GateDecision {
        let Some(token) = self.tokens.load() else {
            ctx.set(AuthState::Unauthenticated);
            return GateDecision::RedirectToLogin;
        };

        match self.provider.verify(&token).await {
            Ok(Some(session)) => {
                ctx.set(AuthState::Authenticated(session));
                GateDecision::Render
            }
            Ok(None) => {
                if let Err(e) = self.tokens.clear() {
                    warn!(error = %e, "could not clear stale session token");
                }
                ctx.set(AuthState::Unauthenticated);
                GateDecision::RedirectToLogin
            }
            Err(e) => {
                warn!(error = %e, "session check failed");
                ctx.set(AuthState::Unauthenticated);
                GateDecision::RedirectToLogin
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{MemoryTokenStore, SqlIdentityProvider};
    use crate::database::db::{connection, migrate};

    async fn gate() -> (AuthGate, Arc<MemoryTokenStore>) {
        let pool = connection::in_memory_pool().await.unwrap();
        migrate::run_migrations(&pool).await.unwrap();
        let provider = SqlIdentityProvider::new(pool);
        provider.create_admin("admin@example.com", "pw").await.unwrap();
        let tokens = Arc::new(MemoryTokenStore::default());
        (AuthGate::new(Arc::new(provider), tokens.clone()), tokens)
    }

    #[tokio::test]
    async fn no_token_always_redirects() {
        let (gate, _) = gate().await;
        let mut ctx = AuthContext::default();
        assert_eq!(gate.evaluate(&mut ctx).await, GateDecision::RedirectToLogin);
        assert!(!ctx.is_authenticated());
    }

    #[tokio::test]
    async fn login_persists_token_and_opens_the_gate() {
        let (gate, tokens) = gate().await;
        let mut ctx = AuthContext::default();
        gate.login(&mut ctx, "admin@example.com", "pw").await.unwrap();

        assert!(ctx.is_authenticated());
        assert_eq!(tokens.load(), ctx.session().map(|s| s.token.clone()));

        let mut fresh = AuthContext::default();
        assert_eq!(gate.evaluate(&mut fresh).await, GateDecision::Render);
        assert_eq!(fresh.session().unwrap().email, "admin@example.com");
    }

    #[tokio::test]
    async fn failed_login_stays_unauthenticated() {
        let (gate, tokens) = gate().await;
        let mut ctx = AuthContext::default();
        let err = gate.login(&mut ctx, "admin@example.com", "wrong").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
        assert!(!ctx.is_authenticated());
        assert_eq!(tokens.load(), None);
    }

    #[tokio::test]
    async fn logout_clears_storage_and_server_session() {
        let (gate, tokens) = gate().await;
        let mut ctx = AuthContext::default();
        gate.login(&mut ctx, "admin@example.com", "pw").await.unwrap();
        let token = tokens.load().unwrap();

        gate.logout(&mut ctx).await.unwrap();

        assert!(!ctx.is_authenticated());
        assert_eq!(tokens.load(), None);
        assert_eq!(gate.provider().verify(&token).await.unwrap(), None);
        assert_eq!(gate.evaluate(&mut ctx).await, GateDecision::RedirectToLogin);
    }

    #[tokio::test]
    async fn stale_token_is_dropped() {
        let (gate, tokens) = gate().await;
        tokens.save("not-a-session").unwrap();
        let mut ctx = AuthContext::default();
        assert_eq!(gate.evaluate(&mut ctx).await, GateDecision::RedirectToLogin);
        assert_eq!(tokens.load(), None);
    }
}
