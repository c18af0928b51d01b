use std::sync::Arc;
use tracing::{info, instrument};

use super::{
    authenticator::{authenticator_for, AuthResult, BasicAuthenticator},
    config::AuthConfig,
    error::{AuthError, StoreError},
    gate::AuthGate,
    hasher::CredentialHasher,
    path_policy::PathPolicy,
    reset::PasswordResetFlow,
    session::SessionManager,
    store::{Lookup, User, UserStore},
};

/// Everything the route layer needs, built once at startup and shared.
pub struct AuthService {
    config: AuthConfig,
    store: Arc<dyn UserStore>,
    hasher: Arc<dyn CredentialHasher>,
    credentials: BasicAuthenticator,
    sessions: SessionManager,
    resets: PasswordResetFlow,
    gate: AuthGate,
}

impl AuthService {
    #[must_use]
    pub fn new(
        config: AuthConfig,
        store: Arc<dyn UserStore>,
        hasher: Arc<dyn CredentialHasher>,
    ) -> Self {
        let authenticator = authenticator_for(
            config.scheme(),
            Arc::clone(&store),
            Arc::clone(&hasher),
            config.session_cookie_name(),
        );
        let policy = PathPolicy::new(config.excluded_paths(), config.path_match());
        Self {
            credentials: BasicAuthenticator::new(Arc::clone(&store), Arc::clone(&hasher)),
            sessions: SessionManager::new(Arc::clone(&store)),
            resets: PasswordResetFlow::new(Arc::clone(&store), Arc::clone(&hasher)),
            gate: AuthGate::new(policy, authenticator),
            config,
            store,
            hasher,
        }
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn UserStore> {
        &self.store
    }

    #[must_use]
    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    #[must_use]
    pub fn resets(&self) -> &PasswordResetFlow {
        &self.resets
    }

    #[must_use]
    pub fn gate(&self) -> &AuthGate {
        &self.gate
    }

    /// Hash `password` and store a new user.
    ///
    /// # Errors
    /// Returns [`AuthError::DuplicateEmail`] if the email is taken.
    #[instrument(skip(self, password))]
    pub async fn register_user(&self, email: &str, password: &str) -> Result<User, AuthError> {
        // Skip the hashing cost for an obvious duplicate; the store still
        // rejects a racing insert.
        match self.store.find_user_by(Lookup::Email(email)).await {
            Ok(_) => return Err(AuthError::DuplicateEmail),
            Err(StoreError::NotFound) => {}
            Err(err) => return Err(err.into()),
        }
        let hashed_password = self.hasher.hash(password)?;
        let user = self.store.add_user(email, &hashed_password).await?;
        info!(user_id = %user.id, "user registered");
        Ok(user)
    }

    /// Check an email/password pair without starting a session.
    #[instrument(skip(self, password))]
    pub async fn valid_login(&self, email: &str, password: &str) -> bool {
        matches!(
            self.credentials.user_from_credentials(email, password).await,
            AuthResult::Authenticated(_)
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::auth::{
        authenticator::AuthScheme, hasher::tests::fast_hasher, store::MemoryStore,
    };

    fn service() -> AuthService {
        AuthService::new(
            AuthConfig::new(AuthScheme::Basic),
            Arc::new(MemoryStore::new()),
            Arc::new(fast_hasher()),
        )
    }

    #[tokio::test]
    async fn register_stores_a_hash() {
        let service = service();
        let user = service.register_user("a@x.com", "pw").await.unwrap();
        assert_ne!(user.hashed_password, "pw");
        assert!(user.session_id.is_none());
        assert!(user.reset_token.is_none());
    }

    #[tokio::test]
    async fn register_rejects_duplicate_email() {
        let service = service();
        service.register_user("a@x.com", "pw").await.unwrap();
        assert!(matches!(
            service.register_user("a@x.com", "other").await,
            Err(AuthError::DuplicateEmail)
        ));
    }

    #[tokio::test]
    async fn valid_login_checks_password() {
        let service = service();
        service.register_user("a@x.com", "pw").await.unwrap();
        assert!(service.valid_login("a@x.com", "pw").await);
        assert!(!service.valid_login("a@x.com", "PW").await);
        assert!(!service.valid_login("b@x.com", "pw").await);
    }

    #[tokio::test]
    async fn gate_uses_configured_scheme() {
        let service = service();
        assert_eq!(
            service.gate().authenticator().scheme(),
            AuthScheme::Basic
        );
        assert!(!service.gate().policy().requires_auth("/users"));
        assert!(service.gate().policy().requires_auth("/profile"));
    }
}
