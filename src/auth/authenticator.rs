//! Resolve a request to a user.
//!
//! Flow Overview: extract credential material for the configured scheme, then
//! resolve it against the store. `resolve` never returns an error; a missing,
//! malformed or wrong credential and a failing store all become
//! [`AuthResult::Unauthenticated`].

use async_trait::async_trait;
use secrecy::ExposeSecret;
use std::{
    fmt,
    str::FromStr,
    sync::{Arc, OnceLock},
};
use tracing::{debug, error};

use super::{
    error::StoreError,
    extract::{CredentialExtractor, RawCredential, RequestCredentials},
    hasher::CredentialHasher,
    store::{Lookup, User, UserStore},
};

/// Why a request was not authenticated. Kept for logs and status mapping only.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reason {
    MissingCredentials,
    MalformedCredentials,
    InvalidCredentials,
    StoreUnavailable,
}

#[derive(Debug)]
pub enum AuthResult {
    Authenticated(User),
    Unauthenticated(Reason),
}

impl AuthResult {
    #[must_use]
    pub fn user(&self) -> Option<&User> {
        match self {
            Self::Authenticated(user) => Some(user),
            Self::Unauthenticated(_) => None,
        }
    }

    #[must_use]
    pub fn into_user(self) -> Option<User> {
        match self {
            Self::Authenticated(user) => Some(user),
            Self::Unauthenticated(_) => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AuthScheme {
    Basic,
    #[default]
    Session,
}

impl FromStr for AuthScheme {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "basic" => Ok(Self::Basic),
            "session" => Ok(Self::Session),
            other => Err(format!("unknown auth scheme: {other}")),
        }
    }
}

impl fmt::Display for AuthScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Basic => f.write_str("basic"),
            Self::Session => f.write_str("session"),
        }
    }
}

#[async_trait]
pub trait Authenticator: Send + Sync {
    fn scheme(&self) -> AuthScheme;

    async fn resolve(&self, request: &(dyn RequestCredentials + Sync)) -> AuthResult;
}

fn store_failure(err: &StoreError) -> AuthResult {
    match err {
        StoreError::NotFound => AuthResult::Unauthenticated(Reason::InvalidCredentials),
        other => {
            error!("Failed to lookup user: {other}");
            AuthResult::Unauthenticated(Reason::StoreUnavailable)
        }
    }
}

const DUMMY_PASSWORD: &str = "authgate-unknown-user";

/// `Authorization: Basic` email/password authentication.
pub struct BasicAuthenticator {
    store: Arc<dyn UserStore>,
    hasher: Arc<dyn CredentialHasher>,
    dummy_hash: OnceLock<Option<String>>,
}

impl BasicAuthenticator {
    #[must_use]
    pub fn new(store: Arc<dyn UserStore>, hasher: Arc<dyn CredentialHasher>) -> Self {
        Self {
            store,
            hasher,
            dummy_hash: OnceLock::new(),
        }
    }

    /// Resolve an email/password pair.
    ///
    /// An unknown email still pays for one password verification, so the
    /// response time does not reveal whether the email is registered.
    pub async fn user_from_credentials(&self, email: &str, password: &str) -> AuthResult {
        let user = match self.store.find_user_by(Lookup::Email(email)).await {
            Ok(user) => user,
            Err(StoreError::NotFound) => {
                self.verify_dummy(password);
                return AuthResult::Unauthenticated(Reason::InvalidCredentials);
            }
            Err(err) => return store_failure(&err),
        };
        if self.hasher.verify(password, &user.hashed_password) {
            AuthResult::Authenticated(user)
        } else {
            debug!(user_id = %user.id, "password mismatch");
            AuthResult::Unauthenticated(Reason::InvalidCredentials)
        }
    }

    fn verify_dummy(&self, password: &str) {
        let dummy = self
            .dummy_hash
            .get_or_init(|| match self.hasher.hash(DUMMY_PASSWORD) {
                Ok(hash) => Some(hash),
                Err(err) => {
                    error!("Failed to compute dummy password hash: {err}");
                    None
                }
            });
        if let Some(dummy) = dummy {
            let _ = self.hasher.verify(password, dummy);
        }
    }
}

#[async_trait]
impl Authenticator for BasicAuthenticator {
    fn scheme(&self) -> AuthScheme {
        AuthScheme::Basic
    }

    async fn resolve(&self, request: &(dyn RequestCredentials + Sync)) -> AuthResult {
        match CredentialExtractor::Basic.extract(request) {
            Ok(RawCredential::Basic(credentials)) => {
                self.user_from_credentials(
                    &credentials.email,
                    credentials.password.expose_secret(),
                )
                .await
            }
            Ok(RawCredential::SessionToken(_)) => {
                AuthResult::Unauthenticated(Reason::MalformedCredentials)
            }
            Err(reason) => AuthResult::Unauthenticated(reason),
        }
    }
}

/// Session-cookie authentication against the stored `session_id`.
pub struct SessionAuthenticator {
    store: Arc<dyn UserStore>,
    extractor: CredentialExtractor,
}

impl SessionAuthenticator {
    #[must_use]
    pub fn new(store: Arc<dyn UserStore>, cookie_name: impl Into<String>) -> Self {
        Self {
            store,
            extractor: CredentialExtractor::SessionCookie {
                cookie_name: cookie_name.into(),
            },
        }
    }
}

#[async_trait]
impl Authenticator for SessionAuthenticator {
    fn scheme(&self) -> AuthScheme {
        AuthScheme::Session
    }

    async fn resolve(&self, request: &(dyn RequestCredentials + Sync)) -> AuthResult {
        let token = match self.extractor.extract(request) {
            Ok(RawCredential::SessionToken(token)) => token,
            Ok(RawCredential::Basic(_)) => {
                return AuthResult::Unauthenticated(Reason::MalformedCredentials)
            }
            Err(reason) => return AuthResult::Unauthenticated(reason),
        };
        match self
            .store
            .find_user_by(Lookup::SessionId(token.expose_secret()))
            .await
        {
            Ok(user) => AuthResult::Authenticated(user),
            Err(err) => store_failure(&err),
        }
    }
}

/// Build the authenticator selected by configuration.
#[must_use]
pub fn authenticator_for(
    scheme: AuthScheme,
    store: Arc<dyn UserStore>,
    hasher: Arc<dyn CredentialHasher>,
    cookie_name: &str,
) -> Arc<dyn Authenticator> {
    match scheme {
        AuthScheme::Basic => Arc::new(BasicAuthenticator::new(store, hasher)),
        AuthScheme::Session => Arc::new(SessionAuthenticator::new(store, cookie_name)),
    }
}
