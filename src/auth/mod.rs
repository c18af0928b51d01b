//! Authentication core.
//!
//! Flow Overview: [`PathPolicy`] decides whether a request needs credentials,
//! a [`CredentialExtractor`] pulls them out of headers or cookies, and an
//! [`Authenticator`] resolves them against the [`UserStore`]. Login, logout
//! and password reset go straight to [`SessionManager`] and
//! [`PasswordResetFlow`].
//!
//! Security boundaries: plaintext passwords only reach the
//! [`CredentialHasher`]; tokens are 32 random bytes from the OS RNG; every
//! credential failure collapses into [`AuthResult::Unauthenticated`] so
//! callers cannot tell an unknown email from a wrong password.

pub mod authenticator;
pub mod config;
pub mod error;
pub mod extract;
pub mod gate;
pub mod hasher;
pub mod path_policy;
pub mod reset;
pub mod service;
pub mod session;
pub mod store;
mod token;

pub use authenticator::{
    authenticator_for, AuthResult, AuthScheme, Authenticator, BasicAuthenticator, Reason,
    SessionAuthenticator,
};
pub use config::AuthConfig;
pub use error::{AuthError, StoreError};
pub use extract::{CredentialExtractor, RawCredential, RequestCredentials};
pub use gate::{AuthGate, GateDecision};
pub use hasher::{Argon2Hasher, CredentialHasher};
pub use path_policy::{requires_auth, PathMatch, PathPolicy};
pub use reset::PasswordResetFlow;
pub use service::AuthService;
pub use session::SessionManager;
pub use store::{Lookup, MemoryStore, PgStore, User, UserStore, UserUpdate};
