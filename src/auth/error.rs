use thiserror::Error;

use super::hasher::HashError;

/// Failures raised by a [`UserStore`](super::store::UserStore) backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("user not found")]
    NotFound,
    #[error("email already registered")]
    DuplicateEmail,
    #[error("{field} already assigned to another user")]
    TokenConflict { field: &'static str },
    #[error("store integrity violation: {0}")]
    Integrity(String),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Failures surfaced by the session, reset and registration flows.
///
/// Bad credentials are never an error here, they resolve to
/// [`AuthResult::Unauthenticated`](super::AuthResult::Unauthenticated).
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("user not found")]
    UserNotFound,
    #[error("email already registered")]
    DuplicateEmail,
    #[error(transparent)]
    Hash(#[from] HashError),
    #[error("failed to generate token")]
    Token(#[source] rand::Error),
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateEmail => Self::DuplicateEmail,
            other => Self::Store(other),
        }
    }
}
