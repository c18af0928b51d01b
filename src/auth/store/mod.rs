//! Durable user records behind an engine-agnostic contract.
//!
//! Backends must enforce uniqueness of `email`, and of `session_id` and
//! `reset_token` whenever they are set, and must apply every write to a single
//! user as one atomic step.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use std::fmt;
use uuid::Uuid;

use super::error::StoreError;

#[derive(Clone, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub hashed_password: String,
    pub session_id: Option<String>,
    pub reset_token: Option<String>,
}

// Hashes and tokens stay out of logs.
impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |value: &Option<String>| value.as_ref().map(|_| "[REDACTED]");
        f.debug_struct("User")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("hashed_password", &"[REDACTED]")
            .field("session_id", &redact(&self.session_id))
            .field("reset_token", &redact(&self.reset_token))
            .finish()
    }
}

/// Single-field equality predicate.
#[derive(Clone, Copy, Debug)]
pub enum Lookup<'a> {
    Email(&'a str),
    SessionId(&'a str),
    ResetToken(&'a str),
}

impl Lookup<'_> {
    #[must_use]
    pub fn column(&self) -> &'static str {
        match self {
            Self::Email(_) => "email",
            Self::SessionId(_) => "session_id",
            Self::ResetToken(_) => "reset_token",
        }
    }

    #[must_use]
    pub fn value(&self) -> &str {
        match self {
            Self::Email(value) | Self::SessionId(value) | Self::ResetToken(value) => value,
        }
    }

    pub(crate) fn matches(&self, user: &User) -> bool {
        match self {
            Self::Email(email) => user.email == *email,
            Self::SessionId(token) => user.session_id.as_deref() == Some(*token),
            Self::ResetToken(token) => user.reset_token.as_deref() == Some(*token),
        }
    }
}

/// Partial update. `None` leaves a field untouched; for the token fields
/// `Some(None)` clears the value.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UserUpdate {
    pub hashed_password: Option<String>,
    pub session_id: Option<Option<String>>,
    pub reset_token: Option<Option<String>>,
}

impl UserUpdate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn hashed_password(mut self, hash: String) -> Self {
        self.hashed_password = Some(hash);
        self
    }

    #[must_use]
    pub fn session_id(mut self, session_id: Option<String>) -> Self {
        self.session_id = Some(session_id);
        self
    }

    #[must_use]
    pub fn reset_token(mut self, reset_token: Option<String>) -> Self {
        self.reset_token = Some(reset_token);
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hashed_password.is_none() && self.session_id.is_none() && self.reset_token.is_none()
    }

    pub(crate) fn apply(self, user: &mut User) {
        if let Some(hash) = self.hashed_password {
            user.hashed_password = hash;
        }
        if let Some(session_id) = self.session_id {
            user.session_id = session_id;
        }
        if let Some(reset_token) = self.reset_token {
            user.reset_token = reset_token;
        }
    }
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Create a user with no session and no reset token.
    async fn add_user(&self, email: &str, hashed_password: &str) -> Result<User, StoreError>;

    /// Fetch the single user matching `lookup`.
    async fn find_user_by(&self, lookup: Lookup<'_>) -> Result<User, StoreError>;

    /// Apply a partial update to the user with `id`.
    async fn update_user(&self, id: Uuid, update: UserUpdate) -> Result<(), StoreError>;

    /// Match and update in one atomic step, returning the updated user.
    ///
    /// Used where a concurrent caller must observe `NotFound` once the first
    /// one has changed the matched field, e.g. consuming a reset token.
    async fn update_user_by(
        &self,
        lookup: Lookup<'_>,
        update: UserUpdate,
    ) -> Result<User, StoreError>;

    /// Cheap liveness probe for health reporting.
    async fn ping(&self) -> Result<(), StoreError>;
}
