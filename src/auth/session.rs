//! Server-side session lifecycle.
//!
//! One live session per user: creating a session overwrites the previous
//! token, so the old cookie stops resolving immediately.

use std::sync::Arc;
use tracing::{debug, instrument};
use uuid::Uuid;

use super::{
    error::{AuthError, StoreError},
    store::{Lookup, User, UserStore, UserUpdate},
    token::store_unique_token,
};

pub struct SessionManager {
    store: Arc<dyn UserStore>,
}

impl SessionManager {
    #[must_use]
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }

    /// Start a session for `email` and return its token.
    ///
    /// Returns `Ok(None)` for an unknown email.
    ///
    /// # Errors
    /// Returns an error if token generation or the store write fails.
    #[instrument(skip(self))]
    pub async fn create_session(&self, email: &str) -> Result<Option<String>, AuthError> {
        let user = match self.store.find_user_by(Lookup::Email(email)).await {
            Ok(user) => user,
            Err(StoreError::NotFound) => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        let token = store_unique_token(|token| {
            self.store
                .update_user(user.id, UserUpdate::new().session_id(Some(token)))
        })
        .await?;
        debug!(user_id = %user.id, "session created");
        Ok(Some(token))
    }

    /// Clear the session of `user_id`. Clearing an empty session is a no-op.
    ///
    /// # Errors
    /// Returns an error if the user does not exist or the store write fails.
    #[instrument(skip(self))]
    pub async fn destroy_session(&self, user_id: Uuid) -> Result<(), AuthError> {
        self.store
            .update_user(user_id, UserUpdate::new().session_id(None))
            .await?;
        debug!(%user_id, "session destroyed");
        Ok(())
    }

    /// Resolve a session token to its user.
    ///
    /// # Errors
    /// Returns an error only if the store fails; unknown tokens yield `Ok(None)`.
    #[instrument(skip_all)]
    pub async fn get_user_from_session(
        &self,
        token: Option<&str>,
    ) -> Result<Option<User>, AuthError> {
        let Some(token) = token.filter(|token| !token.is_empty()) else {
            return Ok(None);
        };
        match self.store.find_user_by(Lookup::SessionId(token)).await {
            Ok(user) => Ok(Some(user)),
            Err(StoreError::NotFound) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}
