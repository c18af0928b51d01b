//! Single-use password reset tokens.

use std::sync::Arc;
use tracing::{info, instrument};

use super::{
    error::{AuthError, StoreError},
    hasher::CredentialHasher,
    store::{Lookup, UserStore, UserUpdate},
    token::store_unique_token,
};

pub struct PasswordResetFlow {
    store: Arc<dyn UserStore>,
    hasher: Arc<dyn CredentialHasher>,
}

impl PasswordResetFlow {
    #[must_use]
    pub fn new(store: Arc<dyn UserStore>, hasher: Arc<dyn CredentialHasher>) -> Self {
        Self { store, hasher }
    }

    /// Issue a reset token for `email`, replacing any outstanding one.
    ///
    /// # Errors
    /// Returns [`AuthError::UserNotFound`] for an unknown email.
    #[instrument(skip(self))]
    pub async fn issue_token(&self, email: &str) -> Result<String, AuthError> {
        let user = self
            .store
            .find_user_by(Lookup::Email(email))
            .await
            .map_err(not_found_as_user)?;
        let token = store_unique_token(|token| {
            self.store
                .update_user(user.id, UserUpdate::new().reset_token(Some(token)))
        })
        .await?;
        info!(user_id = %user.id, "reset token issued");
        Ok(token)
    }

    /// Rotate the password of the user holding `token` and burn the token.
    ///
    /// The match and the write are one store call, so two concurrent
    /// consumers cannot both succeed.
    ///
    /// # Errors
    /// Returns [`AuthError::UserNotFound`] if no user holds `token`.
    #[instrument(skip_all)]
    pub async fn consume_token(&self, token: &str, new_password: &str) -> Result<(), AuthError> {
        if token.is_empty() {
            return Err(AuthError::UserNotFound);
        }
        let hashed_password = self.hasher.hash(new_password)?;
        let user = self
            .store
            .update_user_by(
                Lookup::ResetToken(token),
                UserUpdate::new()
                    .hashed_password(hashed_password)
                    .reset_token(None),
            )
            .await
            .map_err(not_found_as_user)?;
        info!(user_id = %user.id, "password updated");
        Ok(())
    }
}

fn not_found_as_user(err: StoreError) -> AuthError {
    match err {
        StoreError::NotFound => AuthError::UserNotFound,
        other => other.into(),
    }
}
