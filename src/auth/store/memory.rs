//! In-process store, used when no database is configured and in tests.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::{debug, instrument};
use uuid::Uuid;

use super::{Lookup, User, UserStore, UserUpdate};
use crate::auth::error::StoreError;

#[derive(Default)]
struct Inner {
    users: HashMap<Uuid, User>,
    by_email: HashMap<String, Uuid>,
    by_session: HashMap<String, Uuid>,
    by_reset: HashMap<String, Uuid>,
}

impl Inner {
    fn index(&self, lookup: Lookup<'_>) -> &HashMap<String, Uuid> {
        match lookup {
            Lookup::Email(_) => &self.by_email,
            Lookup::SessionId(_) => &self.by_session,
            Lookup::ResetToken(_) => &self.by_reset,
        }
    }

    fn resolve(&self, lookup: Lookup<'_>) -> Result<Uuid, StoreError> {
        let id = *self
            .index(lookup)
            .get(lookup.value())
            .ok_or(StoreError::NotFound)?;
        // The secondary index and the record must agree.
        match self.users.get(&id) {
            Some(user) if lookup.matches(user) => Ok(id),
            _ => Err(StoreError::Integrity(format!(
                "{} index points at a stale record",
                lookup.column()
            ))),
        }
    }

    /// Reject a write that would hand a live token to a second user.
    fn check_conflicts(&self, id: Uuid, update: &UserUpdate) -> Result<(), StoreError> {
        let taken = |index: &HashMap<String, Uuid>, value: &Option<Option<String>>| {
            value
                .as_ref()
                .and_then(Option::as_ref)
                .and_then(|token| index.get(token))
                .is_some_and(|owner| *owner != id)
        };
        if taken(&self.by_session, &update.session_id) {
            return Err(StoreError::TokenConflict {
                field: "session_id",
            });
        }
        if taken(&self.by_reset, &update.reset_token) {
            return Err(StoreError::TokenConflict {
                field: "reset_token",
            });
        }
        Ok(())
    }

    fn apply(&mut self, id: Uuid, update: UserUpdate) -> Result<User, StoreError> {
        self.check_conflicts(id, &update)?;
        let user = self.users.get_mut(&id).ok_or(StoreError::NotFound)?;
        let previous_session = user.session_id.clone();
        let previous_reset = user.reset_token.clone();
        update.apply(user);
        let user = user.clone();

        reindex(&mut self.by_session, id, previous_session, user.session_id.clone());
        reindex(&mut self.by_reset, id, previous_reset, user.reset_token.clone());

        Ok(user)
    }
}

fn reindex(
    index: &mut HashMap<String, Uuid>,
    id: Uuid,
    previous: Option<String>,
    current: Option<String>,
) {
    if previous == current {
        return;
    }
    if let Some(previous) = previous {
        index.remove(&previous);
    }
    if let Some(current) = current {
        index.insert(current, id);
    }
}

/// Hash-map backed [`UserStore`]; a single lock serializes every operation.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.users.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    #[instrument(skip(self, hashed_password))]
    async fn add_user(&self, email: &str, hashed_password: &str) -> Result<User, StoreError> {
        let mut inner = self.inner.lock().await;
        if inner.by_email.contains_key(email) {
            return Err(StoreError::DuplicateEmail);
        }
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            hashed_password: hashed_password.to_string(),
            session_id: None,
            reset_token: None,
        };
        inner.by_email.insert(user.email.clone(), user.id);
        inner.users.insert(user.id, user.clone());
        debug!(user_id = %user.id, "user added");
        Ok(user)
    }

    #[instrument(skip(self, lookup), fields(by = lookup.column()))]
    async fn find_user_by(&self, lookup: Lookup<'_>) -> Result<User, StoreError> {
        let inner = self.inner.lock().await;
        let id = inner.resolve(lookup)?;
        inner.users.get(&id).cloned().ok_or(StoreError::NotFound)
    }

    #[instrument(skip(self, update))]
    async fn update_user(&self, id: Uuid, update: UserUpdate) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        inner.apply(id, update).map(|_| ())
    }

    #[instrument(skip(self, lookup, update), fields(by = lookup.column()))]
    async fn update_user_by(
        &self,
        lookup: Lookup<'_>,
        update: UserUpdate,
    ) -> Result<User, StoreError> {
        let mut inner = self.inner.lock().await;
        let id = inner.resolve(lookup)?;
        inner.apply(id, update)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
