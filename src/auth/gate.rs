//! Per-request decision: bypass, authenticated user, or denial.

use std::sync::Arc;
use tracing::debug;

use super::{
    authenticator::{AuthResult, Authenticator, Reason},
    extract::RequestCredentials,
    path_policy::PathPolicy,
    store::User,
};

#[derive(Debug)]
pub enum GateDecision {
    /// Path is excluded; no credentials were looked at.
    Bypass,
    Allowed(User),
    Denied(Reason),
}

pub struct AuthGate {
    policy: PathPolicy,
    authenticator: Arc<dyn Authenticator>,
}

impl AuthGate {
    #[must_use]
    pub fn new(policy: PathPolicy, authenticator: Arc<dyn Authenticator>) -> Self {
        Self {
            policy,
            authenticator,
        }
    }

    #[must_use]
    pub fn policy(&self) -> &PathPolicy {
        &self.policy
    }

    #[must_use]
    pub fn authenticator(&self) -> &Arc<dyn Authenticator> {
        &self.authenticator
    }

    pub async fn check(
        &self,
        path: &str,
        request: &(dyn RequestCredentials + Sync),
    ) -> GateDecision {
        if !self.policy.requires_auth(path) {
            return GateDecision::Bypass;
        }
        match self.authenticator.resolve(request).await {
            AuthResult::Authenticated(user) => GateDecision::Allowed(user),
            AuthResult::Unauthenticated(reason) => {
                debug!(path, ?reason, scheme = %self.authenticator.scheme(), "request denied");
                GateDecision::Denied(reason)
            }
        }
    }
}
