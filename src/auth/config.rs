use super::{
    authenticator::AuthScheme, extract::DEFAULT_SESSION_COOKIE_NAME, path_policy::PathMatch,
};

pub const DEFAULT_EXCLUDED_PATHS: [&str; 5] =
    ["/", "/health/", "/users/", "/sessions/", "/reset_password/"];

#[derive(Clone, Debug)]
pub struct AuthConfig {
    scheme: AuthScheme,
    excluded_paths: Vec<String>,
    path_match: PathMatch,
    session_cookie_name: String,
}

impl AuthConfig {
    #[must_use]
    pub fn new(scheme: AuthScheme) -> Self {
        Self {
            scheme,
            excluded_paths: DEFAULT_EXCLUDED_PATHS
                .iter()
                .map(ToString::to_string)
                .collect(),
            path_match: PathMatch::default(),
            session_cookie_name: DEFAULT_SESSION_COOKIE_NAME.to_string(),
        }
    }

    #[must_use]
    pub fn with_excluded_paths(mut self, paths: Vec<String>) -> Self {
        self.excluded_paths = paths;
        self
    }

    #[must_use]
    pub fn with_path_match(mut self, mode: PathMatch) -> Self {
        self.path_match = mode;
        self
    }

    #[must_use]
    pub fn with_session_cookie_name(mut self, name: String) -> Self {
        self.session_cookie_name = name;
        self
    }

    #[must_use]
    pub fn scheme(&self) -> AuthScheme {
        self.scheme
    }

    #[must_use]
    pub fn excluded_paths(&self) -> &[String] {
        &self.excluded_paths
    }

    #[must_use]
    pub fn path_match(&self) -> PathMatch {
        self.path_match
    }

    #[must_use]
    pub fn session_cookie_name(&self) -> &str {
        &self.session_cookie_name
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self::new(AuthScheme::default())
    }
}
