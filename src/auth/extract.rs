//! Pull raw credential material out of a request.
//!
//! Every step returns `Option` and nothing here fails loudly: malformed input
//! is the caller's signal to treat the request as unauthenticated.

use axum::http::{header, HeaderMap};
use base64ct::{Base64, Encoding};
use secrecy::SecretString;

use super::authenticator::Reason;

pub const DEFAULT_SESSION_COOKIE_NAME: &str = "_my_session_id";

const BASIC_PREFIX: &str = "Basic ";

/// Header and cookie lookup on an incoming request.
pub trait RequestCredentials {
    fn header(&self, name: &str) -> Option<&str>;
    fn cookie(&self, name: &str) -> Option<String>;
}

impl RequestCredentials for HeaderMap {
    fn header(&self, name: &str) -> Option<&str> {
        self.get(name)?.to_str().ok()
    }

    fn cookie(&self, name: &str) -> Option<String> {
        self.get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(';'))
            .find_map(|pair| {
                let (key, val) = pair.trim().split_once('=')?;
                (key.trim() == name).then(|| val.trim().to_string())
            })
    }
}

/// Email and password decoded from a Basic `Authorization` header.
pub struct BasicCredentials {
    pub email: String,
    pub password: SecretString,
}

/// Credential material extracted from a request; never persisted.
pub enum RawCredential {
    Basic(BasicCredentials),
    SessionToken(SecretString),
}

/// The `Authorization` header value, verbatim.
pub fn authorization_header<R>(request: Option<&R>) -> Option<&str>
where
    R: RequestCredentials + ?Sized,
{
    request?.header(header::AUTHORIZATION.as_str())
}

/// The base64 part of a `Basic ` header, trimmed.
#[must_use]
pub fn extract_base64(header: &str) -> Option<&str> {
    header.strip_prefix(BASIC_PREFIX).map(str::trim)
}

/// Decode standard base64 into UTF-8 text.
#[must_use]
pub fn decode_base64(blob: &str) -> Option<String> {
    let bytes = Base64::decode_vec(blob).ok()?;
    String::from_utf8(bytes).ok()
}

/// Split `identity:secret` on the first `:` so secrets may contain `:`.
#[must_use]
pub fn split_credentials(decoded: &str) -> Option<(&str, &str)> {
    decoded.split_once(':')
}

/// Read a named cookie.
pub fn session_cookie<R>(request: Option<&R>, cookie_name: &str) -> Option<String>
where
    R: RequestCredentials + ?Sized,
{
    request?.cookie(cookie_name)
}

/// Full Basic pipeline: header → base64 blob → text → credentials.
#[must_use]
pub fn basic_credentials(header: &str) -> Option<BasicCredentials> {
    let decoded = decode_base64(extract_base64(header)?)?;
    let (email, password) = split_credentials(&decoded)?;
    Some(BasicCredentials {
        email: email.to_string(),
        password: SecretString::from(password),
    })
}

/// Extraction scheme, selected by configuration.
#[derive(Clone, Debug)]
pub enum CredentialExtractor {
    Basic,
    SessionCookie { cookie_name: String },
}

impl CredentialExtractor {
    /// Extract credential material for this scheme.
    ///
    /// # Errors
    /// Returns [`Reason::MissingCredentials`] when the request carries nothing
    /// for this scheme and [`Reason::MalformedCredentials`] when it carries
    /// something unusable.
    pub fn extract<R>(&self, request: &R) -> Result<RawCredential, Reason>
    where
        R: RequestCredentials + ?Sized,
    {
        match self {
            Self::Basic => {
                let header =
                    authorization_header(Some(request)).ok_or(Reason::MissingCredentials)?;
                basic_credentials(header)
                    .map(RawCredential::Basic)
                    .ok_or(Reason::MalformedCredentials)
            }
            Self::SessionCookie { cookie_name } => {
                let token =
                    session_cookie(Some(request), cookie_name).ok_or(Reason::MissingCredentials)?;
                if token.is_empty() {
                    return Err(Reason::MalformedCredentials);
                }
                Ok(RawCredential::SessionToken(SecretString::from(token)))
            }
        }
    }
}
