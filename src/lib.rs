//! # Authgate
//!
//! `authgate` puts an authentication gate in front of an HTTP application.
//! Every request path is checked against a list of excluded paths; paths that
//! require authentication must carry credentials that resolve to a user.
//!
//! ## Schemes
//!
//! Two interchangeable schemes resolve credentials:
//!
//! - **Basic:** `Authorization: Basic base64(email:password)` checked against
//!   the stored Argon2id hash.
//! - **Session:** an opaque token stored in a cookie (`_my_session_id` by
//!   default) and looked up against the user store.
//!
//! A request without credentials is answered with `401`, credentials that do
//! not resolve to a user are answered with `403`.
//!
//! ## Tokens
//!
//! Session ids and password reset tokens are 256-bit random values, URL-safe
//! base64 encoded. A user holds at most one session and one reset token at a
//! time, and a reset token can be redeemed exactly once.
//!
//! ## Storage
//!
//! Users live in `PostgreSQL` (see `sql/schema.sql`) or, without a DSN, in an
//! in-memory store that is lost on restart.

pub mod api;
pub mod auth;
pub mod cli;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};
