//! Login and logout endpoints backed by the session cookie.

use axum::{
    extract::Extension,
    http::{
        header::{InvalidHeaderValue, SET_COOKIE},
        HeaderMap, HeaderValue, StatusCode,
    },
    response::{IntoResponse, Json, Redirect, Response},
    Form,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, instrument};
use utoipa::ToSchema;

use super::{internal_error, non_empty, users::Credentials};
use crate::auth::{extract::session_cookie, AuthService};

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoggedIn {
    email: String,
    message: String,
}

#[utoipa::path(
    post,
    path = "/sessions",
    request_body(content = Credentials, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Logged in, session cookie set", body = LoggedIn),
        (status = 401, description = "Missing or incorrect credentials")
    ),
    tag = "sessions"
)]
#[instrument(skip_all)]
pub async fn login(
    service: Extension<Arc<AuthService>>,
    payload: Option<Form<Credentials>>,
) -> Response {
    let form = payload.map(|Form(form)| form).unwrap_or_default();
    let (Some(email), Some(password)) = (
        non_empty(form.email),
        form.password.filter(|password| !password.is_empty()),
    ) else {
        return StatusCode::UNAUTHORIZED.into_response();
    };

    if !service.valid_login(&email, &password).await {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let token = match service.sessions().create_session(&email).await {
        Ok(Some(token)) => token,
        // The user vanished between the password check and the session write.
        Ok(None) => return StatusCode::UNAUTHORIZED.into_response(),
        Err(err) => return internal_error("Failed to create session", &err),
    };

    let cookie = match session_cookie_header(service.config().session_cookie_name(), &token) {
        Ok(cookie) => cookie,
        Err(err) => {
            error!("Failed to build session cookie: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let mut headers = HeaderMap::new();
    headers.insert(SET_COOKIE, cookie);
    let body = LoggedIn {
        email,
        message: "logged in".to_string(),
    };
    (StatusCode::OK, headers, Json(body)).into_response()
}

#[utoipa::path(
    delete,
    path = "/sessions",
    responses(
        (status = 303, description = "Session destroyed, redirect to /"),
        (status = 403, description = "No session cookie or unknown session")
    ),
    tag = "sessions"
)]
#[instrument(skip_all)]
pub async fn logout(service: Extension<Arc<AuthService>>, headers: HeaderMap) -> Response {
    let cookie_name = service.config().session_cookie_name();
    let Some(token) = session_cookie(Some(&headers), cookie_name) else {
        return StatusCode::FORBIDDEN.into_response();
    };

    let user = match service.sessions().get_user_from_session(Some(&token)).await {
        Ok(Some(user)) => user,
        Ok(None) => return StatusCode::FORBIDDEN.into_response(),
        Err(err) => return internal_error("Failed to lookup session", &err),
    };

    if let Err(err) = service.sessions().destroy_session(user.id).await {
        return internal_error("Failed to destroy session", &err);
    }

    let mut response_headers = HeaderMap::new();
    if let Ok(cookie) = clear_session_cookie_header(cookie_name) {
        response_headers.insert(SET_COOKIE, cookie);
    }
    (response_headers, Redirect::to("/")).into_response()
}

pub(crate) fn session_cookie_header(
    cookie_name: &str,
    token: &str,
) -> Result<HeaderValue, InvalidHeaderValue> {
    HeaderValue::from_str(&format!(
        "{cookie_name}={token}; Path=/; HttpOnly; SameSite=Lax"
    ))
}

fn clear_session_cookie_header(cookie_name: &str) -> Result<HeaderValue, InvalidHeaderValue> {
    HeaderValue::from_str(&format!(
        "{cookie_name}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0"
    ))
}
