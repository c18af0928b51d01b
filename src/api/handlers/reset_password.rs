use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    Form,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;

use super::{internal_error, non_empty};
use crate::auth::{AuthError, AuthService};

#[derive(ToSchema, Deserialize, Default)]
pub struct ResetRequest {
    email: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ResetIssued {
    email: String,
    reset_token: String,
}

#[derive(ToSchema, Deserialize, Default)]
pub struct PasswordUpdate {
    email: Option<String>,
    reset_token: Option<String>,
    new_password: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct PasswordUpdated {
    email: Option<String>,
    message: String,
}

#[utoipa::path(
    post,
    path = "/reset_password",
    request_body(content = ResetRequest, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Reset token issued", body = ResetIssued),
        (status = 403, description = "Email missing or not registered")
    ),
    tag = "reset_password"
)]
#[instrument(skip_all)]
pub async fn reset_token(
    service: Extension<Arc<AuthService>>,
    payload: Option<Form<ResetRequest>>,
) -> Response {
    let form = payload.map(|Form(form)| form).unwrap_or_default();
    let Some(email) = non_empty(form.email) else {
        return StatusCode::FORBIDDEN.into_response();
    };

    match service.resets().issue_token(&email).await {
        Ok(reset_token) => Json(ResetIssued { email, reset_token }).into_response(),
        Err(AuthError::UserNotFound) => StatusCode::FORBIDDEN.into_response(),
        Err(err) => internal_error("Failed to issue reset token", &err),
    }
}

#[utoipa::path(
    put,
    path = "/reset_password",
    request_body(content = PasswordUpdate, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Password updated", body = PasswordUpdated),
        (status = 403, description = "Missing fields or unknown reset token")
    ),
    tag = "reset_password"
)]
#[instrument(skip_all)]
pub async fn update_password(
    service: Extension<Arc<AuthService>>,
    payload: Option<Form<PasswordUpdate>>,
) -> Response {
    let form = payload.map(|Form(form)| form).unwrap_or_default();
    let (Some(reset_token), Some(new_password)) = (
        non_empty(form.reset_token),
        form.new_password.filter(|password| !password.is_empty()),
    ) else {
        return StatusCode::FORBIDDEN.into_response();
    };

    match service
        .resets()
        .consume_token(&reset_token, &new_password)
        .await
    {
        Ok(()) => Json(PasswordUpdated {
            email: non_empty(form.email),
            message: "Password updated".to_string(),
        })
        .into_response(),
        Err(AuthError::UserNotFound) => StatusCode::FORBIDDEN.into_response(),
        Err(err) => internal_error("Failed to update password", &err),
    }
}
