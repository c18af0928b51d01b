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

use super::{internal_error, message, non_empty, valid_email};
use crate::auth::{AuthError, AuthService};

#[derive(ToSchema, Deserialize, Default)]
pub struct Credentials {
    pub(crate) email: Option<String>,
    pub(crate) password: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct UserCreated {
    email: String,
    message: String,
}

#[utoipa::path(
    post,
    path= "/users",
    request_body(content = Credentials, content_type = "application/x-www-form-urlencoded"),
    responses (
        (status = 200, description = "User created", body = UserCreated, content_type = "application/json"),
        (status = 400, description = "Missing fields, invalid email, or email already registered"),
    ),
    tag= "users"
)]
#[instrument(skip_all)]
pub async fn register(
    service: Extension<Arc<AuthService>>,
    payload: Option<Form<Credentials>>,
) -> Response {
    let form = payload.map(|Form(form)| form).unwrap_or_default();
    let (Some(email), Some(password)) = (
        non_empty(form.email),
        form.password.filter(|password| !password.is_empty()),
    ) else {
        return message(StatusCode::BAD_REQUEST, "email and password required");
    };

    if !valid_email(&email) {
        return message(StatusCode::BAD_REQUEST, "invalid email");
    }

    match service.register_user(&email, &password).await {
        Ok(user) => Json(UserCreated {
            email: user.email,
            message: "user created".to_string(),
        })
        .into_response(),
        Err(AuthError::DuplicateEmail) => {
            message(StatusCode::BAD_REQUEST, "email already registered")
        }
        Err(err) => internal_error("Failed to register user", &err),
    }
}
