use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::User;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct Profile {
    email: String,
}

#[utoipa::path(
    get,
    path = "/profile",
    responses(
        (status = 200, description = "Authenticated user", body = Profile),
        (status = 401, description = "No credentials supplied"),
        (status = 403, description = "Credentials did not resolve to a user")
    ),
    tag = "users"
)]
/// The user is put in request extensions by the auth gate.
pub async fn profile(user: Option<Extension<User>>) -> Response {
    match user {
        Some(Extension(user)) => Json(Profile { email: user.email }).into_response(),
        // Route was excluded from the gate, so nobody resolved a user.
        None => StatusCode::FORBIDDEN.into_response(),
    }
}
