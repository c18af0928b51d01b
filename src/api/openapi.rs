use utoipa::OpenApi;

use super::handlers::{health, profile, reset_password, sessions, users};

/// Generated `OpenAPI` document for every gated and public route.
/// `/` is intentionally not documented.
#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        users::register,
        sessions::login,
        sessions::logout,
        profile::profile,
        reset_password::reset_token,
        reset_password::update_password
    ),
    components(schemas(
        health::Health,
        users::Credentials,
        users::UserCreated,
        sessions::LoggedIn,
        profile::Profile,
        reset_password::ResetRequest,
        reset_password::ResetIssued,
        reset_password::PasswordUpdate,
        reset_password::PasswordUpdated
    )),
    tags(
        (name = "health", description = "Service and store status"),
        (name = "users", description = "Registration and profile"),
        (name = "sessions", description = "Login and logout"),
        (name = "reset_password", description = "Single-use password reset tokens")
    )
)]
pub struct ApiDoc;

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}
