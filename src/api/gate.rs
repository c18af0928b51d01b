//! Middleware that runs the auth gate in front of every routed request.

use axum::{
    extract::{Extension, Request},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use std::sync::Arc;

use crate::auth::{AuthService, GateDecision, Reason};

/// Bypass excluded paths, put the resolved user in request extensions, or
/// answer 401 (no credentials) / 403 (credentials that do not resolve).
pub async fn require_auth(
    Extension(service): Extension<Arc<AuthService>>,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    match service.gate().check(&path, request.headers()).await {
        GateDecision::Bypass => next.run(request).await,
        GateDecision::Allowed(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        GateDecision::Denied(Reason::MissingCredentials) => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "Unauthorized" })),
        )
            .into_response(),
        GateDecision::Denied(_) => {
            (StatusCode::FORBIDDEN, Json(json!({ "error": "Forbidden" }))).into_response()
        }
    }
}
