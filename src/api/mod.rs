use crate::auth::AuthService;
use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{HeaderName, HeaderValue, Request},
    middleware,
    routing::{get, post},
    Extension, Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{info, info_span, Span};
use ulid::Ulid;
use utoipa_swagger_ui::SwaggerUi;

pub mod gate;
pub mod handlers;
mod openapi;

pub use openapi::{openapi, ApiDoc};

use handlers::{health, profile, reset_password, root, sessions, users};

const REQUEST_ID: &str = "x-request-id";

/// Build the application router around a shared [`AuthService`].
///
/// Every route goes through the auth gate; Swagger UI is mounted outside it.
#[must_use]
pub fn router(service: Arc<AuthService>) -> Router {
    let routes = Router::new()
        .route("/", get(root::root))
        .route("/health", get(health::health))
        .route("/users", post(users::register))
        .route("/sessions", post(sessions::login).delete(sessions::logout))
        .route("/profile", get(profile::profile))
        .route(
            "/reset_password",
            post(reset_password::reset_token).put(reset_password::update_password),
        )
        .layer(middleware::from_fn(gate::require_auth));

    routes
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static(REQUEST_ID),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    REQUEST_ID,
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(Extension(service)),
        )
}

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(port: u16, service: Arc<AuthService>) -> Result<()> {
    let app = router(service);

    let listener = TcpListener::bind(format!("[::]:{port}"))
        .await
        .with_context(|| format!("Failed to bind port {port}"))?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Gracefully shutdown");
            }
        })
        .await?;

    Ok(())
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get(REQUEST_ID)
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::auth::{
        hasher::tests::fast_hasher, AuthConfig, AuthScheme, MemoryStore, UserStore,
    };
    use axum::{
        body::to_bytes,
        http::{header, Method, StatusCode},
        response::Response,
    };
    use base64ct::{Base64, Encoding};
    use serde_json::Value;
    use tower::ServiceExt;

    fn app(scheme: AuthScheme) -> (Router, Arc<AuthService>) {
        let store: Arc<dyn UserStore> = Arc::new(MemoryStore::new());
        let service = Arc::new(AuthService::new(
            AuthConfig::new(scheme),
            store,
            Arc::new(fast_hasher()),
        ));
        (router(Arc::clone(&service)), service)
    }

    fn form(method: Method, uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_with(uri: &str, name: header::HeaderName, value: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header(name, value)
            .body(Body::empty())
            .unwrap()
    }

    async fn json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn session_token(response: &Response) -> String {
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .unwrap();
        let pair = cookie.split(';').next().unwrap();
        pair.split_once('=').unwrap().1.to_string()
    }

    #[tokio::test]
    async fn root_is_public() {
        let (app, _) = app(AuthScheme::Session);
        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key(REQUEST_ID));
        assert_eq!(json(response).await["message"], "Bienvenue");
    }

    #[tokio::test]
    async fn health_reports_store() {
        let (app, _) = app(AuthScheme::Session);
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("X-App"));
        let body = json(response).await;
        assert_eq!(body["store"], "ok");
        assert_eq!(body["name"], env!("CARGO_PKG_NAME"));
    }

    #[tokio::test]
    async fn register_validates_and_rejects_duplicates() {
        let (app, _) = app(AuthScheme::Session);

        let response = app
            .clone()
            .oneshot(form(Method::POST, "/users", "email=a%40x.com"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app
            .clone()
            .oneshot(form(Method::POST, "/users", "email=not-an-email&password=pw"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app
            .clone()
            .oneshot(form(Method::POST, "/users", "email=a%40x.com&password=pw"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json(response).await;
        assert_eq!(body["email"], "a@x.com");
        assert_eq!(body["message"], "user created");

        let response = app
            .oneshot(form(Method::POST, "/users", "email=a%40x.com&password=other"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json(response).await["message"], "email already registered");
    }

    #[tokio::test]
    async fn login_profile_logout_with_session_cookie() {
        let (app, service) = app(AuthScheme::Session);
        service.register_user("a@x.com", "pw").await.unwrap();

        let response = app
            .clone()
            .oneshot(form(Method::POST, "/sessions", "email=a%40x.com&password=wrong"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app
            .clone()
            .oneshot(form(Method::POST, "/sessions", "email=a%40x.com&password=pw"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let token = session_token(&response);
        assert_eq!(json(response).await["message"], "logged in");

        let cookie = format!("_my_session_id={token}");
        let response = app
            .clone()
            .oneshot(get_with("/profile", header::COOKIE, &cookie))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json(response).await["email"], "a@x.com");

        let logout = Request::builder()
            .method(Method::DELETE)
            .uri("/sessions")
            .header(header::COOKIE, &cookie)
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(logout).await.unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/");

        let response = app
            .oneshot(get_with("/profile", header::COOKIE, &cookie))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn gate_distinguishes_missing_and_bad_credentials() {
        let (app, _) = app(AuthScheme::Session);
        let response = app
            .clone()
            .oneshot(Request::builder().uri("/profile").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app
            .oneshot(get_with("/profile", header::COOKIE, "_my_session_id=forged"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn logout_without_session_is_forbidden() {
        let (app, _) = app(AuthScheme::Session);
        let request = Request::builder()
            .method(Method::DELETE)
            .uri("/sessions")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn profile_with_basic_scheme() {
        let (app, service) = app(AuthScheme::Basic);
        service.register_user("a@x.com", "pw").await.unwrap();

        let good = format!("Basic {}", Base64::encode_string(b"a@x.com:pw"));
        let response = app
            .clone()
            .oneshot(get_with("/profile", header::AUTHORIZATION, &good))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bad = format!("Basic {}", Base64::encode_string(b"a@x.com:nope"));
        let response = app
            .oneshot(get_with("/profile", header::AUTHORIZATION, &bad))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn reset_password_flow() {
        let (app, service) = app(AuthScheme::Session);
        service.register_user("a@x.com", "old").await.unwrap();

        let response = app
            .clone()
            .oneshot(form(Method::POST, "/reset_password", "email=nobody%40x.com"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = app
            .clone()
            .oneshot(form(Method::POST, "/reset_password", "email=a%40x.com"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let token = json(response).await["reset_token"]
            .as_str()
            .unwrap()
            .to_string();

        let body = format!("email=a%40x.com&reset_token={token}&new_password=new");
        let response = app
            .clone()
            .oneshot(form(Method::PUT, "/reset_password", &body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json(response).await["message"], "Password updated");

        let response = app
            .oneshot(form(Method::PUT, "/reset_password", &body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        assert!(service.valid_login("a@x.com", "new").await);
        assert!(!service.valid_login("a@x.com", "old").await);
    }
}
