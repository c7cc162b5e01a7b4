use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use http::{header, HeaderValue, Method};
use tower_cookies::CookieManagerLayer;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::{
    config::Config,
    handlers,
    middleware_layer::{
        auth::{require_auth, require_session_or_redirect},
        rate_limit::limit_per_ip,
    },
    state::AppState,
};

/// Request bodies are small JSON or form payloads.
const BODY_LIMIT_BYTES: usize = 1024 * 1024;

fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("⚠️ Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
        ])
        .allow_credentials(true)
        .max_age(Duration::from_secs(86400))
}

/// Builds the full application router.
///
/// Credential endpoints sit behind the per-IP limiter, the todo routes and
/// `users/me` behind [`require_auth`], `/dashboard` behind
/// [`require_session_or_redirect`], and anything unrouted falls through to
/// the public asset directory. Every `/api/...` route is also served without
/// the prefix.
pub fn build_router(state: AppState) -> Router {
    let credential_routes = limit_per_ip(
        Router::new()
            .route("/api/users", post(handlers::auth::signup))
            .route("/users", post(handlers::auth::signup))
            .route("/signup", post(handlers::auth::signup))
            .route("/api/users/login", post(handlers::auth::login))
            .route("/login", post(handlers::auth::login))
            .route("/sign-up", post(handlers::web::sign_up))
            .route("/log-in", post(handlers::web::log_in)),
        state.config.auth_rate_limit,
    );

    let session_routes = Router::new()
        .route("/api/users/logout", post(handlers::auth::logout))
        .route("/logout", post(handlers::auth::logout))
        .route("/log-out", post(handlers::web::log_out));

    let todo_routes = Router::new()
        .route(
            "/",
            get(handlers::todos::list_todos).post(handlers::todos::create_todo),
        )
        .route(
            "/{id}",
            get(handlers::todos::get_todo)
                .patch(handlers::todos::update_todo)
                .delete(handlers::todos::delete_todo),
        );

    let protected_routes = Router::new()
        .route("/api/users/me", get(handlers::auth::me))
        .route("/users/me", get(handlers::auth::me))
        .nest("/api/todos", todo_routes.clone())
        .nest("/todos", todo_routes)
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    let page_routes = Router::new()
        .route_service(
            "/dashboard",
            ServeFile::new(state.config.public_dir.join("dashboard.html")),
        )
        .route_layer(from_fn_with_state(
            state.clone(),
            require_session_or_redirect,
        ));

    let cors = cors_layer(&state.config);
    let public_dir = ServeDir::new(&state.config.public_dir);

    Router::new()
        .route("/health", get(handlers::common::health))
        .merge(credential_routes)
        .merge(session_routes)
        .merge(protected_routes)
        .merge(page_routes)
        .fallback_service(public_dir)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::default().level(Level::DEBUG))
                .on_response(DefaultOnResponse::default().level(Level::DEBUG))
                .on_failure(DefaultOnFailure::default().level(Level::ERROR)),
        )
        .layer(CompressionLayer::new())
        .layer(CookieManagerLayer::new())
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::password::test_params;
    use axum::body::{to_bytes, Body};
    use http::{Request, StatusCode};
    use tower::ServiceExt;

    fn app() -> Router {
        build_router(AppState::in_memory(Config {
            hashing: test_params(),
            auth_rate_limit: None,
            ..Config::default()
        }))
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let response = app()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], br#"{"status":"ok"}"#);
    }

    #[tokio::test]
    async fn todos_without_a_session_are_unauthorized() {
        let response = app()
            .oneshot(Request::get("/api/todos").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn unsupported_body_type_is_a_bad_request() {
        let request = Request::post("/api/users")
            .header(header::CONTENT_TYPE, "text/plain")
            .body(Body::from("hello"))
            .unwrap();
        let response = app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn dashboard_without_a_session_redirects_to_log_in() {
        let response = app()
            .oneshot(Request::get("/dashboard").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()[header::LOCATION], "/log-in");
    }

    #[tokio::test]
    async fn dashboard_with_a_session_serves_the_page() {
        let public_dir = std::env::temp_dir().join(format!("todos-public-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&public_dir).unwrap();
        std::fs::write(public_dir.join("dashboard.html"), "<h1>My todos</h1>").unwrap();

        let state = AppState::in_memory(Config {
            hashing: test_params(),
            auth_rate_limit: None,
            public_dir: public_dir.clone(),
            ..Config::default()
        });
        let user = crate::services::auth::create_user(
            &state,
            "Mo".into(),
            "mo@example.com".into(),
            "secret123".into(),
        )
        .await
        .unwrap();
        let token = crate::services::session::create_session(&state, user.id)
            .await
            .unwrap();

        let request = Request::get("/dashboard")
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap();
        let response = build_router(state).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"<h1>My todos</h1>");

        std::fs::remove_dir_all(&public_dir).unwrap();
    }

    #[tokio::test]
    async fn logout_without_a_session_succeeds() {
        let response = app()
            .oneshot(Request::post("/api/users/logout").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }
}
