use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::{engine::general_purpose, Engine as _};
use tower_cookies::Cookies;

use crate::{
    error::{AppError, Result},
    handlers::common::found,
    models::user::Identity,
    services::auth as auth_service,
    state::AppState,
};

/// Reads a bearer token from the `Authorization` header.
fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(String::from)
}

/// Reads `email:password` from an `Authorization: Basic` header.
///
/// `Ok(None)` when there is no header or it uses another scheme. A Basic
/// value that does not decode to `email:password` is `Unauthorized`.
pub fn basic_credentials(headers: &HeaderMap) -> Result<Option<(String, String)>> {
    let Some(encoded) = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Basic "))
    else {
        return Ok(None);
    };

    let decoded = general_purpose::STANDARD
        .decode(encoded.trim())
        .ok()
        .and_then(|raw| String::from_utf8(raw).ok())
        .ok_or_else(|| {
            tracing::warn!("❌ Undecodable Basic credentials");
            AppError::Unauthorized
        })?;

    let (email, password) = decoded.split_once(':').ok_or(AppError::Unauthorized)?;
    Ok(Some((email.to_string(), password.to_string())))
}

/// Extracts the session token from the request.
///
/// The session cookie wins; an `Authorization: Bearer` header is accepted for
/// clients that do not keep cookies.
///
/// # Returns
///
/// An `Option` containing the raw token if one was presented.
pub fn extract_session_token(
    cookies: &Cookies,
    headers: &HeaderMap,
    cookie_name: &str,
) -> Option<String> {
    cookies
        .get(cookie_name)
        .map(|cookie| cookie.value().trim().to_string())
        .filter(|token| !token.is_empty())
        .or_else(|| bearer_token(headers))
}

/// Resolves the caller of a request, or rejects it.
///
/// Every protected operation goes through here before touching any data.
pub async fn require_identity(state: &AppState, token: Option<&str>) -> Result<Identity> {
    let Some(token) = token else {
        tracing::warn!("❌ No session token presented");
        return Err(AppError::Unauthorized);
    };

    let user = auth_service::authenticate_request(state, token).await?;
    tracing::debug!("✅ User authenticated: {}", user.id);
    Ok(Identity::from(&user))
}

/// A middleware that requires a valid session to be present.
///
/// On success the resolved [`Identity`] is placed in the request extensions
/// for the handler to pass on explicitly.
///
/// # Arguments
///
/// * `state` - The application state.
/// * `cookies` - The request cookies.
/// * `request` - The incoming request.
/// * `next` - The next middleware in the chain.
pub async fn require_auth(
    State(state): State<AppState>,
    cookies: Cookies,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response> {
    tracing::debug!("🔐 Checking authentication...");

    let token = extract_session_token(
        &cookies,
        request.headers(),
        &state.config.session_cookie_name,
    );
    let identity = require_identity(&state, token.as_deref()).await?;

    request.extensions_mut().insert(identity);

    Ok(next.run(request).await)
}

/// Page guard for browser routes: no session means a `302` to the log-in page
/// instead of a JSON 401.
pub async fn require_session_or_redirect(
    State(state): State<AppState>,
    cookies: Cookies,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let token = extract_session_token(
        &cookies,
        request.headers(),
        &state.config.session_cookie_name,
    );

    match require_identity(&state, token.as_deref()).await {
        Ok(identity) => {
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        Err(AppError::Unauthorized) => found("/log-in"),
        Err(e) => e.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::Config, crypto::password::test_params, services::session as session_service,
    };
    use axum::http::HeaderValue;

    fn state() -> AppState {
        AppState::in_memory(Config {
            hashing: test_params(),
            ..Config::default()
        })
    }

    #[tokio::test]
    async fn missing_token_is_rejected() {
        let state = state();
        assert!(matches!(
            require_identity(&state, None).await,
            Err(AppError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn bogus_token_is_rejected() {
        let state = state();
        assert!(matches!(
            require_identity(&state, Some("definitely-not-a-session")).await,
            Err(AppError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn live_session_resolves_to_identity() {
        let state = state();
        let user = auth_service::create_user(
            &state,
            "Mo".into(),
            "mo@example.com".into(),
            "secret123".into(),
        )
        .await
        .unwrap();
        let token = session_service::create_session(&state, user.id).await.unwrap();

        let identity = require_identity(&state, Some(&token)).await.unwrap();
        assert_eq!(identity.id, user.id);
        assert_eq!(identity.email, "mo@example.com");
    }

    #[test]
    fn basic_header_is_parsed() {
        let mut headers = HeaderMap::new();
        assert!(basic_credentials(&headers).unwrap().is_none());

        // "mo@example.com:secret:123"
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Basic bW9AZXhhbXBsZS5jb206c2VjcmV0OjEyMw=="),
        );
        let (email, password) = basic_credentials(&headers).unwrap().unwrap();
        assert_eq!(email, "mo@example.com");
        assert_eq!(password, "secret:123");

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc123"));
        assert!(basic_credentials(&headers).unwrap().is_none());
    }

    #[test]
    fn malformed_basic_header_is_unauthorized() {
        let mut headers = HeaderMap::new();
        for value in ["Basic %%%", "Basic bm9jb2xvbg=="] {
            headers.insert(header::AUTHORIZATION, HeaderValue::from_static(value));
            assert!(matches!(
                basic_credentials(&headers),
                Err(AppError::Unauthorized)
            ));
        }
    }

    #[test]
    fn bearer_header_is_parsed() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc123"));
        assert_eq!(bearer_token(&headers).as_deref(), Some("abc123"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc123"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer   "));
        assert_eq!(bearer_token(&headers), None);
    }
}
