use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::Response,
    Extension,
};
use serde::Deserialize;
use tower_cookies::cookie::time::Duration;
use tower_cookies::{Cookie, Cookies};

use crate::{
    config::Config,
    error::{AppError, Result},
    handlers::common::{json_response, JsonOrForm, MessageResponse},
    middleware_layer::auth::{basic_credentials, extract_session_token},
    models::user::{Identity, User, UserResponse},
    services::{auth as auth_service, session as session_service},
    state::AppState,
    validation::auth::{validate_signup, SignupRequest},
};

/// The request payload for user login.
#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Builds the session cookie carrying `token`.
fn session_cookie(config: &Config, token: String) -> Cookie<'static> {
    let mut cookie = Cookie::new(config.session_cookie_name.clone(), token);

    cookie.set_http_only(true);
    if config.secure_cookies {
        cookie.set_secure(true);
    }
    cookie.set_same_site(tower_cookies::cookie::SameSite::Lax);
    cookie.set_max_age(Duration::days(config.session_duration_days));
    cookie.set_path("/");

    cookie
}

/// Issues a fresh session for an already authenticated `user`, replacing any
/// session the request carried, and sets the cookie.
pub(crate) async fn start_session(
    state: &AppState,
    cookies: &Cookies,
    previous_token: Option<String>,
    user: &User,
) -> Result<()> {
    let token = auth_service::establish_session(state, user, previous_token.as_deref()).await?;
    cookies.add(session_cookie(&state.config, token));
    tracing::info!("✅ Session cookie added for user: {}", user.id);
    Ok(())
}

/// Clears the presented session, if any, and expires the cookie.
pub(crate) async fn end_session(
    state: &AppState,
    cookies: &Cookies,
    token: Option<String>,
) -> Result<()> {
    if let Some(token) = token {
        session_service::clear_session(state, &token).await?;
        tracing::info!("✅ Session cleared");
    }

    let mut cookie = Cookie::new(state.config.session_cookie_name.clone(), "");
    cookie.set_max_age(Duration::seconds(0));
    cookie.set_path("/");
    cookies.remove(cookie);
    Ok(())
}

/// Handles user signup. The new user is logged in straight away.
#[axum::debug_handler]
pub async fn signup(
    State(state): State<AppState>,
    cookies: Cookies,
    headers: HeaderMap,
    JsonOrForm(payload): JsonOrForm<SignupRequest>,
) -> Result<Response> {
    tracing::info!("📝 Signup attempt for: {}", payload.email);
    validate_signup(&payload)?;

    let user = auth_service::create_user(&state, payload.name, payload.email, payload.password)
        .await?;

    let previous = extract_session_token(&cookies, &headers, &state.config.session_cookie_name);
    start_session(&state, &cookies, previous, &user).await?;

    tracing::info!("✅ User registered: {}", user.id);
    json_response(StatusCode::CREATED, &UserResponse::from(&user))
}

/// Handles user login.
///
/// Credentials come from an `Authorization: Basic` header when one is sent,
/// otherwise from the body.
#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    cookies: Cookies,
    headers: HeaderMap,
    payload: std::result::Result<JsonOrForm<LoginRequest>, AppError>,
) -> Result<Response> {
    let LoginRequest { email, password } = match basic_credentials(&headers)? {
        Some((email, password)) => LoginRequest { email, password },
        None => payload?.0,
    };

    let user = auth_service::authenticate_credentials(&state, &email, password).await?;

    let previous = extract_session_token(&cookies, &headers, &state.config.session_cookie_name);
    start_session(&state, &cookies, previous, &user).await?;

    tracing::info!("✅ User logged in: {}", user.id);
    json_response(StatusCode::OK, &UserResponse::from(&user))
}

/// Handles user logout. Logging out without a session is not an error.
#[axum::debug_handler]
pub async fn logout(
    State(state): State<AppState>,
    cookies: Cookies,
    headers: HeaderMap,
) -> Result<Response> {
    let token = extract_session_token(&cookies, &headers, &state.config.session_cookie_name);
    end_session(&state, &cookies, token).await?;

    json_response(StatusCode::OK, &MessageResponse::ok("Logout successful"))
}

/// Returns the current user.
#[axum::debug_handler]
pub async fn me(Extension(identity): Extension<Identity>) -> Result<Response> {
    json_response(StatusCode::OK, &UserResponse::from(&identity))
}
