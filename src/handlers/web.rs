use axum::{extract::State, http::HeaderMap, response::Response};
use serde::Deserialize;
use tower_cookies::Cookies;

use crate::{
    error::{AppError, Result},
    handlers::{
        auth::{end_session, start_session, LoginRequest},
        common::{found, JsonOrForm},
    },
    middleware_layer::auth::extract_session_token,
    services::auth as auth_service,
    state::AppState,
    validation::auth::{validate_password_confirmation, validate_signup, SignupRequest},
};

/// The sign-up form, which repeats the password.
#[derive(Deserialize)]
pub struct SignupForm {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(rename = "confirmPassword")]
    pub confirm_password: String,
}

/// Form sign-up. Redirects to the dashboard with a fresh session.
#[axum::debug_handler]
pub async fn sign_up(
    State(state): State<AppState>,
    cookies: Cookies,
    headers: HeaderMap,
    JsonOrForm(form): JsonOrForm<SignupForm>,
) -> Result<Response> {
    validate_password_confirmation(&form.password, &form.confirm_password)?;

    let payload = SignupRequest {
        name: form.name,
        email: form.email,
        password: form.password,
    };
    validate_signup(&payload)?;

    let user = auth_service::create_user(&state, payload.name, payload.email, payload.password)
        .await?;

    let previous = extract_session_token(&cookies, &headers, &state.config.session_cookie_name);
    start_session(&state, &cookies, previous, &user).await?;

    tracing::info!("✅ User signed up via form: {}", user.id);
    Ok(found("/dashboard"))
}

/// Form log-in. Bad credentials are reported as a plain 400 so the form can
/// show them inline.
#[axum::debug_handler]
pub async fn log_in(
    State(state): State<AppState>,
    cookies: Cookies,
    headers: HeaderMap,
    JsonOrForm(form): JsonOrForm<LoginRequest>,
) -> Result<Response> {
    let Some(user) = auth_service::verify_password(&state, &form.email, form.password).await?
    else {
        tracing::warn!("❌ Form log-in rejected");
        return Err(AppError::Validation("Invalid credentials".to_string()));
    };

    let previous = extract_session_token(&cookies, &headers, &state.config.session_cookie_name);
    start_session(&state, &cookies, previous, &user).await?;

    Ok(found("/dashboard"))
}

/// Form log-out. Always lands back on the home page.
#[axum::debug_handler]
pub async fn log_out(
    State(state): State<AppState>,
    cookies: Cookies,
    headers: HeaderMap,
) -> Result<Response> {
    let token = extract_session_token(&cookies, &headers, &state.config.session_cookie_name);
    end_session(&state, &cookies, token).await?;

    Ok(found("/"))
}
