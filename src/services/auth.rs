use zeroize::Zeroizing;

use crate::crypto::password;
use crate::error::{AppError, Result};
use crate::models::user::User;
use crate::services::session as session_service;
use crate::state::AppState;

/// Hashes a password on the blocking pool, behind the hashing limiter.
async fn hash_off_thread(state: &AppState, password: Zeroizing<String>) -> Result<String> {
    let _permit = state.hashing_limiter.acquire().await?;
    let params = state.config.hashing;

    tokio::task::spawn_blocking(move || password::hash_password(&password, &params))
        .await
        .map_err(|e| AppError::Internal(format!("Hashing task failed: {}", e)))?
}

/// Verifies a password on the blocking pool. A hash that cannot be parsed
/// counts as a mismatch.
async fn verify_off_thread(
    state: &AppState,
    password: Zeroizing<String>,
    hash: String,
) -> Result<bool> {
    let _permit = state.hashing_limiter.acquire().await?;

    let outcome = tokio::task::spawn_blocking(move || password::verify_password(&password, &hash))
        .await
        .map_err(|e| AppError::Internal(format!("Verification task failed: {}", e)))?;

    match outcome {
        Ok(matched) => Ok(matched),
        Err(e) => {
            tracing::warn!("❌ Stored password hash is unusable: {}", e);
            Ok(false)
        }
    }
}

/// Burns one verification against a throwaway hash so that unknown emails take
/// as long to reject as wrong passwords.
async fn verify_against_dummy(state: &AppState, password: Zeroizing<String>) -> Result<()> {
    let dummy = state
        .dummy_hash
        .get_or_try_init(|| hash_off_thread(state, Zeroizing::new("not-a-real-password".to_string())))
        .await?
        .clone();

    let _ = verify_off_thread(state, password, dummy).await?;
    Ok(())
}

/// Creates a new user.
///
/// # Arguments
///
/// * `state` - The application state.
/// * `name` - The user's display name.
/// * `email` - The user's email address, stored as submitted.
/// * `password` - The user's plaintext password.
///
/// # Returns
///
/// A `Result` containing the created `User`, or `AppError::DuplicateEmail`.
pub async fn create_user(
    state: &AppState,
    name: String,
    email: String,
    password: String,
) -> Result<User> {
    let password = Zeroizing::new(password);
    tracing::debug!("🔐 Creating user: {}", email);

    if state.users.find_by_email(&email).await?.is_some() {
        tracing::info!("Signup rejected, email already registered");
        return Err(AppError::DuplicateEmail);
    }

    let password_hash = hash_off_thread(state, password).await?;
    let user = User::new(name, email, Some(password_hash));

    // The store re-checks uniqueness, so a concurrent signup still loses cleanly.
    state.users.insert(&user).await?;

    tracing::info!("✅ User created with ID: {}", user.id);
    Ok(user)
}

/// Checks an email/password pair.
///
/// Returns `None` both when no such user exists and when the password is
/// wrong, so callers cannot tell the two apart.
pub async fn verify_password(
    state: &AppState,
    email: &str,
    password: String,
) -> Result<Option<User>> {
    let password = Zeroizing::new(password);

    let user = state.users.find_by_email(email).await?;
    let Some((user, hash)) = user.and_then(|u| u.password_hash.clone().map(|h| (u, h))) else {
        verify_against_dummy(state, password).await?;
        return Ok(None);
    };

    if verify_off_thread(state, password, hash).await? {
        Ok(Some(user))
    } else {
        Ok(None)
    }
}

/// Authenticates a user by credentials.
///
/// # Returns
///
/// The `User` on success, `AppError::Unauthorized` otherwise.
pub async fn authenticate_credentials(
    state: &AppState,
    email: &str,
    password: String,
) -> Result<User> {
    tracing::debug!("🔐 Authenticating user: {}", email);

    match verify_password(state, email, password).await? {
        Some(user) => {
            tracing::info!("✅ User authenticated: {}", user.id);
            Ok(user)
        }
        None => {
            tracing::warn!("❌ Invalid credentials for login attempt");
            Err(AppError::Unauthorized)
        }
    }
}

/// Authenticates a request by its session token.
///
/// A session that points at a user who no longer exists is treated as no
/// session at all.
pub async fn authenticate_request(state: &AppState, token: &str) -> Result<User> {
    let user_id = session_service::resolve_session(state, token)
        .await?
        .ok_or(AppError::Unauthorized)?;

    match state.users.find_by_id(user_id).await? {
        Some(user) => Ok(user),
        None => {
            tracing::warn!("❌ Session refers to missing user: {}", user_id);
            Err(AppError::Unauthorized)
        }
    }
}

/// Starts a session for a freshly authenticated user.
///
/// Any token the client already held is cleared first, so a successful login
/// always leaves exactly one new session behind.
pub async fn establish_session(
    state: &AppState,
    user: &User,
    previous_token: Option<&str>,
) -> Result<String> {
    if let Some(previous) = previous_token {
        session_service::clear_session(state, previous).await?;
    }
    session_service::create_session(state, user.id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::Config, crypto::password::test_params};

    fn state() -> AppState {
        AppState::in_memory(Config {
            hashing: test_params(),
            ..Config::default()
        })
    }

    #[tokio::test]
    async fn password_round_trip() {
        let state = state();
        let created = create_user(&state, "Mo".into(), "mo@example.com".into(), "secret123".into())
            .await
            .unwrap();

        let verified = verify_password(&state, "mo@example.com", "secret123".into())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(verified.id, created.id);

        assert!(verify_password(&state, "mo@example.com", "secret124".into())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn stored_hash_is_not_the_plaintext() {
        let state = state();
        let user = create_user(&state, "Mo".into(), "mo@example.com".into(), "secret123".into())
            .await
            .unwrap();
        let hash = user.password_hash.unwrap();
        assert!(!hash.contains("secret123"));
        assert!(hash.starts_with("$argon2id$"));
    }

    #[tokio::test]
    async fn unknown_email_and_wrong_password_look_the_same() {
        let state = state();
        create_user(&state, "Mo".into(), "mo@example.com".into(), "secret123".into())
            .await
            .unwrap();

        let unknown = verify_password(&state, "nobody@example.com", "secret123".into())
            .await
            .unwrap();
        let wrong = verify_password(&state, "mo@example.com", "nope-nope".into())
            .await
            .unwrap();
        assert!(unknown.is_none());
        assert!(wrong.is_none());

        let unknown = authenticate_credentials(&state, "nobody@example.com", "x".into()).await;
        let wrong = authenticate_credentials(&state, "mo@example.com", "x".into()).await;
        assert!(matches!(unknown, Err(AppError::Unauthorized)));
        assert!(matches!(wrong, Err(AppError::Unauthorized)));
    }

    #[tokio::test]
    async fn user_without_a_hash_cannot_log_in() {
        let state = state();
        let user = User::new("Ghost".into(), "ghost@example.com".into(), None);
        state.users.insert(&user).await.unwrap();

        assert!(verify_password(&state, "ghost@example.com", "".into())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn duplicate_signup_leaves_first_user_alone() {
        let state = state();
        let first = create_user(&state, "A".into(), "a@x.com".into(), "password1".into())
            .await
            .unwrap();

        let second = create_user(&state, "B".into(), "a@x.com".into(), "password2".into()).await;
        assert!(matches!(second, Err(AppError::DuplicateEmail)));

        let stored = state.users.find_by_email("a@x.com").await.unwrap().unwrap();
        assert_eq!(stored.id, first.id);
        assert_eq!(stored.name, "A");
        assert!(verify_password(&state, "a@x.com", "password1".into())
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn request_authentication_follows_the_session() {
        let state = state();
        let user = create_user(&state, "Mo".into(), "mo@example.com".into(), "secret123".into())
            .await
            .unwrap();

        let token = establish_session(&state, &user, None).await.unwrap();
        assert_eq!(authenticate_request(&state, &token).await.unwrap().id, user.id);

        session_service::clear_session(&state, &token).await.unwrap();
        assert!(matches!(
            authenticate_request(&state, &token).await,
            Err(AppError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn session_for_a_missing_user_fails_closed() {
        let state = state();
        let token = session_service::create_session(&state, uuid::Uuid::new_v4())
            .await
            .unwrap();

        assert!(matches!(
            authenticate_request(&state, &token).await,
            Err(AppError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn new_session_replaces_the_one_presented() {
        let state = state();
        let user = create_user(&state, "Mo".into(), "mo@example.com".into(), "secret123".into())
            .await
            .unwrap();

        let old = establish_session(&state, &user, None).await.unwrap();
        let new = establish_session(&state, &user, Some(&old)).await.unwrap();

        assert_ne!(old, new);
        assert!(authenticate_request(&state, &old).await.is_err());
        assert_eq!(authenticate_request(&state, &new).await.unwrap().id, user.id);
    }

    #[tokio::test]
    async fn hashing_releases_its_permit() {
        let state = state();
        let before = state.hashing_limiter.available_permits();
        create_user(&state, "Mo".into(), "mo@example.com".into(), "secret123".into())
            .await
            .unwrap();
        assert_eq!(state.hashing_limiter.available_permits(), before);
    }
}
