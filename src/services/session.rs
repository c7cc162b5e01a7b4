use chrono::Utc;
use uuid::Uuid;

use crate::{
    crypto::token,
    error::{AppError, Result},
    models::session::Session,
    state::AppState,
};

/// Creates a session for `user_id` and returns its token.
///
/// The token is handed to the client once; only its digest is stored.
pub async fn create_session(state: &AppState, user_id: Uuid) -> Result<String> {
    let token = token::generate_session_token();
    let key = token::session_key(&token)
        .ok_or_else(|| AppError::Internal("Generated an unusable session token".to_string()))?;

    let session = Session::new(user_id, state.config.session_ttl());
    state.sessions.insert(&key, &session).await?;

    tracing::info!("✅ Session created for user: {}", user_id);
    Ok(token)
}

/// Returns the user a token is bound to, or `None` if the token is malformed,
/// unknown or expired.
pub async fn resolve_session(state: &AppState, token: &str) -> Result<Option<Uuid>> {
    let Some(key) = token::session_key(token) else {
        tracing::debug!("Malformed session token");
        return Ok(None);
    };

    let Some(session) = state.sessions.get(&key).await? else {
        tracing::debug!("Unknown session token");
        return Ok(None);
    };

    if session.is_expired_at(Utc::now()) {
        tracing::warn!("❌ Session expired for user: {}", session.user_id);
        state.sessions.remove(&key).await?;
        return Ok(None);
    }

    Ok(Some(session.user_id))
}

/// Invalidates a token. Unknown, malformed or already cleared tokens are fine.
pub async fn clear_session(state: &AppState, token: &str) -> Result<()> {
    if let Some(key) = token::session_key(token) {
        state.sessions.remove(&key).await?;
        tracing::debug!("Session cleared");
    }
    Ok(())
}

/// Drops expired sessions from backends that do not expire them on their own.
pub async fn purge_expired(state: &AppState) -> Result<usize> {
    state.sessions.purge_expired().await
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
    async fn created_session_resolves_until_cleared() {
        let state = state();
        let user_id = Uuid::new_v4();

        let token = create_session(&state, user_id).await.unwrap();
        assert_eq!(resolve_session(&state, &token).await.unwrap(), Some(user_id));

        clear_session(&state, &token).await.unwrap();
        assert_eq!(resolve_session(&state, &token).await.unwrap(), None);

        clear_session(&state, &token).await.unwrap();
    }

    #[tokio::test]
    async fn every_session_gets_a_fresh_token() {
        let state = state();
        let user_id = Uuid::new_v4();

        let first = create_session(&state, user_id).await.unwrap();
        let second = create_session(&state, user_id).await.unwrap();
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn unknown_and_malformed_tokens_resolve_to_none() {
        let state = state();

        let unknown = token::generate_session_token();
        assert_eq!(resolve_session(&state, &unknown).await.unwrap(), None);
        assert_eq!(resolve_session(&state, "").await.unwrap(), None);
        assert_eq!(resolve_session(&state, "%%%").await.unwrap(), None);
        clear_session(&state, "%%%").await.unwrap();
    }

    #[tokio::test]
    async fn expired_sessions_fail_closed_and_are_removed() {
        let state = state();
        let user_id = Uuid::new_v4();
        let token = token::generate_session_token();
        let key = token::session_key(&token).unwrap();

        state
            .sessions
            .insert(&key, &Session::new(user_id, chrono::Duration::seconds(-5)))
            .await
            .unwrap();

        assert_eq!(resolve_session(&state, &token).await.unwrap(), None);
        assert!(state.sessions.get(&key).await.unwrap().is_none());
    }
}
