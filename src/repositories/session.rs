use async_trait::async_trait;
use chrono::Utc;
use redis::{aio::ConnectionManager, AsyncCommands};

use crate::{
    error::{AppError, Result},
    models::session::Session,
    repositories::SessionStore,
};

fn redis_key(key: &str) -> String {
    format!("session:{}", key)
}

/// Sessions kept in Redis as JSON with a `SET EX` expiry, so Redis itself
/// evicts them.
#[derive(Clone)]
pub struct RedisSessionStore {
    redis: ConnectionManager,
}

impl RedisSessionStore {
    pub fn new(redis: ConnectionManager) -> Self {
        Self { redis }
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn insert(&self, key: &str, session: &Session) -> Result<()> {
        let session_json = sonic_rs::to_string(session)
            .map_err(|e| AppError::Internal(format!("Session serialization failed: {}", e)))?;

        let ttl_seconds = (session.expires_at - Utc::now()).num_seconds();
        if ttl_seconds <= 0 {
            return Ok(());
        }

        let mut redis = self.redis.clone();
        let _: () = redis
            .set_ex(redis_key(key), &session_json, ttl_seconds as u64)
            .await
            .map_err(|e| {
                tracing::error!("❌ Redis set_ex failed: {}", e);
                AppError::Redis(e)
            })?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Session>> {
        let mut redis = self.redis.clone();
        let session_json: Option<String> = redis.get(redis_key(key)).await?;

        let Some(session_json) = session_json else {
            return Ok(None);
        };

        match sonic_rs::from_str::<Session>(&session_json) {
            Ok(session) => Ok(Some(session)),
            Err(e) => {
                tracing::warn!("❌ Invalid session JSON, dropping it: {}", e);
                let _: () = redis.del(redis_key(key)).await.unwrap_or(());
                Ok(None)
            }
        }
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let mut redis = self.redis.clone();
        let _: () = redis.del(redis_key(key)).await?;
        Ok(())
    }

    async fn purge_expired(&self) -> Result<usize> {
        Ok(0)
    }
}
