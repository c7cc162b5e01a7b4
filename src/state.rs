use std::sync::Arc;
use tokio::sync::{OnceCell, Semaphore, SemaphorePermit};

use crate::config::{Config, StorageBackend};
use crate::error::{AppError, Result};
use crate::repositories::{
    memory::{MemorySessionStore, MemoryTodoRepository, MemoryUserRepository},
    session::RedisSessionStore,
    todo::PgTodoRepository,
    user::PgUserRepository,
    SessionStore, TodoRepository, UserRepository,
};

/// Caps how many password hashes run on the blocking pool at once.
#[derive(Clone)]
pub struct HashingLimiter {
    semaphore: Arc<Semaphore>,
}

impl HashingLimiter {
    /// Creates a new `HashingLimiter`.
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
        }
    }

    /// Acquires a permit from the semaphore.
    pub async fn acquire(&self) -> Result<SemaphorePermit<'_>> {
        self.semaphore
            .acquire()
            .await
            .map_err(|_| AppError::Internal("Hashing limiter closed".to_string()))
    }

    /// Returns the number of available permits.
    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }
}

/// The application's state.
#[derive(Clone)]
pub struct AppState {
    /// Account storage.
    pub users: Arc<dyn UserRepository>,
    /// Todo storage.
    pub todos: Arc<dyn TodoRepository>,
    /// Session storage.
    pub sessions: Arc<dyn SessionStore>,
    /// The application's configuration.
    pub config: Config,
    /// The password hashing limiter.
    pub hashing_limiter: HashingLimiter,
    /// Hash verified against when a login names an unknown email.
    pub dummy_hash: Arc<OnceCell<String>>,
}

impl AppState {
    /// Creates a new `AppState`, connecting to whichever backend `config` names.
    ///
    /// # Arguments
    ///
    /// * `config` - The application's configuration.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `AppState`.
    pub async fn new(config: &Config) -> Result<Self> {
        match &config.storage {
            StorageBackend::Memory => {
                tracing::warn!("⚠️ No DATABASE_URL set, using the in-memory backend");
                Ok(Self::in_memory(config.clone()))
            }
            StorageBackend::Postgres {
                database_url,
                redis_url,
            } => {
                let db = crate::db::create_pool(database_url)?;
                tracing::info!("✅ PostgreSQL Pool initialized with deadpool-postgres");

                if config.run_migrations {
                    crate::db::run_migrations(&db).await?;
                }

                let redis_client = redis::Client::open(redis_url.as_str())?;
                let redis = redis::aio::ConnectionManager::new(redis_client).await?;
                tracing::info!("✅ Redis Connection Manager initialized (pooled)");

                Ok(Self::with_stores(
                    config.clone(),
                    Arc::new(PgUserRepository::new(db.clone())),
                    Arc::new(PgTodoRepository::new(db)),
                    Arc::new(RedisSessionStore::new(redis)),
                ))
            }
        }
    }

    /// State backed entirely by process memory.
    pub fn in_memory(config: Config) -> Self {
        Self::with_stores(
            config,
            Arc::new(MemoryUserRepository::default()),
            Arc::new(MemoryTodoRepository::default()),
            Arc::new(MemorySessionStore::default()),
        )
    }

    pub fn with_stores(
        config: Config,
        users: Arc<dyn UserRepository>,
        todos: Arc<dyn TodoRepository>,
        sessions: Arc<dyn SessionStore>,
    ) -> Self {
        let hashing_limiter = HashingLimiter::new(config.hashing.max_concurrent);
        tracing::info!(
            "✅ Hashing limiter initialized (max {} concurrent)",
            config.hashing.max_concurrent
        );

        Self {
            users,
            todos,
            sessions,
            config,
            hashing_limiter,
            dummy_hash: Arc::new(OnceCell::new()),
        }
    }
}
