use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};

/// Where users, todos and sessions are persisted.
#[derive(Clone, Debug)]
pub enum StorageBackend {
    /// Everything lives in process memory and is lost on restart.
    Memory,
    /// Users and todos in PostgreSQL, sessions in Redis.
    Postgres {
        /// The URL of the PostgreSQL database.
        database_url: String,
        /// The URL of the Redis server.
        redis_url: String,
    },
}

/// Argon2id cost parameters and the number of hashes allowed to run at once.
#[derive(Clone, Copy, Debug)]
pub struct HashingParams {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
    pub max_concurrent: usize,
}

impl Default for HashingParams {
    fn default() -> Self {
        Self {
            memory_kib: 19 * 1024,
            iterations: 3,
            parallelism: 1,
            max_concurrent: 4,
        }
    }
}

/// Per-IP limiter settings for the signup and login endpoints.
#[derive(Clone, Copy, Debug)]
pub struct AuthRateLimit {
    /// Seconds needed to replenish one request slot.
    pub period_secs: u64,
    /// Requests a single client may burst before being throttled.
    pub burst: u32,
}

/// The application's configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// The address the HTTP server binds to.
    pub bind_addr: SocketAddr,
    /// The persistence backend.
    pub storage: StorageBackend,
    /// Whether to create the Postgres schema on startup.
    pub run_migrations: bool,
    /// The duration of a session in days.
    pub session_duration_days: i64,
    /// The name of the cookie carrying the session token.
    pub session_cookie_name: String,
    /// Whether cookies get the `Secure` attribute.
    pub secure_cookies: bool,
    /// Directory served for any route the router does not know.
    pub public_dir: PathBuf,
    /// Origins allowed to make credentialed cross-origin requests.
    pub cors_origins: Vec<String>,
    /// Password hashing cost.
    pub hashing: HashingParams,
    /// Rate limit for signup and login. `None` disables it.
    pub auth_rate_limit: Option<AuthRateLimit>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            storage: StorageBackend::Memory,
            run_migrations: true,
            session_duration_days: 7,
            session_cookie_name: "SESSION_ID".to_string(),
            secure_cookies: false,
            public_dir: PathBuf::from("public"),
            cors_origins: vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
                "http://[::1]:3000".to_string(),
            ],
            hashing: HashingParams::default(),
            auth_rate_limit: Some(AuthRateLimit {
                period_secs: 2,
                burst: 10,
            }),
        }
    }
}

fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid {}: {:?}", name, raw)),
        Err(_) => Ok(default),
    }
}

impl Config {
    /// Creates a new `Config` from environment variables, falling back to
    /// [`Config::default`] for anything unset.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `Config`.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let storage = match env::var("DATABASE_URL") {
            Ok(database_url) if !database_url.trim().is_empty() => StorageBackend::Postgres {
                database_url,
                redis_url: env::var("REDIS_URL")
                    .unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string()),
            },
            _ => StorageBackend::Memory,
        };

        let session_duration_days: i64 =
            parse_var("SESSION_DURATION_DAYS", defaults.session_duration_days)?;
        if session_duration_days <= 0 {
            anyhow::bail!("SESSION_DURATION_DAYS must be positive");
        }

        let hashing = HashingParams {
            memory_kib: parse_var("ARGON2_MEMORY_KIB", defaults.hashing.memory_kib)?,
            iterations: parse_var("ARGON2_ITERATIONS", defaults.hashing.iterations)?,
            parallelism: parse_var("ARGON2_PARALLELISM", defaults.hashing.parallelism)?,
            max_concurrent: parse_var("HASHING_CONCURRENCY", defaults.hashing.max_concurrent)?,
        };
        if hashing.max_concurrent == 0 {
            anyhow::bail!("HASHING_CONCURRENCY must be at least 1");
        }

        let default_limit = defaults.auth_rate_limit.unwrap_or(AuthRateLimit {
            period_secs: 2,
            burst: 10,
        });
        let burst: u32 = parse_var("AUTH_RATE_LIMIT_BURST", default_limit.burst)?;
        let period_secs: u64 =
            parse_var("AUTH_RATE_LIMIT_PERIOD_SECS", default_limit.period_secs)?;
        let auth_rate_limit = (burst > 0 && period_secs > 0).then_some(AuthRateLimit {
            period_secs,
            burst,
        });

        let cors_origins = match env::var("CORS_ORIGINS") {
            Ok(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(String::from)
                .collect(),
            Err(_) => defaults.cors_origins,
        };

        Ok(Self {
            bind_addr: parse_var("BIND_ADDR", defaults.bind_addr)?,
            storage,
            run_migrations: parse_var("RUN_MIGRATIONS", defaults.run_migrations)?,
            session_duration_days,
            session_cookie_name: env::var("SESSION_COOKIE_NAME")
                .unwrap_or(defaults.session_cookie_name),
            secure_cookies: env::var("APP_ENV")
                .map(|app_env| app_env == "production")
                .unwrap_or(false),
            public_dir: env::var("PUBLIC_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.public_dir),
            cors_origins,
            hashing,
            auth_rate_limit,
        })
    }

    /// The session lifetime as a `chrono` duration.
    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::days(self.session_duration_days)
    }
}
