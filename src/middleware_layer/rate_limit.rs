use std::sync::Arc;

use axum::Router;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};

use crate::config::AuthRateLimit;

/// Puts a per-client-IP limiter in front of `router`.
///
/// Clients over the limit get `429 Too Many Requests` with `x-ratelimit-*`
/// headers. The peer address comes from `ConnectInfo`, so the server must be
/// started with `into_make_service_with_connect_info`.
///
/// # Arguments
///
/// * `router` - The routes to protect.
/// * `limit` - The limit to apply; `None` returns the router untouched.
pub fn limit_per_ip<S>(router: Router<S>, limit: Option<AuthRateLimit>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    let Some(limit) = limit else {
        return router;
    };

    let config = GovernorConfigBuilder::default()
        .per_second(limit.period_secs)
        .burst_size(limit.burst)
        .use_headers()
        .finish();

    match config {
        Some(config) => {
            tracing::info!(
                "✅ Auth rate limit: burst {}, one request every {}s",
                limit.burst,
                limit.period_secs
            );
            router.layer(GovernorLayer::new(Arc::new(config)))
        }
        None => {
            tracing::error!("❌ Invalid auth rate limit {:?}, limiter disabled", limit);
            router
        }
    }
}
