//! Redis cache configuration module.
//!
//! The cache is optional: when `CACHE_ENABLED` is not `true` no pool is built
//! and info lookups always go to Kuaishou.

use crate::config::env::{get_env, APP_CONFIG};
use crate::error::{AppError, AppResult};
use deadpool_redis::{Config, Pool, PoolConfig, Runtime};
use once_cell::sync::OnceCell;

static CACHE_POOL: OnceCell<Pool> = OnceCell::new();

/// Builds the Redis URL from `REDIS_HOST`, `REDIS_PORT` and `REDIS_PASSWORD`.
fn redis_url() -> String {
    let host = get_env("REDIS_HOST", Some("localhost"));
    let port = get_env("REDIS_PORT", Some("6379"));
    let password = get_env("REDIS_PASSWORD", None);

    if password.is_empty() {
        format!("redis://{host}:{port}")
    } else {
        format!("redis://:{password}@{host}:{port}")
    }
}

/// Initializes the Redis connection pool when caching is enabled.
///
/// Subsequent calls return a clone of the same pool.
///
/// # Errors
///
/// Returns an error if caching is enabled but the connection cannot be established
pub async fn init_cache() -> AppResult<Option<Pool>> {
    if !APP_CONFIG.cache_enabled {
        tracing::info!("Info cache disabled");
        return Ok(None);
    }

    if let Some(pool) = CACHE_POOL.get() {
        return Ok(Some(pool.clone()));
    }

    let mut cfg = Config::from_url(redis_url());
    cfg.pool = Some(PoolConfig {
        max_size: APP_CONFIG.redis_max_connections,
        ..PoolConfig::default()
    });

    let pool = cfg
        .create_pool(Some(Runtime::Tokio1))
        .map_err(|e| AppError::Internal(format!("Redis pool error: {e}")))?;

    // Test connection
    let conn = pool
        .get()
        .await
        .map_err(|e| AppError::Internal(format!("Redis connection test failed: {e}")))?;
    drop(conn);

    CACHE_POOL.set(pool.clone()).ok();
    tracing::info!(
        max_connections = APP_CONFIG.redis_max_connections,
        ttl_secs = APP_CONFIG.cache_ttl_secs,
        "Redis connection pool established"
    );

    Ok(Some(pool))
}

/// Closes the Redis connection pool.
///
/// Note: The pool handles cleanup automatically when dropped.
pub fn close_cache() {
    if let Some(pool) = CACHE_POOL.get() {
        pool.close();
        tracing::info!("Redis connection pool closed");
    }
}
