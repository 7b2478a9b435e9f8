//! Info result cache backed by Redis.
//!
//! Entries are MessagePack-encoded [`VideoSchema`] values keyed by a hash of
//! the link the client sent, so repeated lookups skip redirect resolution too.

use deadpool_redis::redis::AsyncCommands;
use deadpool_redis::Pool;
use xxhash_rust::xxh3::xxh3_128;

use crate::error::AppResult;
use crate::models::VideoSchema;

/// Redis-backed cache of `/info` results.
#[derive(Clone)]
pub struct InfoCache {
    pool: Pool,
    ttl_secs: u64,
}

impl InfoCache {
    pub const fn new(pool: Pool, ttl_secs: u64) -> Self {
        Self { pool, ttl_secs }
    }

    /// Cache key for a client supplied link.
    pub fn key_for(url: &str) -> String {
        format!("info:{:032x}", xxh3_128(url.trim().as_bytes()))
    }

    /// Returns the cached schema for `url`, if present and decodable.
    pub async fn get(&self, url: &str) -> AppResult<Option<VideoSchema>> {
        let key = Self::key_for(url);
        let mut conn = self.pool.get().await?;
        let cached: Option<Vec<u8>> = conn.get(&key).await?;

        Ok(cached.and_then(|bytes| match rmp_serde::from_slice::<VideoSchema>(&bytes) {
            Ok(schema) => Some(schema),
            Err(e) => {
                tracing::warn!(cache_key = %key, error = %e, "Discarding undecodable cache entry");
                None
            }
        }))
    }

    /// Stores `schema` for `url` with the configured TTL.
    pub async fn put(&self, url: &str, schema: &VideoSchema) -> AppResult<()> {
        let key = Self::key_for(url);
        let data = rmp_serde::to_vec(schema)
            .map_err(|e| crate::error::AppError::Internal(format!("Cache encode error: {e}")))?;

        let mut conn = self.pool.get().await?;
        let () = conn.set_ex(&key, data, self.ttl_secs).await?;
        Ok(())
    }

    /// Whether a connection can be checked out of the pool.
    pub async fn is_reachable(&self) -> bool {
        self.pool.get().await.is_ok()
    }
}
