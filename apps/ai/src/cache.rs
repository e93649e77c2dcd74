//! Cache gateway for AI results.
//!
//! Two implementations behind one trait: [`RedisCache`] (real store) and
//! [`NullCache`] (always misses, drops writes). The cache is strictly an
//! optimization: every backend failure is swallowed and treated as a miss
//! or a no-op, so the primary call path can never be blocked or failed by it.

use std::sync::Arc;

use async_trait::async_trait;
use redis::AsyncCommands;
use serde_json::Value;
use tracing::{debug, info, warn};

/// Fixed TTL for all cached AI results (24 hours).
pub const CACHE_TTL_SECS: u64 = 86_400;

#[async_trait]
pub trait ResultCache: Send + Sync {
    async fn get(&self, key: &str) -> Option<String>;
    async fn set(&self, key: &str, value: &str, ttl_secs: u64);

    /// Reads and deserializes an entry. Unreadable payloads count as misses.
    async fn get_json(&self, key: &str) -> Option<Value> {
        let raw = self.get(key).await?;
        match serde_json::from_str(&raw) {
            Ok(v) => Some(v),
            Err(e) => {
                debug!("discarding unreadable cache entry '{key}': {e}");
                None
            }
        }
    }

    /// Serializes and stores an entry, best-effort.
    async fn set_json(&self, key: &str, value: &Value, ttl_secs: u64) {
        match serde_json::to_string(value) {
            Ok(s) => self.set(key, &s, ttl_secs).await,
            Err(e) => debug!("could not serialize cache entry '{key}': {e}"),
        }
    }
}

/// Redis-backed cache. Connections are established per call through the
/// client's multiplexed pool; any Redis error degrades to a miss/no-op.
pub struct RedisCache {
    client: redis::Client,
}

impl RedisCache {
    /// Opens the client and verifies the server with a PING.
    pub async fn connect(redis_url: &str) -> anyhow::Result<Self> {
        let client = redis::Client::open(redis_url)?;
        let mut conn = client.get_multiplexed_async_connection().await?;
        redis::cmd("PING").query_async::<_, String>(&mut conn).await?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ResultCache for RedisCache {
    async fn get(&self, key: &str) -> Option<String> {
        let mut conn = match self.client.get_multiplexed_async_connection().await {
            Ok(c) => c,
            Err(e) => {
                debug!("cache read skipped, no connection: {e}");
                return None;
            }
        };
        match conn.get::<_, Option<String>>(key).await {
            Ok(v) => v,
            Err(e) => {
                debug!("cache read failed for '{key}': {e}");
                None
            }
        }
    }

    async fn set(&self, key: &str, value: &str, ttl_secs: u64) {
        let mut conn = match self.client.get_multiplexed_async_connection().await {
            Ok(c) => c,
            Err(e) => {
                debug!("cache write skipped, no connection: {e}");
                return;
            }
        };
        if let Err(e) = conn.set_ex::<_, _, ()>(key, value, ttl_secs).await {
            debug!("cache write failed for '{key}': {e}");
        }
    }
}

/// No-op cache used when Redis is not configured or unreachable.
pub struct NullCache;

#[async_trait]
impl ResultCache for NullCache {
    async fn get(&self, _key: &str) -> Option<String> {
        None
    }

    async fn set(&self, _key: &str, _value: &str, _ttl_secs: u64) {}
}

/// Factory: selects the cache implementation from configuration presence.
/// A missing URL or a failed initial PING both select [`NullCache`].
pub async fn connect(redis_url: Option<&str>) -> Arc<dyn ResultCache> {
    let Some(url) = redis_url else {
        info!("no REDIS_URL configured, AI result cache disabled");
        return Arc::new(NullCache);
    };
    match RedisCache::connect(url).await {
        Ok(cache) => {
            info!("AI result cache connected");
            Arc::new(cache)
        }
        Err(e) => {
            warn!("Redis unavailable, AI result cache disabled: {e}");
            Arc::new(NullCache)
        }
    }
}
