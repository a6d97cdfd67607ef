//! Redis-backed [`TtlStore`] implementation.
//!
//! Uses a multiplexed [`ConnectionManager`], which transparently reconnects
//! and is cheap to clone per command. TTLs are passed through to Redis
//! (`SET` / `SETEX` / `EXPIRE`); sub-second durations are rounded up to one
//! second, the smallest expiry Redis supports here.

use std::time::Duration;

use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use crate::{StoreError, TtlStore};

/// Production store client.
#[derive(Clone)]
pub struct RedisStore {
    connection: ConnectionManager,
}

impl RedisStore {
    /// Connect to Redis at `redis_url` (e.g. `redis://localhost:6379/0`).
    ///
    /// Fails fast when the server is unreachable so the binary can refuse
    /// to start against a missing store.
    pub async fn connect(redis_url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(redis_url)?;
        let connection = client.get_connection_manager().await?;
        tracing::info!("Connected to Redis store");
        Ok(Self { connection })
    }

    fn ttl_secs(ttl: Duration) -> u64 {
        ttl.as_secs().max(1)
    }
}

#[async_trait::async_trait]
impl TtlStore for RedisStore {
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StoreError> {
        let mut conn = self.connection.clone();
        match ttl {
            Some(ttl) => {
                let _: () = conn.set_ex(key, value, Self::ttl_secs(ttl)).await?;
            }
            None => {
                let _: () = conn.set(key, value).await?;
            }
        }
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.connection.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut conn = self.connection.clone();
        let _: () = conn.del(key).await?;
        Ok(())
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, StoreError> {
        let mut conn = self.connection.clone();
        let updated: bool = conn.expire(key, Self::ttl_secs(ttl) as i64).await?;
        Ok(updated)
    }

    async fn scan(&self, pattern: &str) -> Result<Vec<String>, StoreError> {
        let mut conn = self.connection.clone();
        let mut keys = Vec::new();
        let mut iter = conn.scan_match::<_, String>(pattern).await?;
        while let Some(key) = iter.next_item().await {
            keys.push(key);
        }
        Ok(keys)
    }
}
