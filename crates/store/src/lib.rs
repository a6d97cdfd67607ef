//! Shared TTL key-value store contract and implementations.
//!
//! Every piece of cross-worker coordination in the platform goes through a
//! single string store with per-key expiry: identity records, GPS overrides,
//! cooldown markers, pending-QR markers, and the QR URL cache. The contract
//! is deliberately small -- `set`/`get`/`delete`/`expire`/`scan` -- and every
//! key is safe to overwrite or lose, so no transactional primitives are
//! required.
//!
//! [`RedisStore`] is the production implementation. [`MemoryStore`] is a
//! TTL-aware in-memory implementation for tests.

pub mod keys;
mod memory;
mod redis_store;

use std::time::Duration;

pub use memory::MemoryStore;
pub use redis_store::RedisStore;

/// Errors from the store layer.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The underlying Redis command failed.
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

/// String store with independent per-entry expiry.
///
/// All coordination against the store is advisory (check-then-act) or
/// TTL-based; callers must tolerate lost or concurrently-overwritten
/// entries.
#[async_trait::async_trait]
pub trait TtlStore: Send + Sync + 'static {
    /// Write `value` under `key`. `ttl = None` means the entry never expires.
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StoreError>;

    /// Read the value under `key`, or `None` if absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Remove `key`. Removing an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// Overwrite the remaining lifetime of an existing entry.
    ///
    /// Returns `false` when the key does not exist.
    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, StoreError>;

    /// List all keys matching a glob-style pattern (e.g. `autosign:user:*`).
    async fn scan(&self, pattern: &str) -> Result<Vec<String>, StoreError>;
}
