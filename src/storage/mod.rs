//! TTL key-value storage
//!
//! [`KvStore`] is the raw, string-valued primitive set every backend offers.
//! [`StateStore`] layers typed activation records on top of it.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use crate::clock::Clock;
use crate::config::{StoreBackend, StoreConfig};
use crate::errors::Result;

pub mod backend;
pub mod models;
mod state;

pub use backend::{MemoryStore, RedisStore};
pub use models::{
    ACTIVE_TTL_SECS, ActiveLease, BlacklistEntry, KICK_TTL_SECS, KickSignal, Namespace,
    PENDING_TTL_SECS, PendingGrant, StateRecord,
};
pub use state::{CasToken, StateStore};

/// Remaining lifetime of a key, as reported by the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyTtl {
    Missing,
    /// Present without expiry
    Persistent,
    Expires(Duration),
}

/// One page of a cursor scan. `next_cursor == 0` ends the iteration.
#[derive(Debug, Clone, Default)]
pub struct ScanPage {
    pub next_cursor: u64,
    pub keys: Vec<String>,
}

#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()>;

    /// Atomic create-if-absent. Returns `false` when the key already exists.
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<bool>;

    /// Returns whether a key was removed.
    async fn delete(&self, key: &str) -> Result<bool>;

    async fn ttl(&self, key: &str) -> Result<KeyTtl>;

    /// Cursor scan over keys starting with `prefix`. Start with cursor 0;
    /// keys may repeat across pages.
    async fn scan(&self, prefix: &str, cursor: u64, count: usize) -> Result<ScanPage>;

    /// Atomically: if `from` currently holds exactly `expected`, delete it and
    /// write `value` under `to`. Returns `false` (and changes nothing) otherwise.
    async fn compare_and_move(
        &self,
        from: &str,
        expected: &str,
        to: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<bool>;

    async fn ping(&self) -> Result<()>;

    fn backend_name(&self) -> &'static str;
}

pub struct StorageFactory;

impl StorageFactory {
    pub async fn create(config: &StoreConfig, clock: Arc<dyn Clock>) -> Result<Arc<dyn KvStore>> {
        let store: Arc<dyn KvStore> = match config.backend {
            StoreBackend::Memory => Arc::new(MemoryStore::new(clock)),
            StoreBackend::Redis => Arc::new(RedisStore::connect(&config.redis).await?),
        };
        info!("Using storage backend: {}", store.backend_name());
        Ok(store)
    }
}
