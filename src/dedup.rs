//! Durable set of already-delivered content hashes.
//!
//! The store is the single writer of the seen-set and exposes exactly two
//! operations: membership and insertion. The cycle controller checks
//! `contains` strictly before composing a record and calls `add` strictly
//! after a successful delivery, so a failed publish leaves the hash absent
//! and the URL eligible for retry on a later cycle.
//!
//! The production backing is a Redis set shared across process instances and
//! restarts. Inserts are single atomic commands; there is no multi-step
//! transaction to corrupt on shutdown. The set grows without eviction; the
//! key is configurable so operators can rotate to a fresh set out-of-band.

use crate::models::ContentHash;
use redis::AsyncCommands;
use std::collections::HashSet;
use std::sync::Mutex;
use thiserror::Error;
use tracing::{debug, instrument};

/// Dedup-store failure. Treated as configuration-class by the cycle
/// controller: the cycle aborts cleanly rather than publishing without a
/// recorded hash.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("dedup store error: {0}")]
    Backend(#[from] redis::RedisError),
}

/// The durable seen-hash set.
#[async_trait::async_trait]
pub trait SeenStore: Send + Sync {
    /// Whether `hash` was already delivered in some prior cycle.
    async fn contains(&self, hash: &ContentHash) -> Result<bool, StoreError>;

    /// Record `hash` as delivered. Called only after a publish success.
    async fn add(&self, hash: &ContentHash) -> Result<(), StoreError>;
}

/// Redis-backed seen-set shared across instances and restarts.
pub struct RedisSeenStore {
    manager: redis::aio::ConnectionManager,
    set_key: String,
}

impl RedisSeenStore {
    /// Connect to the shared Redis instance.
    ///
    /// # Arguments
    ///
    /// * `redis_url` - Connection address, e.g. `redis://host:6379`
    /// * `set_key` - Name of the set holding delivered hashes
    pub async fn connect(redis_url: &str, set_key: String) -> Result<Self, StoreError> {
        let client = redis::Client::open(redis_url)?;
        let manager = client.get_connection_manager().await?;
        Ok(Self { manager, set_key })
    }
}

#[async_trait::async_trait]
impl SeenStore for RedisSeenStore {
    #[instrument(level = "debug", skip_all, fields(hash = %hash))]
    async fn contains(&self, hash: &ContentHash) -> Result<bool, StoreError> {
        let mut conn = self.manager.clone();
        let member: bool = conn.sismember(&self.set_key, hash.as_str()).await?;
        debug!(member, "Checked seen-set membership");
        Ok(member)
    }

    #[instrument(level = "debug", skip_all, fields(hash = %hash))]
    async fn add(&self, hash: &ContentHash) -> Result<(), StoreError> {
        let mut conn = self.manager.clone();
        let _: i64 = conn.sadd(&self.set_key, hash.as_str()).await?;
        debug!("Recorded hash in seen-set");
        Ok(())
    }
}

/// In-memory seen-set for tests and single-process runs.
#[derive(Default)]
pub struct MemorySeenStore {
    hashes: Mutex<HashSet<String>>,
}

impl MemorySeenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of recorded hashes.
    pub fn len(&self) -> usize {
        self.hashes.lock().expect("seen-set lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait::async_trait]
impl SeenStore for MemorySeenStore {
    async fn contains(&self, hash: &ContentHash) -> Result<bool, StoreError> {
        Ok(self
            .hashes
            .lock()
            .expect("seen-set lock poisoned")
            .contains(hash.as_str()))
    }

    async fn add(&self, hash: &ContentHash) -> Result<(), StoreError> {
        self.hashes
            .lock()
            .expect("seen-set lock poisoned")
            .insert(hash.as_str().to_string());
        Ok(())
    }
}
