//! Durable persistence of the query cache.
//!
//! The cache is dehydrated into a [`PersistedClient`] snapshot and handed to
//! a [`Persister`]. On startup the snapshot is restored before the first
//! render, unless it is too old or was written by an incompatible build.

pub mod lmdb;
pub mod snapshot;
pub mod task;

use std::sync::RwLock;

use async_trait::async_trait;
use libris_core::{CacheError, LibrisResult};

pub use lmdb::LmdbPersister;
pub use snapshot::{dehydrate, hydrate, DehydratedQuery, PersistedClient};
pub use task::{persist_client, restore_client, spawn_persist_task, PersistOptions};

/// Durable store for one cache snapshot.
#[async_trait]
pub trait Persister: Send + Sync {
    /// Replace the stored snapshot.
    async fn persist(&self, client: &PersistedClient) -> LibrisResult<()>;

    /// The stored snapshot, if any.
    async fn restore(&self) -> LibrisResult<Option<PersistedClient>>;

    /// Delete the stored snapshot.
    async fn remove(&self) -> LibrisResult<()>;
}

/// Persister that keeps the snapshot in memory.
#[derive(Debug, Default)]
pub struct MemoryPersister {
    snapshot: RwLock<Option<PersistedClient>>,
}

impl MemoryPersister {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with `snapshot` already stored.
    pub fn with_snapshot(snapshot: PersistedClient) -> Self {
        Self {
            snapshot: RwLock::new(Some(snapshot)),
        }
    }

    pub fn snapshot(&self) -> Option<PersistedClient> {
        self.snapshot.read().ok().and_then(|guard| guard.clone())
    }
}

#[async_trait]
impl Persister for MemoryPersister {
    async fn persist(&self, client: &PersistedClient) -> LibrisResult<()> {
        let mut guard = self
            .snapshot
            .write()
            .map_err(|_| CacheError::LockPoisoned)?;
        *guard = Some(client.clone());
        Ok(())
    }

    async fn restore(&self) -> LibrisResult<Option<PersistedClient>> {
        Ok(self.snapshot())
    }

    async fn remove(&self) -> LibrisResult<()> {
        let mut guard = self
            .snapshot
            .write()
            .map_err(|_| CacheError::LockPoisoned)?;
        *guard = None;
        Ok(())
    }
}
