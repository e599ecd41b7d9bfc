//! LMDB-backed persister.
//!
//! Uses the heed crate (Rust bindings for LMDB). The whole cache snapshot is
//! one JSON value stored under a single namespace key, so a write replaces
//! the previous snapshot atomically.

use std::path::Path;

use async_trait::async_trait;
use heed::types::{Bytes, Str};
use heed::{Database, Env, EnvOpenOptions};
use libris_core::{LibrisResult, PersistError, STORAGE_NAMESPACE};

use super::snapshot::PersistedClient;
use super::Persister;

fn transaction(e: heed::Error) -> PersistError {
    PersistError::Transaction {
        reason: e.to_string(),
    }
}

/// Snapshot store in an LMDB environment.
pub struct LmdbPersister {
    env: Env,
    db: Database<Str, Bytes>,
    key: String,
}

impl LmdbPersister {
    /// Open (or create) the store at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the LMDB
    /// environment cannot be opened.
    pub fn open<P: AsRef<Path>>(path: P, max_size_mb: usize) -> Result<Self, PersistError> {
        std::fs::create_dir_all(&path).map_err(|e| PersistError::Open {
            reason: e.to_string(),
        })?;

        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(max_size_mb.max(1) * 1024 * 1024)
                .max_dbs(1)
                .open(path.as_ref())
        }
        .map_err(|e| PersistError::Open {
            reason: e.to_string(),
        })?;

        let mut wtxn = env.write_txn().map_err(transaction)?;
        let db: Database<Str, Bytes> = env
            .create_database(&mut wtxn, None)
            .map_err(|e| PersistError::Open {
                reason: e.to_string(),
            })?;
        wtxn.commit().map_err(transaction)?;

        tracing::debug!(path = %path.as_ref().display(), "Opened persisted cache store");
        Ok(Self {
            env,
            db,
            key: STORAGE_NAMESPACE.to_string(),
        })
    }

    /// Store snapshots under `key` instead of the default namespace.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    fn read_bytes(&self) -> Result<Option<Vec<u8>>, PersistError> {
        let rtxn = self.env.read_txn().map_err(transaction)?;
        let bytes = self
            .db
            .get(&rtxn, self.key.as_str())
            .map_err(transaction)?
            .map(<[u8]>::to_vec);
        Ok(bytes)
    }

    fn write_bytes(&self, bytes: &[u8]) -> Result<(), PersistError> {
        let mut wtxn = self.env.write_txn().map_err(transaction)?;
        self.db.put(&mut wtxn, self.key.as_str(), bytes).map_err(transaction)?;
        wtxn.commit().map_err(transaction)
    }

    fn delete(&self) -> Result<bool, PersistError> {
        let mut wtxn = self.env.write_txn().map_err(transaction)?;
        let deleted = self.db.delete(&mut wtxn, self.key.as_str()).map_err(transaction)?;
        wtxn.commit().map_err(transaction)?;
        Ok(deleted)
    }
}

#[async_trait]
impl Persister for LmdbPersister {
    async fn persist(&self, client: &PersistedClient) -> LibrisResult<()> {
        let bytes = client.to_bytes()?;
        self.write_bytes(&bytes)?;
        tracing::trace!(queries = client.queries.len(), bytes = bytes.len(), "Persisted cache");
        Ok(())
    }

    async fn restore(&self) -> LibrisResult<Option<PersistedClient>> {
        match self.read_bytes()? {
            Some(bytes) => Ok(Some(PersistedClient::from_bytes(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn remove(&self) -> LibrisResult<()> {
        self.delete()?;
        Ok(())
    }
}
