//! Restore on startup and throttled background writes.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use libris_core::{LibrisResult, PERSIST_MAX_AGE, PERSIST_THROTTLE};
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::task::JoinHandle;

use super::snapshot::{dehydrate, hydrate};
use super::Persister;
use crate::cache::QueryClient;

/// Persistence settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistOptions {
    /// Snapshots older than this are discarded on restore.
    pub max_age: Duration,
    /// Minimum spacing between two writes.
    pub throttle: Duration,
    /// Bump to invalidate every snapshot written by an earlier build.
    pub buster: String,
}

impl Default for PersistOptions {
    fn default() -> Self {
        Self {
            max_age: PERSIST_MAX_AGE,
            throttle: PERSIST_THROTTLE,
            buster: String::new(),
        }
    }
}

impl PersistOptions {
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    pub fn with_throttle(mut self, throttle: Duration) -> Self {
        self.throttle = throttle;
        self
    }

    pub fn with_buster(mut self, buster: impl Into<String>) -> Self {
        self.buster = buster.into();
        self
    }
}

/// Load the stored snapshot into `client`.
///
/// An unreadable, expired or busted snapshot is removed from the store and
/// the cache starts empty. Returns the number of restored entries.
pub async fn restore_client<P>(
    client: &QueryClient,
    persister: &P,
    options: &PersistOptions,
) -> LibrisResult<usize>
where
    P: Persister + ?Sized,
{
    let snapshot = match persister.restore().await {
        Ok(Some(snapshot)) => snapshot,
        Ok(None) => return Ok(0),
        Err(err) => {
            tracing::warn!(error = %err, "Discarding unreadable cache snapshot");
            persister.remove().await?;
            return Ok(0);
        }
    };

    if snapshot.buster != options.buster {
        tracing::info!(
            stored = %snapshot.buster,
            expected = %options.buster,
            "Discarding cache snapshot from another build"
        );
        persister.remove().await?;
        return Ok(0);
    }

    if snapshot.is_expired(options.max_age, Utc::now()) {
        tracing::info!(taken_at = %snapshot.timestamp, "Discarding expired cache snapshot");
        persister.remove().await?;
        return Ok(0);
    }

    let restored = hydrate(client, &snapshot)?;
    tracing::info!(restored, "Restored query cache");
    Ok(restored)
}

/// Write a snapshot of `client` now.
pub async fn persist_client<P>(
    client: &QueryClient,
    persister: &P,
    options: &PersistOptions,
) -> LibrisResult<()>
where
    P: Persister + ?Sized,
{
    let snapshot = dehydrate(client, &options.buster)?;
    persister.persist(&snapshot).await
}

/// Write a snapshot after every cache mutation, at most once per throttle
/// window. Runs until the returned handle is aborted.
pub fn spawn_persist_task(
    client: QueryClient,
    persister: Arc<dyn Persister>,
    options: PersistOptions,
) -> JoinHandle<()> {
    let mut events = client.subscribe_events();

    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(_) => {}
                Err(RecvError::Lagged(n)) => {
                    tracing::debug!(lagged = n, "Persist task lagged behind cache events");
                }
                Err(RecvError::Closed) => {
                    tracing::info!("Cache event channel closed, stopping persist task");
                    break;
                }
            }

            // Fold everything that arrives within the window into one write.
            tokio::time::sleep(options.throttle).await;
            let mut closed = false;
            loop {
                match events.try_recv() {
                    Ok(_) | Err(TryRecvError::Lagged(_)) => continue,
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Closed) => {
                        closed = true;
                        break;
                    }
                }
            }

            if let Err(err) = persist_client(&client, persister.as_ref(), &options).await {
                tracing::warn!(error = %err, "Failed to persist query cache");
            }
            if closed {
                break;
            }
        }
    })
}
