//! Freshness windows and query snapshots.
//!
//! Every query carries a staleness window (how long fetched data counts as
//! fresh) and a retention window (how long an unobserved entry is kept in
//! memory). Reads return a [`QueryResult<T>`] that makes the state of the
//! entry explicit instead of handing out bare values.

use chrono::{DateTime, Utc};
use libris_core::{LibrisError, Timestamp};
use std::time::Duration;

/// Per-query option overrides. Unset fields fall back to the scope defaults,
/// then to the cache-wide defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryOptions {
    pub stale_time: Option<Duration>,
    pub gc_time: Option<Duration>,
    /// Whether the entry may be written to durable storage.
    pub persist: bool,
}

/// Defaults registered for every key of one scope.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryDefaults {
    pub stale_time: Option<Duration>,
    pub gc_time: Option<Duration>,
}

impl QueryDefaults {
    pub fn with_stale_time(mut self, duration: Duration) -> Self {
        self.stale_time = Some(duration);
        self
    }

    pub fn with_gc_time(mut self, duration: Duration) -> Self {
        self.gc_time = Some(duration);
        self
    }
}

/// Options after defaults have been applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedOptions {
    pub stale_time: Duration,
    pub gc_time: Duration,
    pub persist: bool,
}

/// Returns true once `stale_time` has elapsed since `updated_at`.
///
/// A zero window means data is stale as soon as it lands.
pub fn is_stale(updated_at: DateTime<Utc>, stale_time: Duration, now: DateTime<Utc>) -> bool {
    age(updated_at, now) >= stale_time
}

/// Time elapsed since `since`, clamped at zero for timestamps in the future.
pub fn age(since: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    now.signed_duration_since(since)
        .to_std()
        .unwrap_or(Duration::ZERO)
}

/// Lifecycle of a query's data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
    /// No data yet.
    Pending,
    /// The last fetch failed.
    Error,
    /// Data is available.
    Success,
}

/// Whether a request for the key is currently running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStatus {
    Fetching,
    Idle,
}

/// Snapshot of a query as seen by one observer.
#[derive(Debug, Clone)]
pub struct QueryResult<T> {
    pub status: QueryStatus,
    pub fetch_status: FetchStatus,
    pub data: Option<T>,
    pub error: Option<LibrisError>,
    pub data_updated_at: Option<Timestamp>,
    /// Data belongs to a previous key and is shown while this one loads.
    pub is_placeholder_data: bool,
    pub is_stale: bool,
}

impl<T> QueryResult<T> {
    pub fn pending(fetch_status: FetchStatus) -> Self {
        Self {
            status: QueryStatus::Pending,
            fetch_status,
            data: None,
            error: None,
            data_updated_at: None,
            is_placeholder_data: false,
            is_stale: true,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == QueryStatus::Pending
    }

    pub fn is_error(&self) -> bool {
        self.status == QueryStatus::Error
    }

    pub fn is_success(&self) -> bool {
        self.status == QueryStatus::Success
    }

    pub fn is_fetching(&self) -> bool {
        self.fetch_status == FetchStatus::Fetching
    }

    /// Map the inner value to a new type.
    pub fn map<U, F>(self, f: F) -> QueryResult<U>
    where
        F: FnOnce(T) -> U,
    {
        QueryResult {
            status: self.status,
            fetch_status: self.fetch_status,
            data: self.data.map(f),
            error: self.error,
            data_updated_at: self.data_updated_at,
            is_placeholder_data: self.is_placeholder_data,
            is_stale: self.is_stale,
        }
    }
}
