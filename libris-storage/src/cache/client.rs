//! Query client: the one cache instance every view reads through.
//!
//! Reads are routed by freshness: fresh data is served from memory, stale or
//! missing data triggers a fetch. Concurrent fetches for one key share a
//! single in-flight future, so the catalog sees one request no matter how
//! many callers ask.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use chrono::Utc;
use futures_util::future::{BoxFuture, FutureExt, Shared};
use libris_core::{
    CacheError, LibrisError, LibrisResult, QueryKey, QueryScope, Timestamp, DEFAULT_GC_TIME,
    DEFAULT_STALE_TIME,
};
use tokio::sync::broadcast;

use super::descriptor::QueryDescriptor;
use super::freshness::{
    age, is_stale, FetchStatus, QueryDefaults, QueryOptions, QueryResult, QueryStatus,
    ResolvedOptions,
};
use super::observer::QueryObserver;
use super::traits::{CacheStats, Cacheable, QueryData};

/// Configuration for the query client.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Staleness window when neither the query nor its scope sets one.
    pub stale_time: Duration,
    /// Retention window when neither the query nor its scope sets one.
    pub gc_time: Duration,
    /// Capacity of the cache event channel.
    pub event_capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            stale_time: DEFAULT_STALE_TIME,
            gc_time: DEFAULT_GC_TIME,
            event_capacity: 256,
        }
    }
}

impl CacheConfig {
    /// Create a new cache config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default staleness window.
    pub fn with_stale_time(mut self, duration: Duration) -> Self {
        self.stale_time = duration;
        self
    }

    /// Set the default retention window.
    pub fn with_gc_time(mut self, duration: Duration) -> Self {
        self.gc_time = duration;
        self
    }

    /// Set the event channel capacity.
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }
}

/// Mutation notifications, sent after the cache lock is released.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEvent {
    Updated(QueryKey),
    Removed(QueryKey),
    Cleared,
}

type SharedFetch = Shared<BoxFuture<'static, LibrisResult<QueryData>>>;

#[derive(Debug, Clone)]
struct QueryEntry {
    data: Option<QueryData>,
    data_updated_at: Option<Timestamp>,
    error: Option<LibrisError>,
    /// Forces the next read to refetch regardless of age.
    invalidated: bool,
    options: ResolvedOptions,
    observers: usize,
    /// Start of the retention clock; meaningful only while `observers == 0`.
    inactive_since: Timestamp,
}

impl QueryEntry {
    fn new(options: ResolvedOptions, now: Timestamp) -> Self {
        Self {
            data: None,
            data_updated_at: None,
            error: None,
            invalidated: false,
            options,
            observers: 0,
            inactive_since: now,
        }
    }

    fn is_stale(&self, now: Timestamp) -> bool {
        if self.invalidated {
            return true;
        }
        match self.data_updated_at {
            Some(updated_at) => is_stale(updated_at, self.options.stale_time, now),
            None => true,
        }
    }

    fn store(&mut self, data: QueryData, updated_at: Timestamp) {
        self.data = Some(data);
        self.data_updated_at = Some(updated_at);
        self.error = None;
        self.invalidated = false;
    }
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<QueryKey, QueryEntry>,
    in_flight: HashMap<QueryKey, SharedFetch>,
    defaults: HashMap<QueryScope, QueryDefaults>,
    stats: CacheStats,
}

impl CacheState {
    fn resolve(&self, config: &CacheConfig, key: &QueryKey, options: &QueryOptions) -> ResolvedOptions {
        let defaults = self.defaults.get(&key.scope());
        ResolvedOptions {
            stale_time: options
                .stale_time
                .or_else(|| defaults.and_then(|d| d.stale_time))
                .unwrap_or(config.stale_time),
            gc_time: options
                .gc_time
                .or_else(|| defaults.and_then(|d| d.gc_time))
                .unwrap_or(config.gc_time),
            persist: options.persist,
        }
    }

    fn sync_entry_count(&mut self) {
        self.stats.entry_count = self.entries.len() as u64;
    }
}

struct Inner {
    config: CacheConfig,
    state: RwLock<CacheState>,
    events: broadcast::Sender<CacheEvent>,
}

impl Inner {
    fn read(&self) -> LibrisResult<RwLockReadGuard<'_, CacheState>> {
        self.state
            .read()
            .map_err(|_| LibrisError::from(CacheError::LockPoisoned))
    }

    fn write(&self) -> LibrisResult<RwLockWriteGuard<'_, CacheState>> {
        self.state
            .write()
            .map_err(|_| LibrisError::from(CacheError::LockPoisoned))
    }

    fn emit(&self, event: CacheEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn complete(&self, key: &QueryKey, options: ResolvedOptions, result: &LibrisResult<QueryData>) {
        {
            let Ok(mut guard) = self.state.write() else {
                return;
            };
            let state = &mut *guard;
            state.in_flight.remove(key);
            let now = Utc::now();
            let entry = state
                .entries
                .entry(key.clone())
                .or_insert_with(|| QueryEntry::new(options, now));
            match result {
                Ok(data) => {
                    tracing::debug!(%key, "Fetch succeeded");
                    entry.store(data.clone(), now);
                }
                Err(err) => {
                    tracing::debug!(%key, error = %err, "Fetch failed");
                    entry.error = Some(err.clone());
                }
            }
            if entry.observers == 0 {
                entry.inactive_since = now;
            }
            state.sync_entry_count();
        }
        self.emit(CacheEvent::Updated(key.clone()));
    }
}

/// Handle to the shared query cache. Cloning is cheap.
#[derive(Clone)]
pub struct QueryClient {
    inner: Arc<Inner>,
}

impl Default for QueryClient {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl QueryClient {
    /// Create a new query client.
    pub fn new(config: CacheConfig) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        Self {
            inner: Arc::new(Inner {
                config,
                state: RwLock::new(CacheState::default()),
                events,
            }),
        }
    }

    /// Create a new query client with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(CacheConfig::default())
    }

    /// Get the cache configuration.
    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    /// Receive a [`CacheEvent`] for every mutation from now on.
    pub fn subscribe_events(&self) -> broadcast::Receiver<CacheEvent> {
        self.inner.events.subscribe()
    }

    /// Register defaults for every key of `scope`.
    pub fn set_query_defaults(&self, scope: QueryScope, defaults: QueryDefaults) -> LibrisResult<()> {
        self.inner.write()?.defaults.insert(scope, defaults);
        Ok(())
    }

    /// Options a descriptor ends up with after defaults are applied.
    pub fn resolve_options(&self, key: &QueryKey, options: &QueryOptions) -> LibrisResult<ResolvedOptions> {
        Ok(self.inner.read()?.resolve(&self.inner.config, key, options))
    }

    /// Cached data for `key`, fresh or not.
    pub fn get_query_data<T: Cacheable>(&self, key: &QueryKey) -> LibrisResult<Option<T>> {
        let state = self.inner.read()?;
        match state.entries.get(key).and_then(|entry| entry.data.as_ref()) {
            Some(data) => T::from_data(data)
                .map(Some)
                .ok_or_else(|| CacheError::TypeMismatch { key: key.to_string() }.into()),
            None => Ok(None),
        }
    }

    /// When the data under `key` was last written.
    pub fn data_updated_at(&self, key: &QueryKey) -> LibrisResult<Option<Timestamp>> {
        Ok(self
            .inner
            .read()?
            .entries
            .get(key)
            .and_then(|entry| entry.data_updated_at))
    }

    /// Write data under `key` as if it had just been fetched.
    pub fn set_query_data<T: Cacheable>(&self, key: QueryKey, value: T) -> LibrisResult<()> {
        {
            let mut guard = self.inner.write()?;
            let state = &mut *guard;
            let now = Utc::now();
            let options = state.resolve(&self.inner.config, &key, &QueryOptions::default());
            state
                .entries
                .entry(key.clone())
                .or_insert_with(|| QueryEntry::new(options, now))
                .store(value.into_data(), now);
            state.sync_entry_count();
        }
        self.inner.emit(CacheEvent::Updated(key));
        Ok(())
    }

    /// Return fresh cached data, or fetch it.
    pub async fn fetch_query<T: Cacheable>(&self, desc: &QueryDescriptor<T>) -> LibrisResult<T> {
        let key = desc.key();
        {
            let mut guard = self.inner.write()?;
            let state = &mut *guard;
            let now = Utc::now();
            let options = state.resolve(&self.inner.config, key, desc.options());
            if let Some(entry) = state.entries.get_mut(key) {
                entry.options = options;
                if let (Some(data), false) = (&entry.data, entry.is_stale(now)) {
                    let value = T::from_data(data)
                        .ok_or_else(|| CacheError::TypeMismatch { key: key.to_string() })?;
                    state.stats.hits += 1;
                    tracing::debug!(%key, "Cache hit");
                    return Ok(value);
                }
            }
            state.stats.misses += 1;
        }

        let data = self.start_fetch(desc)?.await?;
        T::from_data(&data).ok_or_else(|| CacheError::TypeMismatch { key: key.to_string() }.into())
    }

    /// Warm the cache for `desc`. Failures are logged and dropped.
    pub async fn prefetch_query<T: Cacheable>(&self, desc: &QueryDescriptor<T>) {
        if !desc.is_enabled() {
            return;
        }
        if let Err(err) = self.fetch_query(desc).await {
            tracing::warn!(key = %desc.key(), error = %err, "Prefetch failed");
        }
    }

    /// Start or join the request for `desc`'s key.
    fn start_fetch<T: Cacheable>(&self, desc: &QueryDescriptor<T>) -> LibrisResult<SharedFetch> {
        let key = desc.key().clone();
        let fetch = desc
            .fetch_fn()
            .ok_or_else(|| CacheError::Disabled { key: key.to_string() })?;

        let mut guard = self.inner.write()?;
        let state = &mut *guard;
        if let Some(existing) = state.in_flight.get(&key) {
            tracing::debug!(%key, "Joining in-flight request");
            return Ok(existing.clone());
        }

        let options = state.resolve(&self.inner.config, &key, desc.options());
        state.stats.fetches += 1;
        tracing::debug!(%key, "Fetching");

        let inner = Arc::clone(&self.inner);
        let fetch_key = key.clone();
        let future: BoxFuture<'static, LibrisResult<QueryData>> = async move {
            let result = fetch().await.map(T::into_data);
            inner.complete(&fetch_key, options, &result);
            result
        }
        .boxed();
        let shared = future.shared();
        state.in_flight.insert(key, shared.clone());
        Ok(shared)
    }

    /// Snapshot `desc`'s key, starting a background fetch when the data is
    /// missing or stale.
    ///
    /// `initial_data` is consulted only while the key holds neither data nor
    /// an error. Seeded data counts as stale, so the real request still goes
    /// out. An errored entry is retried once when an observer attaches to it
    /// (`attaching`); repeated reads from the same observer leave it alone.
    pub(crate) fn observe<T: Cacheable>(
        &self,
        desc: &QueryDescriptor<T>,
        initial_data: Option<&dyn Fn() -> Option<T>>,
        attaching: bool,
    ) -> LibrisResult<QueryResult<T>> {
        let key = desc.key();

        let (empty, errored) = {
            let state = self.inner.read()?;
            match state.entries.get(key) {
                Some(entry) => (entry.data.is_none(), entry.error.is_some()),
                None => (true, false),
            }
        };
        let retry = attaching && errored && desc.is_enabled();
        // Evaluated outside the lock: seeding usually reads another entry.
        let seed = if empty && (!errored || retry) {
            initial_data.and_then(|initial| initial())
        } else {
            None
        };

        let (should_fetch, seeded) = {
            let mut guard = self.inner.write()?;
            let state = &mut *guard;
            let now = Utc::now();
            let options = state.resolve(&self.inner.config, key, desc.options());
            let in_flight = state.in_flight.contains_key(key);
            let entry = state
                .entries
                .entry(key.clone())
                .or_insert_with(|| QueryEntry::new(options, now));
            entry.options = options;

            if retry && entry.error.is_some() && !in_flight {
                tracing::debug!(%key, "Retrying errored query for new observer");
                // Reads as its last data, or pending, while it retries.
                entry.error = None;
                entry.invalidated = true;
            }

            let mut seeded = false;
            if let Some(seed) = seed {
                if entry.data.is_none() && entry.error.is_none() {
                    entry.store(seed.into_data(), now);
                    entry.invalidated = true;
                    seeded = true;
                }
            }

            let should_fetch = desc.is_enabled()
                && !in_flight
                && (entry.error.is_none() || retry)
                && entry.is_stale(now);
            state.sync_entry_count();
            if should_fetch {
                state.stats.misses += 1;
            }
            (should_fetch, seeded)
        };

        if seeded {
            tracing::debug!(%key, "Seeded from initial data");
            self.inner.emit(CacheEvent::Updated(key.clone()));
        }

        if should_fetch {
            match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    let shared = self.start_fetch(desc)?;
                    handle.spawn(shared);
                }
                Err(_) => tracing::warn!(%key, "No async runtime, background fetch skipped"),
            }
        }

        self.read_result(key)
    }

    fn read_result<T: Cacheable>(&self, key: &QueryKey) -> LibrisResult<QueryResult<T>> {
        let state = self.inner.read()?;
        let fetch_status = if state.in_flight.contains_key(key) {
            FetchStatus::Fetching
        } else {
            FetchStatus::Idle
        };
        let Some(entry) = state.entries.get(key) else {
            return Ok(QueryResult::pending(fetch_status));
        };

        let data = match &entry.data {
            Some(data) => Some(
                T::from_data(data)
                    .ok_or_else(|| CacheError::TypeMismatch { key: key.to_string() })?,
            ),
            None => None,
        };
        let status = if entry.error.is_some() {
            QueryStatus::Error
        } else if data.is_some() {
            QueryStatus::Success
        } else {
            QueryStatus::Pending
        };

        Ok(QueryResult {
            status,
            fetch_status,
            data,
            error: entry.error.clone(),
            data_updated_at: entry.data_updated_at,
            is_placeholder_data: false,
            is_stale: entry.is_stale(Utc::now()),
        })
    }

    /// A new observer attached to this cache.
    pub fn subscribe<T: Cacheable>(&self) -> QueryObserver<T> {
        QueryObserver::new(self.clone())
    }

    /// Count one more observer of `key`.
    pub(crate) fn retain(&self, key: &QueryKey) {
        let Ok(mut guard) = self.inner.state.write() else {
            return;
        };
        let state = &mut *guard;
        let now = Utc::now();
        let options = state.resolve(&self.inner.config, key, &QueryOptions::default());
        state
            .entries
            .entry(key.clone())
            .or_insert_with(|| QueryEntry::new(options, now))
            .observers += 1;
        state.sync_entry_count();
    }

    /// Drop one observer of `key`; the last one starts the retention clock.
    pub(crate) fn release(&self, key: &QueryKey) {
        let Ok(mut state) = self.inner.state.write() else {
            return;
        };
        if let Some(entry) = state.entries.get_mut(key) {
            entry.observers = entry.observers.saturating_sub(1);
            if entry.observers == 0 {
                entry.inactive_since = Utc::now();
            }
        }
    }

    /// Number of observers currently attached to `key`.
    pub fn observer_count(&self, key: &QueryKey) -> usize {
        self.inner
            .read()
            .ok()
            .and_then(|state| state.entries.get(key).map(|entry| entry.observers))
            .unwrap_or(0)
    }

    /// Whether a request for `key` is running.
    pub fn is_fetching(&self, key: &QueryKey) -> bool {
        self.inner
            .read()
            .map(|state| state.in_flight.contains_key(key))
            .unwrap_or(false)
    }

    pub fn contains(&self, key: &QueryKey) -> bool {
        self.inner
            .read()
            .map(|state| state.entries.contains_key(key))
            .unwrap_or(false)
    }

    /// Mark `key` stale and clear its error so the next read refetches.
    pub fn invalidate(&self, key: &QueryKey) -> LibrisResult<()> {
        let found = {
            let mut state = self.inner.write()?;
            match state.entries.get_mut(key) {
                Some(entry) => {
                    entry.invalidated = true;
                    entry.error = None;
                    true
                }
                None => false,
            }
        };
        if found {
            self.inner.emit(CacheEvent::Updated(key.clone()));
        }
        Ok(())
    }

    pub fn remove(&self, key: &QueryKey) -> LibrisResult<bool> {
        let removed = {
            let mut state = self.inner.write()?;
            let removed = state.entries.remove(key).is_some();
            state.sync_entry_count();
            removed
        };
        if removed {
            self.inner.emit(CacheEvent::Removed(key.clone()));
        }
        Ok(removed)
    }

    pub fn clear(&self) -> LibrisResult<()> {
        {
            let mut state = self.inner.write()?;
            state.entries.clear();
            state.sync_entry_count();
        }
        self.inner.emit(CacheEvent::Cleared);
        Ok(())
    }

    /// Evict unobserved entries whose retention window has elapsed.
    pub fn gc(&self) -> LibrisResult<usize> {
        self.gc_at(Utc::now())
    }

    /// [`gc`](Self::gc) against an explicit clock.
    pub fn gc_at(&self, now: Timestamp) -> LibrisResult<usize> {
        let expired: Vec<QueryKey> = {
            let mut guard = self.inner.write()?;
            let state = &mut *guard;
            let in_flight = &state.in_flight;
            let expired: Vec<QueryKey> = state
                .entries
                .iter()
                .filter(|(key, entry)| {
                    entry.observers == 0
                        && !in_flight.contains_key(*key)
                        && age(entry.inactive_since, now) >= entry.options.gc_time
                })
                .map(|(key, _)| key.clone())
                .collect();
            for key in &expired {
                state.entries.remove(key);
            }
            state.stats.evictions += expired.len() as u64;
            state.sync_entry_count();
            expired
        };

        for key in &expired {
            tracing::debug!(%key, "Evicted");
            self.inner.emit(CacheEvent::Removed(key.clone()));
        }
        Ok(expired.len())
    }

    /// Insert restored data, keeping its original timestamp. Returns false
    /// when the cache already holds data at least as new.
    pub fn hydrate(
        &self,
        key: QueryKey,
        data: QueryData,
        data_updated_at: Timestamp,
        persist: bool,
    ) -> LibrisResult<bool> {
        let inserted = {
            let mut guard = self.inner.write()?;
            let state = &mut *guard;
            let options = state.resolve(
                &self.inner.config,
                &key,
                &QueryOptions {
                    persist,
                    ..QueryOptions::default()
                },
            );
            let inserted = match state.entries.get_mut(&key) {
                Some(entry) if entry.data_updated_at.is_some_and(|at| at >= data_updated_at) => {
                    false
                }
                Some(entry) => {
                    entry.store(data, data_updated_at);
                    entry.options.persist = persist;
                    true
                }
                None => {
                    let mut entry = QueryEntry::new(options, Utc::now());
                    entry.store(data, data_updated_at);
                    state.entries.insert(key.clone(), entry);
                    true
                }
            };
            state.sync_entry_count();
            inserted
        };
        if inserted {
            self.inner.emit(CacheEvent::Updated(key));
        }
        Ok(inserted)
    }

    /// Successful, persist-eligible entries with their fetch time.
    pub fn persistable_entries(&self) -> LibrisResult<Vec<(QueryKey, QueryData, Timestamp)>> {
        let state = self.inner.read()?;
        Ok(state
            .entries
            .iter()
            .filter(|(_, entry)| {
                entry.options.persist && entry.error.is_none() && !entry.invalidated
            })
            .filter_map(|(key, entry)| {
                Some((key.clone(), entry.data.clone()?, entry.data_updated_at?))
            })
            .collect())
    }

    /// Get cache statistics.
    pub fn stats(&self) -> LibrisResult<CacheStats> {
        Ok(self.inner.read()?.stats.clone())
    }
}
