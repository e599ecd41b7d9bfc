//! LIBRIS Storage - Query Cache and Persistence
//!
//! The in-memory query cache every view reads through, and the adapter that
//! writes it to durable storage between sessions.

pub mod cache;
pub mod persist;

pub use cache::{
    CacheConfig, CacheEvent, CacheStats, Cacheable, FetchStatus, ObserveOptions, QueryClient,
    QueryData, QueryDefaults, QueryDescriptor, QueryObserver, QueryOptions, QueryResult,
    QueryStatus,
};
pub use persist::{
    dehydrate, hydrate, persist_client, restore_client, spawn_persist_task, DehydratedQuery,
    LmdbPersister, MemoryPersister, PersistOptions, PersistedClient, Persister,
};
