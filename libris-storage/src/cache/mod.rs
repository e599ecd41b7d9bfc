//! In-memory query cache.
//!
//! Staleness is explicit: every read goes through a [`QueryResult<T>`] that
//! says whether data is present, whether it is stale and whether a request
//! is running. Consumers render from that snapshot and re-read when a
//! [`CacheEvent`] arrives.
//!
//! # Example
//!
//! ```ignore
//! let client = QueryClient::with_defaults();
//! let desc = QueryDescriptor::new(QueryKey::book_detail(id), move || fetch(id));
//!
//! // Await the data directly
//! let detail = client.fetch_query(&desc).await?;
//!
//! // Or keep a long-lived view that refetches in the background
//! let mut observer = QueryObserver::new(client.clone());
//! let snapshot = observer.observe(&desc, &ObserveOptions::new())?;
//! ```

pub mod client;
pub mod descriptor;
pub mod freshness;
pub mod observer;
pub mod traits;

pub use client::{CacheConfig, CacheEvent, QueryClient};
pub use descriptor::{FetchFn, FetchFuture, QueryDescriptor};
pub use freshness::{
    age, is_stale, FetchStatus, QueryDefaults, QueryOptions, QueryResult, QueryStatus,
    ResolvedOptions,
};
pub use observer::{ObserveOptions, QueryObserver};
pub use traits::{CacheStats, Cacheable, QueryData};
