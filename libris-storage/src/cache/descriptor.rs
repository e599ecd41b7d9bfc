//! Typed query descriptors: a key, its options and how to fetch it.

use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::{BoxFuture, FutureExt};
use libris_core::{LibrisResult, QueryKey};

use super::freshness::QueryOptions;
use super::traits::Cacheable;

/// Boxed future returned by a fetch function.
pub type FetchFuture<T> = BoxFuture<'static, LibrisResult<T>>;

/// Fetch function of a query. Called once per network request.
pub type FetchFn<T> = Arc<dyn Fn() -> FetchFuture<T> + Send + Sync>;

/// Everything the cache needs to serve one query.
///
/// A descriptor without a fetch function is disabled: it can still read
/// whatever the cache already holds for its key but never issues a request.
pub struct QueryDescriptor<T> {
    key: QueryKey,
    options: QueryOptions,
    fetch: Option<FetchFn<T>>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Cacheable> QueryDescriptor<T> {
    pub fn new<F, Fut>(key: QueryKey, fetch: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = LibrisResult<T>> + Send + 'static,
    {
        let fetch: FetchFn<T> = Arc::new(move || fetch().boxed());
        Self {
            key,
            options: QueryOptions::default(),
            fetch: Some(fetch),
            _marker: PhantomData,
        }
    }

    /// A query that is skipped entirely.
    pub fn disabled(key: QueryKey) -> Self {
        Self {
            key,
            options: QueryOptions::default(),
            fetch: None,
            _marker: PhantomData,
        }
    }

    pub fn with_stale_time(mut self, duration: Duration) -> Self {
        self.options.stale_time = Some(duration);
        self
    }

    pub fn with_gc_time(mut self, duration: Duration) -> Self {
        self.options.gc_time = Some(duration);
        self
    }

    /// Mark the query's data as eligible for durable persistence.
    pub fn persisted(mut self) -> Self {
        self.options.persist = true;
        self
    }

    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    pub fn options(&self) -> &QueryOptions {
        &self.options
    }

    pub fn is_enabled(&self) -> bool {
        self.fetch.is_some()
    }

    pub(crate) fn fetch_fn(&self) -> Option<FetchFn<T>> {
        self.fetch.clone()
    }
}

impl<T> Clone for QueryDescriptor<T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            options: self.options.clone(),
            fetch: self.fetch.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> std::fmt::Debug for QueryDescriptor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryDescriptor")
            .field("key", &self.key)
            .field("options", &self.options)
            .field("enabled", &self.fetch.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use libris_core::{Author, AuthorId};

    #[test]
    fn test_disabled_descriptor_has_no_fetch() {
        let desc = QueryDescriptor::<Author>::disabled(QueryKey::author_detail(None));
        assert!(!desc.is_enabled());
        assert!(desc.fetch_fn().is_none());
    }

    #[test]
    fn test_builder_sets_options() {
        let key = QueryKey::author_detail(Some(AuthorId::new("/authors/OL1A")));
        let desc = QueryDescriptor::new(key.clone(), || async {
            Ok(Author {
                name: "A".to_string(),
                link: None,
            })
        })
        .with_stale_time(Duration::from_secs(1200))
        .persisted();

        assert!(desc.is_enabled());
        assert_eq!(desc.key(), &key);
        assert_eq!(desc.options().stale_time, Some(Duration::from_secs(1200)));
        assert_eq!(desc.options().gc_time, None);
        assert!(desc.options().persist);
    }
}
