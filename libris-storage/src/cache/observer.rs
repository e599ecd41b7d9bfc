//! Long-lived views onto one query key at a time.
//!
//! A [`QueryObserver`] keeps its current key alive in the cache: while it
//! points at a key, garbage collection leaves that entry alone. Switching
//! keys or dropping the observer releases the previous one.

use libris_core::{LibrisResult, QueryKey};

use super::client::QueryClient;
use super::descriptor::QueryDescriptor;
use super::freshness::{QueryResult, QueryStatus};
use super::traits::Cacheable;

type InitialData<'a, T> = Box<dyn Fn() -> Option<T> + 'a>;
type PlaceholderData<'a, T> = Box<dyn Fn(Option<&T>, Option<&QueryKey>) -> Option<T> + 'a>;

/// Per-read options for [`QueryObserver::observe`].
pub struct ObserveOptions<'a, T> {
    /// Seeds a key that holds no data yet. Seeded data is shown at once but
    /// treated as stale.
    pub initial_data: Option<InitialData<'a, T>>,
    /// Shown while the key has no data of its own. Receives the last data
    /// this observer saw and the key it was stored under.
    pub placeholder_data: Option<PlaceholderData<'a, T>>,
}

impl<T> Default for ObserveOptions<'_, T> {
    fn default() -> Self {
        Self {
            initial_data: None,
            placeholder_data: None,
        }
    }
}

impl<'a, T> ObserveOptions<'a, T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_initial_data<F>(mut self, f: F) -> Self
    where
        F: Fn() -> Option<T> + 'a,
    {
        self.initial_data = Some(Box::new(f));
        self
    }

    pub fn with_placeholder_data<F>(mut self, f: F) -> Self
    where
        F: Fn(Option<&T>, Option<&QueryKey>) -> Option<T> + 'a,
    {
        self.placeholder_data = Some(Box::new(f));
        self
    }

    /// Keep showing the previous key's data while the new key loads.
    pub fn keep_previous_data(self) -> Self
    where
        T: Clone,
    {
        self.with_placeholder_data(|previous: Option<&T>, _: Option<&QueryKey>| previous.cloned())
    }
}

/// Subscription to one key of the cache at a time.
pub struct QueryObserver<T: Cacheable> {
    client: QueryClient,
    key: Option<QueryKey>,
    last: Option<(QueryKey, T)>,
}

impl<T: Cacheable> QueryObserver<T> {
    pub fn new(client: QueryClient) -> Self {
        Self {
            client,
            key: None,
            last: None,
        }
    }

    /// The key this observer currently holds, if any.
    pub fn key(&self) -> Option<&QueryKey> {
        self.key.as_ref()
    }

    /// Point the observer at `desc` and return the current snapshot.
    ///
    /// Starts a background fetch when needed; the result reflects the state
    /// right after that decision.
    pub fn observe(
        &mut self,
        desc: &QueryDescriptor<T>,
        options: &ObserveOptions<'_, T>,
    ) -> LibrisResult<QueryResult<T>> {
        let attaching = self.key.as_ref() != Some(desc.key());
        if attaching {
            self.client.retain(desc.key());
            if let Some(previous) = self.key.replace(desc.key().clone()) {
                self.client.release(&previous);
            }
        }

        let mut result = self
            .client
            .observe(desc, options.initial_data.as_deref(), attaching)?;

        if let Some(data) = &result.data {
            self.last = Some((desc.key().clone(), data.clone()));
        } else if result.status == QueryStatus::Pending {
            let (previous_key, previous) = match &self.last {
                Some((key, data)) => (Some(key), Some(data)),
                None => (None, None),
            };
            let placeholder = options
                .placeholder_data
                .as_ref()
                .and_then(|placeholder| placeholder(previous, previous_key));
            if let Some(data) = placeholder {
                result.data = Some(data);
                result.status = QueryStatus::Success;
                result.is_placeholder_data = true;
            }
        }

        Ok(result)
    }

    /// Let go of the current key without dropping the observer.
    pub fn detach(&mut self) {
        if let Some(key) = self.key.take() {
            self.client.release(&key);
        }
    }
}

impl<T: Cacheable> Drop for QueryObserver<T> {
    fn drop(&mut self) {
        self.detach();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheEvent;
    use libris_core::{BookId, CatalogError, LibrisError, SearchPage, SearchResult};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::sync::Notify;

    fn page(filter: &str, titles: &[&str]) -> SearchPage {
        SearchPage {
            num_found: titles.len() as u64,
            start: Some(0),
            filter: filter.to_string(),
            docs: titles
                .iter()
                .enumerate()
                .map(|(i, title)| SearchResult {
                    id: BookId::new(format!("/works/OL{i}W")),
                    title: title.to_string(),
                    author_name: None,
                    author_id: None,
                    cover_id: None,
                    publish_year: None,
                })
                .collect(),
        }
    }

    fn gated_list(filter: &str, page_no: u32, gate: Arc<Notify>) -> QueryDescriptor<SearchPage> {
        let filter = filter.to_string();
        let key = QueryKey::book_list(filter.clone(), page_no);
        QueryDescriptor::new(key, move || {
            let gate = Arc::clone(&gate);
            let filter = filter.clone();
            async move {
                gate.notified().await;
                Ok(page(&filter, &["fetched"]))
            }
        })
    }

    #[tokio::test]
    async fn test_observer_holds_and_releases_key() {
        let client = QueryClient::with_defaults();
        let first = QueryKey::book_list("dune", 1);
        let second = QueryKey::book_list("dune", 2);
        client.set_query_data(first.clone(), page("dune", &["a"])).unwrap();
        client.set_query_data(second.clone(), page("dune", &["b"])).unwrap();

        let mut observer = QueryObserver::<SearchPage>::new(client.clone());
        observer
            .observe(&QueryDescriptor::disabled(first.clone()), &ObserveOptions::new())
            .unwrap();
        assert_eq!(client.observer_count(&first), 1);

        observer
            .observe(&QueryDescriptor::disabled(second.clone()), &ObserveOptions::new())
            .unwrap();
        assert_eq!(client.observer_count(&first), 0);
        assert_eq!(client.observer_count(&second), 1);

        drop(observer);
        assert_eq!(client.observer_count(&second), 0);
    }

    #[tokio::test]
    async fn test_previous_page_is_kept_as_placeholder() {
        let client = QueryClient::with_defaults();
        let first = QueryKey::book_list("dune", 1);
        client
            .set_query_data(first.clone(), page("dune", &["page one"]))
            .unwrap();

        let mut observer = QueryObserver::<SearchPage>::new(client.clone());
        let options = ObserveOptions::new().keep_previous_data();
        let shown = observer
            .observe(&QueryDescriptor::disabled(first), &options)
            .unwrap();
        assert!(!shown.is_placeholder_data);

        let gate = Arc::new(Notify::new());
        let next = gated_list("dune", 2, Arc::clone(&gate));
        let loading = observer.observe(&next, &options).unwrap();
        assert!(loading.is_placeholder_data);
        assert!(loading.is_success());
        assert!(loading.is_fetching());
        assert_eq!(loading.data.unwrap().docs[0].title, "page one");

        let mut events = client.subscribe_events();
        gate.notify_one();
        assert_eq!(events.recv().await.unwrap(), CacheEvent::Updated(next.key().clone()));

        let loaded = observer.observe(&next, &options).unwrap();
        assert!(!loaded.is_placeholder_data);
        assert_eq!(loaded.data.unwrap().docs[0].title, "fetched");
    }

    #[tokio::test]
    async fn test_placeholder_can_reject_previous_key() {
        let client = QueryClient::with_defaults();
        let first = QueryKey::book_list("dune", 1);
        client
            .set_query_data(first.clone(), page("dune", &["dune one"]))
            .unwrap();

        let same_filter = |filter: &'static str| {
            ObserveOptions::new().with_placeholder_data(
                move |previous: Option<&SearchPage>, key: Option<&QueryKey>| {
                    let params = key.and_then(QueryKey::list_params)?;
                    (params.filter == filter).then(|| previous.cloned()).flatten()
                },
            )
        };

        let mut observer = QueryObserver::<SearchPage>::new(client);
        observer
            .observe(&QueryDescriptor::disabled(first), &same_filter("dune"))
            .unwrap();

        let gate = Arc::new(Notify::new());
        let other = gated_list("foundation", 1, gate);
        let result = observer.observe(&other, &same_filter("foundation")).unwrap();
        assert!(result.is_pending());
        assert!(result.data.is_none());
        assert!(!result.is_placeholder_data);
    }

    #[tokio::test]
    async fn test_no_placeholder_without_previous_data() {
        let client = QueryClient::with_defaults();
        let gate = Arc::new(Notify::new());
        let desc = gated_list("dune", 1, gate);

        let mut observer = QueryObserver::<SearchPage>::new(client);
        let result = observer
            .observe(&desc, &ObserveOptions::new().keep_previous_data())
            .unwrap();
        assert!(result.is_pending());
        assert!(result.data.is_none());
        assert!(!result.is_placeholder_data);
    }

    #[tokio::test]
    async fn test_observer_seeds_unseen_key_from_initial_data() {
        let client = QueryClient::with_defaults();
        let gate = Arc::new(Notify::new());
        let desc = gated_list("dune", 1, Arc::clone(&gate));

        let mut observer = QueryObserver::<SearchPage>::new(client.clone());
        let options = ObserveOptions::new().with_initial_data(|| Some(page("dune", &["seed"])));
        let seeded = observer.observe(&desc, &options).unwrap();
        assert!(seeded.is_success());
        assert!(seeded.is_fetching());
        assert!(!seeded.is_placeholder_data);
        assert_eq!(seeded.data.unwrap().docs[0].title, "seed");
        assert_eq!(client.observer_count(desc.key()), 1);

        let mut events = client.subscribe_events();
        gate.notify_one();
        assert_eq!(events.recv().await.unwrap(), CacheEvent::Updated(desc.key().clone()));
        let loaded = observer.observe(&desc, &options).unwrap();
        assert_eq!(loaded.data.unwrap().docs[0].title, "fetched");
    }

    #[tokio::test]
    async fn test_errored_key_retries_when_observer_reattaches() {
        let client = QueryClient::with_defaults();
        let calls = Arc::new(AtomicUsize::new(0));
        let key = QueryKey::book_list("dune", 1);
        let desc = {
            let calls = Arc::clone(&calls);
            QueryDescriptor::new(key.clone(), move || {
                let attempt = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt == 0 {
                        Err(LibrisError::from(CatalogError::Status {
                            status: 503,
                            url: "https://openlibrary.org/search.json".to_string(),
                        }))
                    } else {
                        Ok(page("dune", &["recovered"]))
                    }
                }
            })
        };
        let options = ObserveOptions::new();
        let mut events = client.subscribe_events();

        let mut observer = QueryObserver::<SearchPage>::new(client.clone());
        observer.observe(&desc, &options).unwrap();
        assert_eq!(events.recv().await.unwrap(), CacheEvent::Updated(key.clone()));
        assert!(observer.observe(&desc, &options).unwrap().is_error());
        assert!(observer.observe(&desc, &options).unwrap().is_error());
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        observer.detach();
        let retrying = observer.observe(&desc, &options).unwrap();
        assert!(retrying.is_pending());
        assert!(retrying.is_fetching());
        assert_eq!(events.recv().await.unwrap(), CacheEvent::Updated(key.clone()));

        let loaded = observer.observe(&desc, &options).unwrap();
        assert!(loaded.is_success());
        assert_eq!(loaded.data.unwrap().docs[0].title, "recovered");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_disabled_key_shows_empty_state() {
        let client = QueryClient::with_defaults();
        let mut observer = QueryObserver::<SearchPage>::new(client.clone());
        let result = observer
            .observe(
                &QueryDescriptor::disabled(QueryKey::book_list("", 1)),
                &ObserveOptions::new(),
            )
            .unwrap();
        assert!(result.is_pending());
        assert!(!result.is_fetching());
        assert_eq!(client.stats().unwrap().fetches, 0);
    }
}
