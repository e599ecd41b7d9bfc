//! Query descriptors for the three things the app reads from the catalog.

use libris_core::{
    Author, AuthorId, BookDetail, BookId, CatalogSource, LibrisResult, QueryKey, QueryScope,
    SearchPage, AUTHOR_STALE_TIME,
};
use libris_storage::{QueryClient, QueryDefaults, QueryDescriptor};
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct BookQueries {
    catalog: Arc<dyn CatalogSource>,
    author_stale_time: Duration,
}

impl BookQueries {
    pub fn new(catalog: Arc<dyn CatalogSource>) -> Self {
        Self {
            catalog,
            author_stale_time: AUTHOR_STALE_TIME,
        }
    }

    pub fn with_author_stale_time(mut self, duration: Duration) -> Self {
        self.author_stale_time = duration;
        self
    }

    /// One search page. A blank filter is never sent.
    pub fn list(&self, filter: &str, page: u32) -> QueryDescriptor<SearchPage> {
        let key = QueryKey::book_list(filter, page);
        if filter.trim().is_empty() {
            return QueryDescriptor::disabled(key);
        }
        let catalog = Arc::clone(&self.catalog);
        let filter = filter.to_string();
        QueryDescriptor::new(key, move || {
            let catalog = Arc::clone(&catalog);
            let filter = filter.clone();
            async move { catalog.search_books(&filter, page).await }
        })
    }

    pub fn details(&self, id: &BookId) -> QueryDescriptor<BookDetail> {
        let catalog = Arc::clone(&self.catalog);
        let book = id.clone();
        QueryDescriptor::new(QueryKey::book_detail(id.clone()), move || {
            let catalog = Arc::clone(&catalog);
            let book = book.clone();
            async move { catalog.get_book(&book).await }
        })
        .persisted()
    }

    /// Author of a book. Disabled until the author id is known.
    pub fn author(&self, id: Option<&AuthorId>) -> QueryDescriptor<Author> {
        let key = QueryKey::author_detail(id.cloned());
        let Some(author) = id.cloned() else {
            return QueryDescriptor::disabled(key);
        };
        let catalog = Arc::clone(&self.catalog);
        QueryDescriptor::new(key, move || {
            let catalog = Arc::clone(&catalog);
            let author = author.clone();
            async move { catalog.get_author(&author).await }
        })
        .with_stale_time(self.author_stale_time)
        .persisted()
    }
}

/// Register the `books` scope window on `client`. Authors carry their own
/// window on the descriptor.
pub fn install_book_defaults(client: &QueryClient, stale_time: Duration) -> LibrisResult<()> {
    client.set_query_defaults(
        QueryScope::Books,
        QueryDefaults::default().with_stale_time(stale_time),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use libris_test_utils::{fixtures, MockCatalog};

    fn queries(catalog: &Arc<MockCatalog>) -> BookQueries {
        BookQueries::new(Arc::clone(catalog) as Arc<dyn CatalogSource>)
    }

    #[test]
    fn test_blank_filter_is_disabled() {
        let catalog = Arc::new(MockCatalog::new());
        let q = queries(&catalog);
        assert!(!q.list("   ", 1).is_enabled());
        assert!(q.list("dune", 1).is_enabled());
    }

    #[test]
    fn test_author_without_id_is_disabled() {
        let catalog = Arc::new(MockCatalog::new());
        let q = queries(&catalog);
        let desc = q.author(None);
        assert!(!desc.is_enabled());
        assert_eq!(desc.key(), &QueryKey::author_detail(None));
    }

    #[test]
    fn test_persist_flags_and_author_window() {
        let catalog = Arc::new(MockCatalog::new());
        let q = queries(&catalog).with_author_stale_time(Duration::from_secs(60));
        assert!(!q.list("dune", 1).options().persist);
        assert!(q.details(&BookId::new("/works/OL1W")).options().persist);

        let author = q.author(Some(&AuthorId::new("/authors/OL1A")));
        assert!(author.options().persist);
        assert_eq!(author.options().stale_time, Some(Duration::from_secs(60)));
    }

    #[test]
    fn test_book_defaults_leave_author_window_on_descriptor() {
        let catalog = Arc::new(MockCatalog::new());
        let q = queries(&catalog);
        let client = QueryClient::with_defaults();
        install_book_defaults(&client, Duration::from_secs(30)).unwrap();

        let list = q.list("dune", 1);
        let resolved = client.resolve_options(list.key(), list.options()).unwrap();
        assert_eq!(resolved.stale_time, Duration::from_secs(30));

        let details = q.details(&BookId::new("/works/OL1W"));
        let resolved = client.resolve_options(details.key(), details.options()).unwrap();
        assert_eq!(resolved.stale_time, Duration::from_secs(30));

        let author = q.author(Some(&AuthorId::new("/authors/OL1A")));
        let resolved = client.resolve_options(author.key(), author.options()).unwrap();
        assert_eq!(resolved.stale_time, AUTHOR_STALE_TIME);
    }

    #[tokio::test]
    async fn test_list_fetch_goes_through_catalog() {
        let catalog = Arc::new(fixtures::stocked_catalog("dune"));
        let client = QueryClient::with_defaults();
        let q = queries(&catalog);

        let page = client.fetch_query(&q.list("dune", 2)).await.unwrap();
        assert_eq!(page.filter, "dune");
        assert_eq!(catalog.search_calls(), 1);

        client.fetch_query(&q.list("dune", 2)).await.unwrap();
        assert_eq!(catalog.search_calls(), 1);
    }
}
