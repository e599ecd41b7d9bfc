//! LIBRIS Test Utilities
//!
//! Centralized test infrastructure for the LIBRIS workspace:
//! - A scripted in-memory catalog that counts its requests
//! - Proptest generators for catalog entities and query keys
//! - Test fixtures for common scenarios

// Re-export the in-memory persister from its source crate
pub use libris_storage::MemoryPersister;

// Re-export core types for convenience
pub use libris_core::{
    Author, AuthorId, BookDetail, BookId, BookLink, CatalogError, CatalogSource, LibrisError,
    LibrisResult, QueryKey, SearchPage, SearchResult, PAGE_SIZE,
};

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use tokio::sync::Notify;

// ============================================================================
// MOCK CATALOG
// ============================================================================

#[derive(Debug, Default)]
struct MockState {
    pages: HashMap<(String, u32), SearchPage>,
    books: HashMap<BookId, BookDetail>,
    authors: HashMap<AuthorId, Author>,
    failures: HashMap<String, CatalogError>,
}

/// In-memory catalog for testing.
///
/// Unknown searches answer with an empty page; unknown books and authors
/// answer with a 404. Every call is counted, and a gate can hold all
/// responses until the test releases them.
#[derive(Debug, Default)]
pub struct MockCatalog {
    state: RwLock<MockState>,
    search_calls: AtomicUsize,
    book_calls: AtomicUsize,
    author_calls: AtomicUsize,
    gate: Option<Arc<Notify>>,
}

impl MockCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold every response until `gate` is notified once per request.
    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn with_page(self, filter: &str, page: u32, result: SearchPage) -> Self {
        if let Ok(mut state) = self.state.write() {
            state.pages.insert((filter.to_string(), page), result);
        }
        self
    }

    pub fn with_book(self, id: &str, detail: BookDetail) -> Self {
        if let Ok(mut state) = self.state.write() {
            state.books.insert(BookId::new(id), detail);
        }
        self
    }

    pub fn with_author(self, id: &str, author: Author) -> Self {
        if let Ok(mut state) = self.state.write() {
            state.authors.insert(AuthorId::new(id), author);
        }
        self
    }

    /// Make every request whose path is `path` fail with `error`.
    ///
    /// Paths look like `search/<filter>/<page>`, `/works/OL1W` or
    /// `/authors/OL1A`.
    pub fn fail(&self, path: impl Into<String>, error: CatalogError) {
        if let Ok(mut state) = self.state.write() {
            state.failures.insert(path.into(), error);
        }
    }

    /// Undo an earlier [`fail`](Self::fail).
    pub fn recover(&self, path: &str) {
        if let Ok(mut state) = self.state.write() {
            state.failures.remove(path);
        }
    }

    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    pub fn book_calls(&self) -> usize {
        self.book_calls.load(Ordering::SeqCst)
    }

    pub fn author_calls(&self) -> usize {
        self.author_calls.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.search_calls() + self.book_calls() + self.author_calls()
    }

    async fn wait_for_gate(&self) {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
    }

    fn failure(&self, path: &str) -> Option<CatalogError> {
        self.state
            .read()
            .ok()
            .and_then(|state| state.failures.get(path).cloned())
    }
}

fn not_found(path: &str) -> LibrisError {
    CatalogError::Status {
        status: 404,
        url: format!("mock://catalog{path}.json"),
    }
    .into()
}

#[async_trait]
impl CatalogSource for MockCatalog {
    async fn search_books(&self, filter: &str, page: u32) -> LibrisResult<SearchPage> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        self.wait_for_gate().await;

        let path = format!("search/{filter}/{page}");
        if let Some(error) = self.failure(&path) {
            return Err(error.into());
        }
        let registered = self
            .state
            .read()
            .ok()
            .and_then(|state| state.pages.get(&(filter.to_string(), page)).cloned());
        Ok(registered.unwrap_or_else(|| fixtures::empty_page(filter)))
    }

    async fn get_book(&self, id: &BookId) -> LibrisResult<BookDetail> {
        self.book_calls.fetch_add(1, Ordering::SeqCst);
        self.wait_for_gate().await;

        if let Some(error) = self.failure(id.as_str()) {
            return Err(error.into());
        }
        self.state
            .read()
            .ok()
            .and_then(|state| state.books.get(id).cloned())
            .ok_or_else(|| not_found(id.as_str()))
    }

    async fn get_author(&self, id: &AuthorId) -> LibrisResult<Author> {
        self.author_calls.fetch_add(1, Ordering::SeqCst);
        self.wait_for_gate().await;

        if let Some(error) = self.failure(id.as_str()) {
            return Err(error.into());
        }
        self.state
            .read()
            .ok()
            .and_then(|state| state.authors.get(id).cloned())
            .ok_or_else(|| not_found(id.as_str()))
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for generating LIBRIS catalog types.

    use super::*;
    use proptest::prelude::*;

    /// Generate a work id like `/works/OL123W`.
    pub fn arb_book_id() -> impl Strategy<Value = BookId> {
        (1u32..10_000_000).prop_map(|n| BookId::new(format!("/works/OL{n}W")))
    }

    /// Generate an author id like `/authors/OL123A`.
    pub fn arb_author_id() -> impl Strategy<Value = AuthorId> {
        (1u32..10_000_000).prop_map(|n| AuthorId::new(format!("/authors/OL{n}A")))
    }

    /// Generate a search filter, possibly blank.
    pub fn arb_filter() -> impl Strategy<Value = String> {
        prop_oneof![
            Just(String::new()),
            Just("   ".to_string()),
            "[a-z]{1,12}( [a-z]{1,12}){0,2}",
        ]
    }

    pub fn arb_search_result() -> impl Strategy<Value = SearchResult> {
        (
            arb_book_id(),
            "[A-Za-z ]{1,40}",
            proptest::option::of("[A-Za-z .]{1,30}"),
            proptest::option::of(arb_author_id()),
            proptest::option::of(-5i64..1_000_000),
            proptest::option::of(1450i32..2030),
        )
            .prop_map(
                |(id, title, author_name, author_id, cover_id, publish_year)| SearchResult {
                    id,
                    title,
                    author_name,
                    author_id,
                    cover_id,
                    publish_year,
                },
            )
    }

    /// Generate a page that respects the page size.
    pub fn arb_search_page() -> impl Strategy<Value = SearchPage> {
        (
            "[a-z]{1,12}",
            proptest::collection::vec(arb_search_result(), 0..=PAGE_SIZE),
            0u64..500,
        )
            .prop_map(|(filter, docs, extra)| SearchPage {
                num_found: docs.len() as u64 + extra,
                start: Some(0),
                filter,
                docs,
            })
    }

    pub fn arb_book_detail() -> impl Strategy<Value = BookDetail> {
        (
            "[A-Za-z ]{1,40}",
            proptest::option::of("[A-Za-z .\n]{0,200}"),
            proptest::collection::vec(1i64..1_000_000, 0..5),
            proptest::option::of(arb_author_id()),
        )
            .prop_map(|(title, description, covers, author_id)| BookDetail {
                title,
                description,
                covers,
                links: None,
                author_id,
            })
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built test fixtures for common testing scenarios.

    use super::*;

    /// A search hit numbered `n`.
    pub fn search_result(n: u64) -> SearchResult {
        SearchResult {
            id: BookId::new(format!("/works/OL{n}W")),
            title: format!("Book {n}"),
            author_name: Some(format!("Author {n}")),
            author_id: Some(AuthorId::new(format!("/authors/OL{n}A"))),
            cover_id: Some(n as i64),
            publish_year: Some(1950 + (n % 70) as i32),
        }
    }

    /// Page `page` of a result set with `num_found` hits.
    pub fn search_page(filter: &str, page: u32, num_found: u64) -> SearchPage {
        let start = u64::from(page.saturating_sub(1)) * PAGE_SIZE as u64;
        let end = num_found.min(start + PAGE_SIZE as u64);
        SearchPage {
            num_found,
            start: Some(start),
            filter: filter.to_string(),
            docs: (start..end).map(|n| search_result(n + 1)).collect(),
        }
    }

    pub fn empty_page(filter: &str) -> SearchPage {
        SearchPage {
            num_found: 0,
            start: Some(0),
            filter: filter.to_string(),
            docs: vec![],
        }
    }

    /// The fully fetched detail behind [`search_result`]`(n)`.
    pub fn book_detail(n: u64) -> BookDetail {
        BookDetail {
            title: format!("Book {n}"),
            description: Some(format!("Description of book {n}")),
            covers: vec![n as i64],
            links: Some(vec![BookLink {
                title: "Wikipedia".to_string(),
                url: format!("https://en.wikipedia.org/wiki/Book_{n}"),
            }]),
            author_id: Some(AuthorId::new(format!("/authors/OL{n}A"))),
        }
    }

    /// The author behind [`search_result`]`(n)`.
    pub fn author(n: u64) -> Author {
        Author {
            name: format!("Author {n}"),
            link: Some(format!("https://example.org/authors/{n}")),
        }
    }

    /// A catalog holding three pages of `filter` (15 hits) plus every
    /// listed book and its author.
    pub fn stocked_catalog(filter: &str) -> MockCatalog {
        let num_found = 15;
        let mut catalog = MockCatalog::new();
        for page in 1..=3 {
            catalog = catalog.with_page(filter, page, search_page(filter, page, num_found));
        }
        for n in 1..=num_found {
            catalog = catalog
                .with_book(&format!("/works/OL{n}W"), book_detail(n))
                .with_author(&format!("/authors/OL{n}A"), author(n));
        }
        catalog
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[tokio::test]
    async fn test_mock_catalog_serves_registered_data() {
        let catalog = fixtures::stocked_catalog("dune");

        let page = catalog.search_books("dune", 2).await.unwrap();
        assert_eq!(page.docs.len(), PAGE_SIZE);
        assert_eq!(page.docs[0].id.as_str(), "/works/OL7W");

        let book = catalog.get_book(&BookId::new("/works/OL7W")).await.unwrap();
        assert_eq!(book.title, "Book 7");

        let author = catalog
            .get_author(&AuthorId::new("/authors/OL7A"))
            .await
            .unwrap();
        assert_eq!(author.name, "Author 7");

        assert_eq!(catalog.search_calls(), 1);
        assert_eq!(catalog.book_calls(), 1);
        assert_eq!(catalog.author_calls(), 1);
    }

    #[tokio::test]
    async fn test_mock_catalog_unknown_search_is_empty() {
        let catalog = MockCatalog::new();
        let page = catalog.search_books("nothing", 1).await.unwrap();
        assert!(page.is_empty());
        assert_eq!(page.num_found, 0);
    }

    #[tokio::test]
    async fn test_mock_catalog_unknown_book_is_404() {
        let catalog = MockCatalog::new();
        let err = catalog
            .get_book(&BookId::new("/works/OL404W"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LibrisError::Catalog(CatalogError::Status { status: 404, .. })
        ));
    }

    #[tokio::test]
    async fn test_mock_catalog_scripted_failure_and_recovery() {
        let catalog = fixtures::stocked_catalog("dune");
        catalog.fail(
            "search/dune/1",
            CatalogError::Transport {
                url: "mock://catalog/search.json".to_string(),
                reason: "offline".to_string(),
            },
        );
        assert!(catalog.search_books("dune", 1).await.is_err());

        catalog.recover("search/dune/1");
        assert!(catalog.search_books("dune", 1).await.is_ok());
        assert_eq!(catalog.search_calls(), 2);
    }

    #[test]
    fn test_last_page_is_partial() {
        let page = fixtures::search_page("dune", 3, 15);
        assert_eq!(page.docs.len(), 3);
        assert_eq!(page.start, Some(12));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        #[test]
        fn prop_generated_pages_fit_page_size(page in generators::arb_search_page()) {
            prop_assert!(page.docs.len() <= PAGE_SIZE);
            prop_assert!(page.num_found >= page.docs.len() as u64);
        }

        #[test]
        fn prop_generated_ids_are_catalog_paths(id in generators::arb_book_id(), author in generators::arb_author_id()) {
            prop_assert!(id.as_str().starts_with("/works/"));
            prop_assert!(author.as_str().starts_with("/authors/"));
        }
    }
}
