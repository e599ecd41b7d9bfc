//! Catalog contract and response normalization.
//!
//! The wire structs mirror the JSON the catalog returns with every field
//! optional; the `normalize_*` functions reshape them into entities. Missing
//! or malformed fields degrade to defaults instead of failing the request.

use crate::constants::{NO_DESCRIPTION, PAGE_SIZE, SEARCH_FIELDS};
use crate::entities::{Author, BookDetail, BookLink, SearchPage, SearchResult};
use crate::error::LibrisResult;
use crate::identity::{AuthorId, BookId};
use async_trait::async_trait;
use serde::Deserialize;

/// Read-only access to the remote book catalog.
#[async_trait]
pub trait CatalogSource: Send + Sync + 'static {
    /// Fetch one page of search results.
    async fn search_books(&self, filter: &str, page: u32) -> LibrisResult<SearchPage>;

    /// Fetch the full record of a work.
    async fn get_book(&self, id: &BookId) -> LibrisResult<BookDetail>;

    /// Fetch an author record.
    async fn get_author(&self, id: &AuthorId) -> LibrisResult<Author>;
}

/// Query string of a search request.
pub fn search_query(filter: &str, page: u32) -> Vec<(&'static str, String)> {
    vec![
        ("q", filter.to_string()),
        ("page", page.to_string()),
        ("limit", PAGE_SIZE.to_string()),
        ("has_fulltext", "true".to_string()),
        ("fields", SEARCH_FIELDS.to_string()),
    ]
}

/// Path of a record fetch (`/works/OL1W` → `/works/OL1W.json`).
pub fn record_path(id: &str) -> String {
    format!("{}.json", id)
}

// ============================================================================
// WIRE TYPES
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchResponse {
    #[serde(rename = "numFound", alias = "num_found", default)]
    pub num_found: u64,
    #[serde(default)]
    pub start: Option<u64>,
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub docs: Vec<SearchDoc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchDoc {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub author_name: Option<Vec<String>>,
    #[serde(default)]
    pub author_key: Option<Vec<String>>,
    #[serde(default)]
    pub first_publish_year: Option<i32>,
    #[serde(default)]
    pub cover_i: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkResponse {
    #[serde(default)]
    pub title: Option<String>,
    /// Either a bare string or `{ "type": "/type/text", "value": "..." }`.
    #[serde(default)]
    pub description: Option<serde_json::Value>,
    #[serde(default)]
    pub covers: Option<Vec<i64>>,
    #[serde(default)]
    pub links: Option<Vec<WireLink>>,
    #[serde(default)]
    pub authors: Option<Vec<WorkAuthor>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WireLink {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkAuthor {
    #[serde(default)]
    pub author: Option<KeyRef>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct KeyRef {
    pub key: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthorResponse {
    #[serde(default)]
    pub personal_name: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub links: Option<Vec<WireLink>>,
}

// ============================================================================
// NORMALIZATION
// ============================================================================

/// Reshape a search response. `requested_filter` is used when the catalog
/// does not echo `q`. Docs without a key are dropped and the page is capped
/// at `PAGE_SIZE`.
pub fn normalize_search(response: SearchResponse, requested_filter: &str) -> SearchPage {
    let docs = response
        .docs
        .into_iter()
        .filter_map(normalize_doc)
        .take(PAGE_SIZE)
        .collect();

    SearchPage {
        num_found: response.num_found,
        start: response.start,
        filter: response
            .q
            .unwrap_or_else(|| requested_filter.to_string()),
        docs,
    }
}

fn normalize_doc(doc: SearchDoc) -> Option<SearchResult> {
    let id = BookId::new(doc.key?);
    Some(SearchResult {
        id,
        title: doc.title.unwrap_or_default(),
        author_name: doc.author_name.and_then(|names| names.into_iter().next()),
        author_id: doc
            .author_key
            .and_then(|keys| keys.into_iter().next())
            .filter(|key| !key.is_empty())
            .map(|key| AuthorId::from_key(&key)),
        cover_id: doc.cover_i,
        publish_year: doc.first_publish_year,
    })
}

/// Reshape a work record.
pub fn normalize_book(response: WorkResponse) -> BookDetail {
    let description = response
        .description
        .as_ref()
        .and_then(description_text)
        .filter(|text| !text.trim().is_empty())
        .map(|text| text.replace("\\n", "\n"))
        .unwrap_or_else(|| NO_DESCRIPTION.to_string());

    let links = response.links.map(|links| {
        links
            .into_iter()
            .filter_map(|link| {
                let url = link.url?;
                Some(BookLink {
                    title: link.title.unwrap_or_else(|| url.clone()),
                    url,
                })
            })
            .collect()
    });

    BookDetail {
        title: response.title.unwrap_or_default(),
        description: Some(description),
        covers: response
            .covers
            .unwrap_or_default()
            .into_iter()
            .filter(|cover| *cover > 0)
            .collect(),
        links,
        author_id: response
            .authors
            .and_then(|authors| authors.into_iter().next())
            .and_then(|entry| entry.author)
            .map(|author| AuthorId::new(author.key)),
    }
}

fn description_text(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(text) => Some(text.clone()),
        serde_json::Value::Object(map) => map
            .get("value")
            .and_then(|value| value.as_str())
            .map(str::to_string),
        _ => None,
    }
}

/// Reshape an author record.
pub fn normalize_author(response: AuthorResponse) -> Author {
    Author {
        name: response
            .personal_name
            .or(response.name)
            .unwrap_or_default(),
        link: response
            .links
            .and_then(|links| links.into_iter().find_map(|link| link.url)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn search(value: serde_json::Value) -> SearchResponse {
        serde_json::from_value(value).unwrap()
    }

    fn work(value: serde_json::Value) -> WorkResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_search_query_requests_only_needed_fields() {
        let query = search_query("dune", 2);
        assert!(query.contains(&("q", "dune".to_string())));
        assert!(query.contains(&("page", "2".to_string())));
        assert!(query.contains(&("limit", "6".to_string())));
        assert!(query.contains(&("has_fulltext", "true".to_string())));
        assert!(query.contains(&(
            "fields",
            "key,title,author_name,author_key,first_publish_year,cover_i".to_string()
        )));
    }

    #[test]
    fn test_record_path() {
        assert_eq!(record_path("/works/OL1W"), "/works/OL1W.json");
    }

    #[test]
    fn test_normalize_search_reshapes_docs() {
        let page = normalize_search(
            search(json!({
                "numFound": 1,
                "start": 0,
                "q": "dune",
                "docs": [{
                    "key": "/works/OL893415W",
                    "title": "Dune",
                    "author_name": ["Frank Herbert", "Someone Else"],
                    "author_key": ["OL79034A", "OL1A"],
                    "first_publish_year": 1965,
                    "cover_i": 11481354
                }]
            })),
            "dune",
        );

        assert_eq!(page.num_found, 1);
        assert_eq!(page.filter, "dune");
        let doc = &page.docs[0];
        assert_eq!(doc.id.as_str(), "/works/OL893415W");
        assert_eq!(doc.author_name.as_deref(), Some("Frank Herbert"));
        assert_eq!(
            doc.author_id.as_ref().map(AuthorId::as_str),
            Some("/authors/OL79034A")
        );
        assert_eq!(doc.cover_id, Some(11481354));
        assert_eq!(doc.publish_year, Some(1965));
    }

    #[test]
    fn test_missing_publish_year_is_none() {
        let page = normalize_search(
            search(json!({ "numFound": 1, "docs": [{ "key": "/works/OL1W", "title": "x" }] })),
            "x",
        );
        assert_eq!(page.docs[0].publish_year, None);
        assert_eq!(page.docs[0].author_id, None);
        assert_eq!(page.docs[0].author_name, None);
    }

    #[test]
    fn test_missing_q_falls_back_to_requested_filter() {
        let page = normalize_search(search(json!({ "numFound": 0, "docs": [] })), "hobbit");
        assert_eq!(page.filter, "hobbit");
        assert!(page.is_empty());
    }

    #[test]
    fn test_doc_without_key_is_dropped() {
        let page = normalize_search(
            search(json!({ "numFound": 2, "docs": [{ "title": "orphan" }, { "key": "/works/OL2W" }] })),
            "x",
        );
        assert_eq!(page.docs.len(), 1);
        assert_eq!(page.docs[0].title, "");
    }

    #[test]
    fn test_covers_keep_only_positive_ids() {
        let detail = normalize_book(work(json!({ "title": "t", "covers": [0, 5, -1] })));
        assert_eq!(detail.covers, vec![5]);
    }

    #[test]
    fn test_description_string_and_object() {
        let plain = normalize_book(work(json!({ "title": "t", "description": "a\\nb" })));
        assert_eq!(plain.description.as_deref(), Some("a\nb"));

        let typed = normalize_book(work(json!({
            "title": "t",
            "description": { "type": "/type/text", "value": "typed" }
        })));
        assert_eq!(typed.description.as_deref(), Some("typed"));
    }

    #[test]
    fn test_missing_description_gets_placeholder() {
        let detail = normalize_book(work(json!({ "title": "t" })));
        assert_eq!(detail.description.as_deref(), Some(NO_DESCRIPTION));
        assert!(!detail.is_skeleton());

        let odd = normalize_book(work(json!({ "title": "t", "description": 42 })));
        assert_eq!(odd.description.as_deref(), Some(NO_DESCRIPTION));

        let blank = normalize_book(work(json!({ "title": "t", "description": "  " })));
        assert_eq!(blank.description.as_deref(), Some(NO_DESCRIPTION));
    }

    #[test]
    fn test_missing_author_is_omitted() {
        let detail = normalize_book(work(json!({ "title": "t", "authors": [] })));
        assert_eq!(detail.author_id, None);
        assert_eq!(detail.links, None);
    }

    #[test]
    fn test_book_author_and_links() {
        let detail = normalize_book(work(json!({
            "title": "t",
            "links": [{ "title": "Wikipedia", "url": "https://en.wikipedia.org/wiki/Dune" }],
            "authors": [{ "author": { "key": "/authors/OL79034A" } }]
        })));
        assert_eq!(
            detail.author_id.as_ref().map(AuthorId::as_str),
            Some("/authors/OL79034A")
        );
        let links = detail.links.unwrap();
        assert_eq!(links[0].title, "Wikipedia");
    }

    #[test]
    fn test_normalize_author() {
        let author = normalize_author(
            serde_json::from_value(json!({
                "personal_name": "Frank Herbert",
                "links": [{ "url": "https://dunenovels.com" }, { "url": "https://other" }]
            }))
            .unwrap(),
        );
        assert_eq!(author.name, "Frank Herbert");
        assert_eq!(author.link.as_deref(), Some("https://dunenovels.com"));

        let bare: AuthorResponse = serde_json::from_value(json!({ "name": "Anon" })).unwrap();
        let bare = normalize_author(bare);
        assert_eq!(bare.name, "Anon");
        assert_eq!(bare.link, None);
    }

    proptest! {
        #[test]
        fn prop_docs_never_exceed_page_size(count in 0usize..40, num_found in 0u64..10_000) {
            let docs: Vec<SearchDoc> = (0..count)
                .map(|i| SearchDoc {
                    key: Some(format!("/works/OL{}W", i)),
                    ..SearchDoc::default()
                })
                .collect();
            let response = SearchResponse { num_found, start: None, q: None, docs };
            let page = normalize_search(response, "q");
            prop_assert!(page.docs.len() <= PAGE_SIZE);
            prop_assert_eq!(page.docs.len(), count.min(PAGE_SIZE));
        }

        #[test]
        fn prop_covers_are_strictly_positive(covers in proptest::collection::vec(any::<i64>(), 0..20)) {
            let response = WorkResponse { covers: Some(covers.clone()), ..WorkResponse::default() };
            let detail = normalize_book(response);
            prop_assert!(detail.covers.iter().all(|c| *c > 0));
            prop_assert_eq!(detail.covers.len(), covers.iter().filter(|c| **c > 0).count());
        }
    }
}
