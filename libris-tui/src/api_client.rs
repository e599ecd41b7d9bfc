//! HTTP client for the Open Library catalog.

use crate::config::LibrisConfig;
use async_trait::async_trait;
use libris_core::{
    normalize_author, normalize_book, normalize_search, record_path, search_query, Author,
    AuthorId, AuthorResponse, BookDetail, BookId, CatalogError, CatalogSource, LibrisResult,
    SearchPage, SearchResponse, WorkResponse,
};
use serde::de::DeserializeOwned;
use std::time::Duration;

const USER_AGENT: &str = concat!("libris/", env!("CARGO_PKG_VERSION"));

#[derive(Clone)]
pub struct OpenLibraryClient {
    client: reqwest::Client,
    base_url: String,
}

impl OpenLibraryClient {
    pub fn new(config: &LibrisConfig) -> Result<Self, reqwest::Error> {
        Self::with_base_url(&config.catalog_base_url, config.request_timeout())
    }

    pub fn with_base_url(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    fn search_request(&self, filter: &str, page: u32) -> reqwest::RequestBuilder {
        self.client
            .get(self.url("/search.json"))
            .query(&search_query(filter, page))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        url: &str,
    ) -> Result<T, CatalogError> {
        let response = request.send().await.map_err(|e| transport_error(url, &e))?;
        self.parse_response(response, url).await
    }

    async fn parse_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
        url: &str,
    ) -> Result<T, CatalogError> {
        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| transport_error(url, &e))?;
        serde_json::from_slice(&bytes).map_err(|e| CatalogError::Decode {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }
}

fn transport_error(url: &str, err: &reqwest::Error) -> CatalogError {
    let reason = if err.is_timeout() {
        "request timed out".to_string()
    } else {
        err.to_string()
    };
    CatalogError::Transport {
        url: url.to_string(),
        reason,
    }
}

#[async_trait]
impl CatalogSource for OpenLibraryClient {
    async fn search_books(&self, filter: &str, page: u32) -> LibrisResult<SearchPage> {
        let url = self.url("/search.json");
        tracing::debug!(filter, page, "Searching catalog");
        let response: SearchResponse = self.get_json(self.search_request(filter, page), &url).await?;
        Ok(normalize_search(response, filter))
    }

    async fn get_book(&self, id: &BookId) -> LibrisResult<BookDetail> {
        let url = self.url(&record_path(id.as_str()));
        tracing::debug!(book = %id, "Fetching book");
        let response: WorkResponse = self.get_json(self.client.get(&url), &url).await?;
        Ok(normalize_book(response))
    }

    async fn get_author(&self, id: &AuthorId) -> LibrisResult<Author> {
        let url = self.url(&record_path(id.as_str()));
        tracing::debug!(author = %id, "Fetching author");
        let response: AuthorResponse = self.get_json(self.client.get(&url), &url).await?;
        Ok(normalize_author(response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use libris_core::{PAGE_SIZE, SEARCH_FIELDS};

    fn client(base: &str) -> OpenLibraryClient {
        OpenLibraryClient::with_base_url(base, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_trailing_slash_is_trimmed() {
        let client = client("https://openlibrary.org/");
        assert_eq!(client.base_url(), "https://openlibrary.org");
        assert_eq!(
            client.url("/works/OL1W.json"),
            "https://openlibrary.org/works/OL1W.json"
        );
    }

    #[test]
    fn test_search_request_carries_paging_and_fields() {
        let request = client("https://openlibrary.org")
            .search_request("the lord of the rings", 3)
            .build()
            .unwrap();
        let url = request.url();
        assert_eq!(url.path(), "/search.json");

        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        let get = |name: &str| {
            pairs
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.as_str())
        };
        assert_eq!(get("q"), Some("the lord of the rings"));
        assert_eq!(get("page"), Some("3"));
        assert_eq!(get("limit"), Some(PAGE_SIZE.to_string().as_str()));
        assert_eq!(get("fields"), Some(SEARCH_FIELDS));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_transport_error() {
        let client = OpenLibraryClient::with_base_url(
            "http://127.0.0.1:9",
            Duration::from_millis(500),
        )
        .unwrap();
        let err = client.get_book(&BookId::new("/works/OL1W")).await.unwrap_err();
        assert!(matches!(
            err,
            libris_core::LibrisError::Catalog(CatalogError::Transport { .. })
        ));
    }
}
