//! Query keys.
//!
//! A key names one cache entry: the entity kind plus every parameter that
//! identifies the request. List keys carry both the filter and the page so
//! two pages (or two filters) never share an entry.

use crate::identity::{AuthorId, BookId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// First key segment. Defaults can be registered per scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryScope {
    Books,
    Authors,
}

impl QueryScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryScope::Books => "books",
            QueryScope::Authors => "authors",
        }
    }
}

impl fmt::Display for QueryScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters of a search page request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListParams {
    pub filter: String,
    pub page: u32,
}

impl ListParams {
    pub fn new(filter: impl Into<String>, page: u32) -> Self {
        Self {
            filter: filter.into(),
            page,
        }
    }
}

/// Cache key for a single query.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QueryKey {
    BookList(ListParams),
    BookDetail { id: BookId },
    /// `id` is `None` while the owning book has not revealed its author; such
    /// a key is never fetched.
    AuthorDetail { id: Option<AuthorId> },
}

impl QueryKey {
    pub fn book_list(filter: impl Into<String>, page: u32) -> Self {
        Self::BookList(ListParams::new(filter, page))
    }

    pub fn book_detail(id: BookId) -> Self {
        Self::BookDetail { id }
    }

    pub fn author_detail(id: Option<AuthorId>) -> Self {
        Self::AuthorDetail { id }
    }

    pub fn scope(&self) -> QueryScope {
        match self {
            QueryKey::BookList(_) | QueryKey::BookDetail { .. } => QueryScope::Books,
            QueryKey::AuthorDetail { .. } => QueryScope::Authors,
        }
    }

    /// Kind segment, e.g. `list` or `detail`.
    pub fn kind(&self) -> &'static str {
        match self {
            QueryKey::BookList(_) => "list",
            QueryKey::BookDetail { .. } | QueryKey::AuthorDetail { .. } => "detail",
        }
    }

    pub fn list_params(&self) -> Option<&ListParams> {
        match self {
            QueryKey::BookList(params) => Some(params),
            _ => None,
        }
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryKey::BookList(params) => {
                write!(f, "books/list/{}/{}", params.page, params.filter)
            }
            QueryKey::BookDetail { id } => write!(f, "books/detail/{}", id),
            QueryKey::AuthorDetail { id: Some(id) } => write!(f, "authors/detail/{}", id),
            QueryKey::AuthorDetail { id: None } => f.write_str("authors/detail/-"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    #[test]
    fn test_scope_of_keys() {
        assert_eq!(QueryKey::book_list("dune", 1).scope(), QueryScope::Books);
        assert_eq!(
            QueryKey::book_detail(BookId::new("/works/OL1W")).scope(),
            QueryScope::Books
        );
        assert_eq!(QueryKey::author_detail(None).scope(), QueryScope::Authors);
    }

    #[test]
    fn test_display_is_canonical() {
        assert_eq!(QueryKey::book_list("dune", 2).to_string(), "books/list/2/dune");
        assert_eq!(
            QueryKey::author_detail(Some(AuthorId::new("/authors/OL1A"))).to_string(),
            "authors/detail//authors/OL1A"
        );
    }

    #[test]
    fn test_key_roundtrips_through_json() {
        let key = QueryKey::book_list("the hobbit", 3);
        let json = serde_json::to_string(&key).unwrap();
        let back: QueryKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, key);
    }

    proptest! {
        #[test]
        fn prop_distinct_list_params_never_collide(
            a in "[a-z ]{0,12}", pa in 1u32..50,
            b in "[a-z ]{0,12}", pb in 1u32..50,
        ) {
            let ka = QueryKey::book_list(a.clone(), pa);
            let kb = QueryKey::book_list(b.clone(), pb);
            let mut set = HashSet::new();
            set.insert(ka.clone());
            set.insert(kb.clone());
            prop_assert_eq!(set.len() == 1, a == b && pa == pb);
        }
    }
}
