//! Entity types as they are shown to the user.
//!
//! Nothing here is owned by LIBRIS: every value is reshaped from a catalog
//! response and replaced wholesale on refetch.

use crate::identity::{AuthorId, BookId};
use serde::{Deserialize, Serialize};

/// One row of a search page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: BookId,
    pub title: String,
    pub author_name: Option<String>,
    pub author_id: Option<AuthorId>,
    pub cover_id: Option<i64>,
    pub publish_year: Option<i32>,
}

/// A page of search results for one `(filter, page)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchPage {
    /// Total number of matches across all pages.
    pub num_found: u64,
    /// Offset of the first doc, when the catalog reports it.
    pub start: Option<u64>,
    /// The filter string the catalog echoed back.
    pub filter: String,
    pub docs: Vec<SearchResult>,
}

impl SearchPage {
    pub fn find(&self, id: &BookId) -> Option<&SearchResult> {
        self.docs.iter().find(|doc| &doc.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.num_found == 0
    }
}

/// External link attached to a book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookLink {
    pub title: String,
    pub url: String,
}

/// Full record of a single work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookDetail {
    pub title: String,
    /// Always present on fetched details; absent on skeletons seeded from a
    /// search page.
    pub description: Option<String>,
    /// Cover ids, strictly positive.
    pub covers: Vec<i64>,
    pub links: Option<Vec<BookLink>>,
    pub author_id: Option<AuthorId>,
}

impl BookDetail {
    /// Partial detail built from a search row, shown while the real record
    /// is loading.
    pub fn skeleton(result: &SearchResult) -> Self {
        Self {
            title: result.title.clone(),
            description: None,
            covers: result.cover_id.filter(|id| *id > 0).into_iter().collect(),
            links: None,
            author_id: result.author_id.clone(),
        }
    }

    pub fn is_skeleton(&self) -> bool {
        self.description.is_none()
    }
}

/// Author record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub name: String,
    pub link: Option<String>,
}

/// URL of a cover image on the catalog's cover service.
pub fn cover_url(cover_id: i64, size: CoverSize) -> String {
    format!(
        "https://covers.openlibrary.org/b/id/{}-{}.jpg",
        cover_id,
        size.suffix()
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverSize {
    Small,
    Medium,
    Large,
}

impl CoverSize {
    fn suffix(self) -> &'static str {
        match self {
            CoverSize::Small => "S",
            CoverSize::Medium => "M",
            CoverSize::Large => "L",
        }
    }
}
