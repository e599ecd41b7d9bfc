//! LIBRIS Core - Entity Types
//!
//! Pure data structures, identifiers, query keys and the catalog contract.
//! All other crates depend on this.

pub mod catalog;
pub mod constants;
pub mod entities;
pub mod error;
pub mod identity;
pub mod query;

pub use catalog::{
    normalize_author, normalize_book, normalize_search, record_path, search_query,
    AuthorResponse, CatalogSource, SearchResponse, WorkResponse,
};
pub use constants::*;
pub use entities::{cover_url, Author, BookDetail, BookLink, CoverSize, SearchPage, SearchResult};
pub use error::{CacheError, CatalogError, LibrisError, LibrisResult, PersistError};
pub use identity::{AuthorId, BookId, Timestamp};
pub use query::{ListParams, QueryKey, QueryScope};
