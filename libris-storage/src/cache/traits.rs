//! Cacheable value trait and the tagged value the cache stores.
//!
//! The cache holds one `QueryData` per key. Typed callers go through
//! [`Cacheable`], which converts their value into and out of that enum.

use libris_core::{Author, BookDetail, SearchPage};
use serde::{Deserialize, Serialize};

/// Value stored in a cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum QueryData {
    SearchPage(SearchPage),
    BookDetail(BookDetail),
    Author(Author),
}

/// Marker trait for types that can be cached.
///
/// `from_data` returns `None` when the stored value belongs to another type;
/// the cache reports that as a type mismatch rather than panicking.
pub trait Cacheable: Clone + Send + Sync + 'static {
    fn into_data(self) -> QueryData;

    fn from_data(data: &QueryData) -> Option<Self>;
}

impl Cacheable for SearchPage {
    fn into_data(self) -> QueryData {
        QueryData::SearchPage(self)
    }

    fn from_data(data: &QueryData) -> Option<Self> {
        match data {
            QueryData::SearchPage(page) => Some(page.clone()),
            _ => None,
        }
    }
}

impl Cacheable for BookDetail {
    fn into_data(self) -> QueryData {
        QueryData::BookDetail(self)
    }

    fn from_data(data: &QueryData) -> Option<Self> {
        match data {
            QueryData::BookDetail(detail) => Some(detail.clone()),
            _ => None,
        }
    }
}

impl Cacheable for Author {
    fn into_data(self) -> QueryData {
        QueryData::Author(self)
    }

    fn from_data(data: &QueryData) -> Option<Self> {
        match data {
            QueryData::Author(author) => Some(author.clone()),
            _ => None,
        }
    }
}

/// Statistics about cache usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Reads answered from fresh cached data.
    pub hits: u64,
    /// Reads that had to go to the catalog.
    pub misses: u64,
    /// Network fetches actually issued (after de-duplication).
    pub fetches: u64,
    /// Entries removed by garbage collection.
    pub evictions: u64,
    /// Number of entries currently in cache.
    pub entry_count: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_stats_hit_rate() {
        let stats = CacheStats {
            hits: 80,
            misses: 20,
            ..Default::default()
        };
        assert!((stats.hit_rate() - 0.8).abs() < 0.001);

        let empty_stats = CacheStats::default();
        assert!((empty_stats.hit_rate() - 0.0).abs() < 0.001);
    }

    #[test]
    fn test_from_data_rejects_other_kinds() {
        let author = Author {
            name: "Ursula K. Le Guin".to_string(),
            link: None,
        };
        let data = author.clone().into_data();
        assert_eq!(Author::from_data(&data), Some(author));
        assert_eq!(BookDetail::from_data(&data), None);
        assert_eq!(SearchPage::from_data(&data), None);
    }
}
