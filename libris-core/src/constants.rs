//! Build-time constants.

use std::time::Duration;

/// Number of results per search page.
pub const PAGE_SIZE: usize = 6;

/// Fields requested from the search endpoint.
pub const SEARCH_FIELDS: &str = "key,title,author_name,author_key,first_publish_year,cover_i";

/// Catalog host.
pub const CATALOG_BASE_URL: &str = "https://openlibrary.org";

/// Description shown when a work has none.
pub const NO_DESCRIPTION: &str = "No description available";

/// Default staleness window for every query.
pub const DEFAULT_STALE_TIME: Duration = Duration::from_secs(2 * 60);

/// Default retention window after a query loses its last observer.
pub const DEFAULT_GC_TIME: Duration = Duration::from_secs(60 * 60);

/// Staleness window for author records.
pub const AUTHOR_STALE_TIME: Duration = Duration::from_secs(20 * 60);

/// Key the persisted cache snapshot is stored under.
pub const STORAGE_NAMESPACE: &str = "libris-query-cache";

/// Persisted snapshots older than this are discarded on restore.
pub const PERSIST_MAX_AGE: Duration = Duration::from_secs(24 * 60 * 60);

/// Minimum delay between two snapshot writes.
pub const PERSIST_THROTTLE: Duration = Duration::from_secs(1);

/// Number of pages needed to show `num_found` results.
pub fn max_pages(num_found: u64) -> u32 {
    let pages = num_found.div_ceil(PAGE_SIZE as u64);
    u32::try_from(pages).unwrap_or(u32::MAX)
}
