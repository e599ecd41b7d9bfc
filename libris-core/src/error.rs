//! Error types for LIBRIS operations
//!
//! Every variant carries owned strings instead of the underlying library
//! error so that `LibrisError` stays `Clone`: one failed in-flight request is
//! handed to every caller waiting on it.

use thiserror::Error;

/// Remote catalog errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("Catalog returned HTTP {status} for {url}")]
    Status { status: u16, url: String },

    #[error("Request to {url} failed: {reason}")]
    Transport { url: String, reason: String },

    #[error("Could not decode response from {url}: {reason}")]
    Decode { url: String, reason: String },
}

/// Query cache errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("Cache lock poisoned")]
    LockPoisoned,

    #[error("Cached data for {key} has an unexpected shape")]
    TypeMismatch { key: String },

    #[error("Query {key} is disabled")]
    Disabled { key: String },
}

/// Persistence adapter errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PersistError {
    #[error("Failed to open store: {reason}")]
    Open { reason: String },

    #[error("Store transaction failed: {reason}")]
    Transaction { reason: String },

    #[error("Snapshot serialization failed: {reason}")]
    Serialization { reason: String },
}

/// Master error type for all LIBRIS errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LibrisError {
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Persistence error: {0}")]
    Persist(#[from] PersistError),
}

/// Result type alias for LIBRIS operations.
pub type LibrisResult<T> = Result<T, LibrisError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_error_display_status() {
        let err = CatalogError::Status {
            status: 503,
            url: "https://openlibrary.org/search.json".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("503"));
        assert!(msg.contains("search.json"));
    }

    #[test]
    fn test_cache_error_display_disabled() {
        let err = CacheError::Disabled {
            key: "authors/detail/-".to_string(),
        };
        assert!(format!("{}", err).contains("disabled"));
    }

    #[test]
    fn test_libris_error_from_variants() {
        let catalog = LibrisError::from(CatalogError::Decode {
            url: "u".to_string(),
            reason: "eof".to_string(),
        });
        assert!(matches!(catalog, LibrisError::Catalog(_)));

        let cache = LibrisError::from(CacheError::LockPoisoned);
        assert!(matches!(cache, LibrisError::Cache(_)));

        let persist = LibrisError::from(PersistError::Open {
            reason: "denied".to_string(),
        });
        assert!(matches!(persist, LibrisError::Persist(_)));
    }

    #[test]
    fn test_libris_error_is_clone() {
        let err = LibrisError::from(CacheError::LockPoisoned);
        assert_eq!(err.clone(), err);
    }
}
