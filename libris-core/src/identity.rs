//! Identity types for LIBRIS entities
//!
//! Catalog identifiers are opaque path strings handed out by the remote
//! service (`/works/OL45804W`, `/authors/OL23919A`). They are wrapped in
//! newtypes so a book id can never be passed where an author id is expected.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Path prefix the catalog uses for author records.
pub const AUTHOR_PATH_PREFIX: &str = "/authors/";

macro_rules! catalog_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self::new(id)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

catalog_id!(
    /// Identifier of a catalog work, e.g. `/works/OL45804W`.
    BookId
);

catalog_id!(
    /// Identifier of a catalog author, e.g. `/authors/OL23919A`.
    AuthorId
);

impl AuthorId {
    /// Build an author id from the bare key the search endpoint returns
    /// (`OL23919A`). Keys that already carry the path prefix are kept as-is.
    pub fn from_key(key: &str) -> Self {
        if key.starts_with(AUTHOR_PATH_PREFIX) {
            Self::new(key)
        } else {
            Self(format!("{AUTHOR_PATH_PREFIX}{key}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_author_id_from_bare_key() {
        assert_eq!(AuthorId::from_key("OL23919A").as_str(), "/authors/OL23919A");
    }

    #[test]
    fn test_author_id_from_prefixed_key() {
        assert_eq!(
            AuthorId::from_key("/authors/OL23919A").as_str(),
            "/authors/OL23919A"
        );
    }

    #[test]
    fn test_ids_serialize_transparently() {
        let id = BookId::new("/works/OL45804W");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"/works/OL45804W\"");
        let back: BookId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
