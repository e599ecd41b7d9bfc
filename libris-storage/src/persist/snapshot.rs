//! Dehydrated cache snapshots.

use std::time::Duration;

use chrono::Utc;
use libris_core::{LibrisResult, PersistError, QueryKey, Timestamp};
use serde::{Deserialize, Serialize};

use crate::cache::{age, QueryClient, QueryData};

/// One cache entry as written to durable storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DehydratedQuery {
    pub key: QueryKey,
    pub data: QueryData,
    pub data_updated_at: Timestamp,
}

/// The whole persisted cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedClient {
    /// When the snapshot was taken.
    pub timestamp: Timestamp,
    /// Snapshots with a different buster are discarded on restore.
    pub buster: String,
    pub queries: Vec<DehydratedQuery>,
}

impl PersistedClient {
    pub fn is_expired(&self, max_age: Duration, now: Timestamp) -> bool {
        age(self.timestamp, now) > max_age
    }

    pub fn to_bytes(&self) -> LibrisResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| {
            PersistError::Serialization {
                reason: e.to_string(),
            }
            .into()
        })
    }

    pub fn from_bytes(bytes: &[u8]) -> LibrisResult<Self> {
        serde_json::from_slice(bytes).map_err(|e| {
            PersistError::Serialization {
                reason: e.to_string(),
            }
            .into()
        })
    }
}

/// Snapshot every successful, persist-eligible entry of `client`.
pub fn dehydrate(client: &QueryClient, buster: &str) -> LibrisResult<PersistedClient> {
    let mut queries: Vec<DehydratedQuery> = client
        .persistable_entries()?
        .into_iter()
        .map(|(key, data, data_updated_at)| DehydratedQuery {
            key,
            data,
            data_updated_at,
        })
        .collect();
    queries.sort_by_cached_key(|query| query.key.to_string());

    Ok(PersistedClient {
        timestamp: Utc::now(),
        buster: buster.to_string(),
        queries,
    })
}

/// Load a snapshot into `client`. Returns how many entries were inserted;
/// entries the cache already holds newer data for are skipped.
pub fn hydrate(client: &QueryClient, snapshot: &PersistedClient) -> LibrisResult<usize> {
    let mut inserted = 0;
    for query in &snapshot.queries {
        if client.hydrate(
            query.key.clone(),
            query.data.clone(),
            query.data_updated_at,
            true,
        )? {
            inserted += 1;
        }
    }
    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{Cacheable, QueryDescriptor};
    use libris_core::{Author, AuthorId, BookDetail, BookId, SearchPage};

    fn detail(title: &str) -> BookDetail {
        BookDetail {
            title: title.to_string(),
            description: Some("A desert planet".to_string()),
            covers: vec![42],
            links: None,
            author_id: Some(AuthorId::new("/authors/OL1A")),
        }
    }

    #[tokio::test]
    async fn test_dehydrate_keeps_only_persisted_successes() {
        let client = QueryClient::with_defaults();

        let persisted_key = QueryKey::book_detail(BookId::new("/works/OL1W"));
        let persisted = QueryDescriptor::new(persisted_key.clone(), || async { Ok(detail("Dune")) })
            .persisted();
        client.fetch_query(&persisted).await.unwrap();

        let list = QueryDescriptor::new(QueryKey::book_list("dune", 1), || async {
            Ok(SearchPage {
                num_found: 0,
                start: Some(0),
                filter: "dune".to_string(),
                docs: vec![],
            })
        });
        client.fetch_query(&list).await.unwrap();

        let failed: QueryDescriptor<Author> = QueryDescriptor::new(
            QueryKey::author_detail(Some(AuthorId::new("/authors/OL1A"))),
            || async {
                Err(libris_core::CatalogError::Transport {
                    url: "https://openlibrary.org/authors/OL1A.json".to_string(),
                    reason: "connection reset".to_string(),
                }
                .into())
            },
        )
        .persisted();
        assert!(client.fetch_query(&failed).await.is_err());

        let snapshot = dehydrate(&client, "v1").unwrap();
        assert_eq!(snapshot.buster, "v1");
        assert_eq!(snapshot.queries.len(), 1);
        assert_eq!(snapshot.queries[0].key, persisted_key);
    }

    #[tokio::test]
    async fn test_invalidated_entries_are_not_dehydrated() {
        let client = QueryClient::with_defaults();
        let key = QueryKey::book_detail(BookId::new("/works/OL1W"));
        let desc = QueryDescriptor::new(key.clone(), || async { Ok(detail("Dune")) }).persisted();
        client.fetch_query(&desc).await.unwrap();
        client.invalidate(&key).unwrap();

        assert!(dehydrate(&client, "").unwrap().queries.is_empty());
    }

    #[test]
    fn test_hydrate_preserves_timestamps() {
        let fetched_at = Utc::now() - chrono::Duration::minutes(30);
        let key = QueryKey::book_detail(BookId::new("/works/OL1W"));
        let snapshot = PersistedClient {
            timestamp: Utc::now(),
            buster: String::new(),
            queries: vec![DehydratedQuery {
                key: key.clone(),
                data: detail("Dune").into_data(),
                data_updated_at: fetched_at,
            }],
        };

        let client = QueryClient::with_defaults();
        assert_eq!(hydrate(&client, &snapshot).unwrap(), 1);
        assert_eq!(client.data_updated_at(&key).unwrap(), Some(fetched_at));
        let restored: BookDetail = client.get_query_data(&key).unwrap().unwrap();
        assert_eq!(restored.title, "Dune");

        // Hydrating the same snapshot again changes nothing.
        assert_eq!(hydrate(&client, &snapshot).unwrap(), 0);
    }

    #[test]
    fn test_snapshot_bytes_round_trip() {
        let snapshot = PersistedClient {
            timestamp: Utc::now(),
            buster: "v2".to_string(),
            queries: vec![DehydratedQuery {
                key: QueryKey::author_detail(Some(AuthorId::new("/authors/OL1A"))),
                data: Author {
                    name: "Frank Herbert".to_string(),
                    link: Some("https://en.wikipedia.org/wiki/Frank_Herbert".to_string()),
                }
                .into_data(),
                data_updated_at: Utc::now(),
            }],
        };
        let bytes = snapshot.to_bytes().unwrap();
        assert_eq!(PersistedClient::from_bytes(&bytes).unwrap(), snapshot);
    }

    #[test]
    fn test_garbage_bytes_are_a_serialization_error() {
        let err = PersistedClient::from_bytes(b"not json").unwrap_err();
        assert!(matches!(
            err,
            libris_core::LibrisError::Persist(PersistError::Serialization { .. })
        ));
    }

    #[test]
    fn test_expiry() {
        let now = Utc::now();
        let snapshot = PersistedClient {
            timestamp: now - chrono::Duration::hours(25),
            buster: String::new(),
            queries: vec![],
        };
        assert!(snapshot.is_expired(Duration::from_secs(24 * 60 * 60), now));
        assert!(!snapshot.is_expired(Duration::from_secs(26 * 60 * 60), now));
    }
}
