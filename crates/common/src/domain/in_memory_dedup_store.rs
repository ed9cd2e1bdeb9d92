use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::dedup::DedupStore;
use crate::domain::error::DomainResult;

/// In-memory [`DedupStore`] with time-based expiry.
///
/// Used by tests and single-process deployments; production deployments use
/// the Redis-backed store. Expired entries are dropped lazily on access and
/// swept whenever a write touches the map.
#[derive(Default)]
pub struct InMemoryDedupStore {
    entries: RwLock<HashMap<String, Record>>,
}

struct Record {
    value: String,
    expires_at: Instant,
}

impl Record {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

impl InMemoryDedupStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The stored value for a live key, if any. Test helper.
    pub async fn get(&self, key: &str) -> Option<String> {
        let now = Instant::now();
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|record| record.is_live(now))
            .map(|record| record.value.clone())
    }
}

#[async_trait]
impl DedupStore for InMemoryDedupStore {
    async fn exists(&self, key: &str) -> DomainResult<bool> {
        let now = Instant::now();
        let entries = self.entries.read().await;
        Ok(entries
            .get(key)
            .map(|record| record.is_live(now))
            .unwrap_or(false))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> DomainResult<()> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        entries.retain(|_, record| record.is_live(now));
        entries.insert(
            key.to_string(),
            Record {
                value: value.to_string(),
                expires_at: now + ttl,
            },
        );
        Ok(())
    }

    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> DomainResult<bool> {
        let now = Instant::now();
        // The write lock spans check and insert, so racing callers on one
        // key observe exactly one successful insert.
        let mut entries = self.entries.write().await;
        entries.retain(|_, record| record.is_live(now));
        if entries.contains_key(key) {
            return Ok(false);
        }
        entries.insert(
            key.to_string(),
            Record {
                value: value.to_string(),
                expires_at: now + ttl,
            },
        );
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_then_exists() {
        let store = InMemoryDedupStore::new();

        store
            .set("m1", "PROCESSED", Duration::from_secs(60))
            .await
            .unwrap();

        assert!(store.exists("m1").await.unwrap());
        assert!(!store.exists("m2").await.unwrap());
        assert_eq!(store.get("m1").await, Some("PROCESSED".to_string()));
    }

    #[tokio::test]
    async fn test_set_if_absent_inserts_only_once() {
        let store = InMemoryDedupStore::new();

        let first = store
            .set_if_absent("m1", "PROCESSED", Duration::from_secs(60))
            .await
            .unwrap();
        let second = store
            .set_if_absent("m1", "PROCESSED", Duration::from_secs(60))
            .await
            .unwrap();

        assert!(first);
        assert!(!second);
    }

    #[tokio::test]
    async fn test_entries_expire_after_ttl() {
        let store = InMemoryDedupStore::new();

        store
            .set("m1", "PROCESSED", Duration::from_millis(20))
            .await
            .unwrap();
        assert!(store.exists("m1").await.unwrap());

        tokio::time::sleep(Duration::from_millis(40)).await;

        assert!(!store.exists("m1").await.unwrap());
        // The key is insertable again once the old record has lapsed
        assert!(store
            .set_if_absent("m1", "PROCESSED", Duration::from_secs(60))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_concurrent_set_if_absent_admits_exactly_one() {
        let store = std::sync::Arc::new(InMemoryDedupStore::new());

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .set_if_absent("m1", "PROCESSED", Duration::from_secs(60))
                    .await
                    .unwrap()
            }));
        }

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }

        assert_eq!(winners, 1);
    }
}
