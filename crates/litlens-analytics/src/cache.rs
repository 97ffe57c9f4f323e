//! In-memory TTL cache for analytics results.
//!
//! Keys are the SHA-256 of their parts, so callers can key on arbitrary
//! strings (PMID lists, query text) without unbounded key sizes. Expired
//! entries are never returned.

use std::time::Duration;

use moka::future::Cache;
use sha2::{Digest, Sha256};

#[derive(Clone)]
pub struct TtlCache<V: Clone + Send + Sync + 'static> {
    inner: Cache<String, V>,
}

impl<V: Clone + Send + Sync + 'static> TtlCache<V> {
    pub fn new(ttl: Duration, capacity: u64) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    /// Stable key for a sequence of parts. Parts are length-prefixed so
    /// `["ab", "c"]` and `["a", "bc"]` differ.
    pub fn key<S: AsRef<str>>(parts: &[S]) -> String {
        let mut hasher = Sha256::new();
        for part in parts {
            let bytes = part.as_ref().as_bytes();
            hasher.update((bytes.len() as u64).to_le_bytes());
            hasher.update(bytes);
        }
        format!("{:x}", hasher.finalize())
    }

    pub async fn get(&self, key: &str) -> Option<V> {
        self.inner.get(key).await
    }

    pub async fn insert(&self, key: String, value: V) {
        self.inner.insert(key, value).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_is_stable_and_separates_parts() {
        let a = TtlCache::<u32>::key(&["ab", "c"]);
        let b = TtlCache::<u32>::key(&["a", "bc"]);
        assert_ne!(a, b);
        assert_eq!(a, TtlCache::<u32>::key(&["ab", "c"]));
        assert_eq!(a.len(), 64);
    }

    #[tokio::test]
    async fn test_get_after_insert() {
        let cache = TtlCache::new(Duration::from_secs(60), 10);
        let key = TtlCache::<String>::key(&["similar", "123"]);
        assert_eq!(cache.get(&key).await, None);
        cache.insert(key.clone(), "value".to_string()).await;
        assert_eq!(cache.get(&key).await.as_deref(), Some("value"));
    }

    #[tokio::test]
    async fn test_entries_expire() {
        let cache = TtlCache::new(Duration::from_millis(50), 10);
        cache.insert("k".to_string(), 1u32).await;
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(cache.get("k").await, None);
    }
}
