use std::collections::HashMap;
use std::time::Duration;

use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use tokio::time::Instant;

use crate::db::Row;

pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone)]
struct CacheEntry {
    rows: Vec<Row>,
    created_at: Instant,
}

/// In-memory cache of final results keyed by the exact request text.
///
/// Entries expire after a fixed time-to-live and are evicted lazily by the
/// lookup that finds them stale. Lookups and stores each hold the lock for
/// their whole read/evict/write sequence, so concurrent identical requests
/// cannot interleave inside one operation.
#[derive(Debug)]
pub struct QueryCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl QueryCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn lookup(&self, request: &str) -> Option<Vec<Row>> {
        let key = cache_key(request);
        let mut entries = self.entries.lock();
        let entry = entries.get(&key)?;
        if entry.created_at.elapsed() > self.ttl {
            entries.remove(&key);
            tracing::debug!(%key, "cache entry expired");
            return None;
        }
        Some(entry.rows.clone())
    }

    /// Insert or replace the result for `request`, restarting its TTL.
    pub fn store(&self, request: &str, rows: Vec<Row>) {
        let entry = CacheEntry {
            rows,
            created_at: Instant::now(),
        };
        self.entries.lock().insert(cache_key(request), entry);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// `query:<sha256 hex>` of the request text, without any normalization.
pub fn cache_key(request: &str) -> String {
    format!("query:{}", hex::encode(Sha256::digest(request.as_bytes())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Value;
    use crate::row;

    fn rows() -> Vec<Row> {
        vec![row! { "id" => 1i64, "title" => "Heat" }]
    }

    #[tokio::test(start_paused = true)]
    async fn test_store_then_lookup_returns_rows() {
        let cache = QueryCache::default();
        cache.store("top movies", rows());
        assert_eq!(cache.lookup("top movies"), Some(rows()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_miss_for_unknown_request() {
        let cache = QueryCache::default();
        assert_eq!(cache.lookup("anything"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires_after_ttl() {
        let cache = QueryCache::new(Duration::from_secs(60));
        cache.store("q", rows());

        tokio::time::advance(Duration::from_secs(59)).await;
        assert!(cache.lookup("q").is_some());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(cache.lookup("q"), None);
        assert!(cache.is_empty());
        assert_eq!(cache.lookup("q"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_store_resets_timestamp() {
        let cache = QueryCache::new(Duration::from_secs(60));
        cache.store("q", rows());
        tokio::time::advance(Duration::from_secs(45)).await;
        cache.store("q", vec![]);
        tokio::time::advance(Duration::from_secs(45)).await;
        assert_eq!(cache.lookup("q"), Some(vec![]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_requests_are_not_normalized() {
        let cache = QueryCache::default();
        cache.store("Top movies", rows());
        assert_eq!(cache.lookup("top movies"), None);
        assert_eq!(cache.lookup("Top movies "), None);
    }

    #[test]
    fn test_cache_key_is_stable_hex() {
        let key = cache_key("hello");
        assert_eq!(
            key,
            "query:2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_access_to_one_key_stays_consistent() {
        let cache = std::sync::Arc::new(QueryCache::default());
        let stored = |n: i64| vec![row! { "writer" => n, "copy" => n }];

        let tasks: Vec<_> = (0..32i64)
            .map(|n| {
                let cache = cache.clone();
                tokio::spawn(async move {
                    let mut seen = Vec::new();
                    for _ in 0..50 {
                        cache.store("shared", stored(n));
                        if let Some(rows) = cache.lookup("shared") {
                            seen.push(rows);
                        }
                        tokio::task::yield_now().await;
                    }
                    seen
                })
            })
            .collect();

        for task in tasks {
            for rows in task.await.unwrap() {
                assert_eq!(rows.len(), 1);
                let Some(Value::Int(writer)) = rows[0].get("writer").cloned() else {
                    panic!("unexpected cached rows: {:?}", rows);
                };
                assert!((0..32).contains(&writer));
                assert_eq!(rows, stored(writer));
            }
        }
        assert_eq!(cache.len(), 1);
        assert!(cache.lookup("shared").is_some());
    }
}
