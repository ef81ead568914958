//! Session-scoped single-flight memoization
//!
//! Every fetch operation in a session is memoized per key. Memoization uses
//! single-flight semantics: concurrent callers requesting the same key while
//! a fetch is in flight all await that one pending fetch instead of issuing
//! duplicate registry calls. Entry creation happens under the map lock, but
//! awaiting the fetch result does not hold it.
//!
//! Negative results are cached like positive ones: the fetch layers convert
//! registry failures to "no data" *before* the value lands in the cache, so
//! within one TTL window the worst-case registry call volume is one call per
//! distinct key regardless of graph fan-in. The only error that propagates
//! out of a fetch is cancellation, and a cancelled fetch caches nothing.

use crate::Result;
use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, OnceCell};

struct Entry<V> {
    cell: Arc<OnceCell<V>>,
    expires_at: Instant,
}

/// A memoizing map with per-key in-flight deduplication and TTL expiry.
///
/// One instance exists per operation kind (catalogs, package infos,
/// dependency groups), each with the TTL appropriate to how fast that data
/// goes stale.
pub struct SingleFlight<K, V> {
    entries: Mutex<HashMap<K, Entry<V>>>,
    ttl: Duration,
}

impl<K, V> SingleFlight<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Get the cached value for `key`, or run `fetch` to produce it.
    ///
    /// At most one fetch per key is in flight at a time; concurrent callers
    /// await the same pending result. If the winning fetch fails
    /// (cancellation), nothing is cached and the next caller runs its own
    /// fetch.
    pub async fn get_or_fetch<F, Fut>(&self, key: K, fetch: F) -> Result<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>>,
    {
        let cell = {
            let mut entries = self.entries.lock().await;
            match entries.get(&key) {
                Some(entry) if entry.expires_at > Instant::now() => entry.cell.clone(),
                _ => {
                    let cell = Arc::new(OnceCell::new());
                    entries.insert(
                        key,
                        Entry {
                            cell: cell.clone(),
                            expires_at: Instant::now() + self.ttl,
                        },
                    );
                    cell
                }
            }
        };

        let value = cell.get_or_try_init(fetch).await?;
        Ok(value.clone())
    }

    /// The cached value for `key`, if present and initialized.
    pub async fn peek(&self, key: &K) -> Option<V> {
        let entries = self.entries.lock().await;
        entries
            .get(key)
            .filter(|entry| entry.expires_at > Instant::now())
            .and_then(|entry| entry.cell.get().cloned())
    }

    /// Number of keys currently tracked (including in-flight ones).
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Drop all entries. In-flight fetches finish but their results are
    /// no longer reachable through the cache.
    pub async fn clear(&self) {
        self.entries.lock().await.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_fetches_once_per_key() {
        let cache: SingleFlight<String, u32> = SingleFlight::new(Duration::from_secs(60));
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let value = cache
                .get_or_fetch("a".to_string(), || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(7)
                })
                .await
                .unwrap();
            assert_eq!(value, 7);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_fetch() {
        let cache: Arc<SingleFlight<String, u32>> =
            Arc::new(SingleFlight::new(Duration::from_secs(60)));
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_fetch("key".to_string(), move || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                        Ok(42)
                    })
                    .await
                    .unwrap()
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap(), 42);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_negative_value_cached() {
        let cache: SingleFlight<String, Option<u32>> = SingleFlight::new(Duration::from_secs(60));
        let calls = AtomicUsize::new(0);

        for _ in 0..2 {
            let value = cache
                .get_or_fetch("missing".to_string(), || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(None)
                })
                .await
                .unwrap();
            assert_eq!(value, None);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_fetch_caches_nothing() {
        let cache: SingleFlight<String, u32> = SingleFlight::new(Duration::from_secs(60));

        let first: Result<u32> = cache
            .get_or_fetch("key".to_string(), || async { Err(Error::Cancelled) })
            .await;
        assert!(first.unwrap_err().is_cancelled());

        // A later caller gets to run its own fetch.
        let second = cache
            .get_or_fetch("key".to_string(), || async { Ok(5) })
            .await
            .unwrap();
        assert_eq!(second, 5);
    }

    #[tokio::test]
    async fn test_expired_entry_refetched() {
        let cache: SingleFlight<String, u32> = SingleFlight::new(Duration::from_millis(5));
        let calls = AtomicUsize::new(0);

        let fetch = || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(1)
        };

        cache.get_or_fetch("key".to_string(), fetch).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        cache.get_or_fetch("key".to_string(), fetch).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_peek_does_not_fetch() {
        let cache: SingleFlight<String, u32> = SingleFlight::new(Duration::from_secs(60));
        assert_eq!(cache.peek(&"key".to_string()).await, None);

        cache
            .get_or_fetch("key".to_string(), || async { Ok(9) })
            .await
            .unwrap();
        assert_eq!(cache.peek(&"key".to_string()).await, Some(9));
    }

    #[tokio::test]
    async fn test_clear_drops_entries() {
        let cache: SingleFlight<String, u32> = SingleFlight::new(Duration::from_secs(60));
        cache
            .get_or_fetch("key".to_string(), || async { Ok(1) })
            .await
            .unwrap();
        cache.clear().await;
        assert_eq!(cache.len().await, 0);
    }
}
