use crate::domain_model::UserId;
use crate::domain_port::*;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Single-process token cache. Entries are grouped per `(namespace, subject)`
/// bucket, so `delete_all` drops one bucket and `take` runs under that
/// bucket's shard lock.
pub struct MemoryTokenCache {
    buckets: DashMap<String, HashMap<String, DateTime<Utc>>>,
    clock: Arc<dyn Clock>,
}

impl MemoryTokenCache {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        MemoryTokenCache {
            buckets: DashMap::new(),
            clock,
        }
    }
}

#[async_trait::async_trait]
impl TokenCache for MemoryTokenCache {
    async fn put(
        &self,
        namespace: &str,
        subject: UserId,
        token: &str,
        ttl: Duration,
    ) -> Result<(), TokenCacheError> {
        if ttl.is_zero() {
            return Ok(());
        }
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| TokenCacheError::Store(format!("ttl out of range: {}", e)))?;
        let now = self.clock.now();

        let mut bucket = self
            .buckets
            .entry(subject_index_key(namespace, subject))
            .or_default();
        bucket.retain(|_, expires_at| now < *expires_at);
        bucket.insert(token.to_owned(), now + ttl);
        Ok(())
    }

    async fn exists(
        &self,
        namespace: &str,
        subject: UserId,
        token: &str,
    ) -> Result<bool, TokenCacheError> {
        let now = self.clock.now();
        let live = self
            .buckets
            .get(&subject_index_key(namespace, subject))
            .and_then(|bucket| bucket.get(token).copied())
            .is_some_and(|expires_at| now < expires_at);
        Ok(live)
    }

    async fn delete(
        &self,
        namespace: &str,
        subject: UserId,
        token: &str,
    ) -> Result<(), TokenCacheError> {
        let index = subject_index_key(namespace, subject);
        if let Some(mut bucket) = self.buckets.get_mut(&index) {
            bucket.remove(token);
        }
        self.buckets.remove_if(&index, |_, bucket| bucket.is_empty());
        Ok(())
    }

    async fn take(
        &self,
        namespace: &str,
        subject: UserId,
        token: &str,
    ) -> Result<bool, TokenCacheError> {
        let now = self.clock.now();
        let index = subject_index_key(namespace, subject);
        let taken = match self.buckets.get_mut(&index) {
            Some(mut bucket) => {
                let taken = bucket
                    .remove(token)
                    .is_some_and(|expires_at| now < expires_at);
                bucket.retain(|_, expires_at| now < *expires_at);
                taken
            }
            None => return Ok(false),
        };
        self.buckets.remove_if(&index, |_, bucket| bucket.is_empty());
        Ok(taken)
    }

    async fn delete_all(&self, namespace: &str, subject: UserId) -> Result<u64, TokenCacheError> {
        let now = self.clock.now();
        let removed = self
            .buckets
            .remove(&subject_index_key(namespace, subject))
            .map(|(_, bucket)| bucket.values().filter(|exp| now < **exp).count() as u64)
            .unwrap_or(0);
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra_memory::ManualClock;

    const NS: &str = "fba_token";
    const REFRESH_NS: &str = "fba_refresh_token";

    fn cache() -> (MemoryTokenCache, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::starting_now());
        (MemoryTokenCache::new(clock.clone()), clock)
    }

    #[tokio::test]
    async fn put_then_exists_matches_exact_token() {
        let (cache, _) = cache();
        cache
            .put(NS, UserId(1), "tok-a", Duration::from_secs(60))
            .await
            .unwrap();

        assert!(cache.exists(NS, UserId(1), "tok-a").await.unwrap());
        assert!(!cache.exists(NS, UserId(1), "tok-b").await.unwrap());
        assert!(!cache.exists(NS, UserId(2), "tok-a").await.unwrap());
        assert!(!cache.exists(REFRESH_NS, UserId(1), "tok-a").await.unwrap());
    }

    #[tokio::test]
    async fn entries_expire_with_the_clock() {
        let (cache, clock) = cache();
        cache
            .put(NS, UserId(1), "tok", Duration::from_secs(10))
            .await
            .unwrap();

        clock.advance(chrono::Duration::seconds(9));
        assert!(cache.exists(NS, UserId(1), "tok").await.unwrap());

        clock.advance(chrono::Duration::seconds(1));
        assert!(!cache.exists(NS, UserId(1), "tok").await.unwrap());
        assert!(!cache.take(NS, UserId(1), "tok").await.unwrap());
    }

    #[tokio::test]
    async fn zero_ttl_stores_nothing() {
        let (cache, _) = cache();
        cache.put(NS, UserId(1), "tok", Duration::ZERO).await.unwrap();
        assert!(!cache.exists(NS, UserId(1), "tok").await.unwrap());
    }

    #[tokio::test]
    async fn put_is_idempotent_for_the_same_token() {
        let (cache, _) = cache();
        for _ in 0..3 {
            cache
                .put(NS, UserId(1), "tok", Duration::from_secs(60))
                .await
                .unwrap();
        }
        assert_eq!(cache.delete_all(NS, UserId(1)).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn take_succeeds_once() {
        let (cache, _) = cache();
        cache
            .put(REFRESH_NS, UserId(1), "r", Duration::from_secs(60))
            .await
            .unwrap();

        assert!(cache.take(REFRESH_NS, UserId(1), "r").await.unwrap());
        assert!(!cache.take(REFRESH_NS, UserId(1), "r").await.unwrap());
        assert!(!cache.exists(REFRESH_NS, UserId(1), "r").await.unwrap());
    }

    #[tokio::test]
    async fn take_drops_emptied_and_lapsed_buckets() {
        let (cache, clock) = cache();
        cache
            .put(REFRESH_NS, UserId(1), "r", Duration::from_secs(60))
            .await
            .unwrap();
        assert!(cache.take(REFRESH_NS, UserId(1), "r").await.unwrap());
        assert!(cache.buckets.is_empty());

        cache
            .put(REFRESH_NS, UserId(2), "stale", Duration::from_secs(5))
            .await
            .unwrap();
        clock.advance(chrono::Duration::seconds(10));
        assert!(!cache.take(REFRESH_NS, UserId(2), "other").await.unwrap());
        assert!(cache.buckets.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_take_has_one_winner() {
        let (cache, _) = cache();
        let cache = Arc::new(cache);
        cache
            .put(REFRESH_NS, UserId(1), "r", Duration::from_secs(60))
            .await
            .unwrap();

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let cache = cache.clone();
                tokio::spawn(async move { cache.take(REFRESH_NS, UserId(1), "r").await.unwrap() })
            })
            .collect();

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn delete_is_a_no_op_when_absent() {
        let (cache, _) = cache();
        cache.delete(NS, UserId(1), "missing").await.unwrap();

        cache
            .put(NS, UserId(1), "tok", Duration::from_secs(60))
            .await
            .unwrap();
        cache.delete(NS, UserId(1), "tok").await.unwrap();
        cache.delete(NS, UserId(1), "tok").await.unwrap();
        assert!(!cache.exists(NS, UserId(1), "tok").await.unwrap());
    }

    #[tokio::test]
    async fn delete_all_is_scoped_and_repeatable() {
        let (cache, _) = cache();
        for token in ["a", "b", "c"] {
            cache
                .put(NS, UserId(1), token, Duration::from_secs(60))
                .await
                .unwrap();
        }
        cache
            .put(NS, UserId(2), "other", Duration::from_secs(60))
            .await
            .unwrap();
        cache
            .put(REFRESH_NS, UserId(1), "r", Duration::from_secs(60))
            .await
            .unwrap();

        assert_eq!(cache.delete_all(NS, UserId(1)).await.unwrap(), 3);
        assert_eq!(cache.delete_all(NS, UserId(1)).await.unwrap(), 0);

        assert!(!cache.exists(NS, UserId(1), "a").await.unwrap());
        assert!(cache.exists(NS, UserId(2), "other").await.unwrap());
        assert!(cache.exists(REFRESH_NS, UserId(1), "r").await.unwrap());
    }
}
