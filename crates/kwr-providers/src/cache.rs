//! Content-addressed embedding cache (§4.C).
//!
//! Two layers, both optional: an in-process LRU (this module) in front of a
//! `DurableEmbeddingStore`. Eviction is by entry count only — there is no
//! TTL, matching the "No TTL; eviction is LRU" invariant. The teacher's
//! `LRUCache<K,V>` (`zero_latency_search::cache`) carried a `ttl: Duration`
//! field; it is dropped here rather than kept unused.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;

use kwr_core::values::Phrase;
use kwr_core::Result;

use crate::traits::EmbeddingGenerator;

/// Entry-count-bounded LRU. No expiry field by design.
#[derive(Debug)]
pub struct LRUCache<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    entries: HashMap<K, V>,
    access_order: Vec<K>,
    max_entries: usize,
}

impl<K, V> LRUCache<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: HashMap::new(),
            access_order: Vec::new(),
            max_entries,
        }
    }

    pub fn get(&mut self, key: &K) -> Option<V> {
        let value = self.entries.get(key).cloned()?;
        if let Some(pos) = self.access_order.iter().position(|k| k == key) {
            self.access_order.remove(pos);
        }
        self.access_order.push(key.clone());
        Some(value)
    }

    pub fn insert(&mut self, key: K, value: V) {
        if self.entries.contains_key(&key) {
            self.remove(&key);
        }
        while self.entries.len() >= self.max_entries && !self.access_order.is_empty() {
            let lru_key = self.access_order.remove(0);
            self.entries.remove(&lru_key);
        }
        self.entries.insert(key.clone(), value);
        self.access_order.push(key);
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        if let Some(pos) = self.access_order.iter().position(|k| k == key) {
            self.access_order.remove(pos);
        }
        self.entries.remove(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// SHA-256 of the normalized phrase. One key per distinct phrase content,
/// independent of which run produced it.
pub type PhraseKey = String;

pub fn phrase_key(phrase: &Phrase) -> PhraseKey {
    let mut hasher = Sha256::new();
    hasher.update(phrase.as_str().as_bytes());
    format!("{:x}", hasher.finalize())
}

#[derive(Debug, Default, Clone)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

impl CacheStats {
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

type PendingFuture = Shared<BoxFuture<'static, Result<Vec<f32>>>>;

/// In-process embedding cache with an at-most-one-in-flight-compute-per-phrase
/// guarantee. Concurrent `get_or_compute` calls for the same phrase share one
/// future rather than issuing redundant provider calls.
pub struct EmbeddingCache {
    lru: Mutex<LRUCache<PhraseKey, Vec<f32>>>,
    pending: DashMap<PhraseKey, PendingFuture>,
    durable: Option<Arc<dyn crate::traits::DurableEmbeddingStore>>,
    stats: Mutex<CacheStats>,
}

impl EmbeddingCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            lru: Mutex::new(LRUCache::new(capacity)),
            pending: DashMap::new(),
            durable: None,
            stats: Mutex::new(CacheStats::default()),
        }
    }

    pub fn with_durable_store(mut self, store: Arc<dyn crate::traits::DurableEmbeddingStore>) -> Self {
        self.durable = Some(store);
        self
    }

    pub async fn stats(&self) -> CacheStats {
        self.stats.lock().await.clone()
    }

    /// Returns the cached embedding for `phrase`, computing it via `compute`
    /// if absent. Concurrent callers for the same phrase observe exactly one
    /// invocation of `compute`.
    pub async fn get_or_compute<F>(&self, phrase: &Phrase, compute: F) -> Result<Vec<f32>>
    where
        F: FnOnce() -> BoxFuture<'static, Result<Vec<f32>>>,
    {
        let key = phrase_key(phrase);

        if let Some(hit) = self.lru.lock().await.get(&key) {
            self.stats.lock().await.hits += 1;
            return Ok(hit);
        }

        if let Some(durable) = &self.durable {
            if let Some(hit) = durable.get(&key).await? {
                self.stats.lock().await.hits += 1;
                self.lru.lock().await.insert(key, hit.clone());
                return Ok(hit);
            }
        }

        if let Some(in_flight) = self.pending.get(&key) {
            let fut = in_flight.clone();
            drop(in_flight);
            self.stats.lock().await.misses += 1;
            return fut.await;
        }

        self.stats.lock().await.misses += 1;
        let shared: PendingFuture = compute().shared();
        self.pending.insert(key.clone(), shared.clone());

        let result = shared.await;
        self.pending.remove(&key);

        if let Ok(embedding) = &result {
            self.lru.lock().await.insert(key.clone(), embedding.clone());
            if let Some(durable) = &self.durable {
                durable.put(&key, embedding.clone()).await.ok();
            }
        }
        result
    }
}

/// Wraps any `EmbeddingGenerator` with the content-addressed cache, so a
/// phrase embedded twice (even concurrently, even across batches) costs the
/// inner provider exactly one call.
pub struct CachedEmbeddingGenerator {
    inner: Arc<dyn EmbeddingGenerator>,
    cache: EmbeddingCache,
}

impl CachedEmbeddingGenerator {
    pub fn new(inner: Arc<dyn EmbeddingGenerator>, capacity: usize) -> Self {
        Self { inner, cache: EmbeddingCache::new(capacity) }
    }

    pub async fn stats(&self) -> CacheStats {
        self.cache.stats().await
    }
}

#[async_trait]
impl EmbeddingGenerator for CachedEmbeddingGenerator {
    async fn generate_embedding(&self, text: &str) -> Result<Vec<f32>> {
        let phrase = Phrase::new(text).map_err(|e| kwr_core::KwrError::input_validation("text", e))?;
        let inner = self.inner.clone();
        let owned = text.to_string();
        self.cache
            .get_or_compute(&phrase, move || Box::pin(async move { inner.generate_embedding(&owned).await }))
            .await
    }

    async fn generate_batch_embeddings(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let futures = texts.iter().map(|&text| self.generate_embedding(text));
        futures::future::try_join_all(futures).await
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lru_evicts_oldest_entry_first() {
        let mut cache: LRUCache<String, u32> = LRUCache::new(2);
        cache.insert("a".into(), 1);
        cache.insert("b".into(), 2);
        cache.insert("c".into(), 3);
        assert_eq!(cache.len(), 2);
        assert!(cache.get(&"a".to_string()).is_none());
        assert!(cache.get(&"c".to_string()).is_some());
    }

    #[test]
    fn lru_get_refreshes_recency() {
        let mut cache: LRUCache<String, u32> = LRUCache::new(2);
        cache.insert("a".into(), 1);
        cache.insert("b".into(), 2);
        cache.get(&"a".to_string());
        cache.insert("c".into(), 3);
        assert!(cache.get(&"b".to_string()).is_none());
        assert!(cache.get(&"a".to_string()).is_some());
    }

    #[tokio::test]
    async fn get_or_compute_caches_result() {
        let cache = EmbeddingCache::new(16);
        let phrase = Phrase::new("social selling tools").unwrap();

        let v1 = cache
            .get_or_compute(&phrase, || {
                Box::pin(async { Ok(vec![1.0, 2.0, 3.0]) })
            })
            .await
            .unwrap();
        assert_eq!(v1, vec![1.0, 2.0, 3.0]);
        assert_eq!(cache.stats().await.misses, 1);

        let v2 = cache
            .get_or_compute(&phrase, || {
                Box::pin(async { panic!("should not recompute on cache hit") })
            })
            .await
            .unwrap();
        assert_eq!(v2, vec![1.0, 2.0, 3.0]);
        assert_eq!(cache.stats().await.hits, 1);
    }

    /// Property 12: a phrase embedded twice concurrently costs exactly one
    /// provider call. `compute` yields once before resolving so the second
    /// `get_or_compute` call is polled while the first is still in flight and
    /// has to observe (and share) the pending future rather than starting a
    /// second one.
    #[tokio::test]
    async fn concurrent_get_or_compute_shares_one_in_flight_call() {
        let cache = EmbeddingCache::new(16);
        let phrase = Phrase::new("social selling tools").unwrap();
        let calls = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));

        let compute = || {
            let calls = calls.clone();
            Box::pin(async move {
                calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                tokio::task::yield_now().await;
                Ok(vec![4.0, 5.0, 6.0])
            }) as BoxFuture<'static, Result<Vec<f32>>>
        };

        let (first, second) = tokio::join!(
            cache.get_or_compute(&phrase, compute),
            cache.get_or_compute(&phrase, compute),
        );

        assert_eq!(first.unwrap(), vec![4.0, 5.0, 6.0]);
        assert_eq!(second.unwrap(), vec![4.0, 5.0, 6.0]);
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }
}
