use crate::models::LinkRecord;
use crate::storage::{Storage, StorageResult};
use anyhow::Result;
use async_trait::async_trait;
use moka::future::Cache;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Cached storage wrapper that serves repeated lookups from memory
///
/// Cache keys carry the clear generation that was current when the lookup
/// started. `clear` bumps the generation only after the underlying delete
/// has finished, so an entry filled by a read racing the clear is keyed
/// under the old generation and can never be returned afterwards.
/// Misses are not cached: a code that is absent now may be created a moment later.
pub struct CachedStorage {
    /// Underlying storage implementation
    inner: Arc<dyn Storage>,
    /// Read cache for lookups (Moka cache)
    read_cache: Cache<(u64, String), LinkRecord>,
    generation: AtomicU64,
}

impl CachedStorage {
    pub fn new(inner: Arc<dyn Storage>, max_cache_entries: u64, ttl: Duration) -> Self {
        let read_cache = Cache::builder()
            .max_capacity(max_cache_entries)
            .time_to_live(ttl)
            .build();

        Self {
            inner,
            read_cache,
            generation: AtomicU64::new(0),
        }
    }

    fn current_generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }
}

#[async_trait]
impl Storage for CachedStorage {
    async fn init(&self) -> Result<()> {
        self.inner.init().await
    }

    async fn create_with_code(
        &self,
        short_code: &str,
        original_url: &str,
    ) -> StorageResult<LinkRecord> {
        let generation = self.current_generation();
        let result = self
            .inner
            .create_with_code(short_code, original_url)
            .await?;

        // Cache the newly created link
        self.read_cache
            .insert((generation, short_code.to_string()), result.clone())
            .await;

        Ok(result)
    }

    async fn get(&self, short_code: &str) -> Result<Option<LinkRecord>> {
        let key = (self.current_generation(), short_code.to_string());

        if let Some(cached) = self.read_cache.get(&key).await {
            return Ok(Some(cached));
        }

        // Cache miss - fetch from underlying storage
        let result = self.inner.get(short_code).await?;
        if let Some(ref record) = result {
            self.read_cache.insert(key, record.clone()).await;
        }

        Ok(result)
    }

    async fn find_by_url(&self, original_url: &str) -> Result<Option<LinkRecord>> {
        self.inner.find_by_url(original_url).await
    }

    async fn list(&self) -> Result<Vec<LinkRecord>> {
        self.inner.list().await
    }

    async fn clear(&self) -> Result<u64> {
        let removed = self.inner.clear().await?;

        self.generation.fetch_add(1, Ordering::AcqRel);
        self.read_cache.invalidate_all();

        Ok(removed)
    }
}
