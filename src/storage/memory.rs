use crate::allocator::SequenceSource;
use crate::models::LinkRecord;
use crate::storage::{from_millis, now_millis, Storage, StorageError, StorageResult};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

#[derive(Default)]
struct MemoryState {
    by_code: HashMap<String, LinkRecord>,
    /// original_url -> short code of the newest link for it
    by_url: HashMap<String, String>,
    last_id: i64,
    last_created_ms: i64,
}

/// Process-local storage.
///
/// Every mutation takes the write lock for its whole duration, so readers
/// always see a state between complete operations.
#[derive(Default)]
pub struct MemoryStorage {
    state: RwLock<MemoryState>,
    sequence: AtomicU64,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn init(&self) -> Result<()> {
        Ok(())
    }

    async fn create_with_code(
        &self,
        short_code: &str,
        original_url: &str,
    ) -> StorageResult<LinkRecord> {
        let mut state = self.state.write().await;
        if state.by_code.contains_key(short_code) {
            return Err(StorageError::Conflict);
        }

        // Clamp so a wall clock step backwards cannot reorder history
        let created_ms = now_millis().max(state.last_created_ms);
        let record = LinkRecord {
            id: state.last_id + 1,
            short_code: short_code.to_string(),
            original_url: original_url.to_string(),
            created_at: from_millis(created_ms)?,
        };
        state.last_created_ms = created_ms;
        state.last_id = record.id;
        state
            .by_url
            .insert(record.original_url.clone(), record.short_code.clone());
        state
            .by_code
            .insert(record.short_code.clone(), record.clone());

        Ok(record)
    }

    async fn get(&self, short_code: &str) -> Result<Option<LinkRecord>> {
        let state = self.state.read().await;
        Ok(state.by_code.get(short_code).cloned())
    }

    async fn find_by_url(&self, original_url: &str) -> Result<Option<LinkRecord>> {
        let state = self.state.read().await;
        Ok(state
            .by_url
            .get(original_url)
            .and_then(|code| state.by_code.get(code))
            .cloned())
    }

    async fn list(&self) -> Result<Vec<LinkRecord>> {
        let mut records: Vec<LinkRecord> = {
            let state = self.state.read().await;
            state.by_code.values().cloned().collect()
        };
        records.sort_unstable_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(records)
    }

    async fn clear(&self) -> Result<u64> {
        let mut state = self.state.write().await;
        let removed = state.by_code.len() as u64;
        state.by_code.clear();
        state.by_url.clear();
        Ok(removed)
    }
}

#[async_trait]
impl SequenceSource for MemoryStorage {
    async fn next_sequence(&self) -> Result<u64> {
        Ok(self.sequence.fetch_add(1, Ordering::SeqCst) + 1)
    }
}
