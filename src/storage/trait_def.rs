use crate::models::LinkRecord;
use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("short code already exists")]
    Conflict,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

#[async_trait]
pub trait Storage: Send + Sync {
    /// Initialize the storage (create tables, indexes, counters)
    async fn init(&self) -> Result<()>;

    /// Insert a new link only if `short_code` is not taken.
    ///
    /// The existence check and the insert are one atomic step; a taken code
    /// yields [`StorageError::Conflict`] and leaves the store untouched.
    /// `created_at` is stamped at the moment of insertion.
    async fn create_with_code(
        &self,
        short_code: &str,
        original_url: &str,
    ) -> StorageResult<LinkRecord>;

    /// Get a link by short code
    async fn get(&self, short_code: &str) -> Result<Option<LinkRecord>>;

    /// Newest link pointing at `original_url`, if any
    async fn find_by_url(&self, original_url: &str) -> Result<Option<LinkRecord>>;

    /// All links, newest first, insertion order breaking timestamp ties
    async fn list(&self) -> Result<Vec<LinkRecord>>;

    /// Remove every link in one atomic step, returning how many were removed
    async fn clear(&self) -> Result<u64>;
}
