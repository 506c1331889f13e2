pub mod cached;
pub mod memory;
pub mod postgres;
pub mod sqlite;
pub mod trait_def;

pub use cached::CachedStorage;
pub use memory::MemoryStorage;
pub use postgres::PostgresStorage;
pub use sqlite::SqliteStorage;
pub use trait_def::{Storage, StorageError, StorageResult};

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::allocator::SequenceSource;
use crate::config::{CacheConfig, DatabaseBackend, DatabaseConfig};
use crate::models::LinkRecord;

/// Name of the counter row/sequence that backs sequential code allocation.
pub(crate) const LINK_SEQUENCE: &str = "link_codes";

/// Opened storage plus the counter living in the same medium.
pub struct Backend {
    pub storage: Arc<dyn Storage>,
    pub sequence: Arc<dyn SequenceSource>,
}

/// Connect to the configured backend, initialize it and wrap it in the read cache.
pub async fn open_backend(database: &DatabaseConfig, cache: &CacheConfig) -> Result<Backend> {
    let (storage, sequence) = match database.backend {
        DatabaseBackend::Memory => {
            info!("Using in-memory storage (links are lost on restart)");
            let storage = Arc::new(MemoryStorage::new());
            (storage.clone() as Arc<dyn Storage>, storage as Arc<dyn SequenceSource>)
        }
        DatabaseBackend::Sqlite => {
            info!("Using SQLite storage: {}", database.url);
            let storage =
                Arc::new(SqliteStorage::new(&database.url, database.max_connections).await?);
            (storage.clone() as Arc<dyn Storage>, storage as Arc<dyn SequenceSource>)
        }
        DatabaseBackend::Postgres => {
            info!("Using PostgreSQL storage");
            let storage =
                Arc::new(PostgresStorage::new(&database.url, database.max_connections).await?);
            (storage.clone() as Arc<dyn Storage>, storage as Arc<dyn SequenceSource>)
        }
    };

    storage.init().await?;

    let storage: Arc<dyn Storage> = if cache.max_entries > 0 {
        info!(
            max_entries = cache.max_entries,
            ttl_secs = cache.ttl_secs,
            "Lookup cache enabled"
        );
        Arc::new(CachedStorage::new(
            storage,
            cache.max_entries,
            Duration::from_secs(cache.ttl_secs),
        ))
    } else {
        storage
    };

    Ok(Backend { storage, sequence })
}

/// Current time truncated to the millisecond precision every backend stores.
pub(crate) fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

pub(crate) fn from_millis(millis: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| anyhow!("timestamp {millis} is out of range"))
}

/// Row shape shared by the SQL backends.
#[derive(Debug, FromRow)]
pub(crate) struct LinkRow {
    id: i64,
    short_code: String,
    original_url: String,
    created_at: i64,
}

impl LinkRow {
    pub(crate) fn into_record(self) -> Result<LinkRecord> {
        Ok(LinkRecord {
            id: self.id,
            short_code: self.short_code,
            original_url: self.original_url,
            created_at: from_millis(self.created_at)?,
        })
    }
}

pub(crate) fn rows_into_records(rows: Vec<LinkRow>) -> Result<Vec<LinkRecord>> {
    rows.into_iter().map(LinkRow::into_record).collect()
}
