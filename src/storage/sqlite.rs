use crate::allocator::SequenceSource;
use crate::models::LinkRecord;
use crate::storage::{
    rows_into_records, LinkRow, Storage, StorageError, StorageResult, LINK_SEQUENCE,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::sync::Arc;

pub struct SqliteStorage {
    pool: Arc<SqlitePool>,
}

impl SqliteStorage {
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("invalid SQLite URL '{database_url}'"))?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .context("failed to connect to SQLite")?;
        Ok(Self {
            pool: Arc::new(pool),
        })
    }
}

#[async_trait]
impl Storage for SqliteStorage {
    async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS links (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                short_code TEXT NOT NULL UNIQUE,
                original_url TEXT NOT NULL,
                created_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_links_created_at ON links(created_at DESC, id DESC)",
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_links_original_url ON links(original_url)")
            .execute(self.pool.as_ref())
            .await?;

        // Counter for sequential code allocation, never reset by clear
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS counters (
                name TEXT PRIMARY KEY,
                value INTEGER NOT NULL
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }

    async fn create_with_code(
        &self,
        short_code: &str,
        original_url: &str,
    ) -> StorageResult<LinkRecord> {
        let row = sqlx::query_as::<_, LinkRow>(
            r#"
            INSERT INTO links (short_code, original_url, created_at)
            VALUES (
                ?,
                ?,
                MAX(
                    CAST((julianday('now') - 2440587.5) * 86400000 AS INTEGER),
                    COALESCE((SELECT MAX(created_at) FROM links), 0)
                )
            )
            ON CONFLICT(short_code) DO NOTHING
            RETURNING id, short_code, original_url, created_at
            "#,
        )
        .bind(short_code)
        .bind(original_url)
        .fetch_optional(self.pool.as_ref())
        .await
        .map_err(|e| StorageError::Other(e.into()))?;

        match row {
            Some(row) => Ok(row.into_record()?),
            None => Err(StorageError::Conflict),
        }
    }

    async fn get(&self, short_code: &str) -> Result<Option<LinkRecord>> {
        let row = sqlx::query_as::<_, LinkRow>(
            r#"
            SELECT id, short_code, original_url, created_at
            FROM links
            WHERE short_code = ?
            "#,
        )
        .bind(short_code)
        .fetch_optional(self.pool.as_ref())
        .await?;

        row.map(LinkRow::into_record).transpose()
    }

    async fn find_by_url(&self, original_url: &str) -> Result<Option<LinkRecord>> {
        let row = sqlx::query_as::<_, LinkRow>(
            r#"
            SELECT id, short_code, original_url, created_at
            FROM links
            WHERE original_url = ?
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(original_url)
        .fetch_optional(self.pool.as_ref())
        .await?;

        row.map(LinkRow::into_record).transpose()
    }

    async fn list(&self) -> Result<Vec<LinkRecord>> {
        let rows = sqlx::query_as::<_, LinkRow>(
            r#"
            SELECT id, short_code, original_url, created_at
            FROM links
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .fetch_all(self.pool.as_ref())
        .await?;

        rows_into_records(rows)
    }

    async fn clear(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM links")
            .execute(self.pool.as_ref())
            .await?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl SequenceSource for SqliteStorage {
    async fn next_sequence(&self) -> Result<u64> {
        let value = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO counters (name, value) VALUES (?, 1)
            ON CONFLICT(name) DO UPDATE SET value = value + 1
            RETURNING value
            "#,
        )
        .bind(LINK_SEQUENCE)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(u64::try_from(value)?)
    }
}
