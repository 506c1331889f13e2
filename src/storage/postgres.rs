use crate::allocator::SequenceSource;
use crate::models::LinkRecord;
use crate::storage::{rows_into_records, LinkRow, Storage, StorageError, StorageResult};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::Arc;

/// Advisory lock key serializing link inserts.
const LINK_INSERT_LOCK: i64 = 0x736e_6970;

pub struct PostgresStorage {
    pool: Arc<PgPool>,
}

impl PostgresStorage {
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .context("failed to connect to PostgreSQL")?;
        Ok(Self {
            pool: Arc::new(pool),
        })
    }
}

#[async_trait]
impl Storage for PostgresStorage {
    async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS links (
                id BIGSERIAL PRIMARY KEY,
                short_code TEXT NOT NULL UNIQUE,
                original_url TEXT NOT NULL,
                created_at BIGINT NOT NULL
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

        // Backs sequential codes; nextval is durable and never rolls back
        sqlx::query("CREATE SEQUENCE IF NOT EXISTS link_codes_seq")
            .execute(self.pool.as_ref())
            .await?;

        Ok(())
    }

    async fn create_with_code(
        &self,
        short_code: &str,
        original_url: &str,
    ) -> StorageResult<LinkRecord> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::Other(e.into()))?;

        // Inserts take turns so ids and timestamps both follow commit order
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(LINK_INSERT_LOCK)
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::Other(e.into()))?;

        let row = sqlx::query_as::<_, LinkRow>(
            r#"
            INSERT INTO links (short_code, original_url, created_at)
            VALUES (
                $1,
                $2,
                GREATEST(
                    FLOOR(EXTRACT(EPOCH FROM clock_timestamp()) * 1000)::BIGINT,
                    COALESCE((SELECT MAX(created_at) FROM links), 0)
                )
            )
            ON CONFLICT (short_code) DO NOTHING
            RETURNING id, short_code, original_url, created_at
            "#,
        )
        .bind(short_code)
        .bind(original_url)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| StorageError::Other(e.into()))?;

        tx.commit()
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
            WHERE short_code = $1
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
            WHERE original_url = $1
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
impl SequenceSource for PostgresStorage {
    async fn next_sequence(&self) -> Result<u64> {
        let value = sqlx::query_scalar::<_, i64>("SELECT nextval('link_codes_seq')")
            .fetch_one(self.pool.as_ref())
            .await?;

        Ok(u64::try_from(value)?)
    }
}
