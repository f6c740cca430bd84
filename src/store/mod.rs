//! # Store
//!
//! Persistence boundary of the pipeline. Consumers depend on the
//! [`CrawlStore`] trait, never on the database directly, so the batching
//! and dispatch logic can run against an in-memory store in tests.
//!
//! The database's unique constraints are the single source of truth for
//! "is this URL new": in-memory dedup structures in the consumers are a
//! local optimization, not the correctness boundary. Two instances may
//! race to insert the same URL; `ON CONFLICT DO NOTHING` makes that
//! harmless.

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::collections::HashSet;
use tracing::info;

use crate::error::Result;
use crate::models::{UrlRecord, VideoRecord};

/// Persistence operations the pipeline core requires
#[async_trait]
pub trait CrawlStore: Send + Sync {
    /// Whether the URL is known and already marked processed
    async fn exists_and_processed(&self, url: &str) -> Result<bool>;

    /// Which of the given URLs already have a row, processed or not
    async fn filter_existing(&self, urls: &[String]) -> Result<HashSet<String>>;

    /// Insert URLs that do not exist yet; duplicates are skipped
    async fn batch_insert_urls(&self, urls: &[String]) -> Result<u64>;

    /// One-way transition of a URL to processed
    async fn mark_processed(&self, url: &str) -> Result<bool>;

    /// Upsert records by natural key
    async fn batch_upsert_records(&self, records: &[VideoRecord]) -> Result<u64>;
}

/// PostgreSQL-backed store
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect a pool and bootstrap the schema
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    /// Wrap an existing pool without schema bootstrap
    pub fn with_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Idempotent schema bootstrap for the two pipeline tables
    pub async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS urls (
                id BIGSERIAL PRIMARY KEY,
                url TEXT UNIQUE NOT NULL,
                domain VARCHAR(255),
                is_processed BOOLEAN NOT NULL DEFAULT FALSE,
                discovered_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                processed_at TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS video_records (
                id BIGSERIAL PRIMARY KEY,
                video_url TEXT UNIQUE NOT NULL,
                view_count TEXT,
                like_count TEXT,
                mp4_links JSONB,
                jpg_links JSONB,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_urls_processed ON urls(is_processed)")
            .execute(&self.pool)
            .await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_video_records_url ON video_records(video_url)",
        )
        .execute(&self.pool)
        .await?;

        info!("store schema initialized");
        Ok(())
    }
}

#[async_trait]
impl CrawlStore for PgStore {
    async fn exists_and_processed(&self, url: &str) -> Result<bool> {
        Ok(UrlRecord::exists_and_processed(&self.pool, url).await?)
    }

    async fn filter_existing(&self, urls: &[String]) -> Result<HashSet<String>> {
        Ok(UrlRecord::filter_existing(&self.pool, urls).await?)
    }

    async fn batch_insert_urls(&self, urls: &[String]) -> Result<u64> {
        Ok(UrlRecord::batch_insert(&self.pool, urls).await?)
    }

    async fn mark_processed(&self, url: &str) -> Result<bool> {
        Ok(UrlRecord::mark_processed(&self.pool, url).await?)
    }

    async fn batch_upsert_records(&self, records: &[VideoRecord]) -> Result<u64> {
        Ok(VideoRecord::batch_upsert(&self.pool, records).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Requires PostgreSQL; skipped when TEST_DATABASE_URL is not set.
    #[tokio::test]
    async fn schema_bootstrap_and_url_lifecycle() {
        let Ok(database_url) = std::env::var("TEST_DATABASE_URL") else {
            eprintln!("Skipping store test - no TEST_DATABASE_URL provided");
            return;
        };

        let store = PgStore::connect(&database_url, 2)
            .await
            .expect("store should connect and bootstrap");

        let url = format!(
            "https://example.com/store-test/{}",
            chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
        );
        let urls = vec![url.clone()];

        assert_eq!(store.batch_insert_urls(&urls).await.unwrap(), 1);
        // second insert hits the unique constraint and is skipped
        assert_eq!(store.batch_insert_urls(&urls).await.unwrap(), 0);

        assert!(!store.exists_and_processed(&url).await.unwrap());
        assert!(store.mark_processed(&url).await.unwrap());
        assert!(store.exists_and_processed(&url).await.unwrap());

        let existing = store.filter_existing(&urls).await.unwrap();
        assert!(existing.contains(&url));
    }
}
