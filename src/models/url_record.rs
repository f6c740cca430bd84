//! # URL Record Model
//!
//! A row in the `urls` table: one discovered URL and its processing
//! state. The URL string itself is the unique key; `domain` is derived
//! from it at insert time.
//!
//! ## Invariant
//!
//! Once `is_processed` is true it is never reset. The only mutation this
//! subsystem performs is the one-way `mark_processed` transition; rows
//! are never deleted here.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, QueryBuilder};
use std::collections::HashSet;

/// A discovered URL and its processing state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct UrlRecord {
    pub id: i64,
    pub url: String,
    pub domain: Option<String>,
    pub is_processed: bool,
    pub discovered_at: NaiveDateTime,
    pub processed_at: Option<NaiveDateTime>,
}

/// Derive the domain component of a URL, if it parses
pub fn domain_of(url: &str) -> Option<String> {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
}

impl UrlRecord {
    /// Batch-insert URLs, silently skipping ones that already exist.
    /// Returns the number of rows actually inserted.
    pub async fn batch_insert(pool: &PgPool, urls: &[String]) -> Result<u64, sqlx::Error> {
        if urls.is_empty() {
            return Ok(0);
        }

        let mut builder: QueryBuilder<sqlx::Postgres> =
            QueryBuilder::new("INSERT INTO urls (url, domain) ");
        builder.push_values(urls, |mut b, url| {
            b.push_bind(url).push_bind(domain_of(url));
        });
        builder.push(" ON CONFLICT (url) DO NOTHING");

        let result = builder.build().execute(pool).await?;
        Ok(result.rows_affected())
    }

    /// Which of the given URLs already have a row (processed or not)
    pub async fn filter_existing(
        pool: &PgPool,
        urls: &[String],
    ) -> Result<HashSet<String>, sqlx::Error> {
        if urls.is_empty() {
            return Ok(HashSet::new());
        }

        let existing: Vec<String> =
            sqlx::query_scalar("SELECT url FROM urls WHERE url = ANY($1)")
                .bind(urls)
                .fetch_all(pool)
                .await?;
        Ok(existing.into_iter().collect())
    }

    /// One-way transition to processed; a no-op for unknown URLs.
    /// Returns whether a row was updated.
    pub async fn mark_processed(pool: &PgPool, url: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE urls SET is_processed = TRUE, processed_at = NOW() WHERE url = $1",
        )
        .bind(url)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Whether the URL has a row that is already marked processed
    pub async fn exists_and_processed(pool: &PgPool, url: &str) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM urls WHERE url = $1 AND is_processed = TRUE)",
        )
        .bind(url)
        .fetch_one(pool)
        .await
    }

    /// Look up a single record by URL
    pub async fn find_by_url(pool: &PgPool, url: &str) -> Result<Option<UrlRecord>, sqlx::Error> {
        sqlx::query_as::<_, UrlRecord>(
            "SELECT id, url, domain, is_processed, discovered_at, processed_at \
             FROM urls WHERE url = $1",
        )
        .bind(url)
        .fetch_optional(pool)
        .await
    }
}
