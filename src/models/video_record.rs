//! # Video Record Model
//!
//! The structured record extracted from a video page: two free-form
//! count metrics plus the derived media and thumbnail URL lists. The
//! source URL is the natural key; reprocessing the same URL overwrites
//! the metrics and lists and bumps `updated_at`, never duplicating a row.
//!
//! The same struct is the wire payload on the result queue, so the link
//! lists serialize as plain JSON arrays.

use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::{PgPool, QueryBuilder};

/// A structured record extracted from one video page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoRecord {
    /// Natural key: the page URL the record was extracted from
    pub video_url: String,
    pub view_count: String,
    pub like_count: String,
    pub mp4_links: Vec<String>,
    pub jpg_links: Vec<String>,
}

impl VideoRecord {
    /// Batch-upsert records keyed by `video_url`; conflicting rows get
    /// their metrics and link lists replaced and `updated_at` bumped.
    pub async fn batch_upsert(pool: &PgPool, records: &[VideoRecord]) -> Result<u64, sqlx::Error> {
        if records.is_empty() {
            return Ok(0);
        }

        let mut builder: QueryBuilder<sqlx::Postgres> = QueryBuilder::new(
            "INSERT INTO video_records (video_url, view_count, like_count, mp4_links, jpg_links) ",
        );
        builder.push_values(records, |mut b, record| {
            b.push_bind(&record.video_url)
                .push_bind(&record.view_count)
                .push_bind(&record.like_count)
                .push_bind(Json(&record.mp4_links))
                .push_bind(Json(&record.jpg_links));
        });
        builder.push(
            " ON CONFLICT (video_url) DO UPDATE SET \
             view_count = EXCLUDED.view_count, \
             like_count = EXCLUDED.like_count, \
             mp4_links = EXCLUDED.mp4_links, \
             jpg_links = EXCLUDED.jpg_links, \
             updated_at = NOW()",
        );

        let result = builder.build().execute(pool).await?;
        Ok(result.rows_affected())
    }
}
