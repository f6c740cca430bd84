//! # Result Aggregator
//!
//! Batches extracted records and upserts them to the Store keyed by each
//! record's natural key. Same batching shape as the Frontier Aggregator
//! but simpler: no dedup, an append-only buffer, and a single batch
//! upsert per flush. Flush checks happen only on message arrival, and
//! the buffer is cleared whether or not the flush succeeded.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, error, info, instrument};

use crate::config::BatchConfig;
use crate::consumers::{parse_payload, QueueConsumer};
use crate::error::{PipelineError, Result};
use crate::messaging::queues::RESULT_QUEUE;
use crate::messaging::Delivery;
use crate::models::VideoRecord;
use crate::store::CrawlStore;

/// Batching consumer for structured records
pub struct ResultAggregator<S: CrawlStore> {
    store: Arc<S>,
    config: BatchConfig,
    buffer: Vec<VideoRecord>,
    last_flush: Instant,
}

impl<S: CrawlStore> ResultAggregator<S> {
    pub fn new(store: Arc<S>, config: BatchConfig) -> Self {
        Self {
            store,
            config,
            buffer: Vec::new(),
            last_flush: Instant::now(),
        }
    }

    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Buffer one record and flush if a threshold is crossed
    pub async fn accept(&mut self, record: VideoRecord) {
        debug!(key = %record.video_url, buffered = self.buffer.len() + 1, "record buffered");
        self.buffer.push(record);

        let due = self.buffer.len() >= self.config.batch_size
            || self.last_flush.elapsed() >= self.config.batch_timeout();
        if due {
            self.flush().await;
        }
    }

    /// Upsert the buffered records in one batch; the buffer is cleared
    /// and the flush clock reset regardless of outcome.
    #[instrument(skip(self), fields(batch = self.buffer.len()))]
    pub async fn flush(&mut self) {
        if self.buffer.is_empty() {
            return;
        }

        let batch = std::mem::take(&mut self.buffer);
        self.last_flush = Instant::now();

        match self.store.batch_upsert_records(&batch).await {
            Ok(_) => info!(batch = batch.len(), "record batch upserted"),
            Err(e) => {
                error!(error = %e, batch = batch.len(), "record flush failed, batch dropped")
            }
        }
    }
}

#[async_trait]
impl<S: CrawlStore> QueueConsumer for ResultAggregator<S> {
    fn name(&self) -> &'static str {
        "result-aggregator"
    }

    fn queues(&self) -> &'static [&'static str] {
        &[RESULT_QUEUE]
    }

    async fn handle(&mut self, queue: &str, delivery: &Delivery) -> Result<()> {
        let record: VideoRecord = parse_payload(queue, &delivery.payload)?;
        if record.video_url.is_empty() {
            return Err(PipelineError::MalformedMessage {
                queue: queue.to_string(),
                reason: "empty natural key".to_string(),
            });
        }

        self.accept(record).await;
        Ok(())
    }

    async fn drain(&mut self) {
        if !self.buffer.is_empty() {
            info!(buffered = self.buffer.len(), "final record flush on shutdown");
            self.flush().await;
        }
    }
}
