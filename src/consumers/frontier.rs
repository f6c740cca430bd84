//! # Frontier Aggregator
//!
//! Turns a stream of possibly-duplicate discovered-URL messages into
//! deduplicated, batched Store inserts and Work-Queue publishes.
//!
//! Flush conditions (buffer size or elapsed time since the last flush)
//! are evaluated only when a message arrives. A buffer that stops
//! receiving messages stays unflushed past the timeout until the next
//! arrival or shutdown drain; this boundary is deliberate.
//!
//! Flush failures are logged and swallowed and the buffer is cleared
//! anyway: availability over durability. The Store's unique constraint,
//! not this buffer, is the correctness boundary for "is this URL new".

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, error, info, instrument};

use crate::config::BatchConfig;
use crate::consumers::{parse_payload, QueueConsumer};
use crate::error::{PipelineError, Result};
use crate::messaging::queues::{FRONTIER_QUEUE, WORK_QUEUE};
use crate::messaging::{BrokerClient, Delivery, FrontierMessage, WorkMessage};
use crate::store::CrawlStore;

/// Dedup/batch consumer for discovered URLs
pub struct FrontierAggregator<S: CrawlStore, B: BrokerClient> {
    store: Arc<S>,
    broker: Arc<B>,
    config: BatchConfig,
    buffer: HashSet<String>,
    last_flush: Instant,
}

impl<S: CrawlStore, B: BrokerClient> FrontierAggregator<S, B> {
    pub fn new(store: Arc<S>, broker: Arc<B>, config: BatchConfig) -> Self {
        Self {
            store,
            broker,
            config,
            buffer: HashSet::new(),
            last_flush: Instant::now(),
        }
    }

    /// Buffered URLs awaiting a flush
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Buffer one URL and flush if a threshold is crossed
    pub async fn accept(&mut self, url: String) {
        if self.buffer.insert(url.clone()) {
            debug!(url, buffered = self.buffer.len(), "URL buffered");
        }

        let due = self.buffer.len() >= self.config.batch_size
            || self.last_flush.elapsed() >= self.config.batch_timeout();
        if due {
            self.flush().await;
        }
    }

    /// Flush the buffer: filter against the Store, insert what is new,
    /// publish each new URL to the work queue. The buffer is cleared and
    /// the flush clock reset regardless of outcome.
    #[instrument(skip(self), fields(batch = self.buffer.len()))]
    pub async fn flush(&mut self) {
        if self.buffer.is_empty() {
            return;
        }

        let batch: Vec<String> = std::mem::take(&mut self.buffer).into_iter().collect();
        self.last_flush = Instant::now();

        if let Err(e) = self.flush_batch(&batch).await {
            error!(error = %e, batch = batch.len(), "frontier flush failed, batch dropped");
        }
    }

    async fn flush_batch(&self, batch: &[String]) -> Result<()> {
        let existing = self.store.filter_existing(batch).await?;
        let new_urls: Vec<String> = batch
            .iter()
            .filter(|url| !existing.contains(*url))
            .cloned()
            .collect();

        if new_urls.is_empty() {
            debug!(batch = batch.len(), "no new URLs in batch");
            return Ok(());
        }

        self.store.batch_insert_urls(&new_urls).await?;
        for url in &new_urls {
            self.broker
                .publish(WORK_QUEUE, &WorkMessage::new(url.clone()))
                .await?;
        }

        info!(
            batch = batch.len(),
            inserted = new_urls.len(),
            "frontier batch flushed"
        );
        Ok(())
    }
}

#[async_trait]
impl<S: CrawlStore, B: BrokerClient> QueueConsumer for FrontierAggregator<S, B> {
    fn name(&self) -> &'static str {
        "frontier-aggregator"
    }

    fn queues(&self) -> &'static [&'static str] {
        &[FRONTIER_QUEUE]
    }

    async fn handle(&mut self, queue: &str, delivery: &Delivery) -> Result<()> {
        let message: FrontierMessage = parse_payload(queue, &delivery.payload)?;
        if message.url.is_empty() {
            return Err(PipelineError::MalformedMessage {
                queue: queue.to_string(),
                reason: "empty url".to_string(),
            });
        }

        self.accept(message.url).await;
        Ok(())
    }

    /// Best-effort final drain of a non-empty buffer
    async fn drain(&mut self) {
        if !self.buffer.is_empty() {
            info!(buffered = self.buffer.len(), "final frontier flush on shutdown");
            self.flush().await;
        }
    }
}
