//! # Work Dispatcher
//!
//! Processes exactly one URL at a time against the Scraper. Guard checks
//! (Store processed flag, local failed-URL set) make reprocessing after
//! broker redelivery idempotent. Success fans discovered links back to
//! the frontier queue and the record, if any, to the result queue;
//! failure hands the URL to the retry escalator with an incremented
//! count.
//!
//! The same state machine serves the work queue (retry_count 0) and the
//! DLX re-entry path (retry_count >= 1); each consumer owns its own
//! dispatcher instance and therefore its own failed-URL set. That set is
//! a process-local short-circuit, not a durable record; the terminal
//! sink queue is the operator-visible surface for exhausted URLs.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::config::RetryConfig;
use crate::consumers::retry::{Escalation, RetryEscalator};
use crate::consumers::{parse_payload, QueueConsumer};
use crate::error::{PipelineError, Result};
use crate::messaging::queues::{FRONTIER_QUEUE, RESULT_QUEUE, WORK_QUEUE};
use crate::messaging::{BrokerClient, Delivery, FrontierMessage, WorkMessage};
use crate::scrape::Scraper;
use crate::store::CrawlStore;

/// How one URL left the dispatcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Guard check short-circuited; nothing was scraped
    Skipped,
    /// Scrape produced output; side effects were applied
    Succeeded { links: usize, record: bool },
    /// Scrape failed; the URL went to the ladder or the terminal sink
    Escalated(Escalation),
}

/// Shared dispatch core for the work and DLX re-entry consumers
pub struct WorkDispatcher<S: CrawlStore, B: BrokerClient, Sc: Scraper> {
    store: Arc<S>,
    broker: Arc<B>,
    scraper: Arc<Sc>,
    escalator: RetryEscalator<B>,
    failed_urls: HashSet<String>,
}

impl<S: CrawlStore, B: BrokerClient, Sc: Scraper> WorkDispatcher<S, B, Sc> {
    pub fn new(store: Arc<S>, broker: Arc<B>, scraper: Arc<Sc>, retry: RetryConfig) -> Self {
        let escalator = RetryEscalator::new(Arc::clone(&broker), retry);
        Self {
            store,
            broker,
            scraper,
            escalator,
            failed_urls: HashSet::new(),
        }
    }

    /// Whether this instance already saw the URL exhaust its ladder
    pub fn is_failed(&self, url: &str) -> bool {
        self.failed_urls.contains(url)
    }

    /// Run one URL through guards, scrape, and fan-out.
    ///
    /// `retry_count` is the count carried by the incoming message; the
    /// escalator receives it incremented by one on failure.
    #[instrument(skip(self))]
    pub async fn process_url(&mut self, url: &str, retry_count: u32) -> Result<DispatchOutcome> {
        if self.store.exists_and_processed(url).await? {
            debug!(url, "already processed, skipping");
            return Ok(DispatchOutcome::Skipped);
        }
        if self.failed_urls.contains(url) {
            debug!(url, "permanently failed, skipping");
            return Ok(DispatchOutcome::Skipped);
        }

        // A scrape error and an empty outcome are the same failure
        let outcome = match self.scraper.scrape(url).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(url, error = %e, "scrape raised, treating as empty outcome");
                Default::default()
            }
        };

        if !outcome.is_success() {
            let escalation = self.escalator.dispatch(url, retry_count + 1).await?;
            if escalation == Escalation::Exhausted {
                self.failed_urls.insert(url.to_string());
            }
            return Ok(DispatchOutcome::Escalated(escalation));
        }

        self.store.mark_processed(url).await?;

        let mut published = 0usize;
        for link in &outcome.internal_links {
            if !self.store.exists_and_processed(link).await? {
                self.broker
                    .publish(FRONTIER_QUEUE, &FrontierMessage::new(link.clone()))
                    .await?;
                published += 1;
            }
        }

        let has_record = outcome.record.is_some();
        if let Some(record) = &outcome.record {
            self.broker.publish(RESULT_QUEUE, record).await?;
        }

        info!(
            url,
            links = published,
            record = has_record,
            "URL processed"
        );
        Ok(DispatchOutcome::Succeeded {
            links: published,
            record: has_record,
        })
    }

    /// Validate and dispatch one raw work payload
    pub async fn process_payload(
        &mut self,
        queue: &str,
        payload: &serde_json::Value,
    ) -> Result<DispatchOutcome> {
        let message: WorkMessage = parse_payload(queue, payload)?;
        if message.url.is_empty() {
            return Err(PipelineError::MalformedMessage {
                queue: queue.to_string(),
                reason: "empty url".to_string(),
            });
        }
        self.process_url(&message.url, message.retry_count).await
    }
}

/// Work-queue consumer wrapping the dispatch core
pub struct WorkConsumer<S: CrawlStore, B: BrokerClient, Sc: Scraper> {
    dispatcher: WorkDispatcher<S, B, Sc>,
}

impl<S: CrawlStore, B: BrokerClient, Sc: Scraper> WorkConsumer<S, B, Sc> {
    pub fn new(store: Arc<S>, broker: Arc<B>, scraper: Arc<Sc>, retry: RetryConfig) -> Self {
        Self {
            dispatcher: WorkDispatcher::new(store, broker, scraper, retry),
        }
    }
}

#[async_trait]
impl<S: CrawlStore, B: BrokerClient, Sc: Scraper> QueueConsumer for WorkConsumer<S, B, Sc> {
    fn name(&self) -> &'static str {
        "work-dispatcher"
    }

    fn queues(&self) -> &'static [&'static str] {
        &[WORK_QUEUE]
    }

    async fn handle(&mut self, queue: &str, delivery: &Delivery) -> Result<()> {
        self.dispatcher
            .process_payload(queue, &delivery.payload)
            .await?;
        Ok(())
    }
}
