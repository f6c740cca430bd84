//! # DLX Re-entry Consumer
//!
//! Listens on the three delay-tier queues; a retry envelope becomes
//! visible once its broker-side delay elapses. Processing is the same
//! state machine as the work dispatcher, entered with the envelope's
//! non-zero retry count, so a URL that keeps failing climbs the ladder
//! from wherever it left off and a URL that recovers takes the normal
//! success path.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use crate::config::RetryConfig;
use crate::consumers::dispatcher::WorkDispatcher;
use crate::consumers::{parse_payload, QueueConsumer};
use crate::error::{PipelineError, Result};
use crate::messaging::queues::{RETRY_TIER_A, RETRY_TIER_B, RETRY_TIER_C};
use crate::messaging::{BrokerClient, Delivery, RetryEnvelope};
use crate::scrape::Scraper;
use crate::store::CrawlStore;

/// Consumer for expired retry-tier messages
pub struct DlxReentryConsumer<S: CrawlStore, B: BrokerClient, Sc: Scraper> {
    dispatcher: WorkDispatcher<S, B, Sc>,
}

impl<S: CrawlStore, B: BrokerClient, Sc: Scraper> DlxReentryConsumer<S, B, Sc> {
    pub fn new(store: Arc<S>, broker: Arc<B>, scraper: Arc<Sc>, retry: RetryConfig) -> Self {
        Self {
            dispatcher: WorkDispatcher::new(store, broker, scraper, retry),
        }
    }
}

#[async_trait]
impl<S: CrawlStore, B: BrokerClient, Sc: Scraper> QueueConsumer
    for DlxReentryConsumer<S, B, Sc>
{
    fn name(&self) -> &'static str {
        "dlx-reentry"
    }

    fn queues(&self) -> &'static [&'static str] {
        &[RETRY_TIER_A, RETRY_TIER_B, RETRY_TIER_C]
    }

    async fn handle(&mut self, queue: &str, delivery: &Delivery) -> Result<()> {
        let envelope: RetryEnvelope = parse_payload(queue, &delivery.payload)?;
        if envelope.url.is_empty() {
            return Err(PipelineError::MalformedMessage {
                queue: queue.to_string(),
                reason: "empty url".to_string(),
            });
        }

        debug!(
            url = %envelope.url,
            retry_count = envelope.retry_count,
            queue,
            "retrying URL from delay tier"
        );
        self.dispatcher
            .process_url(&envelope.url, envelope.retry_count)
            .await?;
        Ok(())
    }
}
