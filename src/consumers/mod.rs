//! # Queue Consumers
//!
//! The active pipeline components, each a long-running loop bound to one
//! or more broker queues and processing strictly one message at a time
//! (prefetch = 1 by construction: fetch one, handle, ack). Horizontal
//! scaling is running more instances of the same consumer; the broker
//! load-balances and may redeliver on crash, so every handler is
//! idempotent through the Store guards.
//!
//! Acknowledgment policy: the ack happens after the handler returns, so
//! successful side effects are durable before the message disappears
//! (at-least-once). Handler errors are logged and the message is acked
//! anyway rather than redelivered, trading possible loss of that unit of
//! work against redelivery storms when the Store or broker is down; see
//! DESIGN.md for this decision.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::config::ConsumerConfig;
use crate::error::{PipelineError, Result};
use crate::messaging::{BrokerClient, Delivery};

pub mod dispatcher;
pub mod dlx;
pub mod frontier;
pub mod results;
pub mod retry;

pub use dispatcher::{DispatchOutcome, WorkConsumer, WorkDispatcher};
pub use dlx::DlxReentryConsumer;
pub use frontier::FrontierAggregator;
pub use results::ResultAggregator;
pub use retry::{escalate, Escalation, RetryEscalator};

/// One pipeline consumer: its queues and its per-message handler
#[async_trait]
pub trait QueueConsumer: Send {
    fn name(&self) -> &'static str;

    /// Queues this consumer reads, polled round-robin
    fn queues(&self) -> &'static [&'static str];

    /// Handle one delivery. Returning an error never blocks the queue:
    /// the loop logs it and acks the message regardless.
    async fn handle(&mut self, queue: &str, delivery: &Delivery) -> Result<()>;

    /// Best-effort work on shutdown, after the last in-flight message
    async fn drain(&mut self) {}
}

/// Decode a JSON payload into a typed message
pub fn parse_payload<T: DeserializeOwned>(queue: &str, payload: &serde_json::Value) -> Result<T> {
    serde_json::from_value(payload.clone()).map_err(|e| PipelineError::MalformedMessage {
        queue: queue.to_string(),
        reason: e.to_string(),
    })
}

/// Drive one consumer until shutdown is signalled.
///
/// Each iteration fetches at most one message per queue, handles it, and
/// acks it. When every queue is empty the loop sleeps for the poll
/// interval. On shutdown the current message is finished, `drain` runs
/// once, and the loop exits.
pub async fn run_consumer<C, B>(
    mut consumer: C,
    broker: Arc<B>,
    config: ConsumerConfig,
    mut shutdown: watch::Receiver<bool>,
) where
    C: QueueConsumer,
    B: BrokerClient,
{
    info!(consumer = consumer.name(), queues = ?consumer.queues(), "consumer started");

    'outer: loop {
        if *shutdown.borrow() {
            break;
        }

        let mut handled_any = false;
        for queue in consumer.queues() {
            match broker
                .fetch_one(queue, config.visibility_timeout_secs)
                .await
            {
                Ok(Some(delivery)) => {
                    handled_any = true;
                    let msg_id = delivery.msg_id;
                    if let Err(e) = consumer.handle(queue, &delivery).await {
                        match e {
                            PipelineError::MalformedMessage { .. } => {
                                warn!(consumer = consumer.name(), queue, msg_id, error = %e, "discarding malformed message")
                            }
                            _ => {
                                error!(consumer = consumer.name(), queue, msg_id, error = %e, "message handling failed, acking anyway")
                            }
                        }
                    }
                    if let Err(e) = broker.ack(queue, msg_id).await {
                        error!(consumer = consumer.name(), queue, msg_id, error = %e, "ack failed; message will be redelivered");
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(consumer = consumer.name(), queue, error = %e, "fetch failed");
                }
            }

            if *shutdown.borrow() {
                break 'outer;
            }
        }

        if !handled_any {
            debug!(consumer = consumer.name(), "queues empty, idling");
            tokio::select! {
                _ = shutdown.changed() => {}
                _ = tokio::time::sleep(config.poll_interval()) => {}
            }
        }
    }

    consumer.drain().await;
    info!(consumer = consumer.name(), "consumer stopped");
}
