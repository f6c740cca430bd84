//! # Broker Client
//!
//! PostgreSQL message queue client built on the pgmq crate. The pipeline
//! talks to the broker through the [`BrokerClient`] trait so consumers can
//! be exercised against an in-memory broker in tests; `PgmqBroker` is the
//! production implementation.
//!
//! Prefetch semantics: consumers fetch exactly one message at a time with
//! a visibility timeout and ack by deleting it. A consumer crash before
//! the ack leaves the message to reappear after the timeout, giving
//! at-least-once delivery.

use async_trait::async_trait;
use pgmq::PGMQueue;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{PipelineError, Result};
use crate::messaging::queues::ALL_QUEUES;

/// One fetched message: broker-side id plus the raw JSON payload
#[derive(Debug, Clone)]
pub struct Delivery {
    pub msg_id: i64,
    pub payload: serde_json::Value,
}

/// Durable queue transport used by every consumer
#[async_trait]
pub trait BrokerClient: Send + Sync {
    /// Declare every pipeline queue; idempotent
    async fn ensure_topology(&self) -> Result<()>;

    /// Publish a message for immediate delivery
    async fn publish<T: Serialize + Send + Sync>(&self, queue: &str, message: &T) -> Result<i64>;

    /// Publish a message that stays invisible for `delay`
    async fn publish_delayed<T: Serialize + Send + Sync>(
        &self,
        queue: &str,
        message: &T,
        delay: Duration,
    ) -> Result<i64>;

    /// Fetch at most one message, holding it invisible for `visibility_timeout_secs`
    async fn fetch_one(&self, queue: &str, visibility_timeout_secs: i32)
        -> Result<Option<Delivery>>;

    /// Acknowledge (delete) a fetched message
    async fn ack(&self, queue: &str, msg_id: i64) -> Result<()>;
}

/// pgmq-backed broker
#[derive(Debug, Clone)]
pub struct PgmqBroker {
    pgmq: PGMQueue,
}

impl PgmqBroker {
    /// Connect using a PostgreSQL connection string
    pub async fn connect(database_url: &str) -> Result<Self> {
        info!("Connecting broker to pgmq");
        let pgmq = PGMQueue::new(database_url.to_string())
            .await
            .map_err(|e| PipelineError::queue("-", "connect", e))?;
        Ok(Self { pgmq })
    }
}

#[async_trait]
impl BrokerClient for PgmqBroker {
    async fn ensure_topology(&self) -> Result<()> {
        for queue in ALL_QUEUES {
            self.pgmq
                .create(queue)
                .await
                .map_err(|e| PipelineError::queue(queue, "create", e))?;
            debug!(queue, "queue declared");
        }
        info!("queue topology declared ({} queues)", ALL_QUEUES.len());
        Ok(())
    }

    async fn publish<T: Serialize + Send + Sync>(&self, queue: &str, message: &T) -> Result<i64> {
        let payload = serde_json::to_value(message)?;
        let msg_id = self
            .pgmq
            .send(queue, &payload)
            .await
            .map_err(|e| PipelineError::queue(queue, "send", e))?;
        debug!(queue, msg_id, "message published");
        Ok(msg_id)
    }

    async fn publish_delayed<T: Serialize + Send + Sync>(
        &self,
        queue: &str,
        message: &T,
        delay: Duration,
    ) -> Result<i64> {
        let payload = serde_json::to_value(message)?;
        let msg_id = self
            .pgmq
            .send_delay(queue, &payload, delay.as_secs())
            .await
            .map_err(|e| PipelineError::queue(queue, "send_delay", e))?;
        debug!(queue, msg_id, delay_secs = delay.as_secs(), "delayed message published");
        Ok(msg_id)
    }

    async fn fetch_one(
        &self,
        queue: &str,
        visibility_timeout_secs: i32,
    ) -> Result<Option<Delivery>> {
        let message = self
            .pgmq
            .read::<serde_json::Value>(queue, Some(visibility_timeout_secs))
            .await
            .map_err(|e| PipelineError::queue(queue, "read", e))?;

        Ok(message.map(|m| Delivery {
            msg_id: m.msg_id,
            payload: m.message,
        }))
    }

    async fn ack(&self, queue: &str, msg_id: i64) -> Result<()> {
        self.pgmq
            .delete(queue, msg_id)
            .await
            .map_err(|e| PipelineError::queue(queue, "delete", e))?;
        debug!(queue, msg_id, "message acked");
        Ok(())
    }
}
