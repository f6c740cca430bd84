//! # Messaging Module
//!
//! PostgreSQL message queue (pgmq) based messaging for the crawl
//! pipeline: wire message schemas, the queue topology, and the broker
//! client used by every consumer.

pub mod client;
pub mod message;
pub mod queues;

pub use client::{BrokerClient, Delivery, PgmqBroker};
pub use message::{FrontierMessage, RetryEnvelope, WorkMessage};
