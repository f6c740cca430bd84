//! # crawlq
//!
//! Queue-driven distributed crawl pipeline over PostgreSQL message
//! queues (pgmq). Cooperating consumers discover, deduplicate, dispatch,
//! and retry the scraping of a URL graph, batch-persisting both frontier
//! URLs and extracted structured records.
//!
//! ## Components
//!
//! - **Frontier Aggregator**: dedups and batches discovered URLs,
//!   inserts the new ones, and dispatches them to the work queue.
//! - **Work Dispatcher**: scrapes one URL at a time, fanning links back
//!   to the frontier and records to the result queue.
//! - **Retry Escalator**: maps failure counts onto escalating delay
//!   tiers realized as broker-side delayed sends, ending in a terminal
//!   sink after three retries.
//! - **Result Aggregator**: batches records and upserts them by natural
//!   key.
//! - **DLX Re-entry Consumer**: picks up expired retry envelopes and
//!   runs them through the same dispatch state machine.
//!
//! Delivery is at-least-once; idempotency comes from Store guard checks,
//! and the database's unique constraints are the single source of truth
//! for deduplication across instances.
//!
//! # Example
//!
//! ```ignore
//! use crawlq::config::PipelineConfig;
//! use crawlq::messaging::{BrokerClient, PgmqBroker};
//! use crawlq::store::PgStore;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = PipelineConfig::from_env()?;
//!     let store = PgStore::connect(&config.database_url, 10).await?;
//!     let broker = PgmqBroker::connect(&config.database_url).await?;
//!     broker.ensure_topology().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod consumers;
pub mod error;
pub mod messaging;
pub mod models;
pub mod scrape;
pub mod store;

pub use config::PipelineConfig;
pub use error::{PipelineError, Result};
