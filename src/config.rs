//! # Pipeline Configuration
//!
//! Configuration for the crawl pipeline consumers: batching thresholds,
//! retry ladder delays, and consumer polling behavior. Values come from
//! defaults overridden by environment variables; the loaded configuration
//! is validated before any consumer starts.
//!
//! # Examples
//!
//! ```rust
//! use crawlq::config::PipelineConfig;
//!
//! let config = PipelineConfig::default();
//! assert_eq!(config.frontier.batch_size, 100);
//! assert_eq!(config.frontier.batch_timeout_secs, 3);
//! assert_eq!(config.results.batch_size, 50);
//! assert!(config.validate().is_ok());
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

use crate::error::{PipelineError, Result};

/// Batching behavior for an aggregating consumer
///
/// Flush conditions are evaluated only when a message arrives: a buffer
/// that stops receiving messages can sit past `batch_timeout_secs`
/// indefinitely. There is deliberately no background flush timer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Flush when the buffer reaches this many entries
    pub batch_size: usize,
    /// Flush when this many seconds have passed since the last flush,
    /// checked at message-arrival time only
    pub batch_timeout_secs: u64,
}

impl BatchConfig {
    pub fn batch_timeout(&self) -> Duration {
        Duration::from_secs(self.batch_timeout_secs)
    }
}

/// Delays for the escalating retry ladder
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Delay before the first retry (tier A)
    pub tier_a_delay_secs: u64,
    /// Delay before the second retry (tier B)
    pub tier_b_delay_secs: u64,
    /// Delay before the third retry (tier C)
    pub tier_c_delay_secs: u64,
}

/// Consumer loop behavior
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ConsumerConfig {
    /// Sleep between polls when a queue is empty
    pub poll_interval_ms: u64,
    /// Visibility timeout for an in-flight message; the broker redelivers
    /// if the consumer crashes before acking (at-least-once)
    pub visibility_timeout_secs: i32,
}

impl ConsumerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Top-level pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// PostgreSQL connection string, shared by the Store and the broker
    pub database_url: String,
    pub frontier: BatchConfig,
    pub results: BatchConfig,
    pub retry: RetryConfig,
    pub consumer: ConsumerConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            database_url: "postgresql://localhost/crawlq".to_string(),
            frontier: BatchConfig {
                batch_size: 100,
                batch_timeout_secs: 3,
            },
            results: BatchConfig {
                batch_size: 50,
                batch_timeout_secs: 10,
            },
            retry: RetryConfig {
                tier_a_delay_secs: 300,
                tier_b_delay_secs: 600,
                tier_c_delay_secs: 900,
            },
            consumer: ConsumerConfig {
                poll_interval_ms: 250,
                visibility_timeout_secs: 60,
            },
        }
    }
}

impl PipelineConfig {
    /// Load configuration from environment variables over defaults
    ///
    /// Recognized variables: `DATABASE_URL`, `CRAWLQ_FRONTIER_BATCH_SIZE`,
    /// `CRAWLQ_FRONTIER_BATCH_TIMEOUT_SECS`, `CRAWLQ_RESULT_BATCH_SIZE`,
    /// `CRAWLQ_RESULT_BATCH_TIMEOUT_SECS`, `CRAWLQ_POLL_INTERVAL_MS`,
    /// `CRAWLQ_VISIBILITY_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(url) = env::var("DATABASE_URL") {
            config.database_url = url;
        }
        if let Some(v) = read_env_var("CRAWLQ_FRONTIER_BATCH_SIZE")? {
            config.frontier.batch_size = v;
        }
        if let Some(v) = read_env_var("CRAWLQ_FRONTIER_BATCH_TIMEOUT_SECS")? {
            config.frontier.batch_timeout_secs = v;
        }
        if let Some(v) = read_env_var("CRAWLQ_RESULT_BATCH_SIZE")? {
            config.results.batch_size = v;
        }
        if let Some(v) = read_env_var("CRAWLQ_RESULT_BATCH_TIMEOUT_SECS")? {
            config.results.batch_timeout_secs = v;
        }
        if let Some(v) = read_env_var("CRAWLQ_POLL_INTERVAL_MS")? {
            config.consumer.poll_interval_ms = v;
        }
        if let Some(v) = read_env_var("CRAWLQ_VISIBILITY_TIMEOUT_SECS")? {
            config.consumer.visibility_timeout_secs = v;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate the loaded configuration
    pub fn validate(&self) -> Result<()> {
        if self.database_url.is_empty() {
            return Err(PipelineError::Configuration(
                "database_url must not be empty".to_string(),
            ));
        }
        if self.frontier.batch_size == 0 || self.results.batch_size == 0 {
            return Err(PipelineError::Configuration(
                "batch_size must be at least 1".to_string(),
            ));
        }
        if self.consumer.visibility_timeout_secs <= 0 {
            return Err(PipelineError::Configuration(
                "visibility_timeout_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

fn read_env_var<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match env::var(name) {
        Ok(raw) => raw.parse::<T>().map(Some).map_err(|_| {
            PipelineError::Configuration(format!("{name} has invalid value: {raw}"))
        }),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_thresholds() {
        let config = PipelineConfig::default();
        assert_eq!(config.frontier.batch_size, 100);
        assert_eq!(config.frontier.batch_timeout_secs, 3);
        assert_eq!(config.results.batch_size, 50);
        assert_eq!(config.results.batch_timeout_secs, 10);
        assert_eq!(config.retry.tier_a_delay_secs, 300);
        assert_eq!(config.retry.tier_b_delay_secs, 600);
        assert_eq!(config.retry.tier_c_delay_secs, 900);
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let mut config = PipelineConfig::default();
        config.frontier.batch_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn empty_database_url_is_rejected() {
        let mut config = PipelineConfig::default();
        config.database_url = String::new();
        assert!(config.validate().is_err());
    }
}
