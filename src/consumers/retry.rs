//! # Retry Escalator
//!
//! Stateless mapping from a failure count to a delay-tier publish. The
//! broker is the clock: a failed URL is published to the matching tier
//! queue with a broker-side delay, reappears for the DLX re-entry
//! consumer when the delay elapses, and reaches the terminal sink once
//! the ladder is exhausted. There is no timer or scheduler here.

use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::config::RetryConfig;
use crate::error::Result;
use crate::messaging::queues::{RETRY_TERMINAL, RETRY_TIER_A, RETRY_TIER_B, RETRY_TIER_C};
use crate::messaging::{BrokerClient, RetryEnvelope};

/// Where a failure count lands on the ladder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Escalation {
    /// Re-enters the work path through a delay tier
    Tier {
        queue: &'static str,
        delay_secs: u64,
    },
    /// Ladder exhausted: terminal sink, no further retries
    Exhausted,
}

/// Pure tier decision for a post-increment failure count
pub fn escalate(retry_count: u32, config: &RetryConfig) -> Escalation {
    match retry_count {
        0 | 1 => Escalation::Tier {
            queue: RETRY_TIER_A,
            delay_secs: config.tier_a_delay_secs,
        },
        2 => Escalation::Tier {
            queue: RETRY_TIER_B,
            delay_secs: config.tier_b_delay_secs,
        },
        3 => Escalation::Tier {
            queue: RETRY_TIER_C,
            delay_secs: config.tier_c_delay_secs,
        },
        _ => Escalation::Exhausted,
    }
}

/// Publishes retry envelopes according to the ladder
#[derive(Debug, Clone)]
pub struct RetryEscalator<B: BrokerClient> {
    broker: Arc<B>,
    config: RetryConfig,
}

impl<B: BrokerClient> RetryEscalator<B> {
    pub fn new(broker: Arc<B>, config: RetryConfig) -> Self {
        Self { broker, config }
    }

    /// Publish the failure to its tier (delayed) or to the terminal sink.
    /// The caller owns the local failed-URL set and updates it when the
    /// returned escalation is [`Escalation::Exhausted`].
    pub async fn dispatch(&self, url: &str, retry_count: u32) -> Result<Escalation> {
        let envelope = RetryEnvelope::new(url, retry_count);
        let escalation = escalate(retry_count, &self.config);

        match escalation {
            Escalation::Tier { queue, delay_secs } => {
                warn!(
                    url,
                    retry_count, queue, delay_secs, "scrape failed, scheduling retry"
                );
                self.broker
                    .publish_delayed(queue, &envelope, Duration::from_secs(delay_secs))
                    .await?;
            }
            Escalation::Exhausted => {
                error!(url, retry_count, "retry ladder exhausted, routing to terminal sink");
                self.broker.publish(RETRY_TERMINAL, &envelope).await?;
                info!(url, "URL recorded in terminal sink");
            }
        }

        Ok(escalation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> RetryConfig {
        RetryConfig {
            tier_a_delay_secs: 300,
            tier_b_delay_secs: 600,
            tier_c_delay_secs: 900,
        }
    }

    #[test]
    fn ladder_maps_counts_to_increasing_tiers() {
        assert_eq!(
            escalate(1, &config()),
            Escalation::Tier {
                queue: RETRY_TIER_A,
                delay_secs: 300
            }
        );
        assert_eq!(
            escalate(2, &config()),
            Escalation::Tier {
                queue: RETRY_TIER_B,
                delay_secs: 600
            }
        );
        assert_eq!(
            escalate(3, &config()),
            Escalation::Tier {
                queue: RETRY_TIER_C,
                delay_secs: 900
            }
        );
    }

    #[test]
    fn fourth_failure_and_beyond_are_exhausted() {
        assert_eq!(escalate(4, &config()), Escalation::Exhausted);
        assert_eq!(escalate(17, &config()), Escalation::Exhausted);
    }
}
