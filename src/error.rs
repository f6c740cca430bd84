//! # Pipeline Error Types
//!
//! Structured error handling for the crawl pipeline using thiserror
//! instead of `Box<dyn Error>` patterns. Consumers are the outermost
//! frame of this system, so most failures are handled (logged) where
//! they occur; these types exist for the seams between components and
//! for startup wiring.

use thiserror::Error;

/// Errors produced by pipeline components
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Queue operation failed: {queue}: {operation}: {message}")]
    Queue {
        queue: String,
        operation: String,
        message: String,
    },

    #[error("Message serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Malformed message on queue {queue}: {reason}")]
    MalformedMessage { queue: String, reason: String },

    #[error("Scrape failed for {url}: {message}")]
    Scrape { url: String, message: String },

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl PipelineError {
    /// Build a queue error with operation context
    pub fn queue(
        queue: impl Into<String>,
        operation: impl Into<String>,
        source: impl ToString,
    ) -> Self {
        Self::Queue {
            queue: queue.into(),
            operation: operation.into(),
            message: source.to_string(),
        }
    }

    /// True for failures of the backing infrastructure (Store or Broker)
    /// as opposed to failures of the unit of work itself
    pub fn is_infrastructure(&self) -> bool {
        matches!(self, Self::Database(_) | Self::Queue { .. })
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
