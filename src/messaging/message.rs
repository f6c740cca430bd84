//! # Wire Messages
//!
//! JSON message schemas carried on the pipeline queues. These are the
//! field-level contracts between horizontally scaled consumer instances,
//! so unknown fields are tolerated and optional fields have serde
//! defaults rather than hard deserialization failures.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// A discovered URL on its way to the Frontier Aggregator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrontierMessage {
    pub url: String,
}

impl FrontierMessage {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

/// A URL dispatched for scraping
///
/// `retry_count` is absent on first dispatch and carried forward by the
/// retry ladder afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkMessage {
    pub url: String,
    #[serde(default)]
    pub retry_count: u32,
}

impl WorkMessage {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            retry_count: 0,
        }
    }
}

/// A failed URL riding a delay tier back toward the work queue
///
/// Lives only on the broker; `timestamp` is Unix seconds at enqueue time,
/// kept as a float for wire compatibility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryEnvelope {
    pub url: String,
    pub retry_count: u32,
    pub timestamp: f64,
}

impl RetryEnvelope {
    pub fn new(url: impl Into<String>, retry_count: u32) -> Self {
        Self {
            url: url.into(),
            retry_count,
            timestamp: Utc::now().timestamp_millis() as f64 / 1000.0,
        }
    }
}
