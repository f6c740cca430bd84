//! # Scraper Boundary
//!
//! The external collaborator that turns a URL into discovered links and
//! an optional structured record. The pipeline only depends on the
//! [`Scraper`] trait; [`html::HtmlScraper`] is the reference HTTP
//! implementation.
//!
//! A scrape error and an empty outcome are equivalent from the
//! dispatcher's point of view: both escalate the retry ladder.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::VideoRecord;

pub mod html;

pub use html::HtmlScraper;

/// What one scrape of a URL produced
#[derive(Debug, Clone, Default)]
pub struct ScrapeOutcome {
    /// Same-site links discovered on the page
    pub internal_links: Vec<String>,
    /// Structured record, present only for record-bearing pages
    pub record: Option<VideoRecord>,
}

impl ScrapeOutcome {
    /// A scrape counts as successful when it produced anything at all
    pub fn is_success(&self) -> bool {
        !self.internal_links.is_empty() || self.record.is_some()
    }
}

/// Synchronous (one in flight) URL scraping
#[async_trait]
pub trait Scraper: Send + Sync {
    /// Fetch and parse one URL; may fail on network errors
    async fn scrape(&self, url: &str) -> Result<ScrapeOutcome>;
}
