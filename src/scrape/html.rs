//! HTTP reference implementation of the [`Scraper`] trait.
//!
//! Fetches a page, collects same-site links from `<a href>` tags, and for
//! video pages (URL path containing `/video`) extracts the structured
//! record: view/like counts plus mp4 and jpg resource links. The selector
//! set is deliberately minimal; richer extraction belongs to a dedicated
//! scraper, not the pipeline.

use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use std::time::Duration;
use url::Url;

use crate::error::{PipelineError, Result};
use crate::models::VideoRecord;
use crate::scrape::{ScrapeOutcome, Scraper};

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Reference HTTP scraper
#[derive(Debug, Clone)]
pub struct HtmlScraper {
    client: Client,
}

impl HtmlScraper {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(20))
            .connect_timeout(Duration::from_secs(10))
            .gzip(true)
            .build()
            .map_err(|e| PipelineError::Configuration(format!("http client: {e}")))?;
        Ok(Self { client })
    }

    async fn fetch(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .header("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8")
            .header("Accept-Language", "en-US,en;q=0.9")
            .send()
            .await
            .map_err(|e| PipelineError::Scrape {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        let response = response.error_for_status().map_err(|e| PipelineError::Scrape {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        response.text().await.map_err(|e| PipelineError::Scrape {
            url: url.to_string(),
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl Scraper for HtmlScraper {
    async fn scrape(&self, url: &str) -> Result<ScrapeOutcome> {
        let base = Url::parse(url).map_err(|e| PipelineError::Scrape {
            url: url.to_string(),
            message: format!("invalid url: {e}"),
        })?;

        let body = self.fetch(url).await?;
        let document = Html::parse_document(&body);

        let internal_links = extract_internal_links(&document, &base);

        // Record extraction is gated on the URL shape, not page content
        let record = if url.to_lowercase().contains("/video") {
            Some(extract_record(url, &document, &base))
        } else {
            None
        };

        Ok(ScrapeOutcome {
            internal_links,
            record,
        })
    }
}

fn extract_internal_links(document: &Html, base: &Url) -> Vec<String> {
    let mut links = Vec::new();

    if let Ok(selector) = Selector::parse("a[href]") {
        for element in document.select(&selector) {
            let Some(href) = element.value().attr("href") else {
                continue;
            };
            if let Some(resolved) = resolve_same_site(href, base) {
                if !links.contains(&resolved) {
                    links.push(resolved);
                }
            }
        }
    }

    links
}

/// Resolve an href against the page URL, keeping only http(s) links on
/// the same host
fn resolve_same_site(href: &str, base: &Url) -> Option<String> {
    let href = href.trim();
    if href.is_empty()
        || href.starts_with('#')
        || href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    let resolved = base.join(href).ok()?;
    if !matches!(resolved.scheme(), "http" | "https") {
        return None;
    }
    if resolved.host_str() != base.host_str() {
        return None;
    }

    let mut resolved = resolved;
    resolved.set_fragment(None);
    Some(resolved.to_string())
}

fn extract_record(url: &str, document: &Html, base: &Url) -> VideoRecord {
    VideoRecord {
        video_url: url.to_string(),
        view_count: extract_metric(document, &["[id*='views']", "[class*='view-count']", "[class*='views']"]),
        like_count: extract_metric(document, &["[id*='likes']", "[class*='like-count']", "[class*='likes']"]),
        mp4_links: extract_resource_links(document, base, &["video[src]", "source[src]"], "src", ".mp4"),
        jpg_links: extract_resource_links(document, base, &["img[src]"], "src", ".jpg"),
    }
}

/// First non-empty text content behind any of the selectors, or "N/A"
fn extract_metric(document: &Html, selectors: &[&str]) -> String {
    for raw in selectors {
        let Ok(selector) = Selector::parse(raw) else {
            continue;
        };
        if let Some(element) = document.select(&selector).next() {
            let text = element.text().collect::<String>().trim().to_string();
            if !text.is_empty() {
                return text;
            }
        }
    }
    "N/A".to_string()
}

fn extract_resource_links(
    document: &Html,
    base: &Url,
    selectors: &[&str],
    attr: &str,
    extension: &str,
) -> Vec<String> {
    let mut links = Vec::new();

    for raw in selectors {
        let Ok(selector) = Selector::parse(raw) else {
            continue;
        };
        for element in document.select(&selector) {
            let Some(value) = element.value().attr(attr) else {
                continue;
            };
            let Ok(resolved) = base.join(value.trim()) else {
                continue;
            };
            let resolved = resolved.to_string();
            if resolved.to_lowercase().contains(extension) && !links.contains(&resolved) {
                links.push(resolved);
            }
        }
    }

    links
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://example.com/video/42/test").unwrap()
    }

    #[test]
    fn same_site_links_are_resolved_and_offsite_dropped() {
        let html = Html::parse_document(
            r##"<html><body>
                <a href="/watch/1">one</a>
                <a href="https://example.com/watch/2#frag">two</a>
                <a href="https://other.example.net/watch/3">offsite</a>
                <a href="mailto:someone@example.com">mail</a>
                <a href="javascript:void(0)">js</a>
            </body></html>"##,
        );

        let links = extract_internal_links(&html, &base());
        assert_eq!(
            links,
            vec![
                "https://example.com/watch/1".to_string(),
                "https://example.com/watch/2".to_string(),
            ]
        );
    }

    #[test]
    fn record_extraction_collects_metrics_and_media() {
        let html = Html::parse_document(
            r#"<html><body>
                <span id="video-views">12,345</span>
                <span class="like-count">98%</span>
                <video src="/media/clip.mp4"></video>
                <img src="/thumbs/clip.jpg">
                <img src="/logo.png">
            </body></html>"#,
        );

        let record = extract_record("https://example.com/video/42/test", &html, &base());
        assert_eq!(record.view_count, "12,345");
        assert_eq!(record.like_count, "98%");
        assert_eq!(record.mp4_links, vec!["https://example.com/media/clip.mp4"]);
        assert_eq!(record.jpg_links, vec!["https://example.com/thumbs/clip.jpg"]);
    }

    #[test]
    fn missing_metrics_fall_back_to_na() {
        let html = Html::parse_document("<html><body><p>nothing here</p></body></html>");
        let record = extract_record("https://example.com/video/9", &html, &base());
        assert_eq!(record.view_count, "N/A");
        assert_eq!(record.like_count, "N/A");
        assert!(record.mp4_links.is_empty());
    }
}
