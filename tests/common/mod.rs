//! Shared in-memory test doubles for the pipeline seams: store, broker,
//! and scraper. Each mock tracks calls behind `Arc<Mutex<_>>` state so
//! tests can assert on side effects, and exposes failure knobs for the
//! infrastructure-failure paths.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crawlq::error::{PipelineError, Result};
use crawlq::messaging::{BrokerClient, Delivery};
use crawlq::models::VideoRecord;
use crawlq::scrape::{ScrapeOutcome, Scraper};
use crawlq::store::CrawlStore;

// ---------------------------------------------------------------------------
// MockStore
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct MockStoreState {
    /// url -> is_processed
    pub urls: HashMap<String, bool>,
    /// natural key -> latest upserted record
    pub records: HashMap<String, VideoRecord>,
    /// every batch handed to batch_insert_urls
    pub insert_batches: Vec<Vec<String>>,
    /// sizes of batches handed to batch_upsert_records
    pub upsert_batches: Vec<usize>,
    pub fail_inserts: bool,
    pub fail_upserts: bool,
}

#[derive(Debug, Clone, Default)]
pub struct MockStore {
    state: Arc<Mutex<MockStoreState>>,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_failing_inserts(self) -> Self {
        self.state.lock().unwrap().fail_inserts = true;
        self
    }

    pub fn with_failing_upserts(self) -> Self {
        self.state.lock().unwrap().fail_upserts = true;
        self
    }

    /// Pre-seed a URL row
    pub fn seed_url(&self, url: &str, processed: bool) {
        self.state
            .lock()
            .unwrap()
            .urls
            .insert(url.to_string(), processed);
    }

    pub fn is_processed(&self, url: &str) -> bool {
        self.state
            .lock()
            .unwrap()
            .urls
            .get(url)
            .copied()
            .unwrap_or(false)
    }

    pub fn insert_batches(&self) -> Vec<Vec<String>> {
        self.state.lock().unwrap().insert_batches.clone()
    }

    pub fn upsert_batches(&self) -> Vec<usize> {
        self.state.lock().unwrap().upsert_batches.clone()
    }

    pub fn record_for(&self, key: &str) -> Option<VideoRecord> {
        self.state.lock().unwrap().records.get(key).cloned()
    }

    pub fn record_count(&self) -> usize {
        self.state.lock().unwrap().records.len()
    }
}

#[async_trait]
impl CrawlStore for MockStore {
    async fn exists_and_processed(&self, url: &str) -> Result<bool> {
        Ok(self.is_processed(url))
    }

    async fn filter_existing(&self, urls: &[String]) -> Result<HashSet<String>> {
        let state = self.state.lock().unwrap();
        Ok(urls
            .iter()
            .filter(|u| state.urls.contains_key(*u))
            .cloned()
            .collect())
    }

    async fn batch_insert_urls(&self, urls: &[String]) -> Result<u64> {
        let mut state = self.state.lock().unwrap();
        if state.fail_inserts {
            return Err(PipelineError::queue("mock-store", "insert", "injected failure"));
        }
        state.insert_batches.push(urls.to_vec());
        let mut inserted = 0;
        for url in urls {
            if !state.urls.contains_key(url) {
                state.urls.insert(url.clone(), false);
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    async fn mark_processed(&self, url: &str) -> Result<bool> {
        let mut state = self.state.lock().unwrap();
        let known = state.urls.contains_key(url);
        state.urls.insert(url.to_string(), true);
        Ok(known)
    }

    async fn batch_upsert_records(&self, records: &[VideoRecord]) -> Result<u64> {
        let mut state = self.state.lock().unwrap();
        if state.fail_upserts {
            return Err(PipelineError::queue("mock-store", "upsert", "injected failure"));
        }
        state.upsert_batches.push(records.len());
        for record in records {
            state.records.insert(record.video_url.clone(), record.clone());
        }
        Ok(records.len() as u64)
    }
}

// ---------------------------------------------------------------------------
// MockBroker
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct MockBrokerState {
    pub queues: HashMap<String, VecDeque<(i64, serde_json::Value)>>,
    /// (queue, payload, delay) of every delayed publish, in order
    pub delayed_log: Vec<(String, serde_json::Value, Duration)>,
    pub acked: Vec<(String, i64)>,
    next_id: i64,
}

#[derive(Debug, Clone, Default)]
pub struct MockBroker {
    state: Arc<Mutex<MockBrokerState>>,
}

impl MockBroker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_len(&self, queue: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .queues
            .get(queue)
            .map(VecDeque::len)
            .unwrap_or(0)
    }

    /// Pop the oldest message off a queue, decoded
    pub fn pop<T: DeserializeOwned>(&self, queue: &str) -> Option<T> {
        let mut state = self.state.lock().unwrap();
        let (_, payload) = state.queues.get_mut(queue)?.pop_front()?;
        Some(serde_json::from_value(payload).expect("mock payload should decode"))
    }

    /// Fetch without decoding, as a consumer loop would
    pub fn pop_delivery(&self, queue: &str) -> Option<Delivery> {
        let mut state = self.state.lock().unwrap();
        let (msg_id, payload) = state.queues.get_mut(queue)?.pop_front()?;
        Some(Delivery { msg_id, payload })
    }

    /// Every delayed publish that targeted `queue`, in order
    pub fn delayed_for(&self, queue: &str) -> Vec<(serde_json::Value, Duration)> {
        self.state
            .lock()
            .unwrap()
            .delayed_log
            .iter()
            .filter(|(q, _, _)| q == queue)
            .map(|(_, p, d)| (p.clone(), *d))
            .collect()
    }

    pub fn delayed_count(&self) -> usize {
        self.state.lock().unwrap().delayed_log.len()
    }

    fn enqueue(&self, queue: &str, payload: serde_json::Value) -> i64 {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = state.next_id;
        state
            .queues
            .entry(queue.to_string())
            .or_default()
            .push_back((id, payload));
        id
    }
}

#[async_trait]
impl BrokerClient for MockBroker {
    async fn ensure_topology(&self) -> Result<()> {
        Ok(())
    }

    async fn publish<T: Serialize + Send + Sync>(&self, queue: &str, message: &T) -> Result<i64> {
        Ok(self.enqueue(queue, serde_json::to_value(message)?))
    }

    async fn publish_delayed<T: Serialize + Send + Sync>(
        &self,
        queue: &str,
        message: &T,
        delay: Duration,
    ) -> Result<i64> {
        let payload = serde_json::to_value(message)?;
        self.state
            .lock()
            .unwrap()
            .delayed_log
            .push((queue.to_string(), payload.clone(), delay));
        // delayed messages become visible immediately in tests
        Ok(self.enqueue(queue, payload))
    }

    async fn fetch_one(&self, queue: &str, _visibility_timeout_secs: i32) -> Result<Option<Delivery>> {
        Ok(self.pop_delivery(queue))
    }

    async fn ack(&self, queue: &str, msg_id: i64) -> Result<()> {
        self.state
            .lock()
            .unwrap()
            .acked
            .push((queue.to_string(), msg_id));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MockScraper
// ---------------------------------------------------------------------------

enum ScriptedOutcome {
    Outcome(ScrapeOutcome),
    Error,
}

#[derive(Default)]
struct MockScraperState {
    scripts: HashMap<String, VecDeque<ScriptedOutcome>>,
    calls: Vec<String>,
}

/// Scraper returning scripted outcomes per URL; unscripted URLs scrape
/// empty (a failure from the dispatcher's point of view)
#[derive(Clone, Default)]
pub struct MockScraper {
    state: Arc<Mutex<MockScraperState>>,
}

impl MockScraper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next scrape of `url` yields these links
    pub fn script_links(&self, url: &str, links: &[&str]) {
        self.push(
            url,
            ScriptedOutcome::Outcome(ScrapeOutcome {
                internal_links: links.iter().map(|s| s.to_string()).collect(),
                record: None,
            }),
        );
    }

    /// Next scrape of `url` yields this record and no links
    pub fn script_record(&self, url: &str, record: VideoRecord) {
        self.push(
            url,
            ScriptedOutcome::Outcome(ScrapeOutcome {
                internal_links: Vec::new(),
                record: Some(record),
            }),
        );
    }

    /// Next scrape of `url` raises a network-style error
    pub fn script_error(&self, url: &str) {
        self.push(url, ScriptedOutcome::Error);
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    fn push(&self, url: &str, outcome: ScriptedOutcome) {
        self.state
            .lock()
            .unwrap()
            .scripts
            .entry(url.to_string())
            .or_default()
            .push_back(outcome);
    }
}

#[async_trait]
impl Scraper for MockScraper {
    async fn scrape(&self, url: &str) -> Result<ScrapeOutcome> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(url.to_string());
        match state.scripts.get_mut(url).and_then(VecDeque::pop_front) {
            Some(ScriptedOutcome::Outcome(outcome)) => Ok(outcome),
            Some(ScriptedOutcome::Error) => Err(PipelineError::Scrape {
                url: url.to_string(),
                message: "injected network error".to_string(),
            }),
            None => Ok(ScrapeOutcome::default()),
        }
    }
}

/// A minimal record for upsert scenarios
pub fn record(key: &str, views: &str) -> VideoRecord {
    VideoRecord {
        video_url: key.to_string(),
        view_count: views.to_string(),
        like_count: "97%".to_string(),
        mp4_links: vec![format!("{key}/clip.mp4")],
        jpg_links: vec![format!("{key}/thumb.jpg")],
    }
}

/// Wrap a typed message as a broker delivery
pub fn delivery<T: Serialize>(msg_id: i64, message: &T) -> Delivery {
    Delivery {
        msg_id,
        payload: serde_json::to_value(message).expect("message should serialize"),
    }
}
