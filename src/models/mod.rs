//! # Data Models
//!
//! Persisted entities of the crawl pipeline and their database
//! operations: discovered URLs (`urls`) and extracted structured records
//! (`video_records`).

pub mod url_record;
pub mod video_record;

pub use url_record::UrlRecord;
pub use video_record::VideoRecord;
