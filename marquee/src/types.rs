//! Source adapter seam
//!
//! An adapter knows one movie-list provider: how to fetch it and how to pull
//! raw fields out of it. The reconciliation engine only sees the
//! [`RawEntry`] stream it produces.

use futures::stream::BoxStream;
use thiserror::Error;

/// One list entry as a source presented it
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawEntry {
    pub source_id: String,
    pub raw_title: String,
    pub raw_year: Option<String>,
    pub raw_rank: Option<u32>,
    pub raw_score: Option<f64>,
    pub raw_review_count: Option<u64>,
    pub raw_gross: Option<f64>,
}

impl RawEntry {
    pub fn new(source_id: impl Into<String>, raw_title: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            raw_title: raw_title.into(),
            ..Self::default()
        }
    }

    pub fn with_year(mut self, year: impl Into<String>) -> Self {
        self.raw_year = Some(year.into());
        self
    }

    pub fn with_rank(mut self, rank: u32) -> Self {
        self.raw_rank = Some(rank);
        self
    }
}

/// Adapter-side failure
#[derive(Debug, Error)]
pub enum AdapterError {
    /// Network/transport failure; ends the source
    #[error("fetch failed: {0}")]
    Fetch(String),

    /// Expected structure absent in the fetched payload
    #[error("parse failed: {0}")]
    Parse(String),
}

impl AdapterError {
    /// Whether the stream can continue past this error
    ///
    /// Parse errors describe one entry; fetch errors end the source.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, AdapterError::Parse(_))
    }
}

impl From<reqwest::Error> for AdapterError {
    fn from(e: reqwest::Error) -> Self {
        AdapterError::Fetch(e.to_string())
    }
}

impl From<std::io::Error> for AdapterError {
    fn from(e: std::io::Error) -> Self {
        AdapterError::Fetch(e.to_string())
    }
}

/// Lazy, finite, non-replayable entry sequence
pub type EntryStream<'a> = BoxStream<'a, Result<RawEntry, AdapterError>>;

/// One movie-list provider
///
/// Each call to [`produce`](SourceAdapter::produce) performs fresh I/O;
/// entries must come out in the order the source presents them.
pub trait SourceAdapter: Send + Sync {
    /// Stable identifier used in records and list file names
    fn source_id(&self) -> &str;

    fn produce(&self) -> EntryStream<'_>;
}
