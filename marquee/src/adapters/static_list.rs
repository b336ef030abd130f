//! In-memory adapter for fixed entry lists

use crate::types::{EntryStream, RawEntry, SourceAdapter};
use futures::StreamExt;

/// Replays a fixed list; entries are re-stamped with this adapter's id
pub struct StaticAdapter {
    source_id: String,
    entries: Vec<RawEntry>,
}

impl StaticAdapter {
    pub fn new(source_id: impl Into<String>, entries: Vec<RawEntry>) -> Self {
        Self {
            source_id: source_id.into(),
            entries,
        }
    }

    /// Adapter over bare display titles, e.g. `"The Godfather (1972)"`
    pub fn from_titles<'a>(source_id: &str, titles: impl IntoIterator<Item = &'a str>) -> Self {
        let entries = titles
            .into_iter()
            .map(|t| RawEntry::new(source_id, t))
            .collect();
        Self::new(source_id, entries)
    }
}

impl SourceAdapter for StaticAdapter {
    fn source_id(&self) -> &str {
        &self.source_id
    }

    fn produce(&self) -> EntryStream<'_> {
        futures::stream::iter(self.entries.iter().map(move |e| {
            Ok(RawEntry {
                source_id: self.source_id.clone(),
                ..e.clone()
            })
        }))
        .boxed()
    }
}
