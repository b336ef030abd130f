//! Local list file adapter

use super::listing::parse_document;
use crate::types::{AdapterError, EntryStream, SourceAdapter};
use futures::StreamExt;
use std::path::PathBuf;
use tracing::debug;

/// Reads a list file in the plain-text list format on every `produce`
pub struct TextFileAdapter {
    source_id: String,
    path: PathBuf,
}

impl TextFileAdapter {
    pub fn new(source_id: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            source_id: source_id.into(),
            path: path.into(),
        }
    }
}

impl SourceAdapter for TextFileAdapter {
    fn source_id(&self) -> &str {
        &self.source_id
    }

    fn produce(&self) -> EntryStream<'_> {
        async_stream::stream! {
            let text = match tokio::fs::read_to_string(&self.path).await {
                Ok(text) => text,
                Err(e) => {
                    yield Err(AdapterError::Fetch(format!("{}: {}", self.path.display(), e)));
                    return;
                }
            };
            debug!(source = %self.source_id, path = %self.path.display(), bytes = text.len(), "List file read");

            for entry in parse_document(&self.source_id, &text) {
                yield entry;
            }
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_reads_entries_in_order() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("afi.txt");
        std::fs::write(&path, "1. CITIZEN KANE (1941)\n2. CASABLANCA (1942)\n").unwrap();
        let adapter = TextFileAdapter::new("afi", &path);

        let entries: Vec<_> = adapter.produce().collect().await;

        assert_eq!(entries.len(), 2);
        let first = entries[0].as_ref().unwrap();
        assert_eq!(first.source_id, "afi");
        assert_eq!(first.raw_title, "CITIZEN KANE (1941)");
        assert_eq!(entries[1].as_ref().unwrap().raw_rank, Some(2));
    }

    #[tokio::test]
    async fn test_missing_file_is_fetch_error() {
        let dir = TempDir::new().unwrap();
        let adapter = TextFileAdapter::new("afi", dir.path().join("missing.txt"));

        let entries: Vec<_> = adapter.produce().collect().await;

        assert_eq!(entries.len(), 1);
        assert!(matches!(entries[0], Err(AdapterError::Fetch(_))));
    }
}
