//! Movie Record Store
//!
//! One JSON document per canonical title under the store folder, named by
//! [`storage_key`]. Every document carries the canonical title it belongs to
//! so two titles that sanitize to the same key are caught instead of merged.
//!
//! # Concurrency
//! `put` is a read-modify-write. Writers to the same key are serialized by a
//! per-key lock; different keys proceed in parallel. The read-merge-write
//! itself runs on a blocking worker that owns the lock guard, so dropping the
//! calling future cannot leave a half-applied merge. Documents are replaced
//! via temp file + rename, so readers never see a partial write.

use crate::merge::MergeReport;
use crate::normalizer::CanonicalTitle;
use crate::record::MovieRecord;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::debug;

/// Store failure
#[derive(Debug, Error)]
pub enum StoreError {
    /// Persisted document unreadable or malformed; left untouched
    #[error("corrupt record {}: {reason}", path.display())]
    Corrupt { path: PathBuf, reason: String },

    /// Another canonical title already owns this storage key
    #[error("storage key '{key}' belongs to '{stored}', refusing to merge '{title}'")]
    KeyCollision {
        key: String,
        stored: String,
        title: CanonicalTitle,
    },

    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Blocking worker panicked or was aborted
    #[error("store worker failed: {0}")]
    Worker(String),
}

impl StoreError {
    /// Corrupt document or key collision
    pub fn is_corruption(&self) -> bool {
        matches!(self, StoreError::Corrupt { .. } | StoreError::KeyCollision { .. })
    }
}

/// Result of one `put`
#[derive(Debug, Clone, Default)]
pub struct PutOutcome {
    /// No document existed before this put
    pub created: bool,
    pub report: MergeReport,
}

/// On-disk document: the owning title plus the flattened record
#[derive(Debug, Serialize, Deserialize)]
struct StoredDocument {
    title: String,
    #[serde(flatten)]
    record: MovieRecord,
}

/// Sanitized, filesystem-safe identifier for a canonical title
///
/// Punctuation (`! , - & ? / \ ' : . — ·` and every other non-alphanumeric
/// character) is removed, whitespace runs become one `_`, and the result is
/// lowercased. Distinct titles can collide; the store detects that.
pub fn storage_key(title: &CanonicalTitle) -> String {
    title
        .as_str()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_lowercase()
}

/// Keyed persistent store of movie records
pub struct MovieStore {
    dir: PathBuf,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl MovieStore {
    /// Open (creating if needed) a store rooted at `dir`
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|source| StoreError::Io {
            path: dir.clone(),
            source,
        })?;
        debug!(dir = %dir.display(), "Movie store opened");
        Ok(Self {
            dir,
            locks: Mutex::new(HashMap::new()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Document path for a title
    pub fn path_for(&self, title: &CanonicalTitle) -> PathBuf {
        self.dir.join(format!("{}.json", storage_key(title)))
    }

    /// Read a record; empty when the title has never been stored
    pub async fn get(&self, title: &CanonicalTitle) -> Result<MovieRecord, StoreError> {
        let path = self.path_for(title);
        let text = match tokio::fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(MovieRecord::default()),
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        parse_document(&path, &text, title)
    }

    /// Merge `partial` into the stored record and persist it
    ///
    /// # Errors
    /// - [`StoreError::Corrupt`] if the existing document cannot be parsed
    /// - [`StoreError::KeyCollision`] if the key belongs to another title
    ///
    /// In both cases the existing document is left as it was.
    pub async fn put(
        &self,
        title: &CanonicalTitle,
        partial: &MovieRecord,
    ) -> Result<PutOutcome, StoreError> {
        let key = storage_key(title);
        let guard = self.lock_for(&key).await.lock_owned().await;

        let path = self.path_for(title);
        let owned_title = title.clone();
        let partial = partial.clone();
        let outcome = tokio::task::spawn_blocking(move || {
            let _guard = guard;
            merge_and_write(&path, &owned_title, &partial)
        })
        .await
        .map_err(|e| StoreError::Worker(e.to_string()))??;

        if outcome.created {
            debug!(title = %title, key = %key, "Record created");
        }
        for (leaf, previous, value) in outcome.report.updates() {
            debug!(title = %title, leaf, %previous, %value, "Record leaf updated");
        }

        Ok(outcome)
    }

    async fn lock_for(&self, key: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        Arc::clone(locks.entry(key.to_string()).or_default())
    }
}

fn parse_document(path: &Path, text: &str, title: &CanonicalTitle) -> Result<MovieRecord, StoreError> {
    let doc: StoredDocument = serde_json::from_str(text).map_err(|e| StoreError::Corrupt {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    if doc.title != title.as_str() {
        return Err(StoreError::KeyCollision {
            key: storage_key(title),
            stored: doc.title,
            title: title.clone(),
        });
    }
    Ok(doc.record)
}

fn read_existing(path: &Path, title: &CanonicalTitle) -> Result<Option<MovieRecord>, StoreError> {
    match std::fs::read_to_string(path) {
        Ok(text) => parse_document(path, &text, title).map(Some),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(source) => Err(StoreError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Runs with the key lock held
fn merge_and_write(
    path: &Path,
    title: &CanonicalTitle,
    partial: &MovieRecord,
) -> Result<PutOutcome, StoreError> {
    let existing = read_existing(path, title)?;
    let created = existing.is_none();
    let mut record = existing.unwrap_or_default();
    let report = record.merge(partial);

    if created || !report.is_empty() {
        let doc = StoredDocument {
            title: title.to_string(),
            record,
        };
        write_atomic(path, &serde_json::to_vec_pretty(&doc)?)?;
    }

    Ok(PutOutcome { created, report })
}

/// Write to a temp file, then rename over the target
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let temp_path = path.with_extension("json.tmp");
    let io_err = |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };
    std::fs::write(&temp_path, bytes).map_err(io_err)?;
    std::fs::rename(&temp_path, path).map_err(io_err)
}
