//! Persistent per-movie record
//!
//! Known fields are typed; anything else a source contributes lands in
//! `extra`, which is flattened into the stored document so new fields need no
//! migration.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Merged metadata for one canonical title
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MovieRecord {
    /// Position in each source's list, keyed by source id
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub ranks: BTreeMap<String, u32>,

    /// Score/review metadata, keyed by source id
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub ratings: BTreeMap<String, Rating>,

    /// Worldwide box-office gross
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gross: Option<f64>,

    /// Source-specific fields without a typed home
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// One source's rating of a movie
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviews: Option<u64>,

    /// Further per-source rating fields (audience score, critic count, ...)
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl MovieRecord {
    pub fn is_empty(&self) -> bool {
        self.ranks.is_empty() && self.ratings.is_empty() && self.gross.is_none() && self.extra.is_empty()
    }

    /// Partial record describing what one source said about a movie
    pub fn observation(
        source_id: &str,
        rank: Option<u32>,
        score: Option<f64>,
        reviews: Option<u64>,
        gross: Option<f64>,
    ) -> Self {
        let mut record = MovieRecord::default();
        if let Some(rank) = rank {
            record.ranks.insert(source_id.to_string(), rank);
        }
        if score.is_some() || reviews.is_some() {
            record.ratings.insert(
                source_id.to_string(),
                Rating {
                    score,
                    reviews,
                    ..Rating::default()
                },
            );
        }
        record.gross = gross;
        record
    }
}
