//! Aggregator
//!
//! Counts, for one run, how many source-list inclusions each canonical title
//! has and turns the tally into a deterministic ranking.
//!
//! Every `ingest` call counts, including repeats of the same title within one
//! source's list: upstream duplication passes through unchanged.

use crate::normalizer::CanonicalTitle;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

/// One row of the final ranking
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedTitle {
    pub title: CanonicalTitle,
    pub count: u64,
    /// Sources that listed the title, sorted
    pub sources: Vec<String>,
}

#[derive(Debug, Default)]
struct Tally {
    count: u64,
    sources: BTreeSet<String>,
}

/// Per-run prevalence counter
#[derive(Debug, Default)]
pub struct Aggregator {
    tallies: HashMap<CanonicalTitle, Tally>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one inclusion of `title` in `source_id`'s list
    pub fn ingest(&mut self, source_id: &str, title: &CanonicalTitle) {
        let tally = self.tallies.entry(title.clone()).or_default();
        tally.count += 1;
        if !tally.sources.contains(source_id) {
            tally.sources.insert(source_id.to_string());
        }
    }

    /// Ingest a whole source list in order
    pub fn ingest_list<'a>(
        &mut self,
        source_id: &str,
        titles: impl IntoIterator<Item = &'a CanonicalTitle>,
    ) {
        for title in titles {
            self.ingest(source_id, title);
        }
    }

    /// Current count for a title (0 if never seen)
    pub fn count(&self, title: &CanonicalTitle) -> u64 {
        self.tallies.get(title).map_or(0, |t| t.count)
    }

    /// Number of distinct titles seen
    pub fn len(&self) -> usize {
        self.tallies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tallies.is_empty()
    }

    /// Ranking by count descending, ties by canonical title ascending
    pub fn finalize(&self) -> Vec<RankedTitle> {
        let mut ranking: Vec<RankedTitle> = self
            .tallies
            .iter()
            .map(|(title, tally)| RankedTitle {
                title: title.clone(),
                count: tally.count,
                sources: tally.sources.iter().cloned().collect(),
            })
            .collect();

        ranking.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.title.cmp(&b.title)));
        ranking
    }
}
