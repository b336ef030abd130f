//! Merge Engine
//!
//! Recursive deep merge: nested mappings recurse, everything else is a leaf
//! and the source leaf overwrites the destination leaf. Keys only present in
//! the destination are never touched.
//!
//! The same rule is implemented twice: [`merge_value`] for untyped JSON and
//! [`MovieRecord::merge`] for the typed record (whose `extra` map falls back
//! to [`merge_value`]). Both return a [`MergeReport`] so callers can tell a
//! first write from an update.

use crate::record::MovieRecord;
use serde_json::Value;

/// What happened to one leaf
#[derive(Debug, Clone, PartialEq)]
pub enum LeafChange {
    /// Leaf did not exist before
    Inserted { value: Value },
    /// Leaf existed with a different value
    Updated { previous: Value, value: Value },
}

/// Leaves written by one merge, in visit order
///
/// Rewrites with an identical value are not recorded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeReport {
    pub changes: Vec<(String, LeafChange)>,
}

impl MergeReport {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn inserted(&self) -> usize {
        self.changes
            .iter()
            .filter(|(_, c)| matches!(c, LeafChange::Inserted { .. }))
            .count()
    }

    pub fn updated(&self) -> usize {
        self.changes.len() - self.inserted()
    }

    /// Leaves whose previous value was overwritten
    pub fn updates(&self) -> impl Iterator<Item = (&str, &Value, &Value)> {
        self.changes.iter().filter_map(|(path, change)| match change {
            LeafChange::Updated { previous, value } => Some((path.as_str(), previous, value)),
            LeafChange::Inserted { .. } => None,
        })
    }

    fn note(&mut self, path: String, previous: Option<Value>, value: Value) {
        match previous {
            None => self.changes.push((path, LeafChange::Inserted { value })),
            Some(previous) if previous != value => {
                self.changes.push((path, LeafChange::Updated { previous, value }))
            }
            Some(_) => {}
        }
    }
}

fn join_path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", parent, key)
    }
}

/// Deep-merge `source` into `destination`
///
/// `source` is only read; every value written into `destination` is a clone.
pub fn merge_value(destination: &mut Value, source: &Value, path: &str, report: &mut MergeReport) {
    match (destination, source) {
        (Value::Object(dest), Value::Object(src)) => {
            for (key, src_value) in src {
                let child_path = join_path(path, key);
                match dest.get_mut(key) {
                    Some(dest_value) if dest_value.is_object() && src_value.is_object() => {
                        merge_value(dest_value, src_value, &child_path, report);
                    }
                    Some(dest_value) => {
                        let previous = std::mem::replace(dest_value, src_value.clone());
                        report.note(child_path, Some(previous), src_value.clone());
                    }
                    None => {
                        dest.insert(key.clone(), src_value.clone());
                        report.note(child_path, None, src_value.clone());
                    }
                }
            }
        }
        (dest, src) => {
            let previous = std::mem::replace(dest, src.clone());
            report.note(path.to_string(), Some(previous), src.clone());
        }
    }
}

impl MovieRecord {
    /// Deep-merge `source` into this record
    pub fn merge(&mut self, source: &MovieRecord) -> MergeReport {
        let mut report = MergeReport::default();

        for (source_id, rank) in &source.ranks {
            let previous = self.ranks.insert(source_id.clone(), *rank);
            report.note(
                format!("ranks.{}", source_id),
                previous.map(Value::from),
                Value::from(*rank),
            );
        }

        for (source_id, rating) in &source.ratings {
            let target = self.ratings.entry(source_id.clone()).or_default();
            if let Some(score) = rating.score {
                let previous = target.score.replace(score);
                report.note(
                    format!("ratings.{}.score", source_id),
                    previous.map(Value::from),
                    Value::from(score),
                );
            }
            if let Some(reviews) = rating.reviews {
                let previous = target.reviews.replace(reviews);
                report.note(
                    format!("ratings.{}.reviews", source_id),
                    previous.map(Value::from),
                    Value::from(reviews),
                );
            }
            for (key, value) in &rating.extra {
                let path = format!("ratings.{}.{}", source_id, key);
                match target.extra.get_mut(key) {
                    Some(existing) => merge_value(existing, value, &path, &mut report),
                    None => {
                        target.extra.insert(key.clone(), value.clone());
                        report.note(path, None, value.clone());
                    }
                }
            }
        }

        if let Some(gross) = source.gross {
            let previous = self.gross.replace(gross);
            report.note("gross".to_string(), previous.map(Value::from), Value::from(gross));
        }

        for (key, value) in &source.extra {
            match self.extra.get_mut(key) {
                Some(existing) => merge_value(existing, value, key, &mut report),
                None => {
                    self.extra.insert(key.clone(), value.clone());
                    report.note(key.clone(), None, value.clone());
                }
            }
        }

        report
    }
}

/// Pure form of [`MovieRecord::merge`]
pub fn merge(mut destination: MovieRecord, source: &MovieRecord) -> MovieRecord {
    destination.merge(source);
    destination
}
