//! Run Orchestrator
//!
//! Drives one reconciliation run: every adapter's entries are normalized and
//! merged into the store, each completed source list is fed to the
//! aggregator, and the result is a [`RunReport`].
//!
//! # Concurrency
//! - Adapters run as a `buffer_unordered(concurrency)` stream
//! - Entries within one source are processed in source order
//! - Each adapter races the run's [`CancellationToken`] (cancelled by the run
//!   deadline or by the caller) and an optional per-source timeout
//! - An interrupted source keeps the records it already merged; its partial
//!   list is reported as a failure and not aggregated
//!
//! # Error isolation
//! Nothing an adapter, the normalizer or the store does fails the run. Bad
//! entries are skipped and recorded, failed sources are recorded, and every
//! other source carries on.

use crate::aggregator::{Aggregator, RankedTitle};
use crate::normalizer::{normalize, CanonicalTitle};
use crate::record::MovieRecord;
use crate::store::MovieStore;
use crate::types::{AdapterError, SourceAdapter};
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use marquee_common::config::DEFAULT_CONCURRENCY;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Failure reason for sources stopped by the run's cancellation token
pub const CANCELLED: &str = "cancelled before completion";

/// Run limits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// Adapters running at once (at least 1)
    pub concurrency: usize,
    /// Whole-run deadline
    pub timeout: Option<Duration>,
    /// Limit for any single source
    pub source_timeout: Option<Duration>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            timeout: None,
            source_timeout: None,
        }
    }
}

/// State owned by one run
///
/// Each run gets a fresh context; nothing is shared between runs except the
/// store on disk.
pub struct RunContext {
    pub run_id: Uuid,
    pub store: Arc<MovieStore>,
    pub config: RunConfig,
    cancel: CancellationToken,
}

impl RunContext {
    pub fn new(store: Arc<MovieStore>, config: RunConfig) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            store,
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Token that stops the run when cancelled (e.g. on Ctrl-C)
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

/// Entry dropped from a source's list
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedEntry {
    pub source_id: String,
    /// `None` when the line could not be parsed into an entry at all
    pub raw_title: Option<String>,
    pub reason: String,
}

/// Source that did not complete
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceFailure {
    pub source_id: String,
    pub reason: String,
}

/// Entry whose record could not be merged; the title is still counted
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordFailure {
    pub source_id: String,
    pub title: CanonicalTitle,
    pub reason: String,
}

/// Per-source statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SourceSummary {
    pub source_id: String,
    /// Titles in the source's canonical list
    pub listed: usize,
    /// Records created by this source
    pub created: usize,
    /// Existing records this source changed
    pub updated: usize,
    pub completed: bool,
}

/// Outcome of one run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Prevalence ranking over completed sources
    pub ranking: Vec<RankedTitle>,
    /// Canonical list of every completed source, in source order
    pub lists: BTreeMap<String, Vec<CanonicalTitle>>,
    pub sources: Vec<SourceSummary>,
    pub skipped: Vec<SkippedEntry>,
    pub record_failures: Vec<RecordFailure>,
    pub failures: Vec<SourceFailure>,
}

impl RunReport {
    /// All sources completed and every entry made it into the store
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty() && self.record_failures.is_empty() && self.failures.is_empty()
    }
}

/// What one adapter produced before it finished or was interrupted
#[derive(Debug, Default)]
struct SourceOutcome {
    summary: SourceSummary,
    titles: Vec<CanonicalTitle>,
    skipped: Vec<SkippedEntry>,
    record_failures: Vec<RecordFailure>,
    failure: Option<String>,
}

/// Run every adapter once and aggregate the completed lists
pub async fn run(ctx: &RunContext, adapters: Vec<Arc<dyn SourceAdapter>>) -> RunReport {
    let started_at = Utc::now();
    let run_id = ctx.run_id;
    let concurrency = ctx.config.concurrency.max(1);

    info!(
        run_id = %run_id,
        sources = adapters.len(),
        concurrency,
        timeout = ?ctx.config.timeout,
        "Run starting"
    );

    let deadline = ctx.config.timeout.map(|limit| {
        let token = ctx.cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(limit).await;
            warn!(run_id = %run_id, ?limit, "Run deadline reached, cancelling remaining sources");
            token.cancel();
        })
    });

    let mut outcomes = stream::iter(adapters)
        .map(|adapter| {
            let store = Arc::clone(&ctx.store);
            let cancel = ctx.cancel.clone();
            let source_timeout = ctx.config.source_timeout;
            async move { run_source(adapter, store, cancel, source_timeout).await }
        })
        .buffer_unordered(concurrency);

    let mut aggregator = Aggregator::new();
    let mut lists = BTreeMap::new();
    let mut sources = Vec::new();
    let mut skipped = Vec::new();
    let mut record_failures = Vec::new();
    let mut failures = Vec::new();

    while let Some(outcome) = outcomes.next().await {
        let source_id = outcome.summary.source_id.clone();
        skipped.extend(outcome.skipped);
        record_failures.extend(outcome.record_failures);

        match outcome.failure {
            Some(reason) => {
                warn!(run_id = %run_id, source = %source_id, %reason, "Source failed");
                failures.push(SourceFailure { source_id, reason });
            }
            None => {
                aggregator.ingest_list(&source_id, &outcome.titles);
                info!(
                    run_id = %run_id,
                    source = %source_id,
                    listed = outcome.titles.len(),
                    "Source aggregated"
                );
                lists.insert(source_id, outcome.titles);
            }
        }
        sources.push(outcome.summary);
    }

    if let Some(handle) = deadline {
        handle.abort();
    }

    sources.sort_by(|a, b| a.source_id.cmp(&b.source_id));
    failures.sort_by(|a, b| a.source_id.cmp(&b.source_id));

    let ranking = aggregator.finalize();
    let finished_at = Utc::now();

    info!(
        run_id = %run_id,
        titles = ranking.len(),
        completed = lists.len(),
        failed = failures.len(),
        skipped = skipped.len(),
        elapsed_ms = (finished_at - started_at).num_milliseconds(),
        "Run finished"
    );

    RunReport {
        run_id,
        started_at,
        finished_at,
        ranking,
        lists,
        sources,
        skipped,
        record_failures,
        failures,
    }
}

/// Drive one adapter under the run's cancellation and the source timeout
async fn run_source(
    adapter: Arc<dyn SourceAdapter>,
    store: Arc<MovieStore>,
    cancel: CancellationToken,
    source_timeout: Option<Duration>,
) -> SourceOutcome {
    let mut outcome = SourceOutcome::default();
    outcome.summary.source_id = adapter.source_id().to_string();

    let interrupted = {
        let work = ingest_source(adapter.as_ref(), &store, &mut outcome);
        let bounded = async {
            match source_timeout {
                Some(limit) => match tokio::time::timeout(limit, work).await {
                    Ok(result) => result.err().map(|e| e.to_string()),
                    Err(_) => Some(format!("timed out after {}s", limit.as_secs_f64())),
                },
                None => work.await.err().map(|e| e.to_string()),
            }
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Some(CANCELLED.to_string()),
            failure = bounded => failure,
        }
    };

    outcome.summary.listed = outcome.titles.len();
    match interrupted {
        Some(reason) => {
            outcome.failure = Some(reason);
            outcome.titles.clear();
        }
        None => outcome.summary.completed = true,
    }
    outcome
}

/// Normalize, merge and list every entry of one source, in order
async fn ingest_source(
    adapter: &dyn SourceAdapter,
    store: &MovieStore,
    outcome: &mut SourceOutcome,
) -> Result<(), AdapterError> {
    let source_id = adapter.source_id();
    let mut entries = adapter.produce();
    let mut position: u32 = 0;

    debug!(source = %source_id, "Source started");

    while let Some(item) = entries.next().await {
        position += 1;

        let entry = match item {
            Ok(entry) => entry,
            Err(e) if e.is_recoverable() => {
                warn!(source = %source_id, position, error = %e, "Skipping unparseable entry");
                outcome.skipped.push(SkippedEntry {
                    source_id: source_id.to_string(),
                    raw_title: None,
                    reason: e.to_string(),
                });
                continue;
            }
            Err(e) => return Err(e),
        };

        let title = match normalize(&entry.raw_title, entry.raw_year.as_deref()) {
            Ok(title) => title,
            Err(e) => {
                warn!(source = %source_id, raw_title = %entry.raw_title, error = %e, "Skipping entry");
                outcome.skipped.push(SkippedEntry {
                    source_id: source_id.to_string(),
                    raw_title: Some(entry.raw_title),
                    reason: e.to_string(),
                });
                continue;
            }
        };

        // Sources without explicit ranks are ranked by position
        let partial = MovieRecord::observation(
            source_id,
            Some(entry.raw_rank.unwrap_or(position)),
            entry.raw_score,
            entry.raw_review_count,
            entry.raw_gross,
        );

        match store.put(&title, &partial).await {
            Ok(put) if put.created => outcome.summary.created += 1,
            Ok(put) if !put.report.is_empty() => outcome.summary.updated += 1,
            Ok(_) => {}
            Err(e) => {
                if e.is_corruption() {
                    warn!(source = %source_id, title = %title, error = %e, "Record not merged");
                } else {
                    error!(source = %source_id, title = %title, error = %e, "Record not merged");
                }
                outcome.record_failures.push(RecordFailure {
                    source_id: source_id.to_string(),
                    title: title.clone(),
                    reason: e.to_string(),
                });
            }
        }

        outcome.titles.push(title);
    }

    debug!(source = %source_id, entries = position, "Source exhausted");
    Ok(())
}
