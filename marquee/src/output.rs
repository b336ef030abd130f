//! List files, ranking file and the printed run report

use crate::aggregator::RankedTitle;
use crate::normalizer::CanonicalTitle;
use crate::orchestrator::RunReport;
use marquee_common::config::ensure_directory_exists;
use marquee_common::Result;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::info;

pub const LISTS_DIR: &str = "lists";
pub const RANKING_FILE: &str = "ranking.txt";

/// Write `<output>/lists/<source_id>.txt`, one canonical title per line
pub fn write_lists(
    output_dir: &Path,
    lists: &BTreeMap<String, Vec<CanonicalTitle>>,
) -> Result<Vec<PathBuf>> {
    let lists_dir = output_dir.join(LISTS_DIR);
    ensure_directory_exists(&lists_dir)?;

    let mut written = Vec::with_capacity(lists.len());
    for (source_id, titles) in lists {
        let path = lists_dir.join(format!("{}.txt", source_id));
        let mut text = String::new();
        for title in titles {
            text.push_str(title.as_str());
            text.push('\n');
        }
        std::fs::write(&path, text)?;
        info!(source = %source_id, path = %path.display(), titles = titles.len(), "List written");
        written.push(path);
    }
    Ok(written)
}

/// Write `<output>/ranking.txt` as `<count>\t<title>` lines
pub fn write_ranking(output_dir: &Path, ranking: &[RankedTitle]) -> Result<PathBuf> {
    ensure_directory_exists(output_dir)?;
    let path = output_dir.join(RANKING_FILE);
    std::fs::write(&path, render_ranking(ranking))?;
    info!(path = %path.display(), titles = ranking.len(), "Ranking written");
    Ok(path)
}

pub fn render_ranking(ranking: &[RankedTitle]) -> String {
    ranking
        .iter()
        .map(|r| format!("{}\t{}\n", r.count, r.title))
        .collect()
}

/// Human-readable summary for stdout
pub fn render_report(report: &RunReport, top: usize) -> String {
    let mut out = String::new();
    let elapsed = report.finished_at - report.started_at;
    // Writing into a String cannot fail
    let _ = writeln!(out, "Run {} ({} ms)", report.run_id, elapsed.num_milliseconds());

    let _ = writeln!(out, "\nSources:");
    for source in &report.sources {
        let status = if source.completed { "ok" } else { "FAILED" };
        let _ = writeln!(
            out,
            "  {:<16} {:<6} listed={} created={} updated={}",
            source.source_id, status, source.listed, source.created, source.updated
        );
    }

    let shown = top.min(report.ranking.len());
    let _ = writeln!(out, "\nTop {} of {} titles:", shown, report.ranking.len());
    for (position, row) in report.ranking.iter().take(top).enumerate() {
        let _ = writeln!(out, "  {:>4}. {:>3}  {}", position + 1, row.count, row.title);
    }

    if !report.failures.is_empty() {
        let _ = writeln!(out, "\nFailed sources:");
        for failure in &report.failures {
            let _ = writeln!(out, "  {}: {}", failure.source_id, failure.reason);
        }
    }

    if !report.record_failures.is_empty() {
        let _ = writeln!(out, "\nRecords not merged:");
        for failure in &report.record_failures {
            let _ = writeln!(out, "  [{}] {}: {}", failure.source_id, failure.title, failure.reason);
        }
    }

    if !report.skipped.is_empty() {
        let _ = writeln!(out, "\nSkipped entries:");
        for entry in &report.skipped {
            let _ = writeln!(
                out,
                "  [{}] {}: {}",
                entry.source_id,
                entry.raw_title.as_deref().unwrap_or("<unparsed>"),
                entry.reason
            );
        }
    }

    out
}
