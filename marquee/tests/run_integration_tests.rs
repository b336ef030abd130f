//! End-to-end runs: adapters → normalizer → store → aggregator → output

use futures::StreamExt;
use marquee::adapters::{build_adapters, StaticAdapter};
use marquee::orchestrator::{run, RunConfig, RunContext};
use marquee::output::{write_lists, write_ranking};
use marquee::{normalize, EntryStream, MovieStore, RawEntry, SourceAdapter};
use marquee_common::config::{SourceKind, SourceSpec};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;

/// Emits one entry, then stalls far longer than any test limit
struct StallingAdapter {
    id: &'static str,
}

impl SourceAdapter for StallingAdapter {
    fn source_id(&self) -> &str {
        self.id
    }

    fn produce(&self) -> EntryStream<'_> {
        async_stream::stream! {
            yield Ok(RawEntry::new(self.id, "Metropolis (1927)"));
            tokio::time::sleep(Duration::from_secs(3600)).await;
            yield Ok(RawEntry::new(self.id, "Nosferatu (1922)"));
        }
        .boxed()
    }
}

fn context(dir: &TempDir, config: RunConfig) -> RunContext {
    let store = MovieStore::open(dir.path().join("movies")).unwrap();
    RunContext::new(Arc::new(store), config)
}

fn file_source(dir: &TempDir, id: &str, contents: &str) -> SourceSpec {
    let path = dir.path().join(format!("{}.txt", id));
    std::fs::write(&path, contents).unwrap();
    SourceSpec {
        id: id.to_string(),
        kind: SourceKind::File,
        location: path.to_string_lossy().into_owned(),
        enabled: true,
    }
}

#[tokio::test]
async fn test_same_movie_from_two_sources_counts_two() {
    let dir = TempDir::new().unwrap();
    let ctx = context(&dir, RunConfig::default());
    let adapters: Vec<Arc<dyn SourceAdapter>> = vec![
        Arc::new(StaticAdapter::from_titles("imdb", ["The Godfather (1972)"])),
        Arc::new(StaticAdapter::from_titles("afi", ["The Godfather (1972)"])),
    ];

    let report = run(&ctx, adapters).await;

    assert_eq!(report.ranking.len(), 1);
    assert_eq!(report.ranking[0].title.as_str(), "The Godfather (1972)");
    assert_eq!(report.ranking[0].count, 2);
    assert!(report.is_clean());
}

#[tokio::test]
async fn test_differently_formatted_titles_reconcile() {
    let dir = TempDir::new().unwrap();
    let ctx = context(&dir, RunConfig::default());
    let afi = StaticAdapter::new(
        "afi",
        vec![RawEntry::new("afi", "CITIZEN KANE").with_year("(1941)").with_rank(1)],
    );
    let rt = StaticAdapter::from_titles("rt", ["Citizen Kane 1941"]);
    let imdb = StaticAdapter::from_titles("imdb", ["citizen kane (1941)"]);

    let report = run(&ctx, vec![Arc::new(afi), Arc::new(rt), Arc::new(imdb)]).await;

    assert_eq!(report.ranking.len(), 1);
    assert_eq!(report.ranking[0].title.as_str(), "Citizen Kane (1941)");
    assert_eq!(report.ranking[0].count, 3);
    assert_eq!(report.ranking[0].sources, vec!["afi", "imdb", "rt"]);

    let record = ctx.store.get(&report.ranking[0].title).await.unwrap();
    assert_eq!(record.ranks.len(), 3);
}

#[tokio::test]
async fn test_file_sources_to_output_files() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("output");
    let specs = vec![
        file_source(
            &dir,
            "afi",
            "# AFI 100 Years\n1. CITIZEN KANE (1941)\n2. CASABLANCA (1942)\n3. THE GODFATHER (1972)\n",
        ),
        file_source(
            &dir,
            "imdb",
            "#1 The Shawshank Redemption (1994)\tscore=9.3\n\
             #2 The Godfather (1972)\tscore=9.2\treviews=1,900,000\n\
             #3 A Movie Nobody Dated\n\
             #4 Casablanca (1942)\tscore=high\n",
        ),
    ];
    let adapters = build_adapters(&specs).unwrap();
    let ctx = context(&dir, RunConfig::default());

    let report = run(&ctx, adapters).await;
    write_lists(&output, &report.lists).unwrap();
    write_ranking(&output, &report.ranking).unwrap();

    assert_eq!(report.skipped.len(), 2);
    assert!(report.failures.is_empty());

    let afi = std::fs::read_to_string(output.join("lists/afi.txt")).unwrap();
    assert_eq!(afi, "Citizen Kane (1941)\nCasablanca (1942)\nThe Godfather (1972)\n");
    let imdb = std::fs::read_to_string(output.join("lists/imdb.txt")).unwrap();
    assert_eq!(imdb, "The Shawshank Redemption (1994)\nThe Godfather (1972)\n");

    let ranking = std::fs::read_to_string(output.join("ranking.txt")).unwrap();
    assert_eq!(
        ranking,
        "2\tThe Godfather (1972)\n\
         1\tCasablanca (1942)\n\
         1\tCitizen Kane (1941)\n\
         1\tThe Shawshank Redemption (1994)\n"
    );

    let godfather = ctx.store.get(&normalize("The Godfather (1972)", None).unwrap()).await.unwrap();
    assert_eq!(godfather.ranks["afi"], 3);
    assert_eq!(godfather.ranks["imdb"], 2);
    assert_eq!(godfather.ratings["imdb"].reviews, Some(1_900_000));
}

#[tokio::test]
async fn test_missing_file_fails_only_that_source() {
    let dir = TempDir::new().unwrap();
    let mut specs = vec![file_source(&dir, "afi", "1. Jaws (1975)\n")];
    specs.push(SourceSpec {
        id: "gone".to_string(),
        kind: SourceKind::File,
        location: dir.path().join("gone.txt").to_string_lossy().into_owned(),
        enabled: true,
    });
    let ctx = context(&dir, RunConfig::default());

    let report = run(&ctx, build_adapters(&specs).unwrap()).await;

    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].source_id, "gone");
    assert_eq!(report.ranking.len(), 1);
    assert!(report.lists.contains_key("afi"));
}

#[tokio::test]
async fn test_run_deadline_cancels_stalled_source() {
    let dir = TempDir::new().unwrap();
    let ctx = context(
        &dir,
        RunConfig {
            timeout: Some(Duration::from_millis(300)),
            ..RunConfig::default()
        },
    );
    let adapters: Vec<Arc<dyn SourceAdapter>> = vec![
        Arc::new(StallingAdapter { id: "slow" }),
        Arc::new(StaticAdapter::from_titles("afi", ["Sunrise (1927)", "Metropolis (1927)"])),
    ];

    let started = Instant::now();
    let report = run(&ctx, adapters).await;

    assert!(started.elapsed() < Duration::from_secs(30));
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].source_id, "slow");
    assert!(!report.lists.contains_key("slow"));
    assert_eq!(report.ranking.len(), 2);
    assert!(report.ranking.iter().all(|r| r.count == 1));

    // Work done before the deadline is kept
    let metropolis = ctx.store.get(&normalize("Metropolis (1927)", None).unwrap()).await.unwrap();
    assert_eq!(metropolis.ranks.get("slow"), Some(&1));
    assert_eq!(metropolis.ranks.get("afi"), Some(&2));
}

#[tokio::test]
async fn test_source_timeout_isolates_one_source() {
    let dir = TempDir::new().unwrap();
    let ctx = context(
        &dir,
        RunConfig {
            concurrency: 1,
            source_timeout: Some(Duration::from_millis(200)),
            ..RunConfig::default()
        },
    );
    let adapters: Vec<Arc<dyn SourceAdapter>> = vec![
        Arc::new(StallingAdapter { id: "slow" }),
        Arc::new(StaticAdapter::from_titles("afi", ["Sunrise (1927)"])),
    ];

    let report = run(&ctx, adapters).await;

    assert_eq!(report.failures.len(), 1);
    assert!(report.failures[0].reason.contains("timed out"));
    assert_eq!(report.lists["afi"].len(), 1);
}

#[tokio::test]
async fn test_aggregation_is_per_run_and_records_accumulate() {
    let dir = TempDir::new().unwrap();

    let first = context(&dir, RunConfig::default());
    let report = run(&first, vec![Arc::new(StaticAdapter::from_titles("afi", ["Vertigo (1958)"]))]).await;
    assert_eq!(report.ranking[0].count, 1);

    let second = context(&dir, RunConfig::default());
    assert_ne!(first.run_id, second.run_id);
    let report = run(&second, vec![Arc::new(StaticAdapter::from_titles("bfi", ["VERTIGO 1958"]))]).await;

    assert_eq!(report.ranking[0].count, 1);
    assert_eq!(report.ranking[0].sources, vec!["bfi"]);
    let vertigo = second.store.get(&report.ranking[0].title).await.unwrap();
    assert_eq!(vertigo.ranks.len(), 2);
}

#[tokio::test]
async fn test_collision_reported_but_title_still_counted() {
    let dir = TempDir::new().unwrap();
    let ctx = context(&dir, RunConfig { concurrency: 1, ..RunConfig::default() });
    let adapters: Vec<Arc<dyn SourceAdapter>> = vec![
        Arc::new(StaticAdapter::from_titles("imdb", ["Face/Off (1997)"])),
        Arc::new(StaticAdapter::from_titles("empire", ["Face-Off (1997)"])),
    ];

    let report = run(&ctx, adapters).await;

    assert_eq!(report.record_failures.len(), 1);
    assert_eq!(report.record_failures[0].source_id, "empire");
    assert_eq!(report.ranking.len(), 2);
    assert!(report.failures.is_empty());
}
