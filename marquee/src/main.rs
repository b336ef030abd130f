//! marquee - movie list reconciliation
//!
//! Subcommands:
//! - `run`: ingest every configured source, merge records, write lists and
//!   the prevalence ranking
//! - `show`: print the merged record for one title
//! - `normalize`: print the canonical form of a title

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use marquee::adapters::build_adapters;
use marquee::config::{resolve, store_folder, RunOverrides};
use marquee::{normalize, output, MovieStore, RunContext};
use marquee_common::config::{ensure_directory_exists, load_config, resolve_data_folder, TomlConfig};
use marquee_common::logging::init_tracing;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "marquee")]
#[command(about = "Reconcile movie lists from many sources into one ranking")]
#[command(version)]
struct Args {
    /// Config file path
    #[arg(short, long, global = true, env = "MARQUEE_CONFIG")]
    config: Option<PathBuf>,

    /// Data folder (movie records live in <data-dir>/movies); falls back to
    /// MARQUEE_DATA_DIR, then the config file
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run all enabled sources (or those given with --source)
    Run {
        /// Output folder for list files and the ranking
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Only run this source (repeatable)
        #[arg(short, long = "source", value_name = "ID")]
        sources: Vec<String>,

        /// Sources processed at once
        #[arg(long)]
        concurrency: Option<usize>,

        /// Whole-run deadline in seconds (0 = none)
        #[arg(long)]
        timeout_secs: Option<u64>,

        /// Ranking rows printed to stdout
        #[arg(long, default_value = "25")]
        top: usize,
    },

    /// Print the stored record for a title
    Show {
        /// Title, canonical or raw (e.g. "the godfather 1972")
        title: String,

        #[arg(short, long)]
        year: Option<String>,
    },

    /// Print the canonical form of a title
    Normalize {
        title: String,

        #[arg(short, long)]
        year: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let toml_config = load_config(args.config.as_deref()).context("Failed to load configuration")?;
    init_tracing(&toml_config.logging.level);

    match args.command {
        Command::Run {
            output_dir,
            sources,
            concurrency,
            timeout_secs,
            top,
        } => {
            let overrides = RunOverrides {
                data_dir: args.data_dir,
                output_dir,
                sources,
                concurrency,
                timeout_secs,
            };
            run(&toml_config, &overrides, top).await
        }
        Command::Show { title, year } => {
            let title = normalize(&title, year.as_deref())?;
            let data_dir = resolve_data_folder(args.data_dir.as_deref(), &toml_config);
            let store = MovieStore::open(store_folder(&data_dir))?;
            let record = store.get(&title).await?;
            if record.is_empty() {
                println!("No record for {}", title);
            } else {
                println!("{}", title);
                println!("{}", serde_json::to_string_pretty(&record)?);
            }
            Ok(())
        }
        Command::Normalize { title, year } => {
            println!("{}", normalize(&title, year.as_deref())?);
            Ok(())
        }
    }
}

async fn run(
    toml_config: &TomlConfig,
    overrides: &RunOverrides,
    top: usize,
) -> Result<()> {
    info!("Starting marquee v{}", env!("CARGO_PKG_VERSION"));

    let resolved = resolve(toml_config, overrides).context("Invalid run configuration")?;
    ensure_directory_exists(&resolved.data_dir)
        .with_context(|| format!("Failed to create data folder {}", resolved.data_dir.display()))?;

    let store = MovieStore::open(resolved.store_dir())?;
    let adapters = build_adapters(&resolved.sources)?;
    let ctx = RunContext::new(Arc::new(store), resolved.run.clone());

    let cancel = ctx.cancel_token();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            warn!("Received Ctrl+C, cancelling run");
            cancel.cancel();
        }
    });

    let report = marquee::run(&ctx, adapters).await;

    output::write_lists(&resolved.output_dir, &report.lists).context("Failed to write list files")?;
    output::write_ranking(&resolved.output_dir, &report.ranking).context("Failed to write ranking")?;

    print!("{}", output::render_report(&report, top));
    println!("\nOutput: {}", resolved.output_dir.display());
    Ok(())
}
