//! Run configuration resolution
//!
//! Combines command-line overrides with the TOML file (and, for folders, the
//! environment) into the settings one run needs.
//!
//! **Priority:** command line → environment → TOML → compiled defaults

use crate::orchestrator::RunConfig;
use marquee_common::config::{resolve_data_folder, resolve_output_folder, SourceSpec, TomlConfig};
use marquee_common::{Error, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Values given on the command line; `None`/empty means "not given"
#[derive(Debug, Clone, Default)]
pub struct RunOverrides {
    pub data_dir: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    /// Restrict the run to these source ids
    pub sources: Vec<String>,
    pub concurrency: Option<usize>,
    pub timeout_secs: Option<u64>,
}

/// Fully resolved settings for one run
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub data_dir: PathBuf,
    pub output_dir: PathBuf,
    pub run: RunConfig,
    /// Sources to run, in config file order
    pub sources: Vec<SourceSpec>,
}

impl ResolvedConfig {
    pub fn store_dir(&self) -> PathBuf {
        store_folder(&self.data_dir)
    }
}

/// Where movie records live under a data folder
pub fn store_folder(data_dir: &Path) -> PathBuf {
    data_dir.join("movies")
}

/// Resolve the settings for a run
///
/// A timeout of 0 seconds means no limit.
///
/// # Errors
/// `Error::Config` for zero concurrency, an unknown `--source` id, or when
/// no source is left to run.
pub fn resolve(toml_config: &TomlConfig, overrides: &RunOverrides) -> Result<ResolvedConfig> {
    let data_dir = resolve_data_folder(overrides.data_dir.as_deref(), toml_config);
    let output_dir = resolve_output_folder(overrides.output_dir.as_deref(), toml_config, &data_dir);

    let concurrency = overrides.concurrency.unwrap_or(toml_config.run.concurrency);
    if concurrency == 0 {
        return Err(Error::Config("concurrency must be at least 1".to_string()));
    }

    let seconds = |value: Option<u64>| value.filter(|s| *s > 0).map(Duration::from_secs);
    let run = RunConfig {
        concurrency,
        timeout: seconds(overrides.timeout_secs.or(toml_config.run.timeout_secs)),
        source_timeout: seconds(toml_config.run.source_timeout_secs),
    };

    let sources = select_sources(toml_config, &overrides.sources)?;
    info!(
        sources = %sources.iter().map(|s| s.id.as_str()).collect::<Vec<_>>().join(","),
        concurrency = run.concurrency,
        "Run configuration resolved"
    );

    Ok(ResolvedConfig {
        data_dir,
        output_dir,
        run,
        sources,
    })
}

/// Sources named on the command line (even if disabled in the file),
/// otherwise every enabled source
fn select_sources(toml_config: &TomlConfig, requested: &[String]) -> Result<Vec<SourceSpec>> {
    let selected: Vec<SourceSpec> = if requested.is_empty() {
        toml_config.enabled_sources().cloned().collect()
    } else {
        if let Some(unknown) = requested
            .iter()
            .find(|id| !toml_config.sources.iter().any(|s| &s.id == *id))
        {
            return Err(Error::Config(format!("Unknown source id '{}'", unknown)));
        }
        toml_config
            .sources
            .iter()
            .filter(|s| requested.contains(&s.id))
            .cloned()
            .collect()
    };

    if selected.is_empty() {
        return Err(Error::Config(
            "No sources to run: add [[sources]] entries to the config file".to_string(),
        ));
    }
    Ok(selected)
}
