//! Configuration loading and data folder resolution
//!
//! Settings sources, highest priority first:
//! 1. Command-line arguments
//! 2. Environment variables (`MARQUEE_DATA_DIR`, `MARQUEE_CONFIG`)
//! 3. TOML configuration file
//! 4. OS-dependent compiled defaults

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable overriding the data folder
pub const DATA_DIR_ENV: &str = "MARQUEE_DATA_DIR";

/// Environment variable pointing at the TOML config file
pub const CONFIG_ENV: &str = "MARQUEE_CONFIG";

/// Default number of sources fetched at the same time
pub const DEFAULT_CONCURRENCY: usize = 4;

/// TOML configuration file
///
/// Every field is optional; a missing file behaves like an empty one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Folder holding persisted movie records
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    /// Folder receiving list files and the ranking
    #[serde(default)]
    pub output_dir: Option<PathBuf>,

    /// Run limits
    #[serde(default)]
    pub run: RunSettings,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Source catalogue
    #[serde(default)]
    pub sources: Vec<SourceSpec>,
}

/// Concurrency and deadline limits for one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSettings {
    /// Maximum sources fetched at once
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Whole-run deadline in seconds (none = unbounded)
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    /// Per-source deadline in seconds (none = unbounded)
    #[serde(default)]
    pub source_timeout_secs: Option<u64>,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            timeout_secs: None,
            source_timeout_secs: None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// How a source list is obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Local list file
    File,
    /// List served over HTTP(S)
    Http,
}

/// One configured movie-list provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSpec {
    /// Stable identifier, used in records and list file names
    pub id: String,
    pub kind: SourceKind,
    /// File path or URL
    pub location: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_enabled() -> bool {
    true
}

impl TomlConfig {
    /// Parse and validate a TOML config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        let config: TomlConfig = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))?;
        config.validate()?;
        info!("Loaded TOML configuration from {}", path.display());
        Ok(config)
    }

    /// Check limits and source ids
    pub fn validate(&self) -> Result<()> {
        if self.run.concurrency == 0 {
            return Err(Error::Config("run.concurrency must be at least 1".to_string()));
        }

        let mut seen = HashSet::new();
        for source in &self.sources {
            if !is_valid_source_id(&source.id) {
                return Err(Error::Config(format!(
                    "Invalid source id '{}': use lowercase letters, digits, '_' or '-'",
                    source.id
                )));
            }
            if !seen.insert(source.id.as_str()) {
                return Err(Error::Config(format!("Duplicate source id '{}'", source.id)));
            }
            if source.location.trim().is_empty() {
                return Err(Error::Config(format!("Source '{}' has no location", source.id)));
            }
        }
        Ok(())
    }

    /// Enabled sources, in file order
    pub fn enabled_sources(&self) -> impl Iterator<Item = &SourceSpec> {
        self.sources.iter().filter(|s| s.enabled)
    }
}

/// Source ids end up in file names, so keep them to a safe alphabet
pub fn is_valid_source_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
}

/// Locate the config file: CLI argument, then `MARQUEE_CONFIG`, then the
/// per-user config directory (only if the file exists there)
pub fn locate_config_file(cli_arg: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    dirs::config_dir()
        .map(|d| d.join("marquee").join("marquee.toml"))
        .filter(|p| p.exists())
}

/// Load the config file if one is located, otherwise built-in defaults
///
/// An explicitly named file (CLI or environment) that cannot be read is an
/// error; the absence of a per-user file is not.
pub fn load_config(cli_arg: Option<&Path>) -> Result<TomlConfig> {
    match locate_config_file(cli_arg) {
        Some(path) => TomlConfig::load(&path),
        None => {
            warn!("No config file found, using built-in defaults");
            Ok(TomlConfig::default())
        }
    }
}

/// OS-dependent compiled defaults
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub data_dir: PathBuf,
    pub log_level: String,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        let data_dir = if cfg!(target_os = "linux") {
            // ~/.local/share/marquee
            dirs::data_local_dir()
                .map(|d| d.join("marquee"))
                .unwrap_or_else(|| PathBuf::from("./marquee_data"))
        } else if cfg!(target_os = "macos") {
            // ~/Library/Application Support/marquee
            dirs::data_dir()
                .map(|d| d.join("marquee"))
                .unwrap_or_else(|| PathBuf::from("./marquee_data"))
        } else if cfg!(target_os = "windows") {
            // %LOCALAPPDATA%\marquee
            dirs::data_local_dir()
                .map(|d| d.join("marquee"))
                .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\marquee"))
        } else {
            PathBuf::from("./marquee_data")
        };

        Self {
            data_dir,
            log_level: default_log_level(),
        }
    }
}

/// Data folder resolution in priority order:
/// 1. Command-line argument
/// 2. `MARQUEE_DATA_DIR`
/// 3. TOML `data_dir`
/// 4. OS-dependent compiled default
pub fn resolve_data_folder(cli_arg: Option<&Path>, toml_config: &TomlConfig) -> PathBuf {
    if let Some(path) = cli_arg {
        info!("Data folder: {} (from command line)", path.display());
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(DATA_DIR_ENV) {
        if !path.trim().is_empty() {
            info!("Data folder: {} (from {})", path, DATA_DIR_ENV);
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &toml_config.data_dir {
        info!("Data folder: {} (from TOML)", path.display());
        return path.clone();
    }

    let path = CompiledDefaults::for_current_platform().data_dir;
    info!("Data folder: {} (compiled default)", path.display());
    path
}

/// Output folder: command line, then TOML, then `<data folder>/output`
pub fn resolve_output_folder(
    cli_arg: Option<&Path>,
    toml_config: &TomlConfig,
    data_folder: &Path,
) -> PathBuf {
    cli_arg
        .map(Path::to_path_buf)
        .or_else(|| toml_config.output_dir.clone())
        .unwrap_or_else(|| data_folder.join("output"))
}

/// Create a folder (and parents) if missing
pub fn ensure_directory_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
        info!("Created directory: {}", path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config: TomlConfig = toml::from_str("").unwrap();
        assert_eq!(config, TomlConfig::default());
        assert_eq!(config.run.concurrency, DEFAULT_CONCURRENCY);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_source_enabled_defaults_true() {
        let config: TomlConfig = toml::from_str(
            r#"
            [[sources]]
            id = "afi"
            kind = "file"
            location = "lists/afi.txt"

            [[sources]]
            id = "imdb"
            kind = "http"
            location = "https://example.com/imdb.txt"
            enabled = false
            "#,
        )
        .unwrap();

        assert!(config.sources[0].enabled);
        assert_eq!(config.sources[1].kind, SourceKind::Http);
        let enabled: Vec<_> = config.enabled_sources().map(|s| s.id.as_str()).collect();
        assert_eq!(enabled, vec!["afi"]);
    }

    #[test]
    fn test_validate_rejects_zero_concurrency() {
        let mut config = TomlConfig::default();
        config.run.concurrency = 0;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_rejects_duplicate_and_unsafe_ids() {
        let spec = |id: &str| SourceSpec {
            id: id.to_string(),
            kind: SourceKind::File,
            location: "x.txt".to_string(),
            enabled: true,
        };

        let mut config = TomlConfig::default();
        config.sources = vec![spec("afi"), spec("afi")];
        assert!(config.validate().is_err());

        config.sources = vec![spec("Rotten Tomatoes")];
        assert!(config.validate().is_err());

        config.sources = vec![spec("rotten-tomatoes"), spec("wiki_gross")];
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_output_folder_falls_back_to_data_folder() {
        let config = TomlConfig::default();
        let out = resolve_output_folder(None, &config, Path::new("/data"));
        assert_eq!(out, PathBuf::from("/data/output"));

        let out = resolve_output_folder(Some(Path::new("/cli")), &config, Path::new("/data"));
        assert_eq!(out, PathBuf::from("/cli"));
    }
}
