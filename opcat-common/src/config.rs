//! Configuration for opcat.
//!
//! Layered TOML configuration: every field has a serde default so a partial
//! (or absent) file still yields a runnable config. Validation happens once
//! at startup and produces warnings rather than silently clamping.

use crate::types::{Family, FamilyRegistry, OperatorSource};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Hard cap on simultaneous repository fetches.
pub const MAX_FETCH_JOBS: usize = 15;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    NotFound(PathBuf),
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Top-level opcat configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OpcatConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Cache directory holding fetched operator repositories.
    #[serde(default = "default_fetch_dir")]
    pub fetch_dir: PathBuf,
    /// Output directory holding staged operator sources.
    #[serde(default = "default_stage_dir")]
    pub stage_dir: PathBuf,
    /// Optional TOML file overriding the built-in family registry.
    #[serde(default)]
    pub families_file: Option<PathBuf>,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            fetch_dir: default_fetch_dir(),
            stage_dir: default_stage_dir(),
            families_file: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Simultaneous repository fetches (capped at [`MAX_FETCH_JOBS`]).
    #[serde(default = "default_jobs")]
    pub jobs: usize,
    /// Per-repository fetch timeout, humantime syntax (e.g. "120s", "2m").
    #[serde(default = "default_fetch_timeout")]
    pub timeout: String,
}

impl FetchConfig {
    /// Effective job count after applying the cap.
    pub fn effective_jobs(&self) -> usize {
        self.jobs.clamp(1, MAX_FETCH_JOBS)
    }

    /// Parsed fetch timeout; falls back to the default when unparseable
    /// (validation reports the bad value separately).
    pub fn timeout(&self) -> Duration {
        humantime::parse_duration(&self.timeout).unwrap_or(Duration::from_secs(120))
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            jobs: default_jobs(),
            timeout: default_fetch_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Path of the SQLite catalog database.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
    /// Namespace prefixed to every implementation entry point.
    #[serde(default = "default_namespace")]
    pub entry_point_namespace: String,
    /// Fixed execution-plugin identifier embedded in implementation rows.
    #[serde(default = "default_execution_plugin")]
    pub execution_plugin: String,
    /// Whether `wipe` also removes family rows.
    #[serde(default = "default_true")]
    pub wipe_families: bool,
    /// Busy timeout applied to the store connection (milliseconds).
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl CatalogConfig {
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            entry_point_namespace: default_namespace(),
            execution_plugin: default_execution_plugin(),
            wipe_families: true,
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_fetch_dir() -> PathBuf {
    PathBuf::from("fetch-op")
}

fn default_stage_dir() -> PathBuf {
    PathBuf::from("op")
}

fn default_jobs() -> usize {
    4
}

fn default_fetch_timeout() -> String {
    "120s".to_string()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("catalog.db")
}

fn default_namespace() -> String {
    "opcat.algo".to_string()
}

fn default_execution_plugin() -> String {
    "opcat.exec.local::LocalExecEngine".to_string()
}

fn default_true() -> bool {
    true
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

impl OpcatConfig {
    /// Load configuration from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let cfg = toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "config loaded");
        Ok(cfg)
    }

    /// Default config file location (`<config dir>/opcat/opcat.toml`), or
    /// `./opcat.toml` when no platform config directory exists.
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("io", "opcat", "opcat")
            .map(|dirs| dirs.config_dir().join("opcat.toml"))
            .unwrap_or_else(|| PathBuf::from("opcat.toml"))
    }

    /// Validate the loaded config, returning human-readable warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.fetch.jobs == 0 {
            warnings.push("fetch.jobs is 0; using 1".to_string());
        }
        if self.fetch.jobs > MAX_FETCH_JOBS {
            warnings.push(format!(
                "fetch.jobs {} exceeds cap {}; using {}",
                self.fetch.jobs,
                MAX_FETCH_JOBS,
                MAX_FETCH_JOBS
            ));
        }
        if humantime::parse_duration(&self.fetch.timeout).is_err() {
            warnings.push(format!(
                "fetch.timeout {:?} is not a valid duration; using 120s",
                self.fetch.timeout
            ));
        }
        if self.catalog.entry_point_namespace.is_empty() {
            warnings.push("catalog.entry_point_namespace is empty".to_string());
        }
        warnings
    }

    /// Build the family registry: the configured override file when set,
    /// otherwise the built-in list.
    pub fn family_registry(&self) -> Result<FamilyRegistry, ConfigError> {
        match &self.general.families_file {
            Some(path) => load_families(path),
            None => Ok(FamilyRegistry::builtin()),
        }
    }
}

/// On-disk shape of the operator list (`operators.toml`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OperatorList {
    #[serde(default, rename = "operator")]
    pub operators: Vec<OperatorSource>,
}

impl OperatorList {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// On-disk shape of a family registry override file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct FamilyFile {
    #[serde(default, rename = "family")]
    families: Vec<Family>,
}

fn load_families(path: &Path) -> Result<FamilyRegistry, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let file: FamilyFile = toml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(FamilyRegistry::new(file.families))
}
