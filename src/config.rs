use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::purl::Ecosystem;

// =============================================================================
// Network-related constants
// =============================================================================

/// Per-attempt timeout for registry requests in seconds
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 10;

/// Attempts per registry request, including the first one
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Backoff before the first retry; doubles per attempt
pub const RETRY_BASE_DELAY_MS: u64 = 250;

/// Upper bound for a single backoff, including server-sent Retry-After
pub const MAX_RETRY_DELAY_MS: u64 = 10_000;

/// Worker pool size used when none is configured
pub const DEFAULT_MAX_WORKERS: usize = 4;

const APP_DIR: &str = "sbom-age-check";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("max workers must be at least 1")]
    NoWorkers,

    #[error("HTTP timeout must be greater than zero")]
    ZeroTimeout,

    #[error("HTTP attempts must be at least 1")]
    NoAttempts,

    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml_ng::Error,
    },
}

/// Settings for one analysis run
#[derive(Debug, Clone, PartialEq)]
pub struct CheckConfig {
    /// Maximum accepted age of a pinned release, in days
    pub threshold_days: u32,
    /// Look up the latest release for alarming components
    pub check_updates: bool,
    /// Size of the lookup worker pool
    pub max_workers: usize,
    /// Cache file; `None` keeps the cache in memory for this run only
    pub cache_path: Option<PathBuf>,
    pub show_ignored: bool,
    pub show_unresolved: bool,
    pub http: HttpConfig,
    pub registries: RegistriesConfig,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            threshold_days: 0,
            check_updates: false,
            max_workers: DEFAULT_MAX_WORKERS,
            cache_path: Some(default_cache_path()),
            show_ignored: false,
            show_unresolved: false,
            http: HttpConfig::default(),
            registries: RegistriesConfig::default(),
        }
    }
}

impl CheckConfig {
    /// Rejects settings the run cannot start with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_workers < 1 {
            return Err(ConfigError::NoWorkers);
        }
        if self.http.timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.http.max_attempts == 0 {
            return Err(ConfigError::NoAttempts);
        }
        Ok(())
    }
}

/// Optional configuration file (YAML or JSON)
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct FileConfig {
    pub http: HttpConfig,
    pub registries: RegistriesConfig,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml_ng::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// HTTP behaviour shared by all registries
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub max_attempts: u32,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Registry-specific configuration
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct RegistriesConfig {
    pub cargo: RegistryConfig,
    pub npm: RegistryConfig,
    pub pypi: RegistryConfig,
    pub maven: MavenRegistryConfig,
    pub cocoapods: RegistryConfig,
}

impl RegistriesConfig {
    pub fn is_enabled(&self, ecosystem: Ecosystem) -> bool {
        match ecosystem {
            Ecosystem::Cargo => self.cargo.enabled,
            Ecosystem::Npm => self.npm.enabled,
            Ecosystem::PyPI => self.pypi.enabled,
            Ecosystem::Maven => self.maven.enabled,
            Ecosystem::CocoaPods => self.cocoapods.enabled,
        }
    }
}

/// Individual registry configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct RegistryConfig {
    pub enabled: bool,
    /// Mirror to use instead of the public registry
    pub base_url: Option<String>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: None,
        }
    }
}

/// Maven talks to three endpoints, each of which can be mirrored
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct MavenRegistryConfig {
    pub enabled: bool,
    /// Maven Central repository (repo1)
    pub base_url: Option<String>,
    pub google_url: Option<String>,
    pub search_url: Option<String>,
}

impl Default for MavenRegistryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: None,
            google_url: None,
            search_url: None,
        }
    }
}

/// Returns the cache directory for sbom-age-check.
/// Uses $XDG_CACHE_HOME/sbom-age-check if XDG_CACHE_HOME is set,
/// otherwise falls back to ~/.cache/sbom-age-check,
/// or ./sbom-age-check if neither is available.
pub fn cache_dir() -> PathBuf {
    cache_dir_with_env(std::env::var("XDG_CACHE_HOME").ok(), dirs::home_dir())
}

/// Returns the default path of the lookup cache.
pub fn default_cache_path() -> PathBuf {
    cache_dir().join("cache.db")
}

fn cache_dir_with_env(xdg_cache_home: Option<String>, home_dir: Option<PathBuf>) -> PathBuf {
    let cache_dir = xdg_cache_home
        .filter(|dir| !dir.is_empty())
        .map(PathBuf::from)
        .or_else(|| home_dir.map(|home| home.join(".cache")))
        .unwrap_or_else(|| PathBuf::from("."));

    cache_dir.join(APP_DIR)
}
