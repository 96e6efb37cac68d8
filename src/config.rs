//! Application configuration management.
//!
//! Settings are layered with figment, later layers winning:
//!
//! 1. Built-in defaults ([`Config::default`])
//! 2. TOML file: `--config <FILE>`, or `config.toml` in the platform config
//!    directory (e.g. `~/.config/rustlink/config.toml` on Linux)
//! 3. Environment variables prefixed with `RUSTLINK_` (e.g. `RUSTLINK_JOBS=4`)
//! 4. Command-line flags ([`Config::merge_cli`])
//!
//! # Example
//!
//! ```toml
//! root = "/srv/docs"
//! exclude = [".git", "_site", "node_modules"]
//! exclude_nested = true
//! jobs = 4
//! ```

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::cli::Cli;

/// Prefix for configuration environment variables.
pub const ENV_PREFIX: &str = "RUSTLINK_";

/// Directories pruned by default, resolved against the search root.
pub const DEFAULT_EXCLUDES: &[&str] = &[
    "_extensions",
    "_freeze",
    "_partials",
    ".idea",
    ".github",
    ".obsidian",
    ".git",
    ".vscode",
    ".quarto",
    "_site",
    "node_modules",
    "__pycache__",
    ".pytest_cache",
];

/// Errors that can occur while loading configuration.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// An explicitly requested config file does not exist.
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    /// The config file or environment holds invalid values.
    #[error("Invalid configuration from {path}: {source}")]
    Invalid {
        /// File that was being loaded
        path: PathBuf,
        /// The underlying figment error
        #[source]
        source: Box<figment::Error>,
    },
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Search root (current directory when unset)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,
    /// Directory entries to prune
    pub exclude: Vec<String>,
    /// Also prune excluded basenames below the first level
    pub exclude_nested: bool,
    /// Worker threads for hashing and linking
    pub jobs: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root: None,
            exclude: DEFAULT_EXCLUDES.iter().map(|s| (*s).to_string()).collect(),
            exclude_nested: false,
            jobs: 1,
        }
    }
}

impl Config {
    /// Load the configuration.
    ///
    /// With `explicit`, the file must exist and parse. Otherwise the default
    /// location is tried; a broken file there is reported and ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] only for problems with an explicit file.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            if !path.is_file() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            return Self::extract(path);
        }

        match Self::default_path() {
            Some(path) => Ok(Self::load_from_path(&path)),
            None => Ok(Self::extract_env_only()),
        }
    }

    /// Load from `path` (skipped when missing), falling back on error.
    ///
    /// Invalid values are logged and replaced by the defaults (plus the
    /// environment, when it is valid on its own).
    #[must_use]
    pub fn load_from_path(path: &Path) -> Self {
        match Self::extract(path) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Ignoring configuration: {}", e);
                Self::extract_env_only()
            }
        }
    }

    fn extract(path: &Path) -> Result<Self, ConfigError> {
        log::debug!("Loading configuration from {}", path.display());
        Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(path))
            .merge(Self::env())
            .extract()
            .map_err(|e| ConfigError::Invalid {
                path: path.to_path_buf(),
                source: Box::new(e),
            })
    }

    fn extract_env_only() -> Self {
        Figment::from(Serialized::defaults(Self::default()))
            .merge(Self::env())
            .extract()
            .unwrap_or_else(|e| {
                log::warn!("Ignoring {}* environment: {}", ENV_PREFIX, e);
                Self::default()
            })
    }

    fn env() -> Env {
        // RUSTLINK_LOG configures logging, not the pipeline
        Env::prefixed(ENV_PREFIX).ignore(&["log"])
    }

    /// Platform-specific default location of `config.toml`.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "rustlink").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Apply command-line overrides.
    pub fn merge_cli(&mut self, cli: &Cli) {
        if let Some(ref root) = cli.root {
            self.root = Some(root.clone());
        }
        if let Some(ref exclude) = cli.exclude {
            self.exclude = exclude.clone();
        }
        if cli.exclude_nested {
            self.exclude_nested = true;
        }
        if let Some(jobs) = cli.jobs {
            self.jobs = jobs;
        }
    }

    /// Worker count, never below one.
    #[must_use]
    pub fn effective_jobs(&self) -> usize {
        self.jobs.max(1)
    }

    /// Search root, defaulting to the current directory.
    #[must_use]
    pub fn root_or_cwd(&self) -> PathBuf {
        self.root.clone().unwrap_or_else(|| PathBuf::from("."))
    }
}
