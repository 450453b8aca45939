//! Configuration file support for tend.
//!
//! Two configuration file locations are read:
//! - Global: `<config dir>/tend/config.toml` - User-wide defaults
//! - Project: `<workspace root>/.tend/config.toml` - Project-specific overrides
//!
//! Project config takes precedence over global config.
//!
//! ```toml
//! [scan]
//! skip-dirs = ["target", ".git", "generated"]
//! follow-links = false
//!
//! [drift]
//! ignore = ["src/bin/scratch*.rs"]
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

/// Directories never walked when no `skip-dirs` is configured.
pub const DEFAULT_SKIP_DIRS: [&str; 3] = ["target", ".git", "node_modules"];

/// tend configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Source tree walking
    pub scan: ScanConfig,

    /// Drift reporting
    pub drift: DriftConfig,
}

/// Source tree walking settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ScanConfig {
    /// Directory names never entered; empty means [`DEFAULT_SKIP_DIRS`]
    pub skip_dirs: Vec<String>,

    /// Follow symbolic links while walking
    pub follow_links: Option<bool>,
}

impl ScanConfig {
    /// Effective directory names to skip.
    pub fn skip_dirs(&self) -> Vec<String> {
        if self.skip_dirs.is_empty() {
            DEFAULT_SKIP_DIRS.iter().map(|s| s.to_string()).collect()
        } else {
            self.skip_dirs.clone()
        }
    }

    /// Effective link-following setting.
    pub fn follow_links(&self) -> bool {
        self.follow_links.unwrap_or(false)
    }
}

/// Drift reporting settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DriftConfig {
    /// Member-relative glob patterns never reported as unregistered
    pub ignore: Vec<String>,
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if the file doesn't exist
    /// or can't be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {:#}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    ///
    /// Ignore patterns accumulate across layers.
    pub fn merge(&mut self, other: Config) {
        if !other.scan.skip_dirs.is_empty() {
            self.scan.skip_dirs = other.scan.skip_dirs;
        }
        if other.scan.follow_links.is_some() {
            self.scan.follow_links = other.scan.follow_links;
        }
        for pattern in other.drift.ignore {
            if !self.drift.ignore.contains(&pattern) {
                self.drift.ignore.push(pattern);
            }
        }
    }
}

/// Path of the user-wide config file.
pub fn global_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "tend").map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Path of the project config file under a workspace root.
pub fn project_config_path(root: &Path) -> PathBuf {
    root.join(".tend").join("config.toml")
}

/// Load the merged configuration for a workspace root.
pub fn load_config(root: &Path) -> Config {
    let mut config = global_config_path()
        .map(|p| Config::load_or_default(&p))
        .unwrap_or_default();
    config.merge(Config::load_or_default(&project_config_path(root)));
    config
}
