//! Global context for tend operations.
//!
//! Provides centralized access to the working directory, the manifest
//! being operated on, and the merged configuration.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::core::workspace::{find_manifest, find_workspace_root};
use crate::util::config::{load_config, Config};

/// Global context shared by all commands.
#[derive(Debug, Clone)]
pub struct GlobalContext {
    /// Current working directory
    cwd: PathBuf,

    /// Explicit `--manifest-path`, if given
    manifest_path: Option<PathBuf>,
}

impl GlobalContext {
    /// Create a context for the process working directory.
    pub fn new() -> Result<Self> {
        let cwd = std::env::current_dir().context("failed to get current directory")?;
        Ok(Self::with_cwd(cwd))
    }

    /// Create a context for a specific working directory.
    pub fn with_cwd(cwd: PathBuf) -> Self {
        GlobalContext {
            cwd,
            manifest_path: None,
        }
    }

    /// Use an explicit manifest instead of searching upward.
    pub fn with_manifest_path(mut self, path: Option<PathBuf>) -> Self {
        self.manifest_path = path.map(|p| {
            if p.is_absolute() {
                p
            } else {
                self.cwd.join(p)
            }
        });
        self
    }

    /// Get the current working directory.
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// The manifest to operate on: `--manifest-path`, else the nearest
    /// `Cargo.toml` upward from the working directory.
    pub fn find_manifest(&self) -> Result<PathBuf> {
        if let Some(path) = &self.manifest_path {
            if !path.is_file() {
                anyhow::bail!("manifest path `{}` does not exist", path.display());
            }
            return Ok(path.clone());
        }
        Ok(find_manifest(&self.cwd)?)
    }

    /// Workspace root for the current manifest.
    pub fn workspace_root(&self) -> Result<PathBuf> {
        let manifest = self.find_manifest()?;
        Ok(find_workspace_root(&manifest))
    }

    /// Member path (relative to the workspace root) of the current manifest,
    /// `None` when it is the root package.
    pub fn current_member(&self) -> Result<Option<PathBuf>> {
        let manifest = self.find_manifest()?;
        let root = find_workspace_root(&manifest);
        let dir = manifest.parent().unwrap_or(Path::new("."));
        Ok(dir
            .strip_prefix(&root)
            .ok()
            .filter(|rel| !rel.as_os_str().is_empty())
            .map(Path::to_path_buf))
    }

    /// Merged configuration for the workspace.
    pub fn config(&self) -> Config {
        match self.workspace_root() {
            Ok(root) => load_config(&root),
            Err(_) => load_config(&self.cwd),
        }
    }
}
