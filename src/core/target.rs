//! Target definitions - the buildable units of a package.
//!
//! A Target is one compilation unit Cargo would build: the library, an
//! executable, an example, an integration test or a benchmark.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The kind of buildable unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    /// `[lib]`, a single table
    Lib,
    /// `[[bin]]`
    Bin,
    /// `[[example]]`
    Example,
    /// `[[test]]`
    Test,
    /// `[[bench]]`
    Bench,
}

impl TargetKind {
    /// Every kind, library first.
    pub const ALL: [TargetKind; 5] = [
        TargetKind::Lib,
        TargetKind::Bin,
        TargetKind::Example,
        TargetKind::Test,
        TargetKind::Bench,
    ];

    /// The array-of-tables kinds, in insertion priority order.
    pub const ARRAY_KINDS: [TargetKind; 4] = [
        TargetKind::Bin,
        TargetKind::Example,
        TargetKind::Test,
        TargetKind::Bench,
    ];

    /// Manifest table key (`lib`, `bin`, `example`, `test`, `bench`).
    pub fn table_key(&self) -> &'static str {
        match self {
            TargetKind::Lib => "lib",
            TargetKind::Bin => "bin",
            TargetKind::Example => "example",
            TargetKind::Test => "test",
            TargetKind::Bench => "bench",
        }
    }

    /// Parse a manifest table key.
    pub fn from_table_key(key: &str) -> Option<Self> {
        TargetKind::ALL.into_iter().find(|k| k.table_key() == key)
    }

    /// Whether this kind is declared as an array of tables.
    pub fn is_array(&self) -> bool {
        !matches!(self, TargetKind::Lib)
    }

    /// Directory holding units of this kind, relative to the package root.
    ///
    /// The library has no directory of its own; it lives at `src/lib.rs`.
    pub fn conventional_dir(&self) -> Option<&'static str> {
        match self {
            TargetKind::Lib => None,
            TargetKind::Bin => Some("src/bin"),
            TargetKind::Example => Some("examples"),
            TargetKind::Test => Some("tests"),
            TargetKind::Bench => Some("benches"),
        }
    }

    /// Automatic discovery switch in `[package]` for this kind.
    pub fn auto_key(&self) -> Option<&'static str> {
        match self {
            TargetKind::Lib => None,
            TargetKind::Bin => Some("autobins"),
            TargetKind::Example => Some("autoexamples"),
            TargetKind::Test => Some("autotests"),
            TargetKind::Bench => Some("autobenches"),
        }
    }

    /// Human readable description.
    pub fn description(&self) -> &'static str {
        match self {
            TargetKind::Lib => "library",
            TargetKind::Bin => "executable",
            TargetKind::Example => "example",
            TargetKind::Test => "integration test",
            TargetKind::Bench => "benchmark",
        }
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.table_key())
    }
}

impl FromStr for TargetKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "lib" | "library" => Ok(TargetKind::Lib),
            "bin" | "executable" => Ok(TargetKind::Bin),
            "example" => Ok(TargetKind::Example),
            "test" => Ok(TargetKind::Test),
            "bench" | "benchmark" => Ok(TargetKind::Bench),
            _ => Err(format!(
                "invalid target kind '{}'; expected one of: lib, bin, example, test, bench",
                s
            )),
        }
    }
}

/// How a target came to be known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetOrigin {
    /// Written in the manifest
    Declared,
    /// Reserved default (`src/lib.rs`, `src/main.rs`) present without a declaration
    Implicit,
    /// Found by sweeping a kind directory; never declared
    Discovered,
}

/// A buildable unit with its resolved location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    /// Target name as written (or inferred)
    pub name: String,

    /// What kind of unit this is
    pub kind: TargetKind,

    /// Path from the manifest, if one was written
    pub declared_path: Option<PathBuf>,

    /// Resolved path relative to the package root
    pub path: PathBuf,

    /// `required-features`
    #[serde(default)]
    pub required_features: Vec<String>,

    pub origin: TargetOrigin,
}

impl Target {
    /// Create a declared target at a resolved path.
    pub fn new(name: impl Into<String>, kind: TargetKind, path: impl Into<PathBuf>) -> Self {
        Target {
            name: name.into(),
            kind,
            declared_path: None,
            path: path.into(),
            required_features: Vec::new(),
            origin: TargetOrigin::Declared,
        }
    }

    /// Set the path exactly as the manifest spells it.
    pub fn with_declared_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.declared_path = Some(path.into());
        self
    }

    /// Set required features.
    pub fn with_required_features(mut self, features: Vec<String>) -> Self {
        self.required_features = features;
        self
    }

    /// Set the origin.
    pub fn with_origin(mut self, origin: TargetOrigin) -> Self {
        self.origin = origin;
        self
    }

    /// Present on disk but never declared.
    pub fn is_auto_discovered(&self) -> bool {
        self.origin == TargetOrigin::Discovered
    }

    /// Whether `name` names this target, treating `-` and `_` alike.
    pub fn matches_name(&self, name: &str) -> bool {
        names_equivalent(&self.name, name)
    }

    /// Whether this target is identified by `(kind, name)`.
    pub fn is(&self, kind: TargetKind, name: &str) -> bool {
        self.kind == kind && self.matches_name(name)
    }
}

/// A `[lib]` / `[[bin]]` / ... entry as written in the manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetDecl {
    pub name: Option<String>,
    pub path: Option<PathBuf>,
    pub required_features: Vec<String>,
}

impl TargetDecl {
    /// The declared name, or the stem of the declared path.
    pub fn effective_name(&self) -> Option<String> {
        self.name.clone().or_else(|| {
            self.path
                .as_deref()
                .and_then(Path::file_stem)
                .map(|s| s.to_string_lossy().into_owned())
        })
    }
}

/// Canonical spelling for name comparison: `-` folded into `_`.
pub fn normalize_name(name: &str) -> String {
    name.replace('-', "_")
}

/// Whether two names differ at most by `-`/`_` substitution.
pub fn names_equivalent(a: &str, b: &str) -> bool {
    a.len() == b.len()
        && a.bytes().zip(b.bytes()).all(|(x, y)| {
            x == y || matches!((x, y), (b'-', b'_') | (b'_', b'-'))
        })
}
