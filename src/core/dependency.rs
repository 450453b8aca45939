//! Dependency declarations.
//!
//! A Dependency is one entry of a dependency table, read at surface level:
//! no requirement solving happens here.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use semver::VersionReq;
use serde::{Deserialize, Serialize};
use toml_edit::Item;

use crate::core::manifest::string_list;

/// Which table a dependency was declared in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyKind {
    /// `[workspace.dependencies]`, inherited by members
    Inherited,
    /// `[dependencies]`
    Normal,
    /// `[dev-dependencies]`
    Dev,
    /// `[build-dependencies]`
    Build,
}

impl DependencyKind {
    pub const ALL: [DependencyKind; 4] = [
        DependencyKind::Inherited,
        DependencyKind::Normal,
        DependencyKind::Dev,
        DependencyKind::Build,
    ];

    /// Table path of this kind inside the manifest.
    pub fn table_path(&self) -> &'static [&'static str] {
        match self {
            DependencyKind::Inherited => &["workspace", "dependencies"],
            DependencyKind::Normal => &["dependencies"],
            DependencyKind::Dev => &["dev-dependencies"],
            DependencyKind::Build => &["build-dependencies"],
        }
    }

    /// Header as written in the manifest.
    pub fn header(&self) -> String {
        format!("[{}]", self.table_path().join("."))
    }
}

impl fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DependencyKind::Inherited => f.pad("workspace"),
            DependencyKind::Normal => f.pad("normal"),
            DependencyKind::Dev => f.pad("dev"),
            DependencyKind::Build => f.pad("build"),
        }
    }
}

impl FromStr for DependencyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "workspace" | "inherited" => Ok(DependencyKind::Inherited),
            "normal" | "dependencies" => Ok(DependencyKind::Normal),
            "dev" | "dev-dependencies" => Ok(DependencyKind::Dev),
            "build" | "build-dependencies" => Ok(DependencyKind::Build),
            _ => Err(format!(
                "invalid dependency kind '{}'; expected 'workspace', 'normal', 'dev', or 'build'",
                s
            )),
        }
    }
}

/// Git reference pinned by a dependency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GitReference {
    Branch(String),
    Tag(String),
    Rev(String),
}

/// A dependency declaration.
///
/// `(kind, name)` identifies a declaration; the same name may appear under
/// several kinds at once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    /// Key in the dependency table
    pub name: String,

    pub kind: DependencyKind,

    /// Version requirement, verbatim
    pub version: Option<String>,

    /// Local path source
    pub path: Option<PathBuf>,

    /// Git repository source
    pub git: Option<String>,

    /// Branch, tag, or revision for git sources
    pub reference: Option<GitReference>,

    /// Features to enable
    #[serde(default)]
    pub features: Vec<String>,

    pub optional: bool,

    pub default_features: bool,

    /// Real package name when the key is a rename
    pub package: Option<String>,

    /// `workspace = true`
    pub workspace: bool,
}

impl Dependency {
    /// Create a bare dependency of the given kind.
    pub fn new(name: impl Into<String>, kind: DependencyKind) -> Self {
        Dependency {
            name: name.into(),
            kind,
            version: None,
            path: None,
            git: None,
            reference: None,
            features: Vec::new(),
            optional: false,
            default_features: true,
            package: None,
            workspace: false,
        }
    }

    /// Set the version requirement.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Read a dependency from its manifest item.
    ///
    /// Accepts the shorthand string form and inline or full tables. Returns
    /// `None` for values that are neither.
    pub fn from_item(name: &str, kind: DependencyKind, item: &Item) -> Option<Self> {
        let mut dep = Dependency::new(name, kind);

        if let Some(version) = item.as_str() {
            dep.version = Some(version.to_string());
            return Some(dep);
        }

        let table = item.as_table_like()?;
        dep.version = table.get("version").and_then(Item::as_str).map(String::from);
        dep.path = table
            .get("path")
            .and_then(Item::as_str)
            .map(PathBuf::from);
        dep.git = table.get("git").and_then(Item::as_str).map(String::from);
        dep.reference = if let Some(branch) = table.get("branch").and_then(Item::as_str) {
            Some(GitReference::Branch(branch.to_string()))
        } else if let Some(tag) = table.get("tag").and_then(Item::as_str) {
            Some(GitReference::Tag(tag.to_string()))
        } else {
            table
                .get("rev")
                .and_then(Item::as_str)
                .map(|rev| GitReference::Rev(rev.to_string()))
        };
        dep.features = table.get("features").map(string_list).unwrap_or_default();
        dep.optional = table
            .get("optional")
            .and_then(Item::as_bool)
            .unwrap_or(false);
        dep.default_features = table
            .get("default-features")
            .or_else(|| table.get("default_features"))
            .and_then(Item::as_bool)
            .unwrap_or(true);
        dep.package = table.get("package").and_then(Item::as_str).map(String::from);
        dep.workspace = table
            .get("workspace")
            .and_then(Item::as_bool)
            .unwrap_or(false);

        Some(dep)
    }

    /// Version with its leading requirement operator removed, for display
    /// and comparison.
    pub fn display_version(&self) -> Option<&str> {
        self.version.as_deref().map(strip_requirement_operator)
    }

    /// Requirement operator the version was written with (`""` when bare).
    pub fn requirement_operator(&self) -> &str {
        self.version
            .as_deref()
            .map(requirement_operator)
            .unwrap_or("")
    }

    /// Parsed version requirement, if the version is valid semver syntax.
    pub fn version_req(&self) -> Option<VersionReq> {
        self.version
            .as_deref()
            .and_then(|v| VersionReq::parse(v).ok())
    }

    /// Identity key.
    pub fn key(&self) -> (DependencyKind, &str) {
        (self.kind, self.name.as_str())
    }
}

const OPERATORS: [&str; 7] = [">=", "<=", "=", "^", "~", ">", "<"];

/// Leading requirement operator of a version string, without whitespace.
pub fn requirement_operator(version: &str) -> &str {
    let trimmed = version.trim_start();
    OPERATORS
        .iter()
        .find(|op| trimmed.starts_with(**op))
        .copied()
        .unwrap_or("")
}

/// Strip the leading requirement operator (`=`, `^`, `~`, `>=`, ...).
pub fn strip_requirement_operator(version: &str) -> &str {
    let trimmed = version.trim_start();
    trimmed[requirement_operator(trimmed).len()..].trim_start()
}

/// All dependency declarations of one manifest, grouped by table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencySet {
    pub inherited: Vec<Dependency>,
    pub normal: Vec<Dependency>,
    pub dev: Vec<Dependency>,
    pub build: Vec<Dependency>,
}

impl DependencySet {
    /// Declarations of one kind.
    pub fn of_kind(&self, kind: DependencyKind) -> &[Dependency] {
        match kind {
            DependencyKind::Inherited => &self.inherited,
            DependencyKind::Normal => &self.normal,
            DependencyKind::Dev => &self.dev,
            DependencyKind::Build => &self.build,
        }
    }

    pub(crate) fn of_kind_mut(&mut self, kind: DependencyKind) -> &mut Vec<Dependency> {
        match kind {
            DependencyKind::Inherited => &mut self.inherited,
            DependencyKind::Normal => &mut self.normal,
            DependencyKind::Dev => &mut self.dev,
            DependencyKind::Build => &mut self.build,
        }
    }

    /// Look up a declaration by its `(kind, name)` key.
    pub fn get(&self, kind: DependencyKind, name: &str) -> Option<&Dependency> {
        self.of_kind(kind).iter().find(|d| d.name == name)
    }

    /// Every declaration, kinds in table order.
    pub fn iter(&self) -> impl Iterator<Item = &Dependency> {
        DependencyKind::ALL
            .into_iter()
            .flat_map(move |kind| self.of_kind(kind).iter())
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
