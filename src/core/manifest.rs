//! Cargo.toml manifest parsing.
//!
//! A [`ManifestDocument`] owns the manifest text and a `toml_edit` tree
//! parsed from it. The text is the source of truth: edits are made to the
//! text and a new document is derived with [`ManifestDocument::reparse`],
//! never by mutating the tree.

use std::path::{Path, PathBuf};

use serde::Serialize;
use toml_edit::{DocumentMut, Item, TableLike};

use crate::core::dependency::{Dependency, DependencyKind, DependencySet};
use crate::core::errors::ManifestError;
use crate::core::feature::Feature;
use crate::core::target::{TargetDecl, TargetKind};

/// Canonical manifest file name.
pub const MANIFEST_NAME: &str = "Cargo.toml";

/// Build script setting from `[package]`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildScript {
    /// `build.rs` if present
    #[default]
    Default,
    /// `build = "path"`
    Path(PathBuf),
    /// `build = false`
    Disabled,
}

/// Package identity from the `[package]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageIdentity {
    pub name: String,

    /// Version string; `None` when absent or inherited from the workspace
    pub version: Option<String>,

    pub edition: Option<String>,

    pub build: BuildScript,

    /// `autobins`, `autoexamples`, `autotests`, `autobenches`
    pub auto_bins: bool,
    pub auto_examples: bool,
    pub auto_tests: bool,
    pub auto_benches: bool,
}

impl PackageIdentity {
    /// Whether filesystem discovery is enabled for a kind.
    pub fn auto_discovers(&self, kind: TargetKind) -> bool {
        match kind {
            TargetKind::Lib => true,
            TargetKind::Bin => self.auto_bins,
            TargetKind::Example => self.auto_examples,
            TargetKind::Test => self.auto_tests,
            TargetKind::Bench => self.auto_benches,
        }
    }
}

/// The `[workspace]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WorkspaceSection {
    /// Member paths or single-level glob patterns (`"crates/*"`)
    pub members: Vec<String>,

    /// Paths excluded from membership
    pub exclude: Vec<String>,

    pub default_members: Vec<String>,
}

/// A parsed manifest: text buffer plus structural tree.
#[derive(Debug, Clone)]
pub struct ManifestDocument {
    path: PathBuf,
    text: String,
    doc: DocumentMut,
}

impl ManifestDocument {
    /// Load a manifest from a file path.
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let text = std::fs::read_to_string(path).map_err(|source| ManifestError::Filesystem {
            path: path.to_path_buf(),
            source,
        })?;

        Self::parse(&text, path)
    }

    /// Parse manifest text. `path` is only used for diagnostics and to
    /// locate the package root.
    pub fn parse(text: &str, path: &Path) -> Result<Self, ManifestError> {
        let doc: DocumentMut = text
            .parse()
            .map_err(|e| ManifestError::from_toml(path, text, &e))?;

        Ok(ManifestDocument {
            path: path.to_path_buf(),
            text: text.to_string(),
            doc,
        })
    }

    /// Derive the document for edited text of the same manifest.
    pub fn reparse(&self, text: &str) -> Result<Self, ManifestError> {
        Self::parse(text, &self.path)
    }

    /// The manifest text, byte for byte.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The manifest path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory containing the manifest (the package root).
    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or(Path::new("."))
    }

    /// Read-only view of the structural tree.
    pub fn tree(&self) -> &toml_edit::Table {
        self.doc.as_table()
    }

    /// Look up an item by key path.
    pub fn get(&self, path: &[&str]) -> Option<&Item> {
        let mut item = self.doc.as_item();
        for key in path {
            item = item.as_table_like()?.get(key)?;
        }
        Some(item)
    }

    /// Package identity, if the manifest has a named `[package]`.
    pub fn package(&self) -> Option<PackageIdentity> {
        let table = self.table_like(&["package"])?;
        let Some(name) = table.get("name").and_then(Item::as_str) else {
            tracing::warn!("`[package]` in {} has no name", self.path.display());
            return None;
        };

        let build = match table.get("build") {
            Some(item) if item.as_bool() == Some(false) => BuildScript::Disabled,
            Some(item) => item
                .as_str()
                .map(|p| BuildScript::Path(PathBuf::from(p)))
                .unwrap_or_default(),
            None => BuildScript::Default,
        };
        let auto = |kind: TargetKind| {
            kind.auto_key()
                .map_or(true, |key| table.get(key).and_then(Item::as_bool).unwrap_or(true))
        };

        Some(PackageIdentity {
            name: name.to_string(),
            version: table.get("version").and_then(Item::as_str).map(String::from),
            edition: table.get("edition").and_then(Item::as_str).map(String::from),
            build,
            auto_bins: auto(TargetKind::Bin),
            auto_examples: auto(TargetKind::Example),
            auto_tests: auto(TargetKind::Test),
            auto_benches: auto(TargetKind::Bench),
        })
    }

    /// Package name shortcut.
    pub fn package_name(&self) -> Option<String> {
        self.package().map(|p| p.name)
    }

    /// The `[workspace]` section, if present.
    pub fn workspace(&self) -> Option<WorkspaceSection> {
        let table = self.table_like(&["workspace"])?;
        Some(WorkspaceSection {
            members: table.get("members").map(string_list).unwrap_or_default(),
            exclude: table.get("exclude").map(string_list).unwrap_or_default(),
            default_members: table
                .get("default-members")
                .map(string_list)
                .unwrap_or_default(),
        })
    }

    /// Whether this is a virtual manifest (workspace without a package).
    pub fn is_virtual(&self) -> bool {
        self.table_like(&["workspace"]).is_some() && self.table_like(&["package"]).is_none()
    }

    /// The `[lib]` table, if declared.
    pub fn lib(&self) -> Option<TargetDecl> {
        self.table_like(&["lib"]).map(target_decl)
    }

    /// Declarations of one kind, in manifest order.
    ///
    /// The library yields at most one entry.
    pub fn targets(&self, kind: TargetKind) -> Vec<TargetDecl> {
        if !kind.is_array() {
            return self.lib().into_iter().collect();
        }

        match self.doc.get(kind.table_key()) {
            Some(Item::ArrayOfTables(array)) => array.iter().map(|t| target_decl(t)).collect(),
            Some(Item::Value(toml_edit::Value::Array(array))) => array
                .iter()
                .filter_map(|v| v.as_inline_table())
                .map(|t| target_decl(t))
                .collect(),
            Some(other) => {
                tracing::warn!(
                    "`{}` in {} is a {}, expected an array of tables",
                    kind.table_key(),
                    self.path.display(),
                    other.type_name()
                );
                Vec::new()
            }
            None => Vec::new(),
        }
    }

    /// Declarations of one dependency table, in manifest order.
    pub fn dependencies(&self, kind: DependencyKind) -> Vec<Dependency> {
        let Some(table) = self.table_like(kind.table_path()) else {
            return Vec::new();
        };

        table
            .iter()
            .filter_map(|(name, item)| {
                let dep = Dependency::from_item(name, kind, item);
                if dep.is_none() {
                    tracing::warn!(
                        "ignoring malformed dependency `{}` in {}",
                        name,
                        kind.header()
                    );
                }
                dep
            })
            .collect()
    }

    /// All four dependency tables.
    pub fn dependency_set(&self) -> DependencySet {
        let mut set = DependencySet::default();
        for kind in DependencyKind::ALL {
            *set.of_kind_mut(kind) = self.dependencies(kind);
        }
        set
    }

    /// `[features]` entries, in manifest order.
    pub fn features(&self) -> Vec<Feature> {
        let Some(table) = self.table_like(&["features"]) else {
            return Vec::new();
        };

        table
            .iter()
            .map(|(name, item)| Feature::new(name).with_enables(string_list(item)))
            .collect()
    }

    /// Compare with another document as plain TOML data and return the
    /// dotted key paths whose values differ. Paths descend at most two
    /// levels (`dependencies.serde`), which is enough to tell one edited
    /// entry from collateral damage.
    pub fn semantic_changes(&self, other: &ManifestDocument) -> Vec<String> {
        let before = plain_table(&self.text);
        let after = plain_table(&other.text);
        let mut changes = Vec::new();
        diff_tables("", &before, &after, 2, &mut changes);
        changes
    }

    fn table_like(&self, path: &[&str]) -> Option<&dyn TableLike> {
        self.get(path)?.as_table_like()
    }
}

fn target_decl(table: &dyn TableLike) -> TargetDecl {
    TargetDecl {
        name: table.get("name").and_then(Item::as_str).map(String::from),
        path: table.get("path").and_then(Item::as_str).map(PathBuf::from),
        required_features: table
            .get("required-features")
            .map(string_list)
            .unwrap_or_default(),
    }
}

/// String elements of an array item; anything else yields nothing.
pub(crate) fn string_list(item: &Item) -> Vec<String> {
    item.as_array()
        .map(|array| {
            array
                .iter()
                .filter_map(|v| v.as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default()
}

fn plain_table(text: &str) -> toml::Table {
    // Already validated by `toml_edit`; the `toml` crate gives decor-free
    // values with structural equality.
    text.parse().unwrap_or_default()
}

fn diff_tables(
    prefix: &str,
    before: &toml::Table,
    after: &toml::Table,
    depth: usize,
    out: &mut Vec<String>,
) {
    let mut keys: Vec<&String> = before.keys().chain(after.keys()).collect();
    keys.sort();
    keys.dedup();

    for key in keys {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };
        match (before.get(key), after.get(key)) {
            (Some(toml::Value::Table(a)), Some(toml::Value::Table(b))) if depth > 1 => {
                diff_tables(&path, a, b, depth - 1, out);
            }
            (a, b) if a != b => out.push(path),
            _ => {}
        }
    }
}
