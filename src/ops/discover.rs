//! Discovery of a member's buildable units, feature flags and dependencies.
//!
//! Everything here is recomputed from disk on each call. Failures are
//! logged and yield empty results; nothing returns an error.

use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::core::convention::{self, normalize, DEFAULT_BIN_PATH, DEFAULT_LIB_PATH, SOURCE_EXT};
use crate::core::dependency::{DependencyKind, DependencySet};
use crate::core::manifest::ManifestDocument;
use crate::core::target::{normalize_name, Target, TargetKind, TargetOrigin};
use crate::core::workspace::load_member_manifest;

pub use crate::core::workspace::discover_members;

/// Directory of a member: the workspace root, or `root/member`.
pub fn member_dir(root: &Path, member: Option<&Path>) -> PathBuf {
    match member {
        Some(member) if !member.as_os_str().is_empty() && member != Path::new(".") => {
            root.join(member)
        }
        _ => root.to_path_buf(),
    }
}

/// Load the manifest of a member, logging failures.
pub fn load_member(root: &Path, member: Option<&Path>) -> Option<ManifestDocument> {
    load_member_manifest(&member_dir(root, member))
}

/// Buildable units of a member.
///
/// Declared units come first in kind order (library, executables,
/// examples, tests, benchmarks), followed by files found in the kind
/// directories that no unit claims.
pub fn discover_units(root: &Path, member: Option<&Path>) -> Vec<Target> {
    match load_member(root, member) {
        Some(doc) => units_from_manifest(&doc),
        None => Vec::new(),
    }
}

/// Buildable units of a loaded manifest, probing the filesystem under its
/// directory.
pub fn units_from_manifest(doc: &ManifestDocument) -> Vec<Target> {
    let dir = doc.dir();
    let Some(package) = doc.package() else {
        return Vec::new();
    };
    let package_name = package.name.as_str();
    let mut units: Vec<Target> = Vec::new();

    // Library: `[lib]`, else the reserved default.
    match doc.lib() {
        Some(decl) => {
            let name = decl.name.clone().unwrap_or_else(|| normalize_name(package_name));
            let path = decl
                .path
                .as_deref()
                .map(normalize)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LIB_PATH));
            let mut unit = Target::new(name, TargetKind::Lib, path)
                .with_required_features(decl.required_features.clone());
            if let Some(declared) = decl.path {
                unit = unit.with_declared_path(declared);
            }
            units.push(unit);
        }
        None if dir.join(DEFAULT_LIB_PATH).is_file() => {
            units.push(
                Target::new(normalize_name(package_name), TargetKind::Lib, DEFAULT_LIB_PATH)
                    .with_origin(TargetOrigin::Implicit),
            );
        }
        None => {}
    }

    // Declared array entries.
    for kind in TargetKind::ARRAY_KINDS {
        for decl in doc.targets(kind) {
            let Some(name) = decl.effective_name() else {
                tracing::warn!(
                    "`[[{}]]` entry in {} has neither `name` nor `path`; ignoring it",
                    kind,
                    doc.path().display()
                );
                continue;
            };
            if units.iter().any(|u| u.is(kind, &name)) {
                tracing::warn!("duplicate {} `{}` in {}", kind.description(), name, doc.path().display());
                continue;
            }

            let path = match &decl.path {
                Some(path) => normalize(path),
                None => convention::resolve(dir, kind, &name, Some(package_name)),
            };
            let mut unit = Target::new(name, kind, path)
                .with_required_features(decl.required_features.clone());
            if let Some(declared) = decl.path {
                unit = unit.with_declared_path(declared);
            }
            units.push(unit);
        }
    }

    // Default executable, unless something already claims it.
    let main = Path::new(DEFAULT_BIN_PATH);
    if dir.join(main).is_file()
        && !units.iter().any(|u| u.path == main)
        && !units.iter().any(|u| u.is(TargetKind::Bin, package_name))
    {
        units.push(
            Target::new(package_name, TargetKind::Bin, DEFAULT_BIN_PATH)
                .with_origin(TargetOrigin::Implicit),
        );
    }

    // Files in the kind directories nobody claims.
    for kind in TargetKind::ARRAY_KINDS {
        if !package.auto_discovers(kind) {
            tracing::debug!("{} discovery disabled for `{}`", kind.description(), package_name);
            continue;
        }
        for (name, path) in sweep_kind_dir(dir, kind) {
            if units.iter().any(|u| u.path == path) {
                continue;
            }
            if let Some(existing) = units.iter().find(|u| u.is(kind, &name)) {
                tracing::debug!(
                    "{} is not a unit: `{}` is already {}",
                    path.display(),
                    name,
                    existing.path.display()
                );
                continue;
            }
            units.push(Target::new(name, kind, path).with_origin(TargetOrigin::Discovered));
        }
    }

    units.sort_by_key(|u| (u.is_auto_discovered(), u.kind));
    units
}

/// Candidate units directly inside a kind's directory: `<dir>/<name>.rs`
/// and `<dir>/<name>/main.rs`, sorted by file name.
fn sweep_kind_dir(package_dir: &Path, kind: TargetKind) -> Vec<(String, PathBuf)> {
    let Some(rel) = kind.conventional_dir() else {
        return Vec::new();
    };
    let base = package_dir.join(rel);
    if !base.is_dir() {
        return Vec::new();
    }

    let mut found = Vec::new();
    for entry in WalkDir::new(&base).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("skipping unreadable entry in {}: {}", base.display(), e);
                continue;
            }
        };
        let file_name = entry.file_name().to_string_lossy().into_owned();

        let candidate = if entry.file_type().is_dir() {
            let main = format!("main.{}", SOURCE_EXT);
            entry
                .path()
                .join(&main)
                .is_file()
                .then(|| Path::new(rel).join(&file_name).join(main))
        } else {
            Some(Path::new(rel).join(&file_name))
        };

        if let Some(path) = candidate {
            if let Some(name) = convention::unit_name_for_path(kind, &path) {
                found.push((name, path));
            }
        }
    }
    found
}

/// Feature flags of a member.
pub fn discover_flags(root: &Path, member: Option<&Path>) -> BTreeSet<String> {
    match load_member(root, member) {
        Some(doc) => flags_from_manifest(&doc),
        None => BTreeSet::new(),
    }
}

/// Declared features plus the implicit features of optional dependencies
/// that no feature references as `dep:<name>`.
pub fn flags_from_manifest(doc: &ManifestDocument) -> BTreeSet<String> {
    let features = doc.features();
    let mut flags: BTreeSet<String> = features.iter().map(|f| f.name.clone()).collect();

    let hidden: HashSet<&str> = features.iter().flat_map(|f| f.dep_references()).collect();
    for kind in [DependencyKind::Normal, DependencyKind::Build] {
        for dep in doc.dependencies(kind) {
            if dep.optional && !hidden.contains(dep.name.as_str()) {
                flags.insert(dep.name);
            }
        }
    }
    flags
}

/// Dependency declarations of a member, all four tables.
pub fn discover_dependencies(root: &Path, member: Option<&Path>) -> DependencySet {
    load_member(root, member)
        .map(|doc| doc.dependency_set())
        .unwrap_or_default()
}
