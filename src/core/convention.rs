//! Conventional target locations.
//!
//! Cargo infers where a target lives from its kind and name when the
//! manifest gives no `path`. This module computes those locations, maps
//! paths back to kinds, and spots targets filed under the wrong kind's
//! directory.

use std::path::{Component, Path, PathBuf};

use crate::core::target::{Target, TargetKind};

/// Source file extension for targets.
pub const SOURCE_EXT: &str = "rs";

/// Reserved default library path.
pub const DEFAULT_LIB_PATH: &str = "src/lib.rs";

/// Reserved default executable path.
pub const DEFAULT_BIN_PATH: &str = "src/main.rs";

/// Candidate paths for a target without an explicit `path`, in priority order.
///
/// For the array kinds the single-file form `<dir>/<name>.rs` comes before
/// the directory form `<dir>/<name>/main.rs`; each form is listed with the
/// name as written and with `-`/`_` swapped. An executable named after its
/// package finally falls back to `src/main.rs`.
pub fn candidates(kind: TargetKind, name: &str, package_name: Option<&str>) -> Vec<PathBuf> {
    let Some(dir) = kind.conventional_dir() else {
        return vec![PathBuf::from(DEFAULT_LIB_PATH)];
    };

    let spellings = spellings(name);
    let mut paths: Vec<PathBuf> = spellings
        .iter()
        .map(|n| Path::new(dir).join(format!("{}.{}", n, SOURCE_EXT)))
        .collect();
    paths.extend(
        spellings
            .iter()
            .map(|n| Path::new(dir).join(n).join(format!("main.{}", SOURCE_EXT))),
    );

    if kind == TargetKind::Bin && package_name.is_some_and(|p| p == name) {
        paths.push(PathBuf::from(DEFAULT_BIN_PATH));
    }

    paths
}

/// Resolve a target's path: the first candidate that exists under `root`,
/// else the first candidate (a target may be declared before its file exists).
pub fn resolve(root: &Path, kind: TargetKind, name: &str, package_name: Option<&str>) -> PathBuf {
    let candidates = candidates(kind, name, package_name);
    candidates
        .iter()
        .find(|p| root.join(p).is_file())
        .or_else(|| candidates.first())
        .cloned()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_LIB_PATH))
}

/// Kind whose conventional directory contains `path` (package-relative).
///
/// `src/lib.rs` and `src/main.rs` map to the library and executable;
/// other files under `src/` outside `src/bin` belong to no kind.
pub fn kind_for_path(path: &Path) -> Option<TargetKind> {
    let path = normalize(path);
    if path == Path::new(DEFAULT_LIB_PATH) {
        return Some(TargetKind::Lib);
    }
    if path == Path::new(DEFAULT_BIN_PATH) {
        return Some(TargetKind::Bin);
    }
    TargetKind::ARRAY_KINDS.into_iter().find(|kind| {
        kind.conventional_dir()
            .is_some_and(|dir| path.starts_with(dir) && path != Path::new(dir))
    })
}

/// Unit name for a file sitting in `kind`'s directory, if its shape is one
/// Cargo would build on its own: `<dir>/<name>.rs` or `<dir>/<name>/main.rs`.
pub fn unit_name_for_path(kind: TargetKind, path: &Path) -> Option<String> {
    let dir = kind.conventional_dir()?;
    let rel = normalize(path);
    let rel = rel.strip_prefix(dir).ok()?;
    let parts: Vec<&str> = rel
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => s.to_str(),
            _ => None,
        })
        .collect();

    match parts.as_slice() {
        [file] => file
            .strip_suffix(&format!(".{}", SOURCE_EXT))
            .filter(|stem| !stem.is_empty())
            .map(String::from),
        [unit, main] if *main == format!("main.{}", SOURCE_EXT) => Some(unit.to_string()),
        _ => None,
    }
}

/// If a target's file lives in a different kind's conventional directory,
/// return that kind. Reported to the user, never corrected.
pub fn location_mismatch(target: &Target) -> Option<TargetKind> {
    let found = kind_for_path(&target.path)?;
    // The default paths are only claims for their own kind; a library at
    // `src/main.rs` is odd but not a directory mismatch.
    let default_bin = normalize(&target.path) == Path::new(DEFAULT_BIN_PATH);
    if found == TargetKind::Lib || (target.kind == TargetKind::Lib && default_bin) {
        return None;
    }
    (found != target.kind).then_some(found)
}

/// Strip `.` components so `./examples/a.rs` compares equal to `examples/a.rs`.
pub fn normalize(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

fn spellings(name: &str) -> Vec<String> {
    let mut out = vec![name.to_string()];
    for alt in [name.replace('-', "_"), name.replace('_', "-")] {
        if !out.contains(&alt) {
            out.push(alt);
        }
    }
    out
}
