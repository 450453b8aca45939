//! Workspace membership.
//!
//! A workspace is a root manifest plus the member packages it lists in
//! `[workspace] members`. Members are recomputed from disk on every call.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::core::convention::normalize;
use crate::core::errors::ManifestError;
use crate::core::manifest::{ManifestDocument, MANIFEST_NAME};
use crate::util::fs;

/// One package inside a workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Member {
    /// Package name from the member's manifest
    pub name: String,

    /// Path relative to the workspace root (`.` for the root package)
    pub relative_path: PathBuf,

    pub is_root: bool,
}

impl Member {
    /// Manifest path of this member under `root`.
    pub fn manifest_path(&self, root: &Path) -> PathBuf {
        root.join(&self.relative_path).join(MANIFEST_NAME)
    }

    /// Member path as passed to the discovery functions.
    pub fn member_path(&self) -> Option<&Path> {
        (!self.is_root).then_some(self.relative_path.as_path())
    }
}

/// Load the manifest of `dir`, logging and returning `None` on any failure.
pub fn load_member_manifest(dir: &Path) -> Option<ManifestDocument> {
    let path = dir.join(MANIFEST_NAME);
    if !path.is_file() {
        return None;
    }
    match ManifestDocument::load(&path) {
        Ok(doc) => Some(doc),
        Err(e) => {
            tracing::warn!("skipping {}: {}", path.display(), e);
            None
        }
    }
}

/// Enumerate the members of the workspace rooted at `root`.
///
/// The root is listed first, and only if it has its own `[package]`. Each
/// `members` entry is a literal path or a glob (`"crates/*"`) expanded to
/// the matching directories that hold a valid manifest. Order follows the
/// manifest; glob expansions are sorted by path.
pub fn discover_members(root: &Path) -> Vec<Member> {
    let Some(manifest) = load_member_manifest(root) else {
        tracing::warn!("no readable manifest at {}", root.display());
        return Vec::new();
    };

    let mut members = Vec::new();
    if let Some(name) = manifest.package_name() {
        members.push(Member {
            name,
            relative_path: PathBuf::from("."),
            is_root: true,
        });
    }

    let Some(workspace) = manifest.workspace() else {
        return members;
    };
    let excluded: Vec<PathBuf> = workspace
        .exclude
        .iter()
        .map(|e| normalize(Path::new(e)))
        .collect();

    for entry in &workspace.members {
        for dir in expand_member_entry(root, entry) {
            let relative_path = normalize(&dir);
            if relative_path.as_os_str().is_empty()
                || excluded.iter().any(|e| relative_path.starts_with(e))
                || members.iter().any(|m: &Member| m.relative_path == relative_path)
            {
                continue;
            }

            let Some(sub) = load_member_manifest(&root.join(&relative_path)) else {
                tracing::debug!("`{}` has no valid manifest; not a member", relative_path.display());
                continue;
            };
            let Some(name) = sub.package_name() else {
                tracing::warn!("member `{}` has no package name", relative_path.display());
                continue;
            };

            members.push(Member {
                name,
                relative_path,
                is_root: false,
            });
        }
    }

    members
}

/// Expand one `members` entry to candidate directories relative to `root`.
fn expand_member_entry(root: &Path, entry: &str) -> Vec<PathBuf> {
    if !entry.contains(['*', '?', '[']) {
        return vec![PathBuf::from(entry)];
    }

    match fs::glob_dirs(root, entry) {
        Ok(dirs) => dirs,
        Err(e) => {
            tracing::warn!("invalid member pattern `{}`: {:#}", entry, e);
            Vec::new()
        }
    }
}

/// Find the nearest `Cargo.toml` in `dir` or its ancestors.
pub fn find_manifest(dir: &Path) -> Result<PathBuf, ManifestError> {
    dir.ancestors()
        .map(|d| d.join(MANIFEST_NAME))
        .find(|p| p.is_file())
        .ok_or_else(|| ManifestError::NotFound {
            dir: dir.to_path_buf(),
        })
}

/// Find the workspace root governing `manifest_path`.
///
/// Walks upward from the manifest's directory for a manifest with a
/// `[workspace]` section that lists the package; falls back to the
/// package's own directory.
pub fn find_workspace_root(manifest_path: &Path) -> PathBuf {
    let package_dir = manifest_path.parent().unwrap_or(Path::new(".")).to_path_buf();

    for dir in package_dir.ancestors() {
        let Some(doc) = load_member_manifest(dir) else {
            continue;
        };
        if doc.workspace().is_none() {
            continue;
        }
        if dir == package_dir
            || discover_members(dir)
                .iter()
                .any(|m| dir.join(&m.relative_path) == package_dir)
        {
            return dir.to_path_buf();
        }
    }

    package_dir
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs as stdfs;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        stdfs::create_dir_all(path.parent().unwrap()).unwrap();
        stdfs::write(path, content).unwrap();
    }

    #[test]
    fn test_glob_members_require_manifest() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "Cargo.toml", "[workspace]\nmembers = [\"crates/*\"]\n");
        write(tmp.path(), "crates/a/Cargo.toml", "[package]\nname = \"a\"\n");
        stdfs::create_dir_all(tmp.path().join("crates/scratch")).unwrap();

        let members = discover_members(tmp.path());
        assert_eq!(
            members,
            vec![Member {
                name: "a".into(),
                relative_path: PathBuf::from("crates/a"),
                is_root: false,
            }]
        );
    }

    #[test]
    fn test_root_package_listed_first() {
        let tmp = TempDir::new().unwrap();
        write(
            tmp.path(),
            "Cargo.toml",
            "[package]\nname = \"root\"\n\n[workspace]\nmembers = [\"tools/xtask\", \"crates/*\"]\nexclude = [\"crates/old\"]\n",
        );
        write(tmp.path(), "tools/xtask/Cargo.toml", "[package]\nname = \"xtask\"\n");
        write(tmp.path(), "crates/b/Cargo.toml", "[package]\nname = \"b\"\n");
        write(tmp.path(), "crates/old/Cargo.toml", "[package]\nname = \"old\"\n");

        let names: Vec<_> = discover_members(tmp.path())
            .into_iter()
            .map(|m| (m.name, m.is_root))
            .collect();
        assert_eq!(
            names,
            vec![
                ("root".to_string(), true),
                ("xtask".to_string(), false),
                ("b".to_string(), false),
            ]
        );
    }

    #[test]
    fn test_broken_member_manifest_is_skipped() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "Cargo.toml", "[workspace]\nmembers = [\"a\", \"b\"]\n");
        write(tmp.path(), "a/Cargo.toml", "[package\nname = ");
        write(tmp.path(), "b/Cargo.toml", "[package]\nname = \"b\"\n");

        let members = discover_members(tmp.path());
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].name, "b");
    }

    #[test]
    fn test_unreadable_root_yields_nothing() {
        let tmp = TempDir::new().unwrap();
        assert!(discover_members(tmp.path()).is_empty());
    }

    #[test]
    fn test_find_manifest_and_workspace_root() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "Cargo.toml", "[workspace]\nmembers = [\"crates/*\"]\n");
        write(tmp.path(), "crates/a/Cargo.toml", "[package]\nname = \"a\"\n");
        stdfs::create_dir_all(tmp.path().join("crates/a/src/deep")).unwrap();

        let manifest = find_manifest(&tmp.path().join("crates/a/src/deep")).unwrap();
        assert_eq!(manifest, tmp.path().join("crates/a/Cargo.toml"));
        assert_eq!(find_workspace_root(&manifest), tmp.path());
    }
}
