//! Filesystem utilities.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use glob::glob;
use tempfile::NamedTempFile;
use walkdir::WalkDir;

use crate::core::convention::{normalize, SOURCE_EXT};

/// Read a file to string, with nice error messages.
pub fn read_to_string(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read file: {}", path.display()))
}

/// Replace a file's contents in one step.
///
/// The new contents go to a temporary file next to `path` which is then
/// renamed over it, so a crash leaves either the old or the new file.
pub fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let dir = path.parent().unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("failed to create temporary file in {}", dir.display()))?;
    tmp.write_all(contents.as_bytes())
        .with_context(|| format!("failed to write temporary file for {}", path.display()))?;
    tmp.as_file()
        .sync_all()
        .with_context(|| format!("failed to flush temporary file for {}", path.display()))?;

    // Keep the original permissions.
    if let Ok(meta) = fs::metadata(path) {
        if let Err(e) = fs::set_permissions(tmp.path(), meta.permissions()) {
            tracing::debug!("could not copy permissions of {}: {}", path.display(), e);
        }
    }

    tmp.persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("failed to write file: {}", path.display()))?;
    Ok(())
}

/// Directories under `base` matching a glob `pattern`, relative to `base`, sorted.
pub fn glob_dirs(base: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let full_pattern = base.join(pattern);
    let pattern_str = full_pattern.to_string_lossy();

    let mut results = Vec::new();
    for entry in glob(&pattern_str).with_context(|| format!("invalid glob pattern: {}", pattern))? {
        match entry {
            Ok(path) if path.is_dir() => {
                results.push(relative_path(base, &path));
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!("glob error: {}", e);
            }
        }
    }

    results.sort();
    results.dedup();
    Ok(results)
}

/// Every `.rs` file below `dir`, relative to `base`, sorted.
///
/// Directories named in `skip_dirs` and the directories in `skip_paths`
/// (compared without `.` components) are not entered. Unreadable entries are skipped with a
/// warning; a missing `dir` yields nothing.
pub fn walk_source_files(
    base: &Path,
    dir: &Path,
    skip_dirs: &[String],
    skip_paths: &[PathBuf],
    follow_links: bool,
) -> Vec<PathBuf> {
    if !dir.is_dir() {
        return Vec::new();
    }

    let walker = WalkDir::new(dir)
        .follow_links(follow_links)
        .into_iter()
        .filter_entry(|e| {
            if e.depth() == 0 || !e.file_type().is_dir() {
                return true;
            }
            let name = e.file_name().to_string_lossy();
            let path = normalize(e.path());
            !skip_dirs.iter().any(|s| *s == name) && !skip_paths.iter().any(|p| *p == path)
        });

    let mut files = Vec::new();
    for entry in walker {
        match entry {
            Ok(entry) => {
                let path = entry.path();
                if entry.file_type().is_file()
                    && path.extension().is_some_and(|ext| ext == SOURCE_EXT)
                {
                    files.push(relative_path(base, path));
                }
            }
            Err(e) => {
                tracing::warn!("skipping unreadable entry: {}", e);
            }
        }
    }

    files.sort();
    files
}

/// Get the relative path from `base` to `path`.
pub fn relative_path(base: &Path, path: &Path) -> PathBuf {
    pathdiff::diff_paths(path, base).unwrap_or_else(|| path.to_path_buf())
}

/// Render a path with forward slashes, as manifests spell them.
pub fn manifest_path_string(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ProjectFixture;
    use tempfile::TempDir;

    #[test]
    fn test_glob_dirs_skips_files() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("crates/a")).unwrap();
        fs::create_dir_all(tmp.path().join("crates/b")).unwrap();
        fs::write(tmp.path().join("crates/README.md"), "hi").unwrap();

        let dirs = glob_dirs(tmp.path(), "crates/*").unwrap();
        assert_eq!(dirs, vec![PathBuf::from("crates/a"), PathBuf::from("crates/b")]);
    }

    #[test]
    fn test_walk_source_files() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src");
        fs::create_dir_all(src.join("nested")).unwrap();
        fs::create_dir_all(src.join("target")).unwrap();
        fs::create_dir_all(src.join("member")).unwrap();
        fs::write(src.join("lib.rs"), "").unwrap();
        fs::write(src.join("nested/deep.rs"), "").unwrap();
        fs::write(src.join("notes.md"), "").unwrap();
        fs::write(src.join("target/gen.rs"), "").unwrap();
        fs::write(src.join("member/other.rs"), "").unwrap();

        let files = walk_source_files(
            tmp.path(),
            &src,
            &["target".to_string()],
            &[src.join("member")],
            false,
        );
        assert_eq!(
            files,
            vec![PathBuf::from("src/lib.rs"), PathBuf::from("src/nested/deep.rs")]
        );
    }

    #[test]
    fn test_walk_skip_paths_ignore_cur_dir() {
        let project = ProjectFixture::raw("")
            .file("src/lib.rs", "")
            .file("src/inner/lib.rs", "")
            .build();

        let base = project.dotted_root();
        let skip = normalize(&base.join("src/inner"));
        let files = walk_source_files(&base, &base.join("src"), &[], &[skip], false);
        assert_eq!(files, vec![PathBuf::from("src/lib.rs")]);
    }

    #[test]
    fn test_walk_missing_dir() {
        let tmp = TempDir::new().unwrap();
        assert!(walk_source_files(tmp.path(), &tmp.path().join("nope"), &[], &[], false).is_empty());
    }

    #[test]
    fn test_write_atomic_replaces_contents() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("Cargo.toml");
        fs::write(&path, "old").unwrap();

        write_atomic(&path, "new").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "new");
        assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_write_atomic_keeps_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("Cargo.toml");
        fs::write(&path, "old").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o640)).unwrap();

        write_atomic(&path, "new").unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o640);
    }

    #[test]
    fn test_manifest_path_string() {
        assert_eq!(manifest_path_string(Path::new("src/bin/a.rs")), "src/bin/a.rs");
    }
}
