//! Test fixtures for common test scenarios.
//!
//! A [`ProjectFixture`] describes a package (or workspace) as a manifest
//! plus source files, and writes it into a fresh temporary directory.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// Fixture for a complete project structure.
#[derive(Debug, Clone)]
pub struct ProjectFixture {
    /// `[package]` name; `None` for raw or virtual manifests
    pub name: Option<String>,
    /// Extra `[package]` keys as `key = value` lines
    pub package_keys: Vec<String>,
    /// Manifest text after the `[package]` section, or the whole text for raw fixtures
    pub tail: String,
    /// Files (path relative to project root -> content)
    pub files: BTreeMap<PathBuf, String>,
    /// Nested member packages (relative path -> fixture)
    pub members: Vec<(PathBuf, ProjectFixture)>,
}

impl ProjectFixture {
    /// A package with a `[package]` section and nothing else.
    pub fn package(name: impl Into<String>) -> Self {
        ProjectFixture {
            name: Some(name.into()),
            package_keys: Vec::new(),
            tail: String::new(),
            files: BTreeMap::new(),
            members: Vec::new(),
        }
    }

    /// A fixture whose manifest is exactly `manifest`.
    pub fn raw(manifest: impl Into<String>) -> Self {
        ProjectFixture {
            name: None,
            package_keys: Vec::new(),
            tail: manifest.into(),
            files: BTreeMap::new(),
            members: Vec::new(),
        }
    }

    /// A virtual workspace listing `members`.
    pub fn workspace(members: &[&str]) -> Self {
        Self::raw(manifests::workspace(members))
    }

    /// Add a `[package]` key; `value` is TOML value text.
    pub fn package_key(mut self, key: &str, value: &str) -> Self {
        self.package_keys.push(format!("{} = {}", key, value));
        self
    }

    /// Append manifest text after the `[package]` section.
    pub fn manifest_tail(mut self, text: impl Into<String>) -> Self {
        let text = text.into();
        if !self.tail.is_empty() && !self.tail.ends_with("\n\n") {
            self.tail.push('\n');
        }
        self.tail.push_str(&text);
        self
    }

    /// Add a file.
    pub fn file(mut self, path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        self.files.insert(path.into(), content.into());
        self
    }

    /// Add a member package under `path`.
    pub fn member(mut self, path: impl Into<PathBuf>, member: ProjectFixture) -> Self {
        self.members.push((path.into(), member));
        self
    }

    /// The manifest text this fixture writes.
    pub fn manifest(&self) -> String {
        let Some(name) = &self.name else {
            return self.tail.clone();
        };

        let mut manifest = format!(
            "[package]\nname = \"{}\"\nversion = \"0.1.0\"\nedition = \"2021\"\n",
            name
        );
        for line in &self.package_keys {
            manifest.push_str(line);
            manifest.push('\n');
        }
        if !self.tail.is_empty() {
            manifest.push('\n');
            manifest.push_str(&self.tail);
        }
        manifest
    }

    /// Write this fixture to a real directory.
    pub fn write_to(&self, path: &Path) -> std::io::Result<()> {
        std::fs::create_dir_all(path)?;
        std::fs::write(path.join("Cargo.toml"), self.manifest())?;

        for (rel_path, content) in &self.files {
            let full_path = path.join(rel_path);
            if let Some(parent) = full_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&full_path, content)?;
        }

        for (rel_path, member) in &self.members {
            member.write_to(&path.join(rel_path))?;
        }

        Ok(())
    }

    /// Write this fixture into a new temporary directory.
    pub fn build(&self) -> Project {
        let dir = TempDir::new().expect("failed to create temp dir");
        self.write_to(dir.path()).expect("failed to write fixture");
        Project { dir }
    }
}

/// A fixture written to disk. Dropping it removes the directory.
#[derive(Debug)]
pub struct Project {
    dir: TempDir,
}

impl Project {
    /// Project (or workspace) root.
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// The root spelled relative to the current directory with a leading
    /// `./`, the way a user passes `--manifest-path ./...`.
    pub fn dotted_root(&self) -> PathBuf {
        let cwd = std::env::current_dir().expect("no current directory");
        let rel = pathdiff::diff_paths(self.root(), &cwd).expect("root not relative to cwd");
        Path::new(".").join(rel)
    }

    /// Absolute path of a project-relative path.
    pub fn path(&self, rel: impl AsRef<Path>) -> PathBuf {
        self.dir.path().join(rel)
    }

    /// Root manifest path.
    pub fn manifest_path(&self) -> PathBuf {
        self.path("Cargo.toml")
    }

    /// Read a project file.
    pub fn read(&self, rel: impl AsRef<Path>) -> String {
        let path = self.path(rel);
        std::fs::read_to_string(&path)
            .unwrap_or_else(|_| panic!("file not found: {}", path.display()))
    }

    /// Root manifest text.
    pub fn manifest(&self) -> String {
        self.read("Cargo.toml")
    }
}

/// Common manifest templates.
pub mod manifests {
    /// A virtual workspace manifest with members.
    pub fn workspace(members: &[&str]) -> String {
        let members_str = members
            .iter()
            .map(|m| format!("\"{}\"", m))
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            r#"[workspace]
members = [{members_str}]
"#
        )
    }

    /// A package manifest with a commented dependency table and two
    /// executables, for edit tests.
    pub fn commented(name: &str) -> String {
        format!(
            r#"# Top-level comment
[package]
name = "{name}"   # trailing
version = "0.1.0"
edition = "2021"

[dependencies]
serde = {{ version = "1.0", features = ["derive"] }}  # keep me
regex = "~1.10"

# Executables
[[bin]]
name = "one"
path = "src/bin/one.rs"

[[bin]]
name = "tool-two"
"#
        )
    }
}

/// Common source snippets.
pub mod sources {
    /// An executable entry point.
    pub fn main() -> &'static str {
        "fn main() {}\n"
    }

    /// A source file that checks a feature flag.
    pub fn gated(flag: &str) -> String {
        format!("#[cfg(feature = \"{}\")]\npub fn gated() {{}}\n", flag)
    }
}
