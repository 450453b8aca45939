//! Test utilities for unit tests.
//!
//! # Example
//!
//! ```rust,ignore
//! use tend::test_support::ProjectFixture;
//!
//! #[test]
//! fn test_example() {
//!     let project = ProjectFixture::package("demo")
//!         .file("src/main.rs", "fn main() {}")
//!         .build();
//!
//!     let units = discover_units(project.root(), None);
//!     // ...
//! }
//! ```

pub mod fixtures;

// Re-export fixtures for convenience
pub use fixtures::*;

/// Assertion helpers for testing.
pub mod assertions {
    use std::path::Path;

    /// Assert that a result is Ok and return the value.
    pub fn assert_ok<T, E: std::fmt::Debug>(result: Result<T, E>) -> T {
        match result {
            Ok(v) => v,
            Err(e) => panic!("expected Ok, got Err: {:?}", e),
        }
    }

    /// Assert that a result is Err and return the error.
    pub fn assert_err<T: std::fmt::Debug, E>(result: Result<T, E>) -> E {
        match result {
            Ok(v) => panic!("expected Err, got Ok: {:?}", v),
            Err(e) => e,
        }
    }

    /// Assert that an error message contains a substring.
    pub fn assert_error_contains<T: std::fmt::Debug>(
        result: Result<T, anyhow::Error>,
        substring: &str,
    ) {
        match result {
            Ok(v) => panic!("expected Err containing '{}', got Ok: {:?}", substring, v),
            Err(e) => {
                let msg = format!("{:#}", e);
                assert!(
                    msg.contains(substring),
                    "error '{}' does not contain '{}'",
                    msg,
                    substring
                );
            }
        }
    }

    /// Assert that a file contains specific content.
    pub fn assert_file_contains(path: impl AsRef<Path>, content: &str) {
        let path = path.as_ref();
        let actual = std::fs::read_to_string(path)
            .unwrap_or_else(|_| panic!("file not found: {}", path.display()));
        assert!(
            actual.contains(content),
            "file {} does not contain '{}'\nactual content:\n{}",
            path.display(),
            content,
            actual
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_package_fixture_manifest() {
        let fixture = ProjectFixture::package("demo")
            .package_key("autobins", "false")
            .manifest_tail("[features]\ndefault = []\n");
        assert_eq!(
            fixture.manifest(),
            "[package]\nname = \"demo\"\nversion = \"0.1.0\"\nedition = \"2021\"\nautobins = false\n\n[features]\ndefault = []\n"
        );
    }

    #[test]
    fn test_workspace_fixture_writes_members() {
        let project = ProjectFixture::workspace(&["crates/*"])
            .member("crates/a", ProjectFixture::package("a").file("src/lib.rs", ""))
            .build();

        assert!(project.path("crates/a/Cargo.toml").is_file());
        assert!(project.path("crates/a/src/lib.rs").is_file());
        assertions::assert_file_contains(project.manifest_path(), "members = [\"crates/*\"]");
    }
}
