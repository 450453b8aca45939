//! End-to-end reconciliation tests for the tend library.
//!
//! Each test builds a member tree on disk, runs discovery, drift detection
//! or an edit through the public API, and checks the result the way a
//! caller would see it.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use tend::core::convention;
use tend::core::target::TargetOrigin;
use tend::editor::{
    insert_declaration, remove_declaration, rewrite_scalar_field, Declaration, Selector,
};
use tend::ops::{
    declare_feature, discover_members, discover_units, find_undeclared_flags,
    find_unregistered_files, pin_dependency, register_unit, PinOptions, RegisterResult,
};
use tend::{DependencyKind, ManifestDocument, TargetKind};

/// Write `files` (path, content) under a fresh temporary directory.
fn project(files: &[(&str, &str)]) -> TempDir {
    let tmp = TempDir::new().unwrap();
    for (path, content) in files {
        let full = tmp.path().join(path);
        fs::create_dir_all(full.parent().unwrap()).unwrap();
        fs::write(full, content).unwrap();
    }
    tmp
}

fn manifest(name: &str, tail: &str) -> String {
    format!(
        "[package]\nname = \"{}\"\nversion = \"0.1.0\"\nedition = \"2021\"\n\n{}",
        name, tail
    )
}

fn parse(text: &str) -> ManifestDocument {
    ManifestDocument::parse(text, Path::new("Cargo.toml")).unwrap()
}

// ============================================================================
// Convention resolution
// ============================================================================

#[test]
fn test_single_file_candidate_wins_and_is_registered() {
    let tmp = project(&[
        (
            "Cargo.toml",
            manifest("app", "[[bin]]\nname = \"tool\"\n").as_str(),
        ),
        ("src/main.rs", "fn main() {}\n"),
        ("src/bin/tool.rs", "fn main() {}\n"),
        ("src/bin/tool/main.rs", "fn main() {}\n"),
    ]);

    assert_eq!(
        convention::resolve(tmp.path(), TargetKind::Bin, "tool", Some("app")),
        PathBuf::from("src/bin/tool.rs")
    );

    let units = discover_units(tmp.path(), None);
    let tool = units.iter().find(|u| u.is(TargetKind::Bin, "tool")).unwrap();
    assert_eq!(tool.path, PathBuf::from("src/bin/tool.rs"));
    assert_eq!(tool.origin, TargetOrigin::Declared);

    let unregistered = find_unregistered_files(tmp.path(), None);
    assert!(
        unregistered
            .iter()
            .all(|item| item.path != Path::new("src/bin/tool.rs")),
        "declared unit reported as drift: {:?}",
        unregistered
    );
}

#[test]
fn test_hyphen_and_underscore_name_the_same_unit() {
    let tmp = project(&[
        (
            "Cargo.toml",
            manifest("app", "[[bin]]\nname = \"tool-two\"\n").as_str(),
        ),
        ("src/main.rs", "fn main() {}\n"),
        ("src/bin/tool_two.rs", "fn main() {}\n"),
    ]);

    let units = discover_units(tmp.path(), None);
    let bins: Vec<_> = units.iter().filter(|u| u.kind == TargetKind::Bin).collect();
    assert_eq!(bins.len(), 2, "unexpected bins: {:?}", bins);

    let tool = bins.iter().find(|u| u.name == "tool-two").unwrap();
    assert_eq!(tool.path, PathBuf::from("src/bin/tool_two.rs"));
    assert!(!tool.is_auto_discovered());

    assert!(find_unregistered_files(tmp.path(), None).is_empty());
}

// ============================================================================
// Text-region editing
// ============================================================================

#[test]
fn test_insert_bin_then_test_into_bare_manifest() {
    let original = "\
# Top comment
[package]
name = \"app\"   # the name
version = \"0.1.0\"

# Dependencies follow
[dependencies]
serde = \"1.0\"
";

    let bin = Declaration::new(TargetKind::Bin, "tool").with_path("src/bin/tool.rs");
    let test = Declaration::new(TargetKind::Test, "smoke").with_path("tests/smoke.rs");

    let text = insert_declaration(original, &bin.render(), TargetKind::Bin);
    let text = insert_declaration(&text, &test.render(), TargetKind::Test);

    let doc = parse(&text);
    let bins = doc.targets(TargetKind::Bin);
    let tests = doc.targets(TargetKind::Test);
    assert_eq!(bins.len(), 1);
    assert_eq!(tests.len(), 1);
    assert_eq!(bins[0].name.as_deref(), Some("tool"));
    assert_eq!(bins[0].path, Some(PathBuf::from("src/bin/tool.rs")));
    assert_eq!(tests[0].name.as_deref(), Some("smoke"));
    assert_eq!(tests[0].path, Some(PathBuf::from("tests/smoke.rs")));

    // With no test or bench blocks yet, both land after the dependencies,
    // so the later insertion sits closer to them.
    let deps_at = text.find("[dependencies]").unwrap();
    let bin_at = text.find("[[bin]]").unwrap();
    let test_at = text.find("[[test]]").unwrap();
    assert!(deps_at < test_at && test_at < bin_at);

    for comment in ["# Top comment", "name = \"app\"   # the name", "# Dependencies follow"] {
        assert!(text.contains(comment), "lost `{}` in:\n{}", comment, text);
    }
    assert!(text.starts_with("# Top comment\n[package]\n"));
}

#[test]
fn test_remove_declaration_leaves_siblings() {
    let original = manifest(
        "app",
        "[[bin]]\nname = \"one\"\n\n# keep this\n[[bin]]\nname = \"two\"\n",
    );

    let text = remove_declaration(&original, TargetKind::Bin, "one");
    let doc = parse(&text);
    let names: Vec<_> = doc
        .targets(TargetKind::Bin)
        .into_iter()
        .filter_map(|d| d.name)
        .collect();
    assert_eq!(names, vec!["two".to_string()]);
    assert!(text.contains("# keep this"));

    assert_eq!(remove_declaration(&original, TargetKind::Bin, "three"), original);
}

#[test]
fn test_rewrite_scalar_field_is_idempotent() {
    let original = manifest(
        "app",
        "[dependencies]\nserde = { version = \"1.0\", features = [\"derive\"] } # pinned\nregex = \"1.10\"\n",
    );
    let selector = Selector::dependency_version(DependencyKind::Normal, "serde");

    let once = rewrite_scalar_field(&original, &selector, "1.0.210").unwrap();
    let twice = rewrite_scalar_field(&once, &selector, "1.0.210").unwrap();
    assert_eq!(once, twice);
    assert!(once.contains("# pinned"));

    let doc = parse(&once);
    let serde = doc
        .dependencies(DependencyKind::Normal)
        .into_iter()
        .find(|d| d.name == "serde")
        .unwrap();
    assert_eq!(serde.version.as_deref(), Some("1.0.210"));
    assert_eq!(serde.features, vec!["derive".to_string()]);
}

#[test]
fn test_rewrite_missing_field_fails() {
    let original = manifest("app", "[dependencies]\nserde = \"1.0\"\n");
    let selector = Selector::dependency_version(DependencyKind::Normal, "tokio");
    assert!(rewrite_scalar_field(&original, &selector, "1.40").is_err());
}

// ============================================================================
// Feature flags
// ============================================================================

#[test]
fn test_undeclared_flag_disappears_once_declared() {
    let tmp = project(&[
        ("Cargo.toml", manifest("app", "[features]\ndefault = []\n").as_str()),
        (
            "src/lib.rs",
            "#[cfg(feature = \"fast-io\")]\npub fn fast() {}\n\n#[cfg(feature = \"x\")]\npub fn x() {}\n",
        ),
    ]);

    assert_eq!(
        find_undeclared_flags(tmp.path(), None),
        vec!["fast-io".to_string(), "x".to_string()]
    );

    let manifest_path = tmp.path().join("Cargo.toml");
    declare_feature(&manifest_path, "x", false).unwrap();
    declare_feature(&manifest_path, "fast_io", false).unwrap();

    assert!(find_undeclared_flags(tmp.path(), None).is_empty());

    let text = fs::read_to_string(&manifest_path).unwrap();
    assert!(text.contains("default = []"));
    assert!(text.contains("x = []"));
    assert!(text.contains("fast_io = []"));
}

// ============================================================================
// Workspaces and drift
// ============================================================================

#[test]
fn test_glob_members_require_a_manifest() {
    let tmp = project(&[
        ("Cargo.toml", "[workspace]\nmembers = [\"crates/*\"]\n"),
        ("crates/a/Cargo.toml", manifest("a", "").as_str()),
        ("crates/a/src/lib.rs", ""),
        ("crates/scratch/notes.txt", "not a package\n"),
    ]);

    let members = discover_members(tmp.path());
    assert_eq!(members.len(), 1, "members: {:?}", members);
    assert_eq!(members[0].name, "a");
    assert_eq!(members[0].relative_path, PathBuf::from("crates/a"));
    assert!(!members[0].is_root);
}

#[test]
fn test_undeclared_example_is_reported_with_kind() {
    let tmp = project(&[
        ("Cargo.toml", manifest("app", "").as_str()),
        ("src/lib.rs", "pub mod util;\n"),
        ("src/util.rs", "pub fn helper() {}\n"),
        ("examples/demo.rs", "fn main() {}\n"),
    ]);

    let unregistered = find_unregistered_files(tmp.path(), None);
    assert_eq!(unregistered.len(), 1, "unregistered: {:?}", unregistered);
    assert_eq!(unregistered[0].name, "demo");
    assert_eq!(unregistered[0].path, PathBuf::from("examples/demo.rs"));
    assert_eq!(unregistered[0].kind, Some(TargetKind::Example));
}

#[test]
fn test_register_clears_drift_and_preserves_text() {
    let original = manifest("app", "# units below\n");
    let tmp = project(&[
        ("Cargo.toml", original.as_str()),
        ("src/main.rs", "fn main() {}\n"),
        ("examples/demo.rs", "fn main() {}\n"),
    ]);
    let manifest_path = tmp.path().join("Cargo.toml");

    let declaration =
        Declaration::new(TargetKind::Example, "demo").with_path("examples/demo.rs");
    let result = register_unit(&manifest_path, &declaration, false).unwrap();
    assert!(matches!(result, RegisterResult::Registered(ref r) if r.written));

    let text = fs::read_to_string(&manifest_path).unwrap();
    assert!(text.starts_with("[package]\nname = \"app\"\n"));
    assert!(text.contains("# units below"));
    assert!(text.contains("[[example]]\nname = \"demo\"\npath = \"examples/demo.rs\"\n"));
    assert!(find_unregistered_files(tmp.path(), None).is_empty());

    let again = register_unit(&manifest_path, &declaration, false).unwrap();
    assert_eq!(again, RegisterResult::AlreadyDeclared);
    assert_eq!(fs::read_to_string(&manifest_path).unwrap(), text);
}

#[test]
fn test_pin_keeps_operator_and_writes_once() {
    let tmp = project(&[(
        "Cargo.toml",
        manifest("app", "[dependencies]\nregex = \"~1.10\" # tilde\n").as_str(),
    )]);
    let manifest_path = tmp.path().join("Cargo.toml");

    let opts = PinOptions {
        kind: DependencyKind::Normal,
        name: "regex".to_string(),
        version: "1.11".to_string(),
        dry_run: false,
    };
    let result = pin_dependency(&manifest_path, &opts).unwrap();
    assert!(result.written);

    let text = fs::read_to_string(&manifest_path).unwrap();
    assert!(text.contains("regex = \"~1.11\" # tilde"), "got:\n{}", text);

    let result = pin_dependency(&manifest_path, &opts).unwrap();
    assert!(!result.changed);
    assert!(!result.written);
}

#[test]
fn test_broken_manifest_degrades_to_empty_results() {
    let tmp = project(&[
        ("Cargo.toml", "[package\nname = \"app\"\n"),
        ("src/main.rs", "fn main() {}\n"),
        ("examples/demo.rs", "fn main() {}\n"),
    ]);

    assert!(discover_units(tmp.path(), None).is_empty());
    assert!(find_unregistered_files(tmp.path(), None).is_empty());
    assert!(find_undeclared_flags(tmp.path(), None).is_empty());
}
