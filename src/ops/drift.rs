//! Drift detection.
//!
//! Compares what a member's manifest declares with what its source tree
//! holds:
//!
//! - source files no unit, module chain or include claims
//! - `feature = "..."` guards naming flags the manifest never declares
//! - declared units whose file sits in another kind's directory
//!
//! Like discovery, nothing here fails: unreadable files and manifests are
//! logged and the affected member reports nothing.

use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::core::convention::{self, kind_for_path, normalize, unit_name_for_path};
use crate::core::feature::is_declared;
use crate::core::manifest::{BuildScript, ManifestDocument, PackageIdentity};
use crate::core::target::{Target, TargetKind};
use crate::core::workspace::discover_members;
use crate::ops::discover::{flags_from_manifest, load_member, member_dir, units_from_manifest};
use crate::ops::module_graph::ModuleGraph;
use crate::util::config::{Config, DEFAULT_SKIP_DIRS};
use crate::util::fs::walk_source_files;

/// Member directories holding unit sources.
pub const SCAN_DIRS: [&str; 4] = ["src", "examples", "tests", "benches"];

/// Default build script path.
pub const DEFAULT_BUILD_SCRIPT: &str = "build.rs";

static FEATURE_GUARD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:^|[^A-Za-z0-9_])feature\s*=\s*"([^"]+)""#).expect("valid regex")
});

/// Walk settings for drift detection.
#[derive(Debug, Clone)]
pub struct DriftOptions {
    /// Directory names never entered
    pub skip_dirs: Vec<String>,

    pub follow_links: bool,

    /// Member-relative glob patterns never reported as unregistered
    pub ignore: Vec<String>,
}

impl Default for DriftOptions {
    fn default() -> Self {
        DriftOptions {
            skip_dirs: DEFAULT_SKIP_DIRS.iter().map(|s| s.to_string()).collect(),
            follow_links: false,
            ignore: Vec::new(),
        }
    }
}

impl DriftOptions {
    pub fn from_config(config: &Config) -> Self {
        DriftOptions {
            skip_dirs: config.scan.skip_dirs(),
            follow_links: config.scan.follow_links(),
            ignore: config.drift.ignore.clone(),
        }
    }
}

/// A source file no unit accounts for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnregisteredItem {
    /// Unit name it would get if registered (file stem otherwise)
    pub name: String,

    /// Member-relative path
    pub path: PathBuf,

    /// Kind whose directory holds the file, if any
    pub kind: Option<TargetKind>,
}

/// One `feature = "<name>"` occurrence in source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlagReference {
    pub name: String,

    /// Member-relative path
    pub file: PathBuf,

    /// 1-based line number
    pub line: usize,
}

/// A declared unit filed under another kind's directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocationMismatch {
    pub name: String,
    pub kind: TargetKind,
    pub path: PathBuf,

    /// Kind whose conventional directory holds the file
    pub found_in: TargetKind,
}

/// Everything drift detection reports for one member.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DriftReport {
    pub unregistered: Vec<UnregisteredItem>,
    pub undeclared_flags: Vec<String>,
    pub location_mismatches: Vec<LocationMismatch>,
}

impl DriftReport {
    pub fn is_clean(&self) -> bool {
        self.unregistered.is_empty()
            && self.undeclared_flags.is_empty()
            && self.location_mismatches.is_empty()
    }

    /// Number of findings.
    pub fn len(&self) -> usize {
        self.unregistered.len() + self.undeclared_flags.len() + self.location_mismatches.len()
    }
}

/// Source files of a member that no unit, module chain or include claims.
pub fn find_unregistered_files(root: &Path, member: Option<&Path>) -> Vec<UnregisteredItem> {
    find_unregistered_files_with(root, member, &DriftOptions::default())
}

/// [`find_unregistered_files`] with explicit walk settings.
pub fn find_unregistered_files_with(
    root: &Path,
    member: Option<&Path>,
    opts: &DriftOptions,
) -> Vec<UnregisteredItem> {
    match load_member(root, member) {
        Some(doc) => unregistered_in(root, &doc, opts),
        None => Vec::new(),
    }
}

fn unregistered_in(root: &Path, doc: &ManifestDocument, opts: &DriftOptions) -> Vec<UnregisteredItem> {
    let Some(package) = doc.package() else {
        return Vec::new();
    };
    let dir = doc.dir();
    let units = units_from_manifest(doc);

    // Paths registered units stand for, in every spelling convention allows.
    let mut claimed: HashSet<PathBuf> = HashSet::new();
    for unit in units.iter().filter(|u| !u.is_auto_discovered()) {
        claimed.insert(normalize(&unit.path));
        if unit.declared_path.is_none() {
            claimed.extend(convention::candidates(unit.kind, &unit.name, Some(&package.name)));
        }
    }
    let build_script = build_script(&package, dir);
    claimed.extend(build_script.clone());

    let discovered: HashSet<PathBuf> = units
        .iter()
        .filter(|u| u.is_auto_discovered())
        .map(|u| normalize(&u.path))
        .collect();
    let mut roots: Vec<PathBuf> = units.iter().map(|u| normalize(&u.path)).collect();
    roots.extend(build_script);
    let graph = ModuleGraph::build(dir, &roots);

    let ignore = ignore_patterns(&opts.ignore);
    let skip_paths = other_member_dirs(root, dir);

    let mut items = Vec::new();
    for scan_dir in SCAN_DIRS {
        let files = walk_source_files(
            dir,
            &dir.join(scan_dir),
            &opts.skip_dirs,
            &skip_paths,
            opts.follow_links,
        );
        for file in files {
            if claimed.contains(&file) {
                continue;
            }
            // A discovered unit's own file is drift; its modules are not.
            if graph.contains(&file) && (!discovered.contains(&file) || graph.is_included(&file)) {
                continue;
            }
            if ignore.iter().any(|p| p.matches_path(&file)) {
                tracing::debug!("{} ignored by configuration", file.display());
                continue;
            }

            let kind = kind_for_path(&file);
            let name = kind
                .and_then(|k| unit_name_for_path(k, &file))
                .or_else(|| file.file_stem().map(|s| s.to_string_lossy().into_owned()))
                .unwrap_or_default();
            items.push(UnregisteredItem { name, path: file, kind });
        }
    }

    items
}

/// The member's build script, if it has one on disk.
fn build_script(package: &PackageIdentity, dir: &Path) -> Option<PathBuf> {
    let path = match &package.build {
        BuildScript::Disabled => return None,
        BuildScript::Path(path) => normalize(path),
        BuildScript::Default => PathBuf::from(DEFAULT_BUILD_SCRIPT),
    };
    dir.join(&path).is_file().then_some(path)
}

fn ignore_patterns(patterns: &[String]) -> Vec<glob::Pattern> {
    patterns
        .iter()
        .filter_map(|p| match glob::Pattern::new(p) {
            Ok(pattern) => Some(pattern),
            Err(e) => {
                tracing::warn!("invalid ignore pattern `{}`: {}", p, e);
                None
            }
        })
        .collect()
}

/// Directories of other workspace members nested inside `dir`.
fn other_member_dirs(root: &Path, dir: &Path) -> Vec<PathBuf> {
    let dir = normalize(dir);
    discover_members(root)
        .iter()
        .map(|m| normalize(&root.join(&m.relative_path)))
        .filter(|m| *m != dir && m.starts_with(&dir))
        .collect()
}

/// Every `feature = "<name>"` occurrence in the member's sources.
pub fn find_flag_references(root: &Path, member: Option<&Path>) -> Vec<FlagReference> {
    find_flag_references_with(root, member, &DriftOptions::default())
}

/// [`find_flag_references`] with explicit walk settings.
pub fn find_flag_references_with(
    root: &Path,
    member: Option<&Path>,
    opts: &DriftOptions,
) -> Vec<FlagReference> {
    flag_references_in(root, &member_dir(root, member), opts)
}

fn flag_references_in(root: &Path, dir: &Path, opts: &DriftOptions) -> Vec<FlagReference> {
    let skip_paths = other_member_dirs(root, dir);
    let mut refs = Vec::new();

    for scan_dir in SCAN_DIRS {
        let files = walk_source_files(
            dir,
            &dir.join(scan_dir),
            &opts.skip_dirs,
            &skip_paths,
            opts.follow_links,
        );
        for file in files {
            let text = match std::fs::read_to_string(dir.join(&file)) {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!("skipping unreadable {}: {}", file.display(), e);
                    continue;
                }
            };
            for (index, line) in text.lines().enumerate() {
                for caps in FEATURE_GUARD.captures_iter(line) {
                    refs.push(FlagReference {
                        name: caps[1].to_string(),
                        file: file.clone(),
                        line: index + 1,
                    });
                }
            }
        }
    }

    refs
}

/// Flags referenced in source but not declared, sorted and deduplicated.
///
/// Every textual guard counts, including ones in code that is never
/// compiled.
pub fn find_undeclared_flags(root: &Path, member: Option<&Path>) -> Vec<String> {
    find_undeclared_flags_with(root, member, &DriftOptions::default())
}

/// [`find_undeclared_flags`] with explicit walk settings.
pub fn find_undeclared_flags_with(
    root: &Path,
    member: Option<&Path>,
    opts: &DriftOptions,
) -> Vec<String> {
    match load_member(root, member) {
        Some(doc) => undeclared_in(root, &doc, opts),
        None => Vec::new(),
    }
}

fn undeclared_in(root: &Path, doc: &ManifestDocument, opts: &DriftOptions) -> Vec<String> {
    if doc.package().is_none() {
        return Vec::new();
    }
    let declared = flags_from_manifest(doc);
    flag_references_in(root, doc.dir(), opts)
        .into_iter()
        .map(|r| r.name)
        .filter(|name| !is_declared(name, &declared))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Declared units whose file lives in another kind's conventional directory.
pub fn find_location_mismatches(root: &Path, member: Option<&Path>) -> Vec<LocationMismatch> {
    match load_member(root, member) {
        Some(doc) => mismatches_in(&units_from_manifest(&doc)),
        None => Vec::new(),
    }
}

fn mismatches_in(units: &[Target]) -> Vec<LocationMismatch> {
    units
        .iter()
        .filter(|u| !u.is_auto_discovered())
        .filter_map(|u| {
            convention::location_mismatch(u).map(|found_in| LocationMismatch {
                name: u.name.clone(),
                kind: u.kind,
                path: u.path.clone(),
                found_in,
            })
        })
        .collect()
}

/// Full drift report for a member, reading the manifest once.
pub fn check(root: &Path, member: Option<&Path>, opts: &DriftOptions) -> DriftReport {
    let Some(doc) = load_member(root, member) else {
        return DriftReport::default();
    };

    DriftReport {
        unregistered: unregistered_in(root, &doc, opts),
        undeclared_flags: undeclared_in(root, &doc, opts),
        location_mismatches: mismatches_in(&units_from_manifest(&doc)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{sources, ProjectFixture};

    fn unregistered_paths(root: &Path, member: Option<&Path>) -> Vec<PathBuf> {
        find_unregistered_files(root, member)
            .into_iter()
            .map(|i| i.path)
            .collect()
    }

    #[test]
    fn test_conventional_paths_are_registered() {
        let project = ProjectFixture::package("demo")
            .manifest_tail("[[bin]]\nname = \"tool-two\"\n\n[[example]]\nname = \"basic\"\n")
            .file("src/main.rs", "mod cli;\n")
            .file("src/cli.rs", "")
            .file("src/bin/tool_two.rs", sources::main())
            .file("examples/basic/main.rs", sources::main())
            .build();

        assert!(find_unregistered_files(project.root(), None).is_empty());
    }

    #[test]
    fn test_undeclared_example_is_reported() {
        let project = ProjectFixture::package("demo")
            .file("src/lib.rs", "")
            .file("examples/demo.rs", sources::main())
            .build();

        let items = find_unregistered_files(project.root(), None);
        assert_eq!(
            items,
            vec![UnregisteredItem {
                name: "demo".into(),
                path: PathBuf::from("examples/demo.rs"),
                kind: Some(TargetKind::Example),
            }]
        );
    }

    #[test]
    fn test_orphan_module_and_includes() {
        let project = ProjectFixture::package("demo")
            .file("src/lib.rs", "mod used;\ninclude!(\"generated.rs\");\n")
            .file("src/used.rs", "")
            .file("src/generated.rs", "")
            .file("src/orphan.rs", "")
            .file("target/debug/build/out.rs", "")
            .build();

        let items = find_unregistered_files(project.root(), None);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].path, PathBuf::from("src/orphan.rs"));
        assert_eq!(items[0].name, "orphan");
        assert_eq!(items[0].kind, None);
    }

    #[test]
    fn test_discovered_unit_modules_not_reported() {
        let project = ProjectFixture::package("demo")
            .file("examples/multi/main.rs", "mod helper;\n")
            .file("examples/multi/helper.rs", "")
            .build();

        assert_eq!(
            unregistered_paths(project.root(), None),
            vec![PathBuf::from("examples/multi/main.rs")]
        );
    }

    #[test]
    fn test_build_script_is_a_root() {
        let project = ProjectFixture::package("demo")
            .package_key("build", "\"src/build/main.rs\"")
            .file("src/lib.rs", "")
            .file("src/build/main.rs", "mod probe;\n")
            .file("src/build/probe.rs", "")
            .build();

        assert!(find_unregistered_files(project.root(), None).is_empty());
    }

    #[test]
    fn test_ignore_patterns_and_skip_dirs() {
        let project = ProjectFixture::package("demo")
            .file("src/lib.rs", "")
            .file("src/scratch_one.rs", "")
            .file("src/vendored/lib.rs", "")
            .file("src/keep.rs", "")
            .build();

        let opts = DriftOptions {
            skip_dirs: vec!["vendored".into()],
            follow_links: false,
            ignore: vec!["src/scratch*.rs".into()],
        };
        let items = find_unregistered_files_with(project.root(), None, &opts);
        let paths: Vec<_> = items.iter().map(|i| i.path.clone()).collect();
        assert_eq!(paths, vec![PathBuf::from("src/keep.rs")]);
    }

    #[test]
    fn test_other_members_are_skipped() {
        let project = ProjectFixture::package("root")
            .manifest_tail("[workspace]\nmembers = [\"src/inner\"]\n")
            .file("src/lib.rs", "")
            .member("src/inner", ProjectFixture::package("inner").file("src/lib.rs", ""))
            .build();

        assert!(find_unregistered_files(project.root(), None).is_empty());
        assert!(find_unregistered_files(project.root(), Some(Path::new("src/inner"))).is_empty());
    }

    #[test]
    fn test_other_members_are_skipped_from_relative_root() {
        let project = ProjectFixture::package("root")
            .manifest_tail("[workspace]\nmembers = [\"src/inner\"]\n")
            .file("src/lib.rs", "")
            .member(
                "src/inner",
                ProjectFixture::package("inner").file("src/lib.rs", &sources::gated("zz")),
            )
            .build();

        let root = project.dotted_root();
        assert!(root.starts_with("."));
        assert!(find_unregistered_files(&root, None).is_empty());
        assert!(find_undeclared_flags(&root, None).is_empty());
    }

    #[test]
    fn test_undeclared_flags() {
        let project = ProjectFixture::package("demo")
            .manifest_tail("[features]\nfast_path = []\n")
            .file("src/lib.rs", "#[cfg(feature = \"fast-path\")]\nmod fast;\n#[cfg(all(feature=\"gpu\", feature = \"simd\"))]\nfn x() {}\n")
            .file("tests/it.rs", &sources::gated("gpu"))
            .build();

        assert_eq!(find_undeclared_flags(project.root(), None), vec!["gpu", "simd"]);

        let refs = find_flag_references(project.root(), None);
        assert_eq!(refs.len(), 4);
        assert_eq!(refs[0].file, PathBuf::from("src/lib.rs"));
        assert_eq!(refs[0].line, 1);
        assert_eq!(refs[3].file, PathBuf::from("tests/it.rs"));
    }

    #[test]
    fn test_target_feature_is_not_a_flag() {
        let project = ProjectFixture::package("demo")
            .file(
                "src/lib.rs",
                "#[cfg(target_feature = \"avx2\")]\nfn wide() {}\n#[cfg(feature = \"simd\")]\nfn simd() {}\n",
            )
            .build();

        let refs = find_flag_references(project.root(), None);
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].name, "simd");
        assert_eq!(refs[0].line, 3);
        assert_eq!(find_undeclared_flags(project.root(), None), vec!["simd"]);
    }

    #[test]
    fn test_location_mismatch() {
        let project = ProjectFixture::package("demo")
            .manifest_tail("[[bin]]\nname = \"demo-tool\"\npath = \"examples/demo_tool.rs\"\n")
            .file("examples/demo_tool.rs", sources::main())
            .build();

        let mismatches = find_location_mismatches(project.root(), None);
        assert_eq!(mismatches.len(), 1);
        assert_eq!(mismatches[0].kind, TargetKind::Bin);
        assert_eq!(mismatches[0].found_in, TargetKind::Example);
        assert!(find_unregistered_files(project.root(), None).is_empty());
    }

    #[test]
    fn test_check_degrades_on_broken_manifest() {
        let project = ProjectFixture::raw("[package]\nname = 1 2\n")
            .file("src/orphan.rs", "#[cfg(feature = \"x\")]\nfn f() {}\n")
            .build();

        let report = check(project.root(), None, &DriftOptions::default());
        assert!(report.is_clean());
        assert_eq!(report.len(), 0);
    }
}
