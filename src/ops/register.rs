//! Implementation of `tend register`, `tend unregister`, `tend pin` and
//! feature declaration.
//!
//! Every operation reads the whole manifest, computes new text with the
//! [`editor`](crate::editor), re-parses the result and compares it with
//! the original as plain TOML. Only when the edit changed exactly the keys
//! it meant to is the file replaced, in a single atomic write.

use std::path::Path;

use anyhow::{bail, Context, Result};
use semver::VersionReq;

use crate::core::dependency::{requirement_operator, DependencyKind};
use crate::core::errors::ManifestError;
use crate::core::feature::is_declared;
use crate::core::manifest::ManifestDocument;
use crate::core::target::{names_equivalent, TargetKind};
use crate::editor::{
    insert_declaration, insert_table_entry, remove_declaration, rewrite_scalar_field, Declaration,
    EditError, Selector,
};
use crate::util::fs;

/// What an edit did to the manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditResult {
    /// The manifest text after the edit
    pub text: String,

    /// Whether the text differs from the original
    pub changed: bool,

    /// Whether the file was replaced (false for dry runs and no-ops)
    pub written: bool,
}

/// Outcome of registering a unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegisterResult {
    Registered(EditResult),
    /// A unit of the same kind and name is already declared
    AlreadyDeclared,
}

/// Options for registering units.
#[derive(Debug, Clone)]
pub struct RegisterOptions {
    pub declarations: Vec<Declaration>,

    /// Compute and verify the edit without writing
    pub dry_run: bool,
}

/// Options for pinning a dependency version.
#[derive(Debug, Clone)]
pub struct PinOptions {
    pub kind: DependencyKind,
    pub name: String,

    /// New requirement; inherits the current operator when it has none
    pub version: String,

    pub dry_run: bool,
}

/// Declare a single unit in the manifest.
pub fn register_unit(
    manifest_path: &Path,
    declaration: &Declaration,
    dry_run: bool,
) -> Result<RegisterResult> {
    let opts = RegisterOptions {
        declarations: vec![declaration.clone()],
        dry_run,
    };
    register_units(manifest_path, &opts)
}

/// Declare units in the manifest.
///
/// Declarations whose `(kind, name)` is already declared are skipped; when
/// all of them are, the result is [`RegisterResult::AlreadyDeclared`].
pub fn register_units(manifest_path: &Path, opts: &RegisterOptions) -> Result<RegisterResult> {
    let doc = load(manifest_path)?;
    let mut text = doc.text().to_string();
    let mut allowed = Vec::new();
    let mut pending = Vec::new();

    for declaration in &opts.declarations {
        if declaration.name.trim().is_empty() {
            bail!("a {} needs a name", declaration.kind.description());
        }
        if is_unit_declared(&doc, declaration.kind, &declaration.name)
            || pending.iter().any(|(k, n): &(TargetKind, String)| {
                *k == declaration.kind && names_equivalent(n, &declaration.name)
            })
        {
            tracing::debug!(
                "{} `{}` is already declared",
                declaration.kind.description(),
                declaration.name
            );
            continue;
        }

        text = insert_declaration(&text, &declaration.render(), declaration.kind);
        allowed.push(declaration.kind.table_key().to_string());
        pending.push((declaration.kind, declaration.name.clone()));
    }

    if pending.is_empty() {
        return Ok(RegisterResult::AlreadyDeclared);
    }

    let edited = verify(&doc, &text, &allowed)?;
    for (kind, name) in &pending {
        if !is_unit_declared(&edited, *kind, name) {
            return Err(mismatch(
                &doc,
                format!("`{}` {} is missing after the edit", name, kind),
                "",
            )
            .into());
        }
    }

    finish(manifest_path, &doc, text, opts.dry_run).map(RegisterResult::Registered)
}

/// Remove a unit declaration. Removing an undeclared unit changes nothing.
pub fn unregister_unit(
    manifest_path: &Path,
    kind: TargetKind,
    name: &str,
    dry_run: bool,
) -> Result<EditResult> {
    let doc = load(manifest_path)?;
    let text = remove_declaration(doc.text(), kind, name);
    verify(&doc, &text, &[kind.table_key().to_string()])?;
    finish(manifest_path, &doc, text, dry_run)
}

/// Rewrite the version requirement of a dependency in place.
pub fn pin_dependency(manifest_path: &Path, opts: &PinOptions) -> Result<EditResult> {
    let doc = load(manifest_path)?;

    let Some(current) = doc
        .dependencies(opts.kind)
        .into_iter()
        .find(|d| d.name == opts.name)
    else {
        return Err(EditError::FieldNotFound {
            selector: format!("{}.{}", opts.kind.table_path().join("."), opts.name),
        }
        .into());
    };

    let version = opts.version.trim();
    let version = if requirement_operator(version).is_empty() {
        format!("{}{}", current.requirement_operator(), version)
    } else {
        version.to_string()
    };
    VersionReq::parse(&version)
        .with_context(|| format!("`{}` is not a valid version requirement", version))?;

    let selector = Selector::dependency_version(opts.kind, &opts.name);
    let text = rewrite_scalar_field(doc.text(), &selector, &version)?;

    let mut key: Vec<&str> = opts.kind.table_path().to_vec();
    key.push(&opts.name);
    verify(&doc, &text, &[key_path(&key)])?;

    finish(manifest_path, &doc, text, opts.dry_run)
}

/// Add `name = []` to `[features]`, creating the table when needed.
/// Declaring an existing flag (`-`/`_` alike) changes nothing.
pub fn declare_feature(manifest_path: &Path, name: &str, dry_run: bool) -> Result<EditResult> {
    let doc = load(manifest_path)?;
    if name.trim().is_empty() {
        bail!("a feature needs a name");
    }

    let declared: Vec<String> = doc.features().into_iter().map(|f| f.name).collect();
    if is_declared(name, &declared) {
        tracing::debug!("feature `{}` is already declared", name);
        return finish(manifest_path, &doc, doc.text().to_string(), dry_run);
    }

    let text = insert_table_entry(doc.text(), &["features"], name, "[]");
    verify(
        &doc,
        &text,
        &["features".to_string(), key_path(&["features", name])],
    )?;
    finish(manifest_path, &doc, text, dry_run)
}

fn load(manifest_path: &Path) -> Result<ManifestDocument> {
    ManifestDocument::load(manifest_path)
        .with_context(|| format!("failed to load {}", manifest_path.display()))
}

fn is_unit_declared(doc: &ManifestDocument, kind: TargetKind, name: &str) -> bool {
    if !kind.is_array() {
        return doc.lib().is_some();
    }
    doc.targets(kind)
        .iter()
        .filter_map(|d| d.effective_name())
        .any(|n| names_equivalent(&n, name))
}

/// Dotted key path at the depth [`ManifestDocument::semantic_changes`] reports.
fn key_path(parts: &[&str]) -> String {
    parts.iter().take(2).copied().collect::<Vec<_>>().join(".")
}

/// Re-parse edited text and check it only differs from `doc` under `allowed`.
fn verify(doc: &ManifestDocument, text: &str, allowed: &[String]) -> Result<ManifestDocument, EditError> {
    let edited = doc.reparse(text).map_err(|e| {
        let snippet = match &e {
            ManifestError::Parse { snippet, .. } => snippet.clone(),
            _ => String::new(),
        };
        mismatch(doc, format!("edited manifest no longer parses: {}", e), &snippet)
    })?;

    let stray: Vec<String> = doc
        .semantic_changes(&edited)
        .into_iter()
        .filter(|change| !allowed.iter().any(|a| a == change))
        .collect();
    if !stray.is_empty() {
        return Err(mismatch(
            doc,
            format!("the edit would also change {}", stray.join(", ")),
            "",
        ));
    }

    Ok(edited)
}

fn mismatch(doc: &ManifestDocument, reason: String, snippet: &str) -> EditError {
    EditError::StructuralMismatch {
        path: doc.path().to_path_buf(),
        reason,
        snippet: snippet.to_string(),
    }
}

fn finish(manifest_path: &Path, doc: &ManifestDocument, text: String, dry_run: bool) -> Result<EditResult> {
    let changed = text != doc.text();
    let written = changed && !dry_run;
    if written {
        fs::write_atomic(manifest_path, &text)?;
        tracing::debug!("wrote {}", manifest_path.display());
    }
    Ok(EditResult {
        text,
        changed,
        written,
    })
}
