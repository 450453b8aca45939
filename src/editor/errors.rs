//! Manifest edit errors.

use std::path::PathBuf;

use miette::Diagnostic as MietteDiagnostic;
use thiserror::Error;

use crate::util::diagnostic::{suggestions, Diagnostic};

/// Error while editing manifest text.
#[derive(Debug, Error, MietteDiagnostic)]
pub enum EditError {
    /// No anchor exists for a new block. The insertion functions recover
    /// by appending at the end of the file.
    #[error("no anchor found for a new `{kind}` block")]
    #[diagnostic(code(tend::edit::ambiguous_insertion))]
    AmbiguousInsertion { kind: String },

    #[error("could not find `{selector}` in the manifest")]
    #[diagnostic(code(tend::edit::field_not_found))]
    FieldNotFound { selector: String },

    /// The edited text no longer parses, or changed more than the edit meant to.
    #[error("edit of `{}` rejected: {reason}", path.display())]
    #[diagnostic(code(tend::edit::structural_mismatch))]
    StructuralMismatch {
        path: PathBuf,
        reason: String,
        snippet: String,
    },
}

impl EditError {
    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            EditError::AmbiguousInsertion { kind } => {
                Diagnostic::warning(format!("no place found for a new `{}` block", kind))
                    .with_context("the block was appended at the end of the file")
            }
            EditError::FieldNotFound { selector } => {
                Diagnostic::error(format!("`{}` is not declared in the manifest", selector))
                    .with_suggestion(suggestions::DEPENDENCY_NOT_FOUND)
            }
            EditError::StructuralMismatch {
                path,
                reason,
                snippet,
            } => {
                let mut diag = Diagnostic::error(format!("refusing to write an edit: {}", reason))
                    .with_location(path.clone());
                if !snippet.is_empty() {
                    diag = diag.with_context(format!("near `{}`", snippet.trim()));
                }
                diag.with_suggestion(suggestions::EDIT_REJECTED)
            }
        }
    }
}
