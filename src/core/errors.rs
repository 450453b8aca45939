//! Manifest error types and diagnostics.

use std::path::PathBuf;

use miette::{Diagnostic as MietteDiagnostic, NamedSource, SourceSpan};
use thiserror::Error;

use crate::util::diagnostic::{suggestions, Diagnostic};

/// Error while loading or parsing a manifest.
///
/// Discovery absorbs these (the member is treated as absent); only the
/// mutation ops surface them.
#[derive(Debug, Error, MietteDiagnostic)]
pub enum ManifestError {
    #[error("failed to parse manifest `{}`: {message}", path.display())]
    #[diagnostic(code(tend::manifest::parse))]
    Parse {
        path: PathBuf,
        message: String,
        /// The line of the manifest the parser choked on.
        snippet: String,
        #[source_code]
        src: NamedSource<String>,
        #[label("here")]
        span: Option<SourceSpan>,
    },

    #[error("failed to read `{}`", path.display())]
    #[diagnostic(code(tend::fs::read))]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not find `Cargo.toml` in `{}` or any parent directory", dir.display())]
    #[diagnostic(code(tend::manifest::not_found))]
    NotFound { dir: PathBuf },
}

impl ManifestError {
    /// Build a parse error from a `toml_edit` failure, capturing the offending line.
    pub fn from_toml(path: impl Into<PathBuf>, text: &str, err: &toml_edit::TomlError) -> Self {
        let path = path.into();
        let span = err.span();
        let snippet = span
            .as_ref()
            .map(|s| line_at(text, s.start).to_string())
            .unwrap_or_default();

        ManifestError::Parse {
            src: NamedSource::new(path.display().to_string(), text.to_string()),
            path,
            message: err.message().trim().to_string(),
            snippet,
            span: span.map(|s| SourceSpan::from(s.start..s.end.max(s.start))),
        }
    }

    /// Whether this error means the manifest text itself is malformed.
    pub fn is_parse(&self) -> bool {
        matches!(self, ManifestError::Parse { .. })
    }

    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            ManifestError::Parse {
                path,
                message,
                snippet,
                ..
            } => {
                let mut diag = Diagnostic::error(format!("malformed manifest: {}", message))
                    .with_location(path.clone());
                if !snippet.is_empty() {
                    diag = diag.with_context(format!("near `{}`", snippet.trim()));
                }
                diag.with_suggestion("Fix the TOML syntax error, then re-run the command")
            }
            ManifestError::Filesystem { path, source } => {
                Diagnostic::error(format!("could not read `{}`: {}", path.display(), source))
                    .with_location(path.clone())
            }
            ManifestError::NotFound { dir } => Diagnostic::error(format!(
                "no `Cargo.toml` found in `{}` or any parent directory",
                dir.display()
            ))
            .with_suggestion(suggestions::NO_MANIFEST),
        }
    }
}

fn line_at(text: &str, offset: usize) -> &str {
    let offset = offset.min(text.len());
    let start = text[..offset].rfind('\n').map(|i| i + 1).unwrap_or(0);
    let end = text[offset..]
        .find('\n')
        .map(|i| offset + i)
        .unwrap_or(text.len());
    &text[start..end]
}
