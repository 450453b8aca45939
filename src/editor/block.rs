//! Rendering of new target declarations.

use std::fmt;
use std::path::PathBuf;

use crate::core::target::TargetKind;
use crate::util::fs::manifest_path_string;

/// A target declaration to be written into a manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub kind: TargetKind,
    pub name: String,
    pub path: Option<PathBuf>,
    pub required_features: Vec<String>,
}

impl Declaration {
    pub fn new(kind: TargetKind, name: impl Into<String>) -> Self {
        Declaration {
            kind,
            name: name.into(),
            path: None,
            required_features: Vec::new(),
        }
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_required_features(mut self, features: Vec<String>) -> Self {
        self.required_features = features;
        self
    }

    /// `[lib]` or `[[bin]]` and friends.
    pub fn header(&self) -> String {
        if self.kind.is_array() {
            format!("[[{}]]", self.kind.table_key())
        } else {
            format!("[{}]", self.kind.table_key())
        }
    }

    /// The block text, newline terminated.
    pub fn render(&self) -> String {
        let mut out = self.header();
        out.push('\n');
        out.push_str(&format!("name = {}\n", quote(&self.name)));
        if let Some(path) = &self.path {
            out.push_str(&format!("path = {}\n", quote(&manifest_path_string(path))));
        }
        if !self.required_features.is_empty() {
            out.push_str(&format!(
                "required-features = {}\n",
                string_array(&self.required_features)
            ));
        }
        out
    }
}

impl fmt::Display for Declaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// A TOML basic string literal.
pub fn quote(s: &str) -> String {
    toml_edit::Value::from(s).to_string()
}

/// A single-line TOML array of strings.
pub fn string_array(items: &[String]) -> String {
    let items: Vec<String> = items.iter().map(|s| quote(s)).collect();
    format!("[{}]", items.join(", "))
}

/// A key, quoted only when it is not a valid bare key.
pub fn key(name: &str) -> String {
    let bare = !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
    if bare {
        name.to_string()
    } else {
        quote(name)
    }
}
