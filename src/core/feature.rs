//! Feature flags declared in `[features]`.

use serde::{Deserialize, Serialize};

use crate::core::target::normalize_name;

/// One `[features]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feature {
    pub name: String,
    /// Values of the feature array, verbatim
    #[serde(default)]
    pub enables: Vec<String>,
}

impl Feature {
    pub fn new(name: impl Into<String>) -> Self {
        Feature {
            name: name.into(),
            enables: Vec::new(),
        }
    }

    pub fn with_enables(mut self, enables: Vec<String>) -> Self {
        self.enables = enables;
        self
    }

    /// Dependencies this feature references with the `dep:` prefix.
    pub fn dep_references(&self) -> impl Iterator<Item = &str> {
        self.enables.iter().filter_map(|v| v.strip_prefix("dep:"))
    }
}

/// Whether `name` is declared in `declared`, treating `-` and `_` alike.
pub fn is_declared<'a>(name: &str, declared: impl IntoIterator<Item = &'a String>) -> bool {
    let wanted = normalize_name(name);
    declared.into_iter().any(|d| normalize_name(d) == wanted)
}
