//! In-place rewrite of a single string field.
//!
//! The field is located structurally (table, optional array entry, key
//! path) on the scanned layout, then a regex replaces the string literal
//! at that spot. Nothing outside the literal changes.

use std::fmt;
use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

use crate::core::dependency::DependencyKind;
use crate::core::target::{names_equivalent, TargetKind};
use crate::editor::block::quote;
use crate::editor::errors::EditError;
use crate::editor::layout::{parse_key_path, skip_string, Layout, Section};

static STRING_LITERAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^(?:"(?:[^"\\\r\n]|\\.)*"|'[^'\r\n]*')"#).expect("valid regex")
});

/// Structural address of a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    /// Owning table path, e.g. `["dependencies"]` or `["bin"]`
    pub table: Vec<String>,

    /// For arrays of tables: the entry whose `name` matches (`-`/`_` alike)
    pub entry: Option<String>,

    /// Key path inside the table, e.g. `["serde", "version"]`
    pub key: Vec<String>,

    /// Accept `serde = "1"` as the value of `serde.version`
    pub shorthand: bool,
}

impl Selector {
    /// A field of a plain table.
    pub fn new(table: &[&str], key: &[&str]) -> Self {
        Selector {
            table: table.iter().map(|s| s.to_string()).collect(),
            entry: None,
            key: key.iter().map(|s| s.to_string()).collect(),
            shorthand: false,
        }
    }

    /// A field of the `[[kind]]` entry named `name`.
    pub fn target(kind: TargetKind, name: &str, key: &str) -> Self {
        Selector {
            table: vec![kind.table_key().to_string()],
            entry: kind.is_array().then(|| name.to_string()),
            key: vec![key.to_string()],
            shorthand: false,
        }
    }

    /// The version requirement of a dependency, in any of its spellings.
    pub fn dependency_version(kind: DependencyKind, name: &str) -> Self {
        Selector {
            table: kind.table_path().iter().map(|s| s.to_string()).collect(),
            entry: None,
            key: vec![name.to_string(), "version".to_string()],
            shorthand: true,
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.table.join("."))?;
        if let Some(entry) = &self.entry {
            write!(f, "[name = {:?}]", entry)?;
        }
        write!(f, ".{}", self.key.join("."))
    }
}

/// Replace the string at `selector` with `new_value`.
///
/// The original quote style is kept when it can hold the new value.
/// Applying the same rewrite twice gives the same text as applying it once.
pub fn rewrite_scalar_field(text: &str, selector: &Selector, new_value: &str) -> Result<String, EditError> {
    let not_found = || EditError::FieldNotFound {
        selector: selector.to_string(),
    };

    let layout = Layout::scan(text);
    let start = locate(&layout, text, selector).ok_or_else(not_found)?;
    let literal = STRING_LITERAL.find(&text[start..]).ok_or_else(not_found)?;
    let span = start..start + literal.end();

    let replacement = if literal.as_str().starts_with('\'') && !new_value.contains('\'') {
        format!("'{}'", new_value)
    } else {
        quote(new_value)
    };

    let mut out = String::with_capacity(text.len() + replacement.len());
    out.push_str(&text[..span.start]);
    out.push_str(&replacement);
    out.push_str(&text[span.end..]);
    Ok(out)
}

/// Offset of the value addressed by `selector`.
fn locate(layout: &Layout, text: &str, selector: &Selector) -> Option<usize> {
    let table: Vec<&str> = selector.table.iter().map(String::as_str).collect();
    let key: Vec<&str> = selector.key.iter().map(String::as_str).collect();

    let sections: Vec<&Section> = match &selector.entry {
        Some(name) => {
            let index = layout.array_entries(&table).into_iter().find(|&i| {
                layout.sections[i]
                    .get(&["name"])
                    .and_then(|e| e.string_value(text))
                    .is_some_and(|n| names_equivalent(&n, name))
            })?;
            layout.sections[index..=layout.group_end(index)].iter().collect()
        }
        None => layout.sections.iter().filter(|s| !s.array && s.starts_with(&table)).collect(),
    };

    // `[table]` holding `a.b = ..`, or `[table.a]` holding `b = ..`
    for split in 0..key.len() {
        let mut owner = table.clone();
        owner.extend_from_slice(&key[..split]);
        if let Some(entry) = sections
            .iter()
            .find(|s| s.is_key(&owner))
            .and_then(|s| s.get(&key[split..]))
        {
            return Some(entry.value.start);
        }
    }

    // `a = { b = .. }`
    for split in 1..key.len() {
        let mut owner = table.clone();
        owner.extend_from_slice(&key[..split - 1]);
        let Some(section) = sections.iter().find(|s| s.is_key(&owner)) else {
            continue;
        };
        if let Some(entry) = section.get(&key[split - 1..split]) {
            if let Some(at) = inline_field(text, entry.value.clone(), &key[split..]) {
                return Some(at);
            }
        }
    }

    // `a = "1"` standing for `a.version`
    if selector.shorthand && key.len() >= 2 {
        let parent = &key[..key.len() - 1];
        let entry = sections
            .iter()
            .find(|s| s.is_key(&table))
            .and_then(|s| s.get(parent))?;
        if STRING_LITERAL.is_match(&text[entry.value.clone()]) {
            return Some(entry.value.start);
        }
    }

    None
}

/// Offset of the value of `key` inside the inline table at `span`.
fn inline_field(text: &str, span: Range<usize>, key: &[&str]) -> Option<usize> {
    let bytes = text.as_bytes();
    if bytes.get(span.start) != Some(&b'{') {
        return None;
    }

    let mut i = span.start + 1;
    let mut depth = 0usize;
    let mut expect_key = true;

    while i < span.end {
        match bytes[i] {
            b' ' | b'\t' | b'\r' | b'\n' => i += 1,
            q @ (b'"' | b'\'') if !expect_key || depth > 0 => {
                let triple = bytes[i..].starts_with(&[q; 3]);
                i = skip_string(bytes, i, q, triple);
            }
            _ if expect_key && depth == 0 => {
                let (path, eq) = parse_key_path(&text[i..span.end], b'=')?;
                let rest = &text[i + eq + 1..span.end];
                let value = i + eq + 1 + (rest.len() - rest.trim_start().len());
                if path.len() == key.len() && path.iter().zip(key).all(|(a, b)| a == b) {
                    return Some(value);
                }
                expect_key = false;
                i = value;
            }
            b'[' | b'{' => {
                depth += 1;
                i += 1;
            }
            b']' | b'}' => {
                if depth == 0 {
                    return None;
                }
                depth -= 1;
                i += 1;
            }
            b',' if depth == 0 => {
                expect_key = true;
                i += 1;
            }
            _ => i += 1,
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"[package]
name = "demo"
version = "0.1.0"

[dependencies]
serde = { version = "1.0", features = ["derive"] }
regex = "~1.10"
toml.version = '0.8'

[dependencies.semver]
version = "1"

[dev-dependencies]
serde = "1.0"

[[bin]]
name = "tool-two"
path = "src/bin/tool_two.rs"
"#;

    fn pin(kind: DependencyKind, name: &str, version: &str) -> String {
        rewrite_scalar_field(MANIFEST, &Selector::dependency_version(kind, name), version).unwrap()
    }

    #[test]
    fn test_inline_table_field() {
        let out = pin(DependencyKind::Normal, "serde", "1.0.200");
        assert!(out.contains("serde = { version = \"1.0.200\", features = [\"derive\"] }"));
        assert!(out.contains("[dev-dependencies]\nserde = \"1.0\"\n"));
    }

    #[test]
    fn test_shorthand_and_same_name_elsewhere() {
        let out = pin(DependencyKind::Dev, "serde", "1.0.200");
        assert!(out.contains("[dev-dependencies]\nserde = \"1.0.200\"\n"));
        assert!(out.contains("serde = { version = \"1.0\","));
    }

    #[test]
    fn test_dotted_and_subtable_forms() {
        let out = pin(DependencyKind::Normal, "toml", "0.8.19");
        assert!(out.contains("toml.version = '0.8.19'\n"));

        let out = pin(DependencyKind::Normal, "semver", "1.0.23");
        assert!(out.contains("[dependencies.semver]\nversion = \"1.0.23\"\n"));
    }

    #[test]
    fn test_rewrite_is_idempotent() {
        let selector = Selector::dependency_version(DependencyKind::Normal, "regex");
        let once = rewrite_scalar_field(MANIFEST, &selector, "~1.11").unwrap();
        let twice = rewrite_scalar_field(&once, &selector, "~1.11").unwrap();
        assert_eq!(once, twice);
        assert_eq!(once.len(), MANIFEST.len());
    }

    #[test]
    fn test_array_entry_field() {
        let selector = Selector::target(TargetKind::Bin, "tool_two", "path");
        let out = rewrite_scalar_field(MANIFEST, &selector, "src/bin/t2.rs").unwrap();
        assert!(out.contains("path = \"src/bin/t2.rs\""));
    }

    #[test]
    fn test_missing_field() {
        let selector = Selector::dependency_version(DependencyKind::Build, "cc");
        let err = rewrite_scalar_field(MANIFEST, &selector, "1").unwrap_err();
        assert!(matches!(err, EditError::FieldNotFound { .. }));

        let selector = Selector::new(&["package"], &["edition"]);
        assert!(rewrite_scalar_field(MANIFEST, &selector, "2021").is_err());
    }
}
