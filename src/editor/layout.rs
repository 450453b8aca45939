//! Line-level layout of manifest text.
//!
//! The scanner splits a manifest into table sections and key/value entries
//! with byte offsets into the original text, so edits can splice exact
//! regions. Multi-line strings and arrays/inline tables spanning several
//! lines are kept inside their entry; a line starting with `[` inside a
//! value is never mistaken for a header.

use std::ops::Range;

/// A `key = value` entry, possibly spanning several lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Dotted key path relative to the owning section
    pub key: Vec<String>,

    /// From the start of the first line to the start of the line after the value
    pub span: Range<usize>,

    /// The value itself, without trailing comment or whitespace
    pub value: Range<usize>,
}

impl Entry {
    /// Whether the key path equals `key`.
    pub fn is_key(&self, key: &[&str]) -> bool {
        self.key.len() == key.len() && self.key.iter().zip(key).all(|(a, b)| a == b)
    }

    /// The value parsed as a string, if it is one.
    pub fn string_value(&self, text: &str) -> Option<String> {
        text[self.value.clone()]
            .parse::<toml_edit::Value>()
            .ok()?
            .as_str()
            .map(String::from)
    }
}

/// A `[table]` or `[[array]]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    /// Header key path
    pub key: Vec<String>,

    /// `[[...]]` header
    pub array: bool,

    /// The header line, through its newline
    pub header: Range<usize>,

    /// Start of the comment lines directly above the header (no blank line
    /// in between), or the header start
    pub lead: usize,

    /// Start of the line following the last entry (or the header when empty)
    pub body_end: usize,

    /// Start of the next header line, or end of text
    pub end: usize,

    pub entries: Vec<Entry>,
}

impl Section {
    /// Whether the header key equals `key`.
    pub fn is_key(&self, key: &[&str]) -> bool {
        self.key.len() == key.len() && self.key.iter().zip(key).all(|(a, b)| a == b)
    }

    /// Whether the header key starts with `prefix`.
    pub fn starts_with(&self, prefix: &[&str]) -> bool {
        self.key.len() >= prefix.len() && self.key.iter().zip(prefix).all(|(a, b)| a == b)
    }

    /// First key segment.
    pub fn root_key(&self) -> Option<&str> {
        self.key.first().map(String::as_str)
    }

    /// The entry with key path `key`.
    pub fn get(&self, key: &[&str]) -> Option<&Entry> {
        self.entries.iter().find(|e| e.is_key(key))
    }
}

/// Sections and entries of a manifest.
#[derive(Debug, Clone, Default)]
pub struct Layout {
    /// Entries before the first header
    pub root: Vec<Entry>,

    pub sections: Vec<Section>,
}

impl Layout {
    /// Scan manifest text.
    pub fn scan(text: &str) -> Layout {
        let mut layout = Layout::default();
        let mut current: Option<Section> = None;
        let mut comment_start: Option<usize> = None;
        let mut pos = 0;

        while pos < text.len() {
            let line_end = text[pos..].find('\n').map_or(text.len(), |i| pos + i);
            let next = (line_end + 1).min(text.len());
            let line = text[pos..line_end].trim_end_matches('\r');
            let trimmed = line.trim_start();
            let indent = line.len() - trimmed.len();

            if trimmed.is_empty() {
                comment_start = None;
                pos = next;
                continue;
            }
            if trimmed.starts_with('#') {
                comment_start.get_or_insert(pos);
                pos = next;
                continue;
            }

            if trimmed.starts_with('[') {
                if let Some((key, array)) = parse_header(trimmed) {
                    if let Some(mut done) = current.take() {
                        done.end = pos;
                        layout.sections.push(done);
                    }
                    current = Some(Section {
                        key,
                        array,
                        header: pos..next,
                        lead: comment_start.take().unwrap_or(pos),
                        body_end: next,
                        end: text.len(),
                        entries: Vec::new(),
                    });
                    pos = next;
                    continue;
                }
            }

            comment_start = None;
            let Some((key, value_start)) = parse_key_line(text, pos + indent) else {
                tracing::debug!("unrecognized manifest line at byte {}", pos);
                pos = next;
                continue;
            };
            let (value_end, stop) = scan_value(text, value_start);
            let entry_next = (stop + 1).min(text.len());
            let entry = Entry {
                key,
                span: pos..entry_next,
                value: value_start..value_end,
            };
            match current.as_mut() {
                Some(section) => {
                    section.body_end = entry_next;
                    section.entries.push(entry);
                }
                None => layout.root.push(entry),
            }
            pos = entry_next;
        }

        if let Some(done) = current {
            layout.sections.push(done);
        }
        layout
    }

    /// The plain `[table]` with exactly this key.
    pub fn table(&self, key: &[&str]) -> Option<&Section> {
        self.sections.iter().find(|s| !s.array && s.is_key(key))
    }

    /// Indices of the `[[array]]` entries with exactly this key, in order.
    pub fn array_entries(&self, key: &[&str]) -> Vec<usize> {
        self.sections
            .iter()
            .enumerate()
            .filter(|(_, s)| s.array && s.is_key(key))
            .map(|(i, _)| i)
            .collect()
    }

    /// Index of the last section belonging to the table or array entry at
    /// `index`, counting its `[key.sub]` subtables that follow directly.
    pub fn group_end(&self, index: usize) -> usize {
        let owner: Vec<&str> = self.sections[index].key.iter().map(String::as_str).collect();
        let mut last = index;
        for (i, section) in self.sections.iter().enumerate().skip(index + 1) {
            if section.key.len() > owner.len() && section.starts_with(&owner) {
                last = i;
            } else {
                break;
            }
        }
        last
    }
}

/// Parse a header line (`[a.b]`, `[[bin]]`, `["quoted key"]  # note`).
fn parse_header(line: &str) -> Option<(Vec<String>, bool)> {
    let (array, rest) = match line.strip_prefix("[[") {
        Some(rest) => (true, rest),
        None => (false, line.strip_prefix('[')?),
    };
    let (key, close) = parse_key_path(rest, b']')?;
    let after = &rest[close..];
    let after = if array {
        after.strip_prefix("]]")?
    } else {
        after.strip_prefix(']')?
    };
    let after = after.trim_start();
    if !after.is_empty() && !after.starts_with('#') {
        return None;
    }
    Some((key, array))
}

/// Parse `key = ` at `start`; returns the key path and the value offset.
fn parse_key_line(text: &str, start: usize) -> Option<(Vec<String>, usize)> {
    let (key, eq) = parse_key_path(&text[start..], b'=')?;
    let rest = &text[start + eq + 1..];
    let value_offset = rest.len() - rest.trim_start_matches([' ', '\t']).len();
    Some((key, start + eq + 1 + value_offset))
}

/// Parse a dotted key path up to `stop`; returns the segments and the
/// offset of `stop` in `s`.
pub(crate) fn parse_key_path(s: &str, stop: u8) -> Option<(Vec<String>, usize)> {
    let bytes = s.as_bytes();
    let mut segments = Vec::new();
    let mut i = 0;

    loop {
        while i < bytes.len() && matches!(bytes[i], b' ' | b'\t') {
            i += 1;
        }
        match bytes.get(i)? {
            b'"' => {
                let end = skip_string(bytes, i, b'"', false);
                let literal = s.get(i..end)?;
                let value: toml_edit::Value = literal.parse().ok()?;
                segments.push(value.as_str()?.to_string());
                i = end;
            }
            b'\'' => {
                let end = skip_string(bytes, i, b'\'', false);
                segments.push(s.get(i + 1..end.checked_sub(1)?)?.to_string());
                i = end;
            }
            _ => {
                let start = i;
                while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || matches!(bytes[i], b'-' | b'_')) {
                    i += 1;
                }
                if i == start {
                    return None;
                }
                segments.push(s[start..i].to_string());
            }
        }
        while i < bytes.len() && matches!(bytes[i], b' ' | b'\t') {
            i += 1;
        }
        match bytes.get(i)? {
            b'.' => i += 1,
            b if *b == stop => return Some((segments, i)),
            _ => return None,
        }
    }
}

/// Find the end of the value starting at `start`.
///
/// Returns the end of its significant text and the offset of the newline
/// that terminates it (or the end of text). Arrays and inline tables keep
/// the value open across lines, as do multi-line strings.
pub(crate) fn scan_value(text: &str, start: usize) -> (usize, usize) {
    let bytes = text.as_bytes();
    let mut i = start;
    let mut depth = 0usize;
    let mut last = start;

    while i < bytes.len() {
        match bytes[i] {
            b'\n' if depth == 0 => return (last, i),
            b'#' => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
                continue;
            }
            quote @ (b'"' | b'\'') => {
                let triple = bytes[i..].starts_with(&[quote; 3]);
                i = skip_string(bytes, i, quote, triple);
                last = i;
                continue;
            }
            b' ' | b'\t' | b'\r' | b'\n' => {
                i += 1;
                continue;
            }
            b'[' | b'{' => depth += 1,
            b']' | b'}' => depth = depth.saturating_sub(1),
            _ => {}
        }
        i += 1;
        last = i;
    }

    (last, bytes.len())
}

/// Offset just past the string literal opening at `start`.
pub(crate) fn skip_string(bytes: &[u8], start: usize, quote: u8, triple: bool) -> usize {
    let escapes = quote == b'"';
    let mut i = start + if triple { 3 } else { 1 };

    while i < bytes.len() {
        let b = bytes[i];
        if escapes && b == b'\\' {
            i += 2;
            continue;
        }
        if b == quote {
            if !triple {
                return i + 1;
            }
            if bytes[i..].starts_with(&[quote; 3]) {
                // A closing run may carry up to two quotes of content.
                let mut end = i + 3;
                while end < bytes.len() && end < i + 5 && bytes[end] == quote {
                    end += 1;
                }
                return end;
            }
        }
        if b == b'\n' && !triple {
            return i;
        }
        i += 1;
    }

    bytes.len()
}

/// Line terminator used by `text`.
pub(crate) fn line_ending(text: &str) -> &'static str {
    if text.contains("\r\n") {
        "\r\n"
    } else {
        "\n"
    }
}
