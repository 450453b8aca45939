//! Splicing new blocks and keys into manifest text.

use crate::core::target::TargetKind;
use crate::editor::block;
use crate::editor::errors::EditError;
use crate::editor::layout::{line_ending, Layout, Section};

/// Dependency tables of a package, in the order Cargo documents them.
const DEPENDENCY_TABLES: [&str; 3] = ["dependencies", "dev-dependencies", "build-dependencies"];

/// Insert a rendered declaration block for `kind`.
///
/// The block goes right after the largest contiguous run of existing
/// blocks of the same kind (the first run on a tie). Without any, it goes
/// before the first block of the next kind in the order bin, example, test,
/// bench; else after `[lib]`, the dependency tables or `[package]`; else at
/// the end of the file. Blocks are separated by one blank line. Every other
/// byte of `text` is kept.
pub fn insert_declaration(text: &str, block: &str, kind: TargetKind) -> String {
    let layout = Layout::scan(text);
    let at = match insertion_point(&layout, kind) {
        Ok(at) => at,
        Err(e) => {
            tracing::warn!("{}; appending at end of file", e);
            text.len()
        }
    };
    splice_block(text, at, block)
}

/// Byte offset where a new `kind` block belongs.
pub fn insertion_point(layout: &Layout, kind: TargetKind) -> Result<usize, EditError> {
    if kind.is_array() {
        if let Some(end) = largest_run(layout, kind.table_key()) {
            return Ok(end);
        }

        let later = TargetKind::ARRAY_KINDS
            .iter()
            .skip_while(|k| **k != kind)
            .skip(1);
        for next in later {
            if let Some(section) = layout
                .sections
                .iter()
                .find(|s| s.array && s.is_key(&[next.table_key()]))
            {
                return Ok(section.lead);
            }
        }

        if let Some(end) = after_last(layout, |s| s.root_key() == Some("lib")) {
            return Ok(end);
        }
        if let Some(end) = after_last(layout, is_dependency_section) {
            return Ok(end);
        }
    }

    after_last(layout, |s| s.root_key() == Some("package")).ok_or_else(|| {
        EditError::AmbiguousInsertion {
            kind: kind.table_key().to_string(),
        }
    })
}

/// Add `key = value` to the plain table `table`, creating the table when
/// it does not exist. `value` is TOML value text.
pub fn insert_table_entry(text: &str, table: &[&str], key: &str, value: &str) -> String {
    let layout = Layout::scan(text);
    let line = format!("{} = {}", block::key(key), value);

    if let Some(section) = layout.table(table) {
        let at = section.body_end;
        let newline = line_ending(text);
        let mut out = String::with_capacity(text.len() + line.len() + 2);
        out.push_str(&text[..at]);
        if !out.is_empty() && !out.ends_with('\n') {
            out.push_str(newline);
        }
        out.push_str(&line);
        out.push_str(newline);
        out.push_str(&text[at..]);
        return out;
    }

    let header = table.iter().map(|k| block::key(k)).collect::<Vec<_>>().join(".");
    let new_block = format!("[{}]\n{}\n", header, line);
    let at = after_last(&layout, is_dependency_section)
        .or_else(|| after_last(&layout, |s| s.root_key() == Some("package")))
        .unwrap_or_else(|| {
            tracing::warn!("no anchor for a new `[{}]` table; appending at end of file", header);
            text.len()
        });
    splice_block(text, at, &new_block)
}

/// End of the largest contiguous run of `[[key]]` blocks.
///
/// A run includes the blocks' own `[key.sub]` subtables; any other header
/// ends it.
fn largest_run(layout: &Layout, key: &str) -> Option<usize> {
    let mut best: Option<(usize, usize)> = None;
    let mut current: Option<(usize, usize)> = None;

    for section in &layout.sections {
        if section.root_key() == Some(key) {
            let (count, _) = current.unwrap_or((0, 0));
            let count = if section.array && section.key.len() == 1 {
                count + 1
            } else {
                count
            };
            current = Some((count, section.body_end));
        } else if let Some(run) = current.take() {
            best = longer(best, run);
        }
    }
    if let Some(run) = current {
        best = longer(best, run);
    }

    best.filter(|(count, _)| *count > 0).map(|(_, end)| end)
}

fn longer(best: Option<(usize, usize)>, run: (usize, usize)) -> Option<(usize, usize)> {
    match best {
        Some(b) if b.0 >= run.0 => Some(b),
        _ => Some(run),
    }
}

fn after_last(layout: &Layout, pred: impl Fn(&Section) -> bool) -> Option<usize> {
    layout
        .sections
        .iter()
        .rev()
        .find(|&s| pred(s))
        .map(|s| s.body_end)
}

fn is_dependency_section(section: &Section) -> bool {
    match section.key.as_slice() {
        [first, ..] if DEPENDENCY_TABLES.contains(&first.as_str()) => true,
        [target, _, table, ..] if target == "target" => DEPENDENCY_TABLES.contains(&table.as_str()),
        _ => false,
    }
}

/// Splice `block` at `at`, keeping one blank line on each side.
fn splice_block(text: &str, at: usize, block: &str) -> String {
    let (before, after) = text.split_at(at);
    let newline = line_ending(text);
    let mut out = String::with_capacity(text.len() + block.len() + 4);

    out.push_str(before);
    if !before.is_empty() {
        if !before.ends_with('\n') {
            out.push_str(newline);
        }
        if !ends_with_blank_line(&out) {
            out.push_str(newline);
        }
    }

    out.push_str(&block.trim_end().lines().collect::<Vec<_>>().join(newline));
    out.push_str(newline);

    if !after.is_empty() && !starts_with_blank_line(after) {
        out.push_str(newline);
    }
    out.push_str(after);
    out
}

fn ends_with_blank_line(s: &str) -> bool {
    s.ends_with("\n\n") || s.ends_with("\n\r\n")
}

fn starts_with_blank_line(s: &str) -> bool {
    s.starts_with('\n') || s.starts_with("\r\n")
}
