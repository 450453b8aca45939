//! Removal of target declarations.

use std::path::Path;

use crate::core::target::{names_equivalent, TargetKind};
use crate::editor::layout::{line_ending, Layout};

/// Remove the declaration of `kind` named `name` (`-`/`_` alike).
///
/// Deletes from the header line through the entry's last key, together
/// with the entry's own subtables, then trims the blank lines meeting at
/// the cut to a single separator. Text without such an entry is returned
/// unchanged.
pub fn remove_declaration(text: &str, kind: TargetKind, name: &str) -> String {
    let layout = Layout::scan(text);
    let Some(index) = find_declaration(&layout, text, kind, name) else {
        tracing::debug!("no `{}` named `{}` to remove", kind, name);
        return text.to_string();
    };

    let start = layout.sections[index].header.start;
    let end = layout.sections[layout.group_end(index)].body_end;
    join_trimmed(&text[..start], &text[end..], line_ending(text))
}

/// Index of the section declaring `(kind, name)`.
fn find_declaration(layout: &Layout, text: &str, kind: TargetKind, name: &str) -> Option<usize> {
    let key = [kind.table_key()];

    if !kind.is_array() {
        let index = layout
            .sections
            .iter()
            .position(|s| !s.array && s.is_key(&key))?;
        // An unnamed `[lib]` is the package's library whatever it is called.
        let declared = layout.sections[index]
            .get(&["name"])
            .and_then(|e| e.string_value(text));
        return match declared {
            Some(declared) if !names_equivalent(&declared, name) => None,
            _ => Some(index),
        };
    }

    layout.array_entries(&key).into_iter().find(|&i| {
        let section = &layout.sections[i];
        let declared = section.get(&["name"]).and_then(|e| e.string_value(text)).or_else(|| {
            section
                .get(&["path"])
                .and_then(|e| e.string_value(text))
                .and_then(|p| Path::new(&p).file_stem().map(|s| s.to_string_lossy().into_owned()))
        });
        declared.is_some_and(|d| names_equivalent(&d, name))
    })
}

fn join_trimmed(before: &str, after: &str, newline: &str) -> String {
    let head = trim_trailing_blank_lines(before);
    let tail = trim_leading_blank_lines(after);
    let had_blank = head.len() != before.len() || tail.len() != after.len();

    let mut out = String::with_capacity(head.len() + tail.len() + newline.len());
    out.push_str(head);
    if had_blank && !head.is_empty() && !tail.is_empty() {
        out.push_str(newline);
    }
    out.push_str(tail);
    out
}

fn trim_trailing_blank_lines(s: &str) -> &str {
    let mut s = s;
    while let Some(body) = s.strip_suffix('\n') {
        let line_start = body.rfind('\n').map_or(0, |i| i + 1);
        if body[line_start..].trim().is_empty() {
            s = &s[..line_start];
        } else {
            break;
        }
    }
    s
}

fn trim_leading_blank_lines(s: &str) -> &str {
    let mut s = s;
    loop {
        let line_end = s.find('\n').map_or(s.len(), |i| i + 1);
        if line_end == 0 || !s[..line_end].trim().is_empty() {
            return s;
        }
        s = &s[line_end..];
    }
}
