//! Module inclusion graph of a package.
//!
//! Starting from crate roots, follows `mod name;` declarations and
//! `include!`-style macros to every source file the compiler would read.
//! Files in the graph are part of some unit even though no manifest entry
//! names them.
//!
//! Source text is tokenized just far enough to skip comments and string
//! literals; nothing is macro-expanded, so modules declared by macros are
//! not seen.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::path::{Component, Path, PathBuf};

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Dfs, EdgeRef};
use petgraph::Direction;

use crate::core::convention::SOURCE_EXT;

/// How one file reaches another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Edge {
    /// `mod name;`
    Module,
    /// `include!`, `include_str!`, `include_bytes!`
    Include,
}

/// Files reachable from a set of crate roots, relative to the package root.
#[derive(Debug, Default)]
pub struct ModuleGraph {
    graph: DiGraph<PathBuf, Edge>,
    index: HashMap<PathBuf, NodeIndex>,
    roots: Vec<NodeIndex>,
}

impl ModuleGraph {
    /// Build the graph for `roots` (package-relative paths) under
    /// `package_dir`. Roots that do not exist are skipped; unreadable files
    /// are logged and contribute no edges.
    pub fn build(package_dir: &Path, roots: &[PathBuf]) -> Self {
        let mut graph = ModuleGraph::default();
        let mut queue: VecDeque<(PathBuf, bool)> = VecDeque::new();

        for root in roots {
            let root = clean(root);
            if !package_dir.join(&root).is_file() {
                tracing::debug!("crate root {} does not exist", root.display());
                continue;
            }
            let node = graph.add_file(&root);
            if !graph.roots.contains(&node) {
                graph.roots.push(node);
            }
            queue.push_back((root, true));
        }

        let mut visited: HashSet<PathBuf> = HashSet::new();
        while let Some((file, owns_dir)) = queue.pop_front() {
            if !visited.insert(file.clone()) {
                continue;
            }

            let text = match std::fs::read_to_string(package_dir.join(&file)) {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!("skipping unreadable {}: {}", file.display(), e);
                    continue;
                }
            };
            let scan = scan_source(&text);
            let from = graph.add_file(&file);

            for decl in &scan.modules {
                match resolve_module(package_dir, &file, owns_dir, decl) {
                    Some((child, child_owns_dir)) => {
                        let to = graph.add_file(&child);
                        graph.add_edge(from, to, Edge::Module);
                        queue.push_back((child, child_owns_dir));
                    }
                    None => {
                        tracing::debug!("{}: no file for `mod {}`", file.display(), decl.name);
                    }
                }
            }

            let dir = file.parent().unwrap_or(Path::new(""));
            for include in &scan.includes {
                let target = clean(&dir.join(include));
                let to = graph.add_file(&target);
                graph.add_edge(from, to, Edge::Include);
            }
        }

        graph
    }

    fn add_file(&mut self, path: &Path) -> NodeIndex {
        if let Some(&node) = self.index.get(path) {
            return node;
        }
        let node = self.graph.add_node(path.to_path_buf());
        self.index.insert(path.to_path_buf(), node);
        node
    }

    fn add_edge(&mut self, from: NodeIndex, to: NodeIndex, edge: Edge) {
        if !self.graph.contains_edge(from, to) {
            self.graph.add_edge(from, to, edge);
        }
    }

    /// Whether `path` (package-relative) is reachable from a root.
    pub fn contains(&self, path: &Path) -> bool {
        self.index.contains_key(&clean(path))
    }

    /// Every reachable file, sorted.
    pub fn files(&self) -> Vec<PathBuf> {
        let mut files = BTreeSet::new();
        for &root in &self.roots {
            let mut dfs = Dfs::new(&self.graph, root);
            while let Some(node) = dfs.next(&self.graph) {
                files.insert(self.graph[node].clone());
            }
        }
        files.into_iter().collect()
    }

    /// Whether some file declares or includes `path`, as opposed to it
    /// only being a root.
    pub fn is_included(&self, path: &Path) -> bool {
        self.index.get(&clean(path)).is_some_and(|&node| {
            self.graph
                .neighbors_directed(node, Direction::Incoming)
                .next()
                .is_some()
        })
    }

    /// Files directly declared or included by `path`.
    pub fn children(&self, path: &Path) -> Vec<(&Path, Edge)> {
        let Some(&node) = self.index.get(&clean(path)) else {
            return Vec::new();
        };
        let mut children: Vec<(&Path, Edge)> = self
            .graph
            .edges(node)
            .map(|e| (self.graph[e.target()].as_path(), *e.weight()))
            .collect();
        children.sort();
        children
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }
}

/// A `mod name;` found in a file.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ModDecl {
    name: String,
    /// `#[path = ".."]` on the declaration
    path_attr: Option<String>,
    /// Directory components of enclosing inline `mod a { .. }` blocks
    inline: Vec<String>,
}

#[derive(Debug, Default)]
struct SourceScan {
    modules: Vec<ModDecl>,
    includes: Vec<String>,
}

/// Resolve a module declaration to its file and whether that file owns
/// its directory (crate roots, `mod.rs` files and `#[path]` files do).
fn resolve_module(
    package_dir: &Path,
    file: &Path,
    owns_dir: bool,
    decl: &ModDecl,
) -> Option<(PathBuf, bool)> {
    let parent = file.parent().unwrap_or(Path::new(""));

    if let Some(attr) = &decl.path_attr {
        let base = if decl.inline.is_empty() {
            parent.to_path_buf()
        } else {
            module_dir(file, owns_dir).join(decl.inline.iter().collect::<PathBuf>())
        };
        let path = clean(&base.join(attr));
        return package_dir.join(&path).is_file().then_some((path, true));
    }

    let base = module_dir(file, owns_dir).join(decl.inline.iter().collect::<PathBuf>());
    let flat = clean(&base.join(format!("{}.{}", decl.name, SOURCE_EXT)));
    if package_dir.join(&flat).is_file() {
        return Some((flat, false));
    }
    let nested = clean(&base.join(&decl.name).join(format!("mod.{}", SOURCE_EXT)));
    package_dir.join(&nested).is_file().then_some((nested, true))
}

/// Directory holding the child modules of `file`.
fn module_dir(file: &Path, owns_dir: bool) -> PathBuf {
    let parent = file.parent().unwrap_or(Path::new(""));
    let is_mod_rs = file.file_stem().is_some_and(|s| s == "mod");
    match file.file_stem() {
        Some(stem) if !owns_dir && !is_mod_rs => parent.join(stem),
        _ => parent.to_path_buf(),
    }
}

/// Lexically fold `.` and `..` components.
fn clean(path: &Path) -> PathBuf {
    let mut out: Vec<Component> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir if matches!(out.last(), Some(Component::Normal(_))) => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out.iter().collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Ident(String),
    Str(String),
    Punct(char),
}

fn scan_source(text: &str) -> SourceScan {
    let tokens = tokenize(text);
    let mut scan = SourceScan::default();

    let mut depth = 0usize;
    // (directory component, depth inside the block)
    let mut inline: Vec<(String, usize)> = Vec::new();
    let mut pending_path: Option<String> = None;
    let mut i = 0;

    let ident = |i: usize| match tokens.get(i) {
        Some(Token::Ident(s)) => Some(s.as_str()),
        _ => None,
    };
    let punct = |i: usize, c: char| tokens.get(i) == Some(&Token::Punct(c));

    while i < tokens.len() {
        match &tokens[i] {
            Token::Punct('#') if punct(i + 1, '[') && ident(i + 2) == Some("path") && punct(i + 3, '=') => {
                if let (Some(Token::Str(path)), true) = (tokens.get(i + 4), punct(i + 5, ']')) {
                    pending_path = Some(path.clone());
                    i += 6;
                    continue;
                }
                i += 1;
            }
            Token::Ident(kw) if kw == "mod" => {
                let Some(name) = ident(i + 1) else {
                    i += 1;
                    continue;
                };
                let name = name.strip_prefix("r#").unwrap_or(name).to_string();
                let path_attr = pending_path.take();
                if punct(i + 2, ';') {
                    scan.modules.push(ModDecl {
                        name,
                        path_attr,
                        inline: inline.iter().map(|(c, _)| c.clone()).collect(),
                    });
                    i += 3;
                } else if punct(i + 2, '{') {
                    depth += 1;
                    inline.push((path_attr.unwrap_or(name), depth));
                    i += 3;
                } else {
                    i += 2;
                }
            }
            Token::Ident(mac) if matches!(mac.as_str(), "include" | "include_str" | "include_bytes") => {
                if punct(i + 1, '!') && (punct(i + 2, '(') || punct(i + 2, '[') || punct(i + 2, '{')) {
                    if let Some(Token::Str(path)) = tokens.get(i + 3) {
                        scan.includes.push(path.clone());
                        i += 4;
                        continue;
                    }
                }
                i += 1;
            }
            Token::Punct('{') => {
                pending_path = None;
                depth += 1;
                i += 1;
            }
            Token::Punct('}') => {
                if inline.last().is_some_and(|(_, d)| *d == depth) {
                    inline.pop();
                }
                depth = depth.saturating_sub(1);
                i += 1;
            }
            Token::Punct(';') => {
                pending_path = None;
                i += 1;
            }
            _ => i += 1,
        }
    }

    scan
}

/// Split source into identifiers, string literal contents and punctuation.
/// Comments, numbers, char literals and lifetimes produce no tokens.
fn tokenize(text: &str) -> Vec<Token> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();

        if c.is_whitespace() {
            i += 1;
        } else if c == '/' && next == Some('/') {
            while i < chars.len() && chars[i] != '\n' {
                i += 1;
            }
        } else if c == '/' && next == Some('*') {
            i = skip_block_comment(&chars, i);
        } else if c == '"' {
            let (s, end) = read_string(&chars, i + 1);
            tokens.push(Token::Str(s));
            i = end;
        } else if c == 'b' && next == Some('"') {
            let (s, end) = read_string(&chars, i + 2);
            tokens.push(Token::Str(s));
            i = end;
        } else if c == 'b' && next == Some('\'') {
            i = skip_char_or_lifetime(&chars, i + 1);
        } else if (c == 'r' && matches!(next, Some('"') | Some('#')))
            || (c == 'b' && next == Some('r') && matches!(chars.get(i + 2), Some('"') | Some('#')))
        {
            let start = if c == 'b' { i + 2 } else { i + 1 };
            match read_raw_string(&chars, start) {
                Some((s, end)) => {
                    tokens.push(Token::Str(s));
                    i = end;
                }
                None if c == 'r' && next == Some('#') => {
                    let end = ident_end(&chars, i + 2);
                    let name: String = chars[i + 2..end].iter().collect();
                    tokens.push(Token::Ident(format!("r#{}", name)));
                    i = end.max(i + 2);
                }
                None => {
                    let end = ident_end(&chars, i);
                    tokens.push(Token::Ident(chars[i..end].iter().collect()));
                    i = end;
                }
            }
        } else if c == '\'' {
            i = skip_char_or_lifetime(&chars, i);
        } else if c.is_alphabetic() || c == '_' {
            let end = ident_end(&chars, i);
            tokens.push(Token::Ident(chars[i..end].iter().collect()));
            i = end;
        } else if c.is_ascii_digit() {
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
        } else {
            tokens.push(Token::Punct(c));
            i += 1;
        }
    }

    tokens
}

fn ident_end(chars: &[char], start: usize) -> usize {
    let mut i = start;
    while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
        i += 1;
    }
    i
}

/// Skip a (possibly nested) block comment starting at `start`.
fn skip_block_comment(chars: &[char], start: usize) -> usize {
    let mut depth = 0usize;
    let mut i = start;
    while i < chars.len() {
        if chars[i] == '/' && chars.get(i + 1) == Some(&'*') {
            depth += 1;
            i += 2;
        } else if chars[i] == '*' && chars.get(i + 1) == Some(&'/') {
            depth -= 1;
            i += 2;
            if depth == 0 {
                return i;
            }
        } else {
            i += 1;
        }
    }
    i
}

/// Contents of a `"..."` literal whose body starts at `start`, and the
/// index after the closing quote.
fn read_string(chars: &[char], start: usize) -> (String, usize) {
    let mut s = String::new();
    let mut i = start;
    while i < chars.len() {
        match chars[i] {
            '"' => return (s, i + 1),
            '\\' => {
                match chars.get(i + 1) {
                    Some('n') => s.push('\n'),
                    Some('t') => s.push('\t'),
                    Some('\n') => {}
                    Some(&other) => s.push(other),
                    None => {}
                }
                i += 2;
            }
            c => {
                s.push(c);
                i += 1;
            }
        }
    }
    (s, i)
}

/// Raw string starting at the `#`s or quote after `r`.
fn read_raw_string(chars: &[char], start: usize) -> Option<(String, usize)> {
    let mut i = start;
    let mut hashes = 0;
    while chars.get(i) == Some(&'#') {
        hashes += 1;
        i += 1;
    }
    if chars.get(i) != Some(&'"') {
        return None;
    }
    let body = i + 1;
    let mut j = body;
    while j < chars.len() {
        if chars[j] == '"' && (1..=hashes).all(|k| chars.get(j + k) == Some(&'#')) {
            return Some((chars[body..j].iter().collect(), j + 1 + hashes));
        }
        j += 1;
    }
    Some((chars[body..].iter().collect(), chars.len()))
}

/// Skip a char literal (`'x'`, `'\n'`) or a lifetime (`'a`) at `start`.
fn skip_char_or_lifetime(chars: &[char], start: usize) -> usize {
    match chars.get(start + 1) {
        Some('\\') => {
            let mut i = start + 2;
            while i < chars.len() && chars[i] != '\'' && chars[i] != '\n' {
                i += 1;
            }
            i + 1
        }
        Some(_) if chars.get(start + 2) == Some(&'\'') => start + 3,
        _ => start + 1,
    }
}
