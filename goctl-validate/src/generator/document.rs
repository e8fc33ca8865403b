//! Structured editing of Go source text.
//!
//! A [`GoDocument`] holds the original text and a list of edits, each
//! replacing a byte range (possibly empty) with a [`Node`]. Rendering walks
//! the original text once, emitting untouched slices verbatim and rendering
//! nodes in their place. Untouched text is therefore preserved byte for byte.

use std::ops::Range;

use crate::syntax::{last_significant, SourceTree, Token};

use super::templates::go_quote;

/// One import line.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ImportLine {
    pub name: Option<String>,
    pub path: String,
}

impl ImportLine {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            name: None,
            path: path.into(),
        }
    }

    pub fn named(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            path: path.into(),
        }
    }

    /// Standard library paths have no dot in their first element.
    fn is_std(&self) -> bool {
        !self.path.split('/').next().unwrap_or_default().contains('.')
    }

    fn render(&self) -> String {
        match &self.name {
            Some(name) => format!("{} {}", name, go_quote(&self.path)),
            None => go_quote(&self.path),
        }
    }
}

/// Value side of a map entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MapValue {
    /// An identifier, such as a function name.
    Ident(String),
    /// A string, rendered as a quoted literal.
    Str(String),
}

/// A map literal, `{` to `}`, that gains entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapNode {
    /// Existing text between the braces.
    pub body: String,
    pub entries: Vec<(String, MapValue)>,
}

impl MapNode {
    pub fn new(entries: Vec<(String, MapValue)>) -> Self {
        Self {
            body: String::new(),
            entries,
        }
    }

    /// Extend an existing literal whose inner text is `body`.
    pub fn extend(body: &str, entries: Vec<(String, MapValue)>) -> Self {
        Self {
            body: body.to_string(),
            entries,
        }
    }

    fn render(&self, out: &mut String) {
        out.push('{');

        let kept = self.body.trim_end();
        match last_significant(kept) {
            Some(last) if last.token != Token::Comma && last.token != Token::LBrace => {
                out.push_str(&kept[..last.span.end]);
                out.push(',');
                out.push_str(&kept[last.span.end..]);
            }
            _ => out.push_str(kept),
        }
        out.push('\n');

        for (key, value) in &self.entries {
            let value = match value {
                MapValue::Ident(ident) => ident.clone(),
                MapValue::Str(text) => go_quote(text),
            };
            out.push_str(&format!("\t{}: {},\n", go_quote(key), value));
        }
        out.push('}');
    }
}

/// A top-level function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionNode {
    /// Complete text, doc comment included, ending with a newline.
    pub text: String,
}

/// A grouped import declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportNode {
    pub lines: Vec<ImportLine>,
}

impl ImportNode {
    /// Standard library first, then everything else, each group sorted by
    /// path and free of duplicate lines. One path may appear under several
    /// names.
    fn render(&self, out: &mut String) {
        let mut lines = self.lines.clone();
        lines.sort_by(|a, b| (&a.path, &a.name).cmp(&(&b.path, &b.name)));
        lines.dedup();

        let (std, external): (Vec<_>, Vec<_>) = lines.into_iter().partition(ImportLine::is_std);

        out.push_str("import (\n");
        for line in &std {
            out.push_str(&format!("\t{}\n", line.render()));
        }
        if !std.is_empty() && !external.is_empty() {
            out.push('\n');
        }
        for line in &external {
            out.push_str(&format!("\t{}\n", line.render()));
        }
        out.push_str(")\n");
    }
}

/// Document node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Literal text.
    Text(String),
    MapLiteral(MapNode),
    /// A function, preceded by a blank line.
    Function(FunctionNode),
    ImportDecl(ImportNode),
    /// One spec added to an existing import group, on its own line.
    ImportSpec(ImportLine),
}

impl Node {
    fn render(&self, out: &mut String) {
        match self {
            Node::Text(text) => out.push_str(text),
            Node::MapLiteral(map) => map.render(out),
            Node::Function(function) => {
                out.push('\n');
                out.push_str(&function.text);
            }
            Node::ImportDecl(imports) => imports.render(out),
            Node::ImportSpec(line) => {
                out.push_str("\n\t");
                out.push_str(&line.render());
            }
        }
    }
}

#[derive(Debug, Clone)]
struct Edit {
    range: Range<usize>,
    node: Node,
}

/// Go source text plus pending edits.
#[derive(Debug, Clone)]
pub struct GoDocument<'a> {
    source: &'a str,
    edits: Vec<Edit>,
}

impl<'a> GoDocument<'a> {
    /// Document over existing text.
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            edits: Vec::new(),
        }
    }

    /// Document built from nodes only.
    pub fn empty() -> Self {
        Self::new("")
    }

    /// Replace `range` of the original text with `node`.
    pub fn replace(&mut self, range: Range<usize>, node: Node) {
        self.edits.push(Edit { range, node });
    }

    /// Insert `node` at byte `at` of the original text. Nodes inserted at
    /// the same offset render in insertion order.
    pub fn insert(&mut self, at: usize, node: Node) {
        self.replace(at..at, node);
    }

    /// Append `node` after the original text.
    pub fn push(&mut self, node: Node) {
        let end = self.source.len();
        let appended = self.edits.iter().any(|edit| edit.range.start == end);
        if !appended && !self.source.is_empty() && !self.source.ends_with('\n') {
            self.insert(self.source.len(), Node::Text("\n".to_string()));
        }
        self.insert(self.source.len(), node);
    }

    /// Whether any edit is pending.
    pub fn is_modified(&self) -> bool {
        !self.edits.is_empty()
    }

    /// Render the document in one pass.
    pub fn render(&self) -> String {
        let mut edits: Vec<&Edit> = self.edits.iter().collect();
        edits.sort_by_key(|edit| edit.range.start);

        let mut out = String::with_capacity(self.source.len() + 256);
        let mut cursor = 0;
        for edit in edits {
            if edit.range.start > cursor {
                out.push_str(&self.source[cursor..edit.range.start]);
            }
            edit.node.render(&mut out);
            cursor = cursor.max(edit.range.end);
        }
        out.push_str(&self.source[cursor.min(self.source.len())..]);
        out
    }
}

/// Add an import to a parsed file.
///
/// The line joins the last import group when there is one; otherwise a new
/// single-line import follows the last import declaration, or the package
/// clause when the file has no imports.
pub fn add_import(doc: &mut GoDocument<'_>, tree: &SourceTree, line: ImportLine) {
    if let Some(group) = tree.imports.iter().rev().find(|decl| decl.grouped) {
        let at = match group.specs.last() {
            Some(spec) => spec.span.end,
            None => doc.source[group.span.clone()]
                .find('(')
                .map_or(group.span.end, |i| group.span.start + i + 1),
        };
        doc.insert(at, Node::ImportSpec(line));
        return;
    }

    let text = format!("import {}", line.render());
    match tree.last_import_end() {
        Some(end) => doc.insert(end, Node::Text(format!("\n{}", text))),
        None => doc.insert(tree.package.span.end, Node::Text(format!("\n\n{}", text))),
    }
}
