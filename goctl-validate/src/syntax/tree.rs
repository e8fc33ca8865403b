//! Declaration-level syntax tree for Go source files.
//!
//! Only top-level structure is modelled. Function bodies and initializer
//! expressions are kept as byte ranges into the original text so callers can
//! copy them verbatim.

use std::fmt;
use std::ops::Range;

/// Syntax error with a 1-based source position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub line: usize,
    pub column: usize,
    pub message: String,
}

impl SyntaxError {
    /// Build an error positioned at byte `offset` of `source`.
    pub fn at(source: &str, offset: usize, message: impl Into<String>) -> Self {
        let (line, column) = position(source, offset);
        Self {
            line,
            column,
            message: message.into(),
        }
    }
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.line, self.column, self.message)
    }
}

impl std::error::Error for SyntaxError {}

/// Convert a byte offset to a 1-based (line, column) pair.
pub fn position(source: &str, offset: usize) -> (usize, usize) {
    let offset = offset.min(source.len());
    let before = source.get(..offset).unwrap_or(source);
    let line = before.matches('\n').count() + 1;
    let line_start = before.rfind('\n').map_or(0, |i| i + 1);
    let column = before[line_start..].chars().count() + 1;
    (line, column)
}

/// The `package` clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageClause {
    pub name: String,
    pub span: Range<usize>,
}

/// One import path, optionally renamed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSpec {
    pub name: Option<String>,
    pub path: String,
    pub span: Range<usize>,
}

/// An `import` declaration, grouped or single.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportDecl {
    pub specs: Vec<ImportSpec>,
    pub span: Range<usize>,
    pub doc_start: usize,
    pub grouped: bool,
}

/// A struct field (or several names sharing one type).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructField {
    pub names: Vec<String>,
    /// Tag text without the surrounding quotes.
    pub tag: Option<String>,
    pub embedded: bool,
}

/// A single type spec inside a `type` declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeSpec {
    pub name: String,
    /// Fields when the type is a struct.
    pub structure: Option<Vec<StructField>>,
}

/// Method receiver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receiver {
    pub type_name: String,
    pub pointer: bool,
}

/// A function or method declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuncDecl {
    pub name: String,
    pub receiver: Option<Receiver>,
    /// Range of the body including its braces.
    pub body: Option<Range<usize>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeclKind {
    Type(Vec<TypeSpec>),
    Func(FuncDecl),
    Var(Vec<String>),
    Const(Vec<String>),
}

/// A top-level declaration other than imports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decl {
    pub kind: DeclKind,
    pub span: Range<usize>,
    /// Start of the attached doc comment, or `span.start` when there is none.
    pub doc_start: usize,
}

impl Decl {
    /// Range covering the doc comment and the declaration.
    pub fn full_span(&self) -> Range<usize> {
        self.doc_start..self.span.end
    }
}

/// Parsed Go file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceTree {
    pub package: PackageClause,
    pub imports: Vec<ImportDecl>,
    pub decls: Vec<Decl>,
}

impl SourceTree {
    /// Whether a package-level `var` declares `name`.
    pub fn declares_var(&self, name: &str) -> bool {
        self.decls.iter().any(|decl| match &decl.kind {
            DeclKind::Var(names) => names.iter().any(|n| n == name),
            _ => false,
        })
    }

    /// The import spec for `path`, if imported.
    pub fn import_for(&self, path: &str) -> Option<&ImportSpec> {
        self.imports
            .iter()
            .flat_map(|decl| decl.specs.iter())
            .find(|spec| spec.path == path)
    }

    /// All struct type specs in declaration order.
    pub fn structs(&self) -> impl Iterator<Item = (&str, &[StructField])> {
        self.decls
            .iter()
            .filter_map(|decl| match &decl.kind {
                DeclKind::Type(specs) => Some(specs.iter()),
                _ => None,
            })
            .flatten()
            .filter_map(|spec| {
                spec.structure
                    .as_deref()
                    .map(|fields| (spec.name.as_str(), fields))
            })
    }

    /// All function and method declarations.
    pub fn funcs(&self) -> impl Iterator<Item = &FuncDecl> {
        self.decls.iter().filter_map(|decl| match &decl.kind {
            DeclKind::Func(func) => Some(func),
            _ => None,
        })
    }

    /// A plain function (no receiver) named `name`.
    pub fn find_func(&self, name: &str) -> Option<&FuncDecl> {
        self.funcs()
            .find(|func| func.receiver.is_none() && func.name == name)
    }

    /// End offset of the last import declaration.
    pub fn last_import_end(&self) -> Option<usize> {
        self.imports.last().map(|decl| decl.span.end)
    }
}
