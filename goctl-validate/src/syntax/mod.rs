//! Go source syntax: a `logos` lexer and a declaration-level parser.
//!
//! The parser is the source of truth for what a file declares. It is strict
//! enough to reject text that is not valid Go at declaration level
//! (unbalanced brackets, unterminated literals, statements outside function
//! bodies, misplaced imports) while skipping over function bodies.

mod lexer;
mod parse;
mod tree;

pub use lexer::{comment_spans, last_significant, matching_close, tokenize, Spanned, Token};
pub use parse::{parse, unquote};
pub use tree::{
    position, Decl, DeclKind, FuncDecl, ImportDecl, ImportSpec, PackageClause, Receiver,
    SourceTree, StructField, SyntaxError, TypeSpec,
};
