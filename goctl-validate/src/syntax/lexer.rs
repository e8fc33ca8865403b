//! Go tokenizer built on `logos`.
//!
//! Only the token classes the declaration parser needs are distinguished.
//! Comments and newlines are kept in the stream because doc-comment spans and
//! automatic semicolon insertion depend on them.

use logos::Logos;
use std::ops::Range;

use super::tree::SyntaxError;

/// Raw Go token.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    #[regex(r"[ \t\r\f]+")]
    Whitespace,

    #[token("\n")]
    Newline,

    #[regex(r"//[^\n]*", allow_greedy = true)]
    LineComment,

    #[regex(r"/\*([^*]|\*+[^*/])*\*+/")]
    BlockComment,

    #[token("package")]
    Package,

    #[token("import")]
    Import,

    #[token("type")]
    Type,

    #[token("func")]
    Func,

    #[token("var")]
    Var,

    #[token("const")]
    Const,

    #[token("struct")]
    Struct,

    #[token("interface")]
    Interface,

    /// `break`, `continue`, `fallthrough` and `return` end a statement when
    /// they close a line.
    #[token("break")]
    #[token("continue")]
    #[token("fallthrough")]
    #[token("return")]
    FlowKeyword,

    #[regex(r"[A-Za-z_\x{80}-\x{10FFFF}][A-Za-z0-9_\x{80}-\x{10FFFF}]*")]
    Ident,

    #[regex(r"[0-9][0-9A-Za-z_.]*")]
    Number,

    #[regex(r#""([^"\\\n]|\\.)*""#)]
    String,

    #[regex(r"`[^`]*`")]
    RawString,

    #[regex(r"'([^'\\\n]|\\.)*'")]
    Rune,

    #[token("{")]
    LBrace,

    #[token("}")]
    RBrace,

    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    #[token("[")]
    LBracket,

    #[token("]")]
    RBracket,

    #[token(",")]
    Comma,

    #[token(";")]
    Semi,

    #[token(".")]
    Dot,

    #[token("...")]
    Ellipsis,

    #[token("*", priority = 3)]
    Star,

    #[token("=", priority = 3)]
    Assign,

    #[token("++")]
    #[token("--")]
    IncDec,

    #[regex(r"[+\-*/%&|^<>=!:~]+")]
    Operator,
}

impl Token {
    /// Whether the token is a comment.
    pub fn is_comment(self) -> bool {
        matches!(self, Token::LineComment | Token::BlockComment)
    }

    /// Whether a newline right after this token ends the statement.
    pub fn triggers_semicolon(self) -> bool {
        matches!(
            self,
            Token::Ident
                | Token::Number
                | Token::String
                | Token::RawString
                | Token::Rune
                | Token::FlowKeyword
                | Token::IncDec
                | Token::RParen
                | Token::RBracket
                | Token::RBrace
        )
    }

    /// Whether the token opens a bracketed group.
    pub fn is_open(self) -> bool {
        matches!(self, Token::LBrace | Token::LParen | Token::LBracket)
    }

    /// Whether the token closes a bracketed group.
    pub fn is_close(self) -> bool {
        matches!(self, Token::RBrace | Token::RParen | Token::RBracket)
    }

    fn closer(self) -> Option<Token> {
        match self {
            Token::LBrace => Some(Token::RBrace),
            Token::LParen => Some(Token::RParen),
            Token::LBracket => Some(Token::RBracket),
            _ => None,
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            Token::LBrace => "{",
            Token::RBrace => "}",
            Token::LParen => "(",
            Token::RParen => ")",
            Token::LBracket => "[",
            Token::RBracket => "]",
            _ => "token",
        }
    }
}

/// A token with its byte span in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spanned {
    pub token: Token,
    pub span: Range<usize>,
}

/// Tokenize Go source, dropping horizontal whitespace.
///
/// Fails on characters Go does not allow outside literals, on unterminated
/// literals and comments, and on unbalanced brackets.
pub fn tokenize(source: &str) -> Result<Vec<Spanned>, SyntaxError> {
    let mut tokens = Vec::new();
    let mut lexer = Token::lexer(source);

    while let Some(result) = lexer.next() {
        let span = lexer.span();
        match result {
            Ok(Token::Whitespace) => {}
            Ok(Token::Operator) if lexer.slice().contains("/*") => {
                return Err(SyntaxError::at(source, span.start, "comment not terminated"));
            }
            Ok(token) => tokens.push(Spanned { token, span }),
            Err(()) => {
                let message = match lexer.slice().chars().next() {
                    Some('"') | Some('\'') => "string literal not terminated".to_string(),
                    Some('`') => "raw string literal not terminated".to_string(),
                    Some(c) => format!("invalid character {:?}", c),
                    None => "unexpected end of input".to_string(),
                };
                return Err(SyntaxError::at(source, span.start, message));
            }
        }
    }

    check_balanced(source, &tokens)?;
    Ok(tokens)
}

/// Verify that every bracket is closed by its matching counterpart.
fn check_balanced(source: &str, tokens: &[Spanned]) -> Result<(), SyntaxError> {
    let mut stack: Vec<&Spanned> = Vec::new();

    for spanned in tokens {
        if spanned.token.is_open() {
            stack.push(spanned);
        } else if spanned.token.is_close() {
            match stack.pop() {
                Some(open) if open.token.closer() == Some(spanned.token) => {}
                _ => {
                    return Err(SyntaxError::at(
                        source,
                        spanned.span.start,
                        format!("unexpected `{}`", spanned.token.symbol()),
                    ))
                }
            }
        }
    }

    match stack.pop() {
        Some(open) => Err(SyntaxError::at(
            source,
            open.span.start,
            format!("unclosed `{}`", open.token.symbol()),
        )),
        None => Ok(()),
    }
}

/// Find the offset of the bracket that closes the one starting at `open`.
///
/// `open` must be the byte offset of an opening bracket in `source`.
pub fn matching_close(source: &str, open: usize) -> Result<usize, SyntaxError> {
    let tail = &source[open..];
    let mut depth = 0usize;
    let mut lexer = Token::lexer(tail);

    while let Some(result) = lexer.next() {
        let span = lexer.span();
        match result {
            Ok(token) if token.is_open() => depth += 1,
            Ok(token) if token.is_close() => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Ok(open + span.start);
                }
            }
            Ok(_) => {}
            Err(()) => {
                return Err(SyntaxError::at(
                    source,
                    open + span.start,
                    "invalid token inside bracketed group",
                ))
            }
        }
    }

    Err(SyntaxError::at(source, open, "unclosed bracket"))
}

/// Byte ranges of every comment in `source`.
///
/// Unlike [`tokenize`] this never fails; text the lexer rejects is skipped.
pub fn comment_spans(source: &str) -> Vec<Range<usize>> {
    let mut lexer = Token::lexer(source);
    let mut spans = Vec::new();
    while let Some(result) = lexer.next() {
        if matches!(result, Ok(token) if token.is_comment()) {
            spans.push(lexer.span());
        }
    }
    spans
}

/// The last token that is neither whitespace, newline nor comment.
pub fn last_significant(source: &str) -> Option<Spanned> {
    let mut lexer = Token::lexer(source);
    let mut last = None;
    while let Some(result) = lexer.next() {
        match result {
            Ok(Token::Whitespace) | Ok(Token::Newline) => {}
            Ok(token) if token.is_comment() => {}
            Ok(token) => {
                last = Some(Spanned {
                    token,
                    span: lexer.span(),
                })
            }
            Err(()) => last = None,
        }
    }
    last
}
