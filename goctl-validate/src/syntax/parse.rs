//! Declaration-level Go parser.
//!
//! Applies Go's automatic semicolon insertion to the token stream and then
//! walks top-level declarations. Anything below declaration level is skipped
//! by bracket matching.

use std::ops::Range;

use super::lexer::{tokenize, Spanned, Token};
use super::tree::{
    Decl, DeclKind, FuncDecl, ImportDecl, ImportSpec, PackageClause, Receiver, SourceTree,
    StructField, SyntaxError, TypeSpec,
};

/// Parse a Go source file into a [`SourceTree`].
pub fn parse(source: &str) -> Result<SourceTree, SyntaxError> {
    let raw = tokenize(source)?;
    let tokens = insert_semicolons(source, &raw);
    Parser {
        source,
        raw: &raw,
        tokens,
        pos: 0,
    }
    .parse_file()
}

/// Drop comments and turn statement-ending newlines into `Semi` tokens.
fn insert_semicolons(source: &str, raw: &[Spanned]) -> Vec<Spanned> {
    let mut out: Vec<Spanned> = Vec::with_capacity(raw.len());
    let mut last: Option<Token> = None;

    for spanned in raw {
        let is_newline = match spanned.token {
            Token::Newline => true,
            Token::BlockComment => source[spanned.span.clone()].contains('\n'),
            _ => false,
        };

        if is_newline {
            if last.is_some_and(Token::triggers_semicolon) {
                out.push(Spanned {
                    token: Token::Semi,
                    span: spanned.span.start..spanned.span.start,
                });
                last = Some(Token::Semi);
            }
            continue;
        }
        if spanned.token.is_comment() {
            continue;
        }

        last = Some(spanned.token);
        out.push(spanned.clone());
    }

    if last.is_some_and(Token::triggers_semicolon) {
        out.push(Spanned {
            token: Token::Semi,
            span: source.len()..source.len(),
        });
    }
    out
}

struct Parser<'a> {
    source: &'a str,
    raw: &'a [Spanned],
    tokens: Vec<Spanned>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn parse_file(mut self) -> Result<SourceTree, SyntaxError> {
        self.skip_semis();
        let package = self.parse_package()?;

        let mut imports = Vec::new();
        let mut decls = Vec::new();

        loop {
            self.skip_semis();
            let Some(token) = self.peek() else { break };
            match token {
                Token::Import => {
                    if !decls.is_empty() {
                        return Err(self.error_here("imports must appear before other declarations"));
                    }
                    imports.push(self.parse_import()?);
                }
                Token::Type => decls.push(self.parse_type_decl()?),
                Token::Func => decls.push(self.parse_func_decl()?),
                Token::Var | Token::Const => decls.push(self.parse_value_decl()?),
                _ => return Err(self.error_here("non-declaration statement outside function body")),
            }
        }

        Ok(SourceTree {
            package,
            imports,
            decls,
        })
    }

    fn parse_package(&mut self) -> Result<PackageClause, SyntaxError> {
        let start = match self.peek() {
            Some(Token::Package) => self.bump().span.start,
            _ => return Err(self.error_here("expected 'package' clause")),
        };
        let name_token = self.expect(Token::Ident, "expected package name")?;
        let name = self.text(&name_token.span).to_string();
        let span = start..name_token.span.end;
        self.expect_terminator()?;
        Ok(PackageClause { name, span })
    }

    fn parse_import(&mut self) -> Result<ImportDecl, SyntaxError> {
        let keyword = self.bump();
        let doc_start = self.doc_start(keyword.span.start);
        let mut specs = Vec::new();
        let grouped = self.peek() == Some(Token::LParen);

        let end = if grouped {
            self.bump();
            loop {
                self.skip_semis();
                match self.peek() {
                    Some(Token::RParen) => break self.bump().span.end,
                    Some(_) => {
                        specs.push(self.parse_import_spec()?);
                        if self.peek() != Some(Token::RParen) {
                            self.expect(Token::Semi, "expected ';' or ')' after import")?;
                        }
                    }
                    None => return Err(self.error_here("unexpected end of import group")),
                }
            }
        } else {
            let spec = self.parse_import_spec()?;
            let end = spec.span.end;
            specs.push(spec);
            end
        };

        self.expect_terminator()?;
        Ok(ImportDecl {
            specs,
            span: keyword.span.start..end,
            doc_start,
            grouped,
        })
    }

    fn parse_import_spec(&mut self) -> Result<ImportSpec, SyntaxError> {
        let start = self.current_start();
        let name = match self.peek() {
            Some(Token::Ident) | Some(Token::Dot) => {
                let token = self.bump();
                Some(self.text(&token.span).to_string())
            }
            _ => None,
        };
        match self.peek() {
            Some(Token::String) | Some(Token::RawString) => {
                let token = self.bump();
                let path = unquote(self.text(&token.span));
                Ok(ImportSpec {
                    name,
                    path,
                    span: start..token.span.end,
                })
            }
            _ => Err(self.error_here("expected import path")),
        }
    }

    fn parse_type_decl(&mut self) -> Result<Decl, SyntaxError> {
        let keyword = self.bump();
        let doc_start = self.doc_start(keyword.span.start);
        let mut specs = Vec::new();

        let end = if self.peek() == Some(Token::LParen) {
            self.bump();
            loop {
                self.skip_semis();
                match self.peek() {
                    Some(Token::RParen) => break self.bump().span.end,
                    Some(_) => specs.push(self.parse_type_spec()?),
                    None => return Err(self.error_here("unexpected end of type group")),
                }
            }
        } else {
            specs.push(self.parse_type_spec()?);
            self.prev_end()
        };

        self.expect_terminator()?;
        Ok(Decl {
            kind: DeclKind::Type(specs),
            span: keyword.span.start..end,
            doc_start,
        })
    }

    fn parse_type_spec(&mut self) -> Result<TypeSpec, SyntaxError> {
        let name_token = self.expect(Token::Ident, "expected type name")?;
        let name = self.text(&name_token.span).to_string();

        if self.peek() == Some(Token::LBracket) && self.looks_like_type_params() {
            self.skip_group()?;
        }
        if self.peek() == Some(Token::Assign) {
            self.bump();
        }

        let structure = if self.peek() == Some(Token::Struct)
            && self.peek_at(1) == Some(Token::LBrace)
        {
            self.bump();
            Some(self.parse_struct_body()?)
        } else {
            None
        };

        self.skip_to_terminator()?;
        Ok(TypeSpec { name, structure })
    }

    /// Distinguish `Name[T any]` from an array type such as `Name [4]int`.
    fn looks_like_type_params(&self) -> bool {
        let first = self.peek_at(1);
        let second = self.peek_at(2);
        first == Some(Token::Ident)
            && !matches!(second, Some(Token::RBracket) | Some(Token::Dot) | None)
    }

    fn parse_struct_body(&mut self) -> Result<Vec<StructField>, SyntaxError> {
        self.expect(Token::LBrace, "expected '{'")?;
        let mut fields = Vec::new();
        let mut segment: Vec<Spanned> = Vec::new();
        let mut depth = 0usize;

        loop {
            let Some(token) = self.peek() else {
                return Err(self.error_here("unexpected end of struct"));
            };
            if depth == 0 && (token == Token::Semi || token == Token::RBrace) {
                if let Some(field) = self.struct_field(&segment)? {
                    fields.push(field);
                }
                segment.clear();
                self.bump();
                if token == Token::RBrace {
                    return Ok(fields);
                }
                continue;
            }
            if token.is_open() {
                depth += 1;
            } else if token.is_close() {
                depth = depth.saturating_sub(1);
            }
            let spanned = self.bump();
            segment.push(spanned);
        }
    }

    fn struct_field(&self, segment: &[Spanned]) -> Result<Option<StructField>, SyntaxError> {
        let Some(first) = segment.first() else {
            return Ok(None);
        };

        let (body, tag) = match segment.split_last() {
            Some((last, rest))
                if matches!(last.token, Token::String | Token::RawString) && !rest.is_empty() =>
            {
                (rest, Some(unquote(self.text(&last.span))))
            }
            _ => (segment, None),
        };

        let kinds: Vec<Token> = body.iter().map(|s| s.token).collect();
        let embedded = matches!(
            kinds.as_slice(),
            [Token::Ident]
                | [Token::Star, Token::Ident]
                | [Token::Ident, Token::Dot, Token::Ident]
                | [Token::Star, Token::Ident, Token::Dot, Token::Ident]
        );

        if embedded {
            let last = body.last().map_or(first, |s| s);
            return Ok(Some(StructField {
                names: vec![self.text(&last.span).to_string()],
                tag,
                embedded: true,
            }));
        }

        let mut names = Vec::new();
        let mut iter = body.iter().peekable();
        while let Some(spanned) = iter.next() {
            if spanned.token != Token::Ident {
                return Err(SyntaxError::at(
                    self.source,
                    spanned.span.start,
                    "expected field name",
                ));
            }
            names.push(self.text(&spanned.span).to_string());
            match iter.peek() {
                Some(next) if next.token == Token::Comma => {
                    iter.next();
                }
                Some(_) => break,
                None => {
                    return Err(SyntaxError::at(
                        self.source,
                        spanned.span.end,
                        "expected field type",
                    ))
                }
            }
        }

        Ok(Some(StructField {
            names,
            tag,
            embedded: false,
        }))
    }

    fn parse_func_decl(&mut self) -> Result<Decl, SyntaxError> {
        let keyword = self.bump();
        let doc_start = self.doc_start(keyword.span.start);

        let receiver = if self.peek() == Some(Token::LParen) {
            let group = self.skip_group()?;
            Some(self.receiver(group)?)
        } else {
            None
        };

        let name_token = self.expect(Token::Ident, "expected function name")?;
        let name = self.text(&name_token.span).to_string();

        if self.peek() == Some(Token::LBracket) {
            self.skip_group()?;
        }
        if self.peek() != Some(Token::LParen) {
            return Err(self.error_here("expected '(' after function name"));
        }
        self.skip_group()?;

        let mut body = None;
        loop {
            match self.peek() {
                Some(Token::Semi) | None => break,
                Some(Token::Struct) | Some(Token::Interface)
                    if self.peek_at(1) == Some(Token::LBrace) =>
                {
                    self.bump();
                    self.skip_group()?;
                }
                Some(Token::LBrace) => {
                    body = Some(self.skip_group()?);
                    break;
                }
                Some(token) if token.is_open() => {
                    self.skip_group()?;
                }
                Some(token) if token.is_close() => {
                    return Err(self.error_here("unexpected closing bracket"));
                }
                Some(_) => {
                    self.bump();
                }
            }
        }

        let end = self.prev_end();
        self.expect_terminator()?;
        Ok(Decl {
            kind: DeclKind::Func(FuncDecl {
                name,
                receiver,
                body,
            }),
            span: keyword.span.start..end,
            doc_start,
        })
    }

    fn receiver(&self, group: Range<usize>) -> Result<Receiver, SyntaxError> {
        let inner: Vec<&Spanned> = self
            .tokens
            .iter()
            .filter(|s| s.span.start > group.start && s.span.end < group.end)
            .collect();

        let pointer = inner.iter().any(|s| s.token == Token::Star);
        let type_name = inner
            .iter()
            .take_while(|s| s.token != Token::LBracket)
            .filter(|s| s.token == Token::Ident)
            .last()
            .map(|s| self.text(&s.span).to_string());

        match type_name {
            Some(type_name) => Ok(Receiver { type_name, pointer }),
            None => Err(SyntaxError::at(
                self.source,
                group.start,
                "expected receiver type",
            )),
        }
    }

    fn parse_value_decl(&mut self) -> Result<Decl, SyntaxError> {
        let keyword = self.bump();
        let doc_start = self.doc_start(keyword.span.start);
        let mut names = Vec::new();

        let end = if self.peek() == Some(Token::LParen) {
            self.bump();
            loop {
                self.skip_semis();
                match self.peek() {
                    Some(Token::RParen) => break self.bump().span.end,
                    Some(_) => {
                        names.extend(self.value_names()?);
                        self.skip_to_terminator()?;
                    }
                    None => return Err(self.error_here("unexpected end of declaration group")),
                }
            }
        } else {
            names.extend(self.value_names()?);
            self.skip_to_terminator()?;
            self.prev_end()
        };

        self.expect_terminator()?;
        let kind = if keyword.token == Token::Var {
            DeclKind::Var(names)
        } else {
            DeclKind::Const(names)
        };
        Ok(Decl {
            kind,
            span: keyword.span.start..end,
            doc_start,
        })
    }

    fn value_names(&mut self) -> Result<Vec<String>, SyntaxError> {
        let mut names = Vec::new();
        loop {
            let token = self.expect(Token::Ident, "expected identifier")?;
            names.push(self.text(&token.span).to_string());
            if self.peek() == Some(Token::Comma) {
                self.bump();
            } else {
                return Ok(names);
            }
        }
    }

    /// Advance to the `;` or group-closing `)` that ends the current spec.
    fn skip_to_terminator(&mut self) -> Result<(), SyntaxError> {
        loop {
            match self.peek() {
                None | Some(Token::Semi) | Some(Token::RParen) => return Ok(()),
                Some(Token::Package)
                | Some(Token::Import)
                | Some(Token::Type)
                | Some(Token::Var)
                | Some(Token::Const) => {
                    return Err(self.error_here("expected ';' or newline after declaration"));
                }
                Some(token) if token.is_open() => {
                    self.skip_group()?;
                }
                Some(token) if token.is_close() => {
                    return Err(self.error_here("unexpected closing bracket"));
                }
                Some(_) => {
                    self.bump();
                }
            }
        }
    }

    /// Consume a bracketed group and return its byte range.
    fn skip_group(&mut self) -> Result<Range<usize>, SyntaxError> {
        let open = self.bump();
        let mut depth = 1usize;
        while depth > 0 {
            let Some(token) = self.peek() else {
                return Err(SyntaxError::at(self.source, open.span.start, "unclosed bracket"));
            };
            if token.is_open() {
                depth += 1;
            } else if token.is_close() {
                depth -= 1;
            }
            self.bump();
        }
        Ok(open.span.start..self.prev_end())
    }

    /// Start of the comment block that directly precedes `offset`.
    fn doc_start(&self, offset: usize) -> usize {
        let Some(index) = self.raw.iter().position(|s| s.span.start == offset) else {
            return offset;
        };

        let mut start = offset;
        let mut newlines = 0;
        let mut i = index;
        while i > 0 {
            i -= 1;
            let spanned = &self.raw[i];
            match spanned.token {
                Token::Newline => {
                    newlines += 1;
                    if newlines > 1 {
                        break;
                    }
                }
                Token::LineComment | Token::BlockComment => {
                    // A comment trailing another token belongs to that line.
                    if i > 0 && self.raw[i - 1].token != Token::Newline {
                        break;
                    }
                    newlines = 0;
                    start = spanned.span.start;
                }
                _ => break,
            }
        }
        start
    }

    fn expect_terminator(&mut self) -> Result<(), SyntaxError> {
        match self.peek() {
            None => Ok(()),
            Some(Token::Semi) => {
                self.bump();
                Ok(())
            }
            Some(_) => Err(self.error_here("expected ';' or newline after declaration")),
        }
    }

    fn expect(&mut self, token: Token, message: &str) -> Result<Spanned, SyntaxError> {
        if self.peek() == Some(token) {
            Ok(self.bump())
        } else {
            Err(self.error_here(message))
        }
    }

    fn skip_semis(&mut self) {
        while self.peek() == Some(Token::Semi) {
            self.pos += 1;
        }
    }

    fn peek(&self) -> Option<Token> {
        self.peek_at(0)
    }

    fn peek_at(&self, n: usize) -> Option<Token> {
        self.tokens.get(self.pos + n).map(|s| s.token)
    }

    fn bump(&mut self) -> Spanned {
        let spanned = self.tokens.get(self.pos).cloned().unwrap_or(Spanned {
            token: Token::Semi,
            span: self.source.len()..self.source.len(),
        });
        self.pos += 1;
        spanned
    }

    fn prev_end(&self) -> usize {
        self.pos
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .map_or(0, |s| s.span.end)
    }

    fn current_start(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map_or(self.source.len(), |s| s.span.start)
    }

    fn text(&self, span: &Range<usize>) -> &'a str {
        &self.source[span.clone()]
    }

    fn error_here(&self, message: &str) -> SyntaxError {
        let found = match self.tokens.get(self.pos) {
            Some(s) if s.span.is_empty() => "newline".to_string(),
            Some(s) => format!("`{}`", self.text(&s.span)),
            None => "end of file".to_string(),
        };
        SyntaxError::at(
            self.source,
            self.current_start(),
            format!("{}, found {}", message, found),
        )
    }
}

/// Strip quotes from a Go string literal and resolve simple escapes.
pub fn unquote(literal: &str) -> String {
    if let Some(inner) = literal
        .strip_prefix('`')
        .and_then(|s| s.strip_suffix('`'))
    {
        return inner.to_string();
    }

    let inner = literal
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(literal);

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}
