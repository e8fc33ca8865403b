//! Rewriting of `init` functions that register validations by hand.
//!
//! Older registry files call `validate.RegisterValidation("tag", fn)` from
//! an `init` function instead of listing tags in the rule map. When such a
//! file is regenerated, only the registration statements are taken out of
//! the `init`; any other statement stays where it was. Function literals
//! passed to a registration come back as [`RegisteredFunction::Literal`] so
//! the caller can declare them as named functions.

use std::ops::Range;

use crate::syntax::{tokenize, unquote, Decl, FuncDecl, Spanned, Token};

/// Function side of a registration statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegisteredFunction {
    /// A function passed by name, possibly qualified.
    Named(String),
    /// A function literal, `func(...) bool { ... }`, as written.
    Literal(String),
}

/// A registration taken out of an `init` body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub tag: String,
    pub function: RegisteredFunction,
}

/// Result of [`rewrite_init`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitRewrite {
    /// The declaration without its registrations, doc comment included.
    /// `None` when nothing else was left in the body.
    pub text: Option<String>,
    pub registrations: Vec<Registration>,
}

/// Take the registration statements out of `init`.
///
/// Recognised statements, with any receiver expression before
/// `.RegisterValidation`:
///
/// - `v.RegisterValidation("tag", fn)`, optionally as `_ = ...`;
/// - `err := v.RegisterValidation(...)` directly followed by
///   `if err != nil { ... }`, removed together;
/// - `if err := v.RegisterValidation(...); err != nil { ... }` without `else`.
///
/// Anything else is left verbatim. Returns `None` when the body does not
/// tokenize.
pub fn rewrite_init(source: &str, decl: &Decl, init: &FuncDecl) -> Option<InitRewrite> {
    let body = init.body.clone()?;
    let inner = body.start + 1..body.end - 1;
    let tokens: Vec<Spanned> = tokenize(&source[inner.clone()])
        .ok()?
        .into_iter()
        .map(|t| Spanned {
            token: t.token,
            span: t.span.start + inner.start..t.span.end + inner.start,
        })
        .collect();

    let statements = split_statements(source, &tokens);
    let mut registrations = Vec::new();
    let mut cuts: Vec<Range<usize>> = Vec::new();
    let mut removed = 0;
    let mut i = 0;
    while i < statements.len() {
        let statement = &statements[i];
        if let Some(registration) = plain_registration(source, statement) {
            registrations.push(registration);
            cuts.push(statement_range(statement));
            removed += 1;
            i += 1;
            continue;
        }
        if let Some(registration) = guarded_registration(source, statement) {
            registrations.push(registration);
            cuts.push(statement_range(statement));
            removed += 1;
            i += 1;
            continue;
        }
        if let Some((err, registration)) = assigned_registration(source, statement) {
            if let Some(check) = statements.get(i + 1).filter(|next| is_err_check(source, next, &err)) {
                registrations.push(registration);
                cuts.push(statement_range(statement).start..statement_range(check).end);
                removed += 2;
                i += 2;
                continue;
            }
        }
        i += 1;
    }

    if registrations.is_empty() {
        return Some(InitRewrite {
            text: Some(source[decl.full_span()].to_string()),
            registrations,
        });
    }
    if removed == statements.len() {
        return Some(InitRewrite {
            text: None,
            registrations,
        });
    }

    let full = decl.full_span();
    let mut text = String::with_capacity(full.len());
    let mut cursor = full.start;
    for cut in cuts {
        let cut = widen_to_lines(source, cut);
        text.push_str(&source[cursor..cut.start]);
        cursor = cut.end;
    }
    text.push_str(&source[cursor..full.end]);
    Some(InitRewrite {
        text: Some(text),
        registrations,
    })
}

/// Declare a lifted function literal under `name`.
///
/// The literal's lines lose one level of indentation.
pub fn lift_literal(name: &str, literal: &str) -> String {
    let mut lines = literal.lines();
    let mut out = String::with_capacity(literal.len() + name.len() + 2);
    if let Some(first) = lines.next() {
        out.push_str("func ");
        out.push_str(name);
        out.push_str(first.strip_prefix("func").unwrap_or(first));
        out.push('\n');
    }
    for line in lines {
        out.push_str(line.strip_prefix('\t').unwrap_or(line));
        out.push('\n');
    }
    out
}

/// Split a body into statements of significant tokens.
///
/// A statement ends at a depth-0 newline after a token that triggers
/// semicolon insertion, or at a depth-0 `;` outside an `if`, `for`,
/// `switch` or `select` header.
fn split_statements<'t>(source: &str, tokens: &'t [Spanned]) -> Vec<Vec<&'t Spanned>> {
    let mut statements = Vec::new();
    let mut current: Vec<&Spanned> = Vec::new();
    let mut depth = 0usize;

    for token in tokens.iter().filter(|t| !t.token.is_comment()) {
        match token.token {
            Token::Newline => {
                let ends = current.last().is_some_and(|last| last.token.triggers_semicolon());
                if depth == 0 && ends {
                    statements.push(std::mem::take(&mut current));
                }
            }
            Token::Semi if depth == 0 && !has_header(source, &current) => {
                if !current.is_empty() {
                    statements.push(std::mem::take(&mut current));
                }
            }
            kind => {
                if kind.is_open() {
                    depth += 1;
                } else if kind.is_close() {
                    depth = depth.saturating_sub(1);
                }
                current.push(token);
            }
        }
    }
    if !current.is_empty() {
        statements.push(current);
    }
    statements
}

fn has_header(source: &str, statement: &[&Spanned]) -> bool {
    statement
        .first()
        .is_some_and(|first| matches!(text(source, first), "if" | "for" | "switch" | "select"))
}

fn text<'s>(source: &'s str, token: &Spanned) -> &'s str {
    &source[token.span.clone()]
}

fn is_ident(source: &str, token: Option<&&Spanned>, expected: &str) -> bool {
    token.is_some_and(|t| t.token == Token::Ident && text(source, t) == expected)
}

fn statement_range(statement: &[&Spanned]) -> Range<usize> {
    let start = statement.first().map_or(0, |t| t.span.start);
    let end = statement.last().map_or(start, |t| t.span.end);
    start..end
}

/// Index of the token closing the group opened at `open`.
fn closing(tokens: &[&Spanned], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, token) in tokens.iter().enumerate().skip(open) {
        if token.token.is_open() {
            depth += 1;
        } else if token.token.is_close() {
            depth = depth.checked_sub(1)?;
            if depth == 0 {
                return Some(i);
            }
        }
    }
    None
}

/// `call` or `_ = call`.
fn plain_registration(source: &str, statement: &[&Spanned]) -> Option<Registration> {
    match statement {
        [blank, assign, call @ ..]
            if assign.token == Token::Assign && text(source, blank) == "_" =>
        {
            registration_call(source, call)
        }
        call => registration_call(source, call),
    }
}

/// `err := call` or `err = call`, returning the variable name.
fn assigned_registration(source: &str, statement: &[&Spanned]) -> Option<(String, Registration)> {
    let [name, assign, call @ ..] = statement else {
        return None;
    };
    if name.token != Token::Ident || !is_assignment(source, assign) || text(source, name) == "_" {
        return None;
    }
    Some((text(source, name).to_string(), registration_call(source, call)?))
}

fn is_assignment(source: &str, token: &Spanned) -> bool {
    token.token == Token::Assign || (token.token == Token::Operator && text(source, token) == ":=")
}

/// `if err := call; err != nil { ... }`.
fn guarded_registration(source: &str, statement: &[&Spanned]) -> Option<Registration> {
    if !is_ident(source, statement.first(), "if") {
        return None;
    }
    let mut depth = 0usize;
    let semi = statement.iter().position(|t| {
        if t.token.is_open() {
            depth += 1;
        } else if t.token.is_close() {
            depth = depth.saturating_sub(1);
        }
        depth == 0 && t.token == Token::Semi
    })?;
    let (_, registration) = assigned_registration(source, &statement[1..semi])?;
    let err = text(source, statement[1]);
    is_err_check_tail(source, &statement[semi + 1..], err).then_some(registration)
}

/// `if err != nil { ... }` without `else`.
fn is_err_check(source: &str, statement: &[&Spanned], err: &str) -> bool {
    is_ident(source, statement.first(), "if") && is_err_check_tail(source, &statement[1..], err)
}

fn is_err_check_tail(source: &str, tokens: &[&Spanned], err: &str) -> bool {
    let [name, op, nil, open, ..] = tokens else {
        return false;
    };
    is_ident(source, Some(name), err)
        && op.token == Token::Operator
        && text(source, op) == "!="
        && is_ident(source, Some(nil), "nil")
        && open.token == Token::LBrace
        && closing(tokens, 3) == Some(tokens.len() - 1)
}

/// `recv.RegisterValidation("tag", fn)` covering all of `call`.
fn registration_call(source: &str, call: &[&Spanned]) -> Option<Registration> {
    let open = call.iter().position(|t| t.token == Token::LParen)?;
    if open < 3 || closing(call, open) != Some(call.len() - 1) {
        return None;
    }

    // Receiver chain: ident (. ident)* . RegisterValidation
    let callee = &call[..open];
    if !is_ident(source, callee.last(), "RegisterValidation") {
        return None;
    }
    let well_formed = callee.iter().enumerate().all(|(i, t)| {
        if i % 2 == 0 {
            t.token == Token::Ident
        } else {
            t.token == Token::Dot
        }
    });
    if !well_formed || callee.len() % 2 == 0 {
        return None;
    }

    let args = split_args(&call[open + 1..call.len() - 1]);
    let [tag, function] = args.as_slice() else {
        return None;
    };
    let [tag] = tag.as_slice() else {
        return None;
    };
    if tag.token != Token::String {
        return None;
    }

    Some(Registration {
        tag: unquote(text(source, tag)),
        function: registered_function(source, function)?,
    })
}

/// Split call arguments at depth-0 commas; a trailing comma is allowed.
fn split_args<'t>(tokens: &[&'t Spanned]) -> Vec<Vec<&'t Spanned>> {
    let mut args = Vec::new();
    let mut current = Vec::new();
    let mut depth = 0usize;
    for token in tokens {
        if token.token == Token::Comma && depth == 0 {
            args.push(std::mem::take(&mut current));
            continue;
        }
        if token.token.is_open() {
            depth += 1;
        } else if token.token.is_close() {
            depth = depth.saturating_sub(1);
        }
        current.push(*token);
    }
    if !current.is_empty() {
        args.push(current);
    }
    args
}

fn registered_function(source: &str, tokens: &[&Spanned]) -> Option<RegisteredFunction> {
    let first = tokens.first()?;
    let last = tokens.last()?;
    if first.token == Token::Func {
        if last.token != Token::RBrace {
            return None;
        }
        return Some(RegisteredFunction::Literal(
            source[first.span.start..last.span.end].to_string(),
        ));
    }

    let qualified = tokens.len() % 2 == 1
        && tokens.iter().enumerate().all(|(i, t)| {
            if i % 2 == 0 {
                t.token == Token::Ident
            } else {
                t.token == Token::Dot
            }
        });
    qualified.then(|| RegisteredFunction::Named(source[first.span.start..last.span.end].to_string()))
}

/// Widen a cut to whole lines when it stands on lines of its own, taking a
/// trailing `;` and line comment with it.
fn widen_to_lines(source: &str, cut: Range<usize>) -> Range<usize> {
    let line_start = source[..cut.start].rfind('\n').map_or(0, |i| i + 1);
    let own_line = source[line_start..cut.start].trim().is_empty();

    let rest = &source[cut.end..];
    let mut end = cut.end + (rest.len() - rest.trim_start_matches([' ', '\t']).len());
    if source[end..].starts_with(';') {
        end += 1;
    }
    if !own_line {
        return cut.start..end;
    }

    let rest = &source[end..];
    let mut end = end + (rest.len() - rest.trim_start_matches([' ', '\t']).len());
    if source[end..].starts_with("//") {
        end = source[end..].find('\n').map_or(source.len(), |i| end + i);
    }
    if source[end..].starts_with('\n') {
        end += 1;
    }
    line_start..end
}
