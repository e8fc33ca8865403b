//! Formatter gate.
//!
//! Every file is passed through [`Formatter::finalize`] once, right before
//! it is written. A failure aborts the write of that file.

use std::io::Write;
use std::ops::Range;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use tracing::{debug, warn};

use crate::config::{FormatConfig, FormatEngine};
use crate::error::FormatError;
use crate::syntax::{self, SyntaxError, Token};

/// Final check and normalisation of a Go file.
pub trait Formatter {
    /// Engine name for logs.
    fn name(&self) -> &'static str;

    /// Return the formatted text, or an error if `text` is not valid Go.
    fn finalize(&self, text: &str) -> Result<String, FormatError>;
}

/// Build the formatter selected by `config`.
pub fn formatter_for(config: &FormatConfig) -> Box<dyn Formatter> {
    match config.engine {
        FormatEngine::Builtin => Box::new(BuiltinFormatter),
        FormatEngine::Gofmt => Box::new(GofmtFormatter::new(config.gofmt_path.clone())),
    }
}

impl From<SyntaxError> for FormatError {
    fn from(err: SyntaxError) -> Self {
        FormatError::Syntax {
            line: err.line,
            column: err.column,
            message: err.message,
        }
    }
}

/// Parse check followed by whitespace normalisation.
///
/// Line endings become `\n`, trailing blanks are stripped, runs of blank
/// lines collapse to one and the file ends with exactly one newline. Raw
/// strings and block comments are not touched.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinFormatter;

impl Formatter for BuiltinFormatter {
    fn name(&self) -> &'static str {
        "builtin"
    }

    fn finalize(&self, text: &str) -> Result<String, FormatError> {
        let text = text.replace("\r\n", "\n");
        syntax::parse(&text)?;

        let protected: Vec<Range<usize>> = syntax::tokenize(&text)?
            .into_iter()
            .filter(|t| matches!(t.token, Token::RawString | Token::BlockComment))
            .map(|t| t.span)
            .filter(|span| text[span.clone()].contains('\n'))
            .collect();
        let inside = |offset: usize| protected.iter().any(|r| r.start < offset && offset < r.end);

        let mut out = String::with_capacity(text.len());
        let mut blank_run = 0;
        let mut start = 0;
        while start < text.len() {
            let end = text[start..].find('\n').map_or(text.len(), |i| start + i);
            let line = &text[start..end];

            if inside(end) {
                out.push_str(line);
                out.push('\n');
                blank_run = 0;
            } else {
                let trimmed = line.trim_end_matches([' ', '\t']);
                if trimmed.is_empty() && !inside(start) {
                    blank_run += 1;
                    if blank_run == 1 && !out.is_empty() {
                        out.push('\n');
                    }
                } else {
                    out.push_str(trimmed);
                    out.push('\n');
                    blank_run = 0;
                }
            }
            start = end + 1;
        }

        while out.ends_with("\n\n") {
            out.pop();
        }
        if out.is_empty() {
            out.push('\n');
        }
        Ok(out)
    }
}

/// Pipes the text through an external `gofmt`.
#[derive(Debug, Clone)]
pub struct GofmtFormatter {
    path: PathBuf,
}

impl GofmtFormatter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Formatter for GofmtFormatter {
    fn name(&self) -> &'static str {
        "gofmt"
    }

    fn finalize(&self, text: &str) -> Result<String, FormatError> {
        let spawned = Command::new(&self.path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn();
        let mut child = match spawned {
            Ok(child) => child,
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "cannot run gofmt, using the builtin formatter"
                );
                return BuiltinFormatter.finalize(text);
            }
        };

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(text.as_bytes()).map_err(|e| tool_error(e.to_string()))?;
        }
        let output = child.wait_with_output().map_err(|e| tool_error(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(tool_error(stderr.trim().replace("<standard input>:", "")));
        }
        debug!(bytes = output.stdout.len(), "gofmt succeeded");
        String::from_utf8(output.stdout).map_err(|e| tool_error(e.to_string()))
    }
}

fn tool_error(message: String) -> FormatError {
    FormatError::Tool {
        tool: "gofmt".to_string(),
        message,
    }
}
