//! Error types for the CLI.
//!
//! This module defines all error types used throughout the plugin. Every
//! fatal error names the file it concerns so the top-level report can say
//! which file and which stage failed.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

/// Main error type for CLI operations.
#[derive(Debug, Error)]
pub enum CliError {
    /// Error during source file discovery.
    #[error("Failed to scan directory: {0}")]
    Scan(#[from] ScanError),

    /// A source file (types file or an existing generated file) does not parse.
    #[error("Failed to parse source file: {0}")]
    Parse(#[from] ParseError),

    /// Merging generated code into the registry or translation file failed.
    #[error("Failed to merge {}: {source}", .file.display())]
    Merge {
        file: PathBuf,
        #[source]
        source: MergeError,
    },

    /// The rewritten types file did not pass the formatter gate.
    #[error("Failed to format {}: {source}", .file.display())]
    Format {
        file: PathBuf,
        #[source]
        source: FormatError,
    },

    /// Error loading configuration.
    #[error("Failed to load configuration: {0}")]
    Config(#[from] ConfigError),

    /// Error writing output files.
    #[error("Failed to write output: {0}")]
    Write(#[from] WriteError),

    /// Error reading the goctl plugin payload.
    #[error("Plugin handshake failed: {0}")]
    Plugin(#[from] PluginError),

    /// Generated files are not up to date (reported by `check`).
    #[error("Generated code is out of date: {0}")]
    OutOfDate(String),

    /// Generic IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error during source file discovery.
#[derive(Debug, Error)]
pub enum ScanError {
    /// Directory does not exist.
    #[error("Directory not found: {path}")]
    DirectoryNotFound { path: PathBuf },

    /// No types files found in directory.
    #[error("No files ending in '{suffix}' found in: {path}")]
    NoTypesFiles { path: PathBuf, suffix: String },

    /// Invalid filter pattern.
    #[error("Invalid filter pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    /// Error from ignore crate walker.
    #[error("Walk error: {0}")]
    Walk(#[from] ignore::Error),
}

/// Error during Go source parsing.
#[derive(Debug, Error)]
pub enum ParseError {
    /// Syntax error in Go source.
    #[error("Syntax error in {file}:{line}:{column}: {message}")]
    Syntax {
        file: PathBuf,
        line: usize,
        column: usize,
        message: String,
    },

    /// IO error reading file.
    #[error("Failed to read {file}: {source}")]
    Io {
        file: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Error raised while merging generated code into an existing file.
#[derive(Debug, Error)]
pub enum MergeError {
    /// The merged text does not pass the formatter gate.
    #[error("merged output is not valid Go: {0}")]
    Format(#[from] FormatError),

    /// No location to splice new entries into was found.
    #[error("could not find {anchor} in the existing file")]
    AnchorNotFound { anchor: String },
}

/// Error raised by the formatter gate.
#[derive(Debug, Clone, Error)]
pub enum FormatError {
    /// The text is not syntactically valid Go.
    #[error("{line}:{column}: {message}")]
    Syntax {
        line: usize,
        column: usize,
        message: String,
    },

    /// The external formatter rejected the text.
    #[error("{tool} failed: {message}")]
    Tool { tool: String, message: String },
}

/// Error loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file not found.
    #[error("Configuration file not found: {path}")]
    NotFound { path: PathBuf },

    /// `init` would overwrite an existing file.
    #[error("Configuration file already exists: {path} (use --force to overwrite)")]
    AlreadyExists { path: PathBuf },

    /// Invalid TOML syntax.
    #[error("Invalid TOML in {path}: {message}")]
    InvalidToml { path: PathBuf, message: String },

    /// Invalid configuration value.
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// IO error reading config.
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Error writing output files.
#[derive(Debug, Error)]
pub enum WriteError {
    /// Failed to create directory.
    #[error("Failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write file.
    #[error("Failed to write file {path}: {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Error reading the goctl plugin payload.
#[derive(Debug, Error)]
pub enum PluginError {
    /// Reading stdin failed.
    #[error("failed to read plugin payload: {0}")]
    Read(#[source] std::io::Error),

    /// The payload is not the JSON goctl sends.
    #[error("invalid plugin payload: {0}")]
    Payload(#[from] serde_json::Error),
}

impl ParseError {
    /// Create a syntax error with location information.
    pub fn syntax(file: PathBuf, line: usize, column: usize, message: impl Into<String>) -> Self {
        Self::Syntax {
            file,
            line,
            column,
            message: message.into(),
        }
    }
}

impl ScanError {
    /// Create a directory not found error.
    pub fn not_found(path: PathBuf) -> Self {
        Self::DirectoryNotFound { path }
    }

    /// Create a no types files error.
    pub fn no_types_files(path: PathBuf, suffix: impl Into<String>) -> Self {
        Self::NoTypesFiles {
            path,
            suffix: suffix.into(),
        }
    }

    /// Create an invalid pattern error.
    pub fn invalid_pattern(pattern: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidPattern {
            pattern: pattern.into(),
            message: message.into(),
        }
    }
}

impl MergeError {
    /// Create an anchor-not-found error.
    pub fn anchor_not_found(anchor: impl Into<String>) -> Self {
        Self::AnchorNotFound {
            anchor: anchor.into(),
        }
    }
}

impl ConfigError {
    /// Create an invalid TOML error.
    pub fn invalid_toml(path: PathBuf, message: impl Into<String>) -> Self {
        Self::InvalidToml {
            path,
            message: message.into(),
        }
    }

    /// Create an invalid value error.
    pub fn invalid_value(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.into(),
            message: message.into(),
        }
    }
}

impl CliError {
    /// Wrap a merge failure with the file it concerns.
    pub fn merge(file: impl Into<PathBuf>, source: MergeError) -> Self {
        Self::Merge {
            file: file.into(),
            source,
        }
    }

    /// Wrap a formatter failure with the file it concerns.
    pub fn format(file: impl Into<PathBuf>, source: FormatError) -> Self {
        Self::Format {
            file: file.into(),
            source,
        }
    }
}
