//! # goctl-validate
//!
//! Library behind the `goctl-validate` goctl plugin, which adds
//! go-playground validation to the request types goctl generates.
//!
//! For every `*types.go` file it finds, the plugin:
//!
//! - appends a `Validate()` method to each request type that lacks one;
//! - creates or merges `validation.go`, which registers a function for every
//!   custom validation tag through a `registerValidation` map;
//! - optionally creates or merges `translator.go` with localized messages.
//!
//! Repeated runs are idempotent and hand-written code in the generated files
//! is preserved.
//!
//! ## Architecture
//!
//! - [`scanner`] - discovery of types files
//! - [`syntax`] - Go lexer and declaration-level parser
//! - [`rules`] - `validate` tag extraction and classification
//! - [`parser`] - candidate request types of a file
//! - [`detect`] - recognition of previously generated artifacts
//! - [`delta`] - what is missing from the generated files
//! - [`generator`] - rendering of `validation.go` and `translator.go`
//! - [`injector`] - `Validate` methods in the types file
//! - [`format`] - formatter gate run before every write
//! - [`writer`] - file output and the run-scoped workspace
//! - [`pipeline`] - orchestration of a run
//! - [`plugin`] - goctl plugin handshake
//! - [`config`] - configuration file and CLI overrides
//! - [`error`] - error types

pub mod config;
pub mod delta;
pub mod detect;
pub mod error;
pub mod format;
pub mod generator;
pub mod injector;
pub mod parser;
pub mod pipeline;
pub mod plugin;
pub mod rules;
pub mod scanner;
pub mod syntax;
pub mod writer;

pub use config::{Config, ConfigManager};
pub use error::{CliError, CliResult};
pub use parser::DeclarationParser;
pub use pipeline::{Pipeline, RunReport};
pub use scanner::{SourceFile, SourceScanner};
pub use writer::{FileWriter, Workspace};
