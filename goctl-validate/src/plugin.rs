//! goctl plugin handshake.
//!
//! goctl runs plugins as `goctl-validate <name>="<flags>"` and writes a JSON
//! description of the API on stdin. [`normalize_args`] turns the first form
//! into ordinary command-line arguments; [`PluginContext`] reads the payload.

use std::io::Read;
use std::path::PathBuf;

use serde::Deserialize;
use tracing::debug;

use crate::error::PluginError;

/// Subcommand used when the plugin arguments do not name one.
pub const DEFAULT_SUBCOMMAND: &str = "plugin";

/// Subcommands accepted as the first word of a plugin argument.
const SUBCOMMANDS: &[&str] = &["generate", "plugin", "check", "init"];

/// Names goctl may use for this plugin.
const PLUGIN_NAMES: &[&str] = &["validate", "goctl-validate"];

/// Rewrite goctl's `name="--flag --other"` argument form.
///
/// Arguments are returned unchanged unless the first one after the program
/// name contains `=` and does not start with `-`.
pub fn normalize_args<I>(args: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let args: Vec<String> = args.into_iter().collect();
    let Some(first) = args.get(1) else {
        return args;
    };
    if first.starts_with('-') {
        return args;
    }
    let Some((_, value)) = first.split_once('=') else {
        return args;
    };

    let words: Vec<&str> = value.trim_matches(|c| c == '"' || c == '\'').split_whitespace().collect();

    let mut normalized = vec![args[0].clone()];
    match words.split_first() {
        Some((command, rest)) if SUBCOMMANDS.contains(command) => {
            normalized.push(command.to_string());
            normalized.extend(rest.iter().map(|w| w.to_string()));
        }
        Some((name, rest)) if PLUGIN_NAMES.contains(name) => {
            normalized.push(DEFAULT_SUBCOMMAND.to_string());
            normalized.extend(rest.iter().map(|w| w.to_string()));
        }
        _ => {
            normalized.push(DEFAULT_SUBCOMMAND.to_string());
            normalized.extend(words.iter().map(|w| w.to_string()));
        }
    }
    normalized.extend(args[2..].iter().cloned());

    debug!(args = ?normalized, "normalized plugin arguments");
    normalized
}

/// The part of goctl's plugin payload this tool uses.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PluginContext {
    /// The `.api` file goctl generated from.
    #[serde(default)]
    pub api_file_path: PathBuf,

    /// Output directory of the generated project.
    pub dir: PathBuf,

    /// File naming style requested from goctl.
    #[serde(default)]
    pub style: String,
}

impl PluginContext {
    /// Read the payload from `reader` (stdin in practice).
    pub fn from_reader(mut reader: impl Read) -> Result<Self, PluginError> {
        let mut payload = String::new();
        reader.read_to_string(&mut payload).map_err(PluginError::Read)?;
        let context: PluginContext = serde_json::from_str(&payload)?;
        debug!(
            dir = %context.dir.display(),
            api = %context.api_file_path.display(),
            "plugin payload"
        );
        Ok(context)
    }
}
