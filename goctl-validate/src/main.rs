//! # goctl-validate
//!
//! goctl plugin that adds go-playground validation to generated request types.
//!
//! ## Usage
//!
//! ```bash
//! # As a goctl plugin
//! goctl api plugin -plugin goctl-validate="validate --translation" -api user.api -dir .
//!
//! # Process a directory directly
//! goctl-validate generate --dir ./internal
//!
//! # Preview changes without writing files
//! goctl-validate generate --dry-run
//!
//! # Initialize configuration
//! goctl-validate init
//!
//! # Verify generated code is up to date (exit code 2 otherwise)
//! goctl-validate check --dir ./internal
//! ```

use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use goctl_validate::{
    config::{CliArgs, Config, ConfigManager, FormatEngine, Language, CONFIG_FILENAME},
    error::{CliError, ConfigError},
    pipeline::{Pipeline, RunReport},
    plugin::{normalize_args, PluginContext},
    writer::WriteResult,
};

#[derive(Parser)]
#[command(name = "goctl-validate")]
#[command(author, version, about = "Add go-playground validation to goctl request types", long_about = None)]
struct Cli {
    /// Print debug traces
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process every types file under a directory
    Generate {
        /// Directory containing generated types files
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,

        /// Preview changes without writing files
        #[arg(long)]
        dry_run: bool,

        #[command(flatten)]
        options: GenerateArgs,
    },

    /// Run as a goctl plugin, reading the payload from stdin
    Plugin {
        #[command(flatten)]
        options: GenerateArgs,
    },

    /// Check that generated code is up to date
    Check {
        /// Directory containing generated types files
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,

        #[command(flatten)]
        options: GenerateArgs,
    },

    /// Initialize a new configuration file
    Init {
        /// Output path for configuration file
        #[arg(short, long, default_value = CONFIG_FILENAME)]
        output: PathBuf,

        /// Overwrite existing configuration file
        #[arg(long)]
        force: bool,
    },
}

/// Options shared by the commands that run the generator.
#[derive(Args)]
struct GenerateArgs {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Register functions for custom validation tags
    #[arg(long = "custom", visible_alias = "custom-validation", overrides_with = "no_custom")]
    custom: bool,

    /// Only register the built-in mobile and idcard rules
    #[arg(long)]
    no_custom: bool,

    /// Maintain the translation file
    #[arg(long, overrides_with = "no_translation")]
    translation: bool,

    /// Do not touch the translation file
    #[arg(long)]
    no_translation: bool,

    /// Language of the translation messages
    #[arg(long, value_enum)]
    language: Option<Language>,

    /// Formatter used before writing
    #[arg(long, value_enum)]
    format_engine: Option<FormatEngine>,

    /// Only process types files whose relative path matches this glob
    #[arg(long)]
    filter: Option<String>,
}

impl GenerateArgs {
    fn cli_args(&self) -> CliArgs {
        CliArgs {
            custom_validation: flag_pair(self.custom, self.no_custom),
            translation: flag_pair(self.translation, self.no_translation),
            language: self.language,
            format_engine: self.format_engine,
        }
    }

    fn load_config(&self) -> Result<Config, CliError> {
        let config = ConfigManager::load(self.config.as_deref())?;
        Ok(ConfigManager::merge_cli_args(config, &self.cli_args()))
    }
}

fn flag_pair(on: bool, off: bool) -> Option<bool> {
    match (on, off) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse_from(normalize_args(std::env::args()));
    init_tracing(cli.debug);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            print_error(&e);
            match e {
                CliError::OutOfDate(_) => ExitCode::from(2),
                _ => ExitCode::FAILURE,
            }
        }
    }
}

fn init_tracing(debug: bool) {
    let default = if debug { "goctl_validate=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .init();
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Generate {
            dir,
            dry_run,
            options,
        } => cmd_generate(&dir, dry_run, &options),

        Commands::Plugin { options } => cmd_plugin(&options),

        Commands::Check { dir, options } => cmd_check(&dir, &options),

        Commands::Init { output, force } => cmd_init(output, force),
    }
}

/// Generate command implementation.
fn cmd_generate(dir: &Path, dry_run: bool, options: &GenerateArgs) -> Result<(), CliError> {
    let config = options.load_config()?;
    run_generate(dir, config, options.filter.as_deref(), dry_run)
}

/// Plugin command implementation.
fn cmd_plugin(options: &GenerateArgs) -> Result<(), CliError> {
    let context = PluginContext::from_reader(std::io::stdin().lock())?;
    let config = options.load_config()?;
    run_generate(&context.dir, config, options.filter.as_deref(), false)
}

/// Run the pipeline once and report what it did.
fn run_generate(
    dir: &Path,
    config: Config,
    filter: Option<&str>,
    dry_run: bool,
) -> Result<(), CliError> {
    println!("{}", "Scanning for types files...".cyan());

    let mut pipeline = Pipeline::new(config, dry_run);
    let files = pipeline.discover(dir, filter)?;
    if files.is_empty() {
        println!(
            "{} No files ending in '{}' found in {}",
            "Warning:".yellow(),
            pipeline.config().naming.types_file_suffix,
            dir.display()
        );
        return Ok(());
    }
    println!("  Found {} types file(s)", files.len().to_string().green());

    println!("{}", "Merging validation code...".cyan());
    let report = pipeline.run(dir, filter)?;
    print_report(&report);

    if report.is_current() {
        println!("{} Everything is up to date", "✓".green());
    }
    Ok(())
}

fn print_report(report: &RunReport) {
    for file in &report.files {
        if file.candidates == 0 {
            println!("  {} {} (no request types)", "-".dimmed(), file.path.display());
            continue;
        }
        println!(
            "  {} {}: {} type(s), {} new Validate method(s), registry {}",
            "•".cyan(),
            file.path.display(),
            file.candidates,
            file.added_methods.len(),
            file.registry
        );
        for conflict in &file.conflicts {
            println!(
                "    {} tag '{}' in {} uses different parameters, keeping the first",
                "Note:".yellow(),
                conflict.tag,
                conflict.type_name
            );
        }

        for write in &file.writes {
            match write {
                WriteResult::Written { path, bytes } => {
                    println!(
                        "    {} Written {} bytes to {}",
                        "✓".green(),
                        bytes,
                        path.display()
                    );
                }
                WriteResult::DryRun { content, path } => {
                    println!(
                        "    {} Would write to {}:",
                        "[dry-run]".yellow(),
                        path.display()
                    );
                    println!("{}", "─".repeat(60).dimmed());
                    println!("{}", content);
                    println!("{}", "─".repeat(60).dimmed());
                }
            }
        }
    }
}

/// Check command implementation.
fn cmd_check(dir: &Path, options: &GenerateArgs) -> Result<(), CliError> {
    println!("{}", "Checking generated validation code...".cyan());

    let config = options.load_config()?;
    let report = Pipeline::new(config, true).run(dir, options.filter.as_deref())?;

    if report.is_current() {
        println!("{} Generated code is up to date", "✓".green());
        return Ok(());
    }

    let changed = report.changed_paths();
    println!("{} Generated code is out of date:", "✗".red());
    for path in &changed {
        println!("  {}", path.display());
    }
    println!("  Run 'goctl-validate generate' to update");
    Err(CliError::OutOfDate(format!(
        "{} file(s) would change",
        changed.len()
    )))
}

/// Init command implementation.
fn cmd_init(output: PathBuf, force: bool) -> Result<(), CliError> {
    if output.exists() && !force {
        return Err(ConfigError::AlreadyExists { path: output }.into());
    }

    let content = ConfigManager::default_config_content();
    std::fs::write(&output, content)?;

    println!(
        "{} Created configuration file: {}",
        "✓".green(),
        output.display()
    );

    Ok(())
}

/// Print an error with formatting.
fn print_error(error: &CliError) {
    eprintln!("{} {}", "Error:".red().bold(), error);
}
