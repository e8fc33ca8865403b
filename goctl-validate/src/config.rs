//! Configuration management for the plugin.
//!
//! This module handles loading configuration from `goctl-validate.toml`
//! files and merging it with command-line arguments.

use crate::error::{CliResult, ConfigError};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default configuration filename.
pub const CONFIG_FILENAME: &str = "goctl-validate.toml";

/// Main configuration structure.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Feature flags.
    pub features: FeaturesConfig,

    /// File and type naming conventions.
    pub naming: NamingConfig,

    /// Formatter gate settings.
    pub format: FormatConfig,

    /// Source discovery settings.
    pub scan: ScanConfig,
}

/// Feature flags configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeaturesConfig {
    /// Register functions for custom rules referenced by request types.
    pub custom_validation: bool,

    /// Maintain the translation file.
    pub translation: bool,

    /// Language of the translation file.
    pub language: Language,
}

/// Naming convention configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NamingConfig {
    /// Struct names ending with this suffix are request types.
    pub request_suffix: String,

    /// Files whose names end with this suffix are scanned.
    pub types_file_suffix: String,

    /// Registry file written next to each types file.
    pub registry_file: String,

    /// Translation file written next to each types file.
    pub translation_file: String,
}

/// Formatter gate configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FormatConfig {
    pub engine: FormatEngine,

    /// Binary used by the `gofmt` engine.
    pub gofmt_path: PathBuf,
}

/// Source discovery configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Whether to skip files ignored by `.gitignore`.
    pub respect_gitignore: bool,
}

/// Translation language.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
pub enum Language {
    #[default]
    #[serde(rename = "zh")]
    #[value(name = "zh")]
    Zh,

    #[serde(rename = "zh_TW")]
    #[value(name = "zh_TW")]
    ZhTw,

    #[serde(rename = "en")]
    #[value(name = "en")]
    En,
}

/// Formatter engine selection.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FormatEngine {
    /// Parse-check and whitespace normalisation.
    #[default]
    Builtin,

    /// Pipe through an external `gofmt`.
    Gofmt,
}

impl Default for FeaturesConfig {
    fn default() -> Self {
        Self {
            custom_validation: true,
            translation: false,
            language: Language::Zh,
        }
    }
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            request_suffix: "Req".to_string(),
            types_file_suffix: "types.go".to_string(),
            registry_file: "validation.go".to_string(),
            translation_file: "translator.go".to_string(),
        }
    }
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            engine: FormatEngine::Builtin,
            gofmt_path: PathBuf::from("gofmt"),
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            respect_gitignore: true,
        }
    }
}

impl Config {
    /// Check values that deserialize fine but cannot work.
    pub fn validate(&self) -> CliResult<()> {
        let naming = &self.naming;
        for (key, value) in [
            ("naming.types_file_suffix", &naming.types_file_suffix),
            ("naming.registry_file", &naming.registry_file),
            ("naming.translation_file", &naming.translation_file),
        ] {
            if value.is_empty() {
                return Err(ConfigError::invalid_value(key, "must not be empty").into());
            }
            if !value.ends_with(".go") {
                return Err(ConfigError::invalid_value(key, "must end with '.go'").into());
            }
        }

        if naming.registry_file == naming.translation_file {
            return Err(ConfigError::invalid_value(
                "naming.translation_file",
                "must differ from naming.registry_file",
            )
            .into());
        }
        if naming.registry_file.ends_with(&naming.types_file_suffix)
            || naming.translation_file.ends_with(&naming.types_file_suffix)
        {
            return Err(ConfigError::invalid_value(
                "naming.types_file_suffix",
                "generated files must not match the types file suffix",
            )
            .into());
        }
        Ok(())
    }
}

/// Configuration manager for loading and merging configs.
pub struct ConfigManager;

impl ConfigManager {
    /// Load configuration from a file path.
    ///
    /// If the path is None, attempts to load from the default location.
    /// If no config file exists there, returns the default configuration.
    /// An explicitly given path must exist.
    pub fn load(path: Option<&Path>) -> CliResult<Config> {
        let config_path = match path {
            Some(path) if !path.exists() => {
                return Err(ConfigError::NotFound {
                    path: path.to_path_buf(),
                }
                .into())
            }
            Some(path) => path.to_path_buf(),
            None => PathBuf::from(CONFIG_FILENAME),
        };

        if !config_path.exists() {
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(&config_path).map_err(|e| ConfigError::Io {
            path: config_path.clone(),
            source: e,
        })?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| ConfigError::invalid_toml(config_path, e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Merge CLI arguments into configuration.
    ///
    /// CLI arguments take precedence over config file values.
    pub fn merge_cli_args(mut config: Config, args: &CliArgs) -> Config {
        if let Some(custom) = args.custom_validation {
            config.features.custom_validation = custom;
        }

        if let Some(translation) = args.translation {
            config.features.translation = translation;
        }

        if let Some(language) = args.language {
            config.features.language = language;
        }

        if let Some(engine) = args.format_engine {
            config.format.engine = engine;
        }

        config
    }

    /// Generate default configuration file content with comments.
    pub fn default_config_content() -> &'static str {
        r#"# goctl-validate configuration file

[features]
# Register a function and a rule-map entry for every custom validate tag
custom_validation = true

# Maintain translator.go with localized error messages
translation = false

# Translation language (zh, zh_TW, en)
language = "zh"

[naming]
# Struct names ending with this suffix get a Validate method even without tags
request_suffix = "Req"

# Files whose names end with this suffix are scanned
types_file_suffix = "types.go"

# Generated files, written next to each types file
registry_file = "validation.go"
translation_file = "translator.go"

[format]
# Formatter gate: "builtin" (parse check + whitespace normalisation) or "gofmt"
engine = "builtin"

# gofmt binary used by the "gofmt" engine
gofmt_path = "gofmt"

[scan]
# Skip files ignored by .gitignore
respect_gitignore = true
"#
    }
}

/// CLI arguments that can override configuration.
#[derive(Debug, Default)]
pub struct CliArgs {
    /// Custom validation override.
    pub custom_validation: Option<bool>,

    /// Translation override.
    pub translation: Option<bool>,

    /// Language override.
    pub language: Option<Language>,

    /// Formatter engine override.
    pub format_engine: Option<FormatEngine>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.features.custom_validation);
        assert!(!config.features.translation);
        assert_eq!(config.features.language, Language::Zh);
        assert_eq!(config.naming.request_suffix, "Req");
        assert_eq!(config.naming.types_file_suffix, "types.go");
        assert_eq!(config.naming.registry_file, "validation.go");
        assert_eq!(config.naming.translation_file, "translator.go");
        assert_eq!(config.format.engine, FormatEngine::Builtin);
        assert!(config.scan.respect_gitignore);
    }

    #[test]
    fn test_merge_cli_args_overrides() {
        let config = Config::default();
        let args = CliArgs {
            translation: Some(true),
            language: Some(Language::En),
            ..Default::default()
        };

        let merged = ConfigManager::merge_cli_args(config, &args);
        assert!(merged.features.translation);
        assert_eq!(merged.features.language, Language::En);
        assert!(merged.features.custom_validation);
    }

    #[test]
    fn test_merge_cli_args_preserves_unset() {
        let mut config = Config::default();
        config.features.custom_validation = false;
        config.format.engine = FormatEngine::Gofmt;

        let merged = ConfigManager::merge_cli_args(config, &CliArgs::default());
        assert!(!merged.features.custom_validation);
        assert_eq!(merged.format.engine, FormatEngine::Gofmt);
    }

    #[test]
    fn test_parse_toml_config() {
        let toml = r#"
[features]
custom_validation = false
translation = true
language = "zh_TW"

[naming]
request_suffix = "Request"

[format]
engine = "gofmt"
gofmt_path = "/usr/local/go/bin/gofmt"
"#;

        let config: Config = toml::from_str(toml).unwrap();
        assert!(!config.features.custom_validation);
        assert!(config.features.translation);
        assert_eq!(config.features.language, Language::ZhTw);
        assert_eq!(config.naming.request_suffix, "Request");
        assert_eq!(config.naming.registry_file, "validation.go");
        assert_eq!(config.format.engine, FormatEngine::Gofmt);
        assert_eq!(
            config.format.gofmt_path,
            PathBuf::from("/usr/local/go/bin/gofmt")
        );
    }

    #[test]
    fn test_default_content_parses_to_defaults() {
        let config: Config = toml::from_str(ConfigManager::default_config_content()).unwrap();
        assert!(config.features.custom_validation);
        assert_eq!(config.naming.types_file_suffix, "types.go");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_clashing_names() {
        let mut config = Config::default();
        config.naming.translation_file = "validation.go".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.naming.registry_file = "validation_types.go".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_missing_explicit_path() {
        let result = ConfigManager::load(Some(Path::new("/nonexistent/goctl-validate.toml")));
        assert!(matches!(
            result,
            Err(crate::error::CliError::Config(ConfigError::NotFound { .. }))
        ));
    }

    #[test]
    fn test_load_reports_invalid_toml() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        std::fs::write(&path, "[features\n").unwrap();

        let result = ConfigManager::load(Some(&path));
        assert!(matches!(
            result,
            Err(crate::error::CliError::Config(ConfigError::InvalidToml { .. }))
        ));
    }
}
