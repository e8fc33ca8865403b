//! Orchestration of a whole run.
//!
//! Files are processed one after the other. For each types file the
//! registry, the translation file and the types file itself are rendered and
//! passed through the formatter gate; only when all of them pass are they
//! written, registry first and types file last.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::Config;
use crate::delta::{compute_delta, missing_translations, DeltaComputer, RegistryState, RuleConflict, TranslationState};
use crate::detect;
use crate::error::{CliError, CliResult, MergeError, ParseError};
use crate::format::{formatter_for, Formatter};
use crate::generator::{render_registry, render_translation, RegistryInput, RenderOutcome, TranslationInput};
use crate::injector::{self, SHARED_INSTANCE};
use crate::parser::DeclarationParser;
use crate::scanner::{SourceFile, SourceScanner};
use crate::syntax;
use crate::writer::{FileWriter, WriteResult, Workspace};

/// What happened to one types file and the files next to it.
#[derive(Debug)]
pub struct FileReport {
    /// Types file, relative to the scan root.
    pub path: PathBuf,

    /// Number of candidate types found.
    pub candidates: usize,

    /// Types that received a `Validate` method.
    pub added_methods: Vec<String>,

    /// Outcome label of the registry file.
    pub registry: &'static str,

    /// Outcome label of the translation file, when translation is enabled.
    pub translation: Option<&'static str>,

    /// Custom rules used with conflicting parameters.
    pub conflicts: Vec<RuleConflict>,

    /// Writes performed (or simulated) for this file.
    pub writes: Vec<WriteResult>,
}

impl FileReport {
    fn skipped(path: PathBuf) -> Self {
        Self {
            path,
            candidates: 0,
            added_methods: Vec::new(),
            registry: RenderOutcome::Unchanged.label(),
            translation: None,
            conflicts: Vec::new(),
            writes: Vec::new(),
        }
    }
}

/// Result of [`Pipeline::run`].
#[derive(Debug, Default)]
pub struct RunReport {
    pub files: Vec<FileReport>,
}

impl RunReport {
    /// All writes in order.
    pub fn writes(&self) -> impl Iterator<Item = &WriteResult> {
        self.files.iter().flat_map(|file| file.writes.iter())
    }

    /// Paths that were (or would be) written.
    pub fn changed_paths(&self) -> Vec<&Path> {
        self.writes().map(WriteResult::path).collect()
    }

    /// Whether the run found nothing to change.
    pub fn is_current(&self) -> bool {
        self.writes().next().is_none()
    }
}

/// Runs the generator over a directory tree.
pub struct Pipeline {
    config: Config,
    formatter: Box<dyn Formatter>,
    workspace: Workspace,
}

impl Pipeline {
    /// Create a pipeline; with `dry_run` nothing is written to disk.
    pub fn new(config: Config, dry_run: bool) -> Self {
        let formatter = formatter_for(&config.format);
        Self {
            config,
            formatter,
            workspace: Workspace::new(FileWriter::new(dry_run)),
        }
    }

    /// Use `formatter` instead of the configured one.
    pub fn with_formatter(mut self, formatter: Box<dyn Formatter>) -> Self {
        self.formatter = formatter;
        self
    }

    /// Discover the types files under `root` that match `filter`.
    pub fn discover(&self, root: &Path, filter: Option<&str>) -> CliResult<Vec<SourceFile>> {
        let mut scanner = SourceScanner::new(root)
            .with_suffix(&self.config.naming.types_file_suffix)
            .with_gitignore(self.config.scan.respect_gitignore);
        if let Some(pattern) = filter {
            scanner = scanner.with_filter(pattern)?;
        }
        scanner.scan_allow_empty()
    }

    /// Process every types file under `root`.
    ///
    /// The first failing file aborts the run; files processed before it
    /// stay written.
    pub fn run(&mut self, root: &Path, filter: Option<&str>) -> CliResult<RunReport> {
        let files = self.discover(root, filter)?;
        info!(
            root = %root.display(),
            files = files.len(),
            formatter = self.formatter.name(),
            dry_run = self.workspace.is_dry_run(),
            detector = detect::DETECTOR_VERSION,
            "processing types files"
        );

        let mut report = RunReport::default();
        for file in &files {
            report.files.push(self.process_file(file)?);
        }
        Ok(report)
    }

    /// Process one types file.
    pub fn process_file(&mut self, file: &SourceFile) -> CliResult<FileReport> {
        let path = file.path.as_path();
        let source = self.workspace.read(path)?.ok_or_else(|| ParseError::Io {
            file: path.to_path_buf(),
            source: std::io::ErrorKind::NotFound.into(),
        })?;

        let outcome = DeclarationParser::new(&self.config.naming.request_suffix).scan(&source, path)?;
        if outcome.candidates.is_empty() {
            debug!(path = %file.relative_path.display(), "no candidate types, skipping");
            return Ok(FileReport::skipped(file.relative_path.clone()));
        }
        debug!(
            path = %file.relative_path.display(),
            candidates = outcome.candidates.len(),
            "scanned types file"
        );

        let dir = path.parent().unwrap_or(Path::new(""));
        let registry_path = dir.join(&self.config.naming.registry_file);
        let translation_path = dir.join(&self.config.naming.translation_file);
        let package_sources = self.workspace.package_sources(
            dir,
            &[path, registry_path.as_path(), translation_path.as_path()],
        )?;

        // Registry.
        let existing_registry = self.workspace.read(&registry_path)?;
        let state = existing_registry
            .as_deref()
            .map(RegistryState::from_source)
            .unwrap_or_default()
            .with_package_functions(
                package_sources
                    .iter()
                    .flat_map(|(_, source)| detect::declared_functions(source)),
            );
        let computer = DeltaComputer::new(self.config.features.custom_validation);
        let required = computer.required(&outcome.candidates);
        let delta = compute_delta(
            &outcome.candidates,
            &outcome.existing_entry_points,
            &required,
            &state,
        );

        let registry_outcome = render_registry(
            &registry_path,
            existing_registry.as_deref(),
            RegistryInput {
                package: &outcome.package,
                delta: &delta,
                state: &state,
                required: &required,
            },
        )?;
        let registry_label = registry_outcome.label();
        let registry_text = self.finalize_merge(&registry_path, existing_registry.as_deref(), registry_outcome)?;

        // Translation.
        let mut translation_label = None;
        let mut translation_text = None;
        let mut existing_translation = None;
        if self.config.features.translation {
            existing_translation = self.workspace.read(&translation_path)?;
            let translation_state = existing_translation
                .as_deref()
                .map(TranslationState::from_source)
                .unwrap_or_default();
            let missing = missing_translations(&required, &translation_state);
            let translation_outcome = render_translation(
                &translation_path,
                existing_translation.as_deref(),
                TranslationInput {
                    package: &outcome.package,
                    language: self.config.features.language,
                    missing: &missing,
                    state: &translation_state,
                },
            )?;
            translation_label = Some(translation_outcome.label());
            translation_text = self.finalize_merge(
                &translation_path,
                existing_translation.as_deref(),
                translation_outcome,
            )?;
        }

        // Types file.
        let declared_elsewhere = package_sources
            .iter()
            .map(|(_, source)| source.as_str())
            .chain(registry_text.as_deref().or(existing_registry.as_deref()))
            .chain(translation_text.as_deref().or(existing_translation.as_deref()))
            .any(declares_shared_instance);
        let types_text = match injector::inject(
            &source,
            &outcome.tree,
            &delta.missing_entry_point_types,
            declared_elsewhere,
        ) {
            Some(text) => {
                let text = self
                    .formatter
                    .finalize(&text)
                    .map_err(|e| CliError::format(path, e))?;
                (text != source).then_some(text)
            }
            None => None,
        };

        let mut writes = Vec::new();
        for (target, text) in [
            (&registry_path, registry_text),
            (&translation_path, translation_text),
            (&file.path, types_text),
        ] {
            if let Some(text) = text {
                writes.push(self.workspace.commit(target, text)?);
            }
        }

        info!(
            path = %file.relative_path.display(),
            registry = registry_label,
            translation = translation_label.unwrap_or("disabled"),
            methods = delta.missing_entry_point_types.len(),
            "processed types file"
        );

        Ok(FileReport {
            path: file.relative_path.clone(),
            candidates: outcome.candidates.len(),
            added_methods: delta.missing_entry_point_types,
            registry: registry_label,
            translation: translation_label,
            conflicts: delta.conflicts,
            writes,
        })
    }

    /// Pass a rendered file through the formatter gate. Returns the text to
    /// write, or `None` when the file does not change.
    fn finalize_merge(
        &self,
        path: &Path,
        existing: Option<&str>,
        outcome: RenderOutcome,
    ) -> CliResult<Option<String>> {
        let Some(text) = outcome.into_text() else {
            return Ok(None);
        };
        let text = self
            .formatter
            .finalize(&text)
            .map_err(|e| CliError::merge(path, MergeError::Format(e)))?;
        Ok((existing != Some(text.as_str())).then_some(text))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

/// Whether `source` declares the shared validator instance at package level.
fn declares_shared_instance(source: &str) -> bool {
    match syntax::parse(source) {
        Ok(tree) => tree.declares_var(SHARED_INSTANCE),
        Err(_) => detect::declares_validate_var(source),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FormatError;
    use crate::format::BuiltinFormatter;
    use tempfile::TempDir;

    /// Formatter that rejects every file.
    struct RejectingFormatter;

    impl Formatter for RejectingFormatter {
        fn name(&self) -> &'static str {
            "rejecting"
        }

        fn finalize(&self, _text: &str) -> Result<String, FormatError> {
            Err(FormatError::Tool {
                tool: "test".to_string(),
                message: "rejected".to_string(),
            })
        }
    }

    const TYPES: &str = "package types\n\ntype LoginReq struct {\n\tMobile string `json:\"mobile\" validate:\"required,mobile\"`\n}\n";

    fn setup(types: &str) -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let types_dir = dir.path().join("internal/types");
        std::fs::create_dir_all(&types_dir).unwrap();
        std::fs::write(types_dir.join("types.go"), types).unwrap();
        (dir, types_dir)
    }

    #[test]
    fn test_run_writes_registry_then_types() {
        let (dir, types_dir) = setup(TYPES);
        let mut pipeline = Pipeline::new(Config::default(), false);
        let report = pipeline.run(dir.path(), None).unwrap();

        let changed: Vec<_> = report
            .changed_paths()
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(changed, vec!["validation.go", "types.go"]);
        assert_eq!(report.files[0].registry, "created");
        assert_eq!(report.files[0].added_methods, vec!["LoginReq"]);

        let types = std::fs::read_to_string(types_dir.join("types.go")).unwrap();
        assert!(types.contains("func (r *LoginReq) Validate() error"));
        assert!(types.contains("var validate = validator.New()"));
    }

    #[test]
    fn test_second_run_changes_nothing() {
        let (dir, _) = setup(TYPES);
        Pipeline::new(Config::default(), false).run(dir.path(), None).unwrap();
        let report = Pipeline::new(Config::default(), false).run(dir.path(), None).unwrap();
        assert!(report.is_current());
        assert_eq!(report.files[0].registry, "unchanged");
    }

    #[test]
    fn test_file_without_candidates_is_skipped() {
        let (dir, types_dir) = setup("package types\n\ntype Resp struct {\n\tOk bool\n}\n");
        let report = Pipeline::new(Config::default(), false).run(dir.path(), None).unwrap();
        assert!(report.is_current());
        assert!(!types_dir.join("validation.go").exists());
    }

    #[test]
    fn test_shared_instance_in_sibling_file() {
        let (dir, types_dir) = setup(TYPES);
        std::fs::write(
            types_dir.join("shared.go"),
            "package types\n\nvar (\n\tvalidate = validator.New()\n)\n",
        )
        .unwrap();
        Pipeline::new(Config::default(), false)
            .with_formatter(Box::new(BuiltinFormatter))
            .run(dir.path(), None)
            .unwrap();
        let types = std::fs::read_to_string(types_dir.join("types.go")).unwrap();
        assert!(!types.contains("var validate"));
        assert!(!types.contains("import"));
    }

    #[test]
    fn test_dry_run_touches_nothing() {
        let (dir, types_dir) = setup(TYPES);
        let report = Pipeline::new(Config::default(), true).run(dir.path(), None).unwrap();
        assert_eq!(report.changed_paths().len(), 2);
        assert!(!types_dir.join("validation.go").exists());
        assert_eq!(std::fs::read_to_string(types_dir.join("types.go")).unwrap(), TYPES);
    }

    #[test]
    fn test_rejected_registry_writes_nothing() {
        let (dir, types_dir) = setup(TYPES);
        Pipeline::new(Config::default(), false).run(dir.path(), None).unwrap();
        let types = std::fs::read_to_string(types_dir.join("types.go"))
            .unwrap()
            .replace("required,mobile", "required,mobile,uuid");
        std::fs::write(types_dir.join("types.go"), &types).unwrap();
        let registry = std::fs::read_to_string(types_dir.join("validation.go")).unwrap();

        let err = Pipeline::new(Config::default(), false)
            .with_formatter(Box::new(RejectingFormatter))
            .run(dir.path(), None)
            .unwrap_err();
        match err {
            CliError::Merge {
                file,
                source: MergeError::Format(_),
            } => assert!(file.ends_with("validation.go")),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(std::fs::read_to_string(types_dir.join("validation.go")).unwrap(), registry);
        assert_eq!(std::fs::read_to_string(types_dir.join("types.go")).unwrap(), types);
    }

    #[test]
    fn test_rejected_types_file_is_left_alone() {
        let (dir, types_dir) = setup(TYPES);
        Pipeline::new(Config::default(), false).run(dir.path(), None).unwrap();
        let mut types = std::fs::read_to_string(types_dir.join("types.go")).unwrap();
        types.push_str("\ntype LogoutReq struct{}\n");
        std::fs::write(types_dir.join("types.go"), &types).unwrap();

        let err = Pipeline::new(Config::default(), false)
            .with_formatter(Box::new(RejectingFormatter))
            .run(dir.path(), None)
            .unwrap_err();
        match err {
            CliError::Format { file, .. } => assert!(file.ends_with("types.go")),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(std::fs::read_to_string(types_dir.join("types.go")).unwrap(), types);
    }

    #[test]
    fn test_commented_out_method_is_not_existing() {
        let (dir, types_dir) = setup(&format!(
            "{}\n// func (r *LoginReq) Validate() error {{\n// \treturn nil\n// }}\n",
            TYPES
        ));
        Pipeline::new(Config::default(), false).run(dir.path(), None).unwrap();
        let types = std::fs::read_to_string(types_dir.join("types.go")).unwrap();
        assert_eq!(types.matches("\nfunc (r *LoginReq) Validate() error {").count(), 1);
        assert!(syntax::parse(&types).is_ok());
    }

    #[test]
    fn test_commented_out_map_entry_is_added() {
        let (dir, types_dir) = setup(&TYPES.replace("required,mobile", "required,uuid"));
        std::fs::write(
            types_dir.join("validation.go"),
            "package types\n\nimport \"github.com/go-playground/validator/v10\"\n\nvar registerValidation = map[string]validator.Func{\n\t\"idcard\": validateIdCard,\n\t\"mobile\": validateMobile,\n\t// \"uuid\": validateUuid,\n}\n\nfunc validateIdCard(fl validator.FieldLevel) bool {\n\treturn true\n}\n\nfunc validateMobile(fl validator.FieldLevel) bool {\n\treturn true\n}\n",
        )
        .unwrap();
        let report = Pipeline::new(Config::default(), false).run(dir.path(), None).unwrap();
        assert_eq!(report.files[0].registry, "updated");

        let registry = std::fs::read_to_string(types_dir.join("validation.go")).unwrap();
        assert!(registry.contains("\t// \"uuid\": validateUuid,\n\t\"uuid\": validateUuid,\n}"));
        assert_eq!(registry.matches("func validateUuid(").count(), 1);
    }
}
