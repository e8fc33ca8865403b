//! Source file scanner for discovering generated Go types files.
//!
//! This module recursively walks a directory looking for files whose names
//! end with the configured suffix (`types.go` by default), respecting
//! `.gitignore` patterns and an optional glob filter.

use crate::error::{CliError, CliResult, ScanError};
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A discovered types file.
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Path to the file.
    pub path: PathBuf,

    /// Path relative to the scan root.
    pub relative_path: PathBuf,
}

/// Scanner for discovering Go types files.
#[derive(Debug)]
pub struct SourceScanner {
    /// Root directory to scan.
    root: PathBuf,

    /// File name suffix that marks a types file.
    suffix: String,

    /// Whether to respect .gitignore files.
    respect_gitignore: bool,

    /// Optional glob filter pattern.
    filter: Option<glob::Pattern>,
}

impl SourceScanner {
    /// Create a new scanner for the given root directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            suffix: "types.go".to_string(),
            respect_gitignore: true,
            filter: None,
        }
    }

    /// Set the file name suffix of types files.
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    /// Set whether to respect .gitignore files.
    pub fn with_gitignore(mut self, respect: bool) -> Self {
        self.respect_gitignore = respect;
        self
    }

    /// Set a glob filter pattern for files.
    ///
    /// Only files whose path relative to the root matches are included.
    pub fn with_filter(mut self, pattern: &str) -> Result<Self, ScanError> {
        let glob_pattern = glob::Pattern::new(pattern)
            .map_err(|e| ScanError::invalid_pattern(pattern, e.to_string()))?;
        self.filter = Some(glob_pattern);
        Ok(self)
    }

    /// Scan the directory and return all types files, sorted by path.
    pub fn scan(&self) -> CliResult<Vec<SourceFile>> {
        if !self.root.is_dir() {
            return Err(ScanError::not_found(self.root.clone()).into());
        }

        let mut files = Vec::new();

        let walker = WalkBuilder::new(&self.root)
            .git_ignore(self.respect_gitignore)
            .git_global(self.respect_gitignore)
            .git_exclude(self.respect_gitignore)
            .require_git(false)
            .hidden(false)
            .build();

        for entry in walker {
            let entry = entry.map_err(ScanError::Walk)?;
            let path = entry.path();

            if !path.is_file() {
                continue;
            }

            let is_types_file = path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.ends_with(&self.suffix));
            if !is_types_file {
                continue;
            }

            let relative = self.relative_path(path);
            if let Some(ref pattern) = self.filter {
                if !pattern.matches_path(&relative) {
                    debug!(path = %relative.display(), "skipped by filter");
                    continue;
                }
            }

            debug!(path = %relative.display(), "discovered types file");
            files.push(SourceFile {
                path: path.to_path_buf(),
                relative_path: relative,
            });
        }

        if files.is_empty() {
            return Err(ScanError::no_types_files(self.root.clone(), self.suffix.clone()).into());
        }

        files.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(files)
    }

    /// Scan without failing on empty results.
    ///
    /// Returns an empty vector if no files are found.
    pub fn scan_allow_empty(&self) -> CliResult<Vec<SourceFile>> {
        match self.scan() {
            Ok(files) => Ok(files),
            Err(CliError::Scan(ScanError::NoTypesFiles { .. })) => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    /// Get the relative path from root.
    fn relative_path(&self, path: &Path) -> PathBuf {
        path.strip_prefix(&self.root).unwrap_or(path).to_path_buf()
    }

    /// Get the root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn create_test_dir() -> TempDir {
        let dir = TempDir::new().unwrap();

        fs::create_dir_all(dir.path().join("internal/types")).unwrap();
        fs::write(dir.path().join("internal/types/types.go"), "package types\n").unwrap();
        fs::write(
            dir.path().join("internal/types/validation.go"),
            "package types\n",
        )
        .unwrap();

        fs::create_dir_all(dir.path().join("admin/types")).unwrap();
        fs::write(dir.path().join("admin/types/usertypes.go"), "package types\n").unwrap();

        fs::write(dir.path().join("README.md"), "# Test").unwrap();

        dir
    }

    #[test]
    fn test_scan_finds_types_files() {
        let dir = create_test_dir();
        let files = SourceScanner::new(dir.path()).scan().unwrap();

        let paths: Vec<_> = files
            .iter()
            .map(|f| f.relative_path.to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(
            paths,
            vec!["admin/types/usertypes.go", "internal/types/types.go"]
        );
    }

    #[test]
    fn test_scan_with_custom_suffix() {
        let dir = create_test_dir();
        let files = SourceScanner::new(dir.path())
            .with_suffix("validation.go")
            .scan()
            .unwrap();

        assert_eq!(files.len(), 1);
        assert!(files[0].path.ends_with("internal/types/validation.go"));
    }

    #[test]
    fn test_scan_with_filter() {
        let dir = create_test_dir();
        let scanner = SourceScanner::new(dir.path())
            .with_filter("internal/**")
            .unwrap();

        let files = scanner.scan().unwrap();

        assert_eq!(files.len(), 1);
        assert!(files[0].path.ends_with("internal/types/types.go"));
    }

    #[test]
    fn test_invalid_filter() {
        let result = SourceScanner::new(".").with_filter("[");
        assert!(matches!(result, Err(ScanError::InvalidPattern { .. })));
    }

    #[test]
    fn test_scan_respects_gitignore() {
        let dir = create_test_dir();
        fs::write(dir.path().join(".gitignore"), "admin/\n").unwrap();

        let files = SourceScanner::new(dir.path()).scan().unwrap();
        assert_eq!(files.len(), 1);

        let files = SourceScanner::new(dir.path())
            .with_gitignore(false)
            .scan()
            .unwrap();
        assert_eq!(files.len(), 2);
    }

    #[test]
    fn test_scan_nonexistent_directory() {
        let scanner = SourceScanner::new("/nonexistent/path");

        let result = scanner.scan();

        assert!(matches!(
            result.unwrap_err(),
            CliError::Scan(ScanError::DirectoryNotFound { .. })
        ));
    }

    #[test]
    fn test_scan_empty_directory() {
        let dir = TempDir::new().unwrap();
        let scanner = SourceScanner::new(dir.path());

        assert!(matches!(
            scanner.scan().unwrap_err(),
            CliError::Scan(ScanError::NoTypesFiles { .. })
        ));
        assert!(scanner.scan_allow_empty().unwrap().is_empty());
    }
}
