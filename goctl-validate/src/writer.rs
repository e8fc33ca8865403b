//! File output for generated Go files.
//!
//! [`FileWriter`] writes (or, in dry-run mode, only reports) one file.
//! [`Workspace`] sits in front of it for a whole run so that later files
//! observe what earlier files wrote, even when nothing reaches the disk.

use crate::error::{CliResult, ParseError, WriteError};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Result of a write operation.
#[derive(Debug)]
pub enum WriteResult {
    /// File was written successfully.
    Written {
        /// Path to the written file.
        path: PathBuf,
        /// Number of bytes written.
        bytes: usize,
    },
    /// Dry run - content was not written.
    DryRun {
        /// Content that would have been written.
        content: String,
        /// Path where content would have been written.
        path: PathBuf,
    },
}

/// File writer with dry-run support.
#[derive(Debug)]
pub struct FileWriter {
    /// Whether to run in dry-run mode.
    dry_run: bool,
}

impl FileWriter {
    /// Create a new file writer.
    pub fn new(dry_run: bool) -> Self {
        Self { dry_run }
    }

    /// Write content to a file.
    ///
    /// In dry-run mode, returns the content without writing.
    pub fn write(&self, path: &Path, content: &str) -> CliResult<WriteResult> {
        if self.dry_run {
            return Ok(WriteResult::DryRun {
                content: content.to_string(),
                path: path.to_path_buf(),
            });
        }

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| WriteError::CreateDir {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
            }
        }

        std::fs::write(path, content).map_err(|e| WriteError::WriteFile {
            path: path.to_path_buf(),
            source: e,
        })?;
        debug!(path = %path.display(), bytes = content.len(), "wrote file");

        Ok(WriteResult::Written {
            path: path.to_path_buf(),
            bytes: content.len(),
        })
    }

    /// Check if running in dry-run mode.
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }
}

impl WriteResult {
    /// Get the path associated with this result.
    pub fn path(&self) -> &Path {
        match self {
            WriteResult::Written { path, .. } => path,
            WriteResult::DryRun { path, .. } => path,
        }
    }

    /// Check if the write was successful (not dry-run).
    pub fn was_written(&self) -> bool {
        matches!(self, WriteResult::Written { .. })
    }

    /// Get the number of bytes written (0 for dry-run).
    pub fn bytes(&self) -> usize {
        match self {
            WriteResult::Written { bytes, .. } => *bytes,
            WriteResult::DryRun { .. } => 0,
        }
    }
}

/// Run-scoped view of the files being generated.
///
/// Reads return the latest content committed during this run, falling back
/// to the disk.
#[derive(Debug)]
pub struct Workspace {
    writer: FileWriter,
    overlay: BTreeMap<PathBuf, String>,
}

impl Workspace {
    pub fn new(writer: FileWriter) -> Self {
        Self {
            writer,
            overlay: BTreeMap::new(),
        }
    }

    /// Current content of `path`, or `None` if the file does not exist.
    pub fn read(&self, path: &Path) -> CliResult<Option<String>> {
        if let Some(content) = self.overlay.get(path) {
            return Ok(Some(content.clone()));
        }
        match std::fs::read_to_string(path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ParseError::Io {
                file: path.to_path_buf(),
                source: e,
            }
            .into()),
        }
    }

    /// Write `content` to `path` and remember it for later reads.
    pub fn commit(&mut self, path: &Path, content: String) -> CliResult<WriteResult> {
        let result = self.writer.write(path, &content)?;
        self.overlay.insert(path.to_path_buf(), content);
        Ok(result)
    }

    /// Non-test `.go` files in `dir`, other than those in `exclude`, with
    /// their current content. Sorted by path.
    pub fn package_sources(&self, dir: &Path, exclude: &[&Path]) -> CliResult<Vec<(PathBuf, String)>> {
        let mut paths: Vec<PathBuf> = self
            .overlay
            .keys()
            .filter(|path| path.parent() == Some(dir))
            .cloned()
            .collect();

        match std::fs::read_dir(dir) {
            Ok(entries) => {
                for entry in entries {
                    let entry = entry.map_err(|e| ParseError::Io {
                        file: dir.to_path_buf(),
                        source: e,
                    })?;
                    paths.push(entry.path());
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(ParseError::Io {
                    file: dir.to_path_buf(),
                    source: e,
                }
                .into())
            }
        }

        paths.sort();
        paths.dedup();

        let mut sources = Vec::new();
        for path in paths {
            let is_package_file = path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.ends_with(".go") && !name.ends_with("_test.go"));
            if !is_package_file || exclude.contains(&path.as_path()) {
                continue;
            }
            if let Some(content) = self.read(&path)? {
                sources.push((path, content));
            }
        }
        Ok(sources)
    }

    pub fn is_dry_run(&self) -> bool {
        self.writer.is_dry_run()
    }
}
