//! Build context: the host capabilities a batch run relies on.
//!
//! The batch engine never touches the file system for anything other than
//! reading sources; scanning, timestamp comparison, artifact writes,
//! change tracking and problem reporting all go through [`BuildContext`].
//! [`FileSystemContext`] is the implementation used by the CLI.

use crate::build::discovery::{scan_directory, DiscoveryError};
use crate::build::report::{ConsoleReporter, DiagnosticReporter};
use crate::build::{Diagnostic, LintManifest, ManifestError, Severity};
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Capabilities supplied by the host build tool.
pub trait BuildContext: Send + Sync {
    /// List files under `root` matching `includes` and not `excludes`.
    ///
    /// Returns paths relative to `root` with the default excludes applied.
    fn scan(
        &self,
        root: &Path,
        includes: &[String],
        excludes: &[String],
    ) -> Result<Vec<PathBuf>, DiscoveryError>;

    /// Whether `artifact` exists.
    fn artifact_exists(&self, artifact: &Path) -> bool;

    /// Whether `artifact` exists and is strictly newer than `source`.
    fn is_uptodate(&self, artifact: &Path, source: &Path) -> bool;

    /// Replace `artifact` with `content`, creating parent directories.
    fn write_output(&self, artifact: &Path, content: &[u8]) -> io::Result<()>;

    /// Whether `source` changed since the last run that processed it.
    fn has_delta(&self, source: &Path) -> bool;

    /// Forget problems previously reported for `source`.
    fn remove_messages(&self, source: &Path);

    /// Report a problem to the host.
    fn add_message(&self, diagnostic: &Diagnostic);

    /// Re-report the problems recorded for `source` on an earlier run at
    /// `severity` and return them.
    fn replay_messages(&self, source: &Path, severity: Severity) -> Vec<Diagnostic>;

    /// Persist cross-run state at the end of a batch.
    fn commit(&self) -> Result<(), ManifestError> {
        Ok(())
    }
}

/// File-system backed build context.
pub struct FileSystemContext {
    /// Directory holding the lint manifest (none = no persistence)
    state_dir: Option<PathBuf>,
    /// Treat every file as changed
    force: bool,
    /// Lint state shared with rayon workers
    lint: Mutex<LintState>,
    /// Where problems are printed
    reporter: Box<dyn DiagnosticReporter>,
}

/// Manifest plus the files whose messages are being re-recorded this run.
///
/// Messages for files outside `active` (aggregate warnings, for instance)
/// are reported but never persisted.
#[derive(Default)]
struct LintState {
    manifest: LintManifest,
    active: HashSet<PathBuf>,
}

impl std::fmt::Debug for FileSystemContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileSystemContext")
            .field("state_dir", &self.state_dir)
            .field("force", &self.force)
            .finish()
    }
}

impl FileSystemContext {
    /// Create a context without cross-run state.
    pub fn new() -> Self {
        Self {
            state_dir: None,
            force: false,
            lint: Mutex::new(LintState::default()),
            reporter: Box::new(ConsoleReporter::new()),
        }
    }

    /// Create a context persisting lint state in `state_dir`.
    ///
    /// An unreadable or outdated manifest is discarded.
    pub fn with_state_dir(state_dir: impl Into<PathBuf>) -> Self {
        let state_dir = state_dir.into();
        let manifest = match LintManifest::load_from_dir(&state_dir) {
            Ok(found) => found.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(dir = %state_dir.display(), error = %e, "discarding lint manifest");
                LintManifest::new()
            }
        };
        Self {
            state_dir: Some(state_dir),
            lint: Mutex::new(LintState { manifest, active: HashSet::new() }),
            ..Self::new()
        }
    }

    /// Set force mode (every file counts as changed).
    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Use a custom reporter.
    pub fn with_reporter<R: DiagnosticReporter + 'static>(mut self, reporter: R) -> Self {
        self.reporter = Box::new(reporter);
        self
    }
}

impl Default for FileSystemContext {
    fn default() -> Self {
        Self::new()
    }
}

impl BuildContext for FileSystemContext {
    fn scan(
        &self,
        root: &Path,
        includes: &[String],
        excludes: &[String],
    ) -> Result<Vec<PathBuf>, DiscoveryError> {
        scan_directory(root, includes, excludes)
    }

    fn artifact_exists(&self, artifact: &Path) -> bool {
        artifact.exists()
    }

    fn is_uptodate(&self, artifact: &Path, source: &Path) -> bool {
        let artifact_time = fs::metadata(artifact).and_then(|m| m.modified());
        let source_time = fs::metadata(source).and_then(|m| m.modified());
        match (artifact_time, source_time) {
            (Ok(a), Ok(s)) => a > s,
            _ => false,
        }
    }

    fn write_output(&self, artifact: &Path, content: &[u8]) -> io::Result<()> {
        write_atomic(artifact, content)
    }

    fn has_delta(&self, source: &Path) -> bool {
        if self.force {
            return true;
        }
        match self.lint.lock() {
            Ok(lint) => lint.manifest.has_changed(source),
            Err(_) => true,
        }
    }

    fn remove_messages(&self, source: &Path) {
        if let Ok(mut lint) = self.lint.lock() {
            match lint.manifest.begin_file(source) {
                Ok(()) => {
                    lint.active.insert(source.to_path_buf());
                }
                Err(e) => {
                    tracing::debug!(file = %source.display(), error = %e, "not tracking file");
                    lint.manifest.remove(source);
                    lint.active.remove(source);
                }
            }
        }
    }

    fn add_message(&self, diagnostic: &Diagnostic) {
        if let Ok(mut lint) = self.lint.lock() {
            if lint.active.contains(&diagnostic.file) {
                lint.manifest.add_message(&diagnostic.file, diagnostic.clone());
            }
        }
        self.reporter.report(diagnostic);
    }

    fn replay_messages(&self, source: &Path, severity: Severity) -> Vec<Diagnostic> {
        let messages: Vec<Diagnostic> = match self.lint.lock() {
            Ok(lint) => lint
                .manifest
                .messages(source)
                .iter()
                .map(|m| m.clone().with_severity(severity))
                .collect(),
            Err(_) => Vec::new(),
        };
        for message in &messages {
            self.reporter.report(message);
        }
        messages
    }

    fn commit(&self) -> Result<(), ManifestError> {
        let Some(dir) = &self.state_dir else {
            return Ok(());
        };
        match self.lint.lock() {
            Ok(mut lint) => lint.manifest.save_to_dir(dir),
            Err(_) => Ok(()),
        }
    }
}

/// Write `content` to `path` through a sibling temp file and a rename, so
/// readers see either the old artifact or the complete new one.
pub fn write_atomic(path: &Path, content: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let file_name = path
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "artifact has no file name"))?;
    let mut tmp_name = std::ffi::OsString::from(".");
    tmp_name.push(file_name);
    tmp_name.push(".tmp");
    let tmp = path.with_file_name(tmp_name);

    fs::write(&tmp, content)?;
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }
    Ok(())
}
