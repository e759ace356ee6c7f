//! Per-file diagnostics and the sink that collects them for a batch.
//!
//! A [`Diagnostic`] pins a message to a line/column in one source file.
//! The [`DiagnosticSink`] keeps the latest list per file: recording a file
//! again replaces whatever was there, so reprocessing never accumulates
//! stale problems.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Severity of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Blocking problem
    Error,
    /// Advisory problem
    Warning,
}

impl Severity {
    /// Severity used for lint findings under the given fail policy.
    pub fn for_lint(fail_on_problems: bool) -> Self {
        if fail_on_problems {
            Severity::Error
        } else {
            Severity::Warning
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// A problem reported against a location in a source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Source file the problem belongs to
    pub file: PathBuf,
    /// Line number (1-indexed)
    pub line: usize,
    /// Column number (1-indexed, 0 when unknown)
    pub column: usize,
    /// Human-readable message
    pub message: String,
    /// Severity of the problem
    pub severity: Severity,
}

impl Diagnostic {
    /// Create a new error diagnostic.
    pub fn error(
        file: impl Into<PathBuf>,
        line: usize,
        column: usize,
        message: impl Into<String>,
    ) -> Self {
        Self { file: file.into(), line, column, message: message.into(), severity: Severity::Error }
    }

    /// Create a new warning diagnostic.
    pub fn warning(
        file: impl Into<PathBuf>,
        line: usize,
        column: usize,
        message: impl Into<String>,
    ) -> Self {
        Self {
            file: file.into(),
            line,
            column,
            message: message.into(),
            severity: Severity::Warning,
        }
    }

    /// Return a copy with the severity replaced.
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Check if this diagnostic is an error.
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}:{}: {}: {}",
            self.file.display(),
            self.line,
            self.column,
            self.severity,
            self.message
        )
    }
}

/// Collects diagnostics for one batch run, keyed by source file.
///
/// Files keep the order in which they were first recorded so reports
/// follow processing order.
#[derive(Debug, Default, Clone)]
pub struct DiagnosticSink {
    order: Vec<PathBuf>,
    by_file: HashMap<PathBuf, Vec<Diagnostic>>,
}

impl DiagnosticSink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the diagnostics for `file`, replacing anything recorded before.
    ///
    /// Recording an empty list clears the file.
    pub fn record(&mut self, file: &Path, diagnostics: Vec<Diagnostic>) {
        if !self.by_file.contains_key(file) {
            self.order.push(file.to_path_buf());
        }
        self.by_file.insert(file.to_path_buf(), diagnostics);
    }

    /// Diagnostics currently recorded for `file`.
    pub fn get(&self, file: &Path) -> &[Diagnostic] {
        self.by_file.get(file).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Iterate over all diagnostics in file order.
    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.order.iter().filter_map(|f| self.by_file.get(f)).flatten()
    }

    /// Owned copy of every recorded diagnostic in file order.
    pub fn all(&self) -> Vec<Diagnostic> {
        self.iter().cloned().collect()
    }

    /// Number of error diagnostics.
    pub fn error_count(&self) -> usize {
        self.iter().filter(|d| d.is_error()).count()
    }

    /// Number of warning diagnostics.
    pub fn warning_count(&self) -> usize {
        self.iter().filter(|d| !d.is_error()).count()
    }

    /// Check if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    /// Pass/fail verdict for the batch.
    ///
    /// Fails on any error; with `fail_on_warnings` also fails on warnings.
    pub fn verdict(&self, fail_on_warnings: bool) -> bool {
        if fail_on_warnings {
            self.is_empty()
        } else {
            self.error_count() == 0
        }
    }

    /// Drop everything recorded so far.
    pub fn clear(&mut self) {
        self.order.clear();
        self.by_file.clear();
    }
}
