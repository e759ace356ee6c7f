//! Batch result types.
//!
//! Contains types for representing the outcome of aggregate and lint runs.

use crate::build::Diagnostic;
use std::path::PathBuf;
use std::time::Duration;

/// How a single batch ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOutcome {
    /// Aggregate written to `output`
    Written {
        /// Artifact path
        output: PathBuf,
        /// Number of bytes written
        bytes: usize,
    },
    /// Aggregate already up to date
    Skipped,
    /// Aggregate out of date (dry run, nothing written)
    Stale,
    /// Optional sources resolved to nothing
    Empty,
    /// Lint pass completed
    Linted {
        /// Files examined this run
        checked: usize,
        /// Unchanged files whose cached diagnostics were re-reported
        cached: usize,
    },
    /// Batch failed with error
    Failed(String),
}

impl BatchOutcome {
    /// Check if the outcome indicates failure.
    pub fn is_failure(&self) -> bool {
        matches!(self, BatchOutcome::Failed(_))
    }
}

impl std::fmt::Display for BatchOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BatchOutcome::Written { output, bytes } => {
                write!(f, "wrote {} ({} bytes)", output.display(), bytes)
            }
            BatchOutcome::Skipped => write!(f, "up to date"),
            BatchOutcome::Stale => write!(f, "out of date"),
            BatchOutcome::Empty => write!(f, "no sources"),
            BatchOutcome::Linted { checked, cached } => {
                write!(f, "linted {} file(s), {} unchanged", checked, cached)
            }
            BatchOutcome::Failed(err) => write!(f, "failed: {}", err),
        }
    }
}

/// Result of running one batch.
#[derive(Debug, Clone)]
pub struct BatchResult {
    /// Name of the batch job
    pub job: String,
    /// How the batch ended
    pub outcome: BatchOutcome,
    /// Whether every processed source passed
    pub passed: bool,
    /// Diagnostics recorded during the run, in source order
    pub diagnostics: Vec<Diagnostic>,
    /// Batch duration
    pub duration: Duration,
}

impl BatchResult {
    /// Create a result; it passes unless the outcome is a failure.
    pub fn new(job: impl Into<String>, outcome: BatchOutcome) -> Self {
        let passed = !outcome.is_failure();
        Self { job: job.into(), outcome, passed, diagnostics: Vec::new(), duration: Duration::ZERO }
    }

    /// Create a failed result.
    pub fn failed(job: impl Into<String>, error: impl std::fmt::Display) -> Self {
        Self::new(job, BatchOutcome::Failed(error.to_string()))
    }

    /// Attach the diagnostics recorded for this batch.
    pub fn with_diagnostics(mut self, diagnostics: Vec<Diagnostic>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Override the pass flag.
    pub fn with_passed(mut self, passed: bool) -> Self {
        self.passed = passed;
        self
    }

    /// Set the duration.
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Number of error diagnostics.
    pub fn error_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.is_error()).count()
    }

    /// Number of warning diagnostics.
    pub fn warning_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| !d.is_error()).count()
    }

    /// Check if this batch succeeded.
    ///
    /// Lint problems only fail a batch when the fail policy turned them
    /// into a failed outcome.
    pub fn is_success(&self) -> bool {
        !self.outcome.is_failure()
    }
}

/// Result of a complete run over several batches.
#[derive(Debug, Default)]
pub struct RunReport {
    /// Results for each batch, in execution order
    pub batches: Vec<BatchResult>,
    /// Total run duration
    pub total_duration: Duration,
}

impl RunReport {
    /// Create a new empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a batch result.
    pub fn add_result(&mut self, result: BatchResult) {
        self.batches.push(result);
    }

    /// Set the total duration.
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.total_duration = duration;
        self
    }

    /// Number of batches that wrote an artifact.
    pub fn written_count(&self) -> usize {
        self.batches.iter().filter(|b| matches!(b.outcome, BatchOutcome::Written { .. })).count()
    }

    /// Number of batches skipped as up to date.
    pub fn skipped_count(&self) -> usize {
        self.batches.iter().filter(|b| b.outcome == BatchOutcome::Skipped).count()
    }

    /// Number of failed batches.
    pub fn failed_count(&self) -> usize {
        self.batches.iter().filter(|b| b.outcome.is_failure()).count()
    }

    /// Check if the whole run succeeded.
    pub fn is_success(&self) -> bool {
        self.failed_count() == 0
    }

    /// Failed batch results.
    pub fn failures(&self) -> Vec<&BatchResult> {
        self.batches.iter().filter(|b| !b.is_success()).collect()
    }

    /// Every diagnostic recorded during the run.
    pub fn all_diagnostics(&self) -> Vec<&Diagnostic> {
        self.batches.iter().flat_map(|b| b.diagnostics.iter()).collect()
    }

    /// Format a summary of the run.
    pub fn summary(&self) -> String {
        let mut lines = Vec::new();

        let written = self.written_count();
        let skipped = self.skipped_count();
        let failed = self.failed_count();
        let total = self.batches.len();
        let diagnostics = self.all_diagnostics();
        let errors = diagnostics.iter().filter(|d| d.is_error()).count();
        let warnings = diagnostics.len() - errors;

        if failed > 0 {
            lines.push(format!(
                "Build failed: {} written, {} skipped, {} failed ({} total)",
                written, skipped, failed, total
            ));
            for batch in self.failures() {
                lines.push(format!("  - {}: {}", batch.job, batch.outcome));
            }
        } else {
            lines.push(format!(
                "Build succeeded: {} written, {} skipped ({} total) in {:?}",
                written, skipped, total, self.total_duration
            ));
        }

        if errors + warnings > 0 {
            lines.push(format!("Problems: {} error(s), {} warning(s)", errors, warnings));
        }

        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_outcome_display() {
        assert_eq!(BatchOutcome::Skipped.to_string(), "up to date");
        assert_eq!(BatchOutcome::Failed("error".to_string()).to_string(), "failed: error");
        assert_eq!(
            BatchOutcome::Linted { checked: 3, cached: 1 }.to_string(),
            "linted 3 file(s), 1 unchanged"
        );
    }

    #[test]
    fn test_batch_result_counts() {
        let result = BatchResult::new("lint", BatchOutcome::Linted { checked: 2, cached: 0 })
            .with_diagnostics(vec![
                Diagnostic::error("a.js", 1, 1, "x"),
                Diagnostic::warning("a.js", 2, 1, "y"),
                Diagnostic::warning("b.js", 1, 1, "z"),
            ]);

        assert_eq!(result.error_count(), 1);
        assert_eq!(result.warning_count(), 2);
        assert!(result.is_success());
    }

    #[test]
    fn test_failed_result_is_not_success() {
        let result = BatchResult::failed("app", "No sources to process");
        assert!(!result.passed);
        assert!(!result.is_success());
    }

    #[test]
    fn test_run_report_counts() {
        let mut report = RunReport::new();
        report.add_result(BatchResult::new(
            "a",
            BatchOutcome::Written { output: PathBuf::from("a.js"), bytes: 1 },
        ));
        report.add_result(BatchResult::new("b", BatchOutcome::Skipped));
        report.add_result(BatchResult::failed("c", "error"));

        assert_eq!(report.written_count(), 1);
        assert_eq!(report.skipped_count(), 1);
        assert_eq!(report.failed_count(), 1);
        assert!(!report.is_success());
    }

    #[test]
    fn test_run_report_summary_success() {
        let mut report = RunReport::new();
        report.add_result(BatchResult::new(
            "app",
            BatchOutcome::Written { output: PathBuf::from("app.js"), bytes: 10 },
        ));
        let summary = report.with_duration(Duration::from_millis(5)).summary();
        assert!(summary.contains("Build succeeded"));
        assert!(summary.contains("1 written"));
    }

    #[test]
    fn test_run_report_summary_lists_failures() {
        let mut report = RunReport::new();
        report.add_result(BatchResult::failed("app", "a.js:3:1: Unterminated string literal"));
        report.add_result(
            BatchResult::failed("lint", "1 error(s)")
                .with_diagnostics(vec![Diagnostic::error("b.js", 1, 1, "use ===")]),
        );
        report.add_result(
            BatchResult::new("lax", BatchOutcome::Linted { checked: 1, cached: 0 })
                .with_passed(false),
        );

        let summary = report.summary();
        assert!(summary.contains("Build failed: 0 written, 0 skipped, 2 failed (3 total)"));
        assert!(summary.contains("  - app: failed: a.js:3:1: Unterminated string literal"));
        assert!(summary.contains("  - lint: failed: 1 error(s)"));
        assert!(!summary.contains("lax"));
        assert!(summary.contains("Problems: 1 error(s), 0 warning(s)"));
    }
}
