//! Timestamp-based staleness checks.
//!
//! An aggregate is stale when its output is missing or when any source is
//! not strictly older than it. This does not notice content changes that
//! keep the same modification time; `--force` covers that case.
//!
//! # Example
//!
//! ```ignore
//! use minipack::build::{is_stale, FileSystemContext, SourceSet};
//!
//! let ctx = FileSystemContext::new();
//! let sources: SourceSet = vec!["src/a.js".into()].into_iter().collect();
//! if is_stale(&ctx, Path::new("target/app-all.js"), &sources) {
//!     // rebuild
//! }
//! ```

use crate::build::{BatchOutcome, BuildContext, RunReport, SourceSet};
use std::path::Path;

/// Check whether `output` needs to be rebuilt from `sources`.
///
/// A missing output is always stale. An existing output with no sources is
/// never stale. Otherwise the first source the output is not newer than
/// makes it stale.
pub fn is_stale(ctx: &dyn BuildContext, output: &Path, sources: &SourceSet) -> bool {
    if !ctx.artifact_exists(output) {
        return true;
    }
    sources.iter().any(|source| !ctx.is_uptodate(output, source.path()))
}

/// Statistics about an incremental run.
#[derive(Debug, Clone, Default)]
pub struct IncrementalStats {
    /// Number of aggregates that were written
    pub built: usize,
    /// Number of aggregates that were skipped (up to date)
    pub skipped: usize,
    /// Number of batches that failed
    pub failed: usize,
    /// Total number of batches
    pub total: usize,
}

impl IncrementalStats {
    /// Create stats from a run report.
    pub fn from_report(report: &RunReport) -> Self {
        let mut stats = Self { total: report.batches.len(), ..Self::default() };
        for batch in &report.batches {
            match batch.outcome {
                BatchOutcome::Written { .. } => stats.built += 1,
                BatchOutcome::Skipped => stats.skipped += 1,
                BatchOutcome::Failed(_) => stats.failed += 1,
                _ => {}
            }
        }
        stats
    }

    /// Check if any aggregates were skipped.
    pub fn had_skips(&self) -> bool {
        self.skipped > 0
    }

    /// Check if any aggregates were rebuilt.
    pub fn had_rebuilds(&self) -> bool {
        self.built > 0
    }

    /// Get the percentage of batches that were skipped.
    pub fn skip_percentage(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.skipped as f64 / self.total as f64) * 100.0
        }
    }
}

impl std::fmt::Display for IncrementalStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} built, {} skipped, {} failed ({} total)",
            self.built, self.skipped, self.failed, self.total
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::{BatchResult, FileSystemContext};
    use std::fs;
    use std::path::PathBuf;
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    fn create_test_file(dir: &Path, name: &str, age_secs: u64) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, name).unwrap();
        let file = fs::OpenOptions::new().write(true).open(&path).unwrap();
        file.set_modified(SystemTime::now() - Duration::from_secs(age_secs)).unwrap();
        path
    }

    #[test]
    fn test_missing_output_is_stale_even_without_sources() {
        let temp = TempDir::new().unwrap();
        let ctx = FileSystemContext::new();

        assert!(is_stale(&ctx, &temp.path().join("out.js"), &SourceSet::new()));
    }

    #[test]
    fn test_existing_output_without_sources_is_fresh() {
        let temp = TempDir::new().unwrap();
        let output = create_test_file(temp.path(), "out.js", 10);
        let ctx = FileSystemContext::new();

        assert!(!is_stale(&ctx, &output, &SourceSet::new()));
    }

    #[test]
    fn test_output_newer_than_all_sources_is_fresh() {
        let temp = TempDir::new().unwrap();
        let a = create_test_file(temp.path(), "a.js", 300);
        let b = create_test_file(temp.path(), "b.js", 200);
        let output = create_test_file(temp.path(), "out.js", 100);
        let ctx = FileSystemContext::new();

        let sources: SourceSet = vec![a, b].into_iter().collect();
        assert!(!is_stale(&ctx, &output, &sources));
    }

    #[test]
    fn test_one_newer_source_makes_output_stale() {
        let temp = TempDir::new().unwrap();
        let a = create_test_file(temp.path(), "a.js", 300);
        let b = create_test_file(temp.path(), "b.js", 50);
        let output = create_test_file(temp.path(), "out.js", 100);
        let ctx = FileSystemContext::new();

        let sources: SourceSet = vec![a, b].into_iter().collect();
        assert!(is_stale(&ctx, &output, &sources));
    }

    /// Host that reports every artifact as present and current.
    struct EverythingBuilt;

    impl BuildContext for EverythingBuilt {
        fn scan(
            &self,
            _root: &Path,
            _includes: &[String],
            _excludes: &[String],
        ) -> Result<Vec<PathBuf>, crate::build::DiscoveryError> {
            Ok(Vec::new())
        }
        fn artifact_exists(&self, _artifact: &Path) -> bool {
            true
        }
        fn is_uptodate(&self, _artifact: &Path, _source: &Path) -> bool {
            true
        }
        fn write_output(&self, _artifact: &Path, _content: &[u8]) -> std::io::Result<()> {
            Ok(())
        }
        fn has_delta(&self, _source: &Path) -> bool {
            false
        }
        fn remove_messages(&self, _source: &Path) {}
        fn add_message(&self, _diagnostic: &crate::build::Diagnostic) {}
        fn replay_messages(
            &self,
            _source: &Path,
            _severity: crate::build::Severity,
        ) -> Vec<crate::build::Diagnostic> {
            Vec::new()
        }
    }

    #[test]
    fn test_artifact_existence_comes_from_context() {
        let temp = TempDir::new().unwrap();
        let output = temp.path().join("never-written.js");
        let sources: SourceSet = vec![temp.path().join("a.js")].into_iter().collect();

        assert!(!is_stale(&EverythingBuilt, &output, &sources));
        assert!(is_stale(&FileSystemContext::new(), &output, &sources));
    }

    #[test]
    fn test_incremental_stats_from_report() {
        let mut report = RunReport::new();
        report.add_result(BatchResult::new(
            "app",
            BatchOutcome::Written { output: PathBuf::from("app.js"), bytes: 10 },
        ));
        report.add_result(BatchResult::new("css", BatchOutcome::Skipped));
        report.add_result(BatchResult::new("lint", BatchOutcome::Failed("boom".to_string())));

        let stats = IncrementalStats::from_report(&report);
        assert_eq!(stats.built, 1);
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.to_string(), "1 built, 1 skipped, 1 failed (3 total)");
        assert!((stats.skip_percentage() - 33.333).abs() < 0.01);
    }
}
