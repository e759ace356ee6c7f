//! Batch execution.
//!
//! A [`BatchRunner`] drives one [`BatchJob`] at a time through
//! `Idle → Resolving → (Skipped | Checking) → Processing → Flushing → Done`,
//! or into `Failed` from resolving, processing or flushing.
//!
//! # Example
//!
//! ```ignore
//! use minipack::build::{BatchJob, BatchRunner, FileSystemContext};
//!
//! let ctx = FileSystemContext::new();
//! let mut runner = BatchRunner::new(&ctx).with_jobs(4);
//! let report = runner.run_all(&jobs);
//! println!("{}", report.summary());
//! ```

use crate::build::aggregate::{write_artifact, Aggregator};
use crate::build::discovery::{resolve_sources, DiscoveryError, SourceSpec};
use crate::build::incremental::is_stale;
use crate::build::parallel::run_ordered;
use crate::build::{
    BatchOutcome, BatchResult, BuildContext, Diagnostic, DiagnosticSink, RunReport, Severity,
    SourceFile, SourceSet, Transform, TransformError,
};
use crate::engine::{JsLinter, LintOptions};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Error that ends a batch.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum BuildError {
    /// Missing required source directory or conflicting options
    #[error("Configuration error: {0}")]
    Configuration(String),
    /// Sources are required but none were found
    #[error("No sources to process for '{job}'")]
    NoSources {
        /// Batch job name
        job: String,
    },
    /// A source failed to transform
    #[error("{0}")]
    Transform(#[from] TransformError),
    /// Reading a source or writing an artifact failed
    #[error("IO error on {}: {source}", .path.display())]
    Io {
        /// File being read or written
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
    /// Lint problems under a failing policy
    #[error("Lint failed for '{job}': {errors} error(s), {warnings} warning(s)")]
    LintFailure {
        /// Batch job name
        job: String,
        /// Error diagnostics
        errors: usize,
        /// Warning diagnostics
        warnings: usize,
    },
}

impl BuildError {
    /// Wrap an IO error with the path it happened on.
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        BuildError::Io { path: path.to_path_buf(), source }
    }
}

/// Lifecycle state of a batch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    /// Not started
    Idle,
    /// Resolving sources
    Resolving,
    /// Comparing timestamps
    Checking,
    /// Output already up to date
    Skipped,
    /// Transforming or linting sources
    Processing,
    /// Writing the artifact
    Flushing,
    /// Finished successfully
    Done,
    /// Finished with an error
    Failed,
}

impl BatchState {
    /// Check if the state is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, BatchState::Done | BatchState::Failed)
    }
}

impl std::fmt::Display for BatchState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            BatchState::Idle => "idle",
            BatchState::Resolving => "resolving",
            BatchState::Checking => "checking",
            BatchState::Skipped => "skipped",
            BatchState::Processing => "processing",
            BatchState::Flushing => "flushing",
            BatchState::Done => "done",
            BatchState::Failed => "failed",
        };
        write!(f, "{}", name)
    }
}

/// Settings of an aggregate batch.
#[derive(Debug, Clone)]
pub struct AggregateSettings {
    /// Artifact to produce
    pub output: PathBuf,
    /// Per-file transform
    pub transform: Transform,
    /// Append a newline after every file
    pub insert_new_line: bool,
}

/// Settings of a lint batch.
#[derive(Debug, Clone)]
pub struct LintSettings {
    /// Rules to apply
    pub options: LintOptions,
    /// Fail the batch on problems (and report them as errors)
    pub fail: bool,
    /// Count warnings against the verdict too
    pub fail_on_warnings: bool,
}

impl Default for LintSettings {
    fn default() -> Self {
        Self { options: LintOptions::default(), fail: true, fail_on_warnings: false }
    }
}

/// What a batch does with its sources.
#[derive(Debug, Clone)]
pub enum BatchMode {
    /// Concatenate into one artifact
    Aggregate(AggregateSettings),
    /// Report problems only
    Lint(LintSettings),
}

/// One configured unit of work.
#[derive(Debug, Clone)]
pub struct BatchJob {
    /// Name used in logs and reports
    pub name: String,
    /// Where the sources come from
    pub sources: SourceSpec,
    /// What to do with them
    pub mode: BatchMode,
}

impl BatchJob {
    /// Create an aggregate job.
    pub fn aggregate(name: impl Into<String>, sources: SourceSpec, settings: AggregateSettings) -> Self {
        Self { name: name.into(), sources, mode: BatchMode::Aggregate(settings) }
    }

    /// Create a lint job.
    pub fn lint(name: impl Into<String>, sources: SourceSpec, settings: LintSettings) -> Self {
        Self { name: name.into(), sources, mode: BatchMode::Lint(settings) }
    }

    /// Check if this is an aggregate job.
    pub fn is_aggregate(&self) -> bool {
        matches!(self.mode, BatchMode::Aggregate(_))
    }
}

/// Per-file lint result computed before anything is recorded.
enum FileLint {
    Unchanged,
    Linted(Vec<Diagnostic>),
}

/// Runs batch jobs against a build context.
pub struct BatchRunner<'c> {
    ctx: &'c dyn BuildContext,
    state: BatchState,
    history: Vec<BatchState>,
    sink: DiagnosticSink,
    jobs: usize,
    force: bool,
    dry_run: bool,
}

impl<'c> BatchRunner<'c> {
    /// Create a runner using `ctx` for all host interaction.
    pub fn new(ctx: &'c dyn BuildContext) -> Self {
        Self {
            ctx,
            state: BatchState::Idle,
            history: vec![BatchState::Idle],
            sink: DiagnosticSink::new(),
            jobs: 1,
            force: false,
            dry_run: false,
        }
    }

    /// Set the number of worker threads for per-file work.
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    /// Ignore timestamps and lint deltas.
    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Stop aggregate batches after the staleness check.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// State reached by the last run.
    pub fn state(&self) -> BatchState {
        self.state
    }

    /// States visited by the last run, in order.
    pub fn history(&self) -> &[BatchState] {
        &self.history
    }

    /// Diagnostics recorded by the last run.
    pub fn diagnostics(&self) -> &DiagnosticSink {
        &self.sink
    }

    fn enter(&mut self, job: &str, state: BatchState) {
        tracing::debug!(job, from = %self.state, to = %state, "batch state");
        self.state = state;
        self.history.push(state);
    }

    /// Run a single job.
    pub fn run(&mut self, job: &BatchJob) -> Result<BatchResult, BuildError> {
        let start = Instant::now();
        self.sink.clear();
        self.state = BatchState::Idle;
        self.history = vec![BatchState::Idle];

        let result = match &job.mode {
            BatchMode::Aggregate(settings) => self.run_aggregate(job, settings),
            BatchMode::Lint(settings) => self.run_lint(job, settings),
        };

        match result {
            Ok((outcome, passed)) => {
                self.enter(&job.name, BatchState::Done);
                tracing::info!(job = %job.name, outcome = %outcome, "batch finished");
                Ok(BatchResult::new(&job.name, outcome)
                    .with_passed(passed)
                    .with_diagnostics(self.sink.all())
                    .with_duration(start.elapsed()))
            }
            Err(e) => {
                self.enter(&job.name, BatchState::Failed);
                Err(e)
            }
        }
    }

    /// Run every job, turning errors into failed results, then commit the
    /// context's cross-run state unless this is a dry run.
    ///
    /// Jobs are independent: a failing job does not stop the others.
    pub fn run_all(&mut self, jobs: &[BatchJob]) -> RunReport {
        let start = Instant::now();
        let mut report = RunReport::new();

        for job in jobs {
            let job_start = Instant::now();
            let result = match self.run(job) {
                Ok(result) => result,
                Err(e) => {
                    tracing::error!(job = %job.name, error = %e, "batch failed");
                    BatchResult::failed(&job.name, &e)
                        .with_diagnostics(self.sink.all())
                        .with_duration(job_start.elapsed())
                }
            };
            report.add_result(result);
        }

        if self.dry_run {
            tracing::debug!("dry run, lint state not saved");
        } else if let Err(e) = self.ctx.commit() {
            tracing::warn!(error = %e, "could not save lint state");
        }
        report.with_duration(start.elapsed())
    }

    fn resolve(&mut self, job: &BatchJob) -> Result<Option<SourceSet>, BuildError> {
        self.enter(&job.name, BatchState::Resolving);
        let sources = resolve_sources(self.ctx, &job.sources).map_err(|e| match e {
            DiscoveryError::MissingDirectory(dir) => BuildError::Configuration(format!(
                "source directory {} does not exist",
                dir.display()
            )),
            DiscoveryError::InvalidPattern(pattern, err) => {
                BuildError::Configuration(format!("invalid pattern '{}': {}", pattern, err))
            }
            DiscoveryError::Io(err) => BuildError::io(&job.sources.source_directory, err),
        })?;

        if sources.is_empty() {
            if job.sources.required {
                return Err(BuildError::NoSources { job: job.name.clone() });
            }
            tracing::info!(job = %job.name, "no sources to process");
            return Ok(None);
        }
        tracing::debug!(job = %job.name, count = sources.len(), "resolved sources");
        Ok(Some(sources))
    }

    fn run_aggregate(
        &mut self,
        job: &BatchJob,
        settings: &AggregateSettings,
    ) -> Result<(BatchOutcome, bool), BuildError> {
        let Some(sources) = self.resolve(job)? else {
            return Ok((BatchOutcome::Empty, true));
        };

        if !settings.transform.produces_output() {
            return Err(BuildError::Configuration(format!(
                "'{}' uses the {} transform, which produces no output",
                job.name,
                settings.transform.name()
            )));
        }
        if sources.iter().any(|s| same_file(s.path(), &settings.output)) {
            return Err(BuildError::Configuration(format!(
                "output {} of '{}' is also one of its sources",
                settings.output.display(),
                job.name
            )));
        }

        self.enter(&job.name, BatchState::Checking);
        if !self.force && !is_stale(self.ctx, &settings.output, &sources) {
            self.enter(&job.name, BatchState::Skipped);
            return Ok((BatchOutcome::Skipped, true));
        }
        if self.dry_run {
            return Ok((BatchOutcome::Stale, true));
        }

        self.enter(&job.name, BatchState::Processing);
        let buffer = Aggregator::new(settings.transform.clone())
            .with_insert_new_line(settings.insert_new_line)
            .with_jobs(self.jobs)
            .aggregate(self.ctx, &sources, &mut self.sink)?;

        self.enter(&job.name, BatchState::Flushing);
        write_artifact(self.ctx, &settings.output, &buffer)?;

        Ok((BatchOutcome::Written { output: settings.output.clone(), bytes: buffer.len() }, true))
    }

    fn run_lint(
        &mut self,
        job: &BatchJob,
        settings: &LintSettings,
    ) -> Result<(BatchOutcome, bool), BuildError> {
        let Some(sources) = self.resolve(job)? else {
            return Ok((BatchOutcome::Empty, true));
        };

        // Lint has no artifact; change detection happens per file.
        self.enter(&job.name, BatchState::Checking);
        self.enter(&job.name, BatchState::Processing);

        // One engine handle for the whole run, dropped on every exit path.
        let transform = Transform::Lint(JsLinter::new(settings.options.clone()));
        let severity = Severity::for_lint(settings.fail);
        let ctx = self.ctx;
        let force = self.force;

        let results = run_ordered(self.jobs, sources.files(), |file| {
            lint_file(ctx, &transform, file, force)
        });

        let (mut checked, mut cached) = (0, 0);
        for (file, result) in sources.iter().zip(results) {
            let path = file.path();
            match result? {
                FileLint::Unchanged => {
                    let previous = ctx.replay_messages(path, severity);
                    self.sink.record(path, previous);
                    cached += 1;
                }
                FileLint::Linted(diagnostics) => {
                    ctx.remove_messages(path);
                    let diagnostics: Vec<Diagnostic> =
                        diagnostics.into_iter().map(|d| d.with_severity(severity)).collect();
                    for diagnostic in &diagnostics {
                        ctx.add_message(diagnostic);
                    }
                    self.sink.record(path, diagnostics);
                    checked += 1;
                }
            }
        }

        self.enter(&job.name, BatchState::Flushing);

        let passed = self.sink.verdict(settings.fail_on_warnings);
        if settings.fail && !passed {
            return Err(BuildError::LintFailure {
                job: job.name.clone(),
                errors: self.sink.error_count(),
                warnings: self.sink.warning_count(),
            });
        }
        Ok((BatchOutcome::Linted { checked, cached }, passed))
    }
}

fn lint_file(
    ctx: &dyn BuildContext,
    transform: &Transform,
    file: &SourceFile,
    force: bool,
) -> Result<FileLint, BuildError> {
    let path = file.path();
    if !force && !ctx.has_delta(path) {
        tracing::debug!(file = %path.display(), "unchanged since last lint");
        return Ok(FileLint::Unchanged);
    }

    let content = file.read().map_err(|e| BuildError::io(path, e))?;
    tracing::debug!(file = %path.display(), "linting");
    let diagnostics = match transform.apply(path, &content) {
        Ok(out) => out.diagnostics,
        Err(err) => vec![err.diagnostic],
    };
    Ok(FileLint::Linted(diagnostics))
}

/// Compare two paths, resolving them on disk when both exist.
fn same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::report::NullReporter;
    use crate::build::FileSystemContext;
    use crate::engine::JsOptions;
    use tempfile::TempDir;

    fn create_test_file(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    fn quiet_ctx() -> FileSystemContext {
        FileSystemContext::new().with_reporter(NullReporter::new())
    }

    fn js_job(root: &Path, output: PathBuf) -> BatchJob {
        BatchJob::aggregate(
            "app",
            SourceSpec::new(root.join("js"), &["**/*.js"]),
            AggregateSettings {
                output,
                transform: Transform::JsMinify(JsOptions::default()),
                insert_new_line: true,
            },
        )
    }

    #[test]
    fn test_aggregate_state_sequence() {
        let temp = TempDir::new().unwrap();
        create_test_file(temp.path(), "js/a.js", "var a = 1;");
        let ctx = quiet_ctx();
        let mut runner = BatchRunner::new(&ctx);

        let result = runner.run(&js_job(temp.path(), temp.path().join("out/app.js"))).unwrap();

        assert!(matches!(result.outcome, BatchOutcome::Written { bytes: 10, .. }));
        assert_eq!(
            runner.history(),
            &[
                BatchState::Idle,
                BatchState::Resolving,
                BatchState::Checking,
                BatchState::Processing,
                BatchState::Flushing,
                BatchState::Done,
            ]
        );
    }

    #[test]
    fn test_second_run_is_skipped() {
        let temp = TempDir::new().unwrap();
        let source = create_test_file(temp.path(), "js/a.js", "var a = 1;");
        let file = fs::OpenOptions::new().write(true).open(&source).unwrap();
        file.set_modified(std::time::SystemTime::now() - std::time::Duration::from_secs(60))
            .unwrap();

        let ctx = quiet_ctx();
        let job = js_job(temp.path(), temp.path().join("out/app.js"));
        let mut runner = BatchRunner::new(&ctx);
        runner.run(&job).unwrap();

        let again = runner.run(&job).unwrap();
        assert_eq!(again.outcome, BatchOutcome::Skipped);
        assert_eq!(runner.history()[3], BatchState::Skipped);
        assert_eq!(runner.state(), BatchState::Done);

        let mut forced = BatchRunner::new(&ctx).with_force(true);
        assert!(matches!(forced.run(&job).unwrap().outcome, BatchOutcome::Written { .. }));
    }

    #[test]
    fn test_dry_run_reports_stale_without_writing() {
        let temp = TempDir::new().unwrap();
        create_test_file(temp.path(), "js/a.js", "var a = 1;");
        let output = temp.path().join("out/app.js");
        let ctx = quiet_ctx();

        let result = BatchRunner::new(&ctx).with_dry_run(true).run(&js_job(temp.path(), output.clone()));
        assert_eq!(result.unwrap().outcome, BatchOutcome::Stale);
        assert!(!output.exists());
    }

    #[test]
    fn test_missing_required_directory_is_configuration_error() {
        let temp = TempDir::new().unwrap();
        let ctx = quiet_ctx();
        let mut runner = BatchRunner::new(&ctx);

        let err = runner.run(&js_job(temp.path(), temp.path().join("app.js"))).unwrap_err();
        assert!(matches!(err, BuildError::Configuration(_)));
        assert_eq!(runner.state(), BatchState::Failed);
        assert!(!temp.path().join("app.js").exists());
    }

    #[test]
    fn test_empty_required_sources() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("js")).unwrap();
        let ctx = quiet_ctx();

        let err = BatchRunner::new(&ctx)
            .run(&js_job(temp.path(), temp.path().join("app.js")))
            .unwrap_err();
        assert_eq!(err.to_string(), "No sources to process for 'app'");
    }

    #[test]
    fn test_empty_optional_sources() {
        let temp = TempDir::new().unwrap();
        let ctx = quiet_ctx();
        let mut job = js_job(temp.path(), temp.path().join("app.js"));
        job.sources.required = false;

        let result = BatchRunner::new(&ctx).run(&job).unwrap();
        assert_eq!(result.outcome, BatchOutcome::Empty);
    }

    #[test]
    fn test_output_among_sources_is_rejected() {
        let temp = TempDir::new().unwrap();
        create_test_file(temp.path(), "js/a.js", "var a;");
        let ctx = quiet_ctx();

        let err = BatchRunner::new(&ctx)
            .run(&js_job(temp.path(), temp.path().join("js/a.js")))
            .unwrap_err();
        assert!(matches!(err, BuildError::Configuration(msg) if msg.contains("also one of its sources")));
    }

    #[test]
    fn test_lint_policy() {
        let temp = TempDir::new().unwrap();
        create_test_file(temp.path(), "js/a.js", "if (a == b) {}");
        let ctx = quiet_ctx();
        let sources = SourceSpec::new(temp.path().join("js"), &["**/*.js"]);

        let strict = BatchJob::lint("lint", sources.clone(), LintSettings::default());
        let mut runner = BatchRunner::new(&ctx).with_force(true);
        let err = runner.run(&strict).unwrap_err();
        assert!(matches!(err, BuildError::LintFailure { errors: 1, warnings: 0, .. }));
        assert_eq!(runner.diagnostics().error_count(), 1);

        let lax = BatchJob::lint("lint", sources, LintSettings { fail: false, ..LintSettings::default() });
        let result = runner.run(&lax).unwrap();
        assert!(result.is_success());
        assert_eq!(result.warning_count(), 1);
    }

    #[test]
    fn test_cached_lint_problems_follow_current_policy() {
        let temp = TempDir::new().unwrap();
        let state = temp.path().join("state");
        create_test_file(temp.path(), "js/a.js", "if (a == b) {}");
        let sources = SourceSpec::new(temp.path().join("js"), &["**/*.js"]);

        let lax = BatchJob::lint("lint", sources.clone(), LintSettings { fail: false, ..LintSettings::default() });
        let ctx = FileSystemContext::with_state_dir(&state).with_reporter(NullReporter::new());
        let report = BatchRunner::new(&ctx).run_all(&[lax]);
        assert!(report.is_success());

        let strict = BatchJob::lint("lint", sources, LintSettings::default());
        let ctx = FileSystemContext::with_state_dir(&state).with_reporter(NullReporter::new());
        let mut runner = BatchRunner::new(&ctx);
        let err = runner.run(&strict).unwrap_err();
        assert!(matches!(err, BuildError::LintFailure { errors: 1, warnings: 0, .. }));
        assert!(runner.diagnostics().iter().all(|d| d.severity == Severity::Error));
    }

    #[test]
    fn test_dry_run_leaves_state_dir_untouched() {
        let temp = TempDir::new().unwrap();
        let state = temp.path().join("state");
        create_test_file(temp.path(), "js/a.js", "var a = 1;");
        let ctx = FileSystemContext::with_state_dir(&state).with_reporter(NullReporter::new());

        let report = BatchRunner::new(&ctx)
            .with_dry_run(true)
            .run_all(&[js_job(temp.path(), temp.path().join("out/app.js"))]);
        assert_eq!(report.batches[0].outcome, BatchOutcome::Stale);
        assert!(!state.exists());
        assert!(!temp.path().join("out").exists());
    }

    #[test]
    fn test_run_all_continues_after_failure() {
        let temp = TempDir::new().unwrap();
        create_test_file(temp.path(), "js/a.js", "var a = 1;");
        let ctx = quiet_ctx();

        let broken = BatchJob::aggregate(
            "broken",
            SourceSpec::new(temp.path().join("missing"), &["**/*.js"]),
            AggregateSettings {
                output: temp.path().join("broken.js"),
                transform: Transform::Passthrough,
                insert_new_line: true,
            },
        );
        let good = js_job(temp.path(), temp.path().join("out/app.js"));

        let report = BatchRunner::new(&ctx).run_all(&[broken, good]);
        assert_eq!(report.failed_count(), 1);
        assert_eq!(report.written_count(), 1);
        assert!(!report.is_success());
    }
}
