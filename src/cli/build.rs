//! Batch command implementations (build, aggregate, lint, check)

use std::path::PathBuf;
use std::process::ExitCode;

use super::{RunArgs, EXIT_ERROR, EXIT_INVALID_ARGS, EXIT_SUCCESS};
use crate::build::{
    BatchOutcome, BatchRunner, FileSystemContext, IncrementalStats, JsonReporter, RunReport,
};
use crate::config::{load_config, merge_cli_overrides, CliOverrides};

/// Options that apply to every command.
pub struct GlobalOptions {
    /// Explicit config path
    pub config: Option<PathBuf>,
    /// Report diagnostics as JSON lines
    pub json: bool,
}

/// Which batches a command runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// Aggregates then lint
    All,
    /// Aggregates only
    Aggregates,
    /// Lint only
    Lint,
    /// Aggregates, staleness check only
    Check,
}

/// Load the configuration, run the selected batches and map the report to
/// an exit code.
pub fn run_batches(
    options: &GlobalOptions,
    selection: Selection,
    only: Option<String>,
    args: &RunArgs,
) -> ExitCode {
    let (mut config, project_root) = match load_config(options.config.as_deref()) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            return ExitCode::from(EXIT_INVALID_ARGS);
        }
    };

    let overrides = CliOverrides {
        force: args.force.then_some(true),
        jobs: args.jobs.map(|j| j as usize),
        nominify: args.nominify.then_some(true),
        linebreakpos: args.linebreakpos,
        no_fail: args.no_fail.then_some(true),
        only,
    };
    if let Err(e) = merge_cli_overrides(&mut config, &overrides) {
        eprintln!("Error: {}", e);
        return ExitCode::from(EXIT_INVALID_ARGS);
    }

    let jobs = match selection {
        Selection::All => config.batch_jobs(&project_root),
        Selection::Aggregates | Selection::Check => config.aggregate_jobs(&project_root),
        Selection::Lint => match config.lint_job(&project_root) {
            Some(job) => vec![job],
            None => {
                eprintln!("Error: minipack.toml has no [lint] section");
                return ExitCode::from(EXIT_INVALID_ARGS);
            }
        },
    };
    if jobs.is_empty() {
        println!("Nothing to do: no batches configured");
        return ExitCode::from(EXIT_SUCCESS);
    }

    let force = config.build.force;
    let ctx = FileSystemContext::with_state_dir(config.state_dir(&project_root)).with_force(force);
    let ctx = if options.json { ctx.with_reporter(JsonReporter::new()) } else { ctx };

    let mut runner = BatchRunner::new(&ctx)
        .with_jobs(config.build.jobs)
        .with_force(force)
        .with_dry_run(selection == Selection::Check);
    let report = runner.run_all(&jobs);

    if selection == Selection::Check {
        return report_check(&report);
    }

    let stats = IncrementalStats::from_report(&report);
    tracing::debug!(%stats, skipped_pct = stats.skip_percentage(), "run finished");
    if report.is_success() {
        if stats.had_skips() && !force {
            println!("{} ({} skipped - unchanged)", report.summary(), stats.skipped);
        } else {
            println!("{}", report.summary());
        }
        ExitCode::from(EXIT_SUCCESS)
    } else {
        eprintln!("{}", report.summary());
        ExitCode::from(EXIT_ERROR)
    }
}

/// Print one line per aggregate; fail when any is stale or broken.
fn report_check(report: &RunReport) -> ExitCode {
    let mut clean = true;
    for batch in &report.batches {
        match &batch.outcome {
            BatchOutcome::Skipped | BatchOutcome::Empty => {
                println!("{}: {}", batch.job, batch.outcome);
            }
            outcome => {
                clean = false;
                println!("{}: {}", batch.job, outcome);
            }
        }
    }
    if clean {
        ExitCode::from(EXIT_SUCCESS)
    } else {
        ExitCode::from(EXIT_ERROR)
    }
}
