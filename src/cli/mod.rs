//! Command-line interface implementation
//!
//! This module provides the CLI entry point and dispatches to the batch
//! runner in [`build`].

mod build;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use crate::logging::{init_logging, LogConfig};

/// Exit codes
pub(crate) const EXIT_SUCCESS: u8 = 0;
pub(crate) const EXIT_ERROR: u8 = 1;
pub(crate) const EXIT_INVALID_ARGS: u8 = 2;

/// Minipack - aggregate, minify and lint JavaScript and CSS
#[derive(Parser)]
#[command(name = "minipack")]
#[command(about = "Minipack - incremental JavaScript/CSS aggregation, minification and linting")]
#[command(version)]
pub struct Cli {
    /// Path to minipack.toml (default: search upwards from the current directory)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, conflicts_with = "quiet")]
    pub verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Print diagnostics as JSON lines on stdout
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Flags shared by every command that runs batches.
#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Ignore timestamps and lint state; rebuild and re-lint everything
    #[arg(short, long)]
    pub force: bool,

    /// Worker threads for per-file work
    #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..))]
    pub jobs: Option<u32>,

    /// Concatenate without minifying
    #[arg(long)]
    pub nominify: bool,

    /// Insert a line break after this column (0 = never)
    #[arg(long)]
    pub linebreakpos: Option<usize>,

    /// Report lint problems without failing the build
    #[arg(long)]
    pub no_fail: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run every aggregate, then lint
    Build {
        #[command(flatten)]
        args: RunArgs,
    },

    /// Run aggregates only
    Aggregate {
        /// Only run the aggregate with this name
        #[arg(long)]
        only: Option<String>,

        #[command(flatten)]
        args: RunArgs,
    },

    /// Run the lint execution only
    Lint {
        #[command(flatten)]
        args: RunArgs,
    },

    /// Report which aggregates are out of date without writing anything
    Check {
        /// Only check the aggregate with this name
        #[arg(long)]
        only: Option<String>,
    },
}

/// Parse arguments, set up logging and run the selected command.
pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let log_config = LogConfig::from_verbosity(cli.verbose, cli.quiet);
    if let Err(e) = init_logging(&log_config) {
        eprintln!("Warning: could not initialize logging: {}", e);
    }

    let options = build::GlobalOptions { config: cli.config, json: cli.json };
    match cli.command {
        Commands::Build { args } => build::run_batches(&options, build::Selection::All, None, &args),
        Commands::Aggregate { only, args } => {
            build::run_batches(&options, build::Selection::Aggregates, only, &args)
        }
        Commands::Lint { args } => build::run_batches(&options, build::Selection::Lint, None, &args),
        Commands::Check { only } => {
            build::run_batches(&options, build::Selection::Check, only, &RunArgs::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_aggregate_flags() {
        let cli = Cli::parse_from([
            "minipack",
            "aggregate",
            "--only",
            "app",
            "--force",
            "-j",
            "4",
            "--nominify",
            "--linebreakpos",
            "200",
            "-vv",
        ]);
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Aggregate { only, args } => {
                assert_eq!(only.as_deref(), Some("app"));
                assert!(args.force);
                assert_eq!(args.jobs, Some(4));
                assert!(args.nominify);
                assert_eq!(args.linebreakpos, Some(200));
            }
            _ => panic!("expected aggregate"),
        }
    }

    #[test]
    fn test_zero_jobs_rejected() {
        assert!(Cli::try_parse_from(["minipack", "build", "--jobs", "0"]).is_err());
    }

    #[test]
    fn test_global_config_after_subcommand() {
        let cli = Cli::parse_from(["minipack", "lint", "--no-fail", "--config", "web/minipack.toml"]);
        assert_eq!(cli.config, Some(PathBuf::from("web/minipack.toml")));
        assert!(matches!(cli.command, Commands::Lint { args } if args.no_fail));
    }
}
