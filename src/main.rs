//! Minipack - command-line tool for aggregating, minifying and linting web assets

use std::process::ExitCode;

use minipack::cli;

fn main() -> ExitCode {
    cli::run()
}
