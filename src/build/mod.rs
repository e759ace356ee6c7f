//! Build pipeline module for minipack
//!
//! Provides the batch engine that turns directories of scripts and
//! stylesheets into aggregated, minified artifacts and lint reports.
//!
//! # Overview
//!
//! The build pipeline consists of:
//! - **Discovery**: Resolve source files from a directory, glob patterns or an explicit list
//! - **Staleness**: Skip aggregates whose artifact is newer than every source
//! - **Execution**: Transform each file, concatenate in order, write once
//!
//! # Example
//!
//! ```ignore
//! use minipack::build::{BatchRunner, FileSystemContext};
//! use minipack::config::load_config;
//!
//! let (config, root) = load_config(None)?;
//! let jobs = config.batch_jobs(&root);
//! let ctx = FileSystemContext::with_state_dir(config.state_dir(&root));
//! let report = BatchRunner::new(&ctx).run_all(&jobs);
//! println!("{}", report.summary());
//! ```

pub mod aggregate;
pub mod context;
pub mod diagnostics;
pub mod discovery;
pub mod incremental;
pub mod manifest;
pub mod parallel;
pub mod pipeline;
pub mod report;
pub mod result;
pub mod source;
pub mod transform;

pub use aggregate::*;
pub use context::*;
pub use diagnostics::*;
pub use discovery::*;
pub use incremental::*;
pub use manifest::*;
pub use pipeline::*;
pub use report::{ConsoleReporter, DiagnosticReporter, JsonReporter, NullReporter};
pub use result::*;
pub use source::*;
pub use transform::*;
