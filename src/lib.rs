//! Minipack - incremental JavaScript/CSS aggregation, minification and linting
//!
//! This library provides functionality to:
//! - Resolve source files from directories, glob patterns or explicit lists
//! - Minify and concatenate them into one artifact, skipping up-to-date outputs
//! - Lint scripts, re-checking only files that changed since the last run

pub mod build;
pub mod cli;
pub mod config;
pub mod engine;
pub mod logging;
