//! Built-in minification and lint engines.
//!
//! The engines work on plain text and know nothing about files or builds;
//! problems come back as [`Problem`] values with 1-indexed positions and
//! the transform layer attaches them to source files.

pub mod css;
pub mod js;
pub mod lexer;
pub mod lint;

pub use css::{minify_css, CssOptions};
pub use js::{minify_js, JsMinified, JsOptions};
pub use lint::{JsLinter, LintOptions, MAX_ERRORS};

/// A problem found by an engine at a position in its input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{line}:{column}: {message}")]
pub struct Problem {
    /// Line (1-indexed)
    pub line: usize,
    /// Column (1-indexed, 0 when unknown)
    pub column: usize,
    /// Human-readable message
    pub message: String,
}

impl Problem {
    /// Create a new problem.
    pub fn new(line: usize, column: usize, message: impl Into<String>) -> Self {
        Self { line, column, message: message.into() }
    }
}
