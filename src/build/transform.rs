//! Per-file transforms.
//!
//! A [`Transform`] turns the bytes of one source file into output bytes
//! and/or diagnostics. The aggregator and batch runner only ever see this
//! type, never the engines behind it.

use crate::build::Diagnostic;
use crate::engine::{self, CssOptions, JsLinter, JsOptions, Problem};
use std::path::{Path, PathBuf};

/// A source file could not be transformed.
///
/// Carries the ERROR diagnostic describing where and why.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}:{}:{}: {}", .diagnostic.file.display(), .diagnostic.line, .diagnostic.column, .diagnostic.message)]
pub struct TransformError {
    /// The originating diagnostic
    pub diagnostic: Diagnostic,
}

impl TransformError {
    /// Create an error for `file` from an engine problem.
    pub fn new(file: &Path, problem: Problem) -> Self {
        Self { diagnostic: Diagnostic::error(file, problem.line, problem.column, problem.message) }
    }

    /// File the error belongs to.
    pub fn file(&self) -> &Path {
        &self.diagnostic.file
    }
}

/// Result of applying a transform to one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransformOutput {
    /// Transformed bytes (`None` for lint)
    pub output: Option<Vec<u8>>,
    /// Non-fatal diagnostics
    pub diagnostics: Vec<Diagnostic>,
}

/// The unit of per-file work.
#[derive(Debug, Clone)]
pub enum Transform {
    /// Minify a stylesheet
    CssMinify(CssOptions),
    /// Minify a script
    JsMinify(JsOptions),
    /// Copy bytes unchanged
    Passthrough,
    /// Lint a script; produces diagnostics only
    Lint(JsLinter),
}

impl Transform {
    /// Short name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Transform::CssMinify(_) => "css-minify",
            Transform::JsMinify(_) => "js-minify",
            Transform::Passthrough => "passthrough",
            Transform::Lint(_) => "lint",
        }
    }

    /// Whether the transform produces output bytes.
    pub fn produces_output(&self) -> bool {
        !matches!(self, Transform::Lint(_))
    }

    /// Apply the transform to the content of `file`.
    pub fn apply(&self, file: &Path, source: &[u8]) -> Result<TransformOutput, TransformError> {
        match self {
            Transform::Passthrough => {
                Ok(TransformOutput { output: Some(source.to_vec()), diagnostics: Vec::new() })
            }
            Transform::CssMinify(options) => {
                let text = as_text(file, source)?;
                let css = engine::minify_css(text, options)
                    .map_err(|p| TransformError::new(file, p))?;
                Ok(TransformOutput { output: Some(css.into_bytes()), diagnostics: Vec::new() })
            }
            Transform::JsMinify(options) => {
                let text = as_text(file, source)?;
                let minified =
                    engine::minify_js(text, options).map_err(|p| TransformError::new(file, p))?;
                Ok(TransformOutput {
                    output: Some(minified.code.into_bytes()),
                    diagnostics: to_diagnostics(file, minified.warnings),
                })
            }
            Transform::Lint(linter) => {
                let text = as_text(file, source)?;
                let problems = linter.lint(text).map_err(|p| TransformError::new(file, p))?;
                Ok(TransformOutput { output: None, diagnostics: to_diagnostics(file, problems) })
            }
        }
    }
}

fn to_diagnostics(file: &Path, problems: Vec<Problem>) -> Vec<Diagnostic> {
    let file: PathBuf = file.to_path_buf();
    problems
        .into_iter()
        .map(|p| Diagnostic::warning(file.clone(), p.line, p.column, p.message))
        .collect()
}

/// Decode source bytes as UTF-8, reporting the position of bad input.
fn as_text<'a>(file: &Path, source: &'a [u8]) -> Result<&'a str, TransformError> {
    std::str::from_utf8(source).map_err(|e| {
        let valid = &source[..e.valid_up_to()];
        let line = valid.iter().filter(|b| **b == b'\n').count() + 1;
        let line_start = valid.iter().rposition(|b| *b == b'\n').map_or(0, |i| i + 1);
        let column = String::from_utf8_lossy(&valid[line_start..]).chars().count() + 1;
        TransformError::new(file, Problem::new(line, column, "Invalid UTF-8 sequence."))
    })
}
