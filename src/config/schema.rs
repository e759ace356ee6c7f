//! Configuration schema types for `minipack.toml`
//!
//! Defines the structure and validation rules for minipack project configuration,
//! and turns a validated configuration into runnable batch jobs.

use crate::build::{AggregateSettings, BatchJob, LintSettings, SourceSpec, Transform};
use crate::engine::{CssOptions, JsOptions, LintOptions};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

/// Kind of asset an aggregate produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    /// JavaScript
    #[default]
    Js,
    /// Stylesheets
    Css,
}

impl AssetKind {
    /// File extension of sources and artifact.
    pub fn extension(&self) -> &'static str {
        match self {
            AssetKind::Js => "js",
            AssetKind::Css => "css",
        }
    }

    /// Directory scanned when none is configured.
    pub fn default_source_directory(&self) -> PathBuf {
        PathBuf::from(format!("src/main/{}", self.extension()))
    }

    /// Include pattern used when none is configured.
    pub fn default_include(&self) -> String {
        format!("**/*.{}", self.extension())
    }
}

/// Project metadata section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Project name (default: name of the directory holding minipack.toml)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Default output directory for aggregates
    #[serde(default = "default_out")]
    pub out: PathBuf,
    /// Where the lint manifest lives
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self { name: None, out: default_out(), state_dir: default_state_dir() }
    }
}

fn default_out() -> PathBuf {
    PathBuf::from("target/classes")
}

fn default_state_dir() -> PathBuf {
    PathBuf::from("target/.minipack")
}

fn default_true() -> bool {
    true
}

/// One `[[aggregate]]` execution
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AggregateConfig {
    /// Batch name (default: `aggregate-<n>`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Asset kind
    #[serde(default)]
    pub kind: AssetKind,
    /// Directory to scan (default depends on kind)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_directory: Option<PathBuf>,
    /// Explicit source list; overrides scanning when non-empty
    #[serde(default)]
    pub source_files: Vec<PathBuf>,
    /// Include patterns (default depends on kind)
    #[serde(default)]
    pub includes: Vec<String>,
    /// Exclude patterns, added to the built-in excludes
    #[serde(default)]
    pub excludes: Vec<String>,
    /// Fail when no sources are found
    #[serde(default = "default_true")]
    pub required: bool,
    /// Artifact path (default: `<out>/<project>-all.<kind>`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
    /// Break lines past this column (0 = never)
    #[serde(default)]
    pub linebreakpos: usize,
    /// Concatenate without minifying
    #[serde(default)]
    pub nominify: bool,
    /// Append a newline after every file
    #[serde(default = "default_true")]
    pub insert_new_line: bool,
    /// Do not rename local identifiers (js)
    #[serde(default)]
    pub nomunge: bool,
    /// Keep every semicolon (js)
    #[serde(default)]
    pub preserve_all_semicolons: bool,
    /// Disable micro optimizations (js)
    #[serde(default)]
    pub disable_optimizations: bool,
    /// Report constructs that hurt compression (js)
    #[serde(default = "default_true")]
    pub warn_on_issues: bool,
}

impl AggregateConfig {
    /// Transform applied to every source of this aggregate.
    pub fn transform(&self) -> Transform {
        if self.nominify {
            return Transform::Passthrough;
        }
        match self.kind {
            AssetKind::Css => Transform::CssMinify(CssOptions { linebreak_pos: self.linebreakpos }),
            AssetKind::Js => Transform::JsMinify(JsOptions {
                linebreak_pos: self.linebreakpos,
                munge: !self.nomunge,
                preserve_all_semicolons: self.preserve_all_semicolons,
                disable_optimizations: self.disable_optimizations,
                warn_on_issues: self.warn_on_issues,
            }),
        }
    }
}

/// The `[lint]` execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LintConfig {
    /// Directory to scan (default `src/main/js`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_directory: Option<PathBuf>,
    /// Explicit source list; overrides scanning when non-empty
    #[serde(default)]
    pub source_files: Vec<PathBuf>,
    /// Include patterns (default `**/*.js`)
    #[serde(default)]
    pub includes: Vec<String>,
    /// Exclude patterns
    #[serde(default)]
    pub excludes: Vec<String>,
    /// Fail when no sources are found
    #[serde(default = "default_true")]
    pub required: bool,
    /// Fail the build on lint problems
    #[serde(default = "default_true")]
    pub fail: bool,
    /// Count warnings against the verdict
    #[serde(default)]
    pub fail_on_warnings: bool,
    /// Rule switches, by name
    #[serde(default)]
    pub options: BTreeMap<String, bool>,
}

impl Default for LintConfig {
    fn default() -> Self {
        Self {
            source_directory: None,
            source_files: Vec::new(),
            includes: Vec::new(),
            excludes: Vec::new(),
            required: true,
            fail: true,
            fail_on_warnings: false,
            options: BTreeMap::new(),
        }
    }
}

/// Build execution settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Worker threads for per-file work
    #[serde(default = "default_jobs")]
    pub jobs: usize,
    /// Ignore timestamps and lint state
    #[serde(default)]
    pub force: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self { jobs: default_jobs(), force: false }
    }
}

fn default_jobs() -> usize {
    1
}

/// Complete minipack.toml configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MinipackConfig {
    /// Project metadata
    #[serde(default)]
    pub project: ProjectConfig,
    /// Aggregate executions, in run order
    #[serde(default, rename = "aggregate")]
    pub aggregates: Vec<AggregateConfig>,
    /// Lint execution
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lint: Option<LintConfig>,
    /// Build settings
    #[serde(default)]
    pub build: BuildConfig,
}

/// Configuration validation error
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    /// Path to the invalid field (e.g., "aggregate.app.output")
    pub field: String,
    /// Error message
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "minipack.toml: '{}' {}", self.field, self.message)
    }
}

impl MinipackConfig {
    /// Validate the configuration and return any errors
    pub fn validate(&self) -> Vec<ConfigValidationError> {
        let mut errors = Vec::new();

        if matches!(&self.project.name, Some(name) if name.is_empty()) {
            errors.push(ConfigValidationError {
                field: "project.name".to_string(),
                message: "must be a non-empty string".to_string(),
            });
        }

        if self.build.jobs == 0 {
            errors.push(ConfigValidationError {
                field: "build.jobs".to_string(),
                message: "must be a positive integer".to_string(),
            });
        }

        let mut seen = HashSet::new();
        for index in 0..self.aggregates.len() {
            let name = self.aggregate_name(index);
            if !seen.insert(name.clone()) {
                errors.push(ConfigValidationError {
                    field: format!("aggregate.{}.name", name),
                    message: "is used by more than one aggregate".to_string(),
                });
            }
            if matches!(&self.aggregates[index].output, Some(out) if out.as_os_str().is_empty()) {
                errors.push(ConfigValidationError {
                    field: format!("aggregate.{}.output", name),
                    message: "must be a non-empty path".to_string(),
                });
            }
        }

        errors
    }

    /// Check if validation passed
    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }

    /// Effective project name; falls back to the project directory name.
    pub fn project_name(&self, project_root: &Path) -> String {
        self.project.name.clone().unwrap_or_else(|| {
            project_root
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "unnamed".to_string())
        })
    }

    /// Effective name of the aggregate at `index`.
    pub fn aggregate_name(&self, index: usize) -> String {
        self.aggregates
            .get(index)
            .and_then(|a| a.name.clone())
            .unwrap_or_else(|| format!("aggregate-{}", index + 1))
    }

    /// Directory holding cross-run lint state.
    pub fn state_dir(&self, project_root: &Path) -> PathBuf {
        resolve_path(project_root, &self.project.state_dir)
    }

    /// Aggregate jobs, in configuration order, with paths resolved against
    /// `project_root`.
    pub fn aggregate_jobs(&self, project_root: &Path) -> Vec<BatchJob> {
        let project = self.project_name(project_root);
        let out = resolve_path(project_root, &self.project.out);

        self.aggregates
            .iter()
            .enumerate()
            .map(|(index, aggregate)| {
                let kind = aggregate.kind;
                let output = match &aggregate.output {
                    Some(path) => resolve_path(project_root, path),
                    None => out.join(format!("{}-all.{}", project, kind.extension())),
                };
                let sources = source_spec(
                    project_root,
                    aggregate.source_directory.as_deref(),
                    &kind.default_source_directory(),
                    &aggregate.source_files,
                    &aggregate.includes,
                    &kind.default_include(),
                    &aggregate.excludes,
                    aggregate.required,
                );
                BatchJob::aggregate(
                    self.aggregate_name(index),
                    sources,
                    AggregateSettings {
                        output,
                        transform: aggregate.transform(),
                        insert_new_line: aggregate.insert_new_line,
                    },
                )
            })
            .collect()
    }

    /// The lint job, if a `[lint]` section is present.
    pub fn lint_job(&self, project_root: &Path) -> Option<BatchJob> {
        let lint = self.lint.as_ref()?;
        let kind = AssetKind::Js;
        let sources = source_spec(
            project_root,
            lint.source_directory.as_deref(),
            &kind.default_source_directory(),
            &lint.source_files,
            &lint.includes,
            &kind.default_include(),
            &lint.excludes,
            lint.required,
        );
        Some(BatchJob::lint(
            "lint",
            sources,
            LintSettings {
                options: LintOptions::from_map(&lint.options),
                fail: lint.fail,
                fail_on_warnings: lint.fail_on_warnings,
            },
        ))
    }

    /// Every job: aggregates first, then lint.
    pub fn batch_jobs(&self, project_root: &Path) -> Vec<BatchJob> {
        let mut jobs = self.aggregate_jobs(project_root);
        jobs.extend(self.lint_job(project_root));
        jobs
    }
}

fn source_spec(
    project_root: &Path,
    directory: Option<&Path>,
    default_directory: &Path,
    files: &[PathBuf],
    includes: &[String],
    default_include: &str,
    excludes: &[String],
    required: bool,
) -> SourceSpec {
    let directory = resolve_path(project_root, directory.unwrap_or(default_directory));
    let includes = if includes.is_empty() { vec![default_include.to_string()] } else { includes.to_vec() };
    SourceSpec {
        source_files: files.iter().map(|f| resolve_path(&directory, f)).collect(),
        source_directory: directory,
        includes,
        excludes: excludes.to_vec(),
        required,
    }
}

/// Resolve a path relative to `base`.
///
/// If the path is absolute, returns it unchanged.
pub fn resolve_path(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
