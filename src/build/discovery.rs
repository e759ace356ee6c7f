//! Source file discovery.
//!
//! Expands a [`SourceSpec`] into an ordered, duplicate-free [`SourceSet`].
//! An explicit file list wins over directory scanning; scanning applies
//! include patterns, explicit excludes and [`DEFAULT_EXCLUDES`].

use crate::build::{BuildContext, SourceSet};
use glob::{glob, MatchOptions, Pattern};
use std::path::{Path, PathBuf};

/// Patterns excluded from every directory scan: version-control
/// directories, OS metadata and editor backups.
pub const DEFAULT_EXCLUDES: &[&str] = &[
    // Miscellaneous typical temporary files
    "**/*~",
    "**/#*#",
    "**/.#*",
    "**/%*%",
    "**/._*",
    // CVS
    "**/CVS",
    "**/CVS/**",
    "**/.cvsignore",
    // RCS
    "**/RCS",
    "**/RCS/**",
    // SCCS
    "**/SCCS",
    "**/SCCS/**",
    // Visual SourceSafe
    "**/vssver.scc",
    // Subversion
    "**/.svn",
    "**/.svn/**",
    // Arch
    "**/.arch-ids",
    "**/.arch-ids/**",
    // Bazaar
    "**/.bzr",
    "**/.bzr/**",
    // SurroundSCM
    "**/.MySCMServerInfo",
    // Mac
    "**/.DS_Store",
    // Serena Dimensions
    "**/.metadata",
    "**/.metadata/**",
    // Mercurial
    "**/.hg",
    "**/.hg/**",
    "**/.hgignore",
    // git
    "**/.git",
    "**/.git/**",
    "**/.gitignore",
    "**/.gitattributes",
    // BitKeeper
    "**/BitKeeper",
    "**/BitKeeper/**",
    "**/ChangeSet",
    "**/ChangeSet/**",
    // darcs
    "**/_darcs",
    "**/_darcs/**",
    "**/.darcsrepo",
    "**/.darcsrepo/**",
    "**/-darcs-backup*",
    "**/.darcs-temp-mail",
];

/// Error during source discovery.
#[derive(Debug)]
pub enum DiscoveryError {
    /// Invalid glob pattern
    InvalidPattern(String, glob::PatternError),
    /// Source directory does not exist and sources are required
    MissingDirectory(PathBuf),
    /// IO error during file enumeration
    Io(std::io::Error),
}

impl std::fmt::Display for DiscoveryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiscoveryError::InvalidPattern(pattern, err) => {
                write!(f, "Invalid glob pattern '{}': {}", pattern, err)
            }
            DiscoveryError::MissingDirectory(dir) => {
                write!(f, "Source directory does not exist: {}", dir.display())
            }
            DiscoveryError::Io(err) => write!(f, "IO error during discovery: {}", err),
        }
    }
}

impl std::error::Error for DiscoveryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DiscoveryError::InvalidPattern(_, err) => Some(err),
            DiscoveryError::Io(err) => Some(err),
            DiscoveryError::MissingDirectory(_) => None,
        }
    }
}

impl From<std::io::Error> for DiscoveryError {
    fn from(err: std::io::Error) -> Self {
        DiscoveryError::Io(err)
    }
}

/// Where the sources of one batch come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSpec {
    /// Root of the directory scan
    pub source_directory: PathBuf,
    /// Explicit files; when non-empty, scanning is skipped
    pub source_files: Vec<PathBuf>,
    /// Include patterns relative to `source_directory`
    pub includes: Vec<String>,
    /// Exclude patterns relative to `source_directory`
    pub excludes: Vec<String>,
    /// Whether an empty result is an error
    pub required: bool,
}

impl SourceSpec {
    /// Scan `source_directory` with the given include patterns.
    pub fn new(source_directory: impl Into<PathBuf>, includes: &[&str]) -> Self {
        Self {
            source_directory: source_directory.into(),
            source_files: Vec::new(),
            includes: includes.iter().map(|s| s.to_string()).collect(),
            excludes: Vec::new(),
            required: true,
        }
    }

    /// Use an explicit file list instead of scanning.
    pub fn with_source_files<I, P>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.source_files = files.into_iter().map(Into::into).collect();
        self
    }

    /// Add exclude patterns.
    pub fn with_excludes(mut self, excludes: &[&str]) -> Self {
        self.excludes.extend(excludes.iter().map(|s| s.to_string()));
        self
    }

    /// Set whether sources are required.
    pub fn with_required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }
}

/// Scan `root` for files matching `includes` but none of `excludes` or
/// [`DEFAULT_EXCLUDES`].
///
/// Paths are returned relative to `root`, grouped by include pattern in the
/// order the patterns are given, lexically sorted within each pattern, and
/// without duplicates.
pub fn scan_directory(
    root: &Path,
    includes: &[String],
    excludes: &[String],
) -> Result<Vec<PathBuf>, DiscoveryError> {
    let exclude_patterns = compile_patterns(
        excludes.iter().map(String::as_str).chain(DEFAULT_EXCLUDES.iter().copied()),
    )?;
    let options = MatchOptions { require_literal_separator: true, ..MatchOptions::new() };
    let escaped_root = Pattern::escape(&root.to_string_lossy());

    let mut found: Vec<PathBuf> = Vec::new();
    for include in includes {
        // Validate the include on its own so errors name the user's pattern.
        Pattern::new(include).map_err(|e| DiscoveryError::InvalidPattern(include.clone(), e))?;
        let full = format!("{}/{}", escaped_root.trim_end_matches('/'), include);
        let paths = glob(&full).map_err(|e| DiscoveryError::InvalidPattern(include.clone(), e))?;

        for entry in paths {
            let path = match entry {
                Ok(path) => path,
                Err(e) => {
                    tracing::warn!(error = %e, "error reading path during scan");
                    continue;
                }
            };
            if !path.is_file() {
                continue;
            }
            let Ok(relative) = path.strip_prefix(root) else {
                continue;
            };
            if exclude_patterns.iter().any(|p| p.matches_path_with(relative, options)) {
                continue;
            }
            if !found.iter().any(|f| f == relative) {
                found.push(relative.to_path_buf());
            }
        }
    }

    Ok(found)
}

fn compile_patterns<'a>(
    patterns: impl Iterator<Item = &'a str>,
) -> Result<Vec<Pattern>, DiscoveryError> {
    patterns
        .map(|p| Pattern::new(p).map_err(|e| DiscoveryError::InvalidPattern(p.to_string(), e)))
        .collect()
}

/// Resolve the sources described by `spec`.
///
/// A non-empty explicit list is returned as given. Otherwise the source
/// directory is scanned through the build context. A missing directory is
/// an error when sources are required and an empty set otherwise.
pub fn resolve_sources(
    ctx: &dyn BuildContext,
    spec: &SourceSpec,
) -> Result<SourceSet, DiscoveryError> {
    if !spec.source_files.is_empty() {
        return Ok(spec.source_files.iter().cloned().collect());
    }

    let root = &spec.source_directory;
    if !root.is_dir() {
        if spec.required {
            return Err(DiscoveryError::MissingDirectory(root.clone()));
        }
        tracing::warn!(dir = %root.display(), "source directory does not exist, nothing to process");
        return Ok(SourceSet::new());
    }

    let relative = ctx.scan(root, &spec.includes, &spec.excludes)?;
    tracing::debug!(dir = %root.display(), count = relative.len(), "scanned sources");
    Ok(relative.into_iter().map(|p| root.join(p)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::FileSystemContext;
    use std::fs;
    use tempfile::TempDir;

    fn create_test_file(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    fn strings(patterns: &[&str]) -> Vec<String> {
        patterns.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_scan_applies_includes_and_excludes() {
        let temp = TempDir::new().unwrap();
        create_test_file(temp.path(), "a.js", "");
        create_test_file(temp.path(), "lib/b.js", "");
        create_test_file(temp.path(), "lib/b.min.js", "");
        create_test_file(temp.path(), "style.css", "");

        let found =
            scan_directory(temp.path(), &strings(&["**/*.js"]), &strings(&["**/*.min.js"]))
                .unwrap();

        assert_eq!(found, vec![PathBuf::from("a.js"), PathBuf::from("lib/b.js")]);
    }

    #[test]
    fn test_scan_skips_default_excludes() {
        let temp = TempDir::new().unwrap();
        create_test_file(temp.path(), "app.js", "");
        create_test_file(temp.path(), "app.js~", "");
        create_test_file(temp.path(), ".svn/entries.js", "");
        create_test_file(temp.path(), "deep/.git/hook.js", "");
        create_test_file(temp.path(), "CVS/x.js", "");

        let found = scan_directory(temp.path(), &strings(&["**/*"]), &[]).unwrap();

        assert_eq!(found, vec![PathBuf::from("app.js")]);
    }

    #[test]
    fn test_scan_keeps_pattern_order_and_dedupes() {
        let temp = TempDir::new().unwrap();
        create_test_file(temp.path(), "a.js", "");
        create_test_file(temp.path(), "z.js", "");

        let found =
            scan_directory(temp.path(), &strings(&["z.js", "**/*.js"]), &[]).unwrap();

        assert_eq!(found, vec![PathBuf::from("z.js"), PathBuf::from("a.js")]);
    }

    #[test]
    fn test_scan_invalid_pattern() {
        let temp = TempDir::new().unwrap();
        let err = scan_directory(temp.path(), &strings(&["[.js"]), &[]).unwrap_err();
        assert!(matches!(err, DiscoveryError::InvalidPattern(p, _) if p == "[.js"));
    }

    #[test]
    fn test_explicit_files_override_scanning() {
        let temp = TempDir::new().unwrap();
        create_test_file(temp.path(), "src/a.js", "");
        let explicit = create_test_file(temp.path(), "other/x.js", "");

        let spec = SourceSpec::new(temp.path().join("src"), &["**/*.js"])
            .with_source_files([explicit.clone(), explicit.clone()]);
        let ctx = FileSystemContext::new();
        let set = resolve_sources(&ctx, &spec).unwrap();

        assert_eq!(set.len(), 1);
        assert_eq!(set.files()[0].path(), explicit);
    }

    #[test]
    fn test_missing_directory_required() {
        let temp = TempDir::new().unwrap();
        let spec = SourceSpec::new(temp.path().join("nope"), &["**/*.js"]);
        let ctx = FileSystemContext::new();

        let err = resolve_sources(&ctx, &spec).unwrap_err();
        assert!(matches!(err, DiscoveryError::MissingDirectory(_)));
    }

    #[test]
    fn test_missing_directory_optional_is_empty() {
        let temp = TempDir::new().unwrap();
        let spec = SourceSpec::new(temp.path().join("nope"), &["**/*.js"]).with_required(false);
        let ctx = FileSystemContext::new();

        assert!(resolve_sources(&ctx, &spec).unwrap().is_empty());
    }

    #[test]
    fn test_resolved_paths_are_rooted() {
        let temp = TempDir::new().unwrap();
        create_test_file(temp.path(), "css/b.css", "");
        create_test_file(temp.path(), "css/a.css", "");

        let spec = SourceSpec::new(temp.path().join("css"), &["**/*.css"]);
        let ctx = FileSystemContext::new();
        let set = resolve_sources(&ctx, &spec).unwrap();

        let paths: Vec<_> = set.iter().map(|f| f.path().to_path_buf()).collect();
        assert_eq!(paths, vec![temp.path().join("css/a.css"), temp.path().join("css/b.css")]);
    }
}
