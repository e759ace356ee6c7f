//! Source files participating in a batch.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// One resolved input file.
///
/// Immutable once resolved; content is read on demand by the aggregator or
/// linter so a skipped batch never touches file contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    path: PathBuf,
}

impl SourceFile {
    /// Create a source file reference.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the raw content.
    pub fn read(&self) -> io::Result<Vec<u8>> {
        fs::read(&self.path)
    }
}

/// Ordered set of source files, unique by path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceSet {
    files: Vec<SourceFile>,
}

impl SourceSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a path unless it is already present.
    ///
    /// Returns `true` if the path was added.
    pub fn push(&mut self, path: impl Into<PathBuf>) -> bool {
        let path = path.into();
        if self.contains(&path) {
            return false;
        }
        self.files.push(SourceFile::new(path));
        true
    }

    /// Check if a path is part of the set.
    pub fn contains(&self, path: &Path) -> bool {
        self.files.iter().any(|f| f.path() == path)
    }

    /// Files in resolution order.
    pub fn files(&self) -> &[SourceFile] {
        &self.files
    }

    /// Iterate over the files in resolution order.
    pub fn iter(&self) -> std::slice::Iter<'_, SourceFile> {
        self.files.iter()
    }

    /// Number of files in the set.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Check if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl FromIterator<PathBuf> for SourceSet {
    fn from_iter<I: IntoIterator<Item = PathBuf>>(iter: I) -> Self {
        let mut set = SourceSet::new();
        for path in iter {
            set.push(path);
        }
        set
    }
}

impl<'a> IntoIterator for &'a SourceSet {
    type Item = &'a SourceFile;
    type IntoIter = std::slice::Iter<'a, SourceFile>;

    fn into_iter(self) -> Self::IntoIter {
        self.files.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_set_dedupes_and_keeps_order() {
        let set: SourceSet = vec![
            PathBuf::from("b.js"),
            PathBuf::from("a.js"),
            PathBuf::from("b.js"),
        ]
        .into_iter()
        .collect();

        let paths: Vec<_> = set.iter().map(|f| f.path().to_path_buf()).collect();
        assert_eq!(paths, vec![PathBuf::from("b.js"), PathBuf::from("a.js")]);
    }

    #[test]
    fn test_push_reports_duplicates() {
        let mut set = SourceSet::new();
        assert!(set.push("x.css"));
        assert!(!set.push("x.css"));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_read_missing_file() {
        let file = SourceFile::new("/definitely/not/here.js");
        assert!(file.read().is_err());
    }
}
