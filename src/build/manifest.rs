//! Lint state manifest for cross-run change detection.
//!
//! Lint runs only re-examine files whose content changed since the last
//! run. The manifest remembers, per file, a content hash and the
//! diagnostics that were reported for it, so unchanged files can have
//! their previous problems re-surfaced without being linted again.
//!
//! # Manifest Format
//!
//! Stored as JSON in `.minipack-lint.json` inside the state directory:
//!
//! ```json
//! {
//!   "version": 1,
//!   "updated_at": "2024-01-15T10:35:00Z",
//!   "files": {
//!     "src/main/js/app.js": {
//!       "hash": "af63bd4c8601b7df",
//!       "messages": [
//!         { "file": "src/main/js/app.js", "line": 3, "column": 9,
//!           "message": "Expected '===' and instead saw '=='.", "severity": "error" }
//!       ]
//!     }
//!   }
//! }
//! ```

use crate::build::Diagnostic;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read};
use std::path::Path;
use std::time::SystemTime;

/// Current manifest format version.
const MANIFEST_VERSION: u32 = 1;

/// Default manifest filename.
pub const MANIFEST_FILENAME: &str = ".minipack-lint.json";

/// Error during manifest operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ManifestError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// Version mismatch
    #[error("Manifest version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },
}

/// Recorded lint state for every file seen so far.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LintManifest {
    /// Manifest format version
    pub version: u32,
    /// When the manifest was last saved
    pub updated_at: String,
    /// Per-file state keyed by path
    pub files: HashMap<String, FileEntry>,
}

/// Lint state of a single file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileEntry {
    /// Content hash at the time the file was last linted
    pub hash: String,
    /// Diagnostics reported for that content
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<Diagnostic>,
}

impl LintManifest {
    /// Create a new empty manifest.
    pub fn new() -> Self {
        Self {
            version: MANIFEST_VERSION,
            updated_at: format_timestamp(SystemTime::now()),
            files: HashMap::new(),
        }
    }

    /// Load a manifest from a file.
    ///
    /// Returns `Ok(None)` if the file doesn't exist.
    pub fn load(path: &Path) -> Result<Option<Self>, ManifestError> {
        if !path.exists() {
            return Ok(None);
        }

        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let manifest: LintManifest = serde_json::from_reader(reader)?;

        if manifest.version != MANIFEST_VERSION {
            return Err(ManifestError::VersionMismatch {
                expected: MANIFEST_VERSION,
                found: manifest.version,
            });
        }

        Ok(Some(manifest))
    }

    /// Load a manifest from the default location in the state directory.
    pub fn load_from_dir(state_dir: &Path) -> Result<Option<Self>, ManifestError> {
        Self::load(&state_dir.join(MANIFEST_FILENAME))
    }

    /// Save the manifest to a file, creating parent directories.
    pub fn save(&mut self, path: &Path) -> Result<(), ManifestError> {
        self.updated_at = format_timestamp(SystemTime::now());

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = File::create(path)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;

        Ok(())
    }

    /// Save the manifest to the default location in the state directory.
    pub fn save_to_dir(&mut self, state_dir: &Path) -> Result<(), ManifestError> {
        self.save(&state_dir.join(MANIFEST_FILENAME))
    }

    /// Check whether `path` changed since it was last recorded.
    ///
    /// New files, files whose hash differs and unreadable files all count
    /// as changed.
    pub fn has_changed(&self, path: &Path) -> bool {
        let Some(entry) = self.files.get(&key(path)) else {
            return true;
        };
        match hash_file(path) {
            Ok(current) => current != entry.hash,
            Err(_) => true,
        }
    }

    /// Start a fresh record for `path`: store its current hash and drop
    /// previously recorded messages.
    pub fn begin_file(&mut self, path: &Path) -> Result<(), ManifestError> {
        let hash = hash_file(path)?;
        self.files.insert(key(path), FileEntry { hash, messages: Vec::new() });
        Ok(())
    }

    /// Append a message to the record for `path`.
    ///
    /// Messages for files without a record are not persisted.
    pub fn add_message(&mut self, path: &Path, diagnostic: Diagnostic) {
        if let Some(entry) = self.files.get_mut(&key(path)) {
            entry.messages.push(diagnostic);
        }
    }

    /// Messages recorded for `path` on a previous run.
    pub fn messages(&self, path: &Path) -> &[Diagnostic] {
        self.files.get(&key(path)).map(|e| e.messages.as_slice()).unwrap_or(&[])
    }

    /// Forget a file entirely.
    pub fn remove(&mut self, path: &Path) -> Option<FileEntry> {
        self.files.remove(&key(path))
    }

    /// Number of files tracked.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Check if the manifest is empty.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl Default for LintManifest {
    fn default() -> Self {
        Self::new()
    }
}

fn key(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

/// Hash file contents with FNV-1a.
pub(crate) fn hash_file(path: &Path) -> Result<String, ManifestError> {
    let mut file = File::open(path)?;
    let mut contents = Vec::new();
    file.read_to_end(&mut contents)?;

    Ok(format!("{:016x}", fnv1a_hash(&contents)))
}

/// FNV-1a hash algorithm.
fn fnv1a_hash(data: &[u8]) -> u64 {
    const FNV_OFFSET: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x100000001b3;

    let mut hash = FNV_OFFSET;
    for byte in data {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Format a SystemTime as an ISO 8601 timestamp string.
fn format_timestamp(time: SystemTime) -> String {
    let duration = time.duration_since(SystemTime::UNIX_EPOCH).unwrap_or_default();
    let secs = duration.as_secs();

    let days = secs / 86400;
    let remaining = secs % 86400;
    let hours = remaining / 3600;
    let minutes = (remaining % 3600) / 60;
    let seconds = remaining % 60;

    let (year, month, day) = days_to_ymd(days as i64);

    format!("{:04}-{:02}-{:02}T{:02}:{:02}:{:02}Z", year, month, day, hours, minutes, seconds)
}

/// Convert days since Unix epoch to year/month/day.
fn days_to_ymd(days: i64) -> (i32, u32, u32) {
    let mut remaining_days = days;
    let mut year = 1970i32;

    loop {
        let days_in_year = if is_leap_year(year) { 366 } else { 365 };
        if remaining_days < days_in_year {
            break;
        }
        remaining_days -= days_in_year;
        year += 1;
    }

    let days_in_months: [i64; 12] = if is_leap_year(year) {
        [31, 29, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31]
    } else {
        [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31]
    };

    let mut month = 1u32;
    for days_in_month in days_in_months {
        if remaining_days < days_in_month {
            break;
        }
        remaining_days -= days_in_month;
        month += 1;
    }

    (year, month, remaining_days as u32 + 1)
}

fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || (year % 400 == 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn create_test_file(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_unknown_file_has_changed() {
        let temp = TempDir::new().unwrap();
        let file = create_test_file(temp.path(), "a.js", "var a = 1;");
        let manifest = LintManifest::new();

        assert!(manifest.has_changed(&file));
    }

    #[test]
    fn test_begin_file_then_unchanged() {
        let temp = TempDir::new().unwrap();
        let file = create_test_file(temp.path(), "a.js", "var a = 1;");
        let mut manifest = LintManifest::new();

        manifest.begin_file(&file).unwrap();
        assert!(!manifest.has_changed(&file));

        fs::write(&file, "var a = 2;").unwrap();
        assert!(manifest.has_changed(&file));
    }

    #[test]
    fn test_begin_file_drops_old_messages() {
        let temp = TempDir::new().unwrap();
        let file = create_test_file(temp.path(), "a.js", "x == y;");
        let mut manifest = LintManifest::new();

        manifest.begin_file(&file).unwrap();
        manifest.add_message(&file, Diagnostic::error(&file, 1, 3, "use ==="));
        assert_eq!(manifest.messages(&file).len(), 1);

        manifest.begin_file(&file).unwrap();
        assert!(manifest.messages(&file).is_empty());
    }

    #[test]
    fn test_save_and_load_round_trip_keeps_messages() {
        let temp = TempDir::new().unwrap();
        let file = create_test_file(temp.path(), "a.js", "x == y;");
        let state = temp.path().join("state");

        let mut manifest = LintManifest::new();
        manifest.begin_file(&file).unwrap();
        manifest.add_message(&file, Diagnostic::warning(&file, 1, 3, "use ==="));
        manifest.save_to_dir(&state).unwrap();

        let loaded = LintManifest::load_from_dir(&state).unwrap().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.messages(&file)[0].message, "use ===");
        assert!(!loaded.has_changed(&file));
    }

    #[test]
    fn test_load_missing_returns_none() {
        let temp = TempDir::new().unwrap();
        assert!(LintManifest::load_from_dir(temp.path()).unwrap().is_none());
    }

    #[test]
    fn test_version_mismatch() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(MANIFEST_FILENAME);
        fs::write(&path, r#"{"version": 99, "updated_at": "x", "files": {}}"#).unwrap();

        let err = LintManifest::load(&path).unwrap_err();
        assert!(matches!(err, ManifestError::VersionMismatch { expected: 1, found: 99 }));
    }

    #[test]
    fn test_fnv1a_is_stable() {
        assert_eq!(fnv1a_hash(b""), 0xcbf29ce484222325);
        assert_ne!(fnv1a_hash(b"a"), fnv1a_hash(b"b"));
    }

    #[test]
    fn test_format_timestamp_epoch() {
        assert_eq!(format_timestamp(SystemTime::UNIX_EPOCH), "1970-01-01T00:00:00Z");
    }
}
