//! Diagnostic reporting surfaces.
//!
//! A [`DiagnosticReporter`] is where problems end up once they are recorded:
//! a terminal, a JSON stream for editors, or nowhere at all.
//!
//! # Example
//!
//! ```ignore
//! use minipack::build::report::{ConsoleReporter, DiagnosticReporter};
//! use minipack::build::Diagnostic;
//!
//! let reporter = ConsoleReporter::new();
//! reporter.report(&Diagnostic::error("src/app.js", 3, 7, "Unterminated string literal"));
//! ```

use crate::build::{Diagnostic, Severity};
use std::io::{IsTerminal, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Trait for diagnostic reporters.
pub trait DiagnosticReporter: Send + Sync {
    /// Report a single diagnostic.
    fn report(&self, diagnostic: &Diagnostic);
}

/// A reporter that discards all diagnostics.
#[derive(Debug, Default)]
pub struct NullReporter;

impl NullReporter {
    /// Create a new null reporter.
    pub fn new() -> Self {
        Self
    }
}

impl DiagnosticReporter for NullReporter {
    fn report(&self, _diagnostic: &Diagnostic) {}
}

/// Console reporter printing `file:line:column: severity: message`.
pub struct ConsoleReporter {
    /// Whether to use colors
    use_colors: bool,
    /// Number of diagnostics written so far
    reported: AtomicUsize,
    /// Output writer (for testing)
    output: Mutex<Box<dyn Write + Send>>,
}

impl std::fmt::Debug for ConsoleReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleReporter")
            .field("use_colors", &self.use_colors)
            .field("reported", &self.reported)
            .finish()
    }
}

impl ConsoleReporter {
    /// Create a new console reporter writing to stderr.
    ///
    /// Colors are used when stderr is a terminal.
    pub fn new() -> Self {
        Self {
            use_colors: std::io::stderr().is_terminal(),
            reported: AtomicUsize::new(0),
            output: Mutex::new(Box::new(std::io::stderr())),
        }
    }

    /// Create a console reporter that writes to a custom output.
    pub fn with_output<W: Write + Send + 'static>(output: W) -> Self {
        Self {
            use_colors: false,
            reported: AtomicUsize::new(0),
            output: Mutex::new(Box::new(output)),
        }
    }

    /// Number of diagnostics reported so far.
    pub fn reported(&self) -> usize {
        self.reported.load(Ordering::SeqCst)
    }

    fn color(&self, text: &str, color: &str) -> String {
        if self.use_colors {
            format!("{}{}\x1b[0m", color, text)
        } else {
            text.to_string()
        }
    }

    fn writeln(&self, line: &str) {
        if let Ok(mut output) = self.output.lock() {
            let _ = writeln!(output, "{}", line);
        }
    }
}

impl Default for ConsoleReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl DiagnosticReporter for ConsoleReporter {
    fn report(&self, diagnostic: &Diagnostic) {
        self.reported.fetch_add(1, Ordering::SeqCst);
        let severity = match diagnostic.severity {
            Severity::Error => self.color("error", "\x1b[31m"),
            Severity::Warning => self.color("warning", "\x1b[33m"),
        };
        self.writeln(&format!(
            "{}:{}:{}: {}: {}",
            diagnostic.file.display(),
            diagnostic.line,
            diagnostic.column,
            severity,
            diagnostic.message
        ));
    }
}

/// JSON-lines reporter for machine-readable output.
pub struct JsonReporter {
    output: Mutex<Box<dyn Write + Send>>,
}

impl std::fmt::Debug for JsonReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonReporter").finish()
    }
}

impl JsonReporter {
    /// Create a new JSON reporter writing to stdout.
    pub fn new() -> Self {
        Self { output: Mutex::new(Box::new(std::io::stdout())) }
    }

    /// Create a JSON reporter that writes to a custom output.
    pub fn with_output<W: Write + Send + 'static>(output: W) -> Self {
        Self { output: Mutex::new(Box::new(output)) }
    }
}

impl Default for JsonReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl DiagnosticReporter for JsonReporter {
    fn report(&self, diagnostic: &Diagnostic) {
        let Ok(json) = serde_json::to_string(diagnostic) else {
            return;
        };
        if let Ok(mut output) = self.output.lock() {
            let _ = writeln!(output, "{}", json);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    struct TestWriter(Arc<Mutex<Vec<u8>>>);

    impl Write for TestWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_console_reporter_format() {
        let buf = Arc::new(Mutex::new(Vec::new()));
        let reporter = ConsoleReporter::with_output(TestWriter(Arc::clone(&buf)));

        reporter.report(&Diagnostic::error("a.js", 2, 5, "Missing '}'"));
        reporter.report(&Diagnostic::warning("b.js", 1, 0, "eval is evil"));

        let out = String::from_utf8(buf.lock().unwrap().clone()).unwrap();
        assert_eq!(out, "a.js:2:5: error: Missing '}'\nb.js:1:0: warning: eval is evil\n");
        assert_eq!(reporter.reported(), 2);
    }

    #[test]
    fn test_json_reporter_emits_one_line_per_diagnostic() {
        let buf = Arc::new(Mutex::new(Vec::new()));
        let reporter = JsonReporter::with_output(TestWriter(Arc::clone(&buf)));

        reporter.report(&Diagnostic::error("a.js", 2, 5, "say \"hi\""));

        let out = String::from_utf8(buf.lock().unwrap().clone()).unwrap();
        let value: serde_json::Value = serde_json::from_str(out.trim()).unwrap();
        assert_eq!(value["line"], 2);
        assert_eq!(value["severity"], "error");
        assert_eq!(value["message"], "say \"hi\"");
    }
}
