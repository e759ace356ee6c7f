//! A small JSLint-style checker.
//!
//! Rules are switched on and off through a name → bool option map. A
//! [`JsLinter`] is built once per lint run from those options and then
//! applied to each file.

use crate::engine::lexer::{tokenize, Token, TokenKind};
use crate::engine::Problem;
use std::collections::BTreeMap;

/// Problems reported per file before the linter gives up.
pub const MAX_ERRORS: usize = 50;

/// Option names understood by the linter.
pub const KNOWN_OPTIONS: &[&str] =
    &["eqeqeq", "evil", "debug", "with", "plusplus", "bitwise", "trailing", "tabs"];

const BITWISE: &[&str] =
    &["&", "|", "^", "~", "<<", ">>", ">>>", "&=", "|=", "^=", "<<=", ">>=", ">>>="];

/// Resolved lint rule switches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LintOptions {
    /// Require `===` and `!==`
    pub eqeqeq: bool,
    /// Tolerate `eval`
    pub evil: bool,
    /// Tolerate `debugger` statements
    pub debug: bool,
    /// Tolerate `with` statements
    pub with: bool,
    /// Flag `++` and `--`
    pub plusplus: bool,
    /// Flag bitwise operators
    pub bitwise: bool,
    /// Flag trailing whitespace
    pub trailing: bool,
    /// Flag tab indentation
    pub tabs: bool,
}

impl Default for LintOptions {
    fn default() -> Self {
        Self {
            eqeqeq: true,
            evil: false,
            debug: false,
            with: false,
            plusplus: false,
            bitwise: false,
            trailing: false,
            tabs: false,
        }
    }
}

impl LintOptions {
    /// Build options from a name → bool map on top of the defaults.
    ///
    /// Unknown names are logged and ignored.
    pub fn from_map(map: &BTreeMap<String, bool>) -> Self {
        let mut options = Self::default();
        for (name, &value) in map {
            match name.as_str() {
                "eqeqeq" => options.eqeqeq = value,
                "evil" => options.evil = value,
                "debug" => options.debug = value,
                "with" => options.with = value,
                "plusplus" => options.plusplus = value,
                "bitwise" => options.bitwise = value,
                "trailing" => options.trailing = value,
                "tabs" => options.tabs = value,
                other => {
                    tracing::warn!(option = other, known = ?KNOWN_OPTIONS, "ignoring unknown lint option");
                }
            }
        }
        options
    }
}

/// Lint engine handle.
#[derive(Debug, Clone, Default)]
pub struct JsLinter {
    options: LintOptions,
}

impl JsLinter {
    /// Create a linter with the given rules.
    pub fn new(options: LintOptions) -> Self {
        Self { options }
    }

    /// Lint `src`.
    ///
    /// Returns the problems found, in source order. A source that does not
    /// tokenize fails with the position of the syntax problem. At most
    /// [`MAX_ERRORS`] problems are reported, followed by a "Too many
    /// errors" summary when the limit is hit.
    pub fn lint(&self, src: &str) -> Result<Vec<Problem>, Problem> {
        let tokens = tokenize(src)?;
        let mut problems = Vec::new();

        let mut prev: Option<&Token<'_>> = None;
        for token in &tokens {
            if token.is_comment() {
                continue;
            }
            let prev_is_dot = prev.is_some_and(|p| p.is_punct("."));
            prev = Some(token);
            let message = match token.kind {
                TokenKind::Punct => self.check_operator(token.text),
                TokenKind::Ident if !prev_is_dot => self.check_word(token.text),
                _ => None,
            };
            if let Some(message) = message {
                problems.push(Problem::new(token.line, token.column, message));
            }
        }

        if self.options.trailing || self.options.tabs {
            problems.extend(self.check_lines(src));
            problems.sort_by_key(|p| (p.line, p.column));
        }

        if problems.len() > MAX_ERRORS {
            let last_line = problems[MAX_ERRORS - 1].line;
            let total_lines = src.lines().count().max(1);
            problems.truncate(MAX_ERRORS);
            problems.push(Problem::new(
                last_line,
                0,
                format!("Too many errors. ({}% scanned).", last_line * 100 / total_lines),
            ));
        }

        Ok(problems)
    }

    fn check_operator(&self, op: &str) -> Option<String> {
        match op {
            "==" if self.options.eqeqeq => Some("Expected '===' and instead saw '=='.".to_string()),
            "!=" if self.options.eqeqeq => Some("Expected '!==' and instead saw '!='.".to_string()),
            "++" | "--" if self.options.plusplus => Some(format!("Unexpected '{}'.", op)),
            op if self.options.bitwise && BITWISE.contains(&op) => {
                Some(format!("Unexpected use of '{}'.", op))
            }
            _ => None,
        }
    }

    fn check_word(&self, word: &str) -> Option<String> {
        match word {
            "eval" if !self.options.evil => Some("eval is evil.".to_string()),
            "debugger" if !self.options.debug => {
                Some("All 'debugger' statements should be removed.".to_string())
            }
            "with" if !self.options.with => Some("Unexpected 'with'.".to_string()),
            _ => None,
        }
    }

    fn check_lines(&self, src: &str) -> Vec<Problem> {
        let mut problems = Vec::new();
        for (index, line) in src.lines().enumerate() {
            let number = index + 1;
            if self.options.tabs {
                let indent: String = line.chars().take_while(|c| c.is_whitespace()).collect();
                if indent.contains('\t') {
                    problems.push(Problem::new(number, 1, "Use spaces, not tabs."));
                }
            }
            if self.options.trailing {
                let trimmed = line.trim_end();
                if trimmed.len() != line.len() {
                    let column = trimmed.chars().count() + 1;
                    problems.push(Problem::new(number, column, "Trailing whitespace."));
                }
            }
        }
        problems
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lint(src: &str) -> Vec<Problem> {
        JsLinter::default().lint(src).unwrap()
    }

    fn lint_with(src: &str, pairs: &[(&str, bool)]) -> Vec<Problem> {
        let map = pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect();
        JsLinter::new(LintOptions::from_map(&map)).lint(src).unwrap()
    }

    #[test]
    fn test_clean_source() {
        assert!(lint("var a = 1;\nif (a === 1) { a = 2; }\n").is_empty());
    }

    #[test]
    fn test_eqeqeq() {
        let problems = lint("if (a == b) {}\nif (c != d) {}");
        assert_eq!(problems.len(), 2);
        assert_eq!((problems[0].line, problems[0].column), (1, 7));
        assert_eq!(problems[0].message, "Expected '===' and instead saw '=='.");
        assert_eq!(problems[1].message, "Expected '!==' and instead saw '!='.");

        assert!(lint_with("a == b", &[("eqeqeq", false)]).is_empty());
    }

    #[test]
    fn test_tolerance_options() {
        let src = "eval(s);\ndebugger;\nwith (o) {}\nobj.eval(1);";
        let problems = lint(src);
        assert_eq!(problems.len(), 3);

        let tolerant = lint_with(src, &[("evil", true), ("debug", true), ("with", true)]);
        assert!(tolerant.is_empty());
    }

    #[test]
    fn test_member_access_across_comments() {
        assert!(lint("obj./* note */eval(x);\nobj. // next\n  debugger;").is_empty());
        assert_eq!(lint("/* a. */ eval(x);").len(), 1);
    }

    #[test]
    fn test_enforcement_options() {
        let src = "i++;\nx = a & b;";
        assert!(lint(src).is_empty());

        let problems = lint_with(src, &[("plusplus", true), ("bitwise", true)]);
        assert_eq!(problems.len(), 2);
        assert_eq!(problems[0].message, "Unexpected '++'.");
        assert_eq!(problems[1].message, "Unexpected use of '&'.");
    }

    #[test]
    fn test_whitespace_rules() {
        let problems = lint_with("var a;  \n\tvar b;\n", &[("trailing", true), ("tabs", true)]);
        assert_eq!(problems.len(), 2);
        assert_eq!((problems[0].line, problems[0].column), (1, 7));
        assert_eq!(problems[1].message, "Use spaces, not tabs.");
    }

    #[test]
    fn test_unknown_options_are_ignored() {
        let options = LintOptions::from_map(&[("nomen".to_string(), true)].into_iter().collect());
        assert_eq!(options, LintOptions::default());
    }

    #[test]
    fn test_error_cap() {
        let src = "a == b;\n".repeat(60);
        let problems = lint(&src);
        assert_eq!(problems.len(), MAX_ERRORS + 1);
        let last = problems.last().unwrap();
        assert!(last.message.starts_with("Too many errors."));
        assert_eq!(last.line, 50);
    }

    #[test]
    fn test_syntax_error_fails() {
        let err = JsLinter::default().lint("var s = \"open;").unwrap_err();
        assert_eq!((err.line, err.column), (1, 9));
    }
}
