//! CSS minification backed by lightningcss.

use crate::engine::Problem;
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};

/// Options for the CSS minifier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CssOptions {
    /// Break lines after `}` past this column (0 = never)
    pub linebreak_pos: usize,
}

/// Minify a stylesheet.
///
/// Parse errors come back as a [`Problem`] with 1-indexed line and column.
pub fn minify_css(src: &str, options: &CssOptions) -> Result<String, Problem> {
    let mut sheet = StyleSheet::parse(src, ParserOptions::default())
        .map_err(|e| to_problem(e.kind.to_string(), e.loc))?;
    sheet.minify(MinifyOptions::default()).map_err(|e| to_problem(e.kind.to_string(), e.loc))?;
    let printed = sheet
        .to_css(PrinterOptions { minify: true, ..PrinterOptions::default() })
        .map_err(|e| to_problem(e.kind.to_string(), e.loc))?;

    Ok(break_lines(&printed.code, options.linebreak_pos))
}

fn to_problem(message: String, loc: Option<lightningcss::error::ErrorLocation>) -> Problem {
    match loc {
        // lightningcss lines are 0-based, columns 1-based
        Some(loc) => Problem::new(loc.line as usize + 1, loc.column as usize, message),
        None => Problem::new(1, 0, message),
    }
}

/// Insert a newline after each `}` that ends past `linebreak_pos`.
fn break_lines(css: &str, linebreak_pos: usize) -> String {
    if linebreak_pos == 0 {
        return css.to_string();
    }

    let mut out = String::with_capacity(css.len() + css.len() / linebreak_pos.max(1));
    let mut column = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut break_pending = false;

    for c in css.chars() {
        if break_pending {
            out.push('\n');
            column = 0;
            break_pending = false;
        }
        out.push(c);
        column = if c == '\n' { 0 } else { column + 1 };

        match quote {
            Some(_) if escaped => escaped = false,
            Some(_) if c == '\\' => escaped = true,
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '"' || c == '\'' => quote = Some(c),
            None if c == '}' && column > linebreak_pos => break_pending = true,
            None => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn min(src: &str) -> String {
        minify_css(src, &CssOptions::default()).unwrap()
    }

    #[test]
    fn test_minifies_rules() {
        assert_eq!(min("body{color:red;}"), "body{color:red}");
        assert_eq!(min("div {\n  margin: 0;\n}\n"), "div{margin:0}");
    }

    #[test]
    fn test_strips_comments() {
        assert_eq!(min("/* header */\na { color: red } /* tail */"), "a{color:red}");
    }

    #[test]
    fn test_linebreak_after_rules() {
        let options = CssOptions { linebreak_pos: 5 };
        assert_eq!(
            minify_css("a{color:red}b{margin:0}", &options).unwrap(),
            "a{color:red}\nb{margin:0}"
        );
    }

    #[test]
    fn test_break_lines_ignores_braces_in_strings() {
        assert_eq!(
            break_lines("a{content:\"}}}}\"}b{x:y}", 3),
            "a{content:\"}}}}\"}\nb{x:y}"
        );
        assert_eq!(break_lines("a{}b{}", 0), "a{}b{}");
    }

    #[test]
    fn test_parse_error_position() {
        let err = minify_css("a{color:red}\n.b..c{color:red}", &CssOptions::default()).unwrap_err();
        assert_eq!(err.line, 2);
        assert!(!err.message.is_empty());
    }
}
