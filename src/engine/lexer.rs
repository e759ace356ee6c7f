//! JavaScript tokenizer shared by the minifier and the linter.
//!
//! The lexer is deliberately shallow: it knows enough of the grammar to
//! tell regular expressions from division, to keep template literals
//! intact and to check that brackets balance. It does not build a syntax
//! tree.

use crate::engine::Problem;

/// Kind of a lexical token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Identifier or keyword
    Ident,
    /// Numeric literal
    Number,
    /// Quoted string literal, quotes included
    String,
    /// Template literal, backticks included
    Template,
    /// Regular expression literal, flags included
    Regex,
    /// Operator or punctuation
    Punct,
    /// `// ...` comment
    LineComment,
    /// `/* ... */` comment
    BlockComment,
}

/// A token with its position in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    /// Token kind
    pub kind: TokenKind,
    /// Source text of the token
    pub text: &'a str,
    /// Line (1-indexed)
    pub line: usize,
    /// Column (1-indexed)
    pub column: usize,
    /// Whether a line terminator separates this token from the previous one
    pub newline_before: bool,
}

impl Token<'_> {
    /// Check if this is the punctuator `p`.
    pub fn is_punct(&self, p: &str) -> bool {
        self.kind == TokenKind::Punct && self.text == p
    }

    /// Check if this is the identifier or keyword `word`.
    pub fn is_word(&self, word: &str) -> bool {
        self.kind == TokenKind::Ident && self.text == word
    }

    /// Check if this token is a comment.
    pub fn is_comment(&self) -> bool {
        matches!(self.kind, TokenKind::LineComment | TokenKind::BlockComment)
    }
}

/// Reserved words of the language.
pub const KEYWORDS: &[&str] = &[
    "await", "break", "case", "catch", "class", "const", "continue", "debugger", "default",
    "delete", "do", "else", "enum", "export", "extends", "false", "finally", "for", "function",
    "if", "implements", "import", "in", "instanceof", "interface", "let", "new", "null",
    "package", "private", "protected", "public", "return", "static", "super", "switch", "this",
    "throw", "true", "try", "typeof", "var", "void", "while", "with", "yield",
];

/// Keywords after which a `/` starts a regular expression.
const REGEX_PREFIX_KEYWORDS: &[&str] = &[
    "return", "typeof", "instanceof", "in", "of", "new", "delete", "void", "throw", "case", "do",
    "else", "yield", "await",
];

/// Punctuators, longest first.
const PUNCTUATORS: &[&str] = &[
    ">>>=", "...", "===", "!==", "**=", "<<=", ">>=", ">>>", "&&=", "||=", "??=", "=>", "==",
    "!=", "<=", ">=", "&&", "||", "??", "?.", "++", "--", "+=", "-=", "*=", "/=", "%=", "&=",
    "|=", "^=", "**", "<<", ">>", "{", "}", "(", ")", "[", "]", ";", ",", "<", ">", "+", "-", "*",
    "/", "%", "&", "|", "^", "!", "~", "?", ":", "=", ".", "@",
];

/// Check if `word` is a reserved word.
pub fn is_keyword(word: &str) -> bool {
    KEYWORDS.contains(&word)
}

/// Check if `c` can start an identifier.
pub fn is_ident_start(c: char) -> bool {
    c == '_' || c == '$' || c == '\\' || c.is_alphabetic()
}

/// Check if `c` can continue an identifier.
pub fn is_ident_part(c: char) -> bool {
    is_ident_start(c) || c.is_alphanumeric() || c == '\u{200c}' || c == '\u{200d}'
}

/// Check if `text` is a plain identifier usable after `.`.
pub fn is_identifier_name(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(c) if is_ident_start(c) && c != '\\' => {}
        _ => return false,
    }
    chars.all(|c| is_ident_part(c) && c != '\\') && !is_keyword(text)
}

fn is_line_terminator(c: char) -> bool {
    matches!(c, '\n' | '\r' | '\u{2028}' | '\u{2029}')
}

fn is_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\u{b}' | '\u{c}' | '\u{a0}' | '\u{feff}')
        || (c.is_whitespace() && !is_line_terminator(c))
}

/// Tokenize `src`, including comments.
///
/// Fails on unterminated literals or comments, illegal characters and
/// unbalanced brackets.
pub fn tokenize(src: &str) -> Result<Vec<Token<'_>>, Problem> {
    Lexer::new(src).run()
}

struct Lexer<'a> {
    src: &'a str,
    pos: usize,
    line: usize,
    column: usize,
    newline_pending: bool,
    tokens: Vec<Token<'a>>,
    brackets: Vec<(char, usize, usize)>,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            pos: 0,
            line: 1,
            column: 1,
            newline_pending: false,
            tokens: Vec::new(),
            brackets: Vec::new(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        self.src[self.pos..].chars().nth(1)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        match c {
            '\r' if self.peek() == Some('\n') => self.column += 1,
            c if is_line_terminator(c) => {
                self.line += 1;
                self.column = 1;
            }
            _ => self.column += 1,
        }
        Some(c)
    }

    fn error_at(&self, line: usize, column: usize, message: impl Into<String>) -> Problem {
        Problem::new(line, column, message)
    }

    fn run(mut self) -> Result<Vec<Token<'a>>, Problem> {
        if self.src.starts_with("#!") {
            self.skip_line_comment_body();
        }

        while let Some(c) = self.peek() {
            if is_line_terminator(c) {
                self.bump();
                self.newline_pending = true;
                continue;
            }
            if is_whitespace(c) {
                self.bump();
                continue;
            }

            let (start, line, column) = (self.pos, self.line, self.column);
            let kind = self.scan_token(c, line, column)?;
            let text = &self.src[start..self.pos];

            if kind == TokenKind::Punct {
                self.track_bracket(text, line, column)?;
            }
            self.tokens.push(Token {
                kind,
                text,
                line,
                column,
                newline_before: std::mem::take(&mut self.newline_pending),
            });
            if kind == TokenKind::BlockComment && text.chars().any(is_line_terminator) {
                self.newline_pending = true;
            }
        }

        if let Some((open, line, column)) = self.brackets.pop() {
            return Err(self.error_at(
                line,
                column,
                format!("Missing '{}' to match '{}'.", closing(open), open),
            ));
        }
        Ok(self.tokens)
    }

    fn scan_token(&mut self, c: char, line: usize, column: usize) -> Result<TokenKind, Problem> {
        match c {
            '/' if self.peek_second() == Some('/') => {
                self.skip_line_comment_body();
                Ok(TokenKind::LineComment)
            }
            '/' if self.peek_second() == Some('*') => {
                self.skip_block_comment(line, column)?;
                Ok(TokenKind::BlockComment)
            }
            '/' if self.regex_allowed() => {
                self.scan_regex(line, column)?;
                Ok(TokenKind::Regex)
            }
            '\'' | '"' => {
                self.bump();
                self.scan_string_body(c, line, column)?;
                Ok(TokenKind::String)
            }
            '`' => {
                self.bump();
                self.scan_template_body(line, column)?;
                Ok(TokenKind::Template)
            }
            '#' if self.peek_second().is_some_and(is_ident_start) => {
                self.bump();
                self.scan_ident();
                Ok(TokenKind::Ident)
            }
            c if c.is_ascii_digit() => {
                self.scan_number();
                Ok(TokenKind::Number)
            }
            '.' if self.peek_second().is_some_and(|d| d.is_ascii_digit()) => {
                self.scan_number();
                Ok(TokenKind::Number)
            }
            c if is_ident_start(c) => {
                self.scan_ident();
                Ok(TokenKind::Ident)
            }
            _ => {
                let rest = &self.src[self.pos..];
                let punct = PUNCTUATORS
                    .iter()
                    .find(|p| rest.starts_with(**p))
                    .filter(|p| !(**p == "?." && starts_with_digit(&rest[2..])));
                match punct {
                    Some(p) => {
                        for _ in p.chars() {
                            self.bump();
                        }
                        Ok(TokenKind::Punct)
                    }
                    None if rest.starts_with('?') => {
                        self.bump();
                        Ok(TokenKind::Punct)
                    }
                    None => Err(self.error_at(
                        line,
                        column,
                        format!("Unexpected character '{}'.", c.escape_debug()),
                    )),
                }
            }
        }
    }

    fn last_significant(&self) -> Option<&Token<'a>> {
        self.tokens.iter().rev().find(|t| !t.is_comment())
    }

    fn regex_allowed(&self) -> bool {
        match self.last_significant() {
            None => true,
            Some(t) => match t.kind {
                TokenKind::Punct => !matches!(t.text, ")" | "]" | "}"),
                TokenKind::Ident => REGEX_PREFIX_KEYWORDS.contains(&t.text),
                _ => false,
            },
        }
    }

    fn track_bracket(&mut self, text: &str, line: usize, column: usize) -> Result<(), Problem> {
        match text {
            "(" | "[" | "{" => {
                let open = text.chars().next().unwrap_or('(');
                self.brackets.push((open, line, column));
            }
            ")" | "]" | "}" => {
                let close = text.chars().next().unwrap_or(')');
                match self.brackets.pop() {
                    Some((open, _, _)) if closing(open) == close => {}
                    Some((open, open_line, _)) => {
                        return Err(self.error_at(
                            line,
                            column,
                            format!(
                                "Expected '{}' to match '{}' from line {} and instead saw '{}'.",
                                closing(open),
                                open,
                                open_line,
                                close
                            ),
                        ));
                    }
                    None => {
                        return Err(self.error_at(line, column, format!("Unmatched '{}'.", close)))
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn skip_line_comment_body(&mut self) {
        while let Some(c) = self.peek() {
            if is_line_terminator(c) {
                break;
            }
            self.bump();
        }
    }

    fn skip_block_comment(&mut self, line: usize, column: usize) -> Result<(), Problem> {
        // Opening "/*"
        self.bump();
        self.bump();
        loop {
            match self.bump() {
                None => return Err(self.error_at(line, column, "Unclosed comment.")),
                Some('*') if self.peek() == Some('/') => {
                    self.bump();
                    return Ok(());
                }
                Some(_) => {}
            }
        }
    }

    fn scan_string_body(&mut self, quote: char, line: usize, column: usize) -> Result<(), Problem> {
        loop {
            match self.peek() {
                None => return Err(self.error_at(line, column, "Unclosed string.")),
                Some('\n') | Some('\r') => {
                    return Err(self.error_at(line, column, "Unclosed string."));
                }
                Some('\\') => {
                    self.bump();
                    if self.bump() == Some('\r') && self.peek() == Some('\n') {
                        self.bump();
                    }
                }
                Some(c) => {
                    self.bump();
                    if c == quote {
                        return Ok(());
                    }
                }
            }
        }
    }

    fn scan_template_body(&mut self, line: usize, column: usize) -> Result<(), Problem> {
        loop {
            match self.bump() {
                None => return Err(self.error_at(line, column, "Unclosed template literal.")),
                Some('\\') => {
                    self.bump();
                }
                Some('`') => return Ok(()),
                Some('$') if self.peek() == Some('{') => {
                    self.bump();
                    self.skip_template_expression(line, column)?;
                }
                Some(_) => {}
            }
        }
    }

    fn skip_template_expression(&mut self, line: usize, column: usize) -> Result<(), Problem> {
        let mut depth = 1usize;
        loop {
            let (inner_line, inner_column) = (self.line, self.column);
            match self.bump() {
                None => return Err(self.error_at(line, column, "Unclosed template literal.")),
                Some('{') => depth += 1,
                Some('}') => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(());
                    }
                }
                Some(q @ ('\'' | '"')) => self.scan_string_body(q, inner_line, inner_column)?,
                Some('`') => self.scan_template_body(inner_line, inner_column)?,
                Some('/') if self.peek() == Some('/') => self.skip_line_comment_body(),
                Some('/') if self.peek() == Some('*') => {
                    self.bump();
                    loop {
                        match self.bump() {
                            None => {
                                return Err(self.error_at(
                                    inner_line,
                                    inner_column,
                                    "Unclosed comment.",
                                ))
                            }
                            Some('*') if self.peek() == Some('/') => {
                                self.bump();
                                break;
                            }
                            Some(_) => {}
                        }
                    }
                }
                Some(_) => {}
            }
        }
    }

    fn scan_regex(&mut self, line: usize, column: usize) -> Result<(), Problem> {
        // Opening "/"
        self.bump();
        let mut in_class = false;
        loop {
            match self.peek() {
                None => return Err(self.error_at(line, column, "Unclosed regular expression.")),
                Some(c) if is_line_terminator(c) => {
                    return Err(self.error_at(line, column, "Unclosed regular expression."));
                }
                Some('\\') => {
                    self.bump();
                    if self.peek().is_some_and(|c| !is_line_terminator(c)) {
                        self.bump();
                    }
                }
                Some('[') => {
                    in_class = true;
                    self.bump();
                }
                Some(']') => {
                    in_class = false;
                    self.bump();
                }
                Some('/') if !in_class => {
                    self.bump();
                    break;
                }
                Some(_) => {
                    self.bump();
                }
            }
        }
        while self.peek().is_some_and(is_ident_part) {
            self.bump();
        }
        Ok(())
    }

    fn scan_number(&mut self) {
        let rest = &self.src[self.pos..];
        let radix_prefixed = rest.len() > 1
            && rest.starts_with('0')
            && matches!(rest.as_bytes()[1], b'x' | b'X' | b'b' | b'B' | b'o' | b'O');
        if radix_prefixed {
            self.bump();
            self.bump();
            while self.peek().is_some_and(|c| c.is_ascii_alphanumeric() || c == '_') {
                self.bump();
            }
            return;
        }

        self.eat_digits();
        if self.peek() == Some('.') {
            self.bump();
            self.eat_digits();
        }
        if matches!(self.peek(), Some('e') | Some('E')) {
            let signed = matches!(self.peek_second(), Some('+') | Some('-'));
            self.bump();
            if signed {
                self.bump();
            }
            self.eat_digits();
        }
        if self.peek() == Some('n') {
            self.bump();
        }
    }

    fn eat_digits(&mut self) {
        while self.peek().is_some_and(|c| c.is_ascii_digit() || c == '_') {
            self.bump();
        }
    }

    fn scan_ident(&mut self) {
        while let Some(c) = self.peek() {
            if c == '\\' {
                // Unicode escape: \uXXXX or \u{...}
                self.bump();
                if self.peek() == Some('u') {
                    self.bump();
                }
                if self.peek() == Some('{') {
                    while let Some(c) = self.bump() {
                        if c == '}' {
                            break;
                        }
                    }
                }
                continue;
            }
            if !is_ident_part(c) {
                break;
            }
            self.bump();
        }
    }
}

fn closing(open: char) -> char {
    match open {
        '(' => ')',
        '[' => ']',
        _ => '}',
    }
}

fn starts_with_digit(s: &str) -> bool {
    s.chars().next().is_some_and(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<(TokenKind, &str)> {
        tokenize(src).unwrap().into_iter().map(|t| (t.kind, t.text)).collect()
    }

    #[test]
    fn test_basic_tokens() {
        assert_eq!(
            kinds("var a = 1.5e3;"),
            vec![
                (TokenKind::Ident, "var"),
                (TokenKind::Ident, "a"),
                (TokenKind::Punct, "="),
                (TokenKind::Number, "1.5e3"),
                (TokenKind::Punct, ";"),
            ]
        );
    }

    #[test]
    fn test_regex_versus_division() {
        assert_eq!(
            kinds("a / b / c"),
            vec![
                (TokenKind::Ident, "a"),
                (TokenKind::Punct, "/"),
                (TokenKind::Ident, "b"),
                (TokenKind::Punct, "/"),
                (TokenKind::Ident, "c"),
            ]
        );
        assert_eq!(
            kinds("x = /[/]+/g"),
            vec![
                (TokenKind::Ident, "x"),
                (TokenKind::Punct, "="),
                (TokenKind::Regex, "/[/]+/g"),
            ]
        );
        assert_eq!(kinds("return /a/")[1], (TokenKind::Regex, "/a/"));
    }

    #[test]
    fn test_template_with_nested_braces() {
        let tokens = kinds("f(`a ${ {b: `c${d}`}.b } e`)");
        assert_eq!(tokens[2], (TokenKind::Template, "`a ${ {b: `c${d}`}.b } e`"));
        assert_eq!(tokens.len(), 4);
    }

    #[test]
    fn test_comments_and_newlines() {
        let tokens = tokenize("a // one\n/* two\n */ b").unwrap();
        assert_eq!(tokens[1].kind, TokenKind::LineComment);
        assert_eq!(tokens[2].kind, TokenKind::BlockComment);
        assert!(tokens[2].newline_before);
        assert!(tokens[3].newline_before);
        assert_eq!(tokens[3].line, 3);
    }

    #[test]
    fn test_positions() {
        let tokens = tokenize("a\n  bc").unwrap();
        assert_eq!((tokens[1].line, tokens[1].column), (2, 3));
    }

    #[test]
    fn test_unterminated_string() {
        let err = tokenize("var s = 'abc;\nfoo();").unwrap_err();
        assert_eq!((err.line, err.column), (1, 9));
        assert_eq!(err.message, "Unclosed string.");
    }

    #[test]
    fn test_unterminated_comment() {
        let err = tokenize("a;\n/* never closed").unwrap_err();
        assert_eq!((err.line, err.column), (2, 1));
    }

    #[test]
    fn test_unbalanced_brackets() {
        let err = tokenize("function f() {\n  return (1;\n}").unwrap_err();
        assert_eq!(err.line, 3);
        assert!(err.message.starts_with("Expected ')' to match '('"));

        let err = tokenize("if (a) { b();").unwrap_err();
        assert_eq!(err.message, "Missing '}' to match '{'.");
        assert_eq!((err.line, err.column), (1, 8));

        let err = tokenize("a; }").unwrap_err();
        assert_eq!(err.message, "Unmatched '}'.");
    }

    #[test]
    fn test_illegal_character() {
        let err = tokenize("a = b \u{1} c").unwrap_err();
        assert_eq!(err.column, 7);
    }

    #[test]
    fn test_optional_chaining_and_ternary_decimal() {
        assert_eq!(kinds("a?.b")[1], (TokenKind::Punct, "?."));
        assert_eq!(kinds("a?.5:1")[1], (TokenKind::Punct, "?"));
        assert_eq!(kinds("a?.5:1")[2], (TokenKind::Number, ".5"));
    }

    #[test]
    fn test_identifier_name() {
        assert!(is_identifier_name("foo_bar$"));
        assert!(!is_identifier_name("class"));
        assert!(!is_identifier_name("1a"));
        assert!(!is_identifier_name("a-b"));
        assert!(!is_identifier_name(""));
    }
}
