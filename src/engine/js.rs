//! Token-level JavaScript compressor.
//!
//! Removes comments (except `/*!` ones) and redundant whitespace, keeps
//! the line breaks automatic semicolon insertion depends on, and applies a
//! few safe rewrites. Identifiers are never renamed, so the `munge` option
//! has no effect on the output.

use crate::engine::lexer::{
    is_ident_part, is_identifier_name, is_keyword, tokenize, Token, TokenKind,
};
use crate::engine::Problem;
use std::borrow::Cow;

/// Options for the JavaScript compressor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsOptions {
    /// Break lines after `;` or `}` past this column (0 = never)
    pub linebreak_pos: usize,
    /// Allow renaming of local identifiers
    pub munge: bool,
    /// Keep every `;`, including those right before `}`
    pub preserve_all_semicolons: bool,
    /// Skip rewrites such as `a["b"]` to `a.b`
    pub disable_optimizations: bool,
    /// Report constructs that hurt compression
    pub warn_on_issues: bool,
}

impl Default for JsOptions {
    fn default() -> Self {
        Self {
            linebreak_pos: 0,
            munge: true,
            preserve_all_semicolons: false,
            disable_optimizations: false,
            warn_on_issues: true,
        }
    }
}

/// Compressed script plus any non-fatal problems.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsMinified {
    /// Compressed source
    pub code: String,
    /// Warnings (empty unless `warn_on_issues`)
    pub warnings: Vec<Problem>,
}

/// Keywords whose operand may not move to another line.
const RESTRICTED: &[&str] = &["return", "throw", "break", "continue", "yield"];

struct Piece<'a> {
    kind: TokenKind,
    text: Cow<'a, str>,
    newline_before: bool,
}

impl Piece<'_> {
    fn is_punct(&self, p: &str) -> bool {
        self.kind == TokenKind::Punct && self.text == p
    }

    fn is_preserved_comment(&self) -> bool {
        self.kind == TokenKind::BlockComment
    }

    fn is_restricted(&self) -> bool {
        self.kind == TokenKind::Ident && RESTRICTED.contains(&&*self.text)
    }
}

/// Compress `src`.
///
/// Fails with the position of the first syntax problem the lexer finds.
pub fn minify_js(src: &str, options: &JsOptions) -> Result<JsMinified, Problem> {
    let tokens = tokenize(src)?;
    let tokens = significant(&tokens);

    let warnings = if options.warn_on_issues { find_issues(&tokens) } else { Vec::new() };
    let pieces = rewrite(&tokens, options);

    Ok(JsMinified { code: emit(&pieces, options.linebreak_pos), warnings })
}

/// Drop comments, carrying their line breaks over to the next token.
fn significant<'a>(tokens: &[Token<'a>]) -> Vec<Token<'a>> {
    let mut kept: Vec<Token<'a>> = Vec::with_capacity(tokens.len());
    let mut carry_newline = false;
    for token in tokens {
        let preserved = token.kind == TokenKind::BlockComment && token.text.starts_with("/*!");
        if token.is_comment() && !preserved {
            carry_newline |= token.newline_before || token.text.contains('\n');
            continue;
        }
        let mut token = token.clone();
        token.newline_before |= std::mem::take(&mut carry_newline);
        kept.push(token);
    }
    kept
}

fn find_issues(tokens: &[Token<'_>]) -> Vec<Problem> {
    let mut warnings = Vec::new();
    for (i, token) in tokens.iter().enumerate() {
        let called = tokens.get(i + 1).is_some_and(|t| t.is_punct("("));
        let member = i > 0 && (tokens[i - 1].is_punct(".") || tokens[i - 1].is_punct("?."));
        if !called || member {
            continue;
        }
        if token.is_word("eval") || token.is_word("with") {
            warnings.push(Problem::new(
                token.line,
                token.column,
                format!(
                    "Using '{0}' is not recommended. Moreover, using '{0}' reduces the level of compression!",
                    token.text
                ),
            ));
        }
    }
    warnings
}

/// Indices of `)` tokens closing the header of `if`, `for`, `while` or `with`.
fn control_headers(tokens: &[Token<'_>]) -> Vec<bool> {
    let mut closes_control = vec![false; tokens.len()];
    let mut stack: Vec<bool> = Vec::new();
    for (i, token) in tokens.iter().enumerate() {
        if token.is_punct("(") {
            let control = i > 0
                && tokens[i - 1].kind == TokenKind::Ident
                && matches!(tokens[i - 1].text, "if" | "for" | "while" | "with");
            stack.push(control);
        } else if token.is_punct(")") {
            closes_control[i] = stack.pop().unwrap_or(false);
        }
    }
    closes_control
}

fn rewrite<'a>(tokens: &[Token<'a>], options: &JsOptions) -> Vec<Piece<'a>> {
    let closes_control = control_headers(tokens);
    let mut pieces: Vec<Piece<'a>> = Vec::with_capacity(tokens.len());
    let mut i = 0;

    while i < tokens.len() {
        let token = &tokens[i];

        if token.is_punct(";")
            && !options.preserve_all_semicolons
            && redundant_semicolon(tokens, &closes_control, i)
        {
            i += 1;
            continue;
        }

        if !options.disable_optimizations {
            if let Some(name) = dotted_member(tokens, i) {
                pieces.push(Piece {
                    kind: TokenKind::Punct,
                    text: Cow::Borrowed("."),
                    newline_before: token.newline_before,
                });
                pieces.push(Piece {
                    kind: TokenKind::Ident,
                    text: Cow::Borrowed(name),
                    newline_before: false,
                });
                i += 3;
                continue;
            }
        }

        pieces.push(Piece {
            kind: token.kind,
            text: Cow::Borrowed(token.text),
            newline_before: token.newline_before,
        });
        i += 1;
    }
    pieces
}

/// A `;` directly before `}` that is not an empty statement body.
fn redundant_semicolon(tokens: &[Token<'_>], closes_control: &[bool], i: usize) -> bool {
    if !tokens.get(i + 1).is_some_and(|t| t.is_punct("}")) {
        return false;
    }
    match i.checked_sub(1).map(|p| &tokens[p]) {
        None => false,
        Some(prev) if prev.is_punct("{") || prev.is_punct(";") => false,
        Some(prev) if prev.is_punct(")") => !closes_control[i - 1],
        Some(prev) => !(prev.is_word("else") || prev.is_word("do")),
    }
}

/// `x["name"]` at `i` (the `[`) where `name` is a plain identifier.
fn dotted_member<'a>(tokens: &[Token<'a>], i: usize) -> Option<&'a str> {
    if i == 0 || !tokens[i].is_punct("[") {
        return None;
    }
    let prev = &tokens[i - 1];
    let object = match prev.kind {
        TokenKind::Ident => !is_keyword(prev.text) || matches!(prev.text, "this" | "super"),
        TokenKind::String | TokenKind::Template => true,
        TokenKind::Punct => matches!(prev.text, ")" | "]"),
        _ => false,
    };
    if !object {
        return None;
    }
    let literal = tokens.get(i + 1).filter(|t| t.kind == TokenKind::String)?;
    tokens.get(i + 2).filter(|t| t.is_punct("]"))?;

    let name = &literal.text[1..literal.text.len() - 1];
    is_identifier_name(name).then_some(name)
}

/// Whether `prev` can end an expression statement.
fn ends_expression(prev: &Piece<'_>) -> bool {
    match prev.kind {
        TokenKind::Ident => {
            !is_keyword(&prev.text)
                || matches!(&*prev.text, "this" | "super" | "true" | "false" | "null")
        }
        TokenKind::Number | TokenKind::String | TokenKind::Template | TokenKind::Regex => true,
        TokenKind::Punct => matches!(&*prev.text, ")" | "]" | "}" | "++" | "--"),
        _ => false,
    }
}

/// Whether `next` would be glued to the previous statement without a line
/// break.
fn starts_statement(next: &Piece<'_>) -> bool {
    match next.kind {
        TokenKind::Ident | TokenKind::Number | TokenKind::String => true,
        TokenKind::Punct => matches!(&*next.text, "{" | "!" | "~" | "++" | "--"),
        _ => false,
    }
}

fn keeps_newline(prev: &Piece<'_>, next: &Piece<'_>) -> bool {
    if prev.is_restricted() {
        return true;
    }
    ends_expression(prev) && starts_statement(next)
}

fn needs_space(prev: &Piece<'_>, next: &Piece<'_>) -> bool {
    let (Some(a), Some(b)) = (prev.text.chars().last(), next.text.chars().next()) else {
        return false;
    };
    (is_ident_part(a) && is_ident_part(b))
        || (prev.kind == TokenKind::Regex && is_ident_part(b))
        || (prev.kind == TokenKind::Number && b == '.')
        || (a == '+' && b == '+')
        || (a == '-' && b == '-')
        || (a == '/' && (b == '/' || b == '*'))
        || (a == '<' && b == '!')
}

fn emit(pieces: &[Piece<'_>], linebreak_pos: usize) -> String {
    let mut out = String::new();
    let mut line_len = 0usize;
    let mut break_pending = false;
    let mut prev: Option<&Piece<'_>> = None;

    for piece in pieces {
        if piece.is_preserved_comment() {
            // A line break here would end the statement of a restricted keyword.
            let inline = prev.is_some_and(|p| p.is_restricted())
                && !piece.newline_before
                && !piece.text.contains('\n');
            if inline {
                out.push(' ');
                out.push_str(&piece.text);
                line_len += piece.text.chars().count() + 1;
                continue;
            }
            if !out.is_empty() && !out.ends_with('\n') {
                out.push('\n');
            }
            out.push_str(&piece.text);
            out.push('\n');
            line_len = 0;
            break_pending = false;
            prev = None;
            continue;
        }

        if break_pending {
            out.push('\n');
            line_len = 0;
            break_pending = false;
        }

        if let Some(p) = prev.filter(|_| !out.ends_with('\n')) {
            if piece.newline_before && keeps_newline(p, piece) {
                out.push('\n');
                line_len = 0;
            } else if needs_space(p, piece) {
                out.push(' ');
                line_len += 1;
            }
        }

        out.push_str(&piece.text);
        match piece.text.rfind('\n') {
            Some(nl) => line_len = piece.text[nl + 1..].chars().count(),
            None => line_len += piece.text.chars().count(),
        }

        if linebreak_pos > 0
            && line_len > linebreak_pos
            && (piece.is_punct(";") || piece.is_punct("}"))
        {
            break_pending = true;
        }
        prev = Some(piece);
    }
    out
}
