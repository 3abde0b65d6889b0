//! Tokenizer for Python source code.
//!
//! Produces a CPython-style token stream: `Name`, `Number`, `String`, and
//! `Op` tokens plus the structural `Newline`, `Indent`, `Dedent`, and
//! `EndMarker` tokens that encode Python's line- and indentation-based
//! block structure. Keywords are emitted as `Name` tokens; the parser
//! distinguishes them.
//!
//! Blank lines and comment-only lines produce no tokens. Newlines inside
//! brackets are implicit line joins and produce no `Newline` token.
//! `Indent`/`Dedent`/`EndMarker` and the synthetic end-of-file `Newline`
//! carry empty text and a zero-width span.

use codeshift_core::span::Span;
use memchr::memchr;
use thiserror::Error;

/// Token kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokType {
    /// Identifier or keyword.
    Name,
    /// Integer, float, or imaginary literal.
    Number,
    /// String literal, including prefix and quotes.
    String,
    /// Operator or delimiter.
    Op,
    /// End of a logical line.
    Newline,
    /// Increase in indentation depth.
    Indent,
    /// Decrease in indentation depth.
    Dedent,
    /// End of input.
    EndMarker,
}

/// A single token with its source slice and position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokType,
    /// Source text of the token. Empty for structural tokens.
    pub text: &'a str,
    /// Byte span of the token in the source.
    pub span: Span,
    /// 1-indexed line of the token start.
    pub line: u32,
    /// 1-indexed column of the token start.
    pub col: u32,
}

/// Errors produced while tokenizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokError {
    #[error("inconsistent use of indentation at line {line}")]
    InconsistentIndent { line: u32 },
    #[error("unterminated string literal starting at line {line}, column {col}")]
    UnterminatedString { line: u32, col: u32 },
    #[error("invalid character {ch:?} at line {line}, column {col}")]
    InvalidChar { ch: char, line: u32, col: u32 },
    #[error("unmatched {ch:?} at line {line}, column {col}")]
    UnmatchedBracket { ch: char, line: u32, col: u32 },
    #[error("unexpected end of file inside {open:?}")]
    UnexpectedEof { open: char },
    #[error("invalid number literal at line {line}, column {col}")]
    BadNumber { line: u32, col: u32 },
}

impl TokError {
    /// Best-effort position of the error, when one is recorded.
    pub fn position(&self) -> Option<(u32, u32)> {
        match *self {
            TokError::InconsistentIndent { line } => Some((line, 1)),
            TokError::UnterminatedString { line, col } => Some((line, col)),
            TokError::InvalidChar { line, col, .. } => Some((line, col)),
            TokError::UnmatchedBracket { line, col, .. } => Some((line, col)),
            TokError::UnexpectedEof { .. } => None,
            TokError::BadNumber { line, col } => Some((line, col)),
        }
    }
}

/// Tokenize Python source into a token vector ending with `EndMarker`.
pub fn tokenize(source: &str) -> Result<Vec<Token<'_>>, TokError> {
    TokState::new(source).run()
}

const MAX_OP_LEN: usize = 3;

/// Multi-character operators, longest first.
const OPS: &[&str] = &[
    "**=", "//=", ">>=", "<<=", "...", "==", "!=", "<=", ">=", "->", ":=", "+=", "-=", "*=",
    "/=", "%=", "&=", "|=", "^=", "@=", "**", "//", "<<", ">>",
];

const SINGLE_OPS: &str = "+-*/%@&|^~<>=(),:[]{};.";

struct TokState<'a> {
    source: &'a str,
    pos: usize,
    line: u32,
    col: u32,
    at_line_start: bool,
    indents: Vec<usize>,
    /// Open brackets with the position they were opened at.
    brackets: Vec<(char, u32, u32)>,
    tokens: Vec<Token<'a>>,
    emitted_on_line: bool,
}

impl<'a> TokState<'a> {
    fn new(source: &'a str) -> Self {
        TokState {
            source,
            pos: 0,
            line: 1,
            col: 1,
            at_line_start: true,
            indents: vec![0],
            brackets: Vec::new(),
            tokens: Vec::new(),
            emitted_on_line: false,
        }
    }

    fn run(mut self) -> Result<Vec<Token<'a>>, TokError> {
        loop {
            if self.at_line_start && self.brackets.is_empty() {
                if !self.handle_line_start()? {
                    break;
                }
            }
            match self.peek() {
                None => break,
                Some(c) => self.next_token(c)?,
            }
        }

        if let Some(&(open, _, _)) = self.brackets.last() {
            return Err(TokError::UnexpectedEof { open });
        }
        if self.emitted_on_line {
            self.push_structural(TokType::Newline);
        }
        while self.indents.len() > 1 {
            self.indents.pop();
            self.push_structural(TokType::Dedent);
        }
        self.push_structural(TokType::EndMarker);
        Ok(self.tokens)
    }

    // ------------------------------------------------------------------
    // Line structure
    // ------------------------------------------------------------------

    /// Consume indentation, blank lines, and comment-only lines at the
    /// start of a logical line. Emits Indent/Dedent tokens as the
    /// indentation level changes. Returns false at end of input.
    fn handle_line_start(&mut self) -> Result<bool, TokError> {
        loop {
            let mut width = 0usize;
            while let Some(c) = self.peek() {
                match c {
                    ' ' => {
                        width += 1;
                        self.bump();
                    }
                    '\t' => {
                        width += 8 - (width % 8);
                        self.bump();
                    }
                    _ => break,
                }
            }
            match self.peek() {
                None => return Ok(false),
                Some('\n') => {
                    self.bump();
                }
                Some('\r') => {
                    self.bump();
                    if self.peek() == Some('\n') {
                        self.bump();
                    }
                }
                Some('#') => {
                    self.skip_comment();
                }
                Some(_) => {
                    let current = *self.indents.last().unwrap_or(&0);
                    if width > current {
                        self.indents.push(width);
                        self.push_structural(TokType::Indent);
                    } else if width < current {
                        while self.indents.len() > 1 && *self.indents.last().unwrap_or(&0) > width
                        {
                            self.indents.pop();
                            self.push_structural(TokType::Dedent);
                        }
                        if *self.indents.last().unwrap_or(&0) != width {
                            return Err(TokError::InconsistentIndent { line: self.line });
                        }
                    }
                    self.at_line_start = false;
                    self.emitted_on_line = false;
                    return Ok(true);
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Token dispatch
    // ------------------------------------------------------------------

    fn next_token(&mut self, c: char) -> Result<(), TokError> {
        match c {
            ' ' | '\t' => {
                self.bump();
                Ok(())
            }
            '\r' => {
                self.bump();
                Ok(())
            }
            '\\' if self.peek_at(1) == Some('\n') => {
                self.bump();
                self.bump();
                Ok(())
            }
            '\n' => {
                if self.brackets.is_empty() {
                    let start = self.pos;
                    let (line, col) = (self.line, self.col);
                    self.bump();
                    if self.emitted_on_line {
                        self.push_token(TokType::Newline, start, line, col);
                    }
                    self.at_line_start = true;
                } else {
                    self.bump();
                }
                Ok(())
            }
            '#' => {
                self.skip_comment();
                Ok(())
            }
            c if is_ident_start(c) => self.name_or_prefixed_string(),
            c if c.is_ascii_digit() => self.number(),
            '.' if self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) => self.number(),
            '"' | '\'' => self.string(self.pos, self.line, self.col, false),
            _ => self.op(c),
        }
    }

    fn name_or_prefixed_string(&mut self) -> Result<(), TokError> {
        let start = self.pos;
        let (line, col) = (self.line, self.col);
        while let Some(c) = self.peek() {
            if is_ident_continue(c) {
                self.bump();
            } else {
                break;
            }
        }
        let ident = &self.source[start..self.pos];
        if matches!(self.peek(), Some('"') | Some('\''))
            && ident.len() <= 2
            && ident.chars().all(|c| "rRbBuUfFtT".contains(c))
        {
            return self.string(start, line, col, ident.contains('r') || ident.contains('R'));
        }
        self.push_token(TokType::Name, start, line, col);
        Ok(())
    }

    fn number(&mut self) -> Result<(), TokError> {
        let start = self.pos;
        let (line, col) = (self.line, self.col);
        let bad = TokError::BadNumber { line, col };

        if self.peek() == Some('0')
            && matches!(
                self.peek_at(1),
                Some('x') | Some('X') | Some('o') | Some('O') | Some('b') | Some('B')
            )
        {
            self.bump();
            self.bump();
            let digits_start = self.pos;
            while let Some(c) = self.peek() {
                if c.is_ascii_alphanumeric() || c == '_' {
                    self.bump();
                } else {
                    break;
                }
            }
            if self.pos == digits_start {
                return Err(bad);
            }
        } else {
            self.digit_run();
            if self.peek() == Some('.') {
                self.bump();
                self.digit_run();
            }
            if matches!(self.peek(), Some('e') | Some('E')) {
                self.bump();
                if matches!(self.peek(), Some('+') | Some('-')) {
                    self.bump();
                }
                let exp_start = self.pos;
                self.digit_run();
                if self.pos == exp_start {
                    return Err(bad);
                }
            }
            if matches!(self.peek(), Some('j') | Some('J')) {
                self.bump();
            }
        }

        let text = &self.source[start..self.pos];
        if text.ends_with('_') {
            return Err(bad);
        }
        if self.peek().is_some_and(is_ident_start) {
            return Err(bad);
        }
        self.push_token(TokType::Number, start, line, col);
        Ok(())
    }

    fn digit_run(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() || c == '_' {
                self.bump();
            } else {
                break;
            }
        }
    }

    /// Lex a string literal. `start` points at the prefix (if any);
    /// the cursor is at the opening quote.
    fn string(&mut self, start: usize, line: u32, col: u32, _raw: bool) -> Result<(), TokError> {
        let unterminated = TokError::UnterminatedString { line, col };
        let quote = match self.peek() {
            Some(q @ ('"' | '\'')) => q,
            _ => return Err(unterminated),
        };
        self.bump();
        let triple = self.peek() == Some(quote) && self.peek_at(1) == Some(quote);
        if triple {
            self.bump();
            self.bump();
        } else if self.peek() == Some(quote) {
            // Empty string.
            self.bump();
            self.push_token(TokType::String, start, line, col);
            return Ok(());
        }

        loop {
            match self.peek() {
                None => return Err(unterminated),
                Some('\\') => {
                    self.bump();
                    if self.peek().is_none() {
                        return Err(unterminated);
                    }
                    self.bump();
                }
                Some('\n') if !triple => return Err(unterminated),
                Some(q) if q == quote => {
                    if !triple {
                        self.bump();
                        break;
                    }
                    if self.peek_at(1) == Some(quote) && self.peek_at(2) == Some(quote) {
                        self.bump();
                        self.bump();
                        self.bump();
                        break;
                    }
                    self.bump();
                }
                Some(_) => {
                    self.bump();
                }
            }
        }
        self.push_token(TokType::String, start, line, col);
        Ok(())
    }

    fn op(&mut self, c: char) -> Result<(), TokError> {
        let start = self.pos;
        let (line, col) = (self.line, self.col);
        let rest = &self.source[self.pos..];

        for op in OPS {
            debug_assert!(op.len() <= MAX_OP_LEN);
            if rest.starts_with(op) {
                for _ in 0..op.len() {
                    self.bump();
                }
                self.push_token(TokType::Op, start, line, col);
                return Ok(());
            }
        }

        match c {
            '(' | '[' | '{' => {
                self.brackets.push((c, line, col));
                self.bump();
            }
            ')' | ']' | '}' => {
                let expected = match c {
                    ')' => '(',
                    ']' => '[',
                    _ => '{',
                };
                match self.brackets.pop() {
                    Some((open, _, _)) if open == expected => {}
                    _ => return Err(TokError::UnmatchedBracket { ch: c, line, col }),
                }
                self.bump();
            }
            c if SINGLE_OPS.contains(c) => {
                self.bump();
            }
            c => return Err(TokError::InvalidChar { ch: c, line, col }),
        }
        self.push_token(TokType::Op, start, line, col);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Cursor primitives
    // ------------------------------------------------------------------

    fn peek(&self) -> Option<char> {
        self.source[self.pos..].chars().next()
    }

    fn peek_at(&self, n: usize) -> Option<char> {
        self.source[self.pos..].chars().nth(n)
    }

    fn bump(&mut self) {
        if let Some(c) = self.peek() {
            self.pos += c.len_utf8();
            if c == '\n' {
                self.line += 1;
                self.col = 1;
            } else {
                self.col += 1;
            }
        }
    }

    /// Skip a `#` comment up to (not including) the line's newline.
    fn skip_comment(&mut self) {
        let bytes = self.source.as_bytes();
        match memchr(b'\n', &bytes[self.pos..]) {
            Some(n) => {
                // Comment text contains no newline, so column tracking can
                // jump in one step.
                self.col += self.source[self.pos..self.pos + n].chars().count() as u32;
                self.pos += n;
            }
            None => {
                self.col += self.source[self.pos..].chars().count() as u32;
                self.pos = self.source.len();
            }
        }
    }

    fn push_token(&mut self, kind: TokType, start: usize, line: u32, col: u32) {
        self.tokens.push(Token {
            kind,
            text: &self.source[start..self.pos],
            span: Span::new(start as u64, self.pos as u64),
            line,
            col,
        });
        self.emitted_on_line = !matches!(kind, TokType::Newline);
    }

    fn push_structural(&mut self, kind: TokType) {
        self.tokens.push(Token {
            kind,
            text: "",
            span: Span::new(self.pos as u64, self.pos as u64),
            line: self.line,
            col: self.col,
        });
        if matches!(kind, TokType::Newline) {
            self.emitted_on_line = false;
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c == '_' || c.is_alphabetic()
}

fn is_ident_continue(c: char) -> bool {
    c == '_' || c.is_alphanumeric()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn tokenize_with_end_marker(text: &str) -> Result<Vec<(TokType, &str)>, TokError> {
        Ok(tokenize(text)?.into_iter().map(|t| (t.kind, t.text)).collect())
    }

    fn tokenize_all(text: &str) -> Result<Vec<(TokType, &str)>, TokError> {
        let mut result = tokenize_with_end_marker(text)?;
        assert_eq!(result.pop().expect("EndMarker").0, TokType::EndMarker);
        // Also remove the synthetic newline at the end, if present.
        if let Some((TokType::Newline, "")) = result.last() {
            result.pop();
        }
        Ok(result)
    }

    #[test]
    fn test_identifier() {
        assert_eq!(
            tokenize_all("test input"),
            Ok(vec![(TokType::Name, "test"), (TokType::Name, "input")])
        );

        assert_eq!(
            tokenize_all("__with_underscores"),
            Ok(vec![(TokType::Name, "__with_underscores")])
        );

        assert_eq!(
            tokenize_all("{ends_with_op}"),
            Ok(vec![
                (TokType::Op, "{"),
                (TokType::Name, "ends_with_op"),
                (TokType::Op, "}")
            ])
        );
    }

    #[test]
    fn test_keywords_are_names() {
        assert_eq!(
            tokenize_all("def f"),
            Ok(vec![(TokType::Name, "def"), (TokType::Name, "f")])
        );
    }

    #[test]
    fn test_indent_dedent() {
        assert_eq!(
            tokenize_all("def f():\n    pass\nx"),
            Ok(vec![
                (TokType::Name, "def"),
                (TokType::Name, "f"),
                (TokType::Op, "("),
                (TokType::Op, ")"),
                (TokType::Op, ":"),
                (TokType::Newline, "\n"),
                (TokType::Indent, ""),
                (TokType::Name, "pass"),
                (TokType::Newline, "\n"),
                (TokType::Dedent, ""),
                (TokType::Name, "x"),
            ])
        );
    }

    #[test]
    fn test_dedent_at_eof() {
        let toks = tokenize("if x:\n    pass").unwrap();
        let kinds: Vec<TokType> = toks.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokType::Name,
                TokType::Name,
                TokType::Op,
                TokType::Newline,
                TokType::Indent,
                TokType::Name,
                TokType::Newline,
                TokType::Dedent,
                TokType::EndMarker,
            ]
        );
    }

    #[test]
    fn test_blank_and_comment_lines_skipped() {
        assert_eq!(
            tokenize_all("x\n\n# comment\ny"),
            Ok(vec![
                (TokType::Name, "x"),
                (TokType::Newline, "\n"),
                (TokType::Name, "y"),
            ])
        );
    }

    #[test]
    fn test_trailing_comment() {
        assert_eq!(
            tokenize_all("x = 1  # set x"),
            Ok(vec![
                (TokType::Name, "x"),
                (TokType::Op, "="),
                (TokType::Number, "1"),
            ])
        );
    }

    #[test]
    fn test_implicit_line_join() {
        assert_eq!(
            tokenize_all("f(\n    1,\n)"),
            Ok(vec![
                (TokType::Name, "f"),
                (TokType::Op, "("),
                (TokType::Number, "1"),
                (TokType::Op, ","),
                (TokType::Op, ")"),
            ])
        );
    }

    #[test]
    fn test_backslash_continuation() {
        assert_eq!(
            tokenize_all("x = \\\n    1"),
            Ok(vec![
                (TokType::Name, "x"),
                (TokType::Op, "="),
                (TokType::Number, "1"),
            ])
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            tokenize_all("1 2.5 0x1f 1e10 1.5e-3 3j .5"),
            Ok(vec![
                (TokType::Number, "1"),
                (TokType::Number, "2.5"),
                (TokType::Number, "0x1f"),
                (TokType::Number, "1e10"),
                (TokType::Number, "1.5e-3"),
                (TokType::Number, "3j"),
                (TokType::Number, ".5"),
            ])
        );
    }

    #[test]
    fn test_bad_number() {
        assert_eq!(
            tokenize_all("1_"),
            Err(TokError::BadNumber { line: 1, col: 1 })
        );
        assert!(tokenize_all("1abc").is_err());
    }

    #[test]
    fn test_strings() {
        assert_eq!(
            tokenize_all(r#"'a' "b" f'{x}' r"\d+" '''tri\nple'''"#),
            Ok(vec![
                (TokType::String, "'a'"),
                (TokType::String, "\"b\""),
                (TokType::String, "f'{x}'"),
                (TokType::String, "r\"\\d+\""),
                (TokType::String, "'''tri\\nple'''"),
            ])
        );
    }

    #[test]
    fn test_empty_string() {
        assert_eq!(tokenize_all("''"), Ok(vec![(TokType::String, "''")]));
    }

    #[test]
    fn test_triple_string_with_newlines() {
        assert_eq!(
            tokenize_all("'''a\nb'''"),
            Ok(vec![(TokType::String, "'''a\nb'''")])
        );
    }

    #[test]
    fn test_unterminated_string() {
        assert_eq!(
            tokenize_all("'abc"),
            Err(TokError::UnterminatedString { line: 1, col: 1 })
        );
        assert!(tokenize_all("'''abc").is_err());
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            tokenize_all("a ** b //= c != d -> e"),
            Ok(vec![
                (TokType::Name, "a"),
                (TokType::Op, "**"),
                (TokType::Name, "b"),
                (TokType::Op, "//="),
                (TokType::Name, "c"),
                (TokType::Op, "!="),
                (TokType::Name, "d"),
                (TokType::Op, "->"),
                (TokType::Name, "e"),
            ])
        );
    }

    #[test]
    fn test_unmatched_bracket() {
        assert_eq!(
            tokenize_all("a)"),
            Err(TokError::UnmatchedBracket {
                ch: ')',
                line: 1,
                col: 2
            })
        );
        assert_eq!(
            tokenize_all("(a"),
            Err(TokError::UnexpectedEof { open: '(' })
        );
    }

    #[test]
    fn test_invalid_char() {
        assert_eq!(
            tokenize_all("a $ b"),
            Err(TokError::InvalidChar {
                ch: '$',
                line: 1,
                col: 3
            })
        );
    }

    #[test]
    fn test_inconsistent_dedent() {
        assert_eq!(
            tokenize_all("if x:\n        a\n    b"),
            Err(TokError::InconsistentIndent { line: 3 })
        );
    }

    #[test]
    fn test_spans_and_positions() {
        let toks = tokenize("x = 1\ny").unwrap();
        assert_eq!(toks[0].span, Span::new(0, 1));
        assert_eq!((toks[0].line, toks[0].col), (1, 1));
        assert_eq!(toks[2].span, Span::new(4, 5));
        assert_eq!((toks[2].line, toks[2].col), (1, 5));
        // 'y' starts line 2
        let y = toks.iter().find(|t| t.text == "y").unwrap();
        assert_eq!((y.line, y.col), (2, 1));
        assert_eq!(y.span, Span::new(6, 7));
    }

    #[test]
    fn test_no_newline_token_for_blank_final_line() {
        let toks = tokenize("x\n").unwrap();
        let kinds: Vec<TokType> = toks.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![TokType::Name, TokType::Newline, TokType::EndMarker]
        );
    }

    #[test]
    fn test_unicode_identifier() {
        assert_eq!(
            tokenize_all("café = 1"),
            Ok(vec![
                (TokType::Name, "café"),
                (TokType::Op, "="),
                (TokType::Number, "1"),
            ])
        );
    }
}
