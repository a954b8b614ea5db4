// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Lexical analysis for Lua source code.
//!
//! This module converts source text into a stream of [`Token`]s. The lexer
//! is hand-written for maximum control over comment classification, which
//! the annotation pipeline depends on.
//!
//! # Design Principles
//!
//! - **Comments are tokens**: every comment line is preserved verbatim,
//!   including its leading dash count, and classified as plain, doc
//!   (`---`), annotation (`---@`), alias entry (`---|`), or block
//!   (`--[[ ... ]]`).
//! - **Precise locations**: every token carries its span plus 1-based
//!   line/column.
//! - **Unterminated literals are fatal**: an unterminated string or block
//!   comment aborts tokenization of the file with a [`LexError`]; the rest
//!   of a project batch is unaffected.
//!
//! # Example
//!
//! ```
//! use luacats_core::source_analysis::{tokenize, TokenKind};
//!
//! let tokens = tokenize("local x = 1 -- note").unwrap();
//! assert!(matches!(tokens[0].kind(), TokenKind::Keyword(k) if k == "local"));
//! assert!(matches!(tokens.last().unwrap().kind(), TokenKind::Eof));
//! ```

use std::iter::Peekable;
use std::str::CharIndices;

use ecow::EcoString;

use super::{LexError, Span, Token, TokenKind};

/// Lua reserved words.
const KEYWORDS: &[&str] = &[
    "and", "break", "do", "else", "elseif", "end", "false", "for", "function", "goto", "if", "in",
    "local", "nil", "not", "or", "repeat", "return", "then", "true", "until", "while",
];

/// Tokenizes Lua source text.
///
/// Returns the full token stream, terminated by a single [`TokenKind::Eof`]
/// token. Fails with [`LexError`] when a string literal, long string, or
/// block comment is unterminated.
///
/// # Errors
///
/// Returns [`LexError`] for unterminated string/long-string/block-comment
/// literals. All other input lexes successfully; unknown characters become
/// punctuation tokens for the parser to diagnose.
pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
    let mut lexer = Lexer::new(source);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token()?;
        let at_end = token.kind().is_eof();
        tokens.push(token);
        if at_end {
            break;
        }
    }
    Ok(tokens)
}

/// A lexer that tokenizes Lua source code.
struct Lexer<'src> {
    /// The source text being lexed.
    source: &'src str,
    /// Character iterator with byte positions.
    chars: Peekable<CharIndices<'src>>,
    /// Current byte position in source.
    position: usize,
    /// Current 1-based line.
    line: u32,
    /// Current 1-based column.
    column: u32,
}

impl<'src> Lexer<'src> {
    fn new(source: &'src str) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
            position: 0,
            line: 1,
            column: 1,
        }
    }

    /// Peeks at the next character without consuming it.
    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, c)| c)
    }

    /// Peeks `n+1` characters ahead without consuming (n=0 is the same as
    /// `peek_char`).
    fn peek_char_n(&self, n: usize) -> Option<char> {
        let mut iter = self.chars.clone();
        for _ in 0..n {
            iter.next();
        }
        iter.next().map(|(_, c)| c)
    }

    /// Consumes the next character and returns it.
    fn advance(&mut self) -> Option<char> {
        let (pos, c) = self.chars.next()?;
        self.position = pos + c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    /// Consumes characters while the predicate is true.
    fn advance_while(&mut self, predicate: impl Fn(char) -> bool) {
        while self.peek_char().is_some_and(&predicate) {
            self.advance();
        }
    }

    /// Returns the current byte position.
    #[allow(
        clippy::cast_possible_truncation,
        reason = "source files over 4GB are not supported"
    )]
    fn current_position(&self) -> u32 {
        self.position as u32
    }

    /// Creates a span from start to current position.
    fn span_from(&self, start: u32) -> Span {
        Span::new(start, self.current_position())
    }

    /// Returns the source text covered by a span.
    fn text_for(&self, span: Span) -> &'src str {
        &self.source[span.as_range()]
    }

    /// Lexes the next token, skipping leading whitespace.
    fn next_token(&mut self) -> Result<Token, LexError> {
        self.advance_while(char::is_whitespace);

        let start = self.current_position();
        let line = self.line;
        let column = self.column;

        let Some(c) = self.peek_char() else {
            return Ok(Token::new(TokenKind::Eof, self.span_from(start), line, column));
        };

        let kind = match c {
            '-' if self.peek_char_n(1) == Some('-') => self.lex_comment(start)?,
            '"' | '\'' => self.lex_short_string(start, c)?,
            '[' if self.long_bracket_level().is_some() => self.lex_long_string(start)?,
            '0'..='9' => self.lex_number(),
            '.' if self.peek_char_n(1).is_some_and(|c| c.is_ascii_digit()) => self.lex_number(),
            c if c.is_alphabetic() || c == '_' => self.lex_word(),
            _ => self.lex_symbol(),
        };

        Ok(Token::new(kind, self.span_from(start), line, column))
    }

    /// Lexes a comment starting at `--`.
    ///
    /// Classification follows the leading dash count of the raw text:
    /// exactly three dashes and then `@` is an annotation, then `|` an
    /// alias entry, anything else a doc comment; two or four-plus dashes
    /// are plain comments. `--[[`/`--[=*[` opens a block comment scanned
    /// to the level-matched closing fence.
    fn lex_comment(&mut self, start: u32) -> Result<TokenKind, LexError> {
        self.advance(); // -
        self.advance(); // -

        if let Some(level) = self.long_bracket_level() {
            return self.lex_block_comment(start, level);
        }

        self.advance_while(|c| c != '\n');
        let raw = self.text_for(self.span_from(start));
        let dashes = raw.bytes().take_while(|&b| b == b'-').count();
        let after = raw.as_bytes().get(dashes).copied();

        let kind = if dashes == 3 {
            match after {
                Some(b'@') => TokenKind::CommentAnnotation(EcoString::from(raw)),
                Some(b'|') => TokenKind::CommentAliasEntry(EcoString::from(raw)),
                _ => TokenKind::CommentDoc(EcoString::from(raw)),
            }
        } else {
            TokenKind::CommentPlain(EcoString::from(raw))
        };
        Ok(kind)
    }

    /// Lexes a block comment body after `--`, given the opening fence level.
    fn lex_block_comment(&mut self, start: u32, level: usize) -> Result<TokenKind, LexError> {
        self.consume_long_bracket_open(level);
        if !self.consume_until_long_bracket_close(level) {
            return Err(LexError::unterminated_comment(self.span_from(start)));
        }
        let raw = self.text_for(self.span_from(start));
        Ok(TokenKind::CommentBlock(EcoString::from(raw)))
    }

    /// Returns the fence level if the upcoming characters open a long
    /// bracket (`[`, `[=`, `[==`... followed by `[`), without consuming.
    fn long_bracket_level(&self) -> Option<usize> {
        if self.peek_char_n(0) != Some('[') {
            return None;
        }
        let mut level = 0;
        while self.peek_char_n(1 + level) == Some('=') {
            level += 1;
        }
        (self.peek_char_n(1 + level) == Some('[')).then_some(level)
    }

    /// Consumes a long bracket opener of the given level: `[`, `=`*level, `[`.
    fn consume_long_bracket_open(&mut self, level: usize) {
        for _ in 0..level + 2 {
            self.advance();
        }
    }

    /// Consumes up to and including a closing fence `]`, `=`*level, `]`.
    /// Returns false if the input ends first.
    fn consume_until_long_bracket_close(&mut self, level: usize) -> bool {
        loop {
            match self.peek_char() {
                None => return false,
                Some(']') => {
                    let mut eq = 0;
                    while self.peek_char_n(1 + eq) == Some('=') {
                        eq += 1;
                    }
                    if eq == level && self.peek_char_n(1 + eq) == Some(']') {
                        for _ in 0..level + 2 {
                            self.advance();
                        }
                        return true;
                    }
                    self.advance();
                }
                Some(_) => {
                    self.advance();
                }
            }
        }
    }

    /// Lexes a short string literal with either quote kind.
    ///
    /// A raw newline or end of file inside the literal is an error; the
    /// raw text (quotes included) is preserved in the token.
    fn lex_short_string(&mut self, start: u32, quote: char) -> Result<TokenKind, LexError> {
        self.advance(); // opening quote
        loop {
            match self.peek_char() {
                None | Some('\n') => {
                    return Err(LexError::unterminated_string(self.span_from(start)));
                }
                Some('\\') => {
                    self.advance();
                    if self.advance().is_none() {
                        return Err(LexError::unterminated_string(self.span_from(start)));
                    }
                }
                Some(c) if c == quote => {
                    self.advance();
                    break;
                }
                Some(_) => {
                    self.advance();
                }
            }
        }
        let raw = self.text_for(self.span_from(start));
        Ok(TokenKind::StringLiteral(EcoString::from(raw)))
    }

    /// Lexes a long string: `[[ ... ]]` with an optional `=` fence.
    fn lex_long_string(&mut self, start: u32) -> Result<TokenKind, LexError> {
        let level = self
            .long_bracket_level()
            .unwrap_or_default();
        self.consume_long_bracket_open(level);
        if !self.consume_until_long_bracket_close(level) {
            return Err(LexError::unterminated_long_string(self.span_from(start)));
        }
        let raw = self.text_for(self.span_from(start));
        Ok(TokenKind::StringLiteral(EcoString::from(raw)))
    }

    /// Lexes a number literal: decimal, hex, float, or exponent forms.
    fn lex_number(&mut self) -> TokenKind {
        let start = self.current_position();
        if self.peek_char() == Some('0')
            && matches!(self.peek_char_n(1), Some('x' | 'X'))
        {
            self.advance();
            self.advance();
            self.advance_while(|c| c.is_ascii_hexdigit() || c == '.');
            if matches!(self.peek_char(), Some('p' | 'P')) {
                self.advance();
                if matches!(self.peek_char(), Some('+' | '-')) {
                    self.advance();
                }
                self.advance_while(|c| c.is_ascii_digit());
            }
        } else {
            self.advance_while(|c| c.is_ascii_digit());
            // A single `.` continues the number; `..` is the concat operator.
            if self.peek_char() == Some('.') && self.peek_char_n(1) != Some('.') {
                self.advance();
                self.advance_while(|c| c.is_ascii_digit());
            }
            if matches!(self.peek_char(), Some('e' | 'E')) {
                self.advance();
                if matches!(self.peek_char(), Some('+' | '-')) {
                    self.advance();
                }
                self.advance_while(|c| c.is_ascii_digit());
            }
        }
        let raw = self.text_for(self.span_from(start));
        TokenKind::NumberLiteral(EcoString::from(raw))
    }

    /// Lexes an identifier or keyword.
    fn lex_word(&mut self) -> TokenKind {
        let start = self.current_position();
        self.advance_while(|c| c.is_alphanumeric() || c == '_');
        let word = self.text_for(self.span_from(start));
        if KEYWORDS.contains(&word) {
            TokenKind::Keyword(EcoString::from(word))
        } else {
            TokenKind::Identifier(EcoString::from(word))
        }
    }

    /// Lexes an operator or punctuation symbol, longest match first.
    fn lex_symbol(&mut self) -> TokenKind {
        let start = self.current_position();
        let c = self.advance().unwrap_or('\0');
        let two = self.peek_char();

        let text = match (c, two) {
            ('=', Some('=')) | ('~', Some('=')) | ('<', Some('=' | '<')) | ('>', Some('=' | '>'))
            | ('/', Some('/')) => {
                self.advance();
                self.text_for(self.span_from(start))
            }
            ('.', Some('.')) => {
                self.advance();
                if self.peek_char() == Some('.') {
                    self.advance();
                }
                self.text_for(self.span_from(start))
            }
            (':', Some(':')) => {
                self.advance();
                self.text_for(self.span_from(start))
            }
            _ => self.text_for(self.span_from(start)),
        };

        match text {
            "+" | "-" | "*" | "/" | "//" | "%" | "^" | "#" | "&" | "~" | "|" | "<<" | ">>"
            | "==" | "~=" | "<=" | ">=" | "<" | ">" | "=" | ".." | "..." => {
                TokenKind::Operator(EcoString::from(text))
            }
            // `(`, `)`, `{`, `}`, `[`, `]`, `;`, `:`, `::`, `,`, `.` and
            // anything unknown: let the parser diagnose stray characters.
            _ => TokenKind::Punctuation(EcoString::from(text)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source)
            .expect("tokenize")
            .into_iter()
            .map(Token::into_kind)
            .collect()
    }

    #[test]
    fn lex_local_assignment() {
        let kinds = kinds("local x = 42");
        assert_eq!(
            kinds,
            vec![
                TokenKind::Keyword("local".into()),
                TokenKind::Identifier("x".into()),
                TokenKind::Operator("=".into()),
                TokenKind::NumberLiteral("42".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn comment_classification_by_dash_count() {
        assert_eq!(kinds("-- plain")[0], TokenKind::CommentPlain("-- plain".into()));
        assert_eq!(kinds("--- doc")[0], TokenKind::CommentDoc("--- doc".into()));
        assert_eq!(kinds("---- ruler")[0], TokenKind::CommentPlain("---- ruler".into()));
        assert_eq!(
            kinds("---@param x number")[0],
            TokenKind::CommentAnnotation("---@param x number".into())
        );
        assert_eq!(
            kinds("---| 'left' # description")[0],
            TokenKind::CommentAliasEntry("---| 'left' # description".into())
        );
    }

    #[test]
    fn doc_comment_with_space_before_at_is_doc() {
        // Only `@` immediately after the three dashes is an annotation.
        assert_eq!(
            kinds("--- @param x")[0],
            TokenKind::CommentDoc("--- @param x".into())
        );
    }

    #[test]
    fn annotation_raw_text_preserved_with_leading_dash_content() {
        // No synthetic space: the byte after the marker is `-`.
        assert_eq!(
            kinds("---@param x -number")[0],
            TokenKind::CommentAnnotation("---@param x -number".into())
        );
    }

    #[test]
    fn block_comment_level_matched_fence() {
        let kinds = kinds("--[==[ inner ]] still inner ]==] x");
        assert_eq!(
            kinds[0],
            TokenKind::CommentBlock("--[==[ inner ]] still inner ]==]".into())
        );
        assert_eq!(kinds[1], TokenKind::Identifier("x".into()));
    }

    #[test]
    fn block_comment_spans_lines() {
        let kinds = kinds("--[[ a\nb ]] y");
        assert_eq!(kinds[0], TokenKind::CommentBlock("--[[ a\nb ]]".into()));
    }

    #[test]
    fn unterminated_block_comment_fails() {
        let err = tokenize("--[[ never closed").unwrap_err();
        assert_eq!(err.to_string(), "unterminated block comment");
    }

    #[test]
    fn unterminated_string_fails() {
        let err = tokenize("local s = \"oops\nlocal t = 1").unwrap_err();
        assert_eq!(err.to_string(), "unterminated string literal");

        let err = tokenize("local s = [[oops").unwrap_err();
        assert_eq!(err.to_string(), "unterminated long string");
    }

    #[test]
    fn strings_keep_raw_text() {
        assert_eq!(
            kinds("x = 'a\\'b'")[2],
            TokenKind::StringLiteral("'a\\'b'".into())
        );
        assert_eq!(
            kinds("x = [=[raw ]] text]=]")[2],
            TokenKind::StringLiteral("[=[raw ]] text]=]".into())
        );
    }

    #[test]
    fn numbers() {
        assert_eq!(kinds("0xFF")[0], TokenKind::NumberLiteral("0xFF".into()));
        assert_eq!(kinds("3.14")[0], TokenKind::NumberLiteral("3.14".into()));
        assert_eq!(kinds("1e10")[0], TokenKind::NumberLiteral("1e10".into()));
        assert_eq!(kinds(".5")[0], TokenKind::NumberLiteral(".5".into()));
    }

    #[test]
    fn number_then_concat() {
        let kinds = kinds("1 .. 2");
        assert_eq!(kinds[0], TokenKind::NumberLiteral("1".into()));
        assert_eq!(kinds[1], TokenKind::Operator("..".into()));
        assert_eq!(kinds[2], TokenKind::NumberLiteral("2".into()));
    }

    #[test]
    fn multi_char_operators() {
        let kinds = kinds("a == b ~= c <= d >= e .. f ... << >>");
        let ops: Vec<_> = kinds
            .iter()
            .filter_map(|k| match k {
                TokenKind::Operator(op) => Some(op.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(ops, vec!["==", "~=", "<=", ">=", "..", "...", "<<", ">>"]);
    }

    #[test]
    fn method_colon_and_label() {
        let kinds = kinds("function M:f() end ::continue::");
        assert!(kinds.contains(&TokenKind::Punctuation(":".into())));
        assert!(kinds.contains(&TokenKind::Punctuation("::".into())));
    }

    #[test]
    fn line_and_column_tracking() {
        let tokens = tokenize("local x\n  = 1").expect("tokenize");
        assert_eq!(tokens[0].line(), 1);
        assert_eq!(tokens[0].column(), 1);
        assert_eq!(tokens[2].line(), 2);
        assert_eq!(tokens[2].column(), 3);
    }

    #[test]
    fn token_spans_cover_comment_bytes_exactly() {
        let source = "  ---@field x number\nlocal y";
        let tokens = tokenize(source).expect("tokenize");
        let comment = &tokens[0];
        assert_eq!(
            &source[comment.span().as_range()],
            "---@field x number"
        );
    }
}
