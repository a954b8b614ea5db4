// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Token types for Lua lexical analysis.
//!
//! Comments are first-class tokens rather than trivia: the annotation
//! pipeline needs the exact text of every comment line, including its
//! leading dash count, to classify doc comments (`---`), annotation
//! comments (`---@...`), and alias entry lines (`---| ...`).
//!
//! # Token Structure
//!
//! Each token consists of:
//! - A [`TokenKind`] indicating the type of token
//! - A [`Span`] with its byte offsets in source
//! - The 1-based line and column where it starts
//!
//! Tokens are cheap to clone (string data lives in [`EcoString`]).

use ecow::EcoString;

use super::Span;

/// The kind of token, not including source location.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// An identifier: `foo`, `my_var`, `M`
    Identifier(EcoString),

    /// A reserved word: `local`, `function`, `return`, `end`, ...
    Keyword(EcoString),

    /// An operator: `+`, `==`, `..`, `...`, `#`, ...
    Operator(EcoString),

    /// A delimiter or separator: `(`, `)`, `{`, `}`, `[`, `]`, `;`, `,`, `.`, `:`
    Punctuation(EcoString),

    /// A string literal, raw text including quotes or long brackets.
    StringLiteral(EcoString),

    /// A number literal, raw text: `42`, `3.14`, `0xFF`, `1e10`
    NumberLiteral(EcoString),

    /// A plain comment: `-- text` (also `----` and longer dash runs).
    CommentPlain(EcoString),

    /// A doc comment: exactly three dashes and no `@`: `--- text`
    CommentDoc(EcoString),

    /// An annotation comment: three dashes immediately followed by `@`:
    /// `---@param x number`
    CommentAnnotation(EcoString),

    /// An alias entry comment: three dashes followed by `|`:
    /// `---| 'value' # description`
    CommentAliasEntry(EcoString),

    /// A block comment: `--[[ ... ]]`, optionally with a level-matched
    /// `=` fence: `--[==[ ... ]==]`
    CommentBlock(EcoString),

    /// End of file
    Eof,
}

impl TokenKind {
    /// Returns `true` if this token is any kind of comment.
    #[must_use]
    pub const fn is_comment(&self) -> bool {
        matches!(
            self,
            Self::CommentPlain(_)
                | Self::CommentDoc(_)
                | Self::CommentAnnotation(_)
                | Self::CommentAliasEntry(_)
                | Self::CommentBlock(_)
        )
    }

    /// Returns `true` if this comment kind participates in a doc block
    /// attached to a declaration (plain comments do not).
    #[must_use]
    pub const fn is_doc_block_comment(&self) -> bool {
        matches!(
            self,
            Self::CommentDoc(_)
                | Self::CommentAnnotation(_)
                | Self::CommentAliasEntry(_)
                | Self::CommentBlock(_)
        )
    }

    /// Returns `true` if this is the given keyword.
    #[must_use]
    pub fn is_keyword(&self, word: &str) -> bool {
        matches!(self, Self::Keyword(k) if k == word)
    }

    /// Returns `true` if this is the given operator.
    #[must_use]
    pub fn is_operator(&self, op: &str) -> bool {
        matches!(self, Self::Operator(o) if o == op)
    }

    /// Returns `true` if this is the given punctuation.
    #[must_use]
    pub fn is_punctuation(&self, p: &str) -> bool {
        matches!(self, Self::Punctuation(s) if s == p)
    }

    /// Returns `true` if this is the end-of-file marker.
    #[must_use]
    pub const fn is_eof(&self) -> bool {
        matches!(self, Self::Eof)
    }

    /// Returns the string content carried by this token, if any.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Identifier(s)
            | Self::Keyword(s)
            | Self::Operator(s)
            | Self::Punctuation(s)
            | Self::StringLiteral(s)
            | Self::NumberLiteral(s)
            | Self::CommentPlain(s)
            | Self::CommentDoc(s)
            | Self::CommentAnnotation(s)
            | Self::CommentAliasEntry(s)
            | Self::CommentBlock(s) => Some(s),
            Self::Eof => None,
        }
    }
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.as_str() {
            Some(s) => write!(f, "{s}"),
            None => write!(f, "<eof>"),
        }
    }
}

/// A token with its source location.
///
/// The line and column are 1-based and refer to the first byte of the
/// token. Doc-block attachment relies on line numbers to decide whether a
/// comment run is contiguous with the declaration below it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    kind: TokenKind,
    span: Span,
    line: u32,
    column: u32,
}

impl Token {
    /// Creates a new token.
    #[must_use]
    pub fn new(kind: TokenKind, span: Span, line: u32, column: u32) -> Self {
        Self {
            kind,
            span,
            line,
            column,
        }
    }

    /// Returns the kind of this token.
    #[must_use]
    pub fn kind(&self) -> &TokenKind {
        &self.kind
    }

    /// Consumes the token and returns its kind.
    #[must_use]
    pub fn into_kind(self) -> TokenKind {
        self.kind
    }

    /// Returns the source span of this token.
    #[must_use]
    pub fn span(&self) -> Span {
        self.span
    }

    /// Returns the 1-based line where this token starts.
    #[must_use]
    pub fn line(&self) -> u32 {
        self.line
    }

    /// Returns the 1-based column where this token starts.
    #[must_use]
    pub fn column(&self) -> u32 {
        self.column
    }

    /// Returns the 1-based line where this token ends.
    ///
    /// Differs from [`Token::line`] only for block comments and long
    /// strings, which may span multiple lines.
    #[must_use]
    pub fn end_line(&self) -> u32 {
        let newlines = self
            .kind
            .as_str()
            .map_or(0, |s| s.bytes().filter(|&b| b == b'\n').count());
        self.line + u32::try_from(newlines).unwrap_or(0)
    }
}
