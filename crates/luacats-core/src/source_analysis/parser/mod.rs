// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Recursive descent parser for Lua source code.
//!
//! The parser builds a [`Chunk`] from a token stream. It is written for
//! annotation tooling, so its priorities differ from a compiler's:
//!
//! - **Never fail hard** — an unparseable statement becomes a
//!   [`Stmt::Opaque`] node carrying its raw text plus a diagnostic, and
//!   parsing continues at the next statement boundary
//! - **Doc blocks attach to declarations** — the maximal contiguous run
//!   of doc/annotation/alias-entry/block comment tokens immediately above
//!   a declaration is captured, split into description lines and parsed
//!   annotations, with alias entries grouped under their header
//! - **Control flow is structural only** — `if`/`while`/`for` bodies are
//!   parsed just far enough to reach every nested `return`
//!
//! # Binary Operator Precedence (Pratt Parsing)
//!
//! Binary operator precedence uses a binding power table
//! ([`binary_binding_power`]), making precedence declarative:
//!
//! | Level | Operators | Associativity |
//! |-------|-----------|---------------|
//! | 1  | `or`                  | Left  |
//! | 2  | `and`                 | Left  |
//! | 3  | `<` `>` `<=` `>=` `~=` `==` | Left |
//! | 4  | `|`                   | Left  |
//! | 5  | `~`                   | Left  |
//! | 6  | `&`                   | Left  |
//! | 7  | `<<` `>>`             | Left  |
//! | 9  | `..`                  | Right |
//! | 10 | `+` `-`               | Left  |
//! | 11 | `*` `/` `//` `%`      | Left  |
//! | 14 | `^`                   | Right |
//!
//! # Usage
//!
//! ```
//! use luacats_core::source_analysis::{parse, tokenize};
//!
//! let tokens = tokenize("local x = 1 + 2").unwrap();
//! let (chunk, diagnostics) = parse(tokens, "local x = 1 + 2");
//! assert!(diagnostics.is_empty());
//! assert_eq!(chunk.stmts.len(), 1);
//! ```

use ecow::EcoString;

use crate::annotations::{parse_alias_entry, parse_annotation, AnnotationKind};
use crate::ast::{Chunk, DocBlock, DocLine, DocLineKind};

use super::{Span, Token, TokenKind};

mod expressions;
mod statements;

#[cfg(test)]
mod parser_tests;

/// Binding power for binary operators (Pratt parsing).
///
/// Higher values bind tighter. Left and right binding powers differ for
/// associativity: left-associative operators have `right == left + 1`,
/// right-associative ones `left == right + 1`.
#[derive(Debug, Clone, Copy)]
pub(super) struct BindingPower {
    /// How tightly this operator binds to its left operand.
    pub(super) left: u8,
    /// How tightly this operator binds to its right operand.
    pub(super) right: u8,
}

impl BindingPower {
    /// Creates a left-associative binding power.
    const fn left_assoc(precedence: u8) -> Self {
        Self {
            left: precedence,
            right: precedence + 1,
        }
    }

    /// Creates a right-associative binding power.
    const fn right_assoc(precedence: u8) -> Self {
        Self {
            left: precedence + 1,
            right: precedence,
        }
    }
}

/// Gets the binding power for a binary operator token text.
///
/// Returns `None` for non-operators, which ends binary expression
/// parsing — useful for error recovery.
pub(super) fn binary_binding_power(op: &str) -> Option<BindingPower> {
    match op {
        "or" => Some(BindingPower::left_assoc(1)),
        "and" => Some(BindingPower::left_assoc(2)),
        "<" | ">" | "<=" | ">=" | "~=" | "==" => Some(BindingPower::left_assoc(3)),
        "|" => Some(BindingPower::left_assoc(4)),
        "~" => Some(BindingPower::left_assoc(5)),
        "&" => Some(BindingPower::left_assoc(6)),
        "<<" | ">>" => Some(BindingPower::left_assoc(7)),
        // Concat is right-associative in Lua.
        ".." => Some(BindingPower::right_assoc(9)),
        "+" | "-" => Some(BindingPower::left_assoc(10)),
        "*" | "/" | "//" | "%" => Some(BindingPower::left_assoc(11)),
        "^" => Some(BindingPower::right_assoc(14)),
        _ => None,
    }
}

/// Parse a token stream into a chunk.
///
/// This is the main entry point for parsing. It always returns a
/// [`Chunk`], even for badly broken input — check the returned
/// diagnostics for what went wrong. `source` must be the text the tokens
/// were lexed from; it supplies the raw text of opaque statements.
#[must_use]
pub fn parse(tokens: Vec<Token>, source: &str) -> (Chunk, Vec<Diagnostic>) {
    let mut parser = Parser::new(tokens, source);
    let chunk = parser.parse_chunk();
    (chunk, parser.diagnostics)
}

/// A diagnostic message (error or warning).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// The severity of the diagnostic.
    pub severity: Severity,
    /// The message.
    pub message: EcoString,
    /// The source location.
    pub span: Span,
    /// Optional hint for how to fix the issue.
    pub hint: Option<EcoString>,
}

impl Diagnostic {
    /// Creates a new error diagnostic.
    #[must_use]
    pub fn error(message: impl Into<EcoString>, span: Span) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
            span,
            hint: None,
        }
    }

    /// Creates a new warning diagnostic.
    #[must_use]
    pub fn warning(message: impl Into<EcoString>, span: Span) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
            span,
            hint: None,
        }
    }

    /// Attaches a hint.
    #[must_use]
    pub fn with_hint(mut self, hint: impl Into<EcoString>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Diagnostic severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    /// A problem that made part of the file opaque to analysis.
    Error,
    /// A problem that was worked around.
    Warning,
}

/// Maximum expression nesting depth before the parser bails out.
///
/// Prevents stack overflow on pathological input (e.g. `((((((...))))))`).
/// Generous enough for any realistic Lua file.
const MAX_NESTING_DEPTH: usize = 128;

/// The parser state.
pub(super) struct Parser<'src> {
    /// The source text the tokens were lexed from.
    pub(super) source: &'src str,
    /// The tokens being parsed, comments included.
    pub(super) tokens: Vec<Token>,
    /// Current token index.
    pub(super) current: usize,
    /// Accumulated diagnostics.
    pub(super) diagnostics: Vec<Diagnostic>,
    /// Current expression nesting depth (guards against stack overflow).
    pub(super) nesting_depth: usize,
}

impl<'src> Parser<'src> {
    pub(super) fn new(tokens: Vec<Token>, source: &'src str) -> Self {
        Self {
            source,
            tokens,
            current: 0,
            diagnostics: Vec::new(),
            nesting_depth: 0,
        }
    }

    // ------------------------------------------------------------------
    // Token access
    //
    // `peek`/`advance` skip comment tokens: comments are only meaningful
    // at statement boundaries, where `collect_comment_run` gathers them
    // explicitly before the statement is parsed.
    // ------------------------------------------------------------------

    /// Index of the next non-comment token at or after `current`.
    fn peek_index(&self) -> usize {
        let mut index = self.current;
        while self
            .tokens
            .get(index)
            .is_some_and(|t| t.kind().is_comment())
        {
            index += 1;
        }
        index.min(self.tokens.len().saturating_sub(1))
    }

    /// Returns the next non-comment token without consuming it.
    pub(super) fn peek(&self) -> &Token {
        &self.tokens[self.peek_index()]
    }

    /// Returns the non-comment token after the next one.
    pub(super) fn peek_second(&self) -> &Token {
        let mut index = self.peek_index() + 1;
        while self
            .tokens
            .get(index)
            .is_some_and(|t| t.kind().is_comment())
        {
            index += 1;
        }
        let last = self.tokens.len().saturating_sub(1);
        &self.tokens[index.min(last)]
    }

    /// Consumes and returns the next non-comment token.
    pub(super) fn advance(&mut self) -> Token {
        let index = self.peek_index();
        let token = self.tokens[index].clone();
        self.current = (index + 1).min(self.tokens.len());
        token
    }

    /// Returns `true` if the next token is the end of file.
    pub(super) fn at_eof(&self) -> bool {
        self.peek().kind().is_eof()
    }

    /// Consumes the next token if it is the given keyword.
    pub(super) fn eat_keyword(&mut self, word: &str) -> bool {
        if self.peek().kind().is_keyword(word) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Consumes the next token if it is the given punctuation.
    pub(super) fn eat_punctuation(&mut self, p: &str) -> bool {
        if self.peek().kind().is_punctuation(p) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Consumes the next token if it is the given operator.
    pub(super) fn eat_operator(&mut self, op: &str) -> bool {
        if self.peek().kind().is_operator(op) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Consumes the expected keyword or records a diagnostic.
    pub(super) fn expect_keyword(&mut self, word: &str) -> bool {
        if self.eat_keyword(word) {
            return true;
        }
        let span = self.peek().span();
        self.diagnostics
            .push(Diagnostic::error(format!("expected `{word}`"), span));
        false
    }

    /// Consumes the expected punctuation or records a diagnostic.
    pub(super) fn expect_punctuation(&mut self, p: &str) -> bool {
        if self.eat_punctuation(p) {
            return true;
        }
        let span = self.peek().span();
        self.diagnostics
            .push(Diagnostic::error(format!("expected `{p}`"), span));
        false
    }

    /// Returns the source text covered by a span.
    pub(super) fn text_for(&self, span: Span) -> &'src str {
        &self.source[span.as_range()]
    }

    // ------------------------------------------------------------------
    // Doc blocks
    // ------------------------------------------------------------------

    /// Consumes the comment tokens before the next significant token and
    /// returns them in order.
    pub(super) fn collect_comment_run(&mut self) -> Vec<Token> {
        let mut run = Vec::new();
        while self
            .tokens
            .get(self.current)
            .is_some_and(|t| t.kind().is_comment())
        {
            run.push(self.tokens[self.current].clone());
            self.current += 1;
        }
        run
    }

    /// Builds the doc block to attach to a statement starting at
    /// `stmt_line`, from the comment run collected above it.
    ///
    /// The attachable block is the maximal contiguous suffix of the run
    /// consisting only of doc-block comment kinds (plain comments and
    /// line gaps terminate it), whose last line sits immediately above
    /// the statement. A comment on `prev_line` trails the previous
    /// statement and never joins the block.
    pub(super) fn build_doc_block(
        &mut self,
        run: &[Token],
        stmt_line: u32,
        prev_line: Option<u32>,
    ) -> Option<DocBlock> {
        // Find the attachable suffix, scanning upward from the statement.
        let mut start = run.len();
        let mut expected_line = stmt_line;
        for (index, token) in run.iter().enumerate().rev() {
            if !token.kind().is_doc_block_comment()
                || token.end_line() + 1 != expected_line
                || Some(token.line()) == prev_line
            {
                break;
            }
            start = index;
            expected_line = token.line();
        }
        let suffix = &run[start..];
        if suffix.is_empty() {
            return None;
        }

        let mut lines: Vec<DocLine> = Vec::new();
        // Index into `lines` of the alias header currently absorbing
        // `---|` entries, if the previous line was one or an entry.
        let mut open_alias: Option<usize> = None;

        for token in suffix {
            let span = token.span();
            let raw = token.kind().as_str().unwrap_or_default();
            match token.kind() {
                TokenKind::CommentDoc(_) => {
                    open_alias = None;
                    lines.push(DocLine {
                        raw: EcoString::from(raw),
                        span,
                        kind: DocLineKind::Description,
                    });
                }
                TokenKind::CommentAnnotation(_) => {
                    let (annotation, diagnostic) = parse_annotation(raw, span);
                    open_alias = matches!(annotation.kind, AnnotationKind::Alias(_))
                        .then_some(lines.len());
                    if let Some(diagnostic) = diagnostic {
                        self.diagnostics.push(diagnostic);
                    }
                    lines.push(DocLine {
                        raw: EcoString::from(raw),
                        span,
                        kind: DocLineKind::Annotation(annotation),
                    });
                }
                TokenKind::CommentAliasEntry(_) => match open_alias {
                    Some(header) => {
                        let entry = parse_alias_entry(raw, span);
                        if let DocLineKind::Annotation(annotation) = &mut lines[header].kind {
                            if let AnnotationKind::Alias(alias) = &mut annotation.kind {
                                alias.entries.push(entry);
                            }
                        }
                        lines.push(DocLine {
                            raw: EcoString::from(raw),
                            span,
                            kind: DocLineKind::AliasEntry,
                        });
                    }
                    None => {
                        self.diagnostics.push(Diagnostic::warning(
                            "alias entry line without a preceding @alias header",
                            span,
                        ));
                        let (annotation, _) = parse_annotation(raw, span);
                        lines.push(DocLine {
                            raw: EcoString::from(raw),
                            span,
                            kind: DocLineKind::Annotation(annotation),
                        });
                    }
                },
                TokenKind::CommentBlock(_) => {
                    open_alias = None;
                    lines.push(DocLine {
                        raw: EcoString::from(raw),
                        span,
                        kind: DocLineKind::Aux,
                    });
                }
                _ => {}
            }
        }

        let span = suffix
            .first()
            .map(Token::span)
            .unwrap_or_default()
            .merge(suffix.last().map(Token::span).unwrap_or_default());
        Some(DocBlock { lines, span })
    }

    // ------------------------------------------------------------------
    // Chunk
    // ------------------------------------------------------------------

    pub(super) fn parse_chunk(&mut self) -> Chunk {
        let stmts = self.parse_block(&[]);
        let span = Span::from(0..self.source.len());
        Chunk { stmts, span }
    }
}
