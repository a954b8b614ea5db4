// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Error types for the analysis pipeline.
//!
//! Errors carry source locations ([`Span`]) for precise diagnostics.
//! They integrate with [`miette`] for rich error reporting.
//!
//! A [`LexError`] is fatal for the file that produced it; other files in a
//! project batch are unaffected. Parse problems are never fatal — they are
//! reported through [`Diagnostic`](super::parser::Diagnostic) instead.

// Spurious warnings from miette derive macro expansion
#![allow(unused_assignments)]

use miette::Diagnostic;
use thiserror::Error;

use super::Span;

/// A lexical error encountered during tokenization.
///
/// Unlike parse diagnostics, lexical errors abort tokenization of the
/// file: an unterminated string or block comment makes everything after
/// it meaningless.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
#[error("{kind}")]
#[diagnostic()]
pub struct LexError {
    /// The kind of lexical error.
    #[source]
    pub kind: LexErrorKind,
    /// The source location of the error.
    #[label("here")]
    pub span: Span,
}

impl LexError {
    /// Creates a new lexical error.
    #[must_use]
    pub fn new(kind: LexErrorKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// Creates an "unterminated string" error.
    #[must_use]
    pub fn unterminated_string(span: Span) -> Self {
        Self::new(LexErrorKind::UnterminatedString, span)
    }

    /// Creates an "unterminated long string" error.
    #[must_use]
    pub fn unterminated_long_string(span: Span) -> Self {
        Self::new(LexErrorKind::UnterminatedLongString, span)
    }

    /// Creates an "unterminated block comment" error.
    #[must_use]
    pub fn unterminated_comment(span: Span) -> Self {
        Self::new(LexErrorKind::UnterminatedComment, span)
    }
}

/// The kind of lexical error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexErrorKind {
    /// A short string literal ran into a newline or end of file.
    #[error("unterminated string literal")]
    UnterminatedString,

    /// A long string (`[[...]]`) was missing its closing fence.
    #[error("unterminated long string")]
    UnterminatedLongString,

    /// A block comment (`--[[...]]`) was missing its closing fence.
    #[error("unterminated block comment")]
    UnterminatedComment,
}
