// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Source edits.
//!
//! The pipeline never rewrites files itself: for each input file it
//! produces an ordered list of [`SourceEdit`]s — span/replacement pairs —
//! consumed by an external rendering layer. [`apply_edits`] replays a
//! list against the source text; tests use it to close the loop.

use serde::{Deserialize, Serialize};

use crate::source_analysis::Span;

/// One edit: replace the text at `span` with `replacement`.
///
/// An empty span is an insertion at that offset. Edit lists are sorted by
/// start offset and never overlap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceEdit {
    /// The byte range to replace.
    pub span: Span,
    /// The replacement text.
    pub replacement: String,
}

impl SourceEdit {
    /// Creates a replacement edit.
    #[must_use]
    pub fn replace(span: Span, replacement: impl Into<String>) -> Self {
        Self {
            span,
            replacement: replacement.into(),
        }
    }

    /// Creates an insertion edit at a byte offset.
    #[must_use]
    pub fn insert(at: u32, replacement: impl Into<String>) -> Self {
        Self {
            span: Span::new(at, at),
            replacement: replacement.into(),
        }
    }
}

/// Applies an ordered, non-overlapping edit list to source text.
#[must_use]
pub fn apply_edits(source: &str, edits: &[SourceEdit]) -> String {
    let mut out = String::with_capacity(source.len());
    let mut pos = 0usize;
    for edit in edits {
        let range = edit.span.as_range();
        if range.start < pos || range.end > source.len() {
            continue;
        }
        out.push_str(&source[pos..range.start]);
        out.push_str(&edit.replacement);
        pos = range.end;
    }
    out.push_str(&source[pos..]);
    out
}
