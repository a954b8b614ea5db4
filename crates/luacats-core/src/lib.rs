// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Lua source analysis and LuaCATS annotation tooling.
//!
//! This crate analyzes Lua source files and produces or merges LSP-style
//! (LuaCATS) type annotations — classes, fields, params, returns,
//! aliases — without altering code logic or formatting:
//!
//! - [`source_analysis`] — lossless tokenizer and recovering parser
//! - [`annotations`] — the typed annotation model, prefixes preserved
//! - [`analyse`] — type inference with graded certainty
//! - [`merge`] — reconciling inferred and existing annotations
//! - [`project`] — cross-file context and the convergence driver
//! - [`edit`] — the span/replacement edit lists handed to the renderer
//!
//! The crate performs no I/O: callers supply a path-to-source mapping
//! and receive per-file edit lists (see [`project::analyze_project`]).
//!
//! # Example
//!
//! ```
//! use luacats_core::analyse::{Catalogue, LuaVersion};
//! use luacats_core::project::{analyze_source, AnalyzeOptions};
//!
//! let source = "local function add(a, b)\n\treturn a + b\nend\n";
//! let catalogue = Catalogue::standard(LuaVersion::Lua54);
//! let report = analyze_source("add.lua", source, &catalogue, &AnalyzeOptions::default());
//! assert!(report.error.is_none());
//! assert!(!report.edits.is_empty());
//! ```

pub mod analyse;
pub mod annotations;
pub mod ast;
pub mod edit;
pub mod merge;
pub mod project;
pub mod source_analysis;

/// Re-exports of the types most callers need.
pub mod prelude {
    pub use crate::analyse::{Catalogue, Certainty, LuaVersion, TypeFact};
    pub use crate::edit::{apply_edits, SourceEdit};
    pub use crate::project::{analyze_project, analyze_source, AnalyzeOptions, SourceMap};
    pub use crate::source_analysis::Span;
}
