// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Source analysis: tokenization and parsing of Lua files.
//!
//! The pipeline starts here. [`tokenize`] turns source text into a
//! lossless token stream (comments are first-class tokens, preserved
//! verbatim), and [`parse`] builds the AST with doc blocks attached to
//! declarations and full error recovery — a broken statement never takes
//! the rest of the file with it.

mod error;
mod lexer;
pub mod parser;
mod span;
mod token;

#[cfg(test)]
mod lexer_property_tests;

pub use error::{LexError, LexErrorKind};
pub use lexer::tokenize;
pub use parser::{parse, Diagnostic, Severity};
pub use span::Span;
pub use token::{Token, TokenKind};
