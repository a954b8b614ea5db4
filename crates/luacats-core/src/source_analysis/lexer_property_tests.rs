// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Property-based tests for the Lua lexer.
//!
//! These tests use `proptest` to verify lexer invariants over generated
//! inputs:
//!
//! 1. **Lexer never panics** — arbitrary input tokenizes or fails cleanly
//! 2. **Token spans within input** — all spans satisfy `end <= len`
//! 3. **Token spans are non-overlapping and ordered**
//! 4. **EOF is always last** — a successful lex ends with exactly one EOF
//! 5. **Lexer is deterministic** — same input, same tokens
//! 6. **Comment text round-trips** — every comment token's text is the
//!    exact source slice at its span
//! 7. **Valid fragments lex cleanly** — known-good Lua never errors

use proptest::prelude::*;

use super::lexer::tokenize;

// ============================================================================
// Generators
// ============================================================================

/// Known-valid fragments that must lex without errors.
const VALID_FRAGMENTS: &[&str] = &[
    "local x = 1",
    "return x + y",
    "function M.f(a, b) return a end",
    "local s = 'str'",
    "local s = \"str\"",
    "local s = [[long]]",
    "-- comment",
    "--- doc",
    "---@param x number",
    "---| 'entry' # desc",
    "--[[ block ]]",
    "t = { a = 1, [k] = v; 2 }",
    "if a ~= b then c() end",
    "for i = 1, #t do end",
    "x = 0xFF + 1e10 - .5",
    "a, b = f(...)",
    "::label:: goto label",
    "local y <const> = 2",
];

fn valid_fragment() -> impl Strategy<Value = String> {
    prop::sample::select(VALID_FRAGMENTS).prop_map(std::string::ToString::to_string)
}

/// Default is 256 cases; override via `PROPTEST_CASES` for longer runs.
fn proptest_config() -> ProptestConfig {
    let default = ProptestConfig::default();
    ProptestConfig {
        cases: default.cases.max(256),
        ..default
    }
}

proptest! {
    #![proptest_config(proptest_config())]

    /// Property 1: the lexer never panics on arbitrary input.
    #[test]
    fn lexer_never_panics(input in "\\PC{0,400}") {
        let _result = tokenize(&input);
    }

    /// Property 2 + 3: spans are in bounds, ordered, and non-overlapping.
    #[test]
    fn token_spans_in_bounds_and_ordered(input in "\\PC{0,400}") {
        if let Ok(tokens) = tokenize(&input) {
            let mut previous_end = 0u32;
            for token in &tokens {
                let span = token.span();
                prop_assert!(span.start() <= span.end());
                prop_assert!((span.end() as usize) <= input.len());
                prop_assert!(span.start() >= previous_end);
                previous_end = span.end();
            }
        }
    }

    /// Property 4: a successful lex ends with exactly one EOF token.
    #[test]
    fn eof_is_always_last(input in "\\PC{0,400}") {
        if let Ok(tokens) = tokenize(&input) {
            prop_assert!(tokens.last().is_some_and(|t| t.kind().is_eof()));
            let eof_count = tokens.iter().filter(|t| t.kind().is_eof()).count();
            prop_assert_eq!(eof_count, 1);
        }
    }

    /// Property 5: lexing is deterministic.
    #[test]
    fn lexer_is_deterministic(input in "\\PC{0,400}") {
        let first = tokenize(&input);
        let second = tokenize(&input);
        prop_assert_eq!(first, second);
    }

    /// Property 6: every comment token's text equals the source slice at
    /// its span, dashes and all.
    #[test]
    fn comment_text_round_trips(input in "\\PC{0,400}") {
        if let Ok(tokens) = tokenize(&input) {
            for token in &tokens {
                if token.kind().is_comment() {
                    let slice = &input[token.span().as_range()];
                    prop_assert_eq!(token.kind().as_str(), Some(slice));
                }
            }
        }
    }

    /// Property 7: known-valid fragments always lex, alone or joined.
    #[test]
    fn valid_fragments_lex_cleanly(a in valid_fragment(), b in valid_fragment()) {
        let joined = format!("{a}\n{b}\n");
        prop_assert!(tokenize(&joined).is_ok());
    }
}
