// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Parser tests: statement coverage, doc-block attachment, recovery.

use crate::annotations::AnnotationKind;
use crate::ast::{BlockKind, Chunk, DocLineKind, Expr, Literal, Stmt};
use crate::source_analysis::{parse, tokenize, Diagnostic};

fn parse_source(source: &str) -> (Chunk, Vec<Diagnostic>) {
    let tokens = tokenize(source).expect("tokenize");
    parse(tokens, source)
}

fn parse_clean(source: &str) -> Chunk {
    let (chunk, diagnostics) = parse_source(source);
    assert!(
        diagnostics.is_empty(),
        "unexpected diagnostics: {diagnostics:?}"
    );
    chunk
}

#[test]
fn local_declaration() {
    let chunk = parse_clean("local x, y = 1, 'two'");
    let Stmt::Local(decl) = &chunk.stmts[0] else {
        panic!("expected local");
    };
    assert_eq!(decl.names.len(), 2);
    assert_eq!(decl.names[0].name, "x");
    assert_eq!(decl.exprs.len(), 2);
    assert!(matches!(
        decl.exprs[0],
        Expr::Literal(Literal::Number(_), _)
    ));
}

#[test]
fn function_declaration_forms() {
    let chunk = parse_clean(
        "function free() end\n\
         function t.member() end\n\
         function t.a.b() end\n\
         function t:method() end\n\
         local function helper() end\n",
    );
    let names: Vec<_> = chunk
        .stmts
        .iter()
        .map(|s| {
            let Stmt::Function(decl) = s else {
                panic!("expected function");
            };
            (decl.name.full_name(), decl.name.is_method, decl.is_local)
        })
        .collect();
    assert_eq!(names[0], ("free".into(), false, false));
    assert_eq!(names[1], ("t.member".into(), false, false));
    assert_eq!(names[2], ("t.a.b".into(), false, false));
    assert_eq!(names[3], ("t:method".into(), true, false));
    assert_eq!(names[4], ("helper".into(), false, true));
}

#[test]
fn anonymous_function_bound_by_assignment() {
    let chunk = parse_clean("handler = function(a, b) return a end");
    let Stmt::Assign(assign) = &chunk.stmts[0] else {
        panic!("expected assignment");
    };
    let body = assign.exprs[0].as_function().expect("function rhs");
    assert_eq!(body.params.len(), 2);
}

#[test]
fn method_params_exclude_self() {
    let chunk = parse_clean("function t:m(a) end");
    let Stmt::Function(decl) = &chunk.stmts[0] else {
        panic!("expected function");
    };
    assert_eq!(decl.body.params.len(), 1);
    assert_eq!(decl.body.params[0].name, "a");
    assert!(decl.name.is_method);
}

#[test]
fn returns_inside_control_flow_are_reachable() {
    let chunk = parse_clean(
        "local function f(x)\n\
         \tif x then\n\
         \t\treturn 1\n\
         \telse\n\
         \t\treturn 'two'\n\
         \tend\n\
         end\n",
    );
    let Stmt::Function(decl) = &chunk.stmts[0] else {
        panic!("expected function");
    };
    let Stmt::Block(block) = &decl.body.body[0] else {
        panic!("expected block");
    };
    assert_eq!(block.kind, BlockKind::If);
    let returns = block
        .body
        .iter()
        .filter(|s| matches!(s, Stmt::Return(_)))
        .count();
    assert_eq!(returns, 2);
}

#[test]
fn while_for_repeat_do_blocks() {
    let chunk = parse_clean(
        "while a do x() end\n\
         for i = 1, 10 do y() end\n\
         for k, v in pairs(t) do z() end\n\
         repeat w() until done\n\
         do v() end\n",
    );
    let kinds: Vec<_> = chunk
        .stmts
        .iter()
        .map(|s| {
            let Stmt::Block(block) = s else {
                panic!("expected block");
            };
            block.kind
        })
        .collect();
    assert_eq!(
        kinds,
        vec![
            BlockKind::While,
            BlockKind::ForNumeric,
            BlockKind::ForGeneric,
            BlockKind::RepeatUntil,
            BlockKind::Do,
        ]
    );
}

#[test]
fn binary_precedence() {
    let chunk = parse_clean("x = 1 + 2 * 3");
    let Stmt::Assign(assign) = &chunk.stmts[0] else {
        panic!("expected assignment");
    };
    let Expr::Binary { op, rhs, .. } = &assign.exprs[0] else {
        panic!("expected binary");
    };
    assert_eq!(format!("{op:?}"), "Add");
    assert!(matches!(**rhs, Expr::Binary { .. }));
}

#[test]
fn concat_is_right_associative() {
    let chunk = parse_clean("x = a .. b .. c");
    let Stmt::Assign(assign) = &chunk.stmts[0] else {
        panic!("expected assignment");
    };
    let Expr::Binary { lhs, rhs, .. } = &assign.exprs[0] else {
        panic!("expected binary");
    };
    assert!(matches!(**lhs, Expr::Identifier(_)));
    assert!(matches!(**rhs, Expr::Binary { .. }));
}

#[test]
fn call_sugar_forms() {
    let chunk = parse_clean("f()\nf 'str'\nf { x = 1 }\nt:m(1)\nt.a.b(2)");
    assert_eq!(chunk.stmts.len(), 5);
    for stmt in &chunk.stmts {
        assert!(matches!(stmt, Stmt::Call(_)), "got {stmt:?}");
    }
}

#[test]
fn doc_block_attaches_to_function() {
    let chunk = parse_clean(
        "--- Adds two numbers.\n\
         ---@param a number\n\
         ---@param b number\n\
         ---@return number\n\
         local function add(a, b)\n\
         \treturn a + b\n\
         end\n",
    );
    let Stmt::Function(decl) = &chunk.stmts[0] else {
        panic!("expected function");
    };
    let doc = decl.doc.as_ref().expect("doc block");
    assert!(doc.has_description());
    assert_eq!(doc.annotations().count(), 3);
    assert_eq!(doc.lines[0].raw, "--- Adds two numbers.");
}

#[test]
fn doc_block_stops_at_blank_line() {
    let chunk = parse_clean(
        "---@type number\n\
         \n\
         local x = 1\n",
    );
    let Stmt::Local(decl) = &chunk.stmts[0] else {
        panic!("expected local");
    };
    assert!(decl.doc.is_none());
}

#[test]
fn doc_block_not_broken_by_preceding_plain_comment() {
    let chunk = parse_clean(
        "-- plain note\n\
         ---@type number\n\
         local x = 1\n",
    );
    let Stmt::Local(decl) = &chunk.stmts[0] else {
        panic!("expected local");
    };
    let doc = decl.doc.as_ref().expect("doc block");
    // Only the annotation line attaches; the plain comment is not part
    // of the block.
    assert_eq!(doc.lines.len(), 1);
}

#[test]
fn plain_comment_between_annotations_splits_the_block() {
    let chunk = parse_clean(
        "---@param a number\n\
         -- unrelated\n\
         ---@param b number\n\
         local function f(a, b) end\n",
    );
    let Stmt::Function(decl) = &chunk.stmts[0] else {
        panic!("expected function");
    };
    let doc = decl.doc.as_ref().expect("doc block");
    assert_eq!(doc.annotations().count(), 1);
}

#[test]
fn trailing_comment_does_not_attach_to_next_statement() {
    let chunk = parse_clean(
        "local x = 1 ---@type number\n\
         local y = 2\n",
    );
    let Stmt::Local(decl) = &chunk.stmts[1] else {
        panic!("expected local");
    };
    assert!(decl.doc.is_none());
}

#[test]
fn alias_entries_group_under_header() {
    let chunk = parse_clean(
        "---@alias Direction\n\
         ---| 'north' # up\n\
         ---| 'south' # down\n\
         ---| 'east'\n\
         local dir = nil\n",
    );
    let Stmt::Local(decl) = &chunk.stmts[0] else {
        panic!("expected local");
    };
    let doc = decl.doc.as_ref().expect("doc block");
    // One alias annotation with three entries, not four annotations.
    let annotations: Vec<_> = doc.annotations().collect();
    assert_eq!(annotations.len(), 1);
    let AnnotationKind::Alias(alias) = &annotations[0].kind else {
        panic!("expected alias");
    };
    assert_eq!(alias.entries.len(), 3);
    assert_eq!(alias.entries[0].value, "'north'");
    assert_eq!(alias.entries[2].description, None);
    // Entry lines are still present as lines for verbatim re-emission.
    let entry_lines = doc
        .lines
        .iter()
        .filter(|l| matches!(l.kind, DocLineKind::AliasEntry))
        .count();
    assert_eq!(entry_lines, 3);
}

#[test]
fn stray_alias_entry_is_flagged() {
    let (chunk, diagnostics) = parse_source(
        "---| 'orphan'\n\
         local x = 1\n",
    );
    assert!(!diagnostics.is_empty());
    let Stmt::Local(decl) = &chunk.stmts[0] else {
        panic!("expected local");
    };
    assert!(decl.doc.is_some());
}

#[test]
fn block_comment_lines_pass_through_as_aux() {
    let chunk = parse_clean(
        "---@return string\n\
         --[[ was: ---@return number ]]\n\
         local function f() return 's' end\n",
    );
    let Stmt::Function(decl) = &chunk.stmts[0] else {
        panic!("expected function");
    };
    let doc = decl.doc.as_ref().expect("doc block");
    assert!(doc
        .lines
        .iter()
        .any(|l| matches!(l.kind, DocLineKind::Aux)));
}

#[test]
fn broken_statement_becomes_opaque_and_parsing_continues() {
    let (chunk, diagnostics) = parse_source(
        "local ok = 1\n\
         = = garbage @ here\n\
         local after = 2\n",
    );
    assert!(!diagnostics.is_empty());
    assert!(chunk.stmts.iter().any(|s| matches!(s, Stmt::Opaque(_))));
    let locals = chunk
        .stmts
        .iter()
        .filter(|s| matches!(s, Stmt::Local(_)))
        .count();
    assert_eq!(locals, 2);
}

#[test]
fn opaque_statement_keeps_raw_text() {
    let (chunk, _) = parse_source("= broken =\nlocal x = 1\n");
    let Some(Stmt::Opaque(opaque)) = chunk
        .stmts
        .iter()
        .find(|s| matches!(s, Stmt::Opaque(_)))
    else {
        panic!("expected opaque");
    };
    assert!(opaque.text.contains("broken"));
}

#[test]
fn module_pattern_statements_parse() {
    let chunk = parse_clean(
        "local M = {}\n\
         \n\
         function M.greet(name)\n\
         \treturn 'hello ' .. name\n\
         end\n\
         \n\
         M.version = '1.0'\n\
         \n\
         return M\n",
    );
    assert_eq!(chunk.stmts.len(), 4);
    assert!(matches!(chunk.stmts[3], Stmt::Return(_)));
}

#[test]
fn require_call_parses_as_local_initializer() {
    let chunk = parse_clean("local util = require('my.util')\nrequire 'side_effect'\n");
    let Stmt::Local(decl) = &chunk.stmts[0] else {
        panic!("expected local");
    };
    let Expr::Call { callee, args, .. } = &decl.exprs[0] else {
        panic!("expected call");
    };
    assert_eq!(callee.dotted_path().as_deref(), Some("require"));
    assert_eq!(args.len(), 1);
    assert!(matches!(chunk.stmts[1], Stmt::Call(_)));
}

#[test]
fn goto_break_and_labels_are_opaque_without_diagnostics() {
    let (chunk, diagnostics) = parse_source(
        "while x do\n\
         \tbreak\n\
         end\n\
         ::top::\n\
         goto top\n",
    );
    assert!(diagnostics.is_empty(), "{diagnostics:?}");
    assert!(chunk
        .stmts
        .iter()
        .any(|s| matches!(s, Stmt::Opaque(_))));
}

#[test]
fn local_attribute_is_consumed() {
    let chunk = parse_clean("local x <const> = 1");
    let Stmt::Local(decl) = &chunk.stmts[0] else {
        panic!("expected local");
    };
    assert_eq!(decl.names[0].name, "x");
    assert_eq!(decl.exprs.len(), 1);
}

#[test]
fn vararg_function() {
    let chunk = parse_clean("local function f(a, ...) return ... end");
    let Stmt::Function(decl) = &chunk.stmts[0] else {
        panic!("expected function");
    };
    assert!(decl.body.is_vararg);
    assert_eq!(decl.body.params.len(), 1);
}

#[test]
fn nested_functions_collected() {
    let chunk = parse_clean(
        "local function outer()\n\
         \tlocal function inner() return 1 end\n\
         \treturn inner\n\
         end\n",
    );
    let decls = crate::ast::collect_declarations(&chunk);
    assert_eq!(decls.len(), 2);
    assert_eq!(decls[0].name().as_deref(), Some("outer"));
    assert_eq!(decls[1].name().as_deref(), Some("inner"));
}
