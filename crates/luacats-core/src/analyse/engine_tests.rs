// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Inference engine tests over single files.

use camino::Utf8Path;

use crate::ast::DeclId;
use crate::project::ProjectContext;
use crate::source_analysis::{parse, tokenize};

use super::{infer_file, Catalogue, Certainty, DeclFacts, FileFacts, LuaVersion};

fn infer(source: &str) -> FileFacts {
    let tokens = tokenize(source).expect("tokenize");
    let (chunk, diagnostics) = parse(tokens, source);
    assert!(diagnostics.is_empty(), "{diagnostics:?}");
    let catalogue = Catalogue::standard(LuaVersion::Lua54);
    let ctx = ProjectContext::new();
    infer_file(&chunk, Utf8Path::new("test.lua"), &catalogue, &ctx)
}

fn first_decl(facts: &FileFacts) -> &DeclFacts {
    facts.decls.get(&DeclId(0)).expect("first declaration")
}

#[test]
fn literal_returns_are_certain() {
    let facts = infer("local function f() return 'hello' end");
    let decl = first_decl(&facts);
    assert!(decl.returns_value);
    assert_eq!(decl.returns.len(), 1);
    let fact = decl.returns[0].collapse();
    assert_eq!(fact.type_expr.to_string(), "string");
    assert_eq!(fact.certainty, Certainty::Certain);
}

#[test]
fn arithmetic_params_lean_numeric_at_uncertain() {
    let facts = infer("local function add(a, b) return a + b end");
    let decl = first_decl(&facts);
    assert_eq!(decl.params.len(), 2);
    for slot in &decl.params {
        let fact = slot.collapse();
        assert_eq!(fact.type_expr.to_string(), "number");
        assert_eq!(fact.certainty, Certainty::Uncertain);
    }
    // The return joins the two Uncertain operands.
    let ret = decl.returns[0].collapse();
    assert_eq!(ret.type_expr.to_string(), "number");
    assert_eq!(ret.certainty, Certainty::Uncertain);
}

#[test]
fn no_return_value_is_recorded_explicitly() {
    let facts = infer("local function log(msg) print(msg) end");
    let decl = first_decl(&facts);
    assert!(!decl.returns_value);
    assert!(decl.returns.is_empty());
}

#[test]
fn bare_return_is_not_a_value() {
    let facts = infer("local function f(x) if x then return end end");
    let decl = first_decl(&facts);
    assert!(!decl.returns_value);
}

#[test]
fn catalogue_calls_return_certain_types() {
    let facts = infer("local function f(x) return tostring(x) end");
    let decl = first_decl(&facts);
    let ret = decl.returns[0].collapse();
    assert_eq!(ret.type_expr.to_string(), "string");
    assert_eq!(ret.certainty, Certainty::Certain);
}

#[test]
fn unlisted_catalogue_namespace_member_stays_unknown() {
    let facts = infer("local function f() return string.totally_unlisted() end");
    let decl = first_decl(&facts);
    let ret = decl.returns[0].collapse();
    assert_eq!(ret.certainty, Certainty::Unknown);
}

#[test]
fn branch_returns_accumulate_union_variants() {
    let facts = infer(
        "local function pick(flag)\n\
         \tif flag then\n\
         \t\treturn 1\n\
         \telse\n\
         \t\treturn 'one'\n\
         \tend\n\
         end\n",
    );
    let decl = first_decl(&facts);
    let ret = decl.returns[0].collapse();
    assert_eq!(ret.type_expr.to_string(), "number|string");
    assert_eq!(ret.certainty, Certainty::Certain);
    assert_eq!(decl.returns[0].variants().len(), 2);
}

#[test]
fn existing_annotations_seed_uncertain() {
    let facts = infer(
        "---@param x string\n\
         ---@return boolean\n\
         local function f(x) return is_ok(x) end\n",
    );
    let decl = first_decl(&facts);
    let param = decl.params[0].collapse();
    assert_eq!(param.type_expr.to_string(), "string");
    assert_eq!(param.certainty, Certainty::Uncertain);
    let ret = decl.returns[0].collapse();
    assert_eq!(ret.type_expr.to_string(), "boolean");
    assert_eq!(ret.certainty, Certainty::Uncertain);
}

#[test]
fn concat_leans_string_and_joins_certainty() {
    let facts = infer("local function greet(name) return 'hi ' .. name end");
    let decl = first_decl(&facts);
    let param = decl.params[0].collapse();
    assert_eq!(param.type_expr.to_string(), "string");
    let ret = decl.returns[0].collapse();
    assert_eq!(ret.type_expr.to_string(), "string");
    // Certain literal ⊕ Uncertain param = Uncertain.
    assert_eq!(ret.certainty, Certainty::Uncertain);
}

#[test]
fn local_bindings_flow_into_returns() {
    let facts = infer(
        "local function f()\n\
         \tlocal count = 42\n\
         \treturn count\n\
         end\n",
    );
    let decl = first_decl(&facts);
    let ret = decl.returns[0].collapse();
    assert_eq!(ret.type_expr.to_string(), "number");
    assert_eq!(ret.certainty, Certainty::Certain);
}

#[test]
fn same_file_callee_returns_propagate() {
    let facts = infer(
        "local function base() return 7 end\n\
         local function wrap() return base() end\n",
    );
    let wrap = facts.decls.get(&DeclId(1)).expect("wrap");
    let ret = wrap.returns[0].collapse();
    assert_eq!(ret.type_expr.to_string(), "number");
    // Certain callee fact ⊕ Certain call site = Certain.
    assert_eq!(ret.certainty, Certainty::Certain);
}

#[test]
fn multi_value_return_spreads_slots() {
    let facts = infer("local function pair() return 1, 'two' end");
    let decl = first_decl(&facts);
    assert_eq!(decl.returns.len(), 2);
    assert_eq!(decl.returns[0].collapse().type_expr.to_string(), "number");
    assert_eq!(decl.returns[1].collapse().type_expr.to_string(), "string");
}

#[test]
fn require_binding_is_a_table() {
    let facts = infer("local util = require('project.util')");
    let decl = first_decl(&facts);
    let binding = decl.binding.collapse();
    assert_eq!(binding.type_expr.to_string(), "table");
    assert_eq!(binding.certainty, Certainty::Certain);
}

#[test]
fn function_binding_carries_signature_type() {
    let facts = infer("local function add(a, b) return a + b end");
    let decl = first_decl(&facts);
    let binding = decl.binding.collapse();
    assert_eq!(
        binding.type_expr.to_string(),
        "fun(a: number, b: number): number"
    );
    assert_eq!(binding.certainty, Certainty::Certain);
}

#[test]
fn indexed_param_leans_table() {
    let facts = infer("local function get(t) return t.value end");
    let decl = first_decl(&facts);
    let param = decl.params[0].collapse();
    assert_eq!(param.type_expr.to_string(), "table");
    assert_eq!(param.certainty, Certainty::Uncertain);
}

#[test]
fn value_symbols_resolve_through_catalogue() {
    let facts = infer("local function f() return math.pi end");
    let decl = first_decl(&facts);
    let ret = decl.returns[0].collapse();
    assert_eq!(ret.type_expr.to_string(), "number");
    assert_eq!(ret.certainty, Certainty::Certain);
}
