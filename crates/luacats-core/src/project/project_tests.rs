// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Module detection, require resolution, and driver tests.

use camino::{Utf8Path, Utf8PathBuf};

use crate::analyse::{Catalogue, LuaVersion};
use crate::source_analysis::{parse, tokenize};

use super::{
    analyze_project, AnalyzeOptions, ProjectContext, SourceMap,
};

fn context_for(files: &[(&str, &str)]) -> ProjectContext {
    let mut ctx = ProjectContext::new();
    for (path, text) in files {
        let tokens = tokenize(text).expect("tokenize");
        let (chunk, _) = parse(tokens, text);
        ctx.register_file(Utf8Path::new(path), &chunk);
    }
    ctx.resolve_dependencies();
    ctx
}

fn sources(files: &[(&str, &str)]) -> SourceMap {
    files
        .iter()
        .map(|(path, text)| (Utf8PathBuf::from(*path), (*text).to_string()))
        .collect()
}

#[test]
fn empty_module_detected_with_zero_members() {
    let ctx = context_for(&[("m.lua", "local M = {}\nreturn M\n")]);
    let module = ctx.module(Utf8Path::new("m.lua")).expect("module");
    assert_eq!(module.name, "M");
    assert!(module.exported_members.is_empty());
}

#[test]
fn module_members_collected_in_order() {
    let source = "local M = {}\n\
         function M.first() return 1 end\n\
         function M:second() return 2 end\n\
         M.third = 3\n\
         return M\n";
    let ctx = context_for(&[("m.lua", source)]);
    let module = ctx.module(Utf8Path::new("m.lua")).expect("module");
    let members: Vec<_> = module.exported_members.keys().map(|k| k.as_str()).collect();
    assert_eq!(members, vec!["first", "second", "third"]);
}

#[test]
fn module_detection_follows_renamed_local() {
    let source = "local M = {}\n\
         function M.x() return 1 end\n\
         local Renamed = M\n\
         return Renamed\n";
    let ctx = context_for(&[("m.lua", source)]);
    let module = ctx.module(Utf8Path::new("m.lua")).expect("module");
    assert_eq!(module.name, "M");
    assert!(module.exported_members.contains_key("x"));
}

#[test]
fn module_constructor_fields_are_members() {
    let source = "local M = { version = '1.0' }\nreturn M\n";
    let ctx = context_for(&[("m.lua", source)]);
    let module = ctx.module(Utf8Path::new("m.lua")).expect("module");
    assert!(module.exported_members.contains_key("version"));
}

#[test]
fn file_without_module_pattern_has_none() {
    let ctx = context_for(&[("script.lua", "print('hello')\n")]);
    assert!(ctx.module(Utf8Path::new("script.lua")).is_none());
}

#[test]
fn requires_resolve_by_dotted_and_short_name() {
    let ctx = context_for(&[
        ("lib/util.lua", "local U = {}\nreturn U\n"),
        (
            "main.lua",
            "local util = require('lib.util')\nlocal u2 = require('util')\n",
        ),
    ]);
    let main = Utf8Path::new("main.lua");
    assert_eq!(
        ctx.alias_target(main, "util"),
        Some(Utf8Path::new("lib/util.lua"))
    );
    assert_eq!(
        ctx.alias_target(main, "u2"),
        Some(Utf8Path::new("lib/util.lua"))
    );
    assert_eq!(ctx.alias_target(main, "missing"), None);
}

#[test]
fn init_file_answers_to_directory_name() {
    let ctx = context_for(&[
        ("pkg/init.lua", "local P = {}\nreturn P\n"),
        ("main.lua", "local pkg = require('pkg')\n"),
    ]);
    assert_eq!(
        ctx.alias_target(Utf8Path::new("main.lua"), "pkg"),
        Some(Utf8Path::new("pkg/init.lua"))
    );
}

#[test]
fn cross_file_member_types_converge() {
    let sources = sources(&[
        (
            "a.lua",
            "local A = {}\nfunction A.answer()\n\treturn 42\nend\nreturn A\n",
        ),
        (
            "b.lua",
            "local a = require('a')\nlocal B = {}\nfunction B.wrap()\n\treturn a.answer()\nend\nreturn B\n",
        ),
    ]);
    let catalogue = Catalogue::standard(LuaVersion::Lua54);
    let result = analyze_project(&sources, &catalogue, &AnalyzeOptions::default());
    assert!(result.converged, "ran {} passes", result.passes);

    let b = result
        .files
        .iter()
        .find(|f| f.path == "b.lua")
        .expect("b.lua report");
    let combined: String = b.edits.iter().map(|e| e.replacement.clone()).collect();
    assert!(
        combined.contains("---@return number"),
        "edits: {combined:?}"
    );
}

#[test]
fn lex_error_is_scoped_to_its_file() {
    let sources = sources(&[
        ("bad.lua", "local s = \"unterminated\n"),
        ("good.lua", "local function f()\n\treturn 1\nend\n"),
    ]);
    let catalogue = Catalogue::standard(LuaVersion::Lua54);
    let result = analyze_project(&sources, &catalogue, &AnalyzeOptions::default());

    let bad = result.files.iter().find(|f| f.path == "bad.lua").unwrap();
    assert!(bad.error.is_some());
    assert!(bad.edits.is_empty());

    let good = result.files.iter().find(|f| f.path == "good.lua").unwrap();
    assert!(good.error.is_none());
    assert!(!good.edits.is_empty());
}

#[test]
fn module_table_gets_module_header() {
    let sources = sources(&[(
        "mymod.lua",
        "local M = {}\nfunction M.f()\n\treturn 1\nend\nreturn M\n",
    )]);
    let catalogue = Catalogue::standard(LuaVersion::Lua54);
    let result = analyze_project(&sources, &catalogue, &AnalyzeOptions::default());
    let report = &result.files[0];
    let combined: String = report.edits.iter().map(|e| e.replacement.clone()).collect();
    assert!(combined.contains("---@module 'mymod'"), "{combined:?}");
}

#[test]
fn pass_cap_bounds_the_loop() {
    let sources = sources(&[(
        "self.lua",
        "local S = {}\nfunction S.f()\n\treturn S.f()\nend\nreturn S\n",
    )]);
    let catalogue = Catalogue::standard(LuaVersion::Lua54);
    let options = AnalyzeOptions { max_passes: 3 };
    let result = analyze_project(&sources, &catalogue, &options);
    assert!(result.passes <= 3);
}

#[test]
fn require_names_for_paths() {
    use super::require_names_for;
    let names = require_names_for(Utf8Path::new("a/b/c.lua"));
    assert_eq!(names, vec!["a.b.c", "b.c", "c"]);
    let names = require_names_for(Utf8Path::new("pkg/init.lua"));
    assert_eq!(names, vec!["pkg"]);
}
