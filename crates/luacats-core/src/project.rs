// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Project-wide analysis.
//!
//! The [`ProjectContext`] aggregates every file's module table (the value
//! the file returns) and its exported members, plus a reverse index from
//! `require` names to files. It is built once after all files are parsed,
//! is read-only during an inference pass, and is rebuilt by the driver
//! between passes as new facts land.
//!
//! [`analyze_project`] is the driver: parse all files (in parallel —
//! per-file parsing shares no mutable state), build the context, then run
//! inference passes to a fixed point. A pass that would lower any
//! already-achieved certainty is not applied: its newly-Certain facts are
//! folded into the previous result and the loop halts. A pass cap bounds
//! the loop against oscillation.

use std::collections::HashMap;

use camino::{Utf8Path, Utf8PathBuf};
use ecow::EcoString;
use indexmap::IndexMap;
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::analyse::{
    infer_file, require_target, Catalogue, Certainty, DeclFacts, FileFacts, SlotFacts,
};
use crate::ast::{collect_declarations, Chunk, DeclId, Declaration, Expr, Stmt};
use crate::edit::SourceEdit;
use crate::merge::merge_declaration;
use crate::source_analysis::{parse, tokenize, Diagnostic, LexError, Span};

/// The input to a project run: an ordered mapping from file path to raw
/// UTF-8 source text, supplied by the file-discovery layer.
pub type SourceMap = IndexMap<Utf8PathBuf, String>;

/// A module dependency pulled in through `require`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyInfo {
    /// The module path as written: `require("foo.bar")`.
    pub required_path: EcoString,
    /// The local alias, for `local bar = require("foo.bar")`.
    pub local_alias: Option<EcoString>,
    /// The project file the path resolved to, when it did.
    pub resolved: Option<Utf8PathBuf>,
}

/// The module a file returns at top level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleInfo {
    /// The local identifier bound to the module table.
    pub name: EcoString,
    /// Exported members in declaration order: member name to the
    /// declaration that defines it.
    pub exported_members: IndexMap<EcoString, DeclId>,
    /// The file this module lives in.
    pub file_path: Utf8PathBuf,
    /// The declaration of the module table itself.
    pub table_decl: Option<DeclId>,
}

#[derive(Debug, Default)]
struct FileRecord {
    module: Option<ModuleInfo>,
    dependencies: Vec<DependencyInfo>,
    /// Facts for exported members, refreshed between passes.
    member_facts: HashMap<EcoString, DeclFacts>,
}

/// The aggregated cross-file view used to resolve inter-file types.
#[derive(Debug, Default)]
pub struct ProjectContext {
    records: IndexMap<Utf8PathBuf, FileRecord>,
    by_require_name: HashMap<EcoString, Utf8PathBuf>,
}

impl ProjectContext {
    /// Creates an empty context (single-file mode registers one file).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The local identifier bound to the file's module table, if the
    /// file has one.
    #[must_use]
    pub fn module_local_name(&self, file: &Utf8Path) -> Option<&EcoString> {
        self.records
            .get(file)?
            .module
            .as_ref()
            .map(|module| &module.name)
    }

    /// The module info for a file.
    #[must_use]
    pub fn module(&self, file: &Utf8Path) -> Option<&ModuleInfo> {
        self.records.get(file)?.module.as_ref()
    }

    /// The dependencies a file pulls in through `require`.
    #[must_use]
    pub fn dependencies(&self, file: &Utf8Path) -> &[DependencyInfo] {
        self.records
            .get(file)
            .map_or(&[], |record| record.dependencies.as_slice())
    }

    /// Resolves a require alias used in `file` to the file it names.
    #[must_use]
    pub fn alias_target(&self, file: &Utf8Path, alias: &str) -> Option<&Utf8Path> {
        self.records
            .get(file)?
            .dependencies
            .iter()
            .find(|dep| dep.local_alias.as_deref() == Some(alias))?
            .resolved
            .as_deref()
    }

    /// Facts for an exported member of the module in `file`, from the
    /// previous pass.
    #[must_use]
    pub fn member_facts(&self, file: &Utf8Path, member: &str) -> Option<&DeclFacts> {
        self.records.get(file)?.member_facts.get(member)
    }

    /// The shortest require name a file answers to: `bar` for
    /// `foo/bar.lua`, `foo` for `foo/init.lua`.
    #[must_use]
    pub fn require_name(&self, file: &Utf8Path) -> Option<EcoString> {
        require_names_for(file).into_iter().next_back()
    }

    /// Registers a parsed file: detects its module pattern and records
    /// its `require` dependencies. Consumers that only need the
    /// parse-stage view (e.g. header extraction over
    /// [`ModuleInfo::exported_members`]) can build a context from this
    /// without running inference.
    pub fn register_file(&mut self, path: &Utf8Path, chunk: &Chunk) {
        let decls = collect_declarations(chunk);
        let record = FileRecord {
            module: detect_module(chunk, &decls, path),
            dependencies: scan_requires(chunk),
            member_facts: HashMap::new(),
        };
        self.records.insert(path.to_owned(), record);
        for name in require_names_for(path) {
            self.by_require_name
                .entry(name)
                .or_insert_with(|| path.to_owned());
        }
    }

    /// Resolves each dependency's required path against the registered
    /// require names. Runs once all files are registered.
    pub fn resolve_dependencies(&mut self) {
        let lookup = self.by_require_name.clone();
        for record in self.records.values_mut() {
            for dep in &mut record.dependencies {
                dep.resolved = lookup
                    .get(&dep.required_path)
                    .or_else(|| {
                        // Fall back to the last path segment: projects
                        // often require by short name.
                        let short = dep.required_path.rsplit('.').next()?;
                        lookup.get(short)
                    })
                    .cloned();
            }
        }
    }

    /// Refreshes exported-member facts from a pass's output. Called by
    /// the driver between passes; never during one.
    fn update_member_facts(&mut self, file: &Utf8Path, facts: &FileFacts) {
        let Some(record) = self.records.get_mut(file) else {
            return;
        };
        let Some(module) = &record.module else {
            return;
        };
        let mut fresh = HashMap::new();
        for (member, decl_id) in &module.exported_members {
            if let Some(decl_facts) = facts.decls.get(decl_id) {
                fresh.insert(member.clone(), decl_facts.clone());
            }
        }
        record.member_facts = fresh;
    }
}

/// Candidate require names for a file, shortest last:
/// `a/b/c.lua` yields `["c", "b.c", "a.b.c"]`; `a/b/init.lua` yields
/// `["b", "a.b"]`.
fn require_names_for(path: &Utf8Path) -> Vec<EcoString> {
    let mut components: Vec<&str> = path
        .components()
        .map(|c| c.as_str())
        .filter(|c| !matches!(*c, "/" | "." | ".."))
        .collect();
    let Some(last) = components.pop() else {
        return Vec::new();
    };
    let stem = last.strip_suffix(".lua").unwrap_or(last);
    if stem != "init" {
        components.push(stem);
    }
    let mut names = Vec::new();
    for start in (0..components.len()).rev() {
        names.push(EcoString::from(components[start..].join(".")));
    }
    names.reverse();
    names
}

/// Detects the module pattern: a top-level `local <id> = { ... }`, member
/// assignments through any alias of it, and a terminal `return <id>`.
fn detect_module(
    chunk: &Chunk,
    decls: &[Declaration<'_>],
    file_path: &Utf8Path,
) -> Option<ModuleInfo> {
    // The terminal return names the module table (possibly via alias).
    let returned = chunk.stmts.iter().rev().find_map(|stmt| match stmt {
        Stmt::Return(ret) => match ret.exprs.first() {
            Some(Expr::Identifier(id)) => Some(id.name.clone()),
            _ => None,
        },
        _ => None,
    })?;

    // Top-level locals: identifier aliases and table-valued bindings.
    let mut alias_of: HashMap<EcoString, EcoString> = HashMap::new();
    let mut table_locals: HashMap<EcoString, Span> = HashMap::new();
    for stmt in &chunk.stmts {
        let Stmt::Local(decl) = stmt else {
            continue;
        };
        let (Some(name), Some(expr)) = (decl.names.first(), decl.exprs.first()) else {
            continue;
        };
        match expr {
            Expr::Table(_) => {
                table_locals.insert(name.name.clone(), stmt.span());
            }
            Expr::Identifier(source) => {
                alias_of.insert(name.name.clone(), source.name.clone());
            }
            _ => {}
        }
    }

    // Follow reassignments from the returned name back to the table.
    let mut names = vec![returned.clone()];
    let mut current = returned;
    for _ in 0..8 {
        if table_locals.contains_key(&current) {
            break;
        }
        let source = alias_of.get(&current)?;
        current = source.clone();
        names.push(current.clone());
    }
    let table_span = *table_locals.get(&current)?;
    let module_name = current;

    let id_by_span: HashMap<(u32, u32), DeclId> = decls
        .iter()
        .map(|d| ((d.span().start(), d.span().end()), d.id))
        .collect();
    let decl_id_for = |span: Span| id_by_span.get(&(span.start(), span.end())).copied();
    let table_decl = decl_id_for(table_span);

    // Exported members: declarations through any alias of the table.
    let mut exported_members = IndexMap::new();
    for stmt in &chunk.stmts {
        match stmt {
            Stmt::Function(decl)
                if names.contains(&decl.name.base) && !decl.name.path.is_empty() =>
            {
                let member = EcoString::from(decl.name.path.join("."));
                if let Some(id) = decl_id_for(stmt.span()) {
                    exported_members.insert(member, id);
                }
            }
            Stmt::Assign(assign) => {
                let Some(path) = assign.targets.first().and_then(Expr::dotted_path) else {
                    continue;
                };
                let Some((root, member)) = path.split_once('.') else {
                    continue;
                };
                if names.iter().any(|n| n == root) {
                    if let Some(id) = decl_id_for(stmt.span()) {
                        exported_members.insert(EcoString::from(member), id);
                    }
                }
            }
            Stmt::Local(decl) if decl.names.first().is_some_and(|n| n.name == module_name) => {
                // Fields already present in the constructor are members
                // of the table declaration itself.
                if let Some(Expr::Table(table)) = decl.exprs.first() {
                    for field in &table.fields {
                        if let (Some(key), Some(id)) = (&field.key, decl_id_for(stmt.span())) {
                            exported_members.insert(key.clone(), id);
                        }
                    }
                }
            }
            _ => {}
        }
    }

    Some(ModuleInfo {
        name: module_name,
        exported_members,
        file_path: file_path.to_owned(),
        table_decl,
    })
}

/// Records top-level `require` dependencies: bound
/// (`local x = require(...)`) and bare (`require "..."`).
fn scan_requires(chunk: &Chunk) -> Vec<DependencyInfo> {
    let mut deps = Vec::new();
    for stmt in &chunk.stmts {
        match stmt {
            Stmt::Local(decl) => {
                for (index, expr) in decl.exprs.iter().enumerate() {
                    if let Some(target) = require_target(expr) {
                        deps.push(DependencyInfo {
                            required_path: target,
                            local_alias: decl.names.get(index).map(|n| n.name.clone()),
                            resolved: None,
                        });
                    }
                }
            }
            Stmt::Call(call) => {
                if let Some(target) = require_target(&call.call) {
                    deps.push(DependencyInfo {
                        required_path: target,
                        local_alias: None,
                        resolved: None,
                    });
                }
            }
            _ => {}
        }
    }
    deps
}

// ============================================================================
// Driver
// ============================================================================

/// Knobs for a project run.
#[derive(Debug, Clone)]
pub struct AnalyzeOptions {
    /// Upper bound on inference passes; a safety net against
    /// oscillation on top of the anti-regression rule.
    pub max_passes: usize,
}

impl Default for AnalyzeOptions {
    fn default() -> Self {
        Self { max_passes: 8 }
    }
}

/// The outcome for one input file.
#[derive(Debug)]
pub struct FileReport {
    /// The file this report is for.
    pub path: Utf8PathBuf,
    /// Ordered, non-overlapping edits; empty when nothing changed.
    pub edits: Vec<SourceEdit>,
    /// Parse and annotation diagnostics.
    pub diagnostics: Vec<Diagnostic>,
    /// Set when tokenization failed; the file was skipped, other files
    /// are unaffected.
    pub error: Option<LexError>,
}

/// The outcome of a project run.
#[derive(Debug)]
pub struct ProjectResult {
    /// One report per input file, in input order.
    pub files: Vec<FileReport>,
    /// How many inference passes ran.
    pub passes: usize,
    /// `false` when the pass cap was hit before a fixed point.
    pub converged: bool,
}

struct ParsedFile {
    path: Utf8PathBuf,
    chunk: Chunk,
    diagnostics: Vec<Diagnostic>,
}

/// Runs the full pipeline over a set of files.
///
/// Tokenize/parse runs per file in parallel; inference passes repeat
/// until a fixed point, each pass reading the previous pass's
/// [`ProjectContext`] snapshot.
#[must_use]
pub fn analyze_project(
    sources: &SourceMap,
    catalogue: &Catalogue,
    options: &AnalyzeOptions,
) -> ProjectResult {
    let inputs: Vec<(&Utf8PathBuf, &String)> = sources.iter().collect();
    let parsed: Vec<Result<ParsedFile, (Utf8PathBuf, LexError)>> = inputs
        .par_iter()
        .map(|(path, text)| match tokenize(text.as_str()) {
            Ok(tokens) => {
                let (chunk, diagnostics) = parse(tokens, text);
                Ok(ParsedFile {
                    path: (*path).clone(),
                    chunk,
                    diagnostics,
                })
            }
            Err(error) => Err(((*path).clone(), error)),
        })
        .collect();

    let mut ctx = ProjectContext::new();
    let files: Vec<&ParsedFile> = parsed.iter().filter_map(|r| r.as_ref().ok()).collect();
    for file in &files {
        ctx.register_file(&file.path, &file.chunk);
    }
    ctx.resolve_dependencies();

    // Inference passes to a fixed point.
    let mut previous: Option<Vec<FileFacts>> = None;
    let mut passes = 0;
    let mut converged = false;
    while passes < options.max_passes {
        passes += 1;
        let current: Vec<FileFacts> = files
            .par_iter()
            .map(|file| infer_file(&file.chunk, &file.path, catalogue, &ctx))
            .collect();

        match previous {
            Some(ref prev) if *prev == current => {
                debug!(passes, "inference converged");
                converged = true;
                break;
            }
            Some(ref prev) if has_regression(prev, &current) => {
                // Never regress achieved certainty: fold the new
                // Certain facts into the previous result and stop.
                warn!(passes, "certainty regression detected; keeping previous pass");
                let merged = merge_certain_facts(prev, &current);
                previous = Some(merged);
                converged = true;
                break;
            }
            _ => {}
        }

        for (file, facts) in files.iter().zip(&current) {
            ctx.update_member_facts(&file.path, facts);
        }
        previous = Some(current);
    }
    if !converged {
        warn!(
            max_passes = options.max_passes,
            "inference pass cap reached before convergence; using last stable result"
        );
    }
    let final_facts = previous.unwrap_or_default();

    // Merge annotations and build edits.
    let mut reports: Vec<FileReport> = Vec::new();
    let mut facts_by_path: HashMap<&Utf8Path, &FileFacts> = HashMap::new();
    for (file, facts) in files.iter().zip(&final_facts) {
        facts_by_path.insert(&file.path, facts);
    }

    for result in &parsed {
        match result {
            Ok(file) => {
                let text = sources.get(&file.path).map(String::as_str).unwrap_or("");
                let facts = facts_by_path.get(file.path.as_path());
                let edits = facts.map_or_else(Vec::new, |facts| {
                    build_edits(file, text, facts, &ctx)
                });
                reports.push(FileReport {
                    path: file.path.clone(),
                    edits,
                    diagnostics: file.diagnostics.clone(),
                    error: None,
                });
            }
            Err((path, error)) => reports.push(FileReport {
                path: path.clone(),
                edits: Vec::new(),
                diagnostics: Vec::new(),
                error: Some(error.clone()),
            }),
        }
    }

    ProjectResult {
        files: reports,
        passes,
        converged,
    }
}

/// Convenience wrapper for single-file mode: a project of one file.
#[must_use]
pub fn analyze_source(
    path: impl Into<Utf8PathBuf>,
    text: impl Into<String>,
    catalogue: &Catalogue,
    options: &AnalyzeOptions,
) -> FileReport {
    let mut sources = SourceMap::new();
    sources.insert(path.into(), text.into());
    let mut result = analyze_project(&sources, catalogue, options);
    result
        .files
        .pop()
        .unwrap_or_else(|| unreachable!("single-file run always yields one report"))
}

/// True when any slot's collapsed certainty went down between passes.
fn has_regression(prev: &[FileFacts], current: &[FileFacts]) -> bool {
    prev.iter().zip(current).any(|(p, c)| {
        p.decls.iter().any(|(id, prev_decl)| {
            c.decls.get(id).is_some_and(|cur_decl| {
                decl_slots(prev_decl)
                    .zip(decl_slots(cur_decl))
                    .any(|(p, c)| c.collapse().certainty < p.collapse().certainty)
            })
        })
    })
}

/// Folds newly-Certain facts from `current` into `prev`.
fn merge_certain_facts(prev: &[FileFacts], current: &[FileFacts]) -> Vec<FileFacts> {
    prev.iter()
        .zip(current)
        .map(|(p, c)| {
            let mut merged = p.clone();
            for (id, cur_decl) in &c.decls {
                match merged.decls.get_mut(id) {
                    None => {
                        merged.decls.insert(*id, cur_decl.clone());
                    }
                    Some(prev_decl) => {
                        merge_certain_slots(&mut prev_decl.binding, &cur_decl.binding);
                        for (p_slot, c_slot) in
                            prev_decl.params.iter_mut().zip(&cur_decl.params)
                        {
                            merge_certain_slots(p_slot, c_slot);
                        }
                        for (p_slot, c_slot) in
                            prev_decl.returns.iter_mut().zip(&cur_decl.returns)
                        {
                            merge_certain_slots(p_slot, c_slot);
                        }
                    }
                }
            }
            merged
        })
        .collect()
}

fn merge_certain_slots(prev: &mut SlotFacts, current: &SlotFacts) {
    let prev_certainty = prev.collapse().certainty;
    let cur = current.collapse();
    if cur.certainty == Certainty::Certain && prev_certainty < Certainty::Certain {
        *prev = current.clone();
    }
}

fn decl_slots(decl: &DeclFacts) -> impl Iterator<Item = &SlotFacts> {
    std::iter::once(&decl.binding)
        .chain(decl.params.iter())
        .chain(decl.returns.iter())
}

// ============================================================================
// Edits
// ============================================================================

/// Builds the edit list for one file from its merged declarations.
///
/// Only top-level declarations are annotated; nested helpers still feed
/// inference but their doc blocks are left alone.
fn build_edits(
    file: &ParsedFile,
    text: &str,
    facts: &FileFacts,
    ctx: &ProjectContext,
) -> Vec<SourceEdit> {
    let decls = collect_declarations(&file.chunk);
    let top_level: std::collections::HashSet<(u32, u32)> = file
        .chunk
        .stmts
        .iter()
        .map(|s| (s.span().start(), s.span().end()))
        .collect();

    let module = ctx.module(&file.path);
    let require_name = ctx.require_name(&file.path);

    let mut edits = Vec::new();
    for decl in &decls {
        let span_key = (decl.span().start(), decl.span().end());
        if !top_level.contains(&span_key) {
            continue;
        }
        let Some(decl_facts) = facts.decls.get(&decl.id) else {
            continue;
        };
        let is_module_table = module
            .and_then(|m| m.table_decl)
            .is_some_and(|id| id == decl.id);

        let Some(outcome) = merge_declaration(
            decl,
            decl_facts,
            require_name.as_deref(),
            is_module_table,
        ) else {
            continue;
        };
        if !outcome.changed || outcome.lines.is_empty() {
            continue;
        }

        let edit = match decl.doc() {
            Some(block) => {
                let indent = line_indent(text, block.span.start());
                SourceEdit::replace(block.span, outcome.lines.join(&format!("\n{indent}")))
            }
            None => {
                let at = decl.span().start();
                let indent = line_indent(text, at);
                let mut replacement = outcome.lines.join(&format!("\n{indent}"));
                replacement.push('\n');
                replacement.push_str(&indent);
                SourceEdit::insert(at, replacement)
            }
        };
        edits.push(edit);
    }

    edits.sort_by_key(|edit| edit.span.start());
    edits
}

/// The whitespace prefix of the line containing byte offset `at`, up to
/// `at` itself. Used to keep inserted lines at the declaration's
/// indentation.
fn line_indent(text: &str, at: u32) -> String {
    let at = at as usize;
    let line_start = text[..at].rfind('\n').map_or(0, |i| i + 1);
    let prefix = &text[line_start..at];
    if prefix.chars().all(char::is_whitespace) {
        prefix.to_string()
    } else {
        String::new()
    }
}

#[cfg(test)]
mod project_tests;
