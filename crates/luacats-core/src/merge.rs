// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Annotation merging.
//!
//! For each declaration the merger reconciles the engine's inferred facts
//! with whatever annotation block already exists, producing the final
//! block line-by-line:
//!
//! - Existing lines are never reordered, and their wording is only ever
//!   touched for a type correction.
//! - A contradiction backed by Certain inference replaces the line and
//!   demotes the old one into an adjacent block comment — never deletes.
//! - A contradiction backed only by Uncertain inference leaves the line
//!   alone and attaches an advisory TODO instead.
//! - An optional/union relationship (`string` vs `string|nil`) keeps the
//!   existing line and names the specific optionality observed.
//! - Missing `@param`/`@return` entries are appended for slots that have
//!   none; slots stuck at Unknown get `any` plus a TODO asking for a
//!   manual type and description.
//! - Parameter-name mismatches are advisory only; the existing line wins.
//!
//! Advisories and demotions are emitted as `--[[ ... ]]` block-comment
//! lines: those stay inside the attached doc block on a re-parse, which
//! is what makes the pipeline idempotent — a second run sees its own
//! advisories verbatim and adds nothing.

use ecow::EcoString;

use crate::analyse::certainty::{Certainty, SlotFacts};
use crate::analyse::types::TypeExpr;
use crate::analyse::DeclFacts;
use crate::annotations::{Annotation, AnnotationKind, ParamAnnotation, ReturnAnnotation};
use crate::ast::{Declaration, DocBlock, DocLineKind, Param};

/// The merged annotation block for one declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    /// The full new block, one entry per line, without indentation.
    pub lines: Vec<String>,
    /// Advisory texts added this run (also present in `lines`).
    pub advisories: Vec<String>,
    /// `true` when `lines` differs from the existing block.
    pub changed: bool,
}

/// Merges one declaration's existing annotations with its inferred facts.
///
/// Returns `None` when the declaration needs no annotation work: not a
/// function, not the module table, and carrying no annotations of its
/// own.
#[must_use]
pub fn merge_declaration(
    decl: &Declaration<'_>,
    facts: &DeclFacts,
    module_require_name: Option<&str>,
    is_module_table: bool,
) -> Option<MergeOutcome> {
    if let Some(body) = decl.function_body() {
        let mut merger = Merger::new(decl.doc());
        merger.merge_function(&body.params, facts, decl.is_method());
        return Some(merger.finish());
    }
    if is_module_table {
        return merge_module_table(decl.doc(), module_require_name);
    }
    let doc = decl.doc().filter(|doc| doc.has_annotations())?;
    let mut merger = Merger::new(Some(doc));
    merger.merge_binding(facts);
    Some(merger.finish())
}

/// The module table declaration gets a `---@module` header when it has
/// no annotations at all; an existing block is left untouched.
fn merge_module_table(
    existing: Option<&DocBlock>,
    require_name: Option<&str>,
) -> Option<MergeOutcome> {
    if existing.is_some() {
        return None;
    }
    let name = require_name?;
    Some(MergeOutcome {
        lines: vec![format!("---@module '{name}'")],
        advisories: Vec::new(),
        changed: true,
    })
}

/// How an existing annotation's type relates to the inferred slot.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Relation {
    /// Agreement, refinement, or nothing usable inferred: keep verbatim.
    Keep,
    /// Existing `any` against a Certain concrete type: correct in place.
    Improve(TypeExpr),
    /// Existing type is the inferred union minus `nil`.
    Optionality(TypeExpr),
    /// Contradiction backed by Certain inference.
    ConflictCertain(TypeExpr),
    /// Contradiction backed only by Uncertain inference.
    ConflictUncertain(TypeExpr),
}

/// Named types the engine can actually reason about. Anything else in an
/// existing annotation (alias and class names) is taken at face value.
const PRIMITIVES: &[&str] = &[
    "nil",
    "boolean",
    "number",
    "integer",
    "string",
    "table",
    "function",
    "thread",
    "userdata",
    "any",
    "unknown",
];

fn mentions_user_type(ty: &TypeExpr) -> bool {
    ty.members().iter().any(|member| match member {
        TypeExpr::Named(name) => !PRIMITIVES.contains(&name.as_str()),
        TypeExpr::Union(_) | TypeExpr::Optional(_) => mentions_user_type(member),
        _ => false,
    })
}

/// Loose member compatibility: `integer` corroborates `number`, and a
/// structural `fun(...)` corroborates `function`.
fn members_compatible(a: &TypeExpr, b: &TypeExpr) -> bool {
    if a == b {
        return true;
    }
    match (a, b) {
        (TypeExpr::Named(x), TypeExpr::Named(y)) => {
            matches!(
                (x.as_str(), y.as_str()),
                ("integer", "number") | ("number", "integer")
            )
        }
        (TypeExpr::Named(n), TypeExpr::Function { .. })
        | (TypeExpr::Function { .. }, TypeExpr::Named(n)) => n == "function",
        (TypeExpr::Named(n), TypeExpr::Table { .. })
        | (TypeExpr::Table { .. }, TypeExpr::Named(n))
        | (TypeExpr::Named(n), TypeExpr::Array(_))
        | (TypeExpr::Array(_), TypeExpr::Named(n)) => n == "table",
        _ => false,
    }
}

fn is_subset(a: &TypeExpr, b: &TypeExpr) -> bool {
    a.members()
        .iter()
        .all(|m| b.members().iter().any(|n| members_compatible(m, n)))
}

fn relate(existing: &TypeExpr, slot: &SlotFacts) -> Relation {
    if slot.is_empty() {
        return Relation::Keep;
    }
    let inferred = slot.collapse_observed();
    if inferred.type_expr.is_vacuous() || inferred.certainty == Certainty::Unknown {
        return Relation::Keep;
    }
    if existing.is_vacuous() {
        return if inferred.certainty == Certainty::Certain {
            Relation::Improve(inferred.type_expr)
        } else {
            Relation::Keep
        };
    }
    if mentions_user_type(existing) {
        return Relation::Keep;
    }
    if is_subset(existing, &inferred.type_expr) {
        let sans_nil = inferred.type_expr.without_nil();
        if inferred.type_expr.includes_nil()
            && is_subset(existing, &sans_nil)
            && is_subset(&sans_nil, existing)
        {
            return Relation::Optionality(inferred.type_expr);
        }
        // Existing is a (possibly strict) refinement: never downgrade.
        return Relation::Keep;
    }
    if is_subset(&inferred.type_expr, existing) {
        // Existing is broader than everything observed.
        return Relation::Keep;
    }
    match inferred.certainty {
        Certainty::Certain => Relation::ConflictCertain(inferred.type_expr),
        Certainty::Uncertain => Relation::ConflictUncertain(inferred.type_expr),
        Certainty::Unknown => Relation::Keep,
    }
}

struct Merger<'a> {
    existing: Option<&'a DocBlock>,
    lines: Vec<String>,
    advisories: Vec<String>,
}

impl<'a> Merger<'a> {
    fn new(existing: Option<&'a DocBlock>) -> Self {
        Self {
            existing,
            lines: Vec::new(),
            advisories: Vec::new(),
        }
    }

    fn finish(self) -> MergeOutcome {
        let changed = match self.existing {
            Some(block) => {
                block.lines.len() != self.lines.len()
                    || block
                        .lines
                        .iter()
                        .zip(&self.lines)
                        .any(|(old, new)| old.raw != new.as_str())
            }
            None => !self.lines.is_empty(),
        };
        MergeOutcome {
            lines: self.lines,
            advisories: self.advisories,
            changed,
        }
    }

    fn push_raw(&mut self, raw: &EcoString) {
        self.lines.push(raw.to_string());
    }

    /// Adds an advisory block-comment line unless the existing block
    /// already carries it verbatim (it will be re-emitted at its own
    /// position in that case).
    fn advise(&mut self, text: String) {
        let line = format!("--[[ {text} ]]");
        if self.existing.is_some_and(|block| block.contains_raw(&line))
            || self.lines.contains(&line)
        {
            return;
        }
        self.lines.push(line);
        self.advisories.push(text);
    }

    /// Demotes a superseded annotation into an adjacent block comment.
    fn demote(&mut self, raw: &EcoString) {
        if raw.contains("]]") {
            // The raw line cannot be embedded in a block comment.
            self.advise(format!("superseded annotation: {raw}"));
            return;
        }
        let line = format!("--[[ was: {raw} ]]");
        if !self.lines.contains(&line) {
            self.lines.push(line);
        }
    }

    // ------------------------------------------------------------------
    // Functions
    // ------------------------------------------------------------------

    fn merge_function(&mut self, params: &[Param], facts: &DeclFacts, is_method: bool) {
        let mut seen_params: Vec<EcoString> = Vec::new();
        let mut param_ordinal = 0usize;
        let mut return_ordinal = 0usize;

        let existing_lines: Vec<_> = self
            .existing
            .map(|block| block.lines.clone())
            .unwrap_or_default();

        let has_description = self.existing.is_some_and(DocBlock::has_description);
        let had_annotations = self.existing.is_some_and(DocBlock::has_annotations);
        if !has_description && !had_annotations {
            self.lines.push("--- TODO: Describe the function".to_string());
        }

        for line in &existing_lines {
            match &line.kind {
                DocLineKind::Annotation(annotation) => match &annotation.kind {
                    AnnotationKind::Param(param) => {
                        self.merge_param_line(
                            annotation,
                            param,
                            params,
                            facts,
                            is_method,
                            &mut seen_params,
                            &mut param_ordinal,
                        );
                    }
                    AnnotationKind::Return(ret) => {
                        self.merge_return_line(annotation, ret, facts, &mut return_ordinal);
                    }
                    _ => self.push_raw(&line.raw),
                },
                _ => self.push_raw(&line.raw),
            }
        }

        // Append entries for parameters that had none.
        for (index, param) in params.iter().enumerate() {
            if seen_params.contains(&param.name) {
                continue;
            }
            let slot = facts.params.get(index);
            let fact = slot.map(SlotFacts::collapse_observed);
            match fact {
                Some(fact) if !fact.type_expr.is_vacuous() => {
                    self.lines
                        .push(format!("---@param {} {}", param.name, fact.type_expr));
                    if let Some(top) = slot.and_then(SlotFacts::strongest_disagreement) {
                        let types: Vec<_> =
                            top.iter().map(|v| v.type_expr.to_string()).collect();
                        self.advise(format!(
                            "parameter '{}': equally likely types observed: {}",
                            param.name,
                            types.join(" vs ")
                        ));
                    }
                }
                _ => {
                    self.lines.push(format!("---@param {} any", param.name));
                    self.advise(format!(
                        "TODO: specify type and describe parameter '{}'",
                        param.name
                    ));
                }
            }
        }

        // Append entries for return slots that had none.
        if facts.returns_value {
            for (index, slot) in facts.returns.iter().enumerate() {
                if index < return_ordinal {
                    continue;
                }
                let fact = slot.collapse_observed();
                if fact.type_expr.is_vacuous() {
                    self.lines.push("---@return any".to_string());
                    self.advise("TODO: specify return type and describe".to_string());
                } else {
                    self.lines.push(format!("---@return {}", fact.type_expr));
                    if let Some(top) = slot.strongest_disagreement() {
                        let types: Vec<_> =
                            top.iter().map(|v| v.type_expr.to_string()).collect();
                        self.advise(format!(
                            "return value: equally likely types observed: {}",
                            types.join(" vs ")
                        ));
                    }
                }
            }
        }
    }

    #[allow(clippy::too_many_arguments, reason = "internal merge step")]
    fn merge_param_line(
        &mut self,
        annotation: &Annotation,
        param: &ParamAnnotation,
        params: &[Param],
        facts: &DeclFacts,
        is_method: bool,
        seen_params: &mut Vec<EcoString>,
        param_ordinal: &mut usize,
    ) {
        // `self` of a method and `...` have no declared parameter slot.
        if (param.name == "self" && is_method) || param.name == "..." {
            self.push_raw(&annotation.raw);
            return;
        }

        let position = *param_ordinal;
        *param_ordinal += 1;

        let Some(index) = params.iter().position(|p| p.name == param.name) else {
            // Name mismatch: the existing line wins, advisory only. The
            // positional slot is claimed so no duplicate entry is
            // appended for it.
            self.push_raw(&annotation.raw);
            match params.get(position) {
                Some(actual) => {
                    self.note_name_mismatch(&param.name, &actual.name);
                    seen_params.push(actual.name.clone());
                }
                None => {
                    self.advise(format!(
                        "annotation names parameter '{}' which is not in the signature",
                        param.name
                    ));
                }
            }
            return;
        };

        seen_params.push(params[index].name.clone());
        let Some(slot) = facts.params.get(index) else {
            self.push_raw(&annotation.raw);
            return;
        };

        match relate(&param.type_expr, slot) {
            Relation::Keep => self.push_raw(&annotation.raw),
            Relation::Improve(ty) => {
                self.lines.push(rebuild_param_line(annotation, param, &ty));
            }
            Relation::ConflictCertain(ty) => {
                self.lines.push(rebuild_param_line(annotation, param, &ty));
                self.demote(&annotation.raw);
            }
            Relation::ConflictUncertain(ty) => {
                self.push_raw(&annotation.raw);
                self.advise(format!(
                    "TODO: verify type of parameter '{}': inferred {}",
                    param.name, ty
                ));
            }
            Relation::Optionality(ty) => {
                self.push_raw(&annotation.raw);
                self.advise(format!(
                    "parameter '{}' may also be nil: call sites show {}",
                    param.name, ty
                ));
            }
        }
    }

    fn merge_return_line(
        &mut self,
        annotation: &Annotation,
        ret: &ReturnAnnotation,
        facts: &DeclFacts,
        return_ordinal: &mut usize,
    ) {
        let position = *return_ordinal;
        *return_ordinal += 1;

        let Some(slot) = facts.returns.get(position) else {
            self.push_raw(&annotation.raw);
            return;
        };

        match relate(&ret.type_expr, slot) {
            Relation::Keep => self.push_raw(&annotation.raw),
            Relation::Improve(ty) => {
                self.lines.push(rebuild_return_line(annotation, ret, &ty));
            }
            Relation::ConflictCertain(ty) => {
                self.lines.push(rebuild_return_line(annotation, ret, &ty));
                self.demote(&annotation.raw);
            }
            Relation::ConflictUncertain(ty) => {
                self.push_raw(&annotation.raw);
                self.advise(format!("TODO: verify return type: inferred {ty}"));
            }
            Relation::Optionality(ty) => {
                self.push_raw(&annotation.raw);
                self.advise(format!(
                    "return value may also be nil: inference shows {ty}"
                ));
            }
        }
    }

    fn note_name_mismatch(&mut self, annotated: &str, actual: &str) {
        self.advise(format!(
            "parameter name mismatch: annotation says '{annotated}', signature says '{actual}'"
        ));
    }

    // ------------------------------------------------------------------
    // Plain bindings
    // ------------------------------------------------------------------

    /// Merges a non-function declaration that carries annotations: only
    /// `@type` is checked against the inferred binding.
    fn merge_binding(&mut self, facts: &DeclFacts) {
        let existing_lines: Vec<_> = self
            .existing
            .map(|block| block.lines.clone())
            .unwrap_or_default();

        for line in &existing_lines {
            match &line.kind {
                DocLineKind::Annotation(annotation) => {
                    if let AnnotationKind::Type(ty) = &annotation.kind {
                        match relate(&ty.type_expr, &facts.binding) {
                            Relation::Keep => self.push_raw(&line.raw),
                            Relation::Improve(inferred) => {
                                self.lines.push(format!(
                                    "{} {}",
                                    annotation.prefix(),
                                    inferred
                                ));
                            }
                            Relation::ConflictCertain(inferred) => {
                                self.lines
                                    .push(format!("{} {}", annotation.prefix(), inferred));
                                self.demote(&annotation.raw);
                            }
                            Relation::ConflictUncertain(inferred) => {
                                self.push_raw(&line.raw);
                                self.advise(format!(
                                    "TODO: verify @type: inferred {inferred}"
                                ));
                            }
                            Relation::Optionality(inferred) => {
                                self.push_raw(&line.raw);
                                self.advise(format!(
                                    "value may also be nil: inference shows {inferred}"
                                ));
                            }
                        }
                    } else {
                        self.push_raw(&line.raw);
                    }
                }
                _ => self.push_raw(&line.raw),
            }
        }
    }
}

/// Rebuilds a `---@param` line with a corrected type, preserving the
/// original prefix, name, optional marker, and description.
fn rebuild_param_line(annotation: &Annotation, param: &ParamAnnotation, ty: &TypeExpr) -> String {
    let mut line = format!(
        "{} {}{} {}",
        annotation.prefix(),
        param.name,
        if param.optional { "?" } else { "" },
        ty
    );
    if let Some(desc) = &param.description {
        line.push(' ');
        line.push_str(desc);
    }
    line
}

/// Rebuilds a `---@return` line with a corrected type, preserving name
/// and description.
fn rebuild_return_line(annotation: &Annotation, ret: &ReturnAnnotation, ty: &TypeExpr) -> String {
    let mut line = format!("{} {}", annotation.prefix(), ty);
    if let Some(name) = &ret.name {
        line.push(' ');
        line.push_str(name);
    }
    if let Some(desc) = &ret.description {
        line.push_str(" # ");
        line.push_str(desc);
    }
    line
}
