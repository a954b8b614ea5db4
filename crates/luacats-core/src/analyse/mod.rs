// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Type inference for Lua declarations.
//!
//! The engine walks a file's AST bottom-up and assigns a type plus a
//! certainty grade to every binding, parameter, and return slot:
//!
//! - Literals are Certain.
//! - Existing annotations seed slots at Uncertain — they may be stale.
//! - Operator results join their operand certainties with
//!   [`Certainty::join`].
//! - A function with no value-carrying `return` is recorded as returning
//!   nothing, never as returning `nil`.
//! - Call results come from the external [`Catalogue`] first (Certain by
//!   construction), then from project-local declarations — same-file
//!   facts from the current pass, cross-file facts through the
//!   [`ProjectContext`] snapshot of the previous pass.
//!
//! Parameters have no declared types in Lua, so the engine leans on
//! usage: a parameter that flows through `+` leans numeric, one that is
//! concatenated leans string, one that is indexed leans table — all at
//! Uncertain, since coercion keeps Lua operators ambiguous.
//!
//! Independent possibilities accumulate as [`Variant`]s per slot and
//! collapse into union types.

pub mod catalogue;
pub mod certainty;
pub mod scope;
pub mod types;

pub use catalogue::{Catalogue, CatalogueEntry, LuaVersion};
pub use certainty::{Certainty, SlotFacts, TypeFact, Variant, VariantQualifier};

use std::collections::{BTreeMap, HashMap};

use camino::Utf8Path;
use ecow::EcoString;
use tracing::trace;

use crate::annotations::AnnotationKind;
use crate::ast::{
    BinaryOp, BinaryOpCategory, Chunk, DeclId, DocBlock, Expr, FunctionBody, Literal, Stmt,
    UnaryOp,
};
use crate::project::ProjectContext;

use scope::Scope;
use types::TypeExpr;

/// The inferred facts for one declaration.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DeclFacts {
    /// The declaration's own binding.
    pub binding: SlotFacts,
    /// One slot per declared parameter (implicit `self` excluded).
    pub params: Vec<SlotFacts>,
    /// One slot per return position.
    pub returns: Vec<SlotFacts>,
    /// `false` when no `return` with a value exists in the body —
    /// recorded explicitly rather than inferring `nil`.
    pub returns_value: bool,
}

/// The inferred facts for every declaration of one file, keyed by the
/// stable pre-order [`DeclId`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FileFacts {
    /// Facts per declaration.
    pub decls: BTreeMap<DeclId, DeclFacts>,
}

/// Infers facts for every declaration in the chunk.
///
/// Reads cross-file knowledge from `ctx` (the previous pass's snapshot)
/// and host-API knowledge from `catalogue`; never mutates either.
#[must_use]
pub fn infer_file(
    chunk: &Chunk,
    file: &Utf8Path,
    catalogue: &Catalogue,
    ctx: &ProjectContext,
) -> FileFacts {
    let mut engine = InferenceEngine {
        catalogue,
        ctx,
        file,
        module_name: ctx.module_local_name(file).cloned(),
        local_facts: HashMap::new(),
        facts: FileFacts::default(),
        counter: 0,
    };
    let mut scope = Scope::new();
    engine.walk_stmts(&chunk.stmts, &mut scope);
    trace!(file = %file, decls = engine.facts.decls.len(), "inferred file facts");
    engine.facts
}

struct InferenceEngine<'a> {
    catalogue: &'a Catalogue,
    ctx: &'a ProjectContext,
    file: &'a Utf8Path,
    /// The local identifier bound to this file's module table, if any.
    module_name: Option<EcoString>,
    /// Facts computed so far this pass, keyed by declared name with
    /// method colons normalized to dots (`M:f` → `M.f`).
    local_facts: HashMap<EcoString, DeclFacts>,
    facts: FileFacts,
    counter: u32,
}

impl InferenceEngine<'_> {
    /// Walks statements in the same pre-order as
    /// [`crate::ast::collect_declarations`], so [`DeclId`]s line up.
    fn walk_stmts(&mut self, stmts: &[Stmt], scope: &mut Scope) {
        for stmt in stmts {
            match stmt {
                Stmt::Local(decl) => {
                    let id = self.next_id();
                    let facts = self.infer_local(decl, scope);
                    self.record(id, decl.names.first().map(|n| n.name.clone()), facts);
                    for body in decl.exprs.iter().filter_map(Expr::as_function) {
                        self.walk_nested(body, scope);
                    }
                }
                Stmt::Assign(assign) => {
                    let id = self.next_id();
                    let facts = self.infer_assignment(assign, scope);
                    let name = assign.targets.first().and_then(Expr::dotted_path);
                    self.record(id, name, facts);
                    for body in assign.exprs.iter().filter_map(Expr::as_function) {
                        self.walk_nested(body, scope);
                    }
                }
                Stmt::Function(decl) => {
                    let id = self.next_id();
                    let facts =
                        self.infer_function(&decl.body, decl.doc.as_ref(), scope);
                    if decl.is_local {
                        scope.define(decl.name.base.clone(), facts.binding.collapse());
                    }
                    let mut name = decl.name.full_name();
                    if decl.name.is_method {
                        name = EcoString::from(name.replace(":", "."));
                    }
                    self.record(id, Some(name), facts);
                    self.walk_nested(&decl.body, scope);
                }
                Stmt::Block(block) => {
                    scope.push();
                    self.walk_stmts(&block.body, scope);
                    scope.pop();
                }
                _ => {}
            }
        }
    }

    /// Recurses into a nested function body for declaration collection
    /// only; its returns belong to itself.
    fn walk_nested(&mut self, body: &FunctionBody, scope: &mut Scope) {
        scope.push();
        for param in &body.params {
            scope.define(param.name.clone(), TypeFact::unknown());
        }
        self.walk_stmts(&body.body, scope);
        scope.pop();
    }

    fn next_id(&mut self) -> DeclId {
        let id = DeclId(self.counter);
        self.counter += 1;
        id
    }

    fn record(&mut self, id: DeclId, name: Option<EcoString>, facts: DeclFacts) {
        if let Some(name) = name {
            self.local_facts.insert(name, facts.clone());
        }
        self.facts.decls.insert(id, facts);
    }

    // ------------------------------------------------------------------
    // Declarations
    // ------------------------------------------------------------------

    fn infer_local(&mut self, decl: &crate::ast::LocalDecl, scope: &mut Scope) -> DeclFacts {
        // `local name = function(...) ... end` carries function facts.
        if let Some(body) = decl.exprs.iter().find_map(Expr::as_function) {
            let facts = self.infer_function(body, decl.doc.as_ref(), scope);
            if let Some(name) = decl.names.first() {
                scope.define(name.name.clone(), facts.binding.collapse());
            }
            return facts;
        }

        let mut binding = SlotFacts::new();
        if let Some(doc) = &decl.doc {
            if let Some(seed) = type_annotation_seed(doc) {
                binding.add_seed(seed);
            }
        }
        // `local m = require("...")` binds the required module's table.
        let first_fact = match decl.exprs.first() {
            Some(expr) if require_target(expr).is_some() => {
                TypeFact::certain(TypeExpr::named("table"))
            }
            Some(expr) => self.infer_expr(expr, scope),
            None => TypeFact::unknown(),
        };
        binding.add(first_fact.clone());

        for (index, name) in decl.names.iter().enumerate() {
            let fact = match index {
                0 => first_fact.clone(),
                _ => decl
                    .exprs
                    .get(index)
                    .map_or_else(TypeFact::unknown, |e| self.infer_expr(e, scope)),
            };
            scope.define(name.name.clone(), fact);
        }

        DeclFacts {
            binding,
            ..DeclFacts::default()
        }
    }

    fn infer_assignment(&mut self, assign: &crate::ast::Assignment, scope: &mut Scope) -> DeclFacts {
        if let Some(body) = assign.exprs.iter().find_map(Expr::as_function) {
            return self.infer_function(body, assign.doc.as_ref(), scope);
        }
        let mut binding = SlotFacts::new();
        if let Some(doc) = &assign.doc {
            if let Some(seed) = type_annotation_seed(doc) {
                binding.add_seed(seed);
            }
        }
        let fact = assign
            .exprs
            .first()
            .map_or_else(TypeFact::unknown, |e| self.infer_expr(e, scope));
        binding.add(fact);
        DeclFacts {
            binding,
            ..DeclFacts::default()
        }
    }

    // ------------------------------------------------------------------
    // Functions
    // ------------------------------------------------------------------

    fn infer_function(
        &mut self,
        body: &FunctionBody,
        doc: Option<&DocBlock>,
        scope: &mut Scope,
    ) -> DeclFacts {
        let mut params: Vec<SlotFacts> = vec![SlotFacts::new(); body.params.len()];

        // Seed from existing annotations, at Uncertain: they may be stale.
        if let Some(doc) = doc {
            for annotation in doc.annotations() {
                if let AnnotationKind::Param(param) = &annotation.kind {
                    if let Some(slot) = body
                        .params
                        .iter()
                        .position(|p| p.name == param.name)
                        .and_then(|i| params.get_mut(i))
                    {
                        if !param.type_expr.is_vacuous() {
                            slot.add_seed(TypeFact::uncertain(param.type_expr.clone()));
                        }
                    }
                }
            }
        }

        // Lean on usage before looking at returns, so `return a + b` sees
        // the numeric leaning of `a` and `b`.
        self.lean_params_in_stmts(&body.body, body, &mut params);

        scope.push();
        for (param, slot) in body.params.iter().zip(&params) {
            scope.define(param.name.clone(), slot.collapse());
        }

        let mut returns: Vec<SlotFacts> = Vec::new();
        let mut returns_value = false;
        if let Some(doc) = doc {
            for annotation in doc.annotations() {
                if let AnnotationKind::Return(ret) = &annotation.kind {
                    let mut slot = SlotFacts::new();
                    if !ret.type_expr.is_vacuous() {
                        slot.add_seed(TypeFact::uncertain(ret.type_expr.clone()));
                    }
                    returns.push(slot);
                }
            }
        }
        self.collect_returns(&body.body, scope, &mut returns, &mut returns_value);
        scope.pop();

        if !returns_value {
            // No value-carrying return: explicitly "no return value".
            returns.clear();
        }

        let binding = SlotFacts::from_fact(TypeFact::certain(TypeExpr::Function {
            params: body
                .params
                .iter()
                .zip(&params)
                .map(|(p, slot)| (Some(p.name.clone()), slot.collapse().type_expr))
                .collect(),
            returns: returns.iter().map(|s| s.collapse().type_expr).collect(),
        }));

        DeclFacts {
            binding,
            params,
            returns,
            returns_value,
        }
    }

    /// Walks the function's own statements (descending into control-flow
    /// blocks but not nested functions) and accumulates return slots.
    fn collect_returns(
        &mut self,
        stmts: &[Stmt],
        scope: &mut Scope,
        returns: &mut Vec<SlotFacts>,
        returns_value: &mut bool,
    ) {
        for stmt in stmts {
            match stmt {
                Stmt::Return(ret) => {
                    if ret.exprs.is_empty() {
                        continue;
                    }
                    *returns_value = true;
                    let mut slot_facts = Vec::new();
                    for (index, expr) in ret.exprs.iter().enumerate() {
                        let last = index + 1 == ret.exprs.len();
                        if last {
                            // The final expression spreads all of a
                            // call's return slots.
                            slot_facts.extend(self.infer_expr_multi(expr, scope));
                        } else {
                            slot_facts.push(self.infer_expr(expr, scope));
                        }
                    }
                    for (index, fact) in slot_facts.into_iter().enumerate() {
                        if returns.len() <= index {
                            returns.push(SlotFacts::new());
                        }
                        returns[index].add(fact);
                    }
                }
                Stmt::Local(decl) => {
                    for (index, name) in decl.names.iter().enumerate() {
                        let fact = decl
                            .exprs
                            .get(index)
                            .map_or_else(TypeFact::unknown, |e| self.infer_expr(e, scope));
                        scope.define(name.name.clone(), fact);
                    }
                }
                Stmt::Function(decl) if decl.is_local => {
                    scope.define(
                        decl.name.base.clone(),
                        TypeFact::certain(TypeExpr::named("function")),
                    );
                }
                Stmt::Block(block) => {
                    scope.push();
                    self.collect_returns(&block.body, scope, returns, returns_value);
                    scope.pop();
                }
                _ => {}
            }
        }
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    /// Infers the single-slot fact for an expression.
    fn infer_expr(&mut self, expr: &Expr, scope: &Scope) -> TypeFact {
        match expr {
            Expr::Literal(literal, _) => literal_fact(literal),
            Expr::Identifier(id) => scope
                .lookup(&id.name)
                .cloned()
                .unwrap_or_else(TypeFact::unknown),
            Expr::Paren { inner, .. } => self.infer_expr(inner, scope),
            Expr::Unary { op, operand, .. } => {
                let operand = self.infer_expr(operand, scope);
                let ty = match op {
                    UnaryOp::Neg => TypeExpr::named("number"),
                    UnaryOp::Not => TypeExpr::named("boolean"),
                    UnaryOp::Len => TypeExpr::named("integer"),
                    UnaryOp::BitNot => TypeExpr::named("integer"),
                };
                TypeFact::new(ty, operand.certainty)
            }
            Expr::Binary { op, lhs, rhs, .. } => {
                let lhs = self.infer_expr(lhs, scope);
                let rhs = self.infer_expr(rhs, scope);
                let certainty = lhs.certainty.join(rhs.certainty);
                let ty = match op.category() {
                    BinaryOpCategory::Arithmetic => TypeExpr::named("number"),
                    BinaryOpCategory::Concat => TypeExpr::named("string"),
                    BinaryOpCategory::Comparison => TypeExpr::named("boolean"),
                    BinaryOpCategory::Bitwise => TypeExpr::named("integer"),
                    BinaryOpCategory::Logical => lhs.type_expr.union_with(&rhs.type_expr),
                };
                TypeFact::new(ty, certainty)
            }
            Expr::Call { .. } => self
                .infer_expr_multi(expr, scope)
                .into_iter()
                .next()
                .unwrap_or_else(TypeFact::unknown),
            Expr::Function(_) => TypeFact::certain(TypeExpr::named("function")),
            Expr::Table(_) => TypeFact::certain(TypeExpr::named("table")),
            Expr::Index { .. } => {
                // A value symbol like `math.pi` resolves via catalogue.
                if let Some(symbol) = expr.dotted_path() {
                    if let Some(entry) = self.catalogue.lookup(&symbol) {
                        if let Some(ty) = entry.returns.first() {
                            return TypeFact::certain(ty.clone());
                        }
                    }
                }
                TypeFact::unknown()
            }
            Expr::Vararg(_) | Expr::Error { .. } => TypeFact::unknown(),
        }
    }

    /// Infers all result slots of an expression: calls can produce
    /// several, everything else exactly one.
    fn infer_expr_multi(&mut self, expr: &Expr, scope: &Scope) -> Vec<TypeFact> {
        let Expr::Call { callee, method, .. } = expr else {
            return vec![self.infer_expr(expr, scope)];
        };

        // `require("...")` yields the module table.
        if require_target(expr).is_some() {
            return vec![TypeFact::certain(TypeExpr::named("table"))];
        }

        let Some(symbol) = call_symbol(callee, method.as_ref()) else {
            return vec![TypeFact::unknown()];
        };

        // External catalogue first: Certain by construction.
        if let Some(entry) = self.catalogue.lookup(&symbol) {
            if entry.returns.is_empty() {
                return Vec::new();
            }
            return entry
                .returns
                .iter()
                .map(|ty| TypeFact::certain(ty.clone()))
                .collect();
        }
        // Unlisted members of a catalogue namespace stay unknown rather
        // than falling through to project inference.
        if self.catalogue.covers_namespace(&symbol) {
            return vec![TypeFact::unknown()];
        }

        // Project-local: current pass facts by declared name.
        if let Some(facts) = self.local_facts.get(symbol.as_str()) {
            return propagate_returns(facts);
        }

        // Own module member, from the previous pass (forward reference).
        if let Some((root, member)) = symbol.split_once('.') {
            if self.module_name.as_deref() == Some(root) {
                if let Some(facts) = self.ctx.member_facts(self.file, member) {
                    return propagate_returns(facts);
                }
            }
            // Cross-file: a require alias of another module.
            if let Some(target) = self.ctx.alias_target(self.file, root) {
                if let Some(facts) = self.ctx.member_facts(target, member) {
                    return propagate_returns(facts);
                }
            }
        }

        vec![TypeFact::unknown()]
    }

    // ------------------------------------------------------------------
    // Parameter leaning
    // ------------------------------------------------------------------

    fn lean_params_in_stmts(
        &self,
        stmts: &[Stmt],
        body: &FunctionBody,
        params: &mut [SlotFacts],
    ) {
        for stmt in stmts {
            match stmt {
                Stmt::Local(decl) => {
                    for expr in &decl.exprs {
                        self.lean_params_in_expr(expr, body, params);
                    }
                }
                Stmt::Assign(assign) => {
                    for expr in assign.targets.iter().chain(&assign.exprs) {
                        self.lean_params_in_expr(expr, body, params);
                    }
                }
                Stmt::Function(decl) => {
                    self.lean_params_in_stmts(&decl.body.body, body, params);
                }
                Stmt::Return(ret) => {
                    for expr in &ret.exprs {
                        self.lean_params_in_expr(expr, body, params);
                    }
                }
                Stmt::Call(call) => {
                    self.lean_params_in_expr(&call.call, body, params);
                }
                Stmt::Block(block) => {
                    self.lean_params_in_stmts(&block.body, body, params);
                }
                Stmt::Opaque(_) => {}
            }
        }
    }

    fn lean_params_in_expr(
        &self,
        expr: &Expr,
        body: &FunctionBody,
        params: &mut [SlotFacts],
    ) {
        let param_index = |name: &str| body.params.iter().position(|p| p.name == name);
        let as_param = |expr: &Expr| match expr {
            Expr::Identifier(id) => param_index(&id.name),
            _ => None,
        };

        match expr {
            Expr::Binary { op, lhs, rhs, .. } => {
                let lean = match op.category() {
                    BinaryOpCategory::Arithmetic => Some(TypeExpr::named("number")),
                    BinaryOpCategory::Concat => Some(TypeExpr::named("string")),
                    BinaryOpCategory::Bitwise => Some(TypeExpr::named("integer")),
                    BinaryOpCategory::Comparison | BinaryOpCategory::Logical => None,
                };
                if let Some(lean) = lean {
                    for side in [lhs.as_ref(), rhs.as_ref()] {
                        if let Some(index) = as_param(side) {
                            params[index].add(TypeFact::uncertain(lean.clone()));
                        }
                    }
                }
                // An ordered comparison against a literal pins the
                // literal's type.
                if matches!(op, BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge) {
                    for (side, other) in [(lhs.as_ref(), rhs.as_ref()), (rhs.as_ref(), lhs.as_ref())]
                    {
                        if let (Some(index), Expr::Literal(literal, _)) = (as_param(side), other) {
                            let fact = literal_fact(literal);
                            params[index].add(TypeFact::uncertain(fact.type_expr));
                        }
                    }
                }
                self.lean_params_in_expr(lhs, body, params);
                self.lean_params_in_expr(rhs, body, params);
            }
            Expr::Unary { op, operand, .. } => {
                if let Some(index) = as_param(operand) {
                    let lean = match op {
                        UnaryOp::Neg => Some(TypeExpr::named("number")),
                        UnaryOp::Len => Some(TypeExpr::Union(vec![
                            TypeExpr::named("table"),
                            TypeExpr::named("string"),
                        ])),
                        UnaryOp::BitNot => Some(TypeExpr::named("integer")),
                        UnaryOp::Not => None,
                    };
                    if let Some(lean) = lean {
                        params[index].add(TypeFact::uncertain(lean));
                    }
                }
                self.lean_params_in_expr(operand, body, params);
            }
            Expr::Index { base, key, .. } => {
                if let Some(index) = as_param(base) {
                    params[index].add(TypeFact::uncertain(TypeExpr::named("table")));
                }
                self.lean_params_in_expr(base, body, params);
                if let crate::ast::IndexKey::Expr(key) = key {
                    self.lean_params_in_expr(key, body, params);
                }
            }
            Expr::Call {
                callee,
                method,
                args,
                ..
            } => {
                if let Some(index) = as_param(callee) {
                    params[index].add(TypeFact::uncertain(TypeExpr::named("function")));
                }
                // A parameter passed to a catalogue function adopts the
                // declared parameter type at Uncertain.
                if let Some(symbol) = call_symbol(callee, method.as_ref()) {
                    if let Some(entry) = self.catalogue.lookup(&symbol) {
                        for (position, arg) in args.iter().enumerate() {
                            if let (Some(index), Some(ty)) =
                                (as_param(arg), entry.params.get(position))
                            {
                                if !ty.is_vacuous() {
                                    params[index].add(TypeFact::uncertain(ty.clone()));
                                }
                            }
                        }
                    }
                }
                self.lean_params_in_expr(callee, body, params);
                for arg in args {
                    self.lean_params_in_expr(arg, body, params);
                }
            }
            Expr::Paren { inner, .. } => self.lean_params_in_expr(inner, body, params),
            Expr::Function(nested) => {
                self.lean_params_in_stmts(&nested.body, body, params);
            }
            Expr::Table(table) => {
                for field in &table.fields {
                    self.lean_params_in_expr(&field.value, body, params);
                }
            }
            _ => {}
        }
    }
}

/// The fact for a literal expression: always Certain.
fn literal_fact(literal: &Literal) -> TypeFact {
    let ty = match literal {
        Literal::Nil => TypeExpr::nil(),
        Literal::True | Literal::False => TypeExpr::named("boolean"),
        Literal::Number(_) => TypeExpr::named("number"),
        Literal::String(_) => TypeExpr::named("string"),
    };
    TypeFact::certain(ty)
}

/// Propagates a callee's return facts to the call site, joining each
/// fact's certainty with the call-site certainty (Certain for a direct
/// name resolution).
fn propagate_returns(facts: &DeclFacts) -> Vec<TypeFact> {
    if !facts.returns_value {
        return Vec::new();
    }
    facts
        .returns
        .iter()
        .map(|slot| {
            let fact = slot.collapse();
            TypeFact::new(fact.type_expr, fact.certainty.join(Certainty::Certain))
        })
        .collect()
}

/// The dotted symbol a call resolves through: `t.a.f` for `t.a.f(x)`,
/// `t.m` for `t:m(x)`.
fn call_symbol(callee: &Expr, method: Option<&EcoString>) -> Option<EcoString> {
    let mut symbol = callee.dotted_path()?;
    if let Some(method) = method {
        symbol.push('.');
        symbol.push_str(method);
    }
    Some(symbol)
}

/// If the expression is `require("name")`, returns the module name.
#[must_use]
pub fn require_target(expr: &Expr) -> Option<EcoString> {
    let Expr::Call {
        callee,
        method: None,
        args,
        ..
    } = expr
    else {
        return None;
    };
    if callee.dotted_path()? != "require" {
        return None;
    }
    let Some(Expr::Literal(literal, _)) = args.first() else {
        return None;
    };
    literal.string_value().map(EcoString::from)
}

/// The Uncertain seed from an `---@type` annotation on a binding.
fn type_annotation_seed(doc: &DocBlock) -> Option<TypeFact> {
    doc.annotations().find_map(|annotation| {
        let AnnotationKind::Type(ty) = &annotation.kind else {
            return None;
        };
        (!ty.type_expr.is_vacuous()).then(|| TypeFact::uncertain(ty.type_expr.clone()))
    })
}

#[cfg(test)]
mod engine_tests;
