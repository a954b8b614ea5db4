// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Abstract Syntax Tree (AST) definitions for Lua source files.
//!
//! The AST is built for annotation tooling, not for execution:
//!
//! - **All nodes have spans** — required for diagnostics and for the edit
//!   list handed to the renderer
//! - **Error recovery** — unparseable statements become [`Stmt::Opaque`]
//!   nodes carrying their raw text, so one broken statement never loses
//!   the rest of the file
//! - **Doc blocks attached** — every declaration-like node owns the
//!   contiguous comment block found immediately above it, split into
//!   free-text description lines and parsed annotations
//! - **Control flow is flattened** — `if`/`while`/`for`/`repeat`/`do`
//!   bodies are generic [`Stmt::Block`] nodes; the pipeline only needs to
//!   reach every nested `return`, not to evaluate conditions

use ecow::EcoString;

use crate::annotations::Annotation;
use crate::source_analysis::Span;

/// Top-level container for a parsed Lua file.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    /// The statements in this file.
    pub stmts: Vec<Stmt>,
    /// Source location spanning the entire file.
    pub span: Span,
}

/// A Lua statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// A local declaration: `local a, b = 1, f()` (also `local function f`
    /// after desugaring — see [`FunctionDecl::is_local`]).
    Local(LocalDecl),

    /// An assignment: `M.x = 1`, `a, b = f()`.
    Assign(Assignment),

    /// A function declaration in any named form.
    Function(FunctionDecl),

    /// A return statement.
    Return(ReturnStmt),

    /// A function call in statement position.
    Call(CallStmt),

    /// A control-flow construct with its bodies flattened.
    Block(BlockStmt),

    /// An unparseable statement, kept verbatim for recovery.
    Opaque(OpaqueStmt),
}

impl Stmt {
    /// Returns the span of this statement.
    #[must_use]
    pub fn span(&self) -> Span {
        match self {
            Self::Local(s) => s.span,
            Self::Assign(s) => s.span,
            Self::Function(s) => s.span,
            Self::Return(s) => s.span,
            Self::Call(s) => s.span,
            Self::Block(s) => s.span,
            Self::Opaque(s) => s.span,
        }
    }

    /// Returns the doc block attached to this statement, if it is a
    /// declaration-like statement and one was attached.
    #[must_use]
    pub fn doc(&self) -> Option<&DocBlock> {
        match self {
            Self::Local(s) => s.doc.as_ref(),
            Self::Assign(s) => s.doc.as_ref(),
            Self::Function(s) => s.doc.as_ref(),
            _ => None,
        }
    }
}

/// `local a, b = expr, expr`
#[derive(Debug, Clone, PartialEq)]
pub struct LocalDecl {
    /// The declared names.
    pub names: Vec<Identifier>,
    /// The initializer expressions (possibly fewer than names).
    pub exprs: Vec<Expr>,
    /// The doc block found immediately above, if any.
    pub doc: Option<DocBlock>,
    /// Source location of the whole statement.
    pub span: Span,
}

/// `target, target = expr, expr`
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    /// Assignment targets (identifiers or index chains).
    pub targets: Vec<Expr>,
    /// The assigned expressions.
    pub exprs: Vec<Expr>,
    /// The doc block found immediately above, if any.
    pub doc: Option<DocBlock>,
    /// Source location of the whole statement.
    pub span: Span,
}

/// A named function declaration: `function f`, `function t.f`,
/// `function t:m`, `local function f`.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    /// The declared name.
    pub name: FunctionName,
    /// Parameters and body.
    pub body: FunctionBody,
    /// The doc block found immediately above, if any.
    pub doc: Option<DocBlock>,
    /// `true` for `local function f`.
    pub is_local: bool,
    /// Source location of the whole statement.
    pub span: Span,
}

/// The name of a declared function: a base identifier, a dotted path, and
/// whether the final segment uses method syntax (`t:m`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionName {
    /// The base identifier: `t` in `function t.a.b()`.
    pub base: EcoString,
    /// Path segments after the base, in order.
    pub path: Vec<EcoString>,
    /// `true` if the last segment is attached with `:`.
    pub is_method: bool,
    /// Source location of the name.
    pub span: Span,
}

impl FunctionName {
    /// Returns the full name as written: `t.a:b`.
    #[must_use]
    pub fn full_name(&self) -> EcoString {
        let mut out = EcoString::from(self.base.as_str());
        for (i, seg) in self.path.iter().enumerate() {
            let last = i + 1 == self.path.len();
            out.push(if last && self.is_method { ':' } else { '.' });
            out.push_str(seg);
        }
        out
    }

    /// Returns the final name segment: `b` in `function t.a.b()`.
    #[must_use]
    pub fn last_segment(&self) -> &EcoString {
        self.path.last().unwrap_or(&self.base)
    }
}

/// Parameters and body shared by named and anonymous functions.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionBody {
    /// Declared parameters, excluding any implicit `self`.
    pub params: Vec<Param>,
    /// `true` if the parameter list ends with `...`.
    pub is_vararg: bool,
    /// The statements of the body.
    pub body: Vec<Stmt>,
    /// Source location from `function` to `end`.
    pub span: Span,
}

/// A declared parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    /// The parameter name.
    pub name: EcoString,
    /// Source location of the name.
    pub span: Span,
}

/// An identifier with its location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identifier {
    /// The identifier text.
    pub name: EcoString,
    /// Source location.
    pub span: Span,
}

/// `return expr, expr`
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnStmt {
    /// Returned expressions; empty for a bare `return`.
    pub exprs: Vec<Expr>,
    /// Source location.
    pub span: Span,
}

/// A call in statement position.
#[derive(Debug, Clone, PartialEq)]
pub struct CallStmt {
    /// The call expression.
    pub call: Expr,
    /// Source location.
    pub span: Span,
}

/// The construct a [`BlockStmt`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    /// `do ... end`
    Do,
    /// `if ... then ... end` (all branch bodies flattened together)
    If,
    /// `while ... do ... end`
    While,
    /// `repeat ... until ...`
    RepeatUntil,
    /// `for i = a, b do ... end`
    ForNumeric,
    /// `for k, v in ... do ... end`
    ForGeneric,
}

/// A control-flow construct, kept only for its nested statements.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockStmt {
    /// Which construct this came from.
    pub kind: BlockKind,
    /// The nested statements of all bodies.
    pub body: Vec<Stmt>,
    /// Source location of the whole construct.
    pub span: Span,
}

/// An unparseable statement, preserved verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpaqueStmt {
    /// The raw source text of the statement.
    pub text: EcoString,
    /// Source location.
    pub span: Span,
}

/// A Lua expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A literal value.
    Literal(Literal, Span),

    /// A variable reference.
    Identifier(Identifier),

    /// An index access: `a.b` or `a[expr]`.
    Index {
        /// The indexed expression.
        base: Box<Expr>,
        /// The key.
        key: IndexKey,
        /// Source location.
        span: Span,
    },

    /// A binary operation.
    Binary {
        /// The operator.
        op: BinaryOp,
        /// Left operand.
        lhs: Box<Expr>,
        /// Right operand.
        rhs: Box<Expr>,
        /// Source location.
        span: Span,
    },

    /// A unary operation.
    Unary {
        /// The operator.
        op: UnaryOp,
        /// The operand.
        operand: Box<Expr>,
        /// Source location.
        span: Span,
    },

    /// A call: `f(x)`, `t.f(x)`, `t:m(x)`.
    Call {
        /// The called expression (the receiver for method calls).
        callee: Box<Expr>,
        /// The method name for `t:m(...)` calls.
        method: Option<EcoString>,
        /// The arguments.
        args: Vec<Expr>,
        /// Source location.
        span: Span,
    },

    /// An anonymous function expression.
    Function(FunctionBody),

    /// A table constructor.
    Table(TableConstructor),

    /// The vararg expression `...`.
    Vararg(Span),

    /// A parenthesized expression.
    Paren {
        /// The inner expression.
        inner: Box<Expr>,
        /// Source location including parentheses.
        span: Span,
    },

    /// An error node for unparseable sub-expressions.
    Error {
        /// What went wrong.
        message: EcoString,
        /// Source location.
        span: Span,
    },
}

impl Expr {
    /// Returns the span of this expression.
    #[must_use]
    pub fn span(&self) -> Span {
        match self {
            Self::Literal(_, span)
            | Self::Index { span, .. }
            | Self::Binary { span, .. }
            | Self::Unary { span, .. }
            | Self::Call { span, .. }
            | Self::Paren { span, .. }
            | Self::Error { span, .. }
            | Self::Vararg(span) => *span,
            Self::Identifier(id) => id.span,
            Self::Function(body) => body.span,
            Self::Table(table) => table.span,
        }
    }

    /// Returns the dotted path of an identifier or name-keyed index
    /// chain: `a.b.c`. Returns `None` for anything else.
    #[must_use]
    pub fn dotted_path(&self) -> Option<EcoString> {
        match self {
            Self::Identifier(id) => Some(id.name.clone()),
            Self::Index { base, key, .. } => {
                let IndexKey::Name(name) = key else {
                    return None;
                };
                let mut path = base.dotted_path()?;
                path.push('.');
                path.push_str(name);
                Some(path)
            }
            _ => None,
        }
    }

    /// Returns the anonymous function body if this expression is one.
    #[must_use]
    pub fn as_function(&self) -> Option<&FunctionBody> {
        match self {
            Self::Function(body) => Some(body),
            Self::Paren { inner, .. } => inner.as_function(),
            _ => None,
        }
    }
}

/// An index key: `a.name` or `a[expr]`.
#[derive(Debug, Clone, PartialEq)]
pub enum IndexKey {
    /// A static name key.
    Name(EcoString),
    /// A computed key.
    Expr(Box<Expr>),
}

/// A literal value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    /// `nil`
    Nil,
    /// `true`
    True,
    /// `false`
    False,
    /// A number literal, raw text.
    Number(EcoString),
    /// A string literal, raw text including quotes or long brackets.
    String(EcoString),
}

impl Literal {
    /// Returns the unquoted content of a string literal, if this is one.
    #[must_use]
    pub fn string_value(&self) -> Option<&str> {
        let Self::String(raw) = self else {
            return None;
        };
        let s = raw.as_str();
        if let Some(stripped) = s
            .strip_prefix('"')
            .and_then(|s| s.strip_suffix('"'))
            .or_else(|| s.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')))
        {
            return Some(stripped);
        }
        // Long string: strip [=*[ and ]=*]
        let open_end = s.find('[')? + 1;
        let level = s[open_end..].bytes().take_while(|&b| b == b'=').count();
        s.get(open_end + level + 1..s.len().checked_sub(level + 2)?)
    }
}

/// A binary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `//`
    FloorDiv,
    /// `%`
    Mod,
    /// `^`
    Pow,
    /// `..`
    Concat,
    /// `==`
    Eq,
    /// `~=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `and`
    And,
    /// `or`
    Or,
    /// `&`
    BitAnd,
    /// `|`
    BitOr,
    /// `~`
    BitXor,
    /// `<<`
    Shl,
    /// `>>`
    Shr,
}

/// The result category of a binary operator, used by inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOpCategory {
    /// Arithmetic: numeric result, numeric-leaning operands.
    Arithmetic,
    /// `..`: string result, string-or-number operands.
    Concat,
    /// Comparisons and equality: boolean result.
    Comparison,
    /// `and`/`or`: result drawn from the operands.
    Logical,
    /// Bitwise: integer result.
    Bitwise,
}

impl BinaryOp {
    /// Parses an operator token text.
    #[must_use]
    pub fn from_token(op: &str) -> Option<Self> {
        Some(match op {
            "+" => Self::Add,
            "-" => Self::Sub,
            "*" => Self::Mul,
            "/" => Self::Div,
            "//" => Self::FloorDiv,
            "%" => Self::Mod,
            "^" => Self::Pow,
            ".." => Self::Concat,
            "==" => Self::Eq,
            "~=" => Self::Ne,
            "<" => Self::Lt,
            "<=" => Self::Le,
            ">" => Self::Gt,
            ">=" => Self::Ge,
            "and" => Self::And,
            "or" => Self::Or,
            "&" => Self::BitAnd,
            "|" => Self::BitOr,
            "~" => Self::BitXor,
            "<<" => Self::Shl,
            ">>" => Self::Shr,
            _ => return None,
        })
    }

    /// Returns the operator's result category.
    #[must_use]
    pub const fn category(self) -> BinaryOpCategory {
        match self {
            Self::Add | Self::Sub | Self::Mul | Self::Div | Self::FloorDiv | Self::Mod
            | Self::Pow => BinaryOpCategory::Arithmetic,
            Self::Concat => BinaryOpCategory::Concat,
            Self::Eq | Self::Ne | Self::Lt | Self::Le | Self::Gt | Self::Ge => {
                BinaryOpCategory::Comparison
            }
            Self::And | Self::Or => BinaryOpCategory::Logical,
            Self::BitAnd | Self::BitOr | Self::BitXor | Self::Shl | Self::Shr => {
                BinaryOpCategory::Bitwise
            }
        }
    }
}

/// A unary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// `-`
    Neg,
    /// `not`
    Not,
    /// `#`
    Len,
    /// `~`
    BitNot,
}

/// A table constructor: `{ a = 1, 2, ["k"] = v }`.
#[derive(Debug, Clone, PartialEq)]
pub struct TableConstructor {
    /// The fields in source order.
    pub fields: Vec<TableField>,
    /// Source location including braces.
    pub span: Span,
}

/// One field of a table constructor.
#[derive(Debug, Clone, PartialEq)]
pub struct TableField {
    /// The static name key, when the field is `name = value`.
    pub key: Option<EcoString>,
    /// The field value.
    pub value: Expr,
    /// Source location.
    pub span: Span,
}

// ============================================================================
// Doc blocks
// ============================================================================

/// The comment block attached immediately above a declaration.
///
/// Lines appear in source order and are never reordered. Each line keeps
/// its raw text verbatim, prefix included.
#[derive(Debug, Clone, PartialEq)]
pub struct DocBlock {
    /// The lines of the block, in order.
    pub lines: Vec<DocLine>,
    /// Source location from the first line's first byte to the last
    /// line's last byte.
    pub span: Span,
}

impl DocBlock {
    /// Returns the parsed annotations in this block, in order.
    pub fn annotations(&self) -> impl Iterator<Item = &Annotation> {
        self.lines.iter().filter_map(|line| match &line.kind {
            DocLineKind::Annotation(ann) => Some(ann),
            _ => None,
        })
    }

    /// Returns `true` if the block contains at least one free-text
    /// description line.
    #[must_use]
    pub fn has_description(&self) -> bool {
        self.lines
            .iter()
            .any(|line| matches!(line.kind, DocLineKind::Description))
    }

    /// Returns `true` if the block contains at least one annotation.
    #[must_use]
    pub fn has_annotations(&self) -> bool {
        self.annotations().next().is_some()
    }

    /// Returns `true` if a line with exactly this raw text exists.
    #[must_use]
    pub fn contains_raw(&self, raw: &str) -> bool {
        self.lines.iter().any(|line| line.raw == raw)
    }
}

/// One line of a doc block.
#[derive(Debug, Clone, PartialEq)]
pub struct DocLine {
    /// The raw source text of the line's comment token, verbatim.
    pub raw: EcoString,
    /// Source location of the comment token.
    pub span: Span,
    /// What the line is.
    pub kind: DocLineKind,
}

/// Classification of a doc block line.
#[derive(Debug, Clone, PartialEq)]
pub enum DocLineKind {
    /// A free-text `---` description line.
    Description,
    /// An `---@tag` annotation line, parsed (possibly as Opaque).
    Annotation(Annotation),
    /// An `---|` alias entry line; its parse lives in the entries of the
    /// preceding alias annotation.
    AliasEntry,
    /// A block comment line: advisory notes and demoted annotations pass
    /// through here verbatim.
    Aux,
}

// ============================================================================
// Declaration collection
// ============================================================================

/// A stable identifier for a declaration within one file.
///
/// Ids are indices into the pre-order walk of [`collect_declarations`],
/// so they are identical across repeated walks of the same AST.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeclId(pub u32);

/// A view of one declaration-like statement.
#[derive(Debug, Clone, Copy)]
pub struct Declaration<'a> {
    /// The declaration's id.
    pub id: DeclId,
    /// The statement.
    pub stmt: &'a Stmt,
}

impl<'a> Declaration<'a> {
    /// Returns the attached doc block, if any.
    #[must_use]
    pub fn doc(&self) -> Option<&'a DocBlock> {
        self.stmt.doc()
    }

    /// Returns the statement span.
    #[must_use]
    pub fn span(&self) -> Span {
        self.stmt.span()
    }

    /// Returns the function body declared by this statement, if any:
    /// a named function declaration, or the first anonymous function
    /// bound by a local/assignment.
    #[must_use]
    pub fn function_body(&self) -> Option<&'a FunctionBody> {
        match self.stmt {
            Stmt::Function(decl) => Some(&decl.body),
            Stmt::Local(decl) => decl.exprs.iter().find_map(Expr::as_function),
            Stmt::Assign(assign) => assign.exprs.iter().find_map(Expr::as_function),
            _ => None,
        }
    }

    /// Returns `true` if the declared function uses method syntax.
    #[must_use]
    pub fn is_method(&self) -> bool {
        matches!(self.stmt, Stmt::Function(decl) if decl.name.is_method)
    }

    /// Returns the declared name: the function name, the first local
    /// name, or the first assignment target's dotted path.
    #[must_use]
    pub fn name(&self) -> Option<EcoString> {
        match self.stmt {
            Stmt::Function(decl) => Some(decl.name.full_name()),
            Stmt::Local(decl) => decl.names.first().map(|id| id.name.clone()),
            Stmt::Assign(assign) => assign.targets.first().and_then(Expr::dotted_path),
            _ => None,
        }
    }
}

/// Collects every declaration-like statement in the chunk, in a stable
/// pre-order walk (statement before its nested bodies).
#[must_use]
pub fn collect_declarations(chunk: &Chunk) -> Vec<Declaration<'_>> {
    let mut decls = Vec::new();
    collect_in_stmts(&chunk.stmts, &mut decls);
    decls
}

fn collect_in_stmts<'a>(stmts: &'a [Stmt], decls: &mut Vec<Declaration<'a>>) {
    for stmt in stmts {
        match stmt {
            Stmt::Local(_) | Stmt::Assign(_) | Stmt::Function(_) => {
                let id = DeclId(u32::try_from(decls.len()).unwrap_or(u32::MAX));
                decls.push(Declaration { id, stmt });
            }
            _ => {}
        }
        // Recurse into nested function bodies and blocks.
        match stmt {
            Stmt::Function(decl) => collect_in_stmts(&decl.body.body, decls),
            Stmt::Local(decl) => {
                for body in decl.exprs.iter().filter_map(Expr::as_function) {
                    collect_in_stmts(&body.body, decls);
                }
            }
            Stmt::Assign(assign) => {
                for body in assign.exprs.iter().filter_map(Expr::as_function) {
                    collect_in_stmts(&body.body, decls);
                }
            }
            Stmt::Block(block) => collect_in_stmts(&block.body, decls),
            _ => {}
        }
    }
}
