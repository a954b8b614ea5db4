// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! The annotation model: typed representations of LuaCATS doc comments.
//!
//! Every recognized annotation kind keeps its full source line verbatim in
//! [`Annotation::raw`] — the `---@tag` prefix is never stripped, and
//! re-emitting an untouched annotation reproduces its exact bytes.
//! Unknown or malformed tags become [`AnnotationKind::Opaque`] and pass
//! through unchanged; they are flagged with a diagnostic, never dropped.
//!
//! An [`AliasAnnotation`] additionally owns its `---|` entry lines. An
//! entry line is absorbed only while it immediately follows the alias
//! header or a prior entry line.

mod parse;

pub use parse::{parse_annotation, parse_alias_entry};

use ecow::EcoString;

use crate::analyse::types::TypeExpr;
use crate::source_analysis::Span;

/// A parsed annotation line.
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    /// The whole source line of the annotation, verbatim.
    pub raw: EcoString,
    /// Source location of the line's comment token.
    pub span: Span,
    /// The parsed payload.
    pub kind: AnnotationKind,
}

impl Annotation {
    /// Returns the `@tag` name of this annotation (without `@`), parsed
    /// from the raw text: `"param"` for `---@param x number`.
    #[must_use]
    pub fn tag(&self) -> Option<&str> {
        let after = self.raw.strip_prefix("---@")?;
        let end = after
            .find(|c: char| !c.is_alphanumeric() && c != '-' && c != '_')
            .unwrap_or(after.len());
        (end > 0).then(|| &after[..end])
    }

    /// Returns the prefix of this annotation up to and including its tag:
    /// `"---@param"`.
    #[must_use]
    pub fn prefix(&self) -> &str {
        self.tag()
            .map_or("---", |tag| &self.raw[..4 + tag.len()])
    }
}

/// The recognized annotation kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum AnnotationKind {
    /// `---@alias Name [type]`, optionally followed by `---|` entries.
    Alias(AliasAnnotation),
    /// `---@param name[?] type [description]`
    Param(ParamAnnotation),
    /// `---@return type [name] [description]`
    Return(ReturnAnnotation),
    /// `---@class [(exact)] Name[: Parent, ...]`
    Class(ClassAnnotation),
    /// `---@field [visibility] name[?] type [description]`
    Field(FieldAnnotation),
    /// `---@type type`
    Type(TypeAnnotation),
    /// `---@generic T [, U...]` — kept as raw content.
    Generic {
        /// The generic parameter list text.
        content: EcoString,
    },
    /// `---@operator op[(signature)]: type`
    Operator {
        /// The metamethod name: `add`, `call`, ...
        operator: EcoString,
        /// Everything after the operator name, verbatim.
        signature: Option<EcoString>,
    },
    /// `---@overload fun(...)`
    Overload {
        /// The overload signature.
        signature: TypeExpr,
    },
    /// `---@enum [(key)] Name`
    Enum {
        /// The enum name.
        name: EcoString,
        /// `true` for `(key)` enums.
        is_key: bool,
    },
    /// `---@cast var [+|-]type[, ...]`
    Cast {
        /// The cast variable.
        variable: EcoString,
        /// The cast operations in order.
        casts: Vec<CastEntry>,
    },
    /// `---@diagnostic action[: codes]`
    Diagnostic {
        /// The action: `disable`, `disable-next-line`, ...
        action: EcoString,
        /// The diagnostic codes, verbatim.
        codes: Option<EcoString>,
    },
    /// `---@deprecated`
    Deprecated,
    /// `---@nodiscard`
    Nodiscard,
    /// `---@async`
    Async,
    /// `---@vararg [type]` (legacy spelling of `@param ...`)
    Vararg {
        /// The vararg element type.
        type_expr: Option<TypeExpr>,
    },
    /// `---@version [constraint]`
    Version {
        /// The version constraint, verbatim: `>5.2, JIT`.
        constraint: EcoString,
    },
    /// `---@see reference`
    See {
        /// The reference text.
        reference: EcoString,
    },
    /// `---@source path`
    Source {
        /// The source location text.
        path: EcoString,
    },
    /// `---@module 'name'`
    Module {
        /// The module name, quotes stripped.
        name: EcoString,
    },
    /// `---@meta [name]`
    Meta {
        /// The meta name, if given.
        name: Option<EcoString>,
    },
    /// `---@as type`
    As {
        /// The asserted type.
        type_expr: TypeExpr,
    },
    /// `---@private` / `---@protected` / `---@package` / `---@public`
    Visibility(Visibility),
    /// An unknown or malformed annotation, preserved verbatim.
    Opaque {
        /// The tag name, when one could be read.
        tag: Option<EcoString>,
    },
}

/// `---@param` payload.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamAnnotation {
    /// The parameter name (`...` for varargs).
    pub name: EcoString,
    /// `true` when the name carries a trailing `?`.
    pub optional: bool,
    /// The declared type.
    pub type_expr: TypeExpr,
    /// Trailing description text.
    pub description: Option<EcoString>,
}

/// `---@return` payload.
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnAnnotation {
    /// The declared type.
    pub type_expr: TypeExpr,
    /// An optional value name.
    pub name: Option<EcoString>,
    /// Trailing description text.
    pub description: Option<EcoString>,
}

/// `---@class` payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassAnnotation {
    /// The class name.
    pub name: EcoString,
    /// Parent class names.
    pub parents: Vec<EcoString>,
    /// `true` for `(exact)` classes.
    pub exact: bool,
}

/// `---@field` payload.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldAnnotation {
    /// Field visibility, when given.
    pub visibility: Option<Visibility>,
    /// The field name.
    pub name: EcoString,
    /// `true` when the name carries a trailing `?`.
    pub optional: bool,
    /// The declared type.
    pub type_expr: TypeExpr,
    /// Trailing description text.
    pub description: Option<EcoString>,
}

/// `---@type` payload.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeAnnotation {
    /// The declared type.
    pub type_expr: TypeExpr,
}

/// `---@alias` payload, owning its `---|` entry lines.
#[derive(Debug, Clone, PartialEq)]
pub struct AliasAnnotation {
    /// The alias name.
    pub name: EcoString,
    /// The inline type, for single-line aliases.
    pub type_expr: Option<TypeExpr>,
    /// The entry lines, in order.
    pub entries: Vec<AliasEntry>,
}

/// One `---| 'value' # description` entry of an alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasEntry {
    /// The whole source line of the entry, verbatim.
    pub raw: EcoString,
    /// Source location of the line's comment token.
    pub span: Span,
    /// The entry value text (quotes kept as written).
    pub value: EcoString,
    /// The `#` description, if present.
    pub description: Option<EcoString>,
}

/// One operation of an `---@cast`.
#[derive(Debug, Clone, PartialEq)]
pub struct CastEntry {
    /// `+` adds the type, `-` removes it, none replaces.
    pub op: Option<CastOp>,
    /// The cast type.
    pub type_expr: TypeExpr,
}

/// The `+`/`-` of a cast entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastOp {
    /// `+type`
    Add,
    /// `-type`
    Remove,
}

/// Member visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// `public`
    Public,
    /// `private`
    Private,
    /// `protected`
    Protected,
    /// `package`
    Package,
}

impl Visibility {
    /// Parses a visibility word.
    #[must_use]
    pub fn from_word(word: &str) -> Option<Self> {
        match word {
            "public" => Some(Self::Public),
            "private" => Some(Self::Private),
            "protected" => Some(Self::Protected),
            "package" => Some(Self::Package),
            _ => None,
        }
    }
}
