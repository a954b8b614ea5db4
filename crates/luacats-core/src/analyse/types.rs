// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Lua type expressions.
//!
//! [`TypeExpr`] is the recursive type language shared by the annotation
//! model (parsed out of `---@param`/`---@return`/... payloads) and the
//! inference engine (synthesized from expressions). It covers the LuaCATS
//! surface the pipeline works with: named types, literal entries, unions,
//! arrays, `table<K, V>`, `fun(...)` signatures, and optionals (`T?`).
//!
//! Display renders LuaCATS syntax, so a parsed expression round-trips
//! textually (`string|nil` stays `string|nil`).

use ecow::EcoString;

/// A Lua type expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeExpr {
    /// A named type: `string`, `number`, `integer`, `MyModule.Thing`.
    Named(EcoString),

    /// A literal entry: `'left'`, `"utf8"`, `42`.
    Literal(EcoString),

    /// A union: `string|number`. Always at least two members; members are
    /// never themselves unions.
    Union(Vec<TypeExpr>),

    /// An array: `integer[]`.
    Array(Box<TypeExpr>),

    /// An optional: `string?` (sugar for `string|nil`).
    Optional(Box<TypeExpr>),

    /// A keyed table: `table<string, number>`.
    Table {
        /// The key type.
        key: Box<TypeExpr>,
        /// The value type.
        value: Box<TypeExpr>,
    },

    /// A function signature: `fun(a: string, b: integer): boolean`.
    Function {
        /// Parameters, each with an optional name.
        params: Vec<(Option<EcoString>, TypeExpr)>,
        /// Return types, possibly empty.
        returns: Vec<TypeExpr>,
    },

    /// No information. Renders as `any`.
    Unknown,
}

impl TypeExpr {
    /// Creates a named type.
    #[must_use]
    pub fn named(name: impl Into<EcoString>) -> Self {
        Self::Named(name.into())
    }

    /// The `nil` type.
    #[must_use]
    pub fn nil() -> Self {
        Self::named("nil")
    }

    /// Returns `true` if this is [`TypeExpr::Unknown`].
    #[must_use]
    pub const fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }

    /// Returns `true` if this type is `any` or unknown — i.e. carries no
    /// usable constraint.
    #[must_use]
    pub fn is_vacuous(&self) -> bool {
        match self {
            Self::Unknown => true,
            Self::Named(n) => n == "any",
            _ => false,
        }
    }

    /// Returns the union members of this type: the members for a union,
    /// the expansion for an optional, and the type itself otherwise.
    #[must_use]
    pub fn members(&self) -> Vec<TypeExpr> {
        match self {
            Self::Union(members) => members.clone(),
            Self::Optional(inner) => {
                let mut members = inner.members();
                members.push(Self::nil());
                members
            }
            other => vec![other.clone()],
        }
    }

    /// Returns `true` if `nil` is one of this type's members.
    #[must_use]
    pub fn includes_nil(&self) -> bool {
        self.members().iter().any(|m| *m == Self::nil())
    }

    /// Returns this type with `nil` removed from its members.
    #[must_use]
    pub fn without_nil(&self) -> TypeExpr {
        let members: Vec<_> = self
            .members()
            .into_iter()
            .filter(|m| *m != Self::nil())
            .collect();
        Self::from_members(members)
    }

    /// Returns `true` if every member of `self` is a member of `other`.
    #[must_use]
    pub fn is_subset_of(&self, other: &TypeExpr) -> bool {
        let theirs = other.members();
        self.members().iter().all(|m| theirs.contains(m))
    }

    /// Unions this type with another, flattening and deduplicating
    /// members while preserving first-seen order.
    #[must_use]
    pub fn union_with(&self, other: &TypeExpr) -> TypeExpr {
        if self.is_unknown() {
            return other.clone();
        }
        if other.is_unknown() {
            return self.clone();
        }
        let mut members = self.members();
        for m in other.members() {
            if !members.contains(&m) {
                members.push(m);
            }
        }
        Self::from_members(members)
    }

    /// Builds a type from a member list: `Unknown` for zero members, the
    /// sole member for one, a union otherwise.
    #[must_use]
    pub fn from_members(mut members: Vec<TypeExpr>) -> TypeExpr {
        members.dedup();
        match members.len() {
            0 => Self::Unknown,
            1 => members.pop().unwrap_or(Self::Unknown),
            _ => Self::Union(members),
        }
    }
}

impl std::fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Named(n) | Self::Literal(n) => write!(f, "{n}"),
            Self::Union(members) => {
                for (i, m) in members.iter().enumerate() {
                    if i > 0 {
                        write!(f, "|")?;
                    }
                    write!(f, "{m}")?;
                }
                Ok(())
            }
            Self::Array(inner) => write!(f, "{inner}[]"),
            Self::Optional(inner) => write!(f, "{inner}?"),
            Self::Table { key, value } => write!(f, "table<{key}, {value}>"),
            Self::Function { params, returns } => {
                write!(f, "fun(")?;
                for (i, (name, ty)) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    match name {
                        Some(name) => write!(f, "{name}: {ty}")?,
                        None => write!(f, "{ty}")?,
                    }
                }
                write!(f, ")")?;
                if !returns.is_empty() {
                    write!(f, ": ")?;
                    for (i, r) in returns.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{r}")?;
                    }
                }
                Ok(())
            }
            Self::Unknown => write!(f, "any"),
        }
    }
}

/// Parses a type expression from the start of `input`.
///
/// Returns the parsed type and the remaining text (with leading
/// whitespace trimmed). Returns `None` when `input` does not start with a
/// type expression; callers keep the raw line verbatim in that case.
#[must_use]
pub fn parse_type_expr(input: &str) -> Option<(TypeExpr, &str)> {
    let mut cursor = Cursor::new(input);
    let ty = cursor.union_type()?;
    Some((ty, cursor.rest()))
}

/// A small cursor over the textual type grammar.
struct Cursor<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(input: &'a str) -> Self {
        let mut cursor = Self { input, pos: 0 };
        cursor.skip_spaces();
        cursor
    }

    fn rest(&self) -> &'a str {
        self.input[self.pos..].trim_start()
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_spaces(&mut self) {
        while self.peek().is_some_and(|c| c == ' ' || c == '\t') {
            self.bump();
        }
    }

    fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn eat_str(&mut self, s: &str) -> bool {
        if self.input[self.pos..].starts_with(s) {
            self.pos += s.len();
            true
        } else {
            false
        }
    }

    /// `union := suffixed ('|' suffixed)*`
    fn union_type(&mut self) -> Option<TypeExpr> {
        let mut members = vec![self.suffixed_type()?];
        loop {
            self.skip_spaces();
            if !self.eat('|') {
                break;
            }
            self.skip_spaces();
            members.push(self.suffixed_type()?);
        }
        Some(TypeExpr::from_members(members))
    }

    /// `suffixed := primary ('?' | '[]')*`
    fn suffixed_type(&mut self) -> Option<TypeExpr> {
        let mut ty = self.primary_type()?;
        loop {
            if self.eat('?') {
                ty = TypeExpr::Optional(Box::new(ty));
            } else if self.input[self.pos..].starts_with("[]") {
                self.pos += 2;
                ty = TypeExpr::Array(Box::new(ty));
            } else {
                break;
            }
        }
        Some(ty)
    }

    fn primary_type(&mut self) -> Option<TypeExpr> {
        self.skip_spaces();
        match self.peek()? {
            '(' => {
                self.bump();
                let ty = self.union_type()?;
                self.skip_spaces();
                self.eat(')').then_some(ty)
            }
            '\'' | '"' => self.literal_string(),
            c if c.is_ascii_digit() => {
                let start = self.pos;
                while self.peek().is_some_and(|c| c.is_ascii_digit() || c == '.') {
                    self.bump();
                }
                Some(TypeExpr::Literal(EcoString::from(&self.input[start..self.pos])))
            }
            c if c.is_alphabetic() || c == '_' => self.named_type(),
            _ => None,
        }
    }

    fn literal_string(&mut self) -> Option<TypeExpr> {
        let start = self.pos;
        let quote = self.bump()?;
        loop {
            let c = self.bump()?;
            if c == quote {
                break;
            }
        }
        Some(TypeExpr::Literal(EcoString::from(
            &self.input[start..self.pos],
        )))
    }

    fn named_type(&mut self) -> Option<TypeExpr> {
        let name = self.dotted_name()?;
        if name == "fun" && self.peek() == Some('(') {
            return self.function_type();
        }
        if name == "table" && self.peek() == Some('<') {
            self.bump();
            let key = self.union_type()?;
            self.skip_spaces();
            if !self.eat(',') {
                return None;
            }
            let value = self.union_type()?;
            self.skip_spaces();
            if !self.eat('>') {
                return None;
            }
            return Some(TypeExpr::Table {
                key: Box::new(key),
                value: Box::new(value),
            });
        }
        Some(TypeExpr::Named(name))
    }

    fn dotted_name(&mut self) -> Option<EcoString> {
        let start = self.pos;
        if !self.peek().is_some_and(|c| c.is_alphabetic() || c == '_') {
            return None;
        }
        while self
            .peek()
            .is_some_and(|c| c.is_alphanumeric() || c == '_' || c == '.')
        {
            self.bump();
        }
        Some(EcoString::from(&self.input[start..self.pos]))
    }

    /// `fun(name: T, ...: T): R1, R2`
    fn function_type(&mut self) -> Option<TypeExpr> {
        if !self.eat('(') {
            return None;
        }
        let mut params = Vec::new();
        self.skip_spaces();
        if !self.eat(')') {
            loop {
                self.skip_spaces();
                let param = if self.eat_str("...") {
                    let ty = if self.eat(':') {
                        self.skip_spaces();
                        self.union_type()?
                    } else {
                        TypeExpr::Unknown
                    };
                    (Some(EcoString::from("...")), ty)
                } else {
                    // Either `name: type` or a bare type.
                    let checkpoint = self.pos;
                    match self.dotted_name() {
                        Some(name) if self.peek() == Some(':') => {
                            self.bump();
                            self.skip_spaces();
                            (Some(name), self.union_type()?)
                        }
                        _ => {
                            self.pos = checkpoint;
                            (None, self.union_type()?)
                        }
                    }
                };
                params.push(param);
                self.skip_spaces();
                if !self.eat(',') {
                    break;
                }
            }
            self.skip_spaces();
            if !self.eat(')') {
                return None;
            }
        }
        let mut returns = Vec::new();
        let checkpoint = self.pos;
        self.skip_spaces();
        if self.eat(':') {
            loop {
                self.skip_spaces();
                match self.union_type() {
                    Some(ty) => returns.push(ty),
                    None => {
                        self.pos = checkpoint;
                        returns.clear();
                        break;
                    }
                }
                self.skip_spaces();
                if !self.eat(',') {
                    break;
                }
            }
        } else {
            self.pos = checkpoint;
        }
        Some(TypeExpr::Function { params, returns })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> TypeExpr {
        parse_type_expr(input).expect("parse").0
    }

    #[test]
    fn parse_named_and_union() {
        assert_eq!(parse("string"), TypeExpr::named("string"));
        assert_eq!(
            parse("string|number"),
            TypeExpr::Union(vec![TypeExpr::named("string"), TypeExpr::named("number")])
        );
    }

    #[test]
    fn parse_suffixes() {
        assert_eq!(
            parse("integer[]"),
            TypeExpr::Array(Box::new(TypeExpr::named("integer")))
        );
        assert_eq!(
            parse("string?"),
            TypeExpr::Optional(Box::new(TypeExpr::named("string")))
        );
    }

    #[test]
    fn parse_table_and_fun() {
        assert_eq!(
            parse("table<string, number>"),
            TypeExpr::Table {
                key: Box::new(TypeExpr::named("string")),
                value: Box::new(TypeExpr::named("number")),
            }
        );
        let fun = parse("fun(a: string, b: integer): boolean");
        assert_eq!(
            fun,
            TypeExpr::Function {
                params: vec![
                    (Some("a".into()), TypeExpr::named("string")),
                    (Some("b".into()), TypeExpr::named("integer")),
                ],
                returns: vec![TypeExpr::named("boolean")],
            }
        );
    }

    #[test]
    fn parse_leaves_description() {
        let (ty, rest) = parse_type_expr("number The count of things").expect("parse");
        assert_eq!(ty, TypeExpr::named("number"));
        assert_eq!(rest, "The count of things");
    }

    #[test]
    fn display_round_trips() {
        for input in [
            "string",
            "string|number",
            "integer[]",
            "string?",
            "table<string, number>",
            "fun(a: string): boolean",
            "'left'|'right'",
        ] {
            assert_eq!(parse(input).to_string(), input);
        }
    }

    #[test]
    fn union_helpers() {
        let s = TypeExpr::named("string");
        let sn = s.union_with(&TypeExpr::nil());
        assert!(sn.includes_nil());
        assert_eq!(sn.without_nil(), s);
        assert!(s.is_subset_of(&sn));
        assert!(!sn.is_subset_of(&s));
    }

    #[test]
    fn unknown_is_union_identity() {
        let s = TypeExpr::named("string");
        assert_eq!(TypeExpr::Unknown.union_with(&s), s);
        assert_eq!(s.union_with(&TypeExpr::Unknown), s);
        assert_eq!(TypeExpr::Unknown.to_string(), "any");
    }
}
