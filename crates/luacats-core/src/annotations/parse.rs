// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Tolerant parsing of annotation lines.
//!
//! One line in, one [`Annotation`] out — always. A malformed payload for
//! a known tag keeps the line verbatim as [`AnnotationKind::Opaque`] and
//! returns a diagnostic alongside; an unknown tag is preserved as Opaque
//! without complaint. Nothing is ever dropped.

use ecow::EcoString;

use crate::analyse::types::parse_type_expr;
#[cfg(test)]
use crate::analyse::types::TypeExpr;
use crate::source_analysis::parser::Diagnostic;
use crate::source_analysis::Span;

use super::{
    AliasAnnotation, AliasEntry, Annotation, AnnotationKind, CastEntry, CastOp, ClassAnnotation,
    FieldAnnotation, ParamAnnotation, ReturnAnnotation, TypeAnnotation, Visibility,
};

/// Parses one `---@tag ...` line into an [`Annotation`].
///
/// Never fails: malformed known tags come back as Opaque plus a
/// diagnostic, unknown tags as Opaque alone. The raw line is retained
/// verbatim either way.
#[must_use]
pub fn parse_annotation(raw: &str, span: Span) -> (Annotation, Option<Diagnostic>) {
    let annotation = |kind| Annotation {
        raw: EcoString::from(raw),
        span,
        kind,
    };

    let Some(tag) = read_tag(raw) else {
        return (annotation(AnnotationKind::Opaque { tag: None }), None);
    };
    let rest = raw[4 + tag.len()..].trim_start();

    let parsed = match tag {
        "alias" => parse_alias(rest),
        "param" => parse_param(rest),
        "return" => parse_return(rest),
        "class" => parse_class(rest),
        "field" => parse_field(rest),
        "type" => parse_type(rest),
        "generic" => non_empty(rest).map(|content| AnnotationKind::Generic { content }),
        "operator" => parse_operator(rest),
        "overload" => parse_type_expr(rest)
            .map(|(signature, _)| AnnotationKind::Overload { signature }),
        "enum" => parse_enum(rest),
        "cast" => parse_cast(rest),
        "diagnostic" => parse_diagnostic(rest),
        "deprecated" => Some(AnnotationKind::Deprecated),
        "nodiscard" => Some(AnnotationKind::Nodiscard),
        "async" => Some(AnnotationKind::Async),
        "vararg" => Some(AnnotationKind::Vararg {
            type_expr: parse_type_expr(rest).map(|(ty, _)| ty),
        }),
        "version" => Some(AnnotationKind::Version {
            constraint: EcoString::from(rest.trim()),
        }),
        "see" => non_empty(rest).map(|reference| AnnotationKind::See { reference }),
        "source" => non_empty(rest).map(|path| AnnotationKind::Source { path }),
        "module" => parse_module(rest),
        "meta" => Some(AnnotationKind::Meta {
            name: word(rest).map(|(w, _)| EcoString::from(w)),
        }),
        "as" => parse_type_expr(rest).map(|(type_expr, _)| AnnotationKind::As { type_expr }),
        "private" => Some(AnnotationKind::Visibility(Visibility::Private)),
        "protected" => Some(AnnotationKind::Visibility(Visibility::Protected)),
        "package" => Some(AnnotationKind::Visibility(Visibility::Package)),
        _ => {
            // Unknown tag: preserved verbatim, no complaint.
            return (
                annotation(AnnotationKind::Opaque {
                    tag: Some(EcoString::from(tag)),
                }),
                None,
            );
        }
    };

    match parsed {
        Some(kind) => (annotation(kind), None),
        None => {
            let diagnostic = Diagnostic::warning(
                format!("malformed @{tag} annotation kept verbatim"),
                span,
            );
            (
                annotation(AnnotationKind::Opaque {
                    tag: Some(EcoString::from(tag)),
                }),
                Some(diagnostic),
            )
        }
    }
}

/// Parses one `---| 'value' # description` alias entry line.
#[must_use]
pub fn parse_alias_entry(raw: &str, span: Span) -> AliasEntry {
    let rest = raw.strip_prefix("---|").unwrap_or(raw).trim_start();
    let (value, description) = match rest.split_once('#') {
        Some((value, desc)) => (value.trim(), non_empty(desc)),
        None => (rest.trim(), None),
    };
    AliasEntry {
        raw: EcoString::from(raw),
        span,
        value: EcoString::from(value),
        description,
    }
}

/// Reads the tag name after `---@`.
fn read_tag(raw: &str) -> Option<&str> {
    let after = raw.strip_prefix("---@")?;
    let end = after
        .find(|c: char| !c.is_alphanumeric() && c != '-' && c != '_')
        .unwrap_or(after.len());
    (end > 0).then(|| &after[..end])
}

/// Splits the first whitespace-delimited word off `input`.
fn word(input: &str) -> Option<(&str, &str)> {
    let input = input.trim_start();
    if input.is_empty() {
        return None;
    }
    match input.split_once(char::is_whitespace) {
        Some((w, rest)) => Some((w, rest.trim_start())),
        None => Some((input, "")),
    }
}

/// Returns trimmed text as an owned string when non-empty.
fn non_empty(input: &str) -> Option<EcoString> {
    let trimmed = input.trim();
    (!trimmed.is_empty()).then(|| EcoString::from(trimmed))
}

/// Returns `true` if `name` is a plausible identifier or `...`.
fn is_name(name: &str) -> bool {
    name == "..."
        || name
            .chars()
            .next()
            .is_some_and(|c| c.is_alphabetic() || c == '_')
}

fn parse_param(rest: &str) -> Option<AnnotationKind> {
    let (name_word, rest) = word(rest)?;
    let (name, optional) = match name_word.strip_suffix('?') {
        Some(name) => (name, true),
        None => (name_word, false),
    };
    if !is_name(name) {
        return None;
    }
    let (type_expr, rest) = parse_type_expr(rest)?;
    Some(AnnotationKind::Param(ParamAnnotation {
        name: EcoString::from(name),
        optional,
        type_expr,
        description: non_empty(rest),
    }))
}

fn parse_return(rest: &str) -> Option<AnnotationKind> {
    let (type_expr, rest) = parse_type_expr(rest)?;
    // `---@return type [name] [# comment]`: a lone trailing word is the
    // value name; anything longer without a `#` separator is prose.
    let (name, description) = match rest.split_once('#') {
        Some((name_part, desc)) => (
            word(name_part).map(|(w, _)| EcoString::from(w)),
            non_empty(desc),
        ),
        None => match word(rest) {
            Some((w, "")) if is_name(w) => (Some(EcoString::from(w)), None),
            _ => (None, non_empty(rest)),
        },
    };
    Some(AnnotationKind::Return(ReturnAnnotation {
        type_expr,
        name,
        description,
    }))
}

fn parse_class(rest: &str) -> Option<AnnotationKind> {
    let (exact, rest) = match rest.strip_prefix("(exact)") {
        Some(rest) => (true, rest.trim_start()),
        None => (false, rest),
    };
    let (name, rest) = word(rest)?;
    let (name, inline_parents) = match name.split_once(':') {
        Some((name, parents)) => (name, Some(parents)),
        None => (name, None),
    };
    if !is_name(name) {
        return None;
    }
    let parent_text = match inline_parents {
        Some(p) if !p.is_empty() => {
            let mut text = EcoString::from(p);
            if !rest.is_empty() {
                text.push(' ');
                text.push_str(rest);
            }
            Some(text)
        }
        Some(_) => Some(EcoString::from(rest)),
        None => rest.strip_prefix(':').map(EcoString::from),
    };
    let parents = parent_text
        .as_deref()
        .unwrap_or("")
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(EcoString::from)
        .collect();
    Some(AnnotationKind::Class(ClassAnnotation {
        name: EcoString::from(name),
        parents,
        exact,
    }))
}

fn parse_field(rest: &str) -> Option<AnnotationKind> {
    let (first, after_first) = word(rest)?;
    let (visibility, name_word, rest) = match Visibility::from_word(first) {
        Some(vis) => {
            let (name, rest) = word(after_first)?;
            (Some(vis), name, rest)
        }
        None => (None, first, after_first),
    };
    let (name, optional) = match name_word.strip_suffix('?') {
        Some(name) => (name, true),
        None => (name_word, false),
    };
    if !is_name(name) {
        return None;
    }
    let (type_expr, rest) = parse_type_expr(rest)?;
    Some(AnnotationKind::Field(FieldAnnotation {
        visibility,
        name: EcoString::from(name),
        optional,
        type_expr,
        description: non_empty(rest),
    }))
}

fn parse_type(rest: &str) -> Option<AnnotationKind> {
    let (type_expr, _) = parse_type_expr(rest)?;
    Some(AnnotationKind::Type(TypeAnnotation { type_expr }))
}

fn parse_alias(rest: &str) -> Option<AnnotationKind> {
    let (name, rest) = word(rest)?;
    if !is_name(name) {
        return None;
    }
    let type_expr = if rest.is_empty() {
        None
    } else {
        Some(parse_type_expr(rest)?.0)
    };
    Some(AnnotationKind::Alias(AliasAnnotation {
        name: EcoString::from(name),
        type_expr,
        entries: Vec::new(),
    }))
}

fn parse_operator(rest: &str) -> Option<AnnotationKind> {
    let end = rest
        .find(|c: char| !c.is_alphanumeric() && c != '_')
        .unwrap_or(rest.len());
    if end == 0 {
        return None;
    }
    let operator = EcoString::from(&rest[..end]);
    let signature = non_empty(&rest[end..]);
    Some(AnnotationKind::Operator {
        operator,
        signature,
    })
}

fn parse_enum(rest: &str) -> Option<AnnotationKind> {
    let (is_key, rest) = match rest.strip_prefix("(key)") {
        Some(rest) => (true, rest.trim_start()),
        None => (false, rest),
    };
    let (name, _) = word(rest)?;
    is_name(name).then(|| AnnotationKind::Enum {
        name: EcoString::from(name),
        is_key,
    })
}

fn parse_cast(rest: &str) -> Option<AnnotationKind> {
    let (variable, rest) = word(rest)?;
    if !is_name(variable) {
        return None;
    }
    let mut casts = Vec::new();
    for part in rest.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let (op, type_text) = match part.strip_prefix('+') {
            Some(t) => (Some(CastOp::Add), t),
            None => match part.strip_prefix('-') {
                Some(t) => (Some(CastOp::Remove), t),
                None => (None, part),
            },
        };
        let (type_expr, _) = parse_type_expr(type_text)?;
        casts.push(CastEntry { op, type_expr });
    }
    if casts.is_empty() {
        return None;
    }
    Some(AnnotationKind::Cast {
        variable: EcoString::from(variable),
        casts,
    })
}

fn parse_diagnostic(rest: &str) -> Option<AnnotationKind> {
    let (action_part, codes) = match rest.split_once(':') {
        Some((action, codes)) => (action, non_empty(codes)),
        None => (rest, None),
    };
    let action = non_empty(action_part)?;
    Some(AnnotationKind::Diagnostic { action, codes })
}

fn parse_module(rest: &str) -> Option<AnnotationKind> {
    let (name, _) = word(rest)?;
    let name = name
        .strip_prefix(['\'', '"'])
        .and_then(|n| n.strip_suffix(['\'', '"']))
        .unwrap_or(name);
    (!name.is_empty()).then(|| AnnotationKind::Module {
        name: EcoString::from(name),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> (Annotation, Option<Diagnostic>) {
        parse_annotation(raw, Span::default())
    }

    fn kind(raw: &str) -> AnnotationKind {
        parse(raw).0.kind
    }

    #[test]
    fn param_with_type_and_description() {
        let AnnotationKind::Param(param) = kind("---@param count number how many") else {
            panic!("expected param");
        };
        assert_eq!(param.name, "count");
        assert!(!param.optional);
        assert_eq!(param.type_expr, TypeExpr::named("number"));
        assert_eq!(param.description.as_deref(), Some("how many"));
    }

    #[test]
    fn optional_param() {
        let AnnotationKind::Param(param) = kind("---@param sep? string") else {
            panic!("expected param");
        };
        assert_eq!(param.name, "sep");
        assert!(param.optional);
    }

    #[test]
    fn vararg_param() {
        let AnnotationKind::Param(param) = kind("---@param ... any") else {
            panic!("expected param");
        };
        assert_eq!(param.name, "...");
    }

    #[test]
    fn return_with_name_and_comment() {
        let AnnotationKind::Return(ret) = kind("---@return boolean ok # whether it worked")
        else {
            panic!("expected return");
        };
        assert_eq!(ret.type_expr, TypeExpr::named("boolean"));
        assert_eq!(ret.name.as_deref(), Some("ok"));
        assert_eq!(ret.description.as_deref(), Some("whether it worked"));
    }

    #[test]
    fn return_with_prose_description() {
        let AnnotationKind::Return(ret) = kind("---@return number the count of items") else {
            panic!("expected return");
        };
        assert!(ret.name.is_none());
        assert_eq!(ret.description.as_deref(), Some("the count of items"));
    }

    #[test]
    fn class_with_parents_and_exact() {
        let AnnotationKind::Class(class) = kind("---@class (exact) Point: Base, Shape") else {
            panic!("expected class");
        };
        assert_eq!(class.name, "Point");
        assert!(class.exact);
        assert_eq!(class.parents, vec![EcoString::from("Base"), "Shape".into()]);
    }

    #[test]
    fn field_with_visibility() {
        let AnnotationKind::Field(field) = kind("---@field private _cache table<string, any>")
        else {
            panic!("expected field");
        };
        assert_eq!(field.visibility, Some(Visibility::Private));
        assert_eq!(field.name, "_cache");
    }

    #[test]
    fn alias_and_entry() {
        let AnnotationKind::Alias(alias) = kind("---@alias Direction") else {
            panic!("expected alias");
        };
        assert_eq!(alias.name, "Direction");
        assert!(alias.type_expr.is_none());
        assert!(alias.entries.is_empty());

        let entry = parse_alias_entry("---| 'north' # upward", Span::default());
        assert_eq!(entry.value, "'north'");
        assert_eq!(entry.description.as_deref(), Some("upward"));
        assert_eq!(entry.raw, "---| 'north' # upward");
    }

    #[test]
    fn cast_entries() {
        let AnnotationKind::Cast { variable, casts } = kind("---@cast x +string, -nil") else {
            panic!("expected cast");
        };
        assert_eq!(variable, "x");
        assert_eq!(casts.len(), 2);
        assert_eq!(casts[0].op, Some(CastOp::Add));
        assert_eq!(casts[1].op, Some(CastOp::Remove));
    }

    #[test]
    fn diagnostic_with_codes() {
        let AnnotationKind::Diagnostic { action, codes } =
            kind("---@diagnostic disable-next-line: undefined-global")
        else {
            panic!("expected diagnostic");
        };
        assert_eq!(action, "disable-next-line");
        assert_eq!(codes.as_deref(), Some("undefined-global"));
    }

    #[test]
    fn module_quoted() {
        let AnnotationKind::Module { name } = kind("---@module 'foo.bar'") else {
            panic!("expected module");
        };
        assert_eq!(name, "foo.bar");
    }

    #[test]
    fn simple_markers() {
        assert_eq!(kind("---@deprecated"), AnnotationKind::Deprecated);
        assert_eq!(kind("---@nodiscard"), AnnotationKind::Nodiscard);
        assert_eq!(kind("---@async"), AnnotationKind::Async);
        assert_eq!(
            kind("---@private"),
            AnnotationKind::Visibility(Visibility::Private)
        );
    }

    #[test]
    fn malformed_known_tag_is_flagged_opaque() {
        let (ann, diagnostic) = parse("---@param");
        assert!(matches!(
            ann.kind,
            AnnotationKind::Opaque { tag: Some(ref t) } if t == "param"
        ));
        assert!(diagnostic.is_some());
        assert_eq!(ann.raw, "---@param");
    }

    #[test]
    fn unknown_tag_is_opaque_without_diagnostic() {
        let (ann, diagnostic) = parse("---@custom_thing payload");
        assert!(matches!(ann.kind, AnnotationKind::Opaque { .. }));
        assert!(diagnostic.is_none());
    }

    #[test]
    fn overload_signature() {
        let AnnotationKind::Overload { signature } =
            kind("---@overload fun(a: string): boolean")
        else {
            panic!("expected overload");
        };
        assert_eq!(signature.to_string(), "fun(a: string): boolean");
    }
}
