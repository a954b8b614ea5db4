// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Expression parsing.
//!
//! Binary operators use Pratt parsing with the binding power table in the
//! parent module. Suffix chains (`a.b[c](d):m(e)`) are parsed iteratively
//! so index paths and call targets come out flat.

use ecow::EcoString;

use crate::ast::{
    BinaryOp, Expr, FunctionBody, Identifier, IndexKey, Literal, Param, TableConstructor,
    TableField, UnaryOp,
};
use crate::source_analysis::{Span, Token, TokenKind};

use super::{binary_binding_power, Diagnostic, Parser, MAX_NESTING_DEPTH};

/// Binding power of unary operators. Tighter than every binary operator
/// except `^`, matching Lua (`-x^2` is `-(x^2)`).
const UNARY_BINDING_POWER: u8 = 12;

impl Parser<'_> {
    /// Parses a full expression.
    pub(super) fn parse_expression(&mut self) -> Expr {
        self.parse_binary_expr(0)
    }

    /// Parses a comma-separated expression list with at least one entry.
    pub(super) fn parse_expr_list(&mut self) -> Vec<Expr> {
        let mut exprs = vec![self.parse_expression()];
        while self.eat_punctuation(",") {
            exprs.push(self.parse_expression());
        }
        exprs
    }

    fn parse_binary_expr(&mut self, min_bp: u8) -> Expr {
        if self.nesting_depth >= MAX_NESTING_DEPTH {
            let span = self.peek().span();
            self.diagnostics.push(Diagnostic::error(
                "expression nesting too deep",
                span,
            ));
            self.advance();
            return Expr::Error {
                message: "expression nesting too deep".into(),
                span,
            };
        }
        self.nesting_depth += 1;

        let mut lhs = self.parse_unary_expr();
        loop {
            let op_text: EcoString = match self.peek().kind() {
                TokenKind::Operator(op) => op.clone(),
                TokenKind::Keyword(k) if k == "and" || k == "or" => k.clone(),
                _ => break,
            };
            let Some(bp) = binary_binding_power(&op_text) else {
                break;
            };
            if bp.left < min_bp {
                break;
            }
            self.advance();
            let rhs = self.parse_binary_expr(bp.right);
            let span = lhs.span().merge(rhs.span());
            // `binary_binding_power` and `BinaryOp::from_token` cover the
            // same operator set.
            let Some(op) = BinaryOp::from_token(&op_text) else {
                break;
            };
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                span,
            };
        }

        self.nesting_depth -= 1;
        lhs
    }

    fn parse_unary_expr(&mut self) -> Expr {
        let op = match self.peek().kind() {
            TokenKind::Operator(o) if o == "-" => Some(UnaryOp::Neg),
            TokenKind::Operator(o) if o == "#" => Some(UnaryOp::Len),
            TokenKind::Operator(o) if o == "~" => Some(UnaryOp::BitNot),
            TokenKind::Keyword(k) if k == "not" => Some(UnaryOp::Not),
            _ => None,
        };
        if let Some(op) = op {
            let start = self.advance().span();
            let operand = self.parse_binary_expr(UNARY_BINDING_POWER);
            let span = start.merge(operand.span());
            return Expr::Unary {
                op,
                operand: Box::new(operand),
                span,
            };
        }
        self.parse_suffixed_expression()
    }

    /// Parses a primary expression followed by its suffix chain:
    /// `.name`, `[expr]`, `(args)`, `:m(args)`, `"arg"`, `{arg}`.
    pub(super) fn parse_suffixed_expression(&mut self) -> Expr {
        let mut expr = self.parse_primary_expr();
        loop {
            let token = self.peek().clone();
            match token.kind() {
                TokenKind::Punctuation(p) if p == "." => {
                    self.advance();
                    let Some(name) = self.expect_identifier() else {
                        return Expr::Error {
                            message: "expected a field name after `.`".into(),
                            span: expr.span().merge(token.span()),
                        };
                    };
                    let span = expr.span().merge(name.span);
                    expr = Expr::Index {
                        base: Box::new(expr),
                        key: IndexKey::Name(name.name),
                        span,
                    };
                }
                TokenKind::Punctuation(p) if p == "[" => {
                    self.advance();
                    let key = self.parse_expression();
                    let end = self.peek().span();
                    self.expect_punctuation("]");
                    let span = expr.span().merge(end);
                    expr = Expr::Index {
                        base: Box::new(expr),
                        key: IndexKey::Expr(Box::new(key)),
                        span,
                    };
                }
                TokenKind::Punctuation(p) if p == "(" => {
                    let (args, end) = self.parse_call_args();
                    let span = expr.span().merge(end);
                    expr = Expr::Call {
                        callee: Box::new(expr),
                        method: None,
                        args,
                        span,
                    };
                }
                TokenKind::Punctuation(p) if p == ":" => {
                    self.advance();
                    let Some(name) = self.expect_identifier() else {
                        return Expr::Error {
                            message: "expected a method name after `:`".into(),
                            span: expr.span().merge(token.span()),
                        };
                    };
                    let (args, end) = self.parse_method_args(name.span);
                    let span = expr.span().merge(end);
                    expr = Expr::Call {
                        callee: Box::new(expr),
                        method: Some(name.name),
                        args,
                        span,
                    };
                }
                // `f "literal"` and `f { table }` call sugar
                TokenKind::StringLiteral(raw) => {
                    let arg = Expr::Literal(Literal::String(raw.clone()), token.span());
                    self.advance();
                    let span = expr.span().merge(token.span());
                    expr = Expr::Call {
                        callee: Box::new(expr),
                        method: None,
                        args: vec![arg],
                        span,
                    };
                }
                TokenKind::Punctuation(p) if p == "{" => {
                    let table = self.parse_table();
                    let span = expr.span().merge(table.span());
                    expr = Expr::Call {
                        callee: Box::new(expr),
                        method: None,
                        args: vec![table],
                        span,
                    };
                }
                _ => break,
            }
        }
        expr
    }

    /// Parses `(args)` and returns them with the closing span.
    fn parse_call_args(&mut self) -> (Vec<Expr>, Span) {
        self.advance(); // `(`
        let mut args = Vec::new();
        if !self.peek().kind().is_punctuation(")") {
            args = self.parse_expr_list();
        }
        let end = self.peek().span();
        self.expect_punctuation(")");
        (args, end)
    }

    /// Parses the arguments of a method call: parenthesized, a string
    /// literal, or a table constructor.
    fn parse_method_args(&mut self, name_span: Span) -> (Vec<Expr>, Span) {
        let token = self.peek().clone();
        match token.kind() {
            TokenKind::Punctuation(p) if p == "(" => self.parse_call_args(),
            TokenKind::StringLiteral(raw) => {
                let arg = Expr::Literal(Literal::String(raw.clone()), token.span());
                self.advance();
                (vec![arg], token.span())
            }
            TokenKind::Punctuation(p) if p == "{" => {
                let table = self.parse_table();
                let span = table.span();
                (vec![table], span)
            }
            _ => {
                self.diagnostics.push(Diagnostic::error(
                    "expected method call arguments",
                    token.span(),
                ));
                (Vec::new(), name_span)
            }
        }
    }

    fn parse_primary_expr(&mut self) -> Expr {
        let token = self.peek().clone();
        match token.kind() {
            TokenKind::Keyword(k) => match k.as_str() {
                "nil" => {
                    self.advance();
                    Expr::Literal(Literal::Nil, token.span())
                }
                "true" => {
                    self.advance();
                    Expr::Literal(Literal::True, token.span())
                }
                "false" => {
                    self.advance();
                    Expr::Literal(Literal::False, token.span())
                }
                "function" => {
                    let start = self.advance().span();
                    let body = self.parse_function_body(start);
                    Expr::Function(body)
                }
                _ => self.unexpected_expression(&token),
            },
            TokenKind::NumberLiteral(raw) => {
                let raw = raw.clone();
                self.advance();
                Expr::Literal(Literal::Number(raw), token.span())
            }
            TokenKind::StringLiteral(raw) => {
                let raw = raw.clone();
                self.advance();
                Expr::Literal(Literal::String(raw), token.span())
            }
            TokenKind::Operator(op) if op == "..." => {
                self.advance();
                Expr::Vararg(token.span())
            }
            TokenKind::Identifier(name) => {
                let name = name.clone();
                self.advance();
                Expr::Identifier(Identifier {
                    name,
                    span: token.span(),
                })
            }
            TokenKind::Punctuation(p) if p == "(" => {
                let start = self.advance().span();
                let inner = self.parse_expression();
                let end = self.peek().span();
                self.expect_punctuation(")");
                Expr::Paren {
                    inner: Box::new(inner),
                    span: start.merge(end),
                }
            }
            TokenKind::Punctuation(p) if p == "{" => self.parse_table(),
            _ => self.unexpected_expression(&token),
        }
    }

    fn unexpected_expression(&mut self, token: &Token) -> Expr {
        self.diagnostics.push(Diagnostic::error(
            format!("expected an expression, found `{}`", token.kind()),
            token.span(),
        ));
        self.advance();
        Expr::Error {
            message: "expected an expression".into(),
            span: token.span(),
        }
    }

    /// Parses a table constructor: `{ a = 1, [k] = v, positional }`.
    pub(super) fn parse_table(&mut self) -> Expr {
        let start = self.advance().span(); // `{`
        let mut fields = Vec::new();
        loop {
            let token = self.peek().clone();
            match token.kind() {
                TokenKind::Punctuation(p) if p == "}" => break,
                TokenKind::Eof => break,
                TokenKind::Punctuation(p) if p == "[" => {
                    self.advance();
                    let _key = self.parse_expression();
                    self.expect_punctuation("]");
                    self.expect_operator_eq();
                    let value = self.parse_expression();
                    let span = token.span().merge(value.span());
                    fields.push(TableField {
                        key: None,
                        value,
                        span,
                    });
                }
                TokenKind::Identifier(name) if self.peek_second().kind().is_operator("=") => {
                    let name = name.clone();
                    self.advance(); // name
                    self.advance(); // `=`
                    let value = self.parse_expression();
                    let span = token.span().merge(value.span());
                    fields.push(TableField {
                        key: Some(name),
                        value,
                        span,
                    });
                }
                _ => {
                    let value = self.parse_expression();
                    let span = value.span();
                    fields.push(TableField {
                        key: None,
                        value,
                        span,
                    });
                }
            }
            if !self.eat_punctuation(",") && !self.eat_punctuation(";") {
                break;
            }
        }
        let end = self.peek().span();
        self.expect_punctuation("}");
        Expr::Table(TableConstructor {
            fields,
            span: start.merge(end),
        })
    }

    fn expect_operator_eq(&mut self) {
        if !self.eat_operator("=") {
            let span = self.peek().span();
            self.diagnostics
                .push(Diagnostic::error("expected `=`", span));
        }
    }

    /// Parses `(params) body end` after the `function` keyword.
    pub(super) fn parse_function_body(&mut self, start: Span) -> FunctionBody {
        self.expect_punctuation("(");
        let mut params = Vec::new();
        let mut is_vararg = false;
        if !self.peek().kind().is_punctuation(")") {
            loop {
                let token = self.peek().clone();
                match token.kind() {
                    TokenKind::Operator(op) if op == "..." => {
                        self.advance();
                        is_vararg = true;
                        break;
                    }
                    TokenKind::Identifier(name) => {
                        let name = name.clone();
                        self.advance();
                        params.push(Param {
                            name,
                            span: token.span(),
                        });
                    }
                    _ => {
                        self.diagnostics.push(Diagnostic::error(
                            "expected a parameter name",
                            token.span(),
                        ));
                        break;
                    }
                }
                if !self.eat_punctuation(",") {
                    break;
                }
            }
        }
        self.expect_punctuation(")");
        let body = self.parse_block(&["end"]);
        let end = self.peek().span();
        self.expect_keyword("end");
        FunctionBody {
            params,
            is_vararg,
            body,
            span: start.merge(end),
        }
    }
}
