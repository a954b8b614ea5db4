// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Statement parsing.
//!
//! Statements synchronize error recovery: when something unparseable is
//! hit, everything up to the next statement-start keyword is captured as
//! an opaque statement with a diagnostic, and parsing carries on.

use ecow::EcoString;

use crate::ast::{
    Assignment, BlockKind, BlockStmt, CallStmt, DocBlock, Expr, FunctionDecl, FunctionName,
    Identifier, LocalDecl, OpaqueStmt, ReturnStmt, Stmt,
};
use crate::source_analysis::{Span, Token, TokenKind};

use super::{Diagnostic, Parser};

/// Keywords that can begin a statement; recovery stops at these.
const STATEMENT_START: &[&str] = &[
    "local", "function", "return", "if", "while", "for", "repeat", "do", "break", "goto", "end",
    "else", "elseif", "until",
];

impl Parser<'_> {
    /// Parses statements until one of `terminators` (not consumed) or EOF.
    pub(super) fn parse_block(&mut self, terminators: &[&str]) -> Vec<Stmt> {
        let mut stmts = Vec::new();
        // A comment trailing the previous statement on its own line is
        // not part of the next declaration's doc block.
        let mut prev_line = self.last_consumed_end_line();
        loop {
            let run = self.collect_comment_run();
            if self.at_eof() || self.at_terminator(terminators) {
                break;
            }
            if self.eat_punctuation(";") {
                prev_line = self.last_consumed_end_line();
                continue;
            }
            let stmt_line = self.peek().line();
            let doc = self.build_doc_block(&run, stmt_line, prev_line);
            let before = self.current;
            let stmt = self.parse_statement();
            stmts.push(attach_doc(stmt, doc));
            // Safety net: guarantee forward progress on any input.
            if self.current == before {
                self.advance();
            }
            prev_line = self.last_consumed_end_line();
        }
        stmts
    }

    /// The ending line of the most recently consumed token.
    fn last_consumed_end_line(&self) -> Option<u32> {
        self.current
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .map(Token::end_line)
    }

    fn at_terminator(&self, terminators: &[&str]) -> bool {
        match self.peek().kind() {
            TokenKind::Keyword(k) => terminators.contains(&k.as_str()),
            _ => false,
        }
    }

    fn parse_statement(&mut self) -> Stmt {
        let token = self.peek().clone();
        match token.kind() {
            TokenKind::Keyword(k) => match k.as_str() {
                "local" => self.parse_local(),
                "function" => self.parse_function_decl(),
                "return" => self.parse_return(),
                "if" => self.parse_if(),
                "while" => self.parse_while(),
                "for" => self.parse_for(),
                "repeat" => self.parse_repeat(),
                "do" => self.parse_do(),
                // Statements with no analysis value are kept opaque
                // without complaint.
                "break" => {
                    self.advance();
                    self.opaque_from(token.span())
                }
                "goto" => {
                    self.advance();
                    let mut span = token.span();
                    if matches!(self.peek().kind(), TokenKind::Identifier(_)) {
                        span = span.merge(self.advance().span());
                    }
                    self.opaque_from(span)
                }
                _ => self.unexpected_statement(&token),
            },
            TokenKind::Punctuation(p) if p == "::" => {
                // Label: `::name::`
                self.advance();
                let mut span = token.span();
                if matches!(self.peek().kind(), TokenKind::Identifier(_)) {
                    span = span.merge(self.advance().span());
                }
                if self.peek().kind().is_punctuation("::") {
                    span = span.merge(self.advance().span());
                }
                self.opaque_from(span)
            }
            TokenKind::Identifier(_) | TokenKind::Punctuation(_) => self.parse_expr_statement(),
            _ => self.unexpected_statement(&token),
        }
    }

    // ------------------------------------------------------------------
    // Declarations
    // ------------------------------------------------------------------

    /// `local a, b = ...` or `local function f() ... end`
    fn parse_local(&mut self) -> Stmt {
        let start = self.advance().span(); // `local`

        if self.peek().kind().is_keyword("function") {
            let fn_span = self.advance().span();
            let Some(name) = self.expect_identifier() else {
                return self.recover_statement(start);
            };
            let body = self.parse_function_body(fn_span);
            let span = start.merge(body.span);
            return Stmt::Function(FunctionDecl {
                name: FunctionName {
                    base: name.name,
                    path: Vec::new(),
                    is_method: false,
                    span: name.span,
                },
                body,
                doc: None,
                is_local: true,
                span,
            });
        }

        let mut names = Vec::new();
        loop {
            let Some(name) = self.expect_identifier() else {
                return self.recover_statement(start);
            };
            names.push(name);
            // Lua 5.4 attribute: `local x <const>`
            if self.eat_operator("<") {
                while !self.at_eof() && !self.eat_operator(">") {
                    self.advance();
                }
            }
            if !self.eat_punctuation(",") {
                break;
            }
        }

        let mut exprs = Vec::new();
        if self.eat_operator("=") {
            exprs = self.parse_expr_list();
        }

        let end = exprs
            .last()
            .map(Expr::span)
            .or_else(|| names.last().map(|n| n.span))
            .unwrap_or(start);
        Stmt::Local(LocalDecl {
            names,
            exprs,
            doc: None,
            span: start.merge(end),
        })
    }

    /// `function f() ...`, `function t.a.f() ...`, `function t:m() ...`
    fn parse_function_decl(&mut self) -> Stmt {
        let start = self.advance().span(); // `function`
        let Some(base) = self.expect_identifier() else {
            return self.recover_statement(start);
        };

        let mut path = Vec::new();
        let mut name_span = base.span;
        let mut is_method = false;
        loop {
            if self.eat_punctuation(".") {
                let Some(seg) = self.expect_identifier() else {
                    return self.recover_statement(start);
                };
                name_span = name_span.merge(seg.span);
                path.push(seg.name);
            } else if self.peek().kind().is_punctuation(":") {
                self.advance();
                let Some(seg) = self.expect_identifier() else {
                    return self.recover_statement(start);
                };
                name_span = name_span.merge(seg.span);
                path.push(seg.name);
                is_method = true;
                break;
            } else {
                break;
            }
        }

        let body = self.parse_function_body(start);
        let span = start.merge(body.span);
        Stmt::Function(FunctionDecl {
            name: FunctionName {
                base: base.name,
                path,
                is_method,
                span: name_span,
            },
            body,
            doc: None,
            is_local: false,
            span,
        })
    }

    /// An assignment or a call in statement position.
    fn parse_expr_statement(&mut self) -> Stmt {
        let start = self.peek().span();
        let first = self.parse_suffixed_expression();

        if self.peek().kind().is_operator("=") || self.peek().kind().is_punctuation(",") {
            let mut targets = vec![first];
            while self.eat_punctuation(",") {
                targets.push(self.parse_suffixed_expression());
            }
            if !self.eat_operator("=") {
                let span = self.peek().span();
                self.diagnostics
                    .push(Diagnostic::error("expected `=` in assignment", span));
                return self.recover_statement(start);
            }
            let exprs = self.parse_expr_list();
            let end = exprs.last().map_or(start, Expr::span);
            return Stmt::Assign(Assignment {
                targets,
                exprs,
                doc: None,
                span: start.merge(end),
            });
        }

        if matches!(first, Expr::Call { .. }) {
            let span = first.span();
            return Stmt::Call(CallStmt { call: first, span });
        }

        let span = first.span();
        self.diagnostics.push(
            Diagnostic::error("expression is not a statement", span)
                .with_hint("only calls and assignments can stand alone"),
        );
        self.recover_statement(start)
    }

    // ------------------------------------------------------------------
    // Control flow: bodies are flattened into generic blocks
    // ------------------------------------------------------------------

    fn parse_return(&mut self) -> Stmt {
        let start = self.advance().span(); // `return`
        let exprs = if self.return_has_value() {
            self.parse_expr_list()
        } else {
            Vec::new()
        };
        let end = exprs.last().map_or(start, Expr::span);
        Stmt::Return(ReturnStmt {
            exprs,
            span: start.merge(end),
        })
    }

    fn return_has_value(&self) -> bool {
        match self.peek().kind() {
            TokenKind::Eof => false,
            TokenKind::Punctuation(p) => p != ";",
            TokenKind::Keyword(k) => !matches!(k.as_str(), "end" | "else" | "elseif" | "until"),
            _ => true,
        }
    }

    fn parse_if(&mut self) -> Stmt {
        let start = self.advance().span(); // `if`
        let _condition = self.parse_expression();
        self.expect_keyword("then");
        let mut body = self.parse_block(&["end", "else", "elseif"]);
        loop {
            if self.eat_keyword("elseif") {
                let _condition = self.parse_expression();
                self.expect_keyword("then");
                body.extend(self.parse_block(&["end", "else", "elseif"]));
            } else if self.eat_keyword("else") {
                body.extend(self.parse_block(&["end"]));
            } else {
                break;
            }
        }
        let end = self.peek().span();
        self.expect_keyword("end");
        Stmt::Block(BlockStmt {
            kind: BlockKind::If,
            body,
            span: start.merge(end),
        })
    }

    fn parse_while(&mut self) -> Stmt {
        let start = self.advance().span(); // `while`
        let _condition = self.parse_expression();
        self.expect_keyword("do");
        let body = self.parse_block(&["end"]);
        let end = self.peek().span();
        self.expect_keyword("end");
        Stmt::Block(BlockStmt {
            kind: BlockKind::While,
            body,
            span: start.merge(end),
        })
    }

    fn parse_for(&mut self) -> Stmt {
        let start = self.advance().span(); // `for`
        let kind = if self.expect_identifier().is_some() && self.peek().kind().is_operator("=") {
            self.advance();
            let _exprs = self.parse_expr_list();
            BlockKind::ForNumeric
        } else {
            while self.eat_punctuation(",") {
                let _ = self.expect_identifier();
            }
            self.expect_keyword("in");
            let _exprs = self.parse_expr_list();
            BlockKind::ForGeneric
        };
        self.expect_keyword("do");
        let body = self.parse_block(&["end"]);
        let end = self.peek().span();
        self.expect_keyword("end");
        Stmt::Block(BlockStmt {
            kind,
            body,
            span: start.merge(end),
        })
    }

    fn parse_repeat(&mut self) -> Stmt {
        let start = self.advance().span(); // `repeat`
        let body = self.parse_block(&["until"]);
        self.expect_keyword("until");
        let condition = self.parse_expression();
        Stmt::Block(BlockStmt {
            kind: BlockKind::RepeatUntil,
            body,
            span: start.merge(condition.span()),
        })
    }

    fn parse_do(&mut self) -> Stmt {
        let start = self.advance().span(); // `do`
        let body = self.parse_block(&["end"]);
        let end = self.peek().span();
        self.expect_keyword("end");
        Stmt::Block(BlockStmt {
            kind: BlockKind::Do,
            body,
            span: start.merge(end),
        })
    }

    // ------------------------------------------------------------------
    // Recovery
    // ------------------------------------------------------------------

    fn unexpected_statement(&mut self, token: &Token) -> Stmt {
        self.diagnostics.push(Diagnostic::error(
            format!("unexpected `{}`", token.kind()),
            token.span(),
        ));
        let span = token.span();
        self.advance();
        self.recover_statement(span)
    }

    /// Skips to the next statement boundary and captures everything
    /// consumed (from `start`) as an opaque statement.
    pub(super) fn recover_statement(&mut self, start: Span) -> Stmt {
        let mut span = start;
        while !self.at_eof() && !self.at_statement_start() {
            span = span.merge(self.advance().span());
        }
        self.opaque_from(span)
    }

    fn at_statement_start(&self) -> bool {
        match self.peek().kind() {
            TokenKind::Keyword(k) => STATEMENT_START.contains(&k.as_str()),
            _ => false,
        }
    }

    fn opaque_from(&self, span: Span) -> Stmt {
        Stmt::Opaque(OpaqueStmt {
            text: EcoString::from(self.text_for(span)),
            span,
        })
    }

    /// Consumes an identifier token or records a diagnostic.
    pub(super) fn expect_identifier(&mut self) -> Option<Identifier> {
        if let TokenKind::Identifier(name) = self.peek().kind() {
            let name = name.clone();
            let token = self.advance();
            return Some(Identifier {
                name,
                span: token.span(),
            });
        }
        let span = self.peek().span();
        self.diagnostics
            .push(Diagnostic::error("expected a name", span));
        None
    }
}

/// Attaches a doc block to a declaration-like statement.
fn attach_doc(stmt: Stmt, doc: Option<DocBlock>) -> Stmt {
    let Some(doc) = doc else {
        return stmt;
    };
    match stmt {
        Stmt::Local(mut s) => {
            s.doc = Some(doc);
            Stmt::Local(s)
        }
        Stmt::Assign(mut s) => {
            s.doc = Some(doc);
            Stmt::Assign(s)
        }
        Stmt::Function(mut s) => {
            s.doc = Some(doc);
            Stmt::Function(s)
        }
        other => other,
    }
}
