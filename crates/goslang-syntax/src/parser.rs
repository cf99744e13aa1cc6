// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Recursive-descent parser producing the syntax tree of a Go source file.
//!
//! The parser works on the semicolon-terminated token stream produced by
//! [`crate::lexer::tokenize`] and stops at the first error. Error messages
//! follow the wording of the Go toolchain (`expected ';', found 'else'`).
//!
//! Composite literals follow Go's expression-level rule: inside the header of
//! an `if`, `for` or `switch` statement a bare type name followed by `{` opens
//! the statement body, not a literal.

use crate::ast::*;
use crate::error::SyntaxError;
use crate::lexer::tokenize;
use crate::token::{LitKind, Span, Spanned, Token};

type PResult<T> = Result<T, SyntaxError>;

/// Lexes and parses a complete source file.
pub fn parse_file(source: &str) -> PResult<File> {
    let tokens = tokenize(source)?;
    Parser::new(source, tokens).parse_file()
}

pub struct Parser<'s> {
    source: &'s str,
    tokens: Vec<Spanned<Token>>,
    pos: usize,
    /// Negative while parsing a control clause, where `T {` is not a literal.
    expr_lev: i32,
}

/// Result of parsing a simple statement where a `range` clause is allowed.
enum SimpleStmt {
    Stmt(Stmt),
    Range {
        key: Option<Expr>,
        value: Option<Expr>,
        op: Option<AssignOp>,
        x: Expr,
    },
}

impl<'s> Parser<'s> {
    pub fn new(source: &'s str, mut tokens: Vec<Spanned<Token>>) -> Self {
        if !matches!(tokens.last().map(|t| &t.node), Some(Token::Eof)) {
            let end = source.len();
            tokens.push(Spanned {
                node: Token::Eof,
                span: Span::new(end, end),
            });
        }
        Self {
            source,
            tokens,
            pos: 0,
            expr_lev: 0,
        }
    }

    // -----------------------------------------------------------------------
    // Token stream helpers
    // -----------------------------------------------------------------------

    fn peek_tok(&self) -> &Token {
        &self.tokens[self.pos].node
    }

    fn peek_at(&self, offset: usize) -> &Token {
        self.tokens
            .get(self.pos + offset)
            .map(|t| &t.node)
            .unwrap_or(&Token::Eof)
    }

    fn current_span(&self) -> Span {
        self.tokens[self.pos].span
    }

    fn prev_end(&self) -> usize {
        match self.pos {
            0 => 0,
            pos => self.tokens[pos - 1].span.end,
        }
    }

    /// Span from `start` to the end of the last consumed token.
    fn span_from(&self, start: Span) -> Span {
        Span::new(start.start, self.prev_end().max(start.start))
    }

    fn advance(&mut self) -> Span {
        let span = self.tokens[self.pos].span;
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        span
    }

    fn at_eof(&self) -> bool {
        matches!(self.peek_tok(), Token::Eof)
    }

    fn at_semicolon(&self) -> bool {
        matches!(self.peek_tok(), Token::Semicolon { .. })
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek_tok() == expected {
            self.advance();
            true
        } else {
            false
        }
    }

    fn error(&self, span: Span, message: impl Into<String>) -> SyntaxError {
        SyntaxError::new(self.source, span, message)
    }

    fn error_expected(&self, what: &str) -> SyntaxError {
        self.error(
            self.current_span(),
            format!("expected {}, found {}", what, self.peek_tok()),
        )
    }

    fn expect(&mut self, expected: &Token) -> PResult<Span> {
        if self.peek_tok() == expected {
            Ok(self.advance())
        } else {
            Err(self.error_expected(&format!("'{}'", expected.as_str())))
        }
    }

    /// Statement terminator; a closing `)` or `}` also ends a statement.
    fn expect_semi(&mut self) -> PResult<()> {
        match self.peek_tok() {
            Token::Semicolon { .. } => {
                self.advance();
                Ok(())
            }
            Token::RParen | Token::RBrace => Ok(()),
            _ => Err(self.error_expected("';'")),
        }
    }

    fn expect_ident(&mut self) -> PResult<Ident> {
        match self.peek_tok() {
            Token::Ident(name) => {
                let name = name.clone();
                let span = self.advance();
                Ok(Ident { name, span })
            }
            _ => Err(self.error_expected("identifier")),
        }
    }

    fn parse_ident_list(&mut self) -> PResult<Vec<Ident>> {
        let mut idents = vec![self.expect_ident()?];
        while self.eat(&Token::Comma) {
            idents.push(self.expect_ident()?);
        }
        Ok(idents)
    }

    // -----------------------------------------------------------------------
    // Top-level
    // -----------------------------------------------------------------------

    pub fn parse_file(&mut self) -> PResult<File> {
        self.expect(&Token::Package)?;
        let package = self.expect_ident()?;
        if package.is_blank() {
            return Err(self.error(package.span, "invalid package name _"));
        }
        self.expect_semi()?;

        let mut decls = Vec::new();
        while matches!(self.peek_tok(), Token::Import) {
            decls.push(Decl::Gen(self.parse_gen_decl()?));
            self.expect_semi()?;
        }

        while !self.at_eof() {
            let decl = match self.peek_tok() {
                Token::Const | Token::Var | Token::Type => Decl::Gen(self.parse_gen_decl()?),
                Token::Func => Decl::Func(self.parse_func_decl()?),
                Token::Import => {
                    return Err(self.error(
                        self.current_span(),
                        "imports must appear before other declarations",
                    ))
                }
                _ => return Err(self.error_expected("declaration")),
            };
            decls.push(decl);
            if !self.at_eof() {
                self.expect_semi()?;
            }
        }

        Ok(File { package, decls })
    }

    fn parse_gen_decl(&mut self) -> PResult<GenDecl> {
        let start = self.current_span();
        let keyword = match self.peek_tok() {
            Token::Import => DeclKeyword::Import,
            Token::Const => DeclKeyword::Const,
            Token::Type => DeclKeyword::Type,
            Token::Var => DeclKeyword::Var,
            _ => return Err(self.error_expected("declaration")),
        };
        self.advance();

        if matches!(self.peek_tok(), Token::LParen) {
            let lparen = self.advance();
            let mut specs = Vec::new();
            while !matches!(self.peek_tok(), Token::RParen | Token::Eof) {
                specs.push(self.parse_spec(keyword, specs.len())?);
                self.expect_semi()?;
            }
            self.expect(&Token::RParen)?;
            Ok(GenDecl {
                keyword,
                lparen: Some(lparen),
                specs,
                span: self.span_from(start),
            })
        } else {
            let spec = self.parse_spec(keyword, 0)?;
            Ok(GenDecl {
                keyword,
                lparen: None,
                specs: vec![spec],
                span: self.span_from(start),
            })
        }
    }

    /// `index` is the position of the spec inside a group, used for `iota`
    /// style constant repetition.
    fn parse_spec(&mut self, keyword: DeclKeyword, index: usize) -> PResult<Spec> {
        match keyword {
            DeclKeyword::Import => self.parse_import_spec().map(Spec::Import),
            DeclKeyword::Type => self.parse_type_spec().map(Spec::Type),
            DeclKeyword::Const | DeclKeyword::Var => {
                self.parse_value_spec(keyword, index).map(Spec::Value)
            }
        }
    }

    fn parse_import_spec(&mut self) -> PResult<ImportSpec> {
        let name = match self.peek_tok() {
            Token::Ident(_) => Some(self.expect_ident()?),
            Token::Period => {
                let span = self.advance();
                Some(Ident {
                    name: ".".to_string(),
                    span,
                })
            }
            _ => None,
        };
        match self.peek_tok() {
            Token::Literal(LitKind::String, value) => {
                let value = value.clone();
                let span = self.advance();
                Ok(ImportSpec {
                    name,
                    path: BasicLit {
                        kind: LitKind::String,
                        value,
                        span,
                    },
                })
            }
            _ => Err(self.error(self.current_span(), "missing import path")),
        }
    }

    fn parse_value_spec(&mut self, keyword: DeclKeyword, index: usize) -> PResult<ValueSpec> {
        let start = self.current_span();
        let names = self.parse_ident_list()?;
        let ty = match self.peek_tok() {
            Token::Assign | Token::Semicolon { .. } | Token::RParen => None,
            _ => Some(self.parse_type()?),
        };
        let values = if self.eat(&Token::Assign) {
            self.parse_expr_list()?
        } else {
            Vec::new()
        };

        match keyword {
            DeclKeyword::Var if ty.is_none() && values.is_empty() => {
                return Err(self.error(start, "missing variable type or initialization"));
            }
            DeclKeyword::Const if values.is_empty() && (index == 0 || ty.is_some()) => {
                return Err(self.error(start, "missing init expr for const declaration"));
            }
            _ => {}
        }

        Ok(ValueSpec {
            names,
            ty,
            values,
            span: self.span_from(start),
        })
    }

    fn parse_type_spec(&mut self) -> PResult<TypeSpec> {
        let name = self.expect_ident()?;
        // `type A[T any] ...` declares type parameters, `type A [N]T` an array.
        let type_params = match (self.peek_tok(), self.peek_at(1), self.peek_at(2)) {
            (Token::LBrack, Token::Ident(_), next) if !matches!(next, Token::RBrack | Token::Mul | Token::Add | Token::Sub) => {
                Some(self.parse_type_params()?)
            }
            _ => None,
        };
        let alias = self.eat(&Token::Assign);
        let ty = self.parse_type()?;
        Ok(TypeSpec {
            name,
            type_params,
            alias,
            ty,
        })
    }

    fn parse_type_params(&mut self) -> PResult<FieldList> {
        self.expect(&Token::LBrack)?;
        let mut fields = Vec::new();
        while !matches!(self.peek_tok(), Token::RBrack | Token::Eof) {
            let names = self.parse_ident_list()?;
            let ty = self.parse_constraint()?;
            fields.push(Field { names, ty });
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        self.expect(&Token::RBrack)?;
        if fields.is_empty() {
            return Err(self.error(self.current_span(), "empty type parameter list"));
        }
        Ok(FieldList { fields })
    }

    /// Union of (possibly `~`-prefixed) types.
    fn parse_constraint(&mut self) -> PResult<Expr> {
        let mut x = self.parse_constraint_term()?;
        while matches!(self.peek_tok(), Token::Or) {
            self.advance();
            let y = self.parse_constraint_term()?;
            let span = x.span.merge(y.span);
            x = Expr::new(
                ExprKind::Binary {
                    op: BinaryOp::Or,
                    x: Box::new(x),
                    y: Box::new(y),
                },
                span,
            );
        }
        Ok(x)
    }

    fn parse_constraint_term(&mut self) -> PResult<Expr> {
        if matches!(self.peek_tok(), Token::Tilde) {
            let start = self.advance();
            let x = self.parse_type()?;
            return Ok(Expr::new(
                ExprKind::Unary {
                    op: UnaryOp::Tilde,
                    x: Box::new(x),
                },
                self.span_from(start),
            ));
        }
        self.parse_type()
    }

    fn parse_func_decl(&mut self) -> PResult<FuncDecl> {
        let start = self.expect(&Token::Func)?;
        let recv = if matches!(self.peek_tok(), Token::LParen) {
            Some(self.parse_parameters()?)
        } else {
            None
        };
        let name = self.expect_ident()?;
        let type_params = if matches!(self.peek_tok(), Token::LBrack) {
            Some(self.parse_type_params()?)
        } else {
            None
        };
        let (params, results) = self.parse_signature()?;
        let ty = FuncType {
            type_params,
            params,
            results,
            span: self.span_from(start),
        };
        let body = if matches!(self.peek_tok(), Token::LBrace) {
            Some(self.parse_body()?)
        } else {
            None
        };
        Ok(FuncDecl {
            recv,
            name,
            ty,
            body,
            span: self.span_from(start),
        })
    }

    // -----------------------------------------------------------------------
    // Signatures and types
    // -----------------------------------------------------------------------

    fn parse_signature(&mut self) -> PResult<(FieldList, Option<FieldList>)> {
        let params = self.parse_parameters()?;
        let results = if matches!(self.peek_tok(), Token::LParen) {
            Some(self.parse_parameters()?)
        } else if self.starts_type() {
            let ty = self.parse_type()?;
            Some(FieldList {
                fields: vec![Field {
                    names: Vec::new(),
                    ty,
                }],
            })
        } else {
            None
        };
        Ok((params, results))
    }

    fn starts_type(&self) -> bool {
        matches!(
            self.peek_tok(),
            Token::Ident(_)
                | Token::LBrack
                | Token::Struct
                | Token::Mul
                | Token::Func
                | Token::Interface
                | Token::Map
                | Token::Chan
                | Token::Arrow
                | Token::LParen
        )
    }

    /// Parameter list in parentheses.
    ///
    /// Entries are first collected as `(name, type)` pairs where either side
    /// may be missing; once the list is complete it is either all named
    /// (`a, b int, c string`) or all unnamed (`int, string`).
    fn parse_parameters(&mut self) -> PResult<FieldList> {
        let lparen = self.expect(&Token::LParen)?;
        let mut entries: Vec<(Option<Ident>, Option<Expr>)> = Vec::new();

        while !matches!(self.peek_tok(), Token::RParen | Token::Eof) {
            match self.peek_tok() {
                Token::Ident(_) => {
                    let ident = self.expect_ident()?;
                    match self.peek_tok() {
                        Token::Comma | Token::RParen => entries.push((Some(ident), None)),
                        Token::Period => {
                            let ty = self.parse_qualified_type(ident)?;
                            entries.push((None, Some(ty)));
                        }
                        _ => {
                            let ty = self.parse_param_type()?;
                            entries.push((Some(ident), Some(ty)));
                        }
                    }
                }
                _ => {
                    let ty = self.parse_param_type()?;
                    entries.push((None, Some(ty)));
                }
            }
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        self.expect(&Token::RParen)?;

        let named = entries.iter().any(|(name, ty)| name.is_some() && ty.is_some());
        let mut fields = Vec::new();
        if named {
            let mut pending = Vec::new();
            for (name, ty) in entries {
                match (name, ty) {
                    (Some(name), None) => pending.push(name),
                    (Some(name), Some(ty)) => {
                        pending.push(name);
                        fields.push(Field {
                            names: std::mem::take(&mut pending),
                            ty,
                        });
                    }
                    (None, _) => {
                        return Err(self.error(lparen, "mixed named and unnamed parameters"))
                    }
                }
            }
            if !pending.is_empty() {
                return Err(self.error(lparen, "mixed named and unnamed parameters"));
            }
        } else {
            for (name, ty) in entries {
                let ty = match (name, ty) {
                    (_, Some(ty)) => ty,
                    (Some(name), None) => {
                        let span = name.span;
                        Expr::new(ExprKind::Ident(name), span)
                    }
                    (None, None) => continue,
                };
                fields.push(Field {
                    names: Vec::new(),
                    ty,
                });
            }
        }
        Ok(FieldList { fields })
    }

    fn parse_param_type(&mut self) -> PResult<Expr> {
        if matches!(self.peek_tok(), Token::Ellipsis) {
            let start = self.advance();
            let elem = self.parse_type()?;
            return Ok(Expr::new(
                ExprKind::Ellipsis(Some(Box::new(elem))),
                self.span_from(start),
            ));
        }
        self.parse_type()
    }

    fn parse_qualified_type(&mut self, package: Ident) -> PResult<Expr> {
        let start = package.span;
        let x = Expr::new(ExprKind::Ident(package), start);
        self.expect(&Token::Period)?;
        let sel = self.expect_ident()?;
        Ok(Expr::new(
            ExprKind::Selector {
                x: Box::new(x),
                sel,
            },
            self.span_from(start),
        ))
    }

    pub fn parse_type(&mut self) -> PResult<Expr> {
        let start = self.current_span();
        let kind = match self.peek_tok() {
            Token::Ident(_) => {
                let ident = self.expect_ident()?;
                if matches!(self.peek_tok(), Token::Period) {
                    return self.parse_qualified_type(ident);
                }
                ExprKind::Ident(ident)
            }
            Token::LBrack => {
                self.advance();
                let len = match self.peek_tok() {
                    Token::RBrack => None,
                    Token::Ellipsis => {
                        let span = self.advance();
                        Some(Box::new(Expr::new(ExprKind::Ellipsis(None), span)))
                    }
                    _ => {
                        self.expr_lev += 1;
                        let len = self.parse_expr();
                        self.expr_lev -= 1;
                        Some(Box::new(len?))
                    }
                };
                self.expect(&Token::RBrack)?;
                let elem = self.parse_type()?;
                ExprKind::ArrayType {
                    len,
                    elem: Box::new(elem),
                }
            }
            Token::Struct => ExprKind::StructType(self.parse_struct_type()?),
            Token::Interface => ExprKind::InterfaceType(self.parse_interface_type()?),
            Token::Mul => {
                self.advance();
                ExprKind::Star(Box::new(self.parse_type()?))
            }
            Token::Func => {
                self.advance();
                let (params, results) = self.parse_signature()?;
                ExprKind::FuncType(FuncType {
                    type_params: None,
                    params,
                    results,
                    span: self.span_from(start),
                })
            }
            Token::Map => {
                self.advance();
                self.expect(&Token::LBrack)?;
                let key = self.parse_type()?;
                self.expect(&Token::RBrack)?;
                let value = self.parse_type()?;
                ExprKind::MapType {
                    key: Box::new(key),
                    value: Box::new(value),
                }
            }
            Token::Chan => {
                self.advance();
                let dir = if self.eat(&Token::Arrow) {
                    ChanDir::Send
                } else {
                    ChanDir::Both
                };
                ExprKind::ChanType {
                    dir,
                    value: Box::new(self.parse_type()?),
                }
            }
            Token::Arrow => {
                self.advance();
                self.expect(&Token::Chan)?;
                ExprKind::ChanType {
                    dir: ChanDir::Recv,
                    value: Box::new(self.parse_type()?),
                }
            }
            Token::LParen => {
                self.advance();
                let inner = self.parse_type()?;
                self.expect(&Token::RParen)?;
                ExprKind::Paren(Box::new(inner))
            }
            _ => return Err(self.error_expected("type")),
        };
        Ok(Expr::new(kind, self.span_from(start)))
    }

    fn parse_struct_type(&mut self) -> PResult<FieldList> {
        self.expect(&Token::Struct)?;
        self.expect(&Token::LBrace)?;
        let mut fields = Vec::new();
        while !matches!(self.peek_tok(), Token::RBrace | Token::Eof) {
            let embedded = match (self.peek_tok(), self.peek_at(1)) {
                (Token::Mul, _) => true,
                (Token::Ident(_), next) => matches!(
                    next,
                    Token::Period
                        | Token::Semicolon { .. }
                        | Token::RBrace
                        | Token::Literal(LitKind::String, _)
                ),
                _ => return Err(self.error_expected("field name or embedded type")),
            };
            let field = if embedded {
                Field {
                    names: Vec::new(),
                    ty: self.parse_type()?,
                }
            } else {
                let names = self.parse_ident_list()?;
                Field {
                    names,
                    ty: self.parse_type()?,
                }
            };
            fields.push(field);
            // Field tags carry no meaning here.
            if matches!(self.peek_tok(), Token::Literal(LitKind::String, _)) {
                self.advance();
            }
            self.expect_semi()?;
        }
        self.expect(&Token::RBrace)?;
        Ok(FieldList { fields })
    }

    fn parse_interface_type(&mut self) -> PResult<FieldList> {
        self.expect(&Token::Interface)?;
        self.expect(&Token::LBrace)?;
        let mut fields = Vec::new();
        while !matches!(self.peek_tok(), Token::RBrace | Token::Eof) {
            let field = match (self.peek_tok(), self.peek_at(1)) {
                (Token::Ident(_), Token::LParen) => {
                    let name = self.expect_ident()?;
                    let start = self.current_span();
                    let (params, results) = self.parse_signature()?;
                    let span = self.span_from(start);
                    Field {
                        names: vec![name],
                        ty: Expr::new(
                            ExprKind::FuncType(FuncType {
                                type_params: None,
                                params,
                                results,
                                span,
                            }),
                            span,
                        ),
                    }
                }
                _ => Field {
                    names: Vec::new(),
                    ty: self.parse_constraint()?,
                },
            };
            fields.push(field);
            self.expect_semi()?;
        }
        self.expect(&Token::RBrace)?;
        Ok(FieldList { fields })
    }

    // -----------------------------------------------------------------------
    // Statements
    // -----------------------------------------------------------------------

    /// Function body; composite literals are allowed again inside it.
    fn parse_body(&mut self) -> PResult<BlockStmt> {
        let saved = self.expr_lev;
        self.expr_lev = 0;
        let body = self.parse_block();
        self.expr_lev = saved;
        body
    }

    fn parse_block(&mut self) -> PResult<BlockStmt> {
        let start = self.expect(&Token::LBrace)?;
        let stmts = self.parse_stmt_list()?;
        self.expect(&Token::RBrace)?;
        Ok(BlockStmt {
            stmts,
            span: self.span_from(start),
        })
    }

    fn parse_stmt_list(&mut self) -> PResult<Vec<Stmt>> {
        let mut stmts = Vec::new();
        while !matches!(
            self.peek_tok(),
            Token::RBrace | Token::Eof | Token::Case | Token::Default
        ) {
            stmts.push(self.parse_stmt()?);
        }
        Ok(stmts)
    }

    pub fn parse_stmt(&mut self) -> PResult<Stmt> {
        let start = self.current_span();
        let stmt = match self.peek_tok() {
            Token::Const | Token::Var | Token::Type => {
                let decl = self.parse_gen_decl()?;
                Stmt::new(StmtKind::Decl(decl), self.span_from(start))
            }
            Token::Ident(_)
            | Token::Literal(..)
            | Token::Func
            | Token::LParen
            | Token::LBrack
            | Token::Struct
            | Token::Map
            | Token::Chan
            | Token::Interface
            | Token::Add
            | Token::Sub
            | Token::Mul
            | Token::And
            | Token::Xor
            | Token::Arrow
            | Token::Not => {
                let stmt = self.parse_simple_stmt(true)?;
                // A labeled statement already consumed its terminator.
                if matches!(stmt.kind, StmtKind::Labeled { .. }) {
                    return Ok(stmt);
                }
                stmt
            }
            Token::Go => {
                self.advance();
                let call = self.parse_call_stmt("go")?;
                Stmt::new(StmtKind::Go(call), self.span_from(start))
            }
            Token::Defer => {
                self.advance();
                let call = self.parse_call_stmt("defer")?;
                Stmt::new(StmtKind::Defer(call), self.span_from(start))
            }
            Token::Return => {
                self.advance();
                let results = if self.at_semicolon() || matches!(self.peek_tok(), Token::RBrace)
                {
                    Vec::new()
                } else {
                    self.parse_expr_list()?
                };
                Stmt::new(StmtKind::Return(results), self.span_from(start))
            }
            Token::Break | Token::Continue | Token::Goto | Token::Fallthrough => {
                let keyword = match self.peek_tok() {
                    Token::Break => BranchKeyword::Break,
                    Token::Continue => BranchKeyword::Continue,
                    Token::Goto => BranchKeyword::Goto,
                    _ => BranchKeyword::Fallthrough,
                };
                self.advance();
                let label = match (keyword, self.peek_tok()) {
                    (BranchKeyword::Fallthrough, _) => None,
                    (_, Token::Ident(_)) => Some(self.expect_ident()?),
                    _ => None,
                };
                Stmt::new(StmtKind::Branch { keyword, label }, self.span_from(start))
            }
            Token::LBrace => {
                let block = self.parse_block()?;
                Stmt::new(StmtKind::Block(block), self.span_from(start))
            }
            Token::If => self.parse_if_stmt()?,
            Token::Switch => self.parse_switch_stmt()?,
            Token::Select => self.parse_select_stmt()?,
            Token::For => self.parse_for_stmt()?,
            Token::Semicolon { .. } => {
                let span = self.advance();
                return Ok(Stmt::new(StmtKind::Empty, span));
            }
            _ => return Err(self.error_expected("statement")),
        };
        self.expect_semi()?;
        Ok(stmt)
    }

    fn parse_call_stmt(&mut self, keyword: &str) -> PResult<CallExpr> {
        let x = self.parse_expr()?;
        match x.kind {
            ExprKind::Call(call) => Ok(call),
            ExprKind::Paren(_) => Err(self.error(
                x.span,
                format!("expression in {} must not be parenthesized", keyword),
            )),
            _ => Err(self.error(
                x.span,
                format!("expression in {} must be function call", keyword),
            )),
        }
    }

    fn parse_simple_stmt(&mut self, label_ok: bool) -> PResult<Stmt> {
        match self.parse_simple_stmt_or_range(label_ok, false)? {
            SimpleStmt::Stmt(stmt) => Ok(stmt),
            SimpleStmt::Range { x, .. } => Err(self.error(x.span, "unexpected range clause")),
        }
    }

    fn parse_simple_stmt_or_range(&mut self, label_ok: bool, range_ok: bool) -> PResult<SimpleStmt> {
        let start = self.current_span();
        let lhs = self.parse_expr_list()?;

        if let Some(op) = assign_op(self.peek_tok()) {
            self.advance();
            if range_ok
                && matches!(self.peek_tok(), Token::Range)
                && matches!(op, AssignOp::Assign | AssignOp::Define)
            {
                self.advance();
                let x = self.parse_expr()?;
                let mut lhs = lhs.into_iter();
                let key = lhs.next();
                let value = lhs.next();
                if let Some(extra) = lhs.next() {
                    return Err(self.error(extra.span, "range clause permits at most two iteration variables"));
                }
                return Ok(SimpleStmt::Range {
                    key,
                    value,
                    op: Some(op),
                    x,
                });
            }
            let rhs = self.parse_expr_list()?;
            return Ok(SimpleStmt::Stmt(Stmt::new(
                StmtKind::Assign { lhs, op, rhs },
                self.span_from(start),
            )));
        }

        let mut lhs = lhs;
        if lhs.len() > 1 {
            return Err(self.error_expected("1 expression"));
        }
        let x = lhs.remove(0);

        if label_ok && matches!(self.peek_tok(), Token::Colon) {
            if let ExprKind::Ident(label) = x.kind {
                self.advance();
                let stmt = if matches!(self.peek_tok(), Token::RBrace) {
                    Stmt::new(StmtKind::Empty, self.current_span())
                } else {
                    self.parse_stmt()?
                };
                let kind = StmtKind::Labeled {
                    label,
                    stmt: Box::new(stmt),
                };
                return Ok(SimpleStmt::Stmt(Stmt::new(kind, self.span_from(start))));
            }
        }

        let kind = match self.peek_tok() {
            Token::Arrow => {
                self.advance();
                let value = self.parse_expr()?;
                StmtKind::Send { chan: x, value }
            }
            Token::Inc | Token::Dec => {
                let inc = matches!(self.peek_tok(), Token::Inc);
                self.advance();
                StmtKind::IncDec { x, inc }
            }
            _ => StmtKind::Expr(x),
        };
        Ok(SimpleStmt::Stmt(Stmt::new(kind, self.span_from(start))))
    }

    /// Converts the condition slot of a control clause into an expression.
    fn make_condition(&self, stmt: Stmt, keyword: &str) -> PResult<Expr> {
        match stmt.kind {
            StmtKind::Expr(x) => Ok(x),
            _ => Err(self.error(
                stmt.span,
                format!(
                    "cannot use {} as value in {} condition",
                    describe_simple_stmt(&stmt.kind),
                    keyword
                ),
            )),
        }
    }

    fn parse_if_stmt(&mut self) -> PResult<Stmt> {
        let start = self.expect(&Token::If)?;
        if matches!(self.peek_tok(), Token::LBrace) {
            return Err(self.error(self.current_span(), "missing condition in if statement"));
        }

        let saved = self.expr_lev;
        self.expr_lev = -1;
        let header = self.parse_if_header();
        self.expr_lev = saved;
        let (init, cond) = header?;

        let body = self.parse_block()?;
        let els = if self.eat(&Token::Else) {
            match self.peek_tok() {
                Token::If => Some(Box::new(self.parse_if_stmt()?)),
                Token::LBrace => {
                    let else_start = self.current_span();
                    let block = self.parse_block()?;
                    Some(Box::new(Stmt::new(
                        StmtKind::Block(block),
                        self.span_from(else_start),
                    )))
                }
                _ => return Err(self.error_expected("if statement or block")),
            }
        } else {
            None
        };

        Ok(Stmt::new(
            StmtKind::If(IfStmt {
                init,
                cond,
                body,
                els,
            }),
            self.span_from(start),
        ))
    }

    fn parse_if_header(&mut self) -> PResult<(Option<Box<Stmt>>, Expr)> {
        let mut init = None;
        let first = if self.at_semicolon() {
            None
        } else {
            Some(self.parse_simple_stmt(false)?)
        };
        let cond_stmt = if self.at_semicolon() {
            self.advance();
            init = first.map(Box::new);
            if matches!(self.peek_tok(), Token::LBrace) {
                return Err(self.error(self.current_span(), "missing condition in if statement"));
            }
            self.parse_simple_stmt(false)?
        } else {
            match first {
                Some(stmt) => stmt,
                None => return Err(self.error(self.current_span(), "missing condition in if statement")),
            }
        };
        let cond = self.make_condition(cond_stmt, "if")?;
        Ok((init, cond))
    }

    fn parse_for_stmt(&mut self) -> PResult<Stmt> {
        let start = self.expect(&Token::For)?;
        let saved = self.expr_lev;
        self.expr_lev = -1;
        let header = self.parse_for_header();
        self.expr_lev = saved;
        let header = header?;
        let body = self.parse_block()?;

        let kind = match header {
            ForHeader::Range { key, value, op, x } => StmtKind::Range(RangeStmt {
                key,
                value,
                op,
                x,
                body,
            }),
            ForHeader::Loop { init, cond, post } => StmtKind::For(ForStmt {
                init,
                cond,
                post,
                body,
            }),
        };
        Ok(Stmt::new(kind, self.span_from(start)))
    }

    fn parse_for_header(&mut self) -> PResult<ForHeader> {
        if matches!(self.peek_tok(), Token::LBrace) {
            return Ok(ForHeader::Loop {
                init: None,
                cond: None,
                post: None,
            });
        }
        if self.eat(&Token::Range) {
            let x = self.parse_expr()?;
            return Ok(ForHeader::Range {
                key: None,
                value: None,
                op: None,
                x,
            });
        }

        let first = if self.at_semicolon() {
            None
        } else {
            match self.parse_simple_stmt_or_range(false, true)? {
                SimpleStmt::Range { key, value, op, x } => {
                    return Ok(ForHeader::Range { key, value, op, x })
                }
                SimpleStmt::Stmt(stmt) => Some(stmt),
            }
        };

        if !self.at_semicolon() {
            let cond = match first {
                Some(stmt) => Some(self.make_condition(stmt, "for")?),
                None => None,
            };
            return Ok(ForHeader::Loop {
                init: None,
                cond,
                post: None,
            });
        }

        self.advance();
        let cond = if self.at_semicolon() {
            None
        } else {
            let stmt = self.parse_simple_stmt(false)?;
            Some(self.make_condition(stmt, "for")?)
        };
        if !self.at_semicolon() {
            return Err(self.error_expected("';'"));
        }
        self.advance();
        let post = if matches!(self.peek_tok(), Token::LBrace) {
            None
        } else {
            let stmt = self.parse_simple_stmt(false)?;
            if let StmtKind::Assign {
                op: AssignOp::Define,
                ..
            } = stmt.kind
            {
                return Err(self.error(stmt.span, "cannot declare in post statement of for loop"));
            }
            Some(Box::new(stmt))
        };
        Ok(ForHeader::Loop {
            init: first.map(Box::new),
            cond,
            post,
        })
    }

    fn parse_switch_stmt(&mut self) -> PResult<Stmt> {
        let start = self.expect(&Token::Switch)?;
        let saved = self.expr_lev;
        self.expr_lev = -1;
        let header = self.parse_switch_header();
        self.expr_lev = saved;
        let (init, tag) = header?;

        self.expect(&Token::LBrace)?;
        let mut clauses = Vec::new();
        while matches!(self.peek_tok(), Token::Case | Token::Default) {
            clauses.push(self.parse_case_clause()?);
        }
        self.expect(&Token::RBrace)?;

        let kind = match tag {
            Some(stmt) if is_type_switch_guard(&stmt) => StmtKind::TypeSwitch(TypeSwitchStmt {
                init,
                assign: Box::new(stmt),
                clauses,
            }),
            Some(stmt) => StmtKind::Switch(SwitchStmt {
                init,
                tag: Some(self.make_condition(stmt, "switch")?),
                clauses,
            }),
            None => StmtKind::Switch(SwitchStmt {
                init,
                tag: None,
                clauses,
            }),
        };
        Ok(Stmt::new(kind, self.span_from(start)))
    }

    fn parse_switch_header(&mut self) -> PResult<(Option<Box<Stmt>>, Option<Stmt>)> {
        if matches!(self.peek_tok(), Token::LBrace) {
            return Ok((None, None));
        }
        let mut tag = if self.at_semicolon() {
            None
        } else {
            Some(self.parse_simple_stmt(false)?)
        };
        let mut init = None;
        if self.at_semicolon() {
            self.advance();
            init = tag.take().map(Box::new);
            if !matches!(self.peek_tok(), Token::LBrace) {
                tag = Some(self.parse_simple_stmt(false)?);
            }
        }
        Ok((init, tag))
    }

    fn parse_case_clause(&mut self) -> PResult<CaseClause> {
        let start = self.current_span();
        let exprs = if self.eat(&Token::Case) {
            Some(self.parse_expr_list()?)
        } else {
            self.expect(&Token::Default)?;
            None
        };
        self.expect(&Token::Colon)?;
        let body = self.parse_stmt_list()?;
        Ok(CaseClause {
            exprs,
            body,
            span: self.span_from(start),
        })
    }

    fn parse_select_stmt(&mut self) -> PResult<Stmt> {
        let start = self.expect(&Token::Select)?;
        self.expect(&Token::LBrace)?;
        let mut clauses = Vec::new();
        while matches!(self.peek_tok(), Token::Case | Token::Default) {
            let clause_start = self.current_span();
            let comm = if self.eat(&Token::Case) {
                Some(Box::new(self.parse_simple_stmt(false)?))
            } else {
                self.expect(&Token::Default)?;
                None
            };
            self.expect(&Token::Colon)?;
            let body = self.parse_stmt_list()?;
            clauses.push(CommClause {
                comm,
                body,
                span: self.span_from(clause_start),
            });
        }
        self.expect(&Token::RBrace)?;
        Ok(Stmt::new(StmtKind::Select(clauses), self.span_from(start)))
    }

    // -----------------------------------------------------------------------
    // Expressions
    // -----------------------------------------------------------------------

    fn parse_expr_list(&mut self) -> PResult<Vec<Expr>> {
        let mut exprs = vec![self.parse_expr()?];
        while self.eat(&Token::Comma) {
            exprs.push(self.parse_expr()?);
        }
        Ok(exprs)
    }

    pub fn parse_expr(&mut self) -> PResult<Expr> {
        self.parse_binary_expr(1)
    }

    fn parse_binary_expr(&mut self, min_prec: u8) -> PResult<Expr> {
        let mut x = self.parse_unary_expr()?;
        loop {
            let prec = self.peek_tok().precedence();
            if prec < min_prec {
                return Ok(x);
            }
            let Some(op) = binary_op(self.peek_tok()) else {
                return Ok(x);
            };
            self.advance();
            let y = self.parse_binary_expr(prec + 1)?;
            let span = x.span.merge(y.span);
            x = Expr::new(
                ExprKind::Binary {
                    op,
                    x: Box::new(x),
                    y: Box::new(y),
                },
                span,
            );
        }
    }

    fn parse_unary_expr(&mut self) -> PResult<Expr> {
        let start = self.current_span();
        let op = match self.peek_tok() {
            Token::Add => UnaryOp::Plus,
            Token::Sub => UnaryOp::Neg,
            Token::Not => UnaryOp::Not,
            Token::Xor => UnaryOp::BitNot,
            Token::And => UnaryOp::Addr,
            Token::Tilde => UnaryOp::Tilde,
            Token::Arrow => {
                if matches!(self.peek_at(1), Token::Chan) {
                    return self.parse_type();
                }
                UnaryOp::Recv
            }
            Token::Mul => {
                self.advance();
                let x = self.parse_unary_expr()?;
                return Ok(Expr::new(
                    ExprKind::Star(Box::new(x)),
                    self.span_from(start),
                ));
            }
            _ => return self.parse_primary_expr(),
        };
        self.advance();
        let x = self.parse_unary_expr()?;
        Ok(Expr::new(
            ExprKind::Unary {
                op,
                x: Box::new(x),
            },
            self.span_from(start),
        ))
    }

    fn parse_operand(&mut self) -> PResult<Expr> {
        let start = self.current_span();
        match self.peek_tok() {
            Token::Ident(_) => {
                let ident = self.expect_ident()?;
                Ok(Expr::new(ExprKind::Ident(ident), start))
            }
            Token::Literal(kind, value) => {
                let lit = BasicLit {
                    kind: *kind,
                    value: value.clone(),
                    span: start,
                };
                self.advance();
                Ok(Expr::new(ExprKind::BasicLit(lit), start))
            }
            Token::LParen => {
                self.advance();
                self.expr_lev += 1;
                let inner = self.parse_expr();
                self.expr_lev -= 1;
                let inner = inner?;
                self.expect(&Token::RParen)?;
                Ok(Expr::new(
                    ExprKind::Paren(Box::new(inner)),
                    self.span_from(start),
                ))
            }
            Token::Func => {
                self.advance();
                let (params, results) = self.parse_signature()?;
                let ty = FuncType {
                    type_params: None,
                    params,
                    results,
                    span: self.span_from(start),
                };
                if matches!(self.peek_tok(), Token::LBrace) {
                    let body = self.parse_body()?;
                    Ok(Expr::new(
                        ExprKind::FuncLit(FuncLit { ty, body }),
                        self.span_from(start),
                    ))
                } else {
                    let span = ty.span;
                    Ok(Expr::new(ExprKind::FuncType(ty), span))
                }
            }
            Token::LBrack | Token::Struct | Token::Map | Token::Chan | Token::Interface => {
                self.parse_type()
            }
            _ => Err(self.error_expected("operand")),
        }
    }

    fn parse_primary_expr(&mut self) -> PResult<Expr> {
        let mut x = self.parse_operand()?;
        loop {
            let start = x.span;
            match self.peek_tok() {
                Token::Period => {
                    self.advance();
                    match self.peek_tok() {
                        Token::Ident(_) => {
                            let sel = self.expect_ident()?;
                            x = Expr::new(
                                ExprKind::Selector {
                                    x: Box::new(x),
                                    sel,
                                },
                                self.span_from(start),
                            );
                        }
                        Token::LParen => {
                            self.advance();
                            let ty = if self.eat(&Token::Type) {
                                None
                            } else {
                                Some(Box::new(self.parse_type()?))
                            };
                            self.expect(&Token::RParen)?;
                            x = Expr::new(
                                ExprKind::TypeAssert {
                                    x: Box::new(x),
                                    ty,
                                },
                                self.span_from(start),
                            );
                        }
                        _ => return Err(self.error_expected("selector or type assertion")),
                    }
                }
                Token::LBrack => {
                    self.advance();
                    self.expr_lev += 1;
                    let index = self.parse_index_or_slice(x);
                    self.expr_lev -= 1;
                    x = index?;
                }
                Token::LParen => {
                    self.advance();
                    self.expr_lev += 1;
                    let args = self.parse_call_args();
                    self.expr_lev -= 1;
                    let (args, has_ellipsis) = args?;
                    self.expect(&Token::RParen)?;
                    let span = self.span_from(start);
                    x = Expr::new(
                        ExprKind::Call(CallExpr {
                            fun: Box::new(x),
                            args,
                            has_ellipsis,
                            span,
                        }),
                        span,
                    );
                }
                Token::LBrace if is_literal_type(&x) && (self.expr_lev >= 0 || !is_type_name(&x)) => {
                    x = self.parse_literal_value(Some(x))?;
                }
                _ => return Ok(x),
            }
        }
    }

    /// Parses the part of `x[...]` after the opening bracket.
    fn parse_index_or_slice(&mut self, x: Expr) -> PResult<Expr> {
        let start = x.span;
        let mut index: [Option<Box<Expr>>; 3] = [None, None, None];
        let mut colons = 0;
        if !matches!(self.peek_tok(), Token::Colon) {
            index[0] = Some(Box::new(self.parse_expr()?));
        }
        while colons < 2 && matches!(self.peek_tok(), Token::Colon) {
            let colon = self.advance();
            colons += 1;
            match self.peek_tok() {
                Token::Colon | Token::RBrack => {
                    if colons == 2 {
                        return Err(self.error(colon, "final index required in 3-index slice"));
                    }
                }
                _ => index[colons] = Some(Box::new(self.parse_expr()?)),
            }
        }
        self.expect(&Token::RBrack)?;

        let [low, high, max] = index;
        if colons == 0 {
            let index = match low {
                Some(index) => index,
                None => return Err(self.error(start, "expected operand")),
            };
            return Ok(Expr::new(
                ExprKind::Index {
                    x: Box::new(x),
                    index,
                },
                self.span_from(start),
            ));
        }
        if colons == 2 && high.is_none() {
            return Err(self.error(start, "middle index required in 3-index slice"));
        }
        Ok(Expr::new(
            ExprKind::Slice {
                x: Box::new(x),
                low,
                high,
                max,
            },
            self.span_from(start),
        ))
    }

    fn parse_call_args(&mut self) -> PResult<(Vec<Expr>, bool)> {
        let mut args = Vec::new();
        let mut has_ellipsis = false;
        while !matches!(self.peek_tok(), Token::RParen | Token::Eof) {
            args.push(self.parse_expr()?);
            if self.eat(&Token::Ellipsis) {
                has_ellipsis = true;
            }
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        Ok((args, has_ellipsis))
    }

    fn parse_literal_value(&mut self, ty: Option<Expr>) -> PResult<Expr> {
        let start = match &ty {
            Some(ty) => ty.span,
            None => self.current_span(),
        };
        self.expect(&Token::LBrace)?;
        self.expr_lev += 1;
        let elts = self.parse_literal_elements();
        self.expr_lev -= 1;
        let elts = elts?;
        self.expect(&Token::RBrace)?;
        Ok(Expr::new(
            ExprKind::CompositeLit {
                ty: ty.map(Box::new),
                elts,
            },
            self.span_from(start),
        ))
    }

    fn parse_literal_elements(&mut self) -> PResult<Vec<Expr>> {
        let mut elts = Vec::new();
        while !matches!(self.peek_tok(), Token::RBrace | Token::Eof) {
            let key = self.parse_element()?;
            let elt = if self.eat(&Token::Colon) {
                let value = self.parse_element()?;
                let span = key.span.merge(value.span);
                Expr::new(
                    ExprKind::KeyValue {
                        key: Box::new(key),
                        value: Box::new(value),
                    },
                    span,
                )
            } else {
                key
            };
            elts.push(elt);
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        Ok(elts)
    }

    fn parse_element(&mut self) -> PResult<Expr> {
        if matches!(self.peek_tok(), Token::LBrace) {
            self.parse_literal_value(None)
        } else {
            self.parse_expr()
        }
    }
}

enum ForHeader {
    Loop {
        init: Option<Box<Stmt>>,
        cond: Option<Expr>,
        post: Option<Box<Stmt>>,
    },
    Range {
        key: Option<Expr>,
        value: Option<Expr>,
        op: Option<AssignOp>,
        x: Expr,
    },
}

fn binary_op(token: &Token) -> Option<BinaryOp> {
    Some(match token {
        Token::Add => BinaryOp::Add,
        Token::Sub => BinaryOp::Sub,
        Token::Mul => BinaryOp::Mul,
        Token::Quo => BinaryOp::Quo,
        Token::Rem => BinaryOp::Rem,
        Token::And => BinaryOp::And,
        Token::Or => BinaryOp::Or,
        Token::Xor => BinaryOp::Xor,
        Token::Shl => BinaryOp::Shl,
        Token::Shr => BinaryOp::Shr,
        Token::AndNot => BinaryOp::AndNot,
        Token::LAnd => BinaryOp::LAnd,
        Token::LOr => BinaryOp::LOr,
        Token::Eql => BinaryOp::Eql,
        Token::Neq => BinaryOp::Neq,
        Token::Lss => BinaryOp::Lss,
        Token::Leq => BinaryOp::Leq,
        Token::Gtr => BinaryOp::Gtr,
        Token::Geq => BinaryOp::Geq,
        _ => return None,
    })
}

fn assign_op(token: &Token) -> Option<AssignOp> {
    Some(match token {
        Token::Assign => AssignOp::Assign,
        Token::Define => AssignOp::Define,
        Token::AddAssign => AssignOp::Add,
        Token::SubAssign => AssignOp::Sub,
        Token::MulAssign => AssignOp::Mul,
        Token::QuoAssign => AssignOp::Quo,
        Token::RemAssign => AssignOp::Rem,
        Token::AndAssign => AssignOp::And,
        Token::OrAssign => AssignOp::Or,
        Token::XorAssign => AssignOp::Xor,
        Token::ShlAssign => AssignOp::Shl,
        Token::ShrAssign => AssignOp::Shr,
        Token::AndNotAssign => AssignOp::AndNot,
        _ => return None,
    })
}

fn is_type_name(x: &Expr) -> bool {
    match &x.kind {
        ExprKind::Ident(_) => true,
        ExprKind::Selector { x, .. } => matches!(x.kind, ExprKind::Ident(_)),
        _ => false,
    }
}

fn is_literal_type(x: &Expr) -> bool {
    match &x.kind {
        ExprKind::ArrayType { .. } | ExprKind::StructType(_) | ExprKind::MapType { .. } => true,
        ExprKind::Index { x, .. } => is_type_name(x),
        _ => is_type_name(x),
    }
}

fn is_type_switch_guard(stmt: &Stmt) -> bool {
    let guard = match &stmt.kind {
        StmtKind::Expr(x) => x,
        StmtKind::Assign {
            op: AssignOp::Define,
            lhs,
            rhs,
        } if lhs.len() == 1 && rhs.len() == 1 => &rhs[0],
        _ => return false,
    };
    matches!(guard.kind, ExprKind::TypeAssert { ty: None, .. })
}

fn describe_simple_stmt(kind: &StmtKind) -> &'static str {
    match kind {
        StmtKind::Assign {
            op: AssignOp::Define,
            ..
        } => "short variable declaration",
        StmtKind::Assign { .. } => "assignment",
        StmtKind::IncDec { .. } => "increment statement",
        StmtKind::Send { .. } => "send statement",
        _ => "statement",
    }
}
