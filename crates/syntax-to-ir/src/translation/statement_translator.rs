// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Translates statements to IR nodes.

use goslang_ir::Node;
use goslang_syntax::ast::{AssignOp, BlockStmt, Expr, IfStmt, Stmt, StmtKind};
use log::trace;

use super::{unsupported, DeclarationTranslator, ExpressionTranslator};

pub struct StatementTranslator;

impl StatementTranslator {
    pub fn translate(&self, stmt: &Stmt) -> Node {
        trace!("translating {}", stmt.kind_name());
        match &stmt.kind {
            StmtKind::Expr(x) => ExpressionTranslator.translate(x),
            StmtKind::Decl(gen) => DeclarationTranslator.translate_gen_decl(gen),
            StmtKind::Assign { lhs, op, rhs } => self.translate_assign(lhs, *op, rhs),
            StmtKind::Block(block) => self.translate_block(block),
            StmtKind::Return(results) => Node::Return {
                results: self.translate_exprs(results),
            },
            StmtKind::If(stmt) => self.translate_if(stmt),
            StmtKind::Go(call) => Node::Go {
                call: Box::new(ExpressionTranslator.translate_call(call)),
            },

            StmtKind::Empty
            | StmtKind::Labeled { .. }
            | StmtKind::IncDec { .. }
            | StmtKind::Send { .. }
            | StmtKind::Defer(_)
            | StmtKind::Branch { .. }
            | StmtKind::For(_)
            | StmtKind::Range(_)
            | StmtKind::Switch(_)
            | StmtKind::TypeSwitch(_)
            | StmtKind::Select(_) => unsupported(stmt.kind_name()),
        }
    }

    /// Wraps the statements of a block in a `seq`, keeping source order.
    pub fn translate_block(&self, block: &BlockStmt) -> Node {
        Node::block(block.stmts.iter().map(|stmt| self.translate(stmt)).collect())
    }

    fn translate_exprs(&self, exprs: &[Expr]) -> Vec<Node> {
        exprs.iter().map(|x| ExpressionTranslator.translate(x)).collect()
    }

    fn translate_assign(&self, lhs: &[Expr], op: AssignOp, rhs: &[Expr]) -> Node {
        if op != AssignOp::Assign || lhs.len() != rhs.len() {
            return Node::error("Only simple assignments are supported");
        }
        Node::Assign {
            idents: self.translate_exprs(lhs),
            vals: self.translate_exprs(rhs),
            op: op.as_str().to_string(),
        }
    }

    /// A missing else branch becomes `nop`; `else if` nests another `if`.
    fn translate_if(&self, stmt: &IfStmt) -> Node {
        if stmt.init.is_some() {
            return Node::error("Init statement in if not supported");
        }
        let els = match &stmt.els {
            Some(els) => self.translate(els),
            None => Node::nop(),
        };
        Node::If {
            cond: Box::new(ExpressionTranslator.translate(&stmt.cond)),
            then: Box::new(self.translate_block(&stmt.body)),
            els: Box::new(els),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use goslang_syntax::ast::Decl;
    use goslang_syntax::parse_file;

    /// Translates the statements of `func f() { <body> }`.
    fn translate_body(body: &str) -> Vec<Node> {
        let file = parse_file(&format!("package p\n\nfunc f() {{\n{}\n}}\n", body)).unwrap();
        let Decl::Func(func) = &file.decls[0] else {
            panic!("expected a function");
        };
        let body = func.body.as_ref().expect("function body");
        body.stmts.iter().map(|stmt| StatementTranslator.translate(stmt)).collect()
    }

    #[test]
    fn test_simple_assignment() {
        assert_eq!(
            translate_body("z = z + x"),
            vec![Node::Assign {
                idents: vec![Node::ident("z")],
                vals: vec![Node::binop("+", Node::ident("z"), Node::ident("x"))],
                op: "=".to_string(),
            }]
        );
        assert_eq!(
            translate_body("a, _ = 1, 2"),
            vec![Node::Assign {
                idents: vec![Node::ident("a"), Node::ident("_")],
                vals: vec![Node::int(1), Node::int(2)],
                op: "=".to_string(),
            }]
        );
    }

    #[test]
    fn test_other_assignments_are_rejected() {
        let rejected = Node::error("Only simple assignments are supported");
        assert_eq!(translate_body("x += 1"), vec![rejected.clone()]);
        assert_eq!(translate_body("y := 2"), vec![rejected.clone()]);
        assert_eq!(translate_body("a, b = f()"), vec![rejected]);
    }

    #[test]
    fn test_if_without_else_gets_nop() {
        assert_eq!(
            translate_body("if x > 0 {\n\tg(x)\n}"),
            vec![Node::If {
                cond: Box::new(Node::binop(">", Node::ident("x"), Node::int(0))),
                then: Box::new(Node::block(vec![Node::call(
                    Node::ident("g"),
                    vec![Node::ident("x")]
                )])),
                els: Box::new(Node::nop()),
            }]
        );
    }

    #[test]
    fn test_else_if_chain_nests() {
        let nodes = translate_body("if a {\n} else if b {\n} else {\n\treturn\n}");
        let Node::If { els, .. } = &nodes[0] else {
            panic!("expected if");
        };
        let Node::If { cond, els: inner_else, .. } = els.as_ref() else {
            panic!("expected nested if, got {:?}", els);
        };
        assert_eq!(**cond, Node::ident("b"));
        assert_eq!(**inner_else, Node::block(vec![Node::Return { results: vec![] }]));
    }

    #[test]
    fn test_if_with_init_is_rejected() {
        assert_eq!(
            translate_body("if v := 1; v > 0 {\n}"),
            vec![Node::error("Init statement in if not supported")]
        );
    }

    #[test]
    fn test_blocks_go_and_return() {
        assert_eq!(
            translate_body("{\n}\ngo worker(1)\nreturn"),
            vec![
                Node::block(vec![]),
                Node::Go {
                    call: Box::new(Node::call(Node::ident("worker"), vec![Node::int(1)]))
                },
                Node::Return { results: vec![] },
            ]
        );
    }

    #[test]
    fn test_unsupported_statements_are_isolated() {
        assert_eq!(
            translate_body("for i := 0; i < 3; i = i + 1 {\n}\ncount++\nprintln(count)"),
            vec![
                Node::error("Unsupported language feature: ForStmt"),
                Node::error("Unsupported language feature: IncDecStmt"),
                Node::call(Node::ident("println"), vec![Node::ident("count")]),
            ]
        );
        assert_eq!(
            translate_body("defer cleanup()"),
            vec![Node::error("Unsupported language feature: DeferStmt")]
        );
        assert_eq!(
            translate_body("switch {\n}"),
            vec![Node::error("Unsupported language feature: SwitchStmt")]
        );
    }

    #[test]
    fn test_local_declarations() {
        assert_eq!(
            translate_body("var y int = 1"),
            vec![Node::VarDecl {
                spec: Box::new(Node::Spec {
                    idents: vec![Node::ident("y")],
                    types: vec![Node::ident("int")],
                    vals: vec![Node::int(1)],
                })
            }]
        );
    }
}
