// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Translates expressions to IR nodes.
//!
//! Parentheses only group and leave no trace in the IR. Every expression
//! kind outside the supported set becomes an `error` node naming the kind.

use goslang_ir::Node;
use goslang_syntax::ast::{CallExpr, Expr, ExprKind, FuncLit};
use log::trace;

use super::{unsupported, LiteralTranslator, SignatureTranslator, StatementTranslator};

pub struct ExpressionTranslator;

impl ExpressionTranslator {
    pub fn translate(&self, expr: &Expr) -> Node {
        trace!("translating {}", expr.kind_name());
        match &expr.kind {
            ExprKind::BasicLit(lit) => LiteralTranslator.translate(lit),
            ExprKind::Ident(ident) => Node::ident(&ident.name),
            ExprKind::Unary { op, x } => Node::unop(format!("{}u", op.as_str()), self.translate(x)),
            ExprKind::Binary { op, x, y } => {
                Node::binop(op.as_str(), self.translate(x), self.translate(y))
            }
            ExprKind::Paren(inner) => self.translate(inner),
            ExprKind::FuncLit(lit) => self.translate_func_lit(lit),
            ExprKind::Call(call) => self.translate_call(call),
            ExprKind::FuncType(ty) => SignatureTranslator.translate_func_type(ty),

            ExprKind::Selector { .. }
            | ExprKind::Index { .. }
            | ExprKind::Slice { .. }
            | ExprKind::TypeAssert { .. }
            | ExprKind::Star(_)
            | ExprKind::KeyValue { .. }
            | ExprKind::CompositeLit { .. }
            | ExprKind::ArrayType { .. }
            | ExprKind::MapType { .. }
            | ExprKind::ChanType { .. }
            | ExprKind::StructType(_)
            | ExprKind::InterfaceType(_)
            | ExprKind::Ellipsis(_) => unsupported(expr.kind_name()),
        }
    }

    /// Calls keep their callee and arguments in order; a trailing `...` on
    /// the last argument is not represented.
    pub fn translate_call(&self, call: &CallExpr) -> Node {
        let fun = self.translate(&call.fun);
        let args = call.args.iter().map(|arg| self.translate(arg)).collect();
        Node::call(fun, args)
    }

    fn translate_func_lit(&self, lit: &FuncLit) -> Node {
        Node::FuncLit {
            ty: Box::new(SignatureTranslator.translate_func_type(&lit.ty)),
            body: Box::new(StatementTranslator.translate_block(&lit.body)),
        }
    }
}
