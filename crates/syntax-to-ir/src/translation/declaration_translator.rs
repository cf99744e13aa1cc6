// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Translates constant, variable and function declarations.
//!
//! Value declarations must be ungrouped and carry an explicit type; a
//! violation rejects the whole declaration rather than translating part of it.

use goslang_ir::Node;
use goslang_syntax::ast::{Decl, DeclKeyword, FuncDecl, GenDecl, Spec, ValueSpec};
use log::{debug, trace};

use super::{unsupported, ExpressionTranslator, SignatureTranslator, StatementTranslator};

pub struct DeclarationTranslator;

impl DeclarationTranslator {
    pub fn translate(&self, decl: &Decl) -> Node {
        match decl {
            Decl::Gen(gen) => self.translate_gen_decl(gen),
            Decl::Func(func) if func.recv.is_none() => self.translate_func_decl(func),
            // Methods are outside the supported grammar.
            Decl::Func(_) => unsupported(decl.kind_name()),
        }
    }

    pub fn translate_gen_decl(&self, gen: &GenDecl) -> Node {
        if gen.is_grouped() {
            debug!("rejecting grouped {:?} declaration", gen.keyword);
            return Node::error("Unsupported declaration type");
        }
        let spec = match (gen.keyword, gen.specs.first()) {
            (DeclKeyword::Const | DeclKeyword::Var, Some(Spec::Value(spec))) => spec,
            _ => return Node::error("Unsupported declaration type"),
        };
        let Some(spec) = self.translate_value_spec(spec) else {
            return Node::error("Type inference not supported");
        };
        match gen.keyword {
            DeclKeyword::Const => Node::ConstDecl {
                spec: Box::new(spec),
            },
            _ => Node::VarDecl {
                spec: Box::new(spec),
            },
        }
    }

    /// `None` when the spec has no declared type.
    fn translate_value_spec(&self, spec: &ValueSpec) -> Option<Node> {
        let ty = ExpressionTranslator.translate(spec.ty.as_ref()?);
        trace!(
            "spec with {} names and {} values",
            spec.names.len(),
            spec.values.len()
        );
        Some(Node::Spec {
            idents: spec.names.iter().map(|name| Node::ident(&name.name)).collect(),
            types: vec![ty; spec.names.len()],
            vals: spec
                .values
                .iter()
                .map(|value| ExpressionTranslator.translate(value))
                .collect(),
        })
    }

    pub fn translate_func_decl(&self, func: &FuncDecl) -> Node {
        debug!("translating function {}", func.name.name);
        let body = match &func.body {
            Some(body) => StatementTranslator.translate_block(body),
            None => Node::error("Function body missing"),
        };
        Node::FuncDecl {
            name: func.name.name.clone(),
            ty: Box::new(SignatureTranslator.translate_func_type(&func.ty)),
            body: Box::new(body),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use goslang_syntax::parse_file;

    fn translate_first(source: &str) -> Node {
        let file = parse_file(&format!("package p\n\n{}\n", source)).unwrap();
        DeclarationTranslator.translate(&file.decls[0])
    }

    #[test]
    fn test_const_declaration() {
        assert_eq!(
            translate_first("const x int = 4 + 2"),
            Node::ConstDecl {
                spec: Box::new(Node::Spec {
                    idents: vec![Node::ident("x")],
                    types: vec![Node::ident("int")],
                    vals: vec![Node::binop("+", Node::int(4), Node::int(2))],
                })
            }
        );
    }

    #[test]
    fn test_type_is_broadcast_and_values_may_be_fewer() {
        let Node::VarDecl { spec } = translate_first("var a, b, c float64") else {
            panic!("expected varDecl");
        };
        assert_eq!(
            *spec,
            Node::Spec {
                idents: vec![Node::ident("a"), Node::ident("b"), Node::ident("c")],
                types: vec![Node::ident("float64"); 3],
                vals: vec![],
            }
        );
    }

    #[test]
    fn test_declaration_rejections() {
        assert_eq!(
            translate_first("var x = 1"),
            Node::error("Type inference not supported")
        );
        assert_eq!(
            translate_first("const (\n\ta int = 1\n\tb int = 2\n)"),
            Node::error("Unsupported declaration type")
        );
        assert_eq!(
            translate_first("var (\n\tsolo int = 1\n)"),
            Node::error("Unsupported declaration type")
        );
        assert_eq!(
            translate_first("type T int"),
            Node::error("Unsupported declaration type")
        );
        assert_eq!(
            translate_first("import \"fmt\""),
            Node::error("Unsupported declaration type")
        );
    }

    #[test]
    fn test_function_declaration() {
        let node = translate_first("func double(n int) int {\n\treturn n * 2\n}");
        let Node::FuncDecl { name, ty, body } = node else {
            panic!("expected funcDecl");
        };
        assert_eq!(name, "double");
        assert_eq!(ty.tag(), "funcType");
        assert_eq!(
            *body,
            Node::block(vec![Node::Return {
                results: vec![Node::binop("*", Node::ident("n"), Node::int(2))]
            }])
        );
    }

    #[test]
    fn test_methods_and_bodiless_functions() {
        assert_eq!(
            translate_first("func (p point) norm() int { return 0 }"),
            Node::error("Unsupported language feature: MethodDecl")
        );
        let Node::FuncDecl { body, .. } = translate_first("func external(x int) int") else {
            panic!("expected funcDecl");
        };
        assert_eq!(*body, Node::error("Function body missing"));
    }
}
