// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Translates function signatures into parallel name and type lists.

use goslang_ir::Node;
use goslang_syntax::ast::{FieldList, FuncType};
use log::debug;

use super::ExpressionTranslator;

pub struct SignatureTranslator;

impl SignatureTranslator {
    /// A generic signature rejects the whole function type.
    pub fn translate_func_type(&self, ty: &FuncType) -> Node {
        if ty.type_params.is_some() {
            debug!("rejecting generic signature");
            return Node::error("Generics not supported");
        }
        let (params, param_types) = self.translate_fields(Some(&ty.params));
        let (results, result_types) = self.translate_fields(ty.results.as_ref());
        Node::FuncType {
            params,
            results,
            param_types,
            result_types,
        }
    }

    /// Returns the declared names and one type per name. Lists whose first
    /// group is unnamed are treated as unnamed throughout: no names, one
    /// type per group.
    pub fn translate_fields(&self, list: Option<&FieldList>) -> (Vec<Node>, Vec<Node>) {
        let Some(list) = list.filter(|list| !list.is_empty()) else {
            return (Vec::new(), Vec::new());
        };

        if list.fields[0].names.is_empty() {
            let types = list
                .fields
                .iter()
                .map(|field| ExpressionTranslator.translate(&field.ty))
                .collect();
            return (Vec::new(), types);
        }

        let mut names = Vec::with_capacity(list.arity());
        let mut types = Vec::with_capacity(list.arity());
        for field in &list.fields {
            // One translation per group, shared by all of its names.
            let ty = ExpressionTranslator.translate(&field.ty);
            for name in &field.names {
                names.push(Node::ident(&name.name));
                types.push(ty.clone());
            }
        }
        (names, types)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use goslang_syntax::ast::Decl;
    use goslang_syntax::parse_file;

    fn signature_of(source: &str) -> Node {
        let file = parse_file(&format!("package p\n\n{}\n", source)).unwrap();
        let Decl::Func(func) = &file.decls[0] else {
            panic!("expected a function");
        };
        SignatureTranslator.translate_func_type(&func.ty)
    }

    fn idents(names: &[&str]) -> Vec<Node> {
        names.iter().map(|name| Node::ident(*name)).collect()
    }

    #[test]
    fn test_grouped_names_share_their_type() {
        assert_eq!(
            signature_of("func f(a, b int, c float64) {}"),
            Node::FuncType {
                params: idents(&["a", "b", "c"]),
                results: vec![],
                param_types: idents(&["int", "int", "float64"]),
                result_types: vec![],
            }
        );
    }

    #[test]
    fn test_uneven_groups_stay_aligned() {
        assert_eq!(
            signature_of("func f(a bool, b, c, d int, e float64) (x, y int) { return }"),
            Node::FuncType {
                params: idents(&["a", "b", "c", "d", "e"]),
                results: idents(&["x", "y"]),
                param_types: idents(&["bool", "int", "int", "int", "float64"]),
                result_types: idents(&["int", "int"]),
            }
        );
    }

    #[test]
    fn test_unnamed_lists() {
        assert_eq!(
            signature_of("func f(int, float64) (int, int, int) { return 1, 2, 3 }"),
            Node::FuncType {
                params: vec![],
                results: vec![],
                param_types: idents(&["int", "float64"]),
                result_types: idents(&["int", "int", "int"]),
            }
        );
    }

    #[test]
    fn test_empty_lists() {
        assert_eq!(
            signature_of("func f() {}"),
            Node::FuncType {
                params: vec![],
                results: vec![],
                param_types: vec![],
                result_types: vec![],
            }
        );
    }

    #[test]
    fn test_func_typed_parameter() {
        let int = Node::ident("int");
        assert_eq!(
            signature_of("func apply(f func(int) int, x int) int { return f(x) }"),
            Node::FuncType {
                params: idents(&["f", "x"]),
                results: vec![],
                param_types: vec![
                    Node::FuncType {
                        params: vec![],
                        results: vec![],
                        param_types: vec![int.clone()],
                        result_types: vec![int.clone()],
                    },
                    int.clone(),
                ],
                result_types: vec![int],
            }
        );
    }

    #[test]
    fn test_generics_reject_the_signature() {
        assert_eq!(
            signature_of("func id[T any](x T) T { return x }"),
            Node::error("Generics not supported")
        );
    }

    #[test]
    fn test_unsupported_parameter_types() {
        let Node::FuncType { param_types, .. } = signature_of("func f(p *int, xs ...int) {}") else {
            panic!("expected funcType");
        };
        assert_eq!(
            param_types,
            vec![
                Node::error("Unsupported language feature: StarExpr"),
                Node::error("Unsupported language feature: Ellipsis"),
            ]
        );
    }
}
