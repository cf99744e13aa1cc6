// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! The IR node tree.
//!
//! A closed sum type with one variant per tag. Field sets are fixed per tag
//! and serialize in declaration order, right after the `tag` discriminator.

use serde::{Deserialize, Serialize};

/// Visit the direct children of a node, expanding `$action` inline for each
/// one.
macro_rules! traverse_node {
    ($target:expr, |$value:ident| $action:expr) => {
        match $target {
            Node::Error { .. } | Node::Lit(_) | Node::Ident { .. } | Node::Nop => {}
            Node::Binop { op1, op2, .. } => {
                let $value = &**op1;
                $action;
                let $value = &**op2;
                $action;
            }
            Node::Unop { op1, .. } => {
                let $value = &**op1;
                $action;
            }
            Node::FuncType {
                params,
                results,
                param_types,
                result_types,
            } => {
                for $value in params.iter().chain(results).chain(param_types).chain(result_types) {
                    $action;
                }
            }
            Node::FuncLit { ty, body } | Node::FuncDecl { ty, body, .. } => {
                let $value = &**ty;
                $action;
                let $value = &**body;
                $action;
            }
            Node::Spec { idents, types, vals } => {
                for $value in idents.iter().chain(types).chain(vals) {
                    $action;
                }
            }
            Node::ConstDecl { spec } | Node::VarDecl { spec } => {
                let $value = &**spec;
                $action;
            }
            Node::Assign { idents, vals, .. } => {
                for $value in idents.iter().chain(vals) {
                    $action;
                }
            }
            Node::Block { body } => {
                let $value = &**body;
                $action;
            }
            Node::Seq { stmts } => {
                for $value in stmts {
                    $action;
                }
            }
            Node::Call { fun, args } => {
                let $value = &**fun;
                $action;
                for $value in args {
                    $action;
                }
            }
            Node::Return { results } => {
                for $value in results {
                    $action;
                }
            }
            Node::If { cond, then, els } => {
                let $value = &**cond;
                $action;
                let $value = &**then;
                $action;
                let $value = &**els;
                $action;
            }
            Node::Go { call } => {
                let $value = &**call;
                $action;
            }
            Node::Package { decls } => {
                for $value in decls {
                    $action;
                }
            }
        }
    };
}

// ============================================================================
// Core IR Type
// ============================================================================

/// One node of the translated program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tag", rename_all = "camelCase")]
pub enum Node {
    /// Translation of this subtree failed; `val` is the diagnostic.
    Error { val: String },

    /// Scalar literal.
    Lit(Literal),

    /// Name reference; `_` is the blank identifier.
    Ident { val: String },

    Binop {
        op: String,
        op1: Box<Node>,
        op2: Box<Node>,
    },

    /// `op` carries the `u` suffix marking unary use (`-u`, `!u`).
    Unop { op: String, op1: Box<Node> },

    /// Function signature. `params`/`results` are empty for unnamed lists.
    FuncType {
        params: Vec<Node>,
        results: Vec<Node>,
        #[serde(rename = "paramTypes")]
        param_types: Vec<Node>,
        #[serde(rename = "resultTypes")]
        result_types: Vec<Node>,
    },

    FuncLit {
        #[serde(rename = "type")]
        ty: Box<Node>,
        body: Box<Node>,
    },

    FuncDecl {
        name: String,
        #[serde(rename = "type")]
        ty: Box<Node>,
        body: Box<Node>,
    },

    /// Names declared by one `const` or `var` line. `types` has one entry per
    /// ident; `vals` may be shorter.
    Spec {
        idents: Vec<Node>,
        types: Vec<Node>,
        vals: Vec<Node>,
    },

    ConstDecl { spec: Box<Node> },

    VarDecl { spec: Box<Node> },

    Assign {
        idents: Vec<Node>,
        vals: Vec<Node>,
        op: String,
    },

    Block { body: Box<Node> },

    Seq { stmts: Vec<Node> },

    Call { fun: Box<Node>, args: Vec<Node> },

    Return { results: Vec<Node> },

    /// `els` is [`Node::Nop`] when the source has no else branch.
    If {
        cond: Box<Node>,
        then: Box<Node>,
        #[serde(rename = "else")]
        els: Box<Node>,
    },

    Nop,

    Go { call: Box<Node> },

    Package { decls: Vec<Node> },
}

/// Payload of a `lit` node, serialized as `"kind"` and `"val"`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "val", rename_all = "lowercase")]
pub enum Literal {
    Int(i64),
    Float(f64),
}

impl Node {
    pub fn error(message: impl Into<String>) -> Node {
        Node::Error {
            val: message.into(),
        }
    }

    /// Error node for a construct outside the supported language.
    pub fn unsupported(kind_name: &str) -> Node {
        Node::error(format!("Unsupported language feature: {}", kind_name))
    }

    pub fn ident(name: impl Into<String>) -> Node {
        Node::Ident { val: name.into() }
    }

    pub fn int(value: i64) -> Node {
        Node::Lit(Literal::Int(value))
    }

    pub fn float(value: f64) -> Node {
        Node::Lit(Literal::Float(value))
    }

    pub fn nop() -> Node {
        Node::Nop
    }

    pub fn binop(op: impl Into<String>, op1: Node, op2: Node) -> Node {
        Node::Binop {
            op: op.into(),
            op1: Box::new(op1),
            op2: Box::new(op2),
        }
    }

    pub fn unop(op: impl Into<String>, op1: Node) -> Node {
        Node::Unop {
            op: op.into(),
            op1: Box::new(op1),
        }
    }

    pub fn call(fun: Node, args: Vec<Node>) -> Node {
        Node::Call {
            fun: Box::new(fun),
            args,
        }
    }

    /// A block wrapping its statements in a `seq`.
    pub fn block(stmts: Vec<Node>) -> Node {
        Node::Block {
            body: Box::new(Node::Seq { stmts }),
        }
    }

    /// The serialized discriminator of this node.
    pub fn tag(&self) -> &'static str {
        match self {
            Node::Error { .. } => "error",
            Node::Lit(_) => "lit",
            Node::Ident { .. } => "ident",
            Node::Binop { .. } => "binop",
            Node::Unop { .. } => "unop",
            Node::FuncType { .. } => "funcType",
            Node::FuncLit { .. } => "funcLit",
            Node::FuncDecl { .. } => "funcDecl",
            Node::Spec { .. } => "spec",
            Node::ConstDecl { .. } => "constDecl",
            Node::VarDecl { .. } => "varDecl",
            Node::Assign { .. } => "assign",
            Node::Block { .. } => "block",
            Node::Seq { .. } => "seq",
            Node::Call { .. } => "call",
            Node::Return { .. } => "return",
            Node::If { .. } => "if",
            Node::Nop => "nop",
            Node::Go { .. } => "go",
            Node::Package { .. } => "package",
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Node::Error { .. })
    }

    /// The diagnostic of an error node.
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Node::Error { val } => Some(val),
            _ => None,
        }
    }

    /// All nodes of the tree (including itself), depth-first in field order.
    pub fn iter<'a>(&'a self) -> impl Iterator<Item = &'a Node> + 'a {
        fn collect_nodes<'a>(node: &'a Node, result: &mut Vec<&'a Node>) {
            result.push(node);
            traverse_node!(node, |child| collect_nodes(child, result));
        }
        let mut result = Vec::new();
        collect_nodes(self, &mut result);
        result.into_iter()
    }

    /// Direct children of this node, in field order.
    pub fn iter_children<'a>(&'a self) -> impl Iterator<Item = &'a Node> + 'a {
        let mut result = Vec::new();
        traverse_node!(self, |child| result.push(child));
        result.into_iter()
    }

    /// Diagnostics of every error node in the tree.
    pub fn errors(&self) -> impl Iterator<Item = &str> {
        self.iter().filter_map(Node::error_message)
    }

    pub fn count_errors(&self) -> usize {
        self.errors().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_if() -> Node {
        Node::If {
            cond: Box::new(Node::binop("==", Node::ident("n"), Node::int(0))),
            then: Box::new(Node::block(vec![Node::Return {
                results: vec![Node::int(1)],
            }])),
            els: Box::new(Node::nop()),
        }
    }

    #[test]
    fn test_tag_is_first_field() {
        let json = serde_json::to_string(&Node::binop("+", Node::ident("z"), Node::ident("x"))).unwrap();
        assert_eq!(
            json,
            r#"{"tag":"binop","op":"+","op1":{"tag":"ident","val":"z"},"op2":{"tag":"ident","val":"x"}}"#
        );
    }

    #[test]
    fn test_literal_fields() {
        assert_eq!(
            serde_json::to_string(&Node::int(42)).unwrap(),
            r#"{"tag":"lit","kind":"int","val":42}"#
        );
        assert_eq!(
            serde_json::to_string(&Node::float(2.5)).unwrap(),
            r#"{"tag":"lit","kind":"float","val":2.5}"#
        );
    }

    #[test]
    fn test_keyword_fields_are_renamed() {
        let json = serde_json::to_value(sample_if()).unwrap();
        assert_eq!(json["else"]["tag"], "nop");
        assert_eq!(json["then"]["body"]["tag"], "seq");

        let func_type = Node::FuncType {
            params: vec![],
            results: vec![],
            param_types: vec![Node::ident("int")],
            result_types: vec![],
        };
        let json = serde_json::to_value(Node::FuncLit {
            ty: Box::new(func_type),
            body: Box::new(Node::block(vec![])),
        })
        .unwrap();
        assert_eq!(json["type"]["paramTypes"][0]["val"], "int");
        assert!(json["type"]["resultTypes"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_deserializes_to_equal_tree() {
        let tree = Node::Package {
            decls: vec![Node::FuncDecl {
                name: "main".to_string(),
                ty: Box::new(Node::FuncType {
                    params: vec![],
                    results: vec![],
                    param_types: vec![],
                    result_types: vec![],
                }),
                body: Box::new(Node::block(vec![sample_if(), Node::float(0.1)])),
            }],
        };
        let json = serde_json::to_string(&tree).unwrap();
        let back: Node = serde_json::from_str(&json).unwrap();
        assert_eq!(back, tree);
    }

    #[test]
    fn test_iteration_order() {
        let tags: Vec<_> = sample_if().iter().map(Node::tag).collect();
        assert_eq!(
            tags,
            vec!["if", "binop", "ident", "lit", "block", "seq", "return", "lit", "nop"]
        );
        let children: Vec<_> = sample_if().iter_children().map(Node::tag).collect();
        assert_eq!(children, vec!["binop", "block", "nop"]);
    }

    #[test]
    fn test_errors_are_collected() {
        let tree = Node::block(vec![
            Node::unsupported("ForStmt"),
            Node::call(Node::ident("f"), vec![Node::error("bad literal")]),
        ]);
        assert_eq!(tree.count_errors(), 2);
        assert_eq!(
            tree.errors().collect::<Vec<_>>(),
            vec!["Unsupported language feature: ForStmt", "bad literal"]
        );
    }
}
